//! Route guard.
//!
//! A synchronous decision over the session record, evaluated afresh on every
//! protected navigation. Fail-closed: anything it cannot positively confirm
//! sends the browser to the login page with the session wiped.

pub mod claims;

pub use claims::{decode_claims, ClaimsError, TokenClaims};

use crate::models::user::Role;
use crate::session::SessionData;

/// Capability a protected path requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingCredential,
    Undecodable,
    Expired,
    RoleMismatch,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::MissingCredential => "missing_credential",
            DenyReason::Undecodable => "undecodable",
            DenyReason::Expired => "expired",
            DenyReason::RoleMismatch => "role_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Admitted(TokenClaims),
    /// Clear the whole session and go to the login view.
    RedirectLogin { reason: DenyReason },
    /// Go to the verification view, carrying the pending email.
    RedirectVerify { email: String },
}

/// Decide admission for one navigation. `now` is unix seconds.
pub fn evaluate(session: &SessionData, access: Access, now: i64) -> GuardDecision {
    let (Some(token), Some(cached_role)) = (session.token.as_deref(), session.role) else {
        return GuardDecision::RedirectLogin {
            reason: DenyReason::MissingCredential,
        };
    };

    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(_) => {
            return GuardDecision::RedirectLogin {
                reason: DenyReason::Undecodable,
            }
        }
    };

    if claims.is_expired(now) {
        return GuardDecision::RedirectLogin {
            reason: DenyReason::Expired,
        };
    }

    match access {
        Access::Admin => {
            // Both sources must agree; a stale cache must not outlive a demotion.
            if cached_role != Role::Admin || claims.role != Role::Admin {
                return GuardDecision::RedirectLogin {
                    reason: DenyReason::RoleMismatch,
                };
            }
        }
        Access::Authenticated => {
            if let Some(email) = &session.pending_verification {
                return GuardDecision::RedirectVerify {
                    email: email.clone(),
                };
            }
        }
    }

    GuardDecision::Admitted(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    const NOW: i64 = 1_700_000_000;

    fn token(role: &str, exp: i64) -> String {
        let payload = format!(r#"{{"role":"{}","exp":{}}}"#, role, exp);
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.sig",
            general_purpose::URL_SAFE_NO_PAD.encode(payload)
        )
    }

    fn session(token: &str, role: Role) -> SessionData {
        SessionData {
            token: Some(token.to_string()),
            role: Some(role),
            ..Default::default()
        }
    }

    #[test]
    fn admits_valid_user_token() {
        let decision = evaluate(
            &session(&token("user", NOW + 60), Role::User),
            Access::Authenticated,
            NOW,
        );
        assert!(matches!(decision, GuardDecision::Admitted(c) if c.role == Role::User));
    }

    #[test]
    fn missing_token_or_role_redirects_to_login() {
        let no_token = SessionData {
            role: Some(Role::User),
            ..Default::default()
        };
        let no_role = SessionData {
            token: Some(token("user", NOW + 60)),
            ..Default::default()
        };

        for data in [SessionData::default(), no_token, no_role] {
            assert_eq!(
                evaluate(&data, Access::Authenticated, NOW),
                GuardDecision::RedirectLogin {
                    reason: DenyReason::MissingCredential
                }
            );
        }
    }

    #[test]
    fn expired_token_is_denied_every_time() {
        let data = session(&token("admin", NOW), Role::Admin);
        for access in [Access::Authenticated, Access::Admin, Access::Authenticated] {
            assert_eq!(
                evaluate(&data, access, NOW),
                GuardDecision::RedirectLogin {
                    reason: DenyReason::Expired
                }
            );
        }
    }

    #[test]
    fn undecodable_token_is_treated_like_expiry() {
        let data = session("garbage", Role::Admin);
        assert_eq!(
            evaluate(&data, Access::Admin, NOW),
            GuardDecision::RedirectLogin {
                reason: DenyReason::Undecodable
            }
        );
    }

    #[test]
    fn admin_requires_cached_and_claimed_role() {
        let demoted = session(&token("user", NOW + 60), Role::Admin);
        assert_eq!(
            evaluate(&demoted, Access::Admin, NOW),
            GuardDecision::RedirectLogin {
                reason: DenyReason::RoleMismatch
            }
        );

        let stale_cache = session(&token("admin", NOW + 60), Role::User);
        assert_eq!(
            evaluate(&stale_cache, Access::Admin, NOW),
            GuardDecision::RedirectLogin {
                reason: DenyReason::RoleMismatch
            }
        );

        let admin = session(&token("admin", NOW + 60), Role::Admin);
        assert!(matches!(
            evaluate(&admin, Access::Admin, NOW),
            GuardDecision::Admitted(_)
        ));
    }

    #[test]
    fn pending_verification_only_affects_non_admin_paths() {
        let mut data = session(&token("admin", NOW + 60), Role::Admin);
        data.pending_verification = Some("new@example.com".into());

        assert_eq!(
            evaluate(&data, Access::Authenticated, NOW),
            GuardDecision::RedirectVerify {
                email: "new@example.com".into()
            }
        );
        assert!(matches!(
            evaluate(&data, Access::Admin, NOW),
            GuardDecision::Admitted(_)
        ));
    }

    #[test]
    fn view_mode_is_not_an_authorization_input() {
        let mut data = session(&token("user", NOW + 60), Role::User);
        data.view_mode = Some(crate::models::user::ViewMode::Admin);
        assert_eq!(
            evaluate(&data, Access::Admin, NOW),
            GuardDecision::RedirectLogin {
                reason: DenyReason::RoleMismatch
            }
        );
    }
}
