use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Which surface an admin is browsing. A UI preference only; authorization
/// never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Admin,
    Student,
}

impl ViewMode {
    pub fn initial_for(role: Role) -> Self {
        match role {
            Role::Admin => ViewMode::Admin,
            Role::User => ViewMode::Student,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Admin => ViewMode::Student,
            ViewMode::Student => ViewMode::Admin,
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            ViewMode::Admin => "/admin",
            ViewMode::Student => "/courses",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailResponse {
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Signed-in user as seen by page handlers. Route guards have already
/// decided admission; this only reads the session record.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: String,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub view_mode: ViewMode,
    pub login_id: Uuid,
}

impl AuthUser {
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("Learner")
            .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Identity of this login, used to bind drafts and saves to it. A new
    /// login, even by the same person, gets a new key.
    pub fn owner_key(&self) -> String {
        self.login_id.to_string()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = SessionContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let data = context.load().await.map_err(IntoResponse::into_response)?;
        let view_mode = data.effective_view_mode();

        match (data.token, data.role, data.login_id) {
            (Some(token), Some(role), Some(login_id)) => Ok(AuthUser {
                token,
                role,
                name: data.name,
                email: data.email,
                view_mode,
                login_id,
            }),
            _ => Err(Redirect::to("/login").into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: Option<&str>, email: Option<&str>) -> AuthUser {
        AuthUser {
            token: "t".into(),
            role: Role::User,
            name: name.map(String::from),
            email: email.map(String::from),
            view_mode: ViewMode::Student,
            login_id: Uuid::nil(),
        }
    }

    #[test]
    fn display_name_prefers_name_then_email_local_part() {
        assert_eq!(user(Some("Ada"), Some("ada@x.io")).display_name(), "Ada");
        assert_eq!(user(None, Some("grace@x.io")).display_name(), "grace");
        assert_eq!(user(Some("  "), None).display_name(), "Learner");
    }

    #[test]
    fn role_and_view_mode_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<ViewMode>("\"student\"").unwrap(),
            ViewMode::Student
        );
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }

    #[test]
    fn view_mode_toggles_and_routes_home() {
        assert_eq!(ViewMode::Admin.toggled(), ViewMode::Student);
        assert_eq!(ViewMode::initial_for(Role::User).home_path(), "/courses");
        assert_eq!(ViewMode::initial_for(Role::Admin).home_path(), "/admin");
    }
}
