//! Typed session context.
//!
//! Everything the portal remembers about a browser lives in one
//! [`SessionData`] record stored under a single key. [`SessionContext`] is the
//! only way to read or write it: `load`/`save` for the record, `clear` for the
//! full-session wipe performed on logout and on guard denial.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use portal_core::error::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::user::{LoginResponse, Role, ViewMode};

const SESSION_KEY: &str = "portal.session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Opaque bearer credential issued by the LMS API.
    pub token: Option<String>,
    /// Role label cached at login; the guard re-checks it against the token.
    pub role: Option<Role>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub view_mode: Option<ViewMode>,
    /// Email awaiting verification after registration.
    pub pending_verification: Option<String>,
    /// Fresh per login; server-side state such as lesson drafts hangs off it.
    #[serde(default)]
    pub login_id: Option<Uuid>,
}

impl SessionData {
    /// Fresh record for a successful login; nothing from a previous session
    /// survives.
    pub fn signed_in(login: &LoginResponse) -> Self {
        Self {
            token: Some(login.token.clone()),
            role: Some(login.role),
            name: login.name.clone(),
            email: login.email.clone(),
            view_mode: Some(ViewMode::initial_for(login.role)),
            pending_verification: None,
            login_id: Some(Uuid::new_v4()),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some() && self.role.is_some()
    }

    /// Students never see the admin surface, whatever the stored preference.
    pub fn effective_view_mode(&self) -> ViewMode {
        match (self.role, self.view_mode) {
            (Some(Role::Admin), Some(mode)) => mode,
            (Some(Role::Admin), None) => ViewMode::Admin,
            _ => ViewMode::Student,
        }
    }
}

#[derive(Clone)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn load(&self) -> Result<SessionData, AppError> {
        let data = self
            .session
            .get::<SessionData>(SESSION_KEY)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))?;

        Ok(data.unwrap_or_default())
    }

    pub async fn save(&self, data: &SessionData) -> Result<(), AppError> {
        self.session
            .insert(SESSION_KEY, data)
            .await
            .map_err(|e| AppError::SessionError(e.to_string()))
    }

    /// Load, mutate and save in one step.
    pub async fn update<F>(&self, mutate: F) -> Result<SessionData, AppError>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut data = self.load().await?;
        mutate(&mut data);
        self.save(&data).await?;
        Ok(data)
    }

    /// Drop every session-derived value at once.
    pub async fn clear(&self) {
        self.session.clear().await;
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::SessionError(msg.to_string()))?;

        Ok(SessionContext::new(session))
    }
}
