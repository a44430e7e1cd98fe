use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::guard::{self, Access, GuardDecision};
use crate::services::metrics::record_guard_denial;
use crate::session::SessionContext;
use crate::AppState;

/// Admit any signed-in, verified user.
pub async fn require_login(
    State(state): State<AppState>,
    context: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    enforce(Access::Authenticated, &state, context, request, next).await
}

/// Admit only sessions whose cached role and token role are both admin.
pub async fn require_admin(
    State(state): State<AppState>,
    context: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    enforce(Access::Admin, &state, context, request, next).await
}

async fn enforce(
    access: Access,
    state: &AppState,
    context: SessionContext,
    mut request: Request,
    next: Next,
) -> Response {
    let data = match context.load().await {
        Ok(data) => data,
        Err(e) => return e.into_response(),
    };

    match guard::evaluate(&data, access, Utc::now().timestamp()) {
        GuardDecision::Admitted(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        GuardDecision::RedirectLogin { reason } => {
            tracing::warn!(
                reason = reason.as_str(),
                access = ?access,
                path = %request.uri().path(),
                "Navigation denied; clearing session"
            );
            record_guard_denial(reason.as_str());
            if let Some(login_id) = data.login_id {
                state.drafts.close_all(&login_id.to_string());
            }
            context.clear().await;
            Redirect::to("/login").into_response()
        }
        GuardDecision::RedirectVerify { email } => {
            tracing::info!(path = %request.uri().path(), "Email verification pending");
            let query = serde_urlencoded::to_string([("email", email.as_str())])
                .unwrap_or_default();
            Redirect::to(&format!("/verify-email?{}", query)).into_response()
        }
    }
}
