use askama::Template;
use axum::response::{IntoResponse, Redirect, Response};
use portal_core::error::AppError;

use crate::handlers::views::Nav;
use crate::models::user::Role;
use crate::session::SessionContext;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
}

/// Landing page for guests; signed-in users go to the home of their view.
pub async fn index(context: SessionContext) -> Result<Response, AppError> {
    let data = context.load().await?;
    if data.is_signed_in() {
        return Ok(Redirect::to(data.effective_view_mode().home_path()).into_response());
    }
    Ok(IndexTemplate { nav: Nav::guest() }.into_response())
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Flip between the admin console and the student surface. Users have only
/// the student surface, so for them this changes nothing.
pub async fn toggle_view_mode(context: SessionContext) -> Result<Redirect, AppError> {
    let data = context
        .update(|data| {
            if data.role == Some(Role::Admin) {
                data.view_mode = Some(data.effective_view_mode().toggled());
            }
        })
        .await?;

    tracing::debug!(view_mode = ?data.view_mode, "View mode toggled");
    Ok(Redirect::to(data.effective_view_mode().home_path()))
}
