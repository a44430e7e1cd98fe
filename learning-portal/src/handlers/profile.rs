use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use secrecy::{ExposeSecret, Secret};

use crate::handlers::views::Nav;
use crate::models::user::AuthUser;
use crate::validation::forms::{first_error, ChangePasswordForm};
use crate::AppState;

pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully";

#[derive(Template, Default)]
#[template(path = "change_password.html")]
pub struct ChangePasswordTemplate {
    pub nav: Nav,
    pub current_password_error: String,
    pub new_password_error: String,
    pub confirm_password_error: String,
    pub success: String,
    pub error: String,
}

pub async fn change_password_page(user: AuthUser) -> impl IntoResponse {
    ChangePasswordTemplate {
        nav: Nav::for_user(&user),
        ..Default::default()
    }
}

/// Passwords are never echoed back into the form.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<ChangePasswordForm>,
) -> Response {
    let mut page = ChangePasswordTemplate {
        nav: Nav::for_user(&user),
        ..Default::default()
    };

    if let Err(errors) = form.check() {
        page.current_password_error = first_error(&errors, "current_password");
        page.new_password_error = first_error(&errors, "new_password");
        page.confirm_password_error = first_error(&errors, "confirm_password");
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let current = Secret::new(form.current_password);
    let new = Secret::new(form.new_password);
    match state
        .api
        .change_password(Some(&user.token), current.expose_secret(), new.expose_secret())
        .await
    {
        Ok(_) => {
            tracing::info!("Password changed");
            page.success = PASSWORD_CHANGED_MESSAGE.to_string();
            page.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password change rejected");
            page.error = e
                .server_message()
                .unwrap_or("Failed to change password")
                .to_string();
            (StatusCode::BAD_REQUEST, page).into_response()
        }
    }
}
