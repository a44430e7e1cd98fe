use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use portal_core::error::AppError;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::views::Nav;
use crate::session::{SessionContext, SessionData};
use crate::validation::forms::{first_error, LoginForm, RegisterForm};
use crate::AppState;

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub email: String,
    pub email_error: String,
    pub password_error: String,
    pub error: String,
}

#[derive(Template, Default)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub name: String,
    pub email: String,
    pub name_error: String,
    pub email_error: String,
    pub password_error: String,
    pub error: String,
}

#[derive(Template, Default)]
#[template(path = "verify_email.html")]
pub struct VerifyEmailTemplate {
    pub nav: Nav,
    pub email: String,
    pub verified: bool,
    pub resent: bool,
    pub error: String,
    pub continue_path: String,
}

pub async fn login_page() -> impl IntoResponse {
    LoginTemplate::default()
}

pub async fn login_handler(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        let page = LoginTemplate {
            email_error: first_error(&errors, "email"),
            password_error: first_error(&errors, "password"),
            email: form.email,
            ..Default::default()
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let password = Secret::new(form.password);
    match state
        .api
        .login(form.email.trim(), password.expose_secret())
        .await
    {
        Ok(login) => {
            if let Some(previous) = context.load().await?.login_id {
                state.drafts.close_all(&previous.to_string());
            }
            context.clear().await;
            let data = SessionData::signed_in(&login);
            context.save(&data).await?;

            tracing::info!(role = login.role.as_str(), "User logged in");
            Ok(Redirect::to(data.effective_view_mode().home_path()).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login rejected");
            let page = LoginTemplate {
                email: form.email,
                error: e
                    .server_message()
                    .unwrap_or("Invalid email or password")
                    .to_string(),
                ..Default::default()
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate::default()
}

pub async fn register_handler(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        let page = RegisterTemplate {
            name_error: first_error(&errors, "name"),
            email_error: first_error(&errors, "email"),
            password_error: first_error(&errors, "password"),
            name: form.name,
            email: form.email,
            ..Default::default()
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let email = form.email.trim().to_string();
    let password = Secret::new(form.password);
    if let Err(e) = state
        .api
        .register(form.name.trim(), &email, password.expose_secret())
        .await
    {
        tracing::warn!(error = %e, "Registration rejected");
        let page = RegisterTemplate {
            name: form.name,
            email: form.email,
            error: e
                .server_message()
                .unwrap_or("Registration failed")
                .to_string(),
            ..Default::default()
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    context
        .update(|data| data.pending_verification = Some(email.clone()))
        .await?;

    tracing::info!("Registration accepted; verification pending");
    Ok(Redirect::to(&verify_path(&email)).into_response())
}

fn verify_path(email: &str) -> String {
    let query = serde_urlencoded::to_string([("email", email)]).unwrap_or_default();
    format!("/verify-email?{}", query)
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// "Check your inbox" page for the pending address.
pub async fn verify_email_page(
    context: SessionContext,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = context.load().await?;
    let email = query
        .email
        .or(data.pending_verification.clone())
        .unwrap_or_default();

    Ok(VerifyEmailTemplate {
        nav: Nav::for_session(&data),
        email,
        ..Default::default()
    })
}

pub async fn verify_email_token(
    State(state): State<AppState>,
    context: SessionContext,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match state.api.verify_email(&token).await {
        Ok(verified) => {
            let data = context
                .update(|data| {
                    data.pending_verification = None;
                    if let Some(role) = verified.role {
                        data.role = Some(role);
                    }
                })
                .await?;

            tracing::info!("Email verified");
            let continue_path = if data.is_signed_in() {
                data.effective_view_mode().home_path()
            } else {
                "/login"
            };

            Ok(VerifyEmailTemplate {
                nav: Nav::for_session(&data),
                verified: true,
                continue_path: continue_path.to_string(),
                ..Default::default()
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Email verification failed");
            let data = context.load().await?;
            let page = VerifyEmailTemplate {
                nav: Nav::for_session(&data),
                email: data.pending_verification.clone().unwrap_or_default(),
                error: e
                    .server_message()
                    .unwrap_or("Verification failed")
                    .to_string(),
                ..Default::default()
            };
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendForm {
    #[serde(default)]
    pub email: String,
}

pub async fn resend_verification(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<ResendForm>,
) -> Result<Response, AppError> {
    let data = context.load().await?;
    let email = Some(form.email.trim().to_string())
        .filter(|e| !e.is_empty())
        .or(data.pending_verification.clone());

    let mut page = VerifyEmailTemplate {
        nav: Nav::for_session(&data),
        email: email.clone().unwrap_or_default(),
        ..Default::default()
    };

    let Some(email) = email else {
        page.error = "Email address not found. Please try registering again.".to_string();
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    };

    match state.api.resend_verification(&email).await {
        Ok(_) => {
            page.resent = true;
            Ok(page.into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Resending verification failed");
            page.error = e
                .server_message()
                .unwrap_or("Failed to resend verification email")
                .to_string();
            Ok((StatusCode::BAD_GATEWAY, page).into_response())
        }
    }
}

/// Best-effort server logout, then a full local clear.
pub async fn logout_handler(
    State(state): State<AppState>,
    context: SessionContext,
) -> Result<Redirect, AppError> {
    let data = context.load().await?;

    if let Some(token) = data.token.as_deref() {
        if let Err(e) = state.api.logout(Some(token)).await {
            tracing::error!(error = %e, "Failed to revoke token during logout");
        }
    }
    if let Some(login_id) = data.login_id {
        state.drafts.close_all(&login_id.to_string());
    }

    context.clear().await;
    Ok(Redirect::to("/login"))
}
