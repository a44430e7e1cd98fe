use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use portal_core::middleware::{request_id_middleware, security_headers_middleware};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    admin::{
        admin_dashboard_handler, confirm_course_visibility, confirm_delete_course, create_course,
        delete_course, new_course_page, update_course_visibility,
    },
    app::{health_check, index, toggle_view_mode},
    auth::{
        login_handler, login_page, logout_handler, register_handler, register_page,
        resend_verification, verify_email_page, verify_email_token,
    },
    courses::{catalog, course_lessons, enroll, progress_page, toggle_lesson_progress},
    events::{
        add_event, events_page, manage_events, register_event, remove_event, unregister_event,
    },
    lessons::{
        cancel_wizard, close_wizard, confirm_delete_lesson, delete_lesson, manage_lessons,
        open_wizard, save_details, save_resources, show_wizard, submit_wizard, wizard_back,
    },
    metrics::metrics,
    profile::{change_password, change_password_page},
    resources::{download_resource, lesson_resources, preview_resource},
};
use crate::middleware::{metrics_middleware, require_admin, require_login};
use crate::AppState;

/// Room for a full 20 MiB resource batch plus multipart overhead.
pub const RESOURCE_UPLOAD_LIMIT: usize = 25 * 1024 * 1024;

const WIZARD: &str = "/admin/courses/:course_id/lessons/wizard";

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", get(login_page).post(login_handler))
        .route("/register", get(register_page).post(register_handler))
        .route("/logout", post(logout_handler))
        .route("/verify-email", get(verify_email_page))
        .route("/verify-email/resend", post(resend_verification))
        .route("/verify-email/:token", get(verify_email_token))
}

fn learner_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/view-mode", post(toggle_view_mode))
        .route("/courses", get(catalog))
        .route("/courses/:course_id/enroll", post(enroll))
        .route("/courses/:course_id/lessons", get(course_lessons))
        .route("/progress", get(progress_page))
        .route("/lessons/:lesson_id/progress", post(toggle_lesson_progress))
        .route("/lessons/:lesson_id/resources", get(lesson_resources))
        .route("/resources/:resource_id/download", get(download_resource))
        .route("/resources/:resource_id/preview", get(preview_resource))
        .route("/events", get(events_page))
        .route("/events/:event_id/register", post(register_event))
        .route("/events/:event_id/unregister", post(unregister_event))
        .route(
            "/profile/password",
            get(change_password_page).post(change_password),
        )
        .route_layer(from_fn_with_state(state.clone(), require_login))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_dashboard_handler))
        .route(
            "/admin/courses/new",
            get(new_course_page).post(create_course),
        )
        .route(
            "/admin/courses/:course_id/delete",
            get(confirm_delete_course).post(delete_course),
        )
        .route(
            "/admin/courses/:course_id/visibility",
            get(confirm_course_visibility).post(update_course_visibility),
        )
        .route("/admin/events", get(manage_events).post(add_event))
        .route("/admin/events/:event_id/remove", post(remove_event))
        .route("/admin/courses/:course_id/lessons", get(manage_lessons))
        .route(
            "/admin/courses/:course_id/lessons/:lesson_id/delete",
            get(confirm_delete_lesson).post(delete_lesson),
        )
        .route(WIZARD, post(open_wizard))
        .route(&format!("{WIZARD}/:draft_id"), get(show_wizard))
        .route(&format!("{WIZARD}/:draft_id/details"), post(save_details))
        .route(
            &format!("{WIZARD}/:draft_id/resources"),
            post(save_resources).layer(DefaultBodyLimit::max(RESOURCE_UPLOAD_LIMIT)),
        )
        .route(&format!("{WIZARD}/:draft_id/back"), post(wizard_back))
        .route(&format!("{WIZARD}/:draft_id/submit"), post(submit_wizard))
        .route(&format!("{WIZARD}/:draft_id/cancel"), post(cancel_wizard))
        .route(&format!("{WIZARD}/:draft_id/close"), post(close_wizard))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

pub fn build_router(state: AppState, server: &ServerSettings) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            server.session_inactivity_hours,
        )));

    Router::new()
        .merge(public_routes())
        .merge(learner_routes(&state))
        .merge(admin_routes(&state))
        .route_layer(from_fn(metrics_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
