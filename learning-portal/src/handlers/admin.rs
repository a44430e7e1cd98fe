use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use portal_core::error::AppError;
use serde::Deserialize;

use crate::handlers::views::Nav;
use crate::models::{
    course::{Course, CourseVisibility, COURSE_LEVELS},
    user::AuthUser,
};
use crate::validation::forms::{CourseForm, CourseFormErrors};
use crate::AppState;

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub nav: Nav,
    pub courses: Vec<Course>,
    pub notification: String,
}

#[derive(Template)]
#[template(path = "admin/course_form.html")]
pub struct CourseFormTemplate {
    pub nav: Nav,
    pub form: CourseForm,
    pub errors: CourseFormErrors,
    pub levels: Vec<LevelOption>,
    pub notification: String,
}

pub struct LevelOption {
    pub name: &'static str,
    pub selected: bool,
}

impl CourseFormTemplate {
    fn new(user: &AuthUser, form: CourseForm) -> Self {
        let levels = COURSE_LEVELS
            .iter()
            .map(|&name| LevelOption {
                name,
                selected: form.level == name,
            })
            .collect();

        Self {
            nav: Nav::for_user(user),
            form,
            errors: CourseFormErrors::default(),
            levels,
            notification: String::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/course_delete.html")]
pub struct CourseDeleteTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub title: String,
}

pub const VISIBILITY_FAILED_MESSAGE: &str =
    "Failed to update course visibility. Please try again later.";

#[derive(Template)]
#[template(path = "admin/course_visibility.html")]
pub struct CourseVisibilityTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub title: String,
    /// The state the confirmation would switch the course to.
    pub make_visible: bool,
}

async fn render_dashboard(state: &AppState, user: &AuthUser, notification: Option<&str>) -> Response {
    let (courses, notification) = match state.api.admin_courses(Some(&user.token)).await {
        Ok(courses) => (courses, notification.unwrap_or_default().to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch admin courses");
            (Vec::new(), "Failed to fetch courses".to_string())
        }
    };

    AdminDashboardTemplate {
        nav: Nav::for_user(user),
        courses,
        notification,
    }
    .into_response()
}

pub async fn admin_dashboard_handler(State(state): State<AppState>, user: AuthUser) -> Response {
    render_dashboard(&state, &user, None).await
}

pub async fn new_course_page(user: AuthUser) -> impl IntoResponse {
    CourseFormTemplate::new(&user, CourseForm::default())
}

pub async fn create_course(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<CourseForm>,
) -> Response {
    let owner = user.owner_key();
    let Some(_saving) = state.course_saves.try_begin(&owner) else {
        let mut page = CourseFormTemplate::new(&user, form);
        page.notification = "A course is already being saved.".to_string();
        return (StatusCode::CONFLICT, page).into_response();
    };

    let payload = match form.clone().into_payload() {
        Ok(payload) => payload,
        Err(errors) => {
            let mut page = CourseFormTemplate::new(&user, form);
            page.errors = errors;
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
    };

    match state.api.add_course(Some(&user.token), &payload).await {
        Ok(()) => {
            tracing::info!(title = %payload.title, "Course added");
            Redirect::to("/admin").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add course");
            let mut page = CourseFormTemplate::new(&user, form);
            page.notification = "Failed to add course. Please try again.".to_string();
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

pub async fn confirm_delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> impl IntoResponse {
    let title = state
        .api
        .admin_courses(Some(&user.token))
        .await
        .ok()
        .and_then(|courses| courses.into_iter().find(|c| c.course_id == course_id))
        .map(|course| course.title)
        .unwrap_or_else(|| format!("course #{}", course_id));

    CourseDeleteTemplate {
        nav: Nav::for_user(&user),
        course_id,
        title,
    }
}

pub async fn delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> Response {
    match state.api.remove_course(Some(&user.token), course_id).await {
        Ok(()) => {
            tracing::info!(course_id, "Course removed");
            Redirect::to("/admin").into_response()
        }
        Err(e) => {
            tracing::error!(course_id, error = %e, "Failed to remove course");
            let page = render_dashboard(
                &state,
                &user,
                Some("Failed to delete course. Please try again."),
            )
            .await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

pub async fn confirm_course_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = state
        .api
        .admin_courses(Some(&user.token))
        .await?
        .into_iter()
        .find(|c| c.course_id == course_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Course {} not found", course_id)))?;

    Ok(CourseVisibilityTemplate {
        nav: Nav::for_user(&user),
        course_id,
        title: course.title,
        make_visible: !course.is_visible,
    })
}

#[derive(Debug, Deserialize)]
pub struct VisibilityForm {
    pub is_visible: bool,
}

pub async fn update_course_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
    Form(form): Form<VisibilityForm>,
) -> Response {
    let visibility = CourseVisibility::toggle(form.is_visible);
    match state
        .api
        .set_course_visibility(Some(&user.token), course_id, &visibility)
        .await
    {
        Ok(()) => {
            tracing::info!(course_id, is_visible = form.is_visible, "Course visibility updated");
            Redirect::to("/admin").into_response()
        }
        Err(e) => {
            tracing::error!(course_id, error = %e, "Failed to update course visibility");
            let page = render_dashboard(&state, &user, Some(VISIBILITY_FAILED_MESSAGE)).await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}
