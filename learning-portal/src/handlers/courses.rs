use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use portal_core::error::AppError;
use serde::Deserialize;

use crate::handlers::views::Nav;
use crate::models::{
    course::{Course, ProgressFilter},
    lesson::Lesson,
    user::AuthUser,
};
use crate::AppState;

#[derive(Template)]
#[template(path = "courses.html")]
pub struct CatalogTemplate {
    pub nav: Nav,
    pub enrolled: Vec<Course>,
    pub available: Vec<Course>,
    pub notification: String,
}

pub struct LessonRow {
    pub lesson_id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub completed: bool,
}

impl From<Lesson> for LessonRow {
    fn from(lesson: Lesson) -> Self {
        Self {
            lesson_id: lesson.lesson_id,
            title: lesson.title,
            description: lesson.description,
            order: lesson.order,
            completed: lesson.completed.unwrap_or(false),
        }
    }
}

#[derive(Template)]
#[template(path = "course_lessons.html")]
pub struct CourseLessonsTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub lessons: Vec<LessonRow>,
    pub progress: i64,
    pub notification: String,
}

pub struct ProgressRow {
    pub course_id: i64,
    pub title: String,
    pub percentage: i64,
}

#[derive(Template)]
#[template(path = "progress.html")]
pub struct ProgressTemplate {
    pub nav: Nav,
    pub filter: &'static str,
    pub rows: Vec<ProgressRow>,
    pub notification: String,
}

async fn render_catalog(state: &AppState, user: &AuthUser, notification: Option<&str>) -> Response {
    let token = Some(user.token.as_str());
    let (enrolled, available) = tokio::join!(
        state.api.enrolled_courses(token),
        state.api.available_courses(token)
    );

    let mut notification = notification.map(str::to_string);
    let enrolled = enrolled.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch enrolled courses");
        notification.get_or_insert_with(|| "Failed to fetch courses".to_string());
        Vec::new()
    });
    let available = available.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch available courses");
        notification.get_or_insert_with(|| "Failed to fetch courses".to_string());
        Vec::new()
    });

    CatalogTemplate {
        nav: Nav::for_user(user),
        enrolled,
        available,
        notification: notification.unwrap_or_default(),
    }
    .into_response()
}

pub async fn catalog(State(state): State<AppState>, user: AuthUser) -> Response {
    render_catalog(&state, &user, None).await
}

pub async fn enroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> Response {
    match state.api.enroll(Some(&user.token), course_id).await {
        Ok(()) => {
            tracing::info!(course_id, "Enrolled in course");
            Redirect::to("/courses").into_response()
        }
        Err(e) => {
            tracing::error!(course_id, error = %e, "Enrollment failed");
            let page = render_catalog(
                &state,
                &user,
                Some("Failed to enroll in course. Please try again."),
            )
            .await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

async fn render_course_lessons(
    state: &AppState,
    user: &AuthUser,
    course_id: i64,
    notification: Option<&str>,
) -> Result<Response, AppError> {
    let token = Some(user.token.as_str());
    let (lessons, progress) = tokio::join!(
        state.api.list_lessons(token, course_id),
        state.api.course_progress(token, course_id)
    );

    let mut lessons = lessons?;
    lessons.sort_by_key(|lesson| lesson.order);

    let progress = progress
        .map(|p| p.progress_percentage.round() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(course_id, error = %e, "Course progress unavailable");
            0
        });

    Ok(CourseLessonsTemplate {
        nav: Nav::for_user(user),
        course_id,
        lessons: lessons.into_iter().map(LessonRow::from).collect(),
        progress,
        notification: notification.unwrap_or_default().to_string(),
    }
    .into_response())
}

pub async fn course_lessons(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Response, AppError> {
    render_course_lessons(&state, &user, course_id, None).await
}

#[derive(Debug, Deserialize)]
pub struct ProgressForm {
    pub course_id: i64,
    pub completed: bool,
}

/// Mark a lesson (in)complete, then show the course again from fresh data.
pub async fn toggle_lesson_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lesson_id): Path<i64>,
    Form(form): Form<ProgressForm>,
) -> Result<Response, AppError> {
    match state
        .api
        .update_lesson_progress(Some(&user.token), lesson_id, form.completed)
        .await
    {
        Ok(()) => Ok(Redirect::to(&format!("/courses/{}/lessons", form.course_id)).into_response()),
        Err(e) => {
            tracing::error!(lesson_id, error = %e, "Failed to update lesson progress");
            render_course_lessons(
                &state,
                &user,
                form.course_id,
                Some("Failed to update progress. Please try again."),
            )
            .await
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub filter: ProgressFilter,
}

pub async fn progress_page(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let token = Some(user.token.as_str());

    let (courses, notification) = match state.api.enrolled_courses(token).await {
        Ok(courses) => (courses, String::new()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch enrolled courses");
            (Vec::new(), "Failed to fetch progress".to_string())
        }
    };

    let mut rows = Vec::with_capacity(courses.len());
    for course in courses {
        // an unreadable progress counts as not started
        let percentage = state
            .api
            .course_progress(token, course.course_id)
            .await
            .map(|p| p.progress_percentage)
            .unwrap_or(0.0);

        if query.filter.matches(percentage) {
            rows.push(ProgressRow {
                course_id: course.course_id,
                title: course.title,
                percentage: percentage.round() as i64,
            });
        }
    }

    ProgressTemplate {
        nav: Nav::for_user(&user),
        filter: query.filter.as_str(),
        rows,
        notification,
    }
    .into_response()
}
