//! Admin lesson management: the searchable list, confirmed deletion and the
//! authoring wizard dialogs.

use askama::Template;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use portal_core::error::AppError;
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::handlers::views::{format_size, Nav};
use crate::models::{
    lesson::{filter_lessons, paginate, Lesson, SortOrder, LESSONS_PER_PAGE},
    user::AuthUser,
};
use crate::services::draft_store::SharedWizard;
use crate::services::metrics::{record_lesson_created, record_submission_failure};
use crate::validation::FileHandle;
use crate::wizard::{submit, DetailField, LessonWizard, Stage, WizardError};
use crate::AppState;

pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete lesson. Please try again.";

pub const UPLOAD_TOO_LARGE_MESSAGE: &str = "Upload is larger than the 20MB total allowed.";

pub struct LessonListRow {
    pub lesson_id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
}

impl From<Lesson> for LessonListRow {
    fn from(lesson: Lesson) -> Self {
        Self {
            lesson_id: lesson.lesson_id,
            title: lesson.title,
            description: lesson.description,
            order: lesson.order,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/lessons.html")]
pub struct LessonListTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub lessons: Vec<LessonListRow>,
    pub search: String,
    pub sort: &'static str,
    pub next_sort: &'static str,
    pub page: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub notification: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LessonListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: SortOrder,
    /// One-based page number.
    #[serde(default)]
    pub page: Option<usize>,
}

fn management_path(course_id: i64) -> String {
    format!("/admin/courses/{}/lessons", course_id)
}

async fn render_lesson_list(
    state: &AppState,
    user: &AuthUser,
    course_id: i64,
    query: &LessonListQuery,
    notification: Option<&str>,
) -> Response {
    let (lessons, notification) = match state.api.list_lessons(Some(&user.token), course_id).await {
        Ok(lessons) => (lessons, notification.unwrap_or_default().to_string()),
        Err(e) => {
            tracing::error!(course_id, error = %e, "Failed to fetch lessons");
            (Vec::new(), "Failed to fetch lessons".to_string())
        }
    };

    let filtered = filter_lessons(&lessons, &query.search, query.sort);
    let requested = query.page.unwrap_or(1).max(1) - 1;
    let (rows, total_pages) = paginate(&filtered, requested, LESSONS_PER_PAGE);
    let page = requested.min(total_pages - 1) + 1;

    LessonListTemplate {
        nav: Nav::for_user(user),
        course_id,
        lessons: rows.into_iter().map(LessonListRow::from).collect(),
        search: query.search.clone(),
        sort: query.sort.as_str(),
        next_sort: query.sort.toggled().as_str(),
        page,
        total_pages,
        has_prev: page > 1,
        has_next: page < total_pages,
        notification,
    }
    .into_response()
}

pub async fn manage_lessons(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
    Query(query): Query<LessonListQuery>,
) -> Response {
    render_lesson_list(&state, &user, course_id, &query, None).await
}

#[derive(Template)]
#[template(path = "admin/lesson_delete.html")]
pub struct LessonDeleteTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub lesson_id: i64,
    pub title: String,
}

pub async fn confirm_delete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, lesson_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let title = state
        .api
        .list_lessons(Some(&user.token), course_id)
        .await
        .ok()
        .and_then(|lessons| lessons.into_iter().find(|l| l.lesson_id == lesson_id))
        .map(|lesson| lesson.title)
        .unwrap_or_else(|| format!("lesson #{}", lesson_id));

    LessonDeleteTemplate {
        nav: Nav::for_user(&user),
        course_id,
        lesson_id,
        title,
    }
}

/// Remove after confirmation. Nothing changes locally until the list is
/// fetched again.
pub async fn delete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, lesson_id)): Path<(i64, i64)>,
) -> Response {
    match state.api.remove_lesson(Some(&user.token), lesson_id).await {
        Ok(()) => {
            tracing::info!(course_id, lesson_id, "Lesson removed");
            Redirect::to(&management_path(course_id)).into_response()
        }
        Err(e) => {
            tracing::error!(course_id, lesson_id, error = %e, "Failed to remove lesson");
            let page = render_lesson_list(
                &state,
                &user,
                course_id,
                &LessonListQuery::default(),
                Some(DELETE_FAILED_MESSAGE),
            )
            .await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

// ---- authoring wizard ----

pub struct ResourceRowView {
    pub index: usize,
    pub title: String,
    pub file_name: String,
    pub file_size: String,
    pub error: String,
}

pub struct ReviewRowView {
    pub title: String,
    pub file_name: String,
    pub file_size: String,
}

#[derive(Template)]
#[template(path = "admin/wizard.html")]
pub struct WizardTemplate {
    pub nav: Nav,
    pub course_id: i64,
    pub draft_id: String,
    pub stage: &'static str,
    pub stage_label: &'static str,
    pub step: usize,
    pub title: String,
    pub description: String,
    pub order: String,
    pub title_error: String,
    pub description_error: String,
    pub order_error: String,
    pub rows: Vec<ResourceRowView>,
    pub review: Vec<ReviewRowView>,
    pub total_size: String,
    pub is_saving: bool,
    pub notification: String,
    pub lessons: Vec<LessonListRow>,
}

fn wizard_path(course_id: i64, draft_id: Uuid) -> String {
    format!("/admin/courses/{}/lessons/wizard/{}", course_id, draft_id)
}

/// Resolve a dialog owned by `user` on `course_id`; anything else is a 404.
async fn find_wizard(
    state: &AppState,
    user: &AuthUser,
    course_id: i64,
    draft_id: Uuid,
) -> Result<SharedWizard, AppError> {
    let not_found = || AppError::NotFound(anyhow::anyhow!("Lesson draft {} not found", draft_id));

    let wizard = state
        .drafts
        .get(draft_id, &user.owner_key())
        .ok_or_else(not_found)?;

    if wizard.lock().await.course_id() != course_id {
        return Err(not_found());
    }
    Ok(wizard)
}

fn wizard_view(
    user: &AuthUser,
    draft_id: Uuid,
    wizard: &LessonWizard,
    lessons: Vec<LessonListRow>,
) -> WizardTemplate {
    let draft = wizard.draft();
    let state = wizard.state();
    let stage = wizard.stage();

    let rows = draft
        .resources
        .iter()
        .zip(state.errors.resources.iter())
        .enumerate()
        .map(|(index, (row, error))| ResourceRowView {
            index,
            title: row.title.clone(),
            file_name: row.file.as_ref().map(|f| f.name.clone()).unwrap_or_default(),
            file_size: row.file.as_ref().map(|f| format_size(f.size())).unwrap_or_default(),
            error: error.clone().unwrap_or_default(),
        })
        .collect();

    let review = wizard
        .review()
        .resources
        .into_iter()
        .map(|r| ReviewRowView {
            title: r.title,
            file_name: r.file_name,
            file_size: format_size(r.size),
        })
        .collect();

    WizardTemplate {
        nav: Nav::for_user(user),
        course_id: wizard.course_id(),
        draft_id: draft_id.to_string(),
        stage: match stage {
            Stage::Details => "details",
            Stage::Resources => "resources",
            Stage::Review => "review",
        },
        stage_label: stage.label(),
        step: stage.index() + 1,
        title: draft.title.clone(),
        description: draft.description.clone(),
        order: draft.order.clone(),
        title_error: state.errors.title.clone().unwrap_or_default(),
        description_error: state.errors.description.clone().unwrap_or_default(),
        order_error: state.errors.order.clone().unwrap_or_default(),
        rows,
        review,
        total_size: format_size(wizard.total_file_bytes()),
        is_saving: state.is_saving,
        notification: state.notification.clone().unwrap_or_default(),
        lessons,
    }
}

/// Open a fresh dialog and go to it.
pub async fn open_wizard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(course_id): Path<i64>,
) -> Redirect {
    let draft_id = state.drafts.open(&user.owner_key(), course_id);
    Redirect::to(&wizard_path(course_id, draft_id))
}

/// Render the dialog's current stage over a freshly fetched lesson list.
pub async fn show_wizard(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;

    let lessons = match state.api.list_lessons(Some(&user.token), course_id).await {
        Ok(mut lessons) => {
            lessons.sort_by_key(|l| l.order);
            lessons.into_iter().map(LessonListRow::from).collect()
        }
        Err(e) => {
            tracing::warn!(course_id, error = %e, "Failed to fetch lessons");
            Vec::new()
        }
    };

    let mut wizard = wizard.lock().await;
    let page = wizard_view(&user, draft_id, &wizard, lessons);
    // notifications are shown once
    wizard.dismiss_notification();
    Ok(page)
}

#[derive(Debug, Deserialize)]
pub struct DetailsForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: String,
    #[serde(default)]
    pub action: String,
}

pub async fn save_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
    Form(form): Form<DetailsForm>,
) -> Result<Redirect, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;
    let mut wizard = wizard.lock().await;
    if wizard.stage() != Stage::Details {
        return Ok(Redirect::to(&wizard_path(course_id, draft_id)));
    }

    wizard.set_field(DetailField::Title, form.title);
    wizard.set_field(DetailField::Description, form.description);
    wizard.set_field(DetailField::Order, form.order);

    if form.action == "next" {
        log_rejection(draft_id, wizard.advance());
    }

    Ok(Redirect::to(&wizard_path(course_id, draft_id)))
}

/// What the resources form asked for besides saving its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourcesAction {
    Save,
    Add,
    Remove(usize),
    Next,
    Back,
}

impl ResourcesAction {
    fn parse(value: &str) -> Self {
        match value {
            "add" => ResourcesAction::Add,
            "next" => ResourcesAction::Next,
            "back" => ResourcesAction::Back,
            other => other
                .strip_prefix("remove:")
                .and_then(|i| i.parse().ok())
                .map(ResourcesAction::Remove)
                .unwrap_or(ResourcesAction::Save),
        }
    }
}

#[derive(Default)]
struct ResourcesSubmission {
    titles: BTreeMap<usize, String>,
    files: BTreeMap<usize, FileHandle>,
    action: Option<String>,
}

fn row_index(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?.parse().ok()
}

/// The body limit surfaces mid-stream as a multipart error.
fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(UPLOAD_TOO_LARGE_MESSAGE.to_string())
    } else {
        AppError::BadRequest(anyhow::anyhow!("Malformed upload: {}", e))
    }
}

async fn read_resources_form(mut multipart: Multipart) -> Result<ResourcesSubmission, AppError> {
    let mut submission = ResourcesSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(index) = row_index(&name, "file_") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(upload_error)?;

            // browsers send an empty part for an untouched file input
            if !file_name.is_empty() {
                submission.files.insert(
                    index,
                    FileHandle::new(file_name, content_type.as_deref(), bytes),
                );
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(upload_error)?;

            if let Some(index) = row_index(&name, "title_") {
                submission.titles.insert(index, value);
            } else if name == "action" {
                submission.action = Some(value);
            }
        }
    }

    Ok(submission)
}

pub async fn save_resources(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;
    let submission = read_resources_form(multipart).await?;
    let action = ResourcesAction::parse(submission.action.as_deref().unwrap_or_default());

    let mut wizard = wizard.lock().await;
    if wizard.stage() != Stage::Resources {
        return Ok(Redirect::to(&wizard_path(course_id, draft_id)));
    }

    for (index, title) in submission.titles {
        if wizard.draft().resources.get(index).map(|r| &r.title) != Some(&title) {
            log_rejection(draft_id, wizard.set_resource_title(index, title));
        }
    }
    for (index, file) in submission.files {
        log_rejection(draft_id, wizard.select_file(index, file));
    }

    match action {
        ResourcesAction::Save => {}
        ResourcesAction::Add => wizard.add_resource(),
        ResourcesAction::Remove(index) => log_rejection(draft_id, wizard.remove_resource(index)),
        ResourcesAction::Next => log_rejection(draft_id, wizard.advance()),
        ResourcesAction::Back => log_rejection(draft_id, wizard.back()),
    }

    Ok(Redirect::to(&wizard_path(course_id, draft_id)))
}

pub async fn wizard_back(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
) -> Result<Redirect, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;
    log_rejection(draft_id, wizard.lock().await.back());
    Ok(Redirect::to(&wizard_path(course_id, draft_id)))
}

/// Run the submission with the draft unlocked; the saving latch keeps a
/// second click from starting another one.
pub async fn submit_wizard(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
) -> Result<Redirect, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;
    let back_to_dialog = Redirect::to(&wizard_path(course_id, draft_id));

    let plan = match wizard.lock().await.begin_submit() {
        Ok(plan) => plan,
        Err(e) => {
            tracing::info!(draft_id = %draft_id, reason = %e, "Submission not started");
            return Ok(back_to_dialog);
        }
    };

    let outcome = submit::execute(state.api.as_ref(), Some(&user.token), &plan).await;

    match &outcome {
        Ok(lesson_id) => {
            record_lesson_created();
            tracing::info!(course_id, lesson_id, "Lesson submission completed");
        }
        Err(e) => {
            record_submission_failure(e.stage());
            tracing::error!(course_id, stage = e.stage(), error = %e, "Lesson submission failed");
        }
    }

    wizard.lock().await.finish_submit(&outcome);
    Ok(back_to_dialog)
}

pub async fn cancel_wizard(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
) -> Result<Redirect, AppError> {
    let wizard = find_wizard(&state, &user, course_id, draft_id).await?;
    wizard.lock().await.reset();
    Ok(Redirect::to(&wizard_path(course_id, draft_id)))
}

pub async fn close_wizard(
    State(state): State<AppState>,
    user: AuthUser,
    Path((course_id, draft_id)): Path<(i64, Uuid)>,
) -> Result<Redirect, AppError> {
    find_wizard(&state, &user, course_id, draft_id).await?;
    state.drafts.close(draft_id, &user.owner_key());
    Ok(Redirect::to(&management_path(course_id)))
}

/// Wizard rejections are already recorded in its state for rendering.
fn log_rejection<T>(draft_id: Uuid, result: Result<T, WizardError>) {
    if let Err(e) = result {
        tracing::debug!(draft_id = %draft_id, reason = %e, "Wizard step rejected");
    }
}
