use thiserror::Error;

use crate::services::api::{ApiError, LessonApi};
use crate::wizard::SubmissionPlan;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("lesson creation failed: {0}")]
    LessonCreate(#[source] ApiError),
    /// The lesson exists; only its resources are missing.
    #[error("resource upload for lesson {lesson_id} failed: {source}")]
    ResourceUpload {
        lesson_id: i64,
        #[source]
        source: ApiError,
    },
}

impl SubmitError {
    pub fn stage(&self) -> &'static str {
        match self {
            SubmitError::LessonCreate(_) => "lesson_create",
            SubmitError::ResourceUpload { .. } => "resource_upload",
        }
    }
}

/// Create the lesson, then upload every valid resource in one multipart
/// batch. Returns the new lesson id.
///
/// Resources are never sent when creation fails, and a failed upload does
/// not remove the lesson that was already created.
pub async fn execute<A>(
    api: &A,
    token: Option<&str>,
    plan: &SubmissionPlan,
) -> Result<i64, SubmitError>
where
    A: LessonApi + ?Sized,
{
    let created = api
        .create_lesson(token, &plan.lesson)
        .await
        .map_err(SubmitError::LessonCreate)?;
    let lesson_id = created.lesson_id;

    tracing::info!(
        lesson_id,
        course_id = plan.lesson.course,
        title = %plan.lesson.title,
        "Lesson created"
    );

    if plan.resources.is_empty() {
        return Ok(lesson_id);
    }

    api.upload_resources(token, lesson_id, &plan.resources)
        .await
        .map_err(|source| {
            tracing::error!(
                lesson_id,
                resources = plan.resources.len(),
                error = %source,
                "Resource upload failed; lesson left in place"
            );
            SubmitError::ResourceUpload { lesson_id, source }
        })?;

    tracing::info!(
        lesson_id,
        resources = plan.resources.len(),
        "Lesson resources uploaded"
    );

    Ok(lesson_id)
}
