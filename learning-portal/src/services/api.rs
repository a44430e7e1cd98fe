//! The LMS REST API as seen by the portal.
//!
//! Split in two so the lesson workflow depends only on the lesson operations
//! it actually issues.

use async_trait::async_trait;
use portal_core::error::AppError;
use thiserror::Error;

use crate::models::{
    course::{Course, CourseProgress, CourseVisibility, NewCourse},
    event::{Event, NewEvent},
    lesson::{CreatedLesson, Lesson, NewLesson},
    resource::{LessonResource, ResourceContent, ResourceDelivery},
    user::{LoginResponse, MessageResponse, VerifyEmailResponse},
};
use crate::validation::FileHandle;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to LMS API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LMS API responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("unexpected LMS API response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided `error` message, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            Some(404) => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            Some(401) => AppError::Unauthorized(anyhow::anyhow!(err.to_string())),
            Some(403) => AppError::Forbidden(anyhow::anyhow!(err.to_string())),
            _ => AppError::BadGateway(err.to_string()),
        }
    }
}

/// One titled file of a resource batch.
#[derive(Debug, Clone)]
pub struct ResourceUpload {
    pub title: String,
    pub file: FileHandle,
}

#[async_trait]
pub trait LessonApi: Send + Sync {
    /// Lessons of a course; a course without lessons yields an empty list.
    async fn list_lessons(&self, token: Option<&str>, course_id: i64)
        -> Result<Vec<Lesson>, ApiError>;

    async fn create_lesson(
        &self,
        token: Option<&str>,
        lesson: &NewLesson,
    ) -> Result<CreatedLesson, ApiError>;

    /// Attach every resource to `lesson_id` in a single multipart request.
    async fn upload_resources(
        &self,
        token: Option<&str>,
        lesson_id: i64,
        resources: &[ResourceUpload],
    ) -> Result<(), ApiError>;

    async fn remove_lesson(&self, token: Option<&str>, lesson_id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait LmsApi: LessonApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError>;

    async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ApiError>;

    async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ApiError>;

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError>;

    async fn change_password(
        &self,
        token: Option<&str>,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError>;

    async fn list_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError>;

    async fn available_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError>;

    async fn enrolled_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError>;

    async fn enroll(&self, token: Option<&str>, course_id: i64) -> Result<(), ApiError>;

    async fn course_progress(
        &self,
        token: Option<&str>,
        course_id: i64,
    ) -> Result<CourseProgress, ApiError>;

    async fn update_lesson_progress(
        &self,
        token: Option<&str>,
        lesson_id: i64,
        completed: bool,
    ) -> Result<(), ApiError>;

    async fn lesson_resources(
        &self,
        token: Option<&str>,
        lesson_id: i64,
    ) -> Result<Vec<LessonResource>, ApiError>;

    async fn resource_content(
        &self,
        token: Option<&str>,
        resource_id: i64,
        delivery: ResourceDelivery,
    ) -> Result<ResourceContent, ApiError>;

    async fn admin_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError>;

    async fn add_course(&self, token: Option<&str>, course: &NewCourse) -> Result<(), ApiError>;

    async fn remove_course(&self, token: Option<&str>, course_id: i64) -> Result<(), ApiError>;

    async fn set_course_visibility(
        &self,
        token: Option<&str>,
        course_id: i64,
        visibility: &CourseVisibility,
    ) -> Result<(), ApiError>;

    async fn list_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError>;

    /// Events the signed-in user is registered for.
    async fn registered_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError>;

    async fn register_event(
        &self,
        token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError>;

    async fn unregister_event(
        &self,
        token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError>;

    async fn admin_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError>;

    async fn add_event(&self, token: Option<&str>, event: &NewEvent) -> Result<(), ApiError>;

    async fn remove_event(&self, token: Option<&str>, event_id: i64) -> Result<(), ApiError>;
}
