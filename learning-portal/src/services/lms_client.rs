use crate::config::ApiSettings;
use crate::models::{
    course::{Course, CourseProgress, CourseVisibility, NewCourse},
    event::{Event, NewEvent},
    lesson::{CreatedLesson, Lesson, NewLesson},
    resource::{LessonResource, ResourceContent, ResourceDelivery},
    user::{LoginResponse, MessageResponse, VerifyEmailResponse},
};
use crate::services::api::{ApiError, LessonApi, LmsApi, ResourceUpload};
use async_trait::async_trait;
use portal_core::error::AppError;
use portal_core::observability::{TracedClientExt, TracedRequest};
use reqwest::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Duration;

/// HTTP client for the LMS REST API.
///
/// Every request carries the caller's bearer token when there is one and is
/// bounded by the configured timeout; trace context is propagated.
pub struct LmsClient {
    client: Client,
    base_url: String,
}

impl LmsClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        let base_url = if settings.base_url.ends_with('/') {
            settings.base_url.clone()
        } else {
            format!("{}/", settings.base_url)
        };

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: TracedRequest, url: &str) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "LMS API request failed");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(|v| v.as_str()).map(String::from));

        tracing::warn!(
            url = %url,
            status = status.as_u16(),
            message = message.as_deref().unwrap_or("-"),
            "LMS API request rejected"
        );

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let request = self.client.traced_get(&url).maybe_bearer_auth(token);
        let response = self.send(request, &url).await?;
        Self::decode(response).await
    }

    async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        let request = self
            .client
            .traced_post(&url)
            .maybe_bearer_auth(token)
            .json(body);
        self.send(request, &url).await
    }

    async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        let request = self
            .client
            .traced_patch(&url)
            .maybe_bearer_auth(token)
            .json(body);
        self.send(request, &url).await
    }

    /// A `{"message": ...}` reply; an empty or non-JSON body is still success.
    async fn message(response: reqwest::Response) -> MessageResponse {
        response.json().await.unwrap_or_default()
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        let url = self.url(path);
        let request = self.client.traced_delete(&url).maybe_bearer_auth(token);
        self.send(request, &url).await?;
        Ok(())
    }
}

#[async_trait]
impl LessonApi for LmsClient {
    async fn list_lessons(
        &self,
        token: Option<&str>,
        course_id: i64,
    ) -> Result<Vec<Lesson>, ApiError> {
        match self
            .get_json(&format!("courses/{}/lessons/", course_id), token)
            .await
        {
            Err(ApiError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn create_lesson(
        &self,
        token: Option<&str>,
        lesson: &NewLesson,
    ) -> Result<CreatedLesson, ApiError> {
        let response = self.post("admin/lessons/add/", token, lesson).await?;
        Self::decode(response).await
    }

    async fn upload_resources(
        &self,
        token: Option<&str>,
        lesson_id: i64,
        resources: &[ResourceUpload],
    ) -> Result<(), ApiError> {
        let mut form = Form::new().text("lesson", lesson_id.to_string());

        for resource in resources {
            let part = Part::stream_with_length(resource.file.bytes.clone(), resource.file.size())
                .file_name(resource.file.name.clone())
                .mime_str(&resource.file.content_type)?;

            form = form
                .text("titles", resource.title.clone())
                .part("resources", part);
        }

        let url = self.url("admin/lessons/resources/add/");
        let request = self
            .client
            .traced_post(&url)
            .maybe_bearer_auth(token)
            .multipart(form);
        self.send(request, &url).await?;

        Ok(())
    }

    async fn remove_lesson(&self, token: Option<&str>, lesson_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("admin/lessons/{}/remove", lesson_id), token)
            .await
    }
}

#[async_trait]
impl LmsApi for LmsClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .post(
                "auth/login/",
                None,
                &json!({ "email": email, "password": password }),
            )
            .await?;
        Self::decode(response).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        self.post(
            "auth/register/",
            None,
            &json!({ "name": name, "email": email, "password": password }),
        )
        .await?;
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ApiError> {
        let response = self
            .post("auth/verify-email/", None, &json!({ "token": token }))
            .await?;
        Self::decode(response).await
    }

    async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let response = self
            .post("auth/resend-verification/", None, &json!({ "email": email }))
            .await?;
        Self::decode(response).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        self.post("auth/logout/", token, &json!({})).await?;
        Ok(())
    }

    async fn change_password(
        &self,
        token: Option<&str>,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let response = self
            .post(
                "auth/change-password/",
                token,
                &json!({
                    "current_password": current_password,
                    "new_password": new_password,
                }),
            )
            .await?;
        Ok(Self::message(response).await)
    }

    async fn list_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        self.get_json("courses/", token).await
    }

    async fn available_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        self.get_json("courses/available/", token).await
    }

    async fn enrolled_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        self.get_json("courses/enrolled/", token).await
    }

    async fn enroll(&self, token: Option<&str>, course_id: i64) -> Result<(), ApiError> {
        self.post(&format!("courses/{}/enroll/", course_id), token, &json!({}))
            .await?;
        Ok(())
    }

    async fn course_progress(
        &self,
        token: Option<&str>,
        course_id: i64,
    ) -> Result<CourseProgress, ApiError> {
        self.get_json(&format!("courses/{}/progress/", course_id), token)
            .await
    }

    async fn update_lesson_progress(
        &self,
        token: Option<&str>,
        lesson_id: i64,
        completed: bool,
    ) -> Result<(), ApiError> {
        self.post(
            &format!("lessons/{}/progress/", lesson_id),
            token,
            &json!({ "completed": completed }),
        )
        .await?;
        Ok(())
    }

    async fn lesson_resources(
        &self,
        token: Option<&str>,
        lesson_id: i64,
    ) -> Result<Vec<LessonResource>, ApiError> {
        self.get_json(&format!("lessons/{}/resources/", lesson_id), token)
            .await
    }

    async fn resource_content(
        &self,
        token: Option<&str>,
        resource_id: i64,
        delivery: ResourceDelivery,
    ) -> Result<ResourceContent, ApiError> {
        let url = self.url(&format!(
            "resources/{}/{}/",
            resource_id,
            delivery.path_segment()
        ));
        let request = self.client.traced_get(&url).maybe_bearer_auth(token);
        let response = self.send(request, &url).await?;

        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type =
            header(CONTENT_TYPE).unwrap_or_else(|| "application/octet-stream".to_string());
        let content_disposition = header(CONTENT_DISPOSITION);

        let bytes = response.bytes().await?;

        Ok(ResourceContent {
            content_type,
            content_disposition,
            bytes,
        })
    }

    async fn admin_courses(&self, token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        self.get_json("admin/courses/", token).await
    }

    async fn add_course(&self, token: Option<&str>, course: &NewCourse) -> Result<(), ApiError> {
        self.post("admin/courses/add/", token, course).await?;
        Ok(())
    }

    async fn remove_course(&self, token: Option<&str>, course_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("admin/courses/remove/{}/", course_id), token)
            .await
    }

    async fn set_course_visibility(
        &self,
        token: Option<&str>,
        course_id: i64,
        visibility: &CourseVisibility,
    ) -> Result<(), ApiError> {
        self.patch(
            &format!("admin/courses/{}/visibility/", course_id),
            token,
            visibility,
        )
        .await?;
        Ok(())
    }

    async fn list_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        self.get_json("events/", token).await
    }

    async fn registered_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        self.get_json("events/registered/", token).await
    }

    async fn register_event(
        &self,
        token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError> {
        let response = self
            .post(&format!("events/{}/register/", event_id), token, &json!({}))
            .await?;
        Ok(Self::message(response).await)
    }

    async fn unregister_event(
        &self,
        token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError> {
        let response = self
            .post(&format!("events/{}/unregister/", event_id), token, &json!({}))
            .await?;
        Ok(Self::message(response).await)
    }

    async fn admin_events(&self, token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        self.get_json("admin/events/", token).await
    }

    async fn add_event(&self, token: Option<&str>, event: &NewEvent) -> Result<(), ApiError> {
        self.post("admin/events/add/", token, event).await?;
        Ok(())
    }

    async fn remove_event(&self, token: Option<&str>, event_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("admin/events/{}/remove/", event_id), token)
            .await
    }
}
