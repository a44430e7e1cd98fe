#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use learning_portal::config::ServerSettings;
use learning_portal::models::{
    course::{Course, CourseProgress, CourseVisibility, NewCourse},
    event::{Event, NewEvent},
    lesson::{CreatedLesson, Lesson, NewLesson},
    resource::{LessonResource, ResourceContent, ResourceDelivery},
    user::{LoginResponse, MessageResponse, Role, VerifyEmailResponse},
};
use learning_portal::services::api::{ApiError, LessonApi, LmsApi, ResourceUpload};
use learning_portal::startup::build_router;
use learning_portal::AppState;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const PASSWORD: &str = "Str0ng!pass";

/// Unsigned JWT with the given role and expiry offset from now.
pub fn token(role: &str, expires_in: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in;
    let payload = format!(r#"{{"role":"{}","exp":{}}}"#, role, exp);
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.signature",
        general_purpose::URL_SAFE_NO_PAD.encode(payload)
    )
}

fn failure() -> ApiError {
    ApiError::Status {
        status: 500,
        message: None,
    }
}

/// In-memory LMS API that records what the portal asked of it.
pub struct MockLms {
    /// Role returned in the login body (the cached role).
    pub login_role: Mutex<Role>,
    /// Role inside the issued token.
    pub token_role: Mutex<String>,
    pub token_ttl: Mutex<i64>,
    pub lessons: Mutex<Vec<Lesson>>,
    pub courses: Mutex<Vec<Course>>,
    pub fail_create: Mutex<bool>,
    pub fail_upload: Mutex<bool>,
    pub fail_remove: Mutex<bool>,
    pub created: Mutex<Vec<NewLesson>>,
    pub uploads: Mutex<Vec<(i64, Vec<(String, String, usize)>)>>,
    pub removed: Mutex<Vec<i64>>,
    pub registered: Mutex<Vec<String>>,
    pub logouts: Mutex<usize>,
    pub events: Mutex<Vec<Event>>,
    /// Event ids the signed-in user is registered for.
    pub event_registrations: Mutex<Vec<i64>>,
    pub fail_register_event: Mutex<bool>,
    pub added_events: Mutex<Vec<NewEvent>>,
    pub removed_events: Mutex<Vec<i64>>,
    pub password_changes: Mutex<Vec<(String, String)>>,
    pub visibility_updates: Mutex<Vec<(i64, CourseVisibility)>>,
    pub fail_visibility: Mutex<bool>,
}

impl Default for MockLms {
    fn default() -> Self {
        Self {
            login_role: Mutex::new(Role::User),
            token_role: Mutex::new("user".to_string()),
            token_ttl: Mutex::new(3600),
            lessons: Mutex::new(Vec::new()),
            courses: Mutex::new(Vec::new()),
            fail_create: Mutex::new(false),
            fail_upload: Mutex::new(false),
            fail_remove: Mutex::new(false),
            created: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
            logouts: Mutex::new(0),
            events: Mutex::new(Vec::new()),
            event_registrations: Mutex::new(Vec::new()),
            fail_register_event: Mutex::new(false),
            added_events: Mutex::new(Vec::new()),
            removed_events: Mutex::new(Vec::new()),
            password_changes: Mutex::new(Vec::new()),
            visibility_updates: Mutex::new(Vec::new()),
            fail_visibility: Mutex::new(false),
        }
    }
}

impl MockLms {
    pub fn with_role(role: Role) -> Self {
        let mock = Self::default();
        *mock.login_role.lock().unwrap() = role;
        *mock.token_role.lock().unwrap() = role.as_str().to_string();
        mock
    }

    pub fn with_lessons(self, lessons: &[(i64, &str, &str, i64)]) -> Self {
        *self.lessons.lock().unwrap() = lessons
            .iter()
            .map(|&(lesson_id, title, description, order)| Lesson {
                lesson_id,
                title: title.to_string(),
                description: description.to_string(),
                order,
                completed: None,
            })
            .collect();
        self
    }

    pub fn with_courses(self, courses: &[(i64, &str, bool)]) -> Self {
        *self.courses.lock().unwrap() = courses
            .iter()
            .map(|&(course_id, title, is_visible)| Course {
                course_id,
                title: title.to_string(),
                description: String::new(),
                duration: "4 weeks".into(),
                level: "Beginner".into(),
                prerequisites: "None".into(),
                is_visible,
            })
            .collect();
        self
    }

    /// Events as `(id, title, start, end)`.
    pub fn with_events(self, events: &[(i64, &str, &str, &str)]) -> Self {
        *self.events.lock().unwrap() = events
            .iter()
            .map(|&(event_id, title, start_time, end_time)| Event {
                event_id,
                title: title.to_string(),
                description: format!("About {title}"),
                start_time: start_time.to_string(),
                end_time: end_time.to_string(),
            })
            .collect();
        self
    }
}

#[async_trait]
impl LessonApi for MockLms {
    async fn list_lessons(
        &self,
        _token: Option<&str>,
        _course_id: i64,
    ) -> Result<Vec<Lesson>, ApiError> {
        Ok(self.lessons.lock().unwrap().clone())
    }

    async fn create_lesson(
        &self,
        _token: Option<&str>,
        lesson: &NewLesson,
    ) -> Result<CreatedLesson, ApiError> {
        self.created.lock().unwrap().push(lesson.clone());
        if *self.fail_create.lock().unwrap() {
            return Err(failure());
        }
        Ok(CreatedLesson { lesson_id: 101 })
    }

    async fn upload_resources(
        &self,
        _token: Option<&str>,
        lesson_id: i64,
        resources: &[ResourceUpload],
    ) -> Result<(), ApiError> {
        let batch = resources
            .iter()
            .map(|r| (r.title.clone(), r.file.name.clone(), r.file.bytes.len()))
            .collect();
        self.uploads.lock().unwrap().push((lesson_id, batch));
        if *self.fail_upload.lock().unwrap() {
            return Err(failure());
        }
        Ok(())
    }

    async fn remove_lesson(&self, _token: Option<&str>, lesson_id: i64) -> Result<(), ApiError> {
        if *self.fail_remove.lock().unwrap() {
            return Err(failure());
        }
        self.removed.lock().unwrap().push(lesson_id);
        Ok(())
    }
}

#[async_trait]
impl LmsApi for MockLms {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        if password != PASSWORD {
            return Err(ApiError::Status {
                status: 401,
                message: Some("Invalid credentials".into()),
            });
        }
        let role = self.token_role.lock().unwrap().clone();
        let ttl = *self.token_ttl.lock().unwrap();
        Ok(LoginResponse {
            token: token(&role, ttl),
            role: *self.login_role.lock().unwrap(),
            name: Some("Test User".into()),
            email: Some(email.to_string()),
        })
    }

    async fn register(&self, _name: &str, email: &str, _password: &str) -> Result<(), ApiError> {
        self.registered.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ApiError> {
        if token == "bad" {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Invalid or expired token".into()),
            });
        }
        Ok(VerifyEmailResponse { role: None })
    }

    async fn resend_verification(&self, _email: &str) -> Result<MessageResponse, ApiError> {
        Ok(MessageResponse::default())
    }

    async fn logout(&self, _token: Option<&str>) -> Result<(), ApiError> {
        *self.logouts.lock().unwrap() += 1;
        Ok(())
    }

    async fn list_courses(&self, _token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn available_courses(&self, _token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn enrolled_courses(&self, _token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        Ok(Vec::new())
    }

    async fn enroll(&self, _token: Option<&str>, _course_id: i64) -> Result<(), ApiError> {
        Ok(())
    }

    async fn course_progress(
        &self,
        _token: Option<&str>,
        _course_id: i64,
    ) -> Result<CourseProgress, ApiError> {
        Ok(CourseProgress::default())
    }

    async fn update_lesson_progress(
        &self,
        _token: Option<&str>,
        _lesson_id: i64,
        _completed: bool,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn lesson_resources(
        &self,
        _token: Option<&str>,
        _lesson_id: i64,
    ) -> Result<Vec<LessonResource>, ApiError> {
        Ok(Vec::new())
    }

    async fn resource_content(
        &self,
        _token: Option<&str>,
        _resource_id: i64,
        _delivery: ResourceDelivery,
    ) -> Result<ResourceContent, ApiError> {
        Ok(ResourceContent {
            content_type: "application/pdf".into(),
            content_disposition: None,
            bytes: Bytes::from_static(b"%PDF-1.4"),
        })
    }

    async fn admin_courses(&self, _token: Option<&str>) -> Result<Vec<Course>, ApiError> {
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn add_course(&self, _token: Option<&str>, _course: &NewCourse) -> Result<(), ApiError> {
        Ok(())
    }

    async fn remove_course(&self, _token: Option<&str>, _course_id: i64) -> Result<(), ApiError> {
        Ok(())
    }

    async fn change_password(
        &self,
        _token: Option<&str>,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        if current_password != PASSWORD {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Current password is incorrect".into()),
            });
        }
        self.password_changes
            .lock()
            .unwrap()
            .push((current_password.to_string(), new_password.to_string()));
        Ok(MessageResponse::default())
    }

    async fn set_course_visibility(
        &self,
        _token: Option<&str>,
        course_id: i64,
        visibility: &CourseVisibility,
    ) -> Result<(), ApiError> {
        if *self.fail_visibility.lock().unwrap() {
            return Err(failure());
        }
        self.visibility_updates
            .lock()
            .unwrap()
            .push((course_id, visibility.clone()));
        Ok(())
    }

    async fn list_events(&self, _token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        Ok(self.events.lock().unwrap().clone())
    }

    async fn registered_events(&self, _token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        let ids = self.event_registrations.lock().unwrap().clone();
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| ids.contains(&event.event_id))
            .cloned()
            .collect())
    }

    async fn register_event(
        &self,
        _token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError> {
        let mut registrations = self.event_registrations.lock().unwrap();
        if *self.fail_register_event.lock().unwrap() || registrations.contains(&event_id) {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Already registered for this event".into()),
            });
        }
        registrations.push(event_id);
        Ok(MessageResponse {
            message: Some("Successfully registered for the event".into()),
        })
    }

    async fn unregister_event(
        &self,
        _token: Option<&str>,
        event_id: i64,
    ) -> Result<MessageResponse, ApiError> {
        self.event_registrations
            .lock()
            .unwrap()
            .retain(|id| *id != event_id);
        Ok(MessageResponse {
            message: Some("Successfully unregistered from the event".into()),
        })
    }

    async fn admin_events(&self, _token: Option<&str>) -> Result<Vec<Event>, ApiError> {
        Ok(self.events.lock().unwrap().clone())
    }

    async fn add_event(&self, _token: Option<&str>, event: &NewEvent) -> Result<(), ApiError> {
        self.added_events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn remove_event(&self, _token: Option<&str>, event_id: i64) -> Result<(), ApiError> {
        self.removed_events.lock().unwrap().push(event_id);
        Ok(())
    }
}

pub fn server_settings() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".into(),
        port: 0,
        secure_cookies: false,
        session_inactivity_hours: 24,
        draft_ttl_minutes: 60,
        max_drafts_per_login: 5,
    }
}

pub fn router(api: Arc<MockLms>) -> Router {
    app(api).0
}

/// The router plus a handle on its state, for asserting on server-side
/// stores.
pub fn app(api: Arc<MockLms>) -> (Router, AppState) {
    let server = server_settings();
    let state = AppState::new(api, &server);
    (build_router(state.clone(), &server), state)
}

/// A browser: one cookie jar over a shared router.
pub struct Browser {
    router: Router,
    cookie: Option<String>,
}

impl Browser {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let set_cookie = set_cookie.to_str().unwrap();
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            let removed = set_cookie.contains("Max-Age=0") || pair.ends_with('=');
            self.cookie = if removed { None } else { Some(pair) };
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, Vec<u8>)],
    ) -> Response<Body> {
        let boundary = "portal-test-boundary";
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&mut self, email: &str) -> Response<Body> {
        let body = serde_urlencoded::to_string([("email", email), ("password", PASSWORD)]).unwrap();
        self.post_form("/login", &body).await
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
