//! Event calendar for learners and event management for admins.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::handlers::views::Nav;
use crate::models::{
    event::{format_timestamp, Event},
    user::AuthUser,
};
use crate::validation::forms::{first_error, EventForm};
use crate::AppState;

pub const REGISTER_FAILED_MESSAGE: &str =
    "An error occurred while registering. Please try again.";
pub const UNREGISTER_FAILED_MESSAGE: &str =
    "An error occurred while unregistering. Please try again.";

pub struct EventRow {
    pub event_id: i64,
    pub title: String,
    pub description: String,
    pub start: String,
    pub end: String,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.event_id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: format_timestamp(&event.start_time),
            end: format_timestamp(&event.end_time),
        }
    }
}

#[derive(Template)]
#[template(path = "events.html")]
pub struct EventsTemplate {
    pub nav: Nav,
    pub day: String,
    pub day_label: String,
    pub on_day: Vec<EventRow>,
    pub all: Vec<EventRow>,
    pub registered: Vec<EventRow>,
    pub success: String,
    pub notification: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// `YYYY-MM-DD`; anything else means today.
    #[serde(default)]
    pub date: String,
}

fn selected_day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").unwrap_or_else(|_| Local::now().date_naive())
}

enum Outcome {
    Viewed,
    Succeeded(String),
    Failed(String),
}

async fn render_events(state: &AppState, user: &AuthUser, day: NaiveDate, outcome: Outcome) -> Response {
    let token = Some(user.token.as_str());
    let (events, registered) = tokio::join!(
        state.api.list_events(token),
        state.api.registered_events(token)
    );

    let mut notification = None;
    let events = events.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch events");
        notification = Some("Failed to load events. Please try again.".to_string());
        Vec::new()
    });
    let registered = registered.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch registered events");
        notification.get_or_insert_with(|| {
            "Failed to load registered events. Please try again.".to_string()
        });
        Vec::new()
    });

    let (status, success) = match outcome {
        Outcome::Viewed => (StatusCode::OK, String::new()),
        Outcome::Succeeded(message) => (StatusCode::OK, message),
        Outcome::Failed(message) => {
            notification = Some(message);
            (StatusCode::BAD_GATEWAY, String::new())
        }
    };

    let page = EventsTemplate {
        nav: Nav::for_user(user),
        day: day.format("%Y-%m-%d").to_string(),
        day_label: day.format("%a %b %-d %Y").to_string(),
        on_day: events
            .iter()
            .filter(|event| event.spans(day))
            .map(EventRow::from)
            .collect(),
        all: events.iter().map(EventRow::from).collect(),
        registered: registered.iter().map(EventRow::from).collect(),
        success,
        notification: notification.unwrap_or_default(),
    };
    (status, page).into_response()
}

pub async fn events_page(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EventsQuery>,
) -> Response {
    render_events(&state, &user, selected_day(&query.date), Outcome::Viewed).await
}

#[derive(Debug, Default, Deserialize)]
pub struct EventActionForm {
    #[serde(default)]
    pub date: String,
}

pub async fn register_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    Form(form): Form<EventActionForm>,
) -> Response {
    let outcome = match state.api.register_event(Some(&user.token), event_id).await {
        Ok(reply) => {
            tracing::info!(event_id, "Registered for event");
            Outcome::Succeeded(
                reply
                    .message
                    .unwrap_or_else(|| "Registered for event.".to_string()),
            )
        }
        Err(e) => {
            tracing::warn!(event_id, error = %e, "Event registration failed");
            Outcome::Failed(e.server_message().unwrap_or(REGISTER_FAILED_MESSAGE).to_string())
        }
    };
    render_events(&state, &user, selected_day(&form.date), outcome).await
}

pub async fn unregister_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    Form(form): Form<EventActionForm>,
) -> Response {
    let outcome = match state.api.unregister_event(Some(&user.token), event_id).await {
        Ok(reply) => {
            tracing::info!(event_id, "Unregistered from event");
            Outcome::Succeeded(
                reply
                    .message
                    .unwrap_or_else(|| "Unregistered from event.".to_string()),
            )
        }
        Err(e) => {
            tracing::warn!(event_id, error = %e, "Event unregistration failed");
            Outcome::Failed(e.server_message().unwrap_or(UNREGISTER_FAILED_MESSAGE).to_string())
        }
    };
    render_events(&state, &user, selected_day(&form.date), outcome).await
}

// ---- admin ----

#[derive(Template)]
#[template(path = "admin/events.html")]
pub struct AdminEventsTemplate {
    pub nav: Nav,
    pub events: Vec<EventRow>,
    pub form: EventForm,
    pub title_error: String,
    pub description_error: String,
    pub start_error: String,
    pub end_error: String,
    pub notification: String,
}

async fn admin_events_page(
    state: &AppState,
    user: &AuthUser,
    form: EventForm,
    notification: Option<&str>,
) -> AdminEventsTemplate {
    let (events, notification) = match state.api.admin_events(Some(&user.token)).await {
        Ok(events) => (events, notification.unwrap_or_default().to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch admin events");
            (Vec::new(), "Failed to fetch events".to_string())
        }
    };

    AdminEventsTemplate {
        nav: Nav::for_user(user),
        events: events.iter().map(EventRow::from).collect(),
        form,
        title_error: String::new(),
        description_error: String::new(),
        start_error: String::new(),
        end_error: String::new(),
        notification,
    }
}

pub async fn manage_events(State(state): State<AppState>, user: AuthUser) -> Response {
    admin_events_page(&state, &user, EventForm::default(), None)
        .await
        .into_response()
}

pub async fn add_event(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<EventForm>,
) -> Response {
    let payload = match form.clone().into_payload() {
        Ok(payload) => payload,
        Err(errors) => {
            let mut page = admin_events_page(&state, &user, form, None).await;
            page.title_error = first_error(&errors, "title");
            page.description_error = first_error(&errors, "description");
            page.start_error = first_error(&errors, "start_time");
            page.end_error = first_error(&errors, "end_time");
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
    };

    match state.api.add_event(Some(&user.token), &payload).await {
        Ok(()) => {
            tracing::info!(title = %payload.title, "Event added");
            Redirect::to("/admin/events").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add event");
            let page = admin_events_page(
                &state,
                &user,
                form,
                Some("Failed to add event. Please try again."),
            )
            .await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

pub async fn remove_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Response {
    match state.api.remove_event(Some(&user.token), event_id).await {
        Ok(()) => {
            tracing::info!(event_id, "Event removed");
            Redirect::to("/admin/events").into_response()
        }
        Err(e) => {
            tracing::error!(event_id, error = %e, "Failed to remove event");
            let page = admin_events_page(
                &state,
                &user,
                EventForm::default(),
                Some("Failed to remove event. Please try again."),
            )
            .await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}
