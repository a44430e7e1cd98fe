use askama::Template;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use portal_core::error::AppError;

use crate::handlers::views::Nav;
use crate::models::{resource::ResourceDelivery, user::AuthUser};
use crate::AppState;

pub struct ResourceRow {
    pub id: i64,
    pub title: String,
    pub file_name: String,
    pub uploaded_at: String,
}

#[derive(Template)]
#[template(path = "resources.html")]
pub struct ResourcesTemplate {
    pub nav: Nav,
    pub lesson_id: i64,
    pub resources: Vec<ResourceRow>,
}

pub async fn lesson_resources(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let resources = state
        .api
        .lesson_resources(Some(&user.token), lesson_id)
        .await?
        .into_iter()
        .map(|resource| ResourceRow {
            id: resource.id,
            file_name: resource.file_name().to_string(),
            uploaded_at: resource
                .uploaded_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            title: resource.title,
        })
        .collect();

    Ok(ResourcesTemplate {
        nav: Nav::for_user(&user),
        lesson_id,
        resources,
    })
}

pub async fn download_resource(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resource_id): Path<i64>,
) -> Result<Response, AppError> {
    relay(&state, &user, resource_id, ResourceDelivery::Download).await
}

pub async fn preview_resource(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resource_id): Path<i64>,
) -> Result<Response, AppError> {
    relay(&state, &user, resource_id, ResourceDelivery::Preview).await
}

/// Stream the API's binary response back with its content headers.
async fn relay(
    state: &AppState,
    user: &AuthUser,
    resource_id: i64,
    delivery: ResourceDelivery,
) -> Result<Response, AppError> {
    let content = state
        .api
        .resource_content(Some(&user.token), resource_id, delivery)
        .await?;

    let disposition = match (content.content_disposition.as_deref(), delivery) {
        (Some(value), _) => value.to_string(),
        (None, ResourceDelivery::Download) => "attachment".to_string(),
        (None, ResourceDelivery::Preview) => "inline".to_string(),
    };

    let mut response = Body::from(content.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content.content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or(HeaderValue::from_static("attachment")),
    );

    tracing::debug!(resource_id, delivery = delivery.path_segment(), "Resource relayed");
    Ok(response)
}
