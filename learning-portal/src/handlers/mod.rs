pub mod admin;
pub mod app;
pub mod auth;
pub mod courses;
pub mod events;
pub mod lessons;
pub mod metrics;
pub mod profile;
pub mod resources;
pub mod views;
