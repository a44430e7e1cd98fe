pub mod api;
pub mod draft_store;
pub mod lms_client;
pub mod metrics;
