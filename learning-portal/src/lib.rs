pub mod config;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;
pub mod validation;
pub mod wizard;

use config::ServerSettings;
use services::{
    api::LmsApi,
    draft_store::{DraftStore, SaveLatch},
};
use std::sync::Arc;

/// Shared application state: the LMS API client, the open lesson drafts and
/// the in-flight course saves.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn LmsApi>,
    pub drafts: Arc<DraftStore>,
    pub course_saves: Arc<SaveLatch>,
}

impl AppState {
    pub fn new(api: Arc<dyn LmsApi>, server: &ServerSettings) -> Self {
        Self {
            api,
            drafts: Arc::new(DraftStore::new(
                server.draft_ttl(),
                server.max_drafts_per_login,
            )),
            course_saves: Arc::new(SaveLatch::new()),
        }
    }
}
