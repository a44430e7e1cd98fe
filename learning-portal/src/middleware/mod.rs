pub mod auth;
pub mod metrics;

pub use auth::{require_admin, require_login};
pub use metrics::metrics_middleware;
