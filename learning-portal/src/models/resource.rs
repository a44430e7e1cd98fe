use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonResource {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl LessonResource {
    pub fn file_name(&self) -> &str {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }
}

/// Binary content relayed from the download/preview endpoints.
#[derive(Debug, Clone)]
pub struct ResourceContent {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub bytes: Bytes,
}

/// Which binary endpoint to proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDelivery {
    Download,
    Preview,
}

impl ResourceDelivery {
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceDelivery::Download => "download",
            ResourceDelivery::Preview => "preview",
        }
    }
}
