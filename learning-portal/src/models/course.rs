use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub prerequisites: String,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
}

fn visible_by_default() -> bool {
    true
}

/// Body of `PATCH admin/courses/{id}/visibility/`. The portal only toggles
/// visibility; a scheduled window is never set from here.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseVisibility {
    pub is_visible: bool,
    pub visibility_start_date: Option<String>,
    pub visibility_end_date: Option<String>,
}

impl CourseVisibility {
    pub fn toggle(is_visible: bool) -> Self {
        Self {
            is_visible,
            visibility_start_date: None,
            visibility_end_date: None,
        }
    }
}

/// Body of `POST admin/courses/add/`, built from a validated course form.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub level: String,
    pub prerequisites: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CourseProgress {
    #[serde(default)]
    pub progress_percentage: f64,
}

/// Progress buckets used by the progress page filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressFilter {
    #[default]
    All,
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressFilter {
    pub fn matches(self, percentage: f64) -> bool {
        match self {
            ProgressFilter::All => true,
            ProgressFilter::NotStarted => percentage <= 0.0,
            ProgressFilter::InProgress => percentage > 0.0 && percentage < 100.0,
            ProgressFilter::Completed => percentage >= 100.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressFilter::All => "all",
            ProgressFilter::NotStarted => "not_started",
            ProgressFilter::InProgress => "in_progress",
            ProgressFilter::Completed => "completed",
        }
    }
}

pub const COURSE_LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];
