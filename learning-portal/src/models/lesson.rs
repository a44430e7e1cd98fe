use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i64,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Body of `POST admin/lessons/add/`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewLesson {
    pub title: String,
    pub description: String,
    pub order: i64,
    pub course: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreatedLesson {
    pub lesson_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

pub const LESSONS_PER_PAGE: usize = 5;

/// Case-insensitive search over title and description, sorted by lesson order.
pub fn filter_lessons(lessons: &[Lesson], search: &str, sort: SortOrder) -> Vec<Lesson> {
    let needle = search.trim().to_lowercase();

    let mut filtered: Vec<Lesson> = lessons
        .iter()
        .filter(|lesson| {
            needle.is_empty()
                || lesson.title.to_lowercase().contains(&needle)
                || lesson.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    filtered.sort_by(|a, b| match sort {
        SortOrder::Asc => a.order.cmp(&b.order),
        SortOrder::Desc => b.order.cmp(&a.order),
    });

    filtered
}

/// One page of `items` (zero-based) and the total page count (at least 1).
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, usize) {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let page = page.min(total_pages - 1);

    let rows = items
        .iter()
        .skip(page * per_page)
        .take(per_page)
        .cloned()
        .collect();

    (rows, total_pages)
}
