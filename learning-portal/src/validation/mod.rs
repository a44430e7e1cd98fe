//! Field validators shared by the lesson wizard and the course form.

pub mod file;
pub mod forms;

pub use file::{validate_file, FileHandle, FileRejection};

pub const MAX_TITLE_CHARS: usize = 35;
pub const MAX_DESCRIPTION_CHARS: usize = 250;
pub const MAX_PREREQUISITES_CHARS: usize = 50;

/// Every kind of free-text field the portal validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    LessonTitle,
    LessonDescription,
    LessonOrder,
    ResourceTitle,
    CourseTitle,
    CourseDescription,
    CourseDuration,
    CoursePrerequisites,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: String,
}

impl FieldCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }

    /// The message as an optional error slot.
    pub fn error(&self) -> Option<String> {
        (!self.valid).then(|| self.message.clone())
    }
}

impl FieldKind {
    pub fn check(self, value: &str) -> FieldCheck {
        let chars = value.chars().count();

        match self {
            FieldKind::LessonTitle => {
                if value.trim().is_empty() {
                    FieldCheck::fail("Title is required")
                } else if chars > MAX_TITLE_CHARS {
                    FieldCheck::fail("Title must not exceed 35 characters")
                } else {
                    FieldCheck::ok()
                }
            }
            FieldKind::LessonDescription => {
                if value.trim().is_empty() {
                    FieldCheck::fail("Description is required")
                } else if chars > MAX_DESCRIPTION_CHARS {
                    FieldCheck::fail("Description must not exceed 250 characters")
                } else {
                    FieldCheck::ok()
                }
            }
            FieldKind::LessonOrder => match parse_order(value) {
                Ok(_) => FieldCheck::ok(),
                Err(message) => FieldCheck::fail(message),
            },
            FieldKind::ResourceTitle => {
                if chars > MAX_TITLE_CHARS {
                    FieldCheck::fail("Title must not exceed 35 characters")
                } else {
                    FieldCheck::ok()
                }
            }
            FieldKind::CourseTitle => {
                if value.trim().is_empty() || chars > MAX_TITLE_CHARS {
                    FieldCheck::fail("Title must be between 1-35 characters")
                } else {
                    FieldCheck::ok()
                }
            }
            FieldKind::CourseDescription => {
                if value.trim().is_empty() || chars > MAX_DESCRIPTION_CHARS {
                    FieldCheck::fail("Description must be between 1-250 characters")
                } else {
                    FieldCheck::ok()
                }
            }
            FieldKind::CourseDuration => {
                if parse_duration(value).is_some() {
                    FieldCheck::ok()
                } else {
                    FieldCheck::fail("Must be in format: '4 weeks' or '2 months'")
                }
            }
            FieldKind::CoursePrerequisites => {
                if chars > MAX_PREREQUISITES_CHARS {
                    FieldCheck::fail("Must be less than 50 characters")
                } else {
                    FieldCheck::ok()
                }
            }
        }
    }
}

/// Parse a lesson order: an integer of at least 1.
pub fn parse_order(value: &str) -> Result<i64, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Valid order number is required");
    }

    let order: i64 = trimmed.parse().map_err(|_| "Order must be a number")?;
    if order < 1 {
        return Err("Order must be positive");
    }

    Ok(order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationUnit {
    Week,
    Month,
}

/// `<digits><whitespace+><week|weeks|month|months>` and nothing else.
fn parse_duration(value: &str) -> Option<(&str, DurationUnit)> {
    let split = value.find(|c: char| !c.is_ascii_digit())?;
    let (number, rest) = value.split_at(split);
    if number.is_empty() {
        return None;
    }

    let unit = rest.trim_start();
    if unit.len() == rest.len() {
        // no separating whitespace
        return None;
    }

    let unit = match unit.to_ascii_lowercase().as_str() {
        "week" | "weeks" => DurationUnit::Week,
        "month" | "months" => DurationUnit::Month,
        _ => return None,
    };

    Some((number, unit))
}

/// Canonical form of a course duration: single space, unit pluralised to agree
/// with the number. Input that does not look like a duration is only
/// whitespace-normalised.
pub fn format_duration(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");

    match parse_duration(&collapsed) {
        Some((number, unit)) => {
            let singular = number == "1";
            let unit = match (unit, singular) {
                (DurationUnit::Week, true) => "week",
                (DurationUnit::Week, false) => "weeks",
                (DurationUnit::Month, true) => "month",
                (DurationUnit::Month, false) => "months",
            };
            format!("{} {}", number, unit)
        }
        None => collapsed,
    }
}
