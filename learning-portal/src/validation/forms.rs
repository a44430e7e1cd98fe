use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{format_duration, FieldKind};
use crate::models::course::{NewCourse, COURSE_LEVELS};
use crate::models::event::{parse_timestamp, NewEvent};

#[derive(Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_name")
    )]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom(function = "validate_new_password"))]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    /// Field rules plus the confirmation match.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if self.confirm_password != self.new_password {
            errors.add("confirm_password", error("mismatch", "Passwords do not match"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EventForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    /// `datetime-local` values, e.g. `2024-05-01T18:00`.
    #[serde(default)]
    #[validate(custom(function = "validate_timestamp"))]
    pub start_time: String,
    #[serde(default)]
    #[validate(custom(function = "validate_timestamp"))]
    pub end_time: String,
}

impl EventForm {
    /// Field rules plus ordering of the two times, then the API payload.
    pub fn into_payload(self) -> Result<NewEvent, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let (Some(start), Some(end)) = (
            parse_timestamp(&self.start_time),
            parse_timestamp(&self.end_time),
        ) {
            if end < start {
                errors.add("end_time", error("order", "End time must be after the start time"));
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewEvent {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
        })
    }
}

fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", "Choose a date and time"));
    }
    if parse_timestamp(value).is_none() {
        return Err(error("timestamp", "Enter a valid date and time"));
    }
    Ok(())
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\'');
    if !allowed {
        return Err(error(
            "name_pattern",
            "Name can only contain letters, spaces, hyphens, and apostrophes",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    password_rules(password, "Password must be at least 8 characters")
}

fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    password_rules(password, "Password must be at least 8 characters long")
}

fn password_rules(password: &str, too_short: &'static str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(error("required", "Password is required"));
    }
    if password.chars().count() < 8 {
        return Err(error("password_length", too_short));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "@$!%*?&".contains(c));

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(error(
            "password_strength",
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        ));
    }
    Ok(())
}

/// First message recorded for `field`, or empty when the field passed.
pub fn first_error(errors: &ValidationErrors, field: &str) -> String {
    errors
        .field_errors()
        .get(field)
        .and_then(|errs| errs.first())
        .and_then(|err| err.message.as_ref())
        .map(|msg| msg.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub prerequisites: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFormErrors {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub level: String,
    pub prerequisites: String,
}

impl CourseFormErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.duration.is_empty()
            && self.level.is_empty()
            && self.prerequisites.is_empty()
    }
}

impl CourseForm {
    /// Validate every field at once and, when clean, build the API payload
    /// with the duration canonicalised and blank prerequisites set to "None".
    pub fn into_payload(self) -> Result<NewCourse, CourseFormErrors> {
        let errors = CourseFormErrors {
            title: FieldKind::CourseTitle.check(&self.title).message,
            description: FieldKind::CourseDescription.check(&self.description).message,
            duration: FieldKind::CourseDuration.check(&self.duration).message,
            level: if COURSE_LEVELS.contains(&self.level.as_str()) {
                String::new()
            } else {
                "Choose a course level".to_string()
            },
            prerequisites: FieldKind::CoursePrerequisites
                .check(&self.prerequisites)
                .message,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let prerequisites = match self.prerequisites.trim() {
            "" => "None".to_string(),
            other => other.to_string(),
        };

        Ok(NewCourse {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            duration: format_duration(&self.duration),
            level: self.level,
            prerequisites,
        })
    }
}
