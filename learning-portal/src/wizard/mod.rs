//! Lesson authoring wizard.
//!
//! A three-stage state machine (Details, Resources, Review) over an in-memory
//! [`LessonDraft`]. Every mutation validates immediately; stage gates run the
//! exhaustive checks again before moving on. Submission itself lives in
//! [`submit`].

pub mod submit;

use thiserror::Error;

use crate::models::lesson::NewLesson;
use crate::services::api::ResourceUpload;
use crate::validation::{parse_order, validate_file, FieldKind, FileHandle, FileRejection};

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to add lesson. Please try again.";
pub const RESOURCE_TITLE_REQUIRED: &str = "Title is required when file is uploaded";
pub const RESOURCE_FILE_REQUIRED: &str = "File is required when title is provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Details,
    Resources,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next,
    Back,
}

impl Stage {
    /// The allowed-transition table. Anything not listed is illegal.
    pub fn transition(self, transition: Transition) -> Result<Stage, WizardError> {
        match (self, transition) {
            (Stage::Details, Transition::Next) => Ok(Stage::Resources),
            (Stage::Resources, Transition::Next) => Ok(Stage::Review),
            (Stage::Resources, Transition::Back) => Ok(Stage::Details),
            (Stage::Review, Transition::Back) => Ok(Stage::Resources),
            (from, transition) => Err(WizardError::InvalidTransition { from, transition }),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Stage::Details => 0,
            Stage::Resources => 1,
            Stage::Review => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Details => "Lesson Details",
            Stage::Resources => "Resources",
            Stage::Review => "Review",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("cannot go {transition:?} from the {from:?} stage")]
    InvalidTransition { from: Stage, transition: Transition },
    #[error("the {0:?} stage has validation errors")]
    Incomplete(Stage),
    #[error("no resource row at index {0}")]
    NoSuchRow(usize),
    #[error("resource {index}: {reason}")]
    FileRejected { index: usize, reason: FileRejection },
    #[error("lessons are submitted from the review stage")]
    NotInReview,
    #[error("a submission is already in progress")]
    AlreadySaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Title,
    Description,
    Order,
}

impl DetailField {
    fn kind(self) -> FieldKind {
        match self {
            DetailField::Title => FieldKind::LessonTitle,
            DetailField::Description => FieldKind::LessonDescription,
            DetailField::Order => FieldKind::LessonOrder,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceDraft {
    pub title: String,
    pub file: Option<FileHandle>,
}

impl ResourceDraft {
    fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Both halves of the pair are present.
    pub fn is_valid(&self) -> bool {
        self.has_title() && self.file.is_some()
    }

    /// Neither half is present; the row is an untouched placeholder.
    pub fn is_empty(&self) -> bool {
        !self.has_title() && self.file.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LessonDraft {
    pub title: String,
    pub description: String,
    /// Raw order input; parsed only when the plan is built.
    pub order: String,
    pub resources: Vec<ResourceDraft>,
}

impl LessonDraft {
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.order.is_empty()
            && self.resources.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftErrors {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<String>,
    /// One slot per resource row, kept in lockstep with the draft.
    pub resources: Vec<Option<String>>,
}

impl DraftErrors {
    fn detail_slot(&mut self, field: DetailField) -> &mut Option<String> {
        match field {
            DetailField::Title => &mut self.title,
            DetailField::Description => &mut self.description,
            DetailField::Order => &mut self.order,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WizardState {
    pub stage: Stage,
    pub errors: DraftErrors,
    pub is_saving: bool,
    /// User-visible failure notification from the last submission.
    pub notification: Option<String>,
}

/// Read-only projection shown on the Review stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    pub title: String,
    pub description: String,
    pub order: String,
    pub resources: Vec<ReviewedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewedResource {
    pub title: String,
    pub file_name: String,
    pub size: u64,
}

/// Everything needed to run one submission without touching the wizard.
#[derive(Debug, Clone)]
pub struct SubmissionPlan {
    pub lesson: NewLesson,
    pub resources: Vec<ResourceUpload>,
}

#[derive(Debug, Clone)]
pub struct LessonWizard {
    course_id: i64,
    draft: LessonDraft,
    state: WizardState,
}

impl LessonWizard {
    pub fn new(course_id: i64) -> Self {
        Self {
            course_id,
            draft: LessonDraft::default(),
            state: WizardState::default(),
        }
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    pub fn draft(&self) -> &LessonDraft {
        &self.draft
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn set_field(&mut self, field: DetailField, value: impl Into<String>) {
        let value = value.into();
        *self.state.errors.detail_slot(field) = field.kind().check(&value).error();

        match field {
            DetailField::Title => self.draft.title = value,
            DetailField::Description => self.draft.description = value,
            DetailField::Order => self.draft.order = value,
        }
    }

    pub fn add_resource(&mut self) {
        self.draft.resources.push(ResourceDraft::default());
        self.state.errors.resources.push(None);
    }

    pub fn remove_resource(&mut self, index: usize) -> Result<ResourceDraft, WizardError> {
        self.row(index)?;
        self.state.errors.resources.remove(index);
        Ok(self.draft.resources.remove(index))
    }

    pub fn set_resource_title(
        &mut self,
        index: usize,
        title: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.row(index)?;
        let title = title.into();

        self.state.errors.resources[index] = FieldKind::ResourceTitle.check(&title).error();
        self.draft.resources[index].title = title;
        Ok(())
    }

    /// Attach a file to a row. A rejected file leaves the row without one.
    pub fn select_file(&mut self, index: usize, file: FileHandle) -> Result<(), WizardError> {
        self.row(index)?;

        let others_total: u64 = self
            .draft
            .resources
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, row)| row.file.as_ref())
            .map(FileHandle::size)
            .sum();

        match validate_file(&file, others_total) {
            Ok(()) => {
                self.draft.resources[index].file = Some(file);
                self.state.errors.resources[index] = None;
                Ok(())
            }
            Err(reason) => {
                self.draft.resources[index].file = None;
                self.state.errors.resources[index] = Some(reason.to_string());
                Err(WizardError::FileRejected { index, reason })
            }
        }
    }

    pub fn total_file_bytes(&self) -> u64 {
        self.draft
            .resources
            .iter()
            .filter_map(|row| row.file.as_ref())
            .map(FileHandle::size)
            .sum()
    }

    /// Run the current stage's gate, compact the resource list when leaving
    /// Resources, then move forward.
    pub fn advance(&mut self) -> Result<Stage, WizardError> {
        let from = self.state.stage;
        let to = from.transition(Transition::Next)?;

        let passed = match from {
            Stage::Details => self.validate_details(),
            Stage::Resources => self.validate_resources(),
            Stage::Review => true,
        };
        if !passed {
            return Err(WizardError::Incomplete(from));
        }

        if from == Stage::Resources {
            self.prune_empty_rows();
        }

        self.state.stage = to;
        Ok(to)
    }

    pub fn back(&mut self) -> Result<Stage, WizardError> {
        let to = self.state.stage.transition(Transition::Back)?;
        self.state.stage = to;
        Ok(to)
    }

    pub fn valid_resources(&self) -> Vec<&ResourceDraft> {
        self.draft
            .resources
            .iter()
            .filter(|row| row.is_valid())
            .collect()
    }

    pub fn review(&self) -> ReviewSummary {
        ReviewSummary {
            title: self.draft.title.clone(),
            description: self.draft.description.clone(),
            order: self.draft.order.clone(),
            resources: self
                .valid_resources()
                .into_iter()
                .filter_map(|row| {
                    row.file.as_ref().map(|file| ReviewedResource {
                        title: row.title.clone(),
                        file_name: file.name.clone(),
                        size: file.size(),
                    })
                })
                .collect(),
        }
    }

    /// Engage the saving latch and snapshot the payloads to send.
    pub fn begin_submit(&mut self) -> Result<SubmissionPlan, WizardError> {
        if self.state.is_saving {
            return Err(WizardError::AlreadySaving);
        }
        if self.state.stage != Stage::Review {
            return Err(WizardError::NotInReview);
        }

        // the details may have been edited since their gate ran
        if !self.validate_details() {
            return Err(WizardError::Incomplete(Stage::Details));
        }
        let order = parse_order(&self.draft.order)
            .map_err(|_| WizardError::Incomplete(Stage::Details))?;

        let resources = self
            .valid_resources()
            .into_iter()
            .filter_map(|row| {
                row.file.clone().map(|file| ResourceUpload {
                    title: row.title.trim().to_string(),
                    file,
                })
            })
            .collect();

        self.state.is_saving = true;
        self.state.notification = None;

        Ok(SubmissionPlan {
            lesson: NewLesson {
                title: self.draft.title.trim().to_string(),
                description: self.draft.description.trim().to_string(),
                order,
                course: self.course_id,
            },
            resources,
        })
    }

    /// Release the latch. Success starts over; failure keeps the draft for a
    /// retry and records the notification.
    pub fn finish_submit<T, E>(&mut self, outcome: &Result<T, E>) {
        self.state.is_saving = false;

        match outcome {
            Ok(_) => self.reset(),
            Err(_) => self.state.notification = Some(SUBMIT_FAILED_MESSAGE.to_string()),
        }
    }

    pub fn reset(&mut self) {
        self.draft = LessonDraft::default();
        self.state = WizardState::default();
    }

    pub fn dismiss_notification(&mut self) {
        self.state.notification = None;
    }

    fn row(&self, index: usize) -> Result<&ResourceDraft, WizardError> {
        self.draft
            .resources
            .get(index)
            .ok_or(WizardError::NoSuchRow(index))
    }

    fn validate_details(&mut self) -> bool {
        let mut valid = true;
        for field in [DetailField::Title, DetailField::Description, DetailField::Order] {
            let value = match field {
                DetailField::Title => &self.draft.title,
                DetailField::Description => &self.draft.description,
                DetailField::Order => &self.draft.order,
            };
            let error = field.kind().check(value).error();
            valid &= error.is_none();
            *self.state.errors.detail_slot(field) = error;
        }
        valid
    }

    fn validate_resources(&mut self) -> bool {
        let errors: Vec<Option<String>> = self
            .draft
            .resources
            .iter()
            .map(|row| {
                if row.is_empty() {
                    None
                } else if !row.has_title() {
                    Some(RESOURCE_TITLE_REQUIRED.to_string())
                } else if row.file.is_none() {
                    Some(RESOURCE_FILE_REQUIRED.to_string())
                } else {
                    FieldKind::ResourceTitle.check(&row.title).error()
                }
            })
            .collect();

        let valid = errors.iter().all(Option::is_none);
        self.state.errors.resources = errors;
        valid
    }

    fn prune_empty_rows(&mut self) {
        let (rows, errors): (Vec<_>, Vec<_>) = std::mem::take(&mut self.draft.resources)
            .into_iter()
            .zip(std::mem::take(&mut self.state.errors.resources))
            .filter(|(row, _)| !row.is_empty())
            .unzip();

        self.draft.resources = rows;
        self.state.errors.resources = errors;
    }
}
