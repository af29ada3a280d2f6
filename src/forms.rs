//! Form state for the questionnaire and SWOT workflows.
//!
//! Pure state, no I/O. Every mutation can be expressed as a [`FormEvent`]
//! and fed through [`FormStore::apply`].

use crate::error::ValidationError;
use crate::models::{ApiKey, QuestionGenerationRequest, SwotRequest, UploadFile};

/// Single-file inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    QuestionsCsv,
    SwotCsv,
}

/// Scalar text inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    QuestionsBusinessName,
    QuestionsApiKey,
    SwotBusinessName,
    SwotApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    FileSelected { slot: FileSlot, file: UploadFile },
    FilesAdded(Vec<UploadFile>),
    FileRemoved(usize),
    FieldChanged { field: FormField, value: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionsForm {
    pub csv_file: Option<UploadFile>,
    pub business_name: String,
    pub api_key: ApiKey,
}

impl QuestionsForm {
    pub fn can_submit(&self) -> bool {
        self.submission().is_ok()
    }

    /// Build the request, or report the first missing input.
    pub fn submission(&self) -> Result<QuestionGenerationRequest, ValidationError> {
        let csv_file = self.csv_file.clone().ok_or(ValidationError::MissingCsvFile)?;
        let request = QuestionGenerationRequest {
            csv_file,
            business_name: self.business_name.clone(),
            api_key: self.api_key.clone(),
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwotForm {
    pub csv_file: Option<UploadFile>,
    pub pdf_files: Vec<UploadFile>,
    pub business_name: String,
    pub api_key: ApiKey,
}

impl SwotForm {
    pub fn can_submit(&self) -> bool {
        self.submission().is_ok()
    }

    pub fn submission(&self) -> Result<SwotRequest, ValidationError> {
        let csv_file = self.csv_file.clone().ok_or(ValidationError::MissingCsvFile)?;
        let request = SwotRequest {
            csv_file,
            pdf_files: self.pdf_files.clone(),
            business_name: self.business_name.clone(),
            api_key: self.api_key.clone(),
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormStore {
    pub questions: QuestionsForm,
    pub swot: SwotForm,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: FormEvent) {
        match event {
            FormEvent::FileSelected { slot, file } => self.set_single_file(slot, file),
            FormEvent::FilesAdded(files) => self.add_files(files),
            FormEvent::FileRemoved(index) => {
                self.remove_file_at(index);
            }
            FormEvent::FieldChanged { field, value } => self.set_field(field, value),
        }
    }

    pub fn set_single_file(&mut self, slot: FileSlot, file: UploadFile) {
        match slot {
            FileSlot::QuestionsCsv => self.questions.csv_file = Some(file),
            FileSlot::SwotCsv => self.swot.csv_file = Some(file),
        }
    }

    pub fn add_files<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = UploadFile>,
    {
        self.swot.pdf_files.extend(files);
    }

    /// Remove one PDF by position. Out-of-range indices are ignored.
    pub fn remove_file_at(&mut self, index: usize) -> Option<UploadFile> {
        if index < self.swot.pdf_files.len() {
            Some(self.swot.pdf_files.remove(index))
        } else {
            None
        }
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::QuestionsBusinessName => self.questions.business_name = value,
            FormField::QuestionsApiKey => self.questions.api_key = ApiKey::new(value),
            FormField::SwotBusinessName => self.swot.business_name = value,
            FormField::SwotApiKey => self.swot.api_key = ApiKey::new(value),
        }
    }
}
