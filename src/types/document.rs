use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::require_name;
use crate::error::AutodocError;

/// Characters the remote store refuses in item names.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['"', '*', ':', '<', '>', '?', '/', '\\', '|'];

/// File bytes bound for the remote store.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePayload")
            .field("filename", &self.filename)
            .field("len", &self.content.len())
            .finish()
    }
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self, size_limit: usize) -> Result<(), AutodocError> {
        require_name("filename", &self.filename)?;
        if self.filename.contains(FORBIDDEN_FILENAME_CHARS) {
            return Err(AutodocError::Validation(format!(
                "filename `{}` contains a reserved character",
                self.filename
            )));
        }
        if self.content.len() > size_limit {
            return Err(AutodocError::Validation(format!(
                "file is {} bytes; uploads are limited to {size_limit} bytes",
                self.content.len()
            )));
        }
        Ok(())
    }
}

/// JSON form of a file: name plus standard base64 content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileUpload {
    pub filename: String,
    pub content_base64: String,
}

impl TryFrom<FileUpload> for FilePayload {
    type Error = AutodocError;

    fn try_from(upload: FileUpload) -> Result<Self, Self::Error> {
        let content = base64::engine::general_purpose::STANDARD
            .decode(upload.content_base64.trim())
            .map_err(|e| AutodocError::Validation(format!("`content_base64` is invalid: {e}")))?;
        Ok(FilePayload::new(upload.filename, content))
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub description: String,
    pub file: FilePayload,
}

impl NewDocument {
    pub fn validate(&self, size_limit: usize) -> Result<(), AutodocError> {
        require_name("name", &self.name)?;
        self.file.validate(size_limit)
    }
}

/// Metadata changes, optionally with new file content. Without a file the
/// remote store is left alone.
#[derive(Debug, Clone)]
pub struct DocumentChanges {
    pub name: String,
    pub description: String,
    pub file: Option<FilePayload>,
}

impl DocumentChanges {
    pub fn validate(&self, size_limit: usize) -> Result<(), AutodocError> {
        require_name("name", &self.name)?;
        match &self.file {
            Some(file) => file.validate(size_limit),
            None => Ok(()),
        }
    }
}
