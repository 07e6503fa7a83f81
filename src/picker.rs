//! Media acquisition pipeline
//!
//! Permission, pick, validate - run as an explicit async sequence with a
//! discriminated outcome at each stage. The pickers themselves are platform
//! collaborators injected as traits; this module only consumes their
//! resolved values.

use crate::error::{Error, Result};
use crate::models::FileRef;
use async_trait::async_trait;

/// Mime types the document picker accepts (PDF and Word).
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Picked(FileRef),
    /// The user dismissed the picker. Not a failure, just a no-op.
    Cancelled,
    /// Library permission was not granted.
    Denied,
}

/// Photo-library picker. `pick` resolves to `None` when dismissed.
#[async_trait]
pub trait ImageLibrary: Send + Sync {
    async fn request_access(&self) -> Result<bool>;
    async fn pick(&self) -> Result<Option<FileRef>>;
}

/// Document picker, configured by the platform for PDF/Word documents.
#[async_trait]
pub trait DocumentLibrary: Send + Sync {
    async fn pick(&self) -> Result<Option<FileRef>>;
}

/// Image stage: library access is requested first; a refused grant aborts
/// before any picker is shown.
pub async fn pick_image(library: &dyn ImageLibrary) -> Result<PickOutcome> {
    if !library.request_access().await? {
        return Ok(PickOutcome::Denied);
    }
    match library.pick().await? {
        Some(file) => Ok(PickOutcome::Picked(file)),
        None => Ok(PickOutcome::Cancelled),
    }
}

/// Document stage: the picked file must carry a PDF/Word mime type. An
/// empty mime is guessed from the file name before validation.
pub async fn pick_document(library: &dyn DocumentLibrary) -> Result<PickOutcome> {
    let file = match library.pick().await? {
        Some(file) => normalize_mime(file),
        None => return Ok(PickOutcome::Cancelled),
    };

    if !DOCUMENT_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(Error::UnsupportedFile(file.mime_type));
    }
    Ok(PickOutcome::Picked(file))
}

fn normalize_mime(mut file: FileRef) -> FileRef {
    if file.mime_type.is_empty() {
        file.mime_type = mime_guess::from_path(&file.name)
            .first_raw()
            .unwrap_or_default()
            .to_string();
    }
    file
}
