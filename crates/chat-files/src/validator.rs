//! Upload validation against the file-type registry.
//!
//! Pure classification: no I/O here. The transport layer consults the verdict
//! while receiving the byte stream so oversized uploads can be aborted before
//! they are fully buffered.

use chat_core::GatewayError;

use crate::registry::{rule_for, FileCategory, FileTypeRule};

/// Metadata for one uploaded file, captured when the transport layer finishes
/// (or begins) receiving a multipart part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name as supplied by the client.
    pub original_name: String,
    /// Lower-cased extension including the leading dot.
    pub extension: String,
    /// Media type declared by the client.
    pub declared_media_type: String,
    /// Size in bytes as received.
    pub size_bytes: u64,
}

impl UploadedFile {
    /// Capture metadata from a multipart part, deriving the lower-cased
    /// extension from the original name.
    #[must_use]
    pub fn new(
        original_name: impl Into<String>,
        declared_media_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        let original_name = original_name.into();
        Self {
            extension: extension_of(&original_name),
            original_name,
            declared_media_type: declared_media_type.into(),
            size_bytes,
        }
    }
}

/// Lower-cased extension of a file name, including the leading dot; empty
/// when the name has none.
#[must_use]
pub fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Classify a file by extension and declared media type, before any bytes
/// are trusted.
///
/// # Errors
/// [`GatewayError::UnsupportedFileType`] for extensions absent from the
/// registry; [`GatewayError::MimeMismatch`] when the declared media type
/// disagrees with the registry (defends against extension spoofing).
pub fn classify(
    original_name: &str,
    declared_media_type: &str,
) -> Result<&'static FileTypeRule, GatewayError> {
    let extension = extension_of(original_name);

    let rule = rule_for(&extension).ok_or_else(|| GatewayError::UnsupportedFileType {
        extension: if extension.is_empty() {
            "(none)".to_string()
        } else {
            extension.clone()
        },
    })?;

    if !mime_matches(declared_media_type, rule.mime_type) {
        return Err(GatewayError::MimeMismatch {
            extension,
            declared: declared_media_type.to_string(),
        });
    }

    Ok(rule)
}

/// Full validation verdict for a received file.
///
/// # Errors
/// Everything [`classify`] raises, plus [`GatewayError::FileTooLarge`] when
/// the size exceeds the effective limit (min of per-type and global).
pub fn validate(file: &UploadedFile) -> Result<FileCategory, GatewayError> {
    let rule = classify(&file.original_name, &file.declared_media_type)?;

    let limit = rule.effective_limit();
    if file.size_bytes > limit {
        return Err(GatewayError::FileTooLarge {
            name: file.original_name.clone(),
            size_bytes: file.size_bytes,
            limit_bytes: limit,
        });
    }

    Ok(rule.category)
}

/// Compare a declared media type against the registry's expectation,
/// ignoring parameters such as `charset`.
fn mime_matches(declared: &str, expected: &str) -> bool {
    match declared.parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().eq_ignore_ascii_case(expected),
        Err(_) => false,
    }
}
