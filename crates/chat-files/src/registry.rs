//! Static file-type registry.
//!
//! Keyed by lower-cased extension, loaded once at process start, never
//! mutated at request time. Per-type size limits and the global ceiling come
//! from the product's upload policy.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Global per-file ceiling applied on top of per-type limits.
pub const GLOBAL_MAX_BYTES: u64 = 25 * MB;

const MB: u64 = 1024 * 1024;

/// Closed set of file categories; the assembler matches this exhaustively,
/// so adding a category is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Raster image, forwarded as a base64 image block.
    Image,
    /// Plain text.
    Text,
    /// Binary document format (PDF/DOC); read through as lossy UTF-8, true
    /// decoding is the completion service's concern.
    Document,
    /// Source code.
    Code,
    /// Structured data (CSV/XML/YAML).
    Data,
}

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct FileTypeRule {
    /// Category driving the content-block shape downstream.
    pub category: FileCategory,
    /// Per-type size limit in bytes.
    pub max_size_bytes: u64,
    /// Expected MIME type for the extension.
    pub mime_type: &'static str,
}

impl FileTypeRule {
    /// Effective size limit: the smaller of the per-type limit and the
    /// global ceiling.
    #[must_use]
    pub fn effective_limit(&self) -> u64 {
        self.max_size_bytes.min(GLOBAL_MAX_BYTES)
    }

    const fn new(category: FileCategory, max_size_bytes: u64, mime_type: &'static str) -> Self {
        Self {
            category,
            max_size_bytes,
            mime_type,
        }
    }
}

static REGISTRY: Lazy<HashMap<&'static str, FileTypeRule>> = Lazy::new(|| {
    use FileCategory::{Code, Data, Document, Image, Text};

    HashMap::from([
        // Images
        (".jpg", FileTypeRule::new(Image, 10 * MB, "image/jpeg")),
        (".jpeg", FileTypeRule::new(Image, 10 * MB, "image/jpeg")),
        (".png", FileTypeRule::new(Image, 10 * MB, "image/png")),
        (".gif", FileTypeRule::new(Image, 10 * MB, "image/gif")),
        (".webp", FileTypeRule::new(Image, 10 * MB, "image/webp")),
        // Text
        (".txt", FileTypeRule::new(Text, 5 * MB, "text/plain")),
        (".md", FileTypeRule::new(Text, 5 * MB, "text/markdown")),
        // Documents
        (".pdf", FileTypeRule::new(Document, 25 * MB, "application/pdf")),
        (".doc", FileTypeRule::new(Document, 25 * MB, "application/msword")),
        (
            ".docx",
            FileTypeRule::new(
                Document,
                25 * MB,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
        ),
        // Code
        (".js", FileTypeRule::new(Code, 5 * MB, "text/javascript")),
        (".py", FileTypeRule::new(Code, 5 * MB, "text/x-python")),
        (".java", FileTypeRule::new(Code, 5 * MB, "text/x-java")),
        (".cpp", FileTypeRule::new(Code, 5 * MB, "text/x-c++")),
        (".html", FileTypeRule::new(Code, 5 * MB, "text/html")),
        (".css", FileTypeRule::new(Code, 5 * MB, "text/css")),
        (".json", FileTypeRule::new(Code, 5 * MB, "application/json")),
        // Data
        (".csv", FileTypeRule::new(Data, 25 * MB, "text/csv")),
        (".xml", FileTypeRule::new(Data, 10 * MB, "application/xml")),
        (".yaml", FileTypeRule::new(Data, 10 * MB, "application/x-yaml")),
    ])
});

/// Look up the rule for a lower-cased extension (including the leading dot).
#[must_use]
pub fn rule_for(extension: &str) -> Option<&'static FileTypeRule> {
    REGISTRY.get(extension)
}

/// All supported extensions, for diagnostics and tests.
#[must_use]
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions: Vec<_> = REGISTRY.keys().copied().collect();
    extensions.sort_unstable();
    extensions
}
