//! # Chat Files
//!
//! Everything between a raw multipart upload and a completion-ready user
//! turn:
//! - a static file-type registry keyed by extension
//! - pure upload validation against that registry
//! - a temporary blob store with best-effort deletion
//! - the message assembler turning prompt text plus classified blobs into
//!   ordered content blocks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assembler;
pub mod registry;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use assembler::{assemble, StoredUpload};
pub use registry::{rule_for, supported_extensions, FileCategory, FileTypeRule, GLOBAL_MAX_BYTES};
pub use store::{BlobHandle, BlobStore};
pub use validator::{classify, extension_of, validate, UploadedFile};
