//! Message assembly: prompt text plus classified blobs into one ordered
//! block list forming a single user turn.
//!
//! Ordering contract: file blocks in the order the files were received, the
//! prompt text (when non-empty) always last. The completion service's
//! attention to most-recent content depends on this.

use chat_core::{ContentBlock, GatewayError};
use tracing::debug;

use crate::registry::FileCategory;
use crate::store::{BlobHandle, BlobStore};
use crate::validator::UploadedFile;

/// A validated upload whose bytes live in the blob store.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Captured upload metadata.
    pub file: UploadedFile,
    /// Validator verdict driving the block shape.
    pub category: FileCategory,
    /// Handle to the temporary blob; owned exclusively by this request.
    pub handle: BlobHandle,
}

/// Assemble content blocks from a prompt and classified files.
///
/// Every file's blob is deleted immediately after it has been read into a
/// block. When a read fails, the failing file's blob and every remaining
/// unprocessed blob are deleted before the error propagates, so partial
/// assembly never leaks temp files.
///
/// The caller rejects the empty-prompt-and-no-files case (`EmptyRequest`)
/// before invoking this; given any input, the result here is non-empty.
///
/// # Errors
/// [`GatewayError::Blob`] when a blob read fails.
pub async fn assemble(
    store: &BlobStore,
    prompt: &str,
    files: Vec<StoredUpload>,
) -> Result<Vec<ContentBlock>, GatewayError> {
    let mut blocks = Vec::with_capacity(files.len() + 1);
    let mut remaining = files.into_iter();

    while let Some(upload) = remaining.next() {
        let block = read_block(store, &upload).await;
        // The blob is finished with whether or not the read succeeded.
        store.delete(&upload.handle).await;

        match block {
            Ok(block) => blocks.push(block),
            Err(e) => {
                for unprocessed in remaining {
                    store.delete(&unprocessed.handle).await;
                }
                return Err(e);
            }
        }
    }

    if !prompt.is_empty() {
        blocks.push(ContentBlock::text(prompt));
    }

    debug!(blocks = blocks.len(), "Assembled content blocks");
    Ok(blocks)
}

async fn read_block(store: &BlobStore, upload: &StoredUpload) -> Result<ContentBlock, GatewayError> {
    match upload.category {
        FileCategory::Image => {
            let data = store.read_base64(&upload.handle).await?;
            // Use the registry's canonical MIME type rather than the client's
            // declared one, which may carry parameters.
            let media_type = crate::registry::rule_for(&upload.file.extension)
                .map_or_else(
                    || upload.file.declared_media_type.clone(),
                    |rule| rule.mime_type.to_string(),
                );
            Ok(ContentBlock::image(media_type, data))
        }
        FileCategory::Text | FileCategory::Document | FileCategory::Code | FileCategory::Data => {
            let body = store.read_text(&upload.handle).await?;
            Ok(ContentBlock::text(format!(
                "Content of file {}:\n\n{body}",
                upload.file.original_name
            )))
        }
    }
}
