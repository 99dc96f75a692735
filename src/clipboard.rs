//! System clipboard output.

use crate::error::{Error, Result};
use tracing::debug;

/// Replaces the clipboard contents with `text`.
///
/// # Errors
///
/// Returns an error if no clipboard is available (e.g. a headless session)
/// or the write is rejected.
pub fn copy_text(text: &str) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| Error::clipboard(format!("init: {e}")))?;
    clipboard
        .set_text(text.to_owned())
        .map_err(|e| Error::clipboard(format!("set: {e}")))?;

    debug!("Copied {} bytes to the clipboard", text.len());
    Ok(())
}
