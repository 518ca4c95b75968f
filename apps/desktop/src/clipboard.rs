use arboard::Clipboard;
use excuse_core::orchestrator::{ClipboardError, ClipboardSink};

/// System clipboard, opened per write.
pub struct ArboardClipboard;

impl ClipboardSink for ArboardClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|err| ClipboardError::Write(err.to_string()))
    }
}
