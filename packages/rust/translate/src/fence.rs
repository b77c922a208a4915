//! Code-fence accumulator.
//!
//! A two-state machine fed every raw line before any other classification.
//! Running it first keeps blank lines and `#`-prefixed comments inside a
//! fenced region from being taken for structural markup, and preserves the
//! content's original whitespace verbatim.

use pagelift_shared::{Block, TextSpan};

/// Fence delimiter marker.
const FENCE_MARKER: &str = "```";

/// Language recorded when the opening fence declares none.
const DEFAULT_LANGUAGE: &str = "plain text";

/// Outcome of feeding one line to the accumulator.
#[derive(Debug)]
pub(crate) enum FenceAction {
    /// A closing fence completed a code block.
    Emit(Block),
    /// The line was a fence delimiter or content inside a fence.
    Consumed,
    /// Not fence-related; classify the line normally.
    NotConsumed,
}

/// Per-document fence state. One instance per translation pass.
#[derive(Debug)]
pub(crate) struct FenceState {
    active: bool,
    language: String,
    buffer: String,
}

impl FenceState {
    pub(crate) fn new() -> Self {
        Self {
            active: false,
            language: DEFAULT_LANGUAGE.to_string(),
            buffer: String::new(),
        }
    }

    /// Feed one raw (unstripped) line.
    pub(crate) fn feed(&mut self, raw_line: &str) -> FenceAction {
        let stripped = raw_line.trim();

        if stripped.starts_with(FENCE_MARKER) {
            if self.active {
                // Closing fence: trim exactly one trailing newline and emit.
                if self.buffer.ends_with('\n') {
                    self.buffer.pop();
                }
                let block = Block::Code {
                    rich_text: TextSpan::plain(std::mem::take(&mut self.buffer)),
                    language: std::mem::replace(
                        &mut self.language,
                        DEFAULT_LANGUAGE.to_string(),
                    ),
                };
                self.active = false;
                return FenceAction::Emit(block);
            }

            // Opening fence: capture the declared language, reset the buffer.
            let declared = stripped[FENCE_MARKER.len()..].trim();
            self.language = if declared.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                declared.to_string()
            };
            self.buffer.clear();
            self.active = true;
            return FenceAction::Consumed;
        }

        if self.active {
            // Verbatim, including indentation and blank lines.
            self.buffer.push_str(raw_line);
            self.buffer.push('\n');
            return FenceAction::Consumed;
        }

        FenceAction::NotConsumed
    }

    /// Consume the state at end of input. Returns content buffered by a fence
    /// that was never closed, which the driver drops with a diagnostic.
    pub(crate) fn finish(self) -> Option<String> {
        if self.active && !self.buffer.is_empty() {
            Some(self.buffer)
        } else {
            None
        }
    }
}
