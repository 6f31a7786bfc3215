//! Incremental content buffer with human-readable flush boundaries.
//!
//! Raw provider fragments are often a handful of characters; emitting each
//! one produces choppy client output. The buffer trades a small fixed
//! latency for chunk boundaries a reader can follow: flush on a sentence
//! boundary once enough text has accumulated, flush mid-sentence on a word
//! boundary once the buffer is long, otherwise ask the caller to arm a
//! short deferred flush.
//!
//! ```rust
//! use gchat::{ContentBuffer, FlushSignal};
//!
//! let mut buffer = ContentBuffer::default();
//! assert_eq!(buffer.push("Coolant temperature is "), FlushSignal::Deferred);
//! assert_eq!(buffer.push("within the normal range.\n"), FlushSignal::Now);
//! assert_eq!(buffer.take().as_deref(), Some("Coolant temperature is within the normal range."));
//! ```

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Minimum accumulated length before a sentence boundary flushes.
    pub sentence_flush_len: usize,
    /// Accumulated length at which a word boundary is enough to flush.
    pub word_flush_len: usize,
    /// Delay for the deferred flush armed when neither rule fires.
    pub deferred_flush: Duration,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            sentence_flush_len: 20,
            word_flush_len: 40,
            deferred_flush: Duration::from_millis(100),
        }
    }
}

/// What the caller should do after pushing a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushSignal {
    /// Flush immediately via [`ContentBuffer::take`].
    Now,
    /// Arm (or re-arm, cancelling the prior one) the deferred flush timer.
    Deferred,
}

#[derive(Debug, Default)]
pub struct ContentBuffer {
    text: String,
    policy: BufferPolicy,
}

impl ContentBuffer {
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            text: String::new(),
            policy,
        }
    }

    /// Appends a fragment and evaluates the flush rules in order.
    pub fn push(&mut self, fragment: &str) -> FlushSignal {
        self.text.push_str(fragment);
        let length = self.text.chars().count();

        if length >= self.policy.sentence_flush_len && has_sentence_boundary(&self.text) {
            return FlushSignal::Now;
        }

        if length >= self.policy.word_flush_len && ends_on_word_boundary(&self.text) {
            return FlushSignal::Now;
        }

        FlushSignal::Deferred
    }

    /// Drains the buffer, returning the trimmed text when non-empty.
    pub fn take(&mut self) -> Option<String> {
        let chunk = self.text.trim().to_string();
        self.text.clear();

        if chunk.is_empty() { None } else { Some(chunk) }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn deferred_flush(&self) -> Duration {
        self.policy.deferred_flush
    }
}

/// Terminal punctuation followed by whitespace or end of buffer, or any
/// line break.
fn has_sentence_boundary(text: &str) -> bool {
    if text.contains('\n') {
        return true;
    }

    let mut chars = text.chars().peekable();
    while let Some(current) = chars.next() {
        if matches!(current, '.' | '!' | '?') {
            match chars.peek() {
                None => return true,
                Some(next) if next.is_whitespace() => return true,
                _ => {}
            }
        }
    }

    false
}

fn ends_on_word_boundary(text: &str) -> bool {
    matches!(
        text.chars().next_back(),
        Some(last) if last.is_whitespace() || last.is_ascii_punctuation()
    )
}
