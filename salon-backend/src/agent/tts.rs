//! Buffering of streamed assistant text into speakable segments

use std::time::{Duration, Instant};

/// Upper bound for one synthesis request
pub const MAX_CHUNK_CHARS: usize = 400;

/// Collects tokens and releases them in segments, either every `max_tokens`
/// tokens or once `max_wait` has passed since the last release.
#[derive(Debug)]
pub struct TtsBuffer {
    buffer: String,
    tokens: usize,
    max_tokens: usize,
    max_wait: Duration,
    last_flush: Instant,
}

impl TtsBuffer {
    pub fn new(max_tokens: usize, max_wait: Duration, now: Instant) -> Self {
        Self {
            buffer: String::new(),
            tokens: 0,
            max_tokens: max_tokens.max(1),
            max_wait,
            last_flush: now,
        }
    }

    pub fn push(&mut self, token: &str, now: Instant) -> Option<String> {
        self.buffer.push_str(token);
        self.tokens += 1;
        let waited = now.saturating_duration_since(self.last_flush);
        if self.tokens >= self.max_tokens || waited >= self.max_wait {
            self.take(now)
        } else {
            None
        }
    }

    /// Drain whatever is left; whitespace-only remainders are dropped
    pub fn flush(&mut self, now: Instant) -> Option<String> {
        let out = self.take(now);
        self.buffer.clear();
        self.tokens = 0;
        out
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    // Whitespace-only content stays buffered so it is not lost between segments
    fn take(&mut self, now: Instant) -> Option<String> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        self.tokens = 0;
        self.last_flush = now;
        Some(std::mem::take(&mut self.buffer))
    }
}

/// Split text into chunks of at most `max_chars` characters, cutting at the
/// last sentence end, else the last whitespace, else mid-word. Chunks are
/// trimmed and never empty.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };
        let window = &rest[..limit];
        let cut = window
            .rfind(['.', '!', '?', '\n'])
            .map(|idx| idx + 1)
            .or_else(|| window.rfind(char::is_whitespace).filter(|&idx| idx > 0))
            .unwrap_or(limit);

        let chunk = rest[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    chunks
}
