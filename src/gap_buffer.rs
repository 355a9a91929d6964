//! A text gap buffer.
//!
//! Text is split at a cursor into the part before it (`left`) and the part
//! after it (`right`). Typing appends to `left`; moving the cursor shifts
//! characters between the two halves. Positions count characters, not
//! bytes.

use std::fmt as StdFmt;

use parking_lot::Mutex;

use crate::tracing_helpers::trace_log;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Gap {
    left: String,
    right: String,
}

/// Byte offset of the `n`th character boundary of `s`, counting from the
/// start. `None` if `s` has fewer than `n` characters.
fn boundary(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(n)
}

/// Text with a cursor, safe to share between threads.
///
/// ```rust
/// use hashtree::GapBuffer;
///
/// let buffer = GapBuffer::new(["hello", " ", "world"]);
/// buffer.move_cursor(-5);
/// buffer.insert("big ");
/// assert_eq!(buffer.text(), "hello big world");
/// ```
#[derive(Default)]
pub struct GapBuffer {
    gap: Mutex<Gap>,
}

impl StdFmt::Debug for GapBuffer {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        let gap = self.gap.lock();
        f.debug_struct("GapBuffer")
            .field("left", &gap.left)
            .field("right", &gap.right)
            .finish()
    }
}

impl GapBuffer {
    /// Create a buffer from text chunks, with the cursor after the last one.
    #[must_use]
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut left = String::new();
        for chunk in chunks {
            left.push_str(chunk.as_ref());
        }
        Self {
            gap: Mutex::new(Gap {
                left,
                right: String::new(),
            }),
        }
    }

    /// Insert text at the cursor. The cursor ends after the inserted text.
    pub fn insert(&self, text: &str) {
        self.gap.lock().left.push_str(text);
    }

    /// Move the cursor by `steps` characters: positive moves right, negative
    /// moves left.
    ///
    /// A move past either end of the text does nothing. Returns whether the
    /// cursor moved.
    pub fn move_cursor(&self, steps: isize) -> bool {
        if steps == 0 {
            return false;
        }

        let mut gap = self.gap.lock();
        let count: usize = steps.unsigned_abs();

        if steps > 0 {
            let Some(at) = boundary(&gap.right, count) else {
                trace_log!(steps, "gap buffer: move past end ignored");
                return false;
            };
            let moved: String = gap.right.drain(..at).collect();
            gap.left.push_str(&moved);
        } else {
            let Some(keep) = gap.left.chars().count().checked_sub(count) else {
                trace_log!(steps, "gap buffer: move past start ignored");
                return false;
            };
            let Some(at) = boundary(&gap.left, keep) else {
                return false;
            };
            let moved: String = gap.left.split_off(at);
            gap.right.insert_str(0, &moved);
        }
        true
    }

    /// Move the cursor one character right.
    pub fn move_right(&self) -> bool {
        self.move_cursor(1)
    }

    /// Text before the cursor.
    #[must_use]
    pub fn left(&self) -> String {
        self.gap.lock().left.clone()
    }

    /// Text after the cursor.
    #[must_use]
    pub fn right(&self) -> String {
        self.gap.lock().right.clone()
    }

    /// The whole text.
    #[must_use]
    pub fn text(&self) -> String {
        let gap = self.gap.lock();
        let mut out = String::with_capacity(gap.left.len() + gap.right.len());
        out.push_str(&gap.left);
        out.push_str(&gap.right);
        out
    }

    /// Cursor position in characters from the start.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.gap.lock().left.chars().count()
    }
}
