//! Append-only byte accumulator with a flush threshold.
//!
//! Unlike a ring buffer, nothing is ever overwritten: chunks accumulate
//! until the threshold is reached, the whole buffer is taken for a flush,
//! and accumulation starts over from empty.  The streaming assembler owns
//! exactly one of these behind a mutex.
//!
//! # Example
//!
//! ```rust
//! use asr_relay::stream::ChunkBuffer;
//!
//! let mut buf = ChunkBuffer::new(8);
//! buf.push(b"abcd");
//! assert!(!buf.is_ready());
//! buf.push(b"efgh");
//! assert!(buf.is_ready());
//!
//! let bytes = buf.take();
//! assert_eq!(bytes, b"abcdefgh");
//! assert!(buf.is_empty());
//! ```

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// Accumulates audio bytes until the flush threshold is reached.
///
/// The buffer never caps its own growth — a single oversized `push` simply
/// makes the next flush larger than the threshold.  Bounding input is the
/// job of the assembler's bounded queue, not the accumulator.
pub struct ChunkBuffer {
    data: Vec<u8>,
    threshold: usize,
}

impl ChunkBuffer {
    /// Create a buffer that reports ready at `threshold` accumulated bytes.
    ///
    /// # Panics
    ///
    /// Panics if `threshold == 0`.
    pub fn new(threshold: usize) -> Self {
        assert!(threshold > 0, "ChunkBuffer threshold must be > 0");
        Self {
            data: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Append `chunk` to the buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// Returns `true` once at least `threshold` bytes have accumulated.
    pub fn is_ready(&self) -> bool {
        self.data.len() >= self.threshold
    }

    /// Take all accumulated bytes, resetting the buffer to empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Number of bytes currently accumulated.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The configured flush threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Threshold behaviour -----------------------------------------------

    #[test]
    fn below_threshold_is_not_ready() {
        let mut buf = ChunkBuffer::new(8);
        buf.push(b"abc");
        assert!(!buf.is_ready());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn exactly_threshold_is_ready() {
        let mut buf = ChunkBuffer::new(8);
        buf.push(b"abcd");
        buf.push(b"efgh");
        assert!(buf.is_ready());
    }

    #[test]
    fn over_threshold_is_ready() {
        let mut buf = ChunkBuffer::new(4);
        buf.push(b"abcdefgh");
        assert!(buf.is_ready());
        assert_eq!(buf.len(), 8);
    }

    // ---- Take semantics ----------------------------------------------------

    #[test]
    fn take_returns_bytes_in_push_order_and_resets() {
        let mut buf = ChunkBuffer::new(8);
        buf.push(b"abcd");
        buf.push(b"efgh");

        let bytes = buf.take();
        assert_eq!(bytes, b"abcdefgh");
        assert!(buf.is_empty());
        assert!(!buf.is_ready());
    }

    #[test]
    fn take_empty_returns_empty_vec() {
        let mut buf = ChunkBuffer::new(8);
        assert_eq!(buf.take(), Vec::<u8>::new());
    }

    #[test]
    fn reuse_after_take() {
        let mut buf = ChunkBuffer::new(4);
        buf.push(b"abcd");
        assert_eq!(buf.take(), b"abcd");

        buf.push(b"xy");
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.take(), b"xy");
    }

    // ---- Panic guard -------------------------------------------------------

    #[test]
    #[should_panic(expected = "ChunkBuffer threshold must be > 0")]
    fn zero_threshold_panics() {
        let _buf = ChunkBuffer::new(0);
    }
}
