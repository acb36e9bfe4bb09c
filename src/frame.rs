//! Stream frames.
//!
//! Each UDP datagram of the sample stream carries one [`StreamFrame`]: a
//! 16-bit little-endian frame counter followed by one burst of
//! [`BURST_WORDS`] FIFO words. Each word holds an IQ sample, with the
//! in-phase component in the low 16 bits and the quadrature component in the
//! high 16 bits, so the word is stored little-endian as `I_lo I_hi Q_lo Q_hi`.

/// Number of FIFO words in a burst, and in the payload of a frame.
pub const BURST_WORDS: usize = 256;

/// Size of the frame counter header in bytes.
pub const HEADER_LEN: usize = 2;

/// Size of a frame in bytes.
pub const FRAME_LEN: usize = HEADER_LEN + BURST_WORDS * WORD_LEN;

const WORD_LEN: usize = std::mem::size_of::<u32>();

/// Stream frame.
///
/// A frame always has exactly [`FRAME_LEN`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamFrame([u8; FRAME_LEN]);

impl StreamFrame {
    /// Creates a frame with all its bytes set to zero.
    pub fn new() -> StreamFrame {
        StreamFrame([0; FRAME_LEN])
    }

    /// Returns the frame counter.
    pub fn counter(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// Sets the frame counter.
    pub fn set_counter(&mut self, counter: u16) {
        self.0[..HEADER_LEN].copy_from_slice(&counter.to_le_bytes());
    }

    /// Returns the FIFO word at position `index` of the payload.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than [`BURST_WORDS`].
    pub fn word(&self, index: usize) -> u32 {
        let offset = Self::word_offset(index);
        u32::from_le_bytes([
            self.0[offset],
            self.0[offset + 1],
            self.0[offset + 2],
            self.0[offset + 3],
        ])
    }

    /// Sets the FIFO word at position `index` of the payload.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than [`BURST_WORDS`].
    pub fn set_word(&mut self, index: usize, word: u32) {
        let offset = Self::word_offset(index);
        self.0[offset..offset + WORD_LEN].copy_from_slice(&word.to_le_bytes());
    }

    /// Returns an iterator over the FIFO words of the payload.
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        (0..BURST_WORDS).map(|n| self.word(n))
    }

    /// Returns the IQ sample at position `index` of the payload.
    ///
    /// The sample is given as `(i, q)`.
    pub fn sample(&self, index: usize) -> (i16, i16) {
        let word = self.word(index);
        (word as u16 as i16, (word >> 16) as u16 as i16)
    }

    /// Returns the bytes of the frame as they are sent over the network.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    fn word_offset(index: usize) -> usize {
        assert!(index < BURST_WORDS, "word index {index} out of range");
        HEADER_LEN + WORD_LEN * index
    }
}

impl Default for StreamFrame {
    fn default() -> StreamFrame {
        StreamFrame::new()
    }
}

impl std::fmt::Debug for StreamFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFrame")
            .field("counter", &self.counter())
            .finish_non_exhaustive()
    }
}

/// Frame counter.
///
/// 16-bit sequence number that wraps around after 65535.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct FrameCounter(u16);

impl FrameCounter {
    /// Creates a frame counter that starts at `value`.
    pub fn new(value: u16) -> FrameCounter {
        FrameCounter(value)
    }

    /// Returns the current value of the counter.
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Advances the counter by one, wrapping around.
    pub fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}
