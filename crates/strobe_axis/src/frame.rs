//! Frame model: payload bytes, side-channel tags, and a send completion.

use std::fmt;

use strobe_sim::SimTime;
use tokio::sync::oneshot;

use crate::error::AxisError;

/// One logical transfer, independent of bus width.
pub struct AxisFrame {
    /// Payload bytes in transfer order.
    pub tdata: Vec<u8>,
    /// Destination tag.
    pub tdest: u64,
    /// User sideband tag.
    pub tuser: u64,
    tx_complete: Option<oneshot::Sender<SimTime>>,
}

impl AxisFrame {
    /// Creates an untagged frame.
    pub fn new(tdata: impl Into<Vec<u8>>) -> Self {
        Self::with_tags(tdata, 0, 0)
    }

    /// Creates a frame carrying destination and user tags.
    pub fn with_tags(tdata: impl Into<Vec<u8>>, tdest: u64, tuser: u64) -> Self {
        Self {
            tdata: tdata.into(),
            tdest,
            tuser,
            tx_complete: None,
        }
    }

    /// Arms the completion signal and returns the side that waits on it.
    ///
    /// The source driver raises it when the final word is accepted. Calling
    /// this again replaces the previous completion, which then reports
    /// [`AxisError::Closed`].
    pub fn completion(&mut self) -> Completion {
        let (tx, rx) = oneshot::channel();
        self.tx_complete = Some(tx);
        Completion { rx }
    }

    /// Number of bus words the payload occupies at `width` bytes per word.
    pub fn word_count(&self, width: u32) -> usize {
        self.tdata.len().div_ceil(width.max(1) as usize)
    }

    /// Splits the payload into words of `width` bytes, zero-padding the last.
    pub fn words(&self, width: u32) -> impl Iterator<Item = Vec<u8>> + '_ {
        let width = width.max(1) as usize;
        self.tdata.chunks(width).map(move |chunk| {
            let mut word = chunk.to_vec();
            word.resize(width, 0);
            word
        })
    }

    /// Masks both tags to the given bit widths.
    pub fn mask_tags(&mut self, dest_bits: u32, user_bits: u32) {
        self.tdest &= tag_mask(dest_bits);
        self.tuser &= tag_mask(user_bits);
    }

    pub(crate) fn take_completion(&mut self) -> Option<oneshot::Sender<SimTime>> {
        self.tx_complete.take()
    }
}

/// All-ones mask for a tag field of `bits` bits.
pub fn tag_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Clones payload and tags; the clone has no completion attached.
impl Clone for AxisFrame {
    fn clone(&self) -> Self {
        Self::with_tags(self.tdata.clone(), self.tdest, self.tuser)
    }
}

impl PartialEq for AxisFrame {
    fn eq(&self, other: &Self) -> bool {
        self.tdata == other.tdata && self.tdest == other.tdest && self.tuser == other.tuser
    }
}

impl Eq for AxisFrame {}

impl fmt::Debug for AxisFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisFrame")
            .field("len", &self.tdata.len())
            .field("tdest", &self.tdest)
            .field("tuser", &self.tuser)
            .field("tdata", &HexBytes(&self.tdata))
            .finish()
    }
}

/// Shortened hex rendering for diagnostics.
struct HexBytes<'a>(&'a [u8]);

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 16;
        for byte in self.0.iter().take(SHOWN) {
            write!(f, "{byte:02x}")?;
        }
        if self.0.len() > SHOWN {
            write!(f, "..(+{})", self.0.len() - SHOWN)?;
        }
        Ok(())
    }
}

/// Waits for a frame's final word to be accepted by the bus.
pub struct Completion {
    rx: oneshot::Receiver<SimTime>,
}

impl Completion {
    /// Resolves with the simulated time of the accepting clock edge.
    pub async fn wait(self) -> Result<SimTime, AxisError> {
        self.rx.await.map_err(|_| AxisError::Closed("source driver"))
    }
}

/// A frame reconstructed by the sink monitor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Payload and the tags observed on the first word.
    pub frame: AxisFrame,
    /// Number of accepted words.
    pub beats: usize,
    /// Time of the clock edge that accepted the last word.
    pub last_at: SimTime,
}
