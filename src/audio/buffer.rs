// Buffer ring - Lock-free block exchange between the fill loop and the transfer
//
// A fixed set of fixed-size blocks shared by exactly two parties:
// - the producer (fill loop) owns `filling` and writes block contents,
// - the consumer (completion-notification handler) owns `playing` and re-arms
//   the transfer.
//
// Neither side ever takes a lock. Each index has a single writer; the other
// side only reads it. Block contents are stored as word-sized atomics, so a
// consumer that overtakes a slow producer reads stale or mixed audio rather
// than undefined memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::audio::frame::StereoFrame;

/// Value of `playing` while the ring is being pre-filled
pub const NO_SLOT: usize = usize::MAX;

/// Stale transfers every start produces even with an eager producer: the
/// last primed block is armed first and comes round again one lap later.
pub const STARTUP_REPEATS: u64 = 1;

/// One block of packed stereo frames
pub struct Block {
    frames: Box<[AtomicU32]>,
}

impl Block {
    fn new(len: usize) -> Self {
        Self {
            frames: (0..len).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Read one frame
    #[inline]
    pub fn frame(&self, index: usize) -> StereoFrame {
        StereoFrame::unpack(self.frames[index].load(Ordering::Relaxed))
    }

    /// Copy the packed words into `out` (up to the shorter of the two)
    #[inline]
    pub fn copy_to(&self, out: &mut [u32]) {
        for (dst, src) in out.iter_mut().zip(self.frames.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
    }

    #[inline]
    fn store(&self, index: usize, frame: StereoFrame) {
        self.frames[index].store(frame.pack(), Ordering::Relaxed);
    }
}

/// The transfer mechanism as seen from the completion handler
///
/// Implementations must latch `block` synchronously: once `rearm` returns the
/// producer is free to start rewriting that slot on its next lap.
pub trait TransferTarget {
    fn rearm(&mut self, slot: usize, block: &Block);
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Number of transfers armed since start
    pub transfers: u64,
    /// Transfers armed from a block the producer had not refilled
    pub repeated_blocks: u64,
}

pub struct BufferRing {
    blocks: Box<[Block]>,
    // Set by the producer on commit, cleared by the consumer when armed
    fresh: Box<[AtomicBool]>,
    playing: AtomicUsize,
    filling: AtomicUsize,
    transfers: AtomicU64,
    repeated_blocks: AtomicU64,
}

impl BufferRing {
    /// Create a ring of `depth` blocks of `frames_per_block` frames each.
    ///
    /// The ring starts in its priming state: `playing` holds `NO_SLOT` so the
    /// producer can fill every slot before the first transfer is armed.
    pub fn new(depth: usize, frames_per_block: usize) -> Self {
        assert!(depth >= 2, "Buffer ring needs at least 2 blocks");
        assert!(frames_per_block > 0, "Blocks must hold at least 1 frame");

        Self {
            blocks: (0..depth).map(|_| Block::new(frames_per_block)).collect(),
            fresh: (0..depth).map(|_| AtomicBool::new(false)).collect(),
            playing: AtomicUsize::new(NO_SLOT),
            filling: AtomicUsize::new(0),
            transfers: AtomicU64::new(0),
            repeated_blocks: AtomicU64::new(0),
        }
    }

    /// Split into the producer and consumer halves
    pub fn split(self) -> (RingProducer, RingConsumer) {
        let ring = Arc::new(self);
        (
            RingProducer {
                ring: Arc::clone(&ring),
            },
            RingConsumer { ring },
        )
    }

    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn frames_per_block(&self) -> usize {
        self.blocks[0].len()
    }

    /// Index the completion handler will arm next (`NO_SLOT` while priming)
    pub fn playing(&self) -> usize {
        self.playing.load(Ordering::Acquire)
    }

    /// Index the producer will fill next
    pub fn filling(&self) -> usize {
        self.filling.load(Ordering::Acquire)
    }

    pub fn block(&self, slot: usize) -> &Block {
        &self.blocks[slot]
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            transfers: self.transfers.load(Ordering::Relaxed),
            repeated_blocks: self.repeated_blocks.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn next_index(&self, index: usize) -> usize {
        if index + 1 == self.blocks.len() {
            0
        } else {
            index + 1
        }
    }
}

/// Fill-loop half of the ring. Sole writer of `filling` and of block contents.
pub struct RingProducer {
    ring: Arc<BufferRing>,
}

impl RingProducer {
    /// Slot to fill next, or `None` when it is the one pending playback.
    ///
    /// Before the consumer starts, a slot is free only until it holds an
    /// unplayed block, so priming stops after exactly one lap.
    #[inline]
    pub fn next_fillable_slot(&self) -> Option<usize> {
        let filling = self.ring.filling.load(Ordering::Relaxed);
        let playing = self.ring.playing.load(Ordering::Acquire);
        if playing == NO_SLOT {
            return (!self.ring.fresh[filling].load(Ordering::Acquire)).then_some(filling);
        }
        (filling != playing).then_some(filling)
    }

    /// Render every frame of `slot`.
    ///
    /// `slot` must be the value just returned by `next_fillable_slot`.
    pub fn fill_slot<F>(&mut self, slot: usize, mut render: F)
    where
        F: FnMut() -> StereoFrame,
    {
        debug_assert_eq!(slot, self.ring.filling.load(Ordering::Relaxed));
        let block = &self.ring.blocks[slot];
        for index in 0..block.len() {
            block.store(index, render());
        }
    }

    /// Publish the slot just written and move `filling` on
    #[inline]
    pub fn commit_fill(&mut self) {
        let filling = self.ring.filling.load(Ordering::Relaxed);
        self.ring.fresh[filling].store(true, Ordering::Release);
        self.ring
            .filling
            .store(self.ring.next_index(filling), Ordering::Release);
    }

    /// Fill and commit the next slot if one is available.
    ///
    /// Returns the slot written, or `None` under backpressure.
    pub fn fill_next<F>(&mut self, render: F) -> Option<usize>
    where
        F: FnMut() -> StereoFrame,
    {
        let slot = self.next_fillable_slot()?;
        self.fill_slot(slot, render);
        self.commit_fill();
        Some(slot)
    }

    pub fn ring(&self) -> &BufferRing {
        &self.ring
    }

    /// Read-only handle for diagnostics
    pub fn monitor(&self) -> RingMonitor {
        RingMonitor {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Completion-handler half of the ring. Sole writer of `playing`.
pub struct RingConsumer {
    ring: Arc<BufferRing>,
}

impl RingConsumer {
    /// Leave the priming state and arm the first transfer.
    ///
    /// `playing` is pointed at the last pre-filled slot, which is therefore
    /// the first block transferred.
    pub fn start<T: TransferTarget>(&mut self, target: &mut T) {
        let depth = self.ring.depth();
        let filling = self.ring.filling.load(Ordering::Acquire);
        self.ring
            .playing
            .store((filling + depth - 1) % depth, Ordering::Release);
        self.on_transfer_complete(target);
    }

    /// Completion notification: arm the block at `playing`, then advance it.
    ///
    /// O(1); touches nothing but the two ring indices, one flag and the
    /// counters.
    #[inline]
    pub fn on_transfer_complete<T: TransferTarget>(&mut self, target: &mut T) {
        let slot = self.ring.playing.load(Ordering::Relaxed);
        if slot == NO_SLOT {
            return;
        }

        if !self.ring.fresh[slot].swap(false, Ordering::AcqRel) {
            self.ring.repeated_blocks.fetch_add(1, Ordering::Relaxed);
        }
        target.rearm(slot, &self.ring.blocks[slot]);
        self.ring.transfers.fetch_add(1, Ordering::Relaxed);

        self.ring
            .playing
            .store(self.ring.next_index(slot), Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.ring.playing.load(Ordering::Relaxed) != NO_SLOT
    }

    pub fn ring(&self) -> &BufferRing {
        &self.ring
    }
}

/// Shared read-only view used by the control loop to report diagnostics
#[derive(Clone)]
pub struct RingMonitor {
    ring: Arc<BufferRing>,
}

impl RingMonitor {
    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    pub fn depth(&self) -> usize {
        self.ring.depth()
    }

    pub fn frames_per_block(&self) -> usize {
        self.ring.frames_per_block()
    }
}
