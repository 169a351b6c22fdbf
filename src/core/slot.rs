use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use super::frame::FrameBuffer;

/// Single-slot handoff between the capture thread and the render thread
///
/// Holds at most one pending frame. The pointer doubles as the "new frame
/// available" flag: non-null means dirty. Publishing swaps the new frame in
/// with release ordering and frees whatever was pending; taking swaps null in
/// with acquire ordering, so the consumer only ever sees a fully written
/// buffer. Frames published faster than they are taken collapse into the
/// latest one (drop-oldest). Neither side blocks.
pub struct LatestFrameSlot {
    pending: AtomicPtr<FrameBuffer>,
}

// SAFETY: the slot owns the boxed frame behind `pending` exclusively; every
// access to it goes through an atomic swap, which hands ownership to exactly
// one caller.
unsafe impl Send for LatestFrameSlot {}
unsafe impl Sync for LatestFrameSlot {}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self {
            pending: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Store `frame` as the pending frame, dropping any unconsumed one
    ///
    /// The caller boxes the frame when it builds it, so publishing only moves
    /// a pointer. Returns true if a pending frame was discarded.
    pub fn publish(&self, frame: Box<FrameBuffer>) -> bool {
        let incoming = Box::into_raw(frame);
        let previous = self.pending.swap(incoming, Ordering::AcqRel);
        if previous.is_null() {
            false
        } else {
            // SAFETY: non-null pointers in `pending` always come from
            // `Box::into_raw`, and the swap made us their only owner.
            drop(unsafe { Box::from_raw(previous) });
            true
        }
    }

    /// Take the pending frame if one was published since the last take
    pub fn take_if_new(&self) -> Option<Box<FrameBuffer>> {
        // Cheap check first so an idle tick never writes to the cache line
        if self.pending.load(Ordering::Relaxed).is_null() {
            return None;
        }

        let taken = self.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if taken.is_null() {
            None
        } else {
            // SAFETY: see `publish`.
            Some(unsafe { Box::from_raw(taken) })
        }
    }

    /// Whether a frame is waiting to be consumed
    pub fn is_dirty(&self) -> bool {
        !self.pending.load(Ordering::Acquire).is_null()
    }

    /// Drop any pending frame
    pub fn clear(&self) {
        drop(self.take_if_new());
    }
}

impl Default for LatestFrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LatestFrameSlot {
    fn drop(&mut self) {
        let pending = *self.pending.get_mut();
        if !pending.is_null() {
            // SAFETY: exclusive access through `&mut self`; see `publish`.
            drop(unsafe { Box::from_raw(pending) });
        }
    }
}

impl std::fmt::Debug for LatestFrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestFrameSlot")
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
