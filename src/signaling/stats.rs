//! Signaling counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session statistics (atomic, lock-free)
#[derive(Default)]
pub struct SignalingStats {
    pub offers_sent: AtomicU64,
    pub frames_received: AtomicU64,
    /// Valid JSON without a status field
    pub frames_ignored: AtomicU64,
    /// Not JSON or wrong field types
    pub frames_malformed: AtomicU64,
    pub candidates_received: AtomicU64,
}

/// FFI-safe stats snapshot
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalingStatsSnapshot {
    pub offers_sent: u64,
    pub frames_received: u64,
    pub frames_ignored: u64,
    pub frames_malformed: u64,
    pub candidates_received: u64,
}

impl SignalingStats {
    pub fn to_snapshot(&self) -> SignalingStatsSnapshot {
        SignalingStatsSnapshot {
            offers_sent: self.offers_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            candidates_received: self.candidates_received.load(Ordering::Relaxed),
        }
    }
}
