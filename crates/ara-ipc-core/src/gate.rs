//! Render access gate.
//!
//! Render threads must never block, so model edits and rendering are kept
//! apart with a flag and an in-flight counter instead of a lock. A renderer
//! calls [`RenderAccessGate::try_enter`] at the top of each block and renders
//! silence when it is refused; the editing side calls
//! [`RenderAccessGate::disable`], which spins until in-flight renders leave.
//!
//! Each side stores its own atomic and then loads the other's; both pairs
//! must be `SeqCst` or the two loads can both read stale values.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct RenderAccessGate {
    enabled: AtomicBool,
    in_flight: AtomicU32,
}

impl Default for RenderAccessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderAccessGate {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            in_flight: AtomicU32::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enter a render section, or `None` while access is disabled.
    pub fn try_enter(&self) -> Option<RenderGuard<'_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.enabled.load(Ordering::SeqCst) {
            Some(RenderGuard { gate: self })
        } else {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            None
        }
    }

    /// Refuse new render sections and wait for running ones to finish.
    ///
    /// Must not be called from a render thread while it holds a guard.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            std::hint::spin_loop();
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }
}

/// Proof of an active render section; leaving drops the in-flight count.
#[derive(Debug)]
pub struct RenderGuard<'a> {
    gate: &'a RenderAccessGate,
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
