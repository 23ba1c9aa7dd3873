//! One-bit completion handoff between the interrupt handler and the
//! polling loop.
//!
//! The transceiver signals completion of whatever operation was last
//! started by raising a hardware interrupt. The interrupt routine's only
//! job is to set this flag; the controller clears it immediately before
//! starting a new operation. The flag is therefore the mutual-exclusion
//! primitive for the shared transceiver: at most one operation is
//! outstanding whenever the flag reads false.

use core::sync::atomic::{AtomicBool, Ordering};

/// Completion flag shared between one controller and its interrupt routine.
///
/// Place the flag in a `static` and hand `&'static ActionFlag` to both
/// sides:
///
/// ```
/// use lora_radio::flag::ActionFlag;
///
/// static ACTION_DONE: ActionFlag = ActionFlag::new();
///
/// // interrupt context: nothing but the store
/// fn on_dio1_irq() {
///     ACTION_DONE.signal();
/// }
/// ```
///
/// Invariants: the interrupt side only ever calls [`signal`](Self::signal);
/// the poll side is the only caller of [`clear`](Self::clear). The flag
/// starts set, meaning the radio is idle and the first action may proceed.
#[derive(Debug)]
pub struct ActionFlag {
    done: AtomicBool,
}

impl ActionFlag {
    /// Create a flag in the idle (set) state.
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(true),
        }
    }

    /// Mark the outstanding operation complete. Interrupt-side call.
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// True when no operation is outstanding.
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Claim the action slot ahead of starting a new operation. Poll-side
    /// call; must only follow an `is_set() == true` observation.
    pub fn clear(&self) {
        self.done.store(false, Ordering::Release);
    }
}

impl Default for ActionFlag {
    fn default() -> Self {
        Self::new()
    }
}
