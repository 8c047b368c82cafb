// Mask arrays are indexed by GpioPort::index(), which is `< GpioPort::COUNT`
// by construction.
#![allow(clippy::indexing_slicing)]

//! Interrupt participation tracker.
//!
//! A pin that drives a hardware interrupt and also takes part in SPI bus
//! arbitration must have that interrupt suppressed for the duration of an
//! atomic SPI transaction. This module tracks the set of such pins per GPIO
//! port group, plus an aggregate [`InterruptMode`] the transfer subsystem
//! reads at transaction boundaries. Tracking is pure bookkeeping: the actual
//! interrupt enable/disable toggling stays with the caller.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};
use curie_rs_debug::log::warn;
use curie_rs_hal_common::gpio::{BoardPins, GpioPort, PinClass, PinId};

/// Bit `g` is set iff port group `g` currently has registered pins.
pub type GroupBits = u8;

/// Aggregate interrupt participation state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Per-group tracking is precise.
    Tracking(GroupBits),
    /// A registered pin could not be classified, so every interrupt source
    /// has to be treated as participating. Terminal: removals never leave
    /// this state, only a full lifecycle reinitialization does.
    Overflow,
}

struct State {
    /// One mask per port group, bit set per participating pin.
    masks: [u32; GpioPort::COUNT],
    /// Kept consistent with `masks`: a group's bit is set iff its mask is
    /// non-empty, until `Overflow` is reached.
    mode: InterruptMode,
}

pub(crate) struct InterruptTracker {
    state: Mutex<RefCell<State>>,
}

impl InterruptTracker {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                masks: [0; GpioPort::COUNT],
                mode: InterruptMode::Tracking(0),
            })),
        }
    }

    /// Registers `pin` as an interrupt source participating in SPI
    /// transactions.
    ///
    /// A pin the board cannot classify into a port group (including an
    /// out-of-range pin id) escalates the mode to [`InterruptMode::Overflow`]
    /// and leaves the masks untouched.
    pub(crate) fn add(&self, pins: &impl BoardPins, pin: PinId) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.mode == InterruptMode::Overflow {
                return;
            }
            match pins.describe(pin).map(|desc| desc.class) {
                Some(PinClass::Port(port, bit)) => {
                    let group = port.index();
                    state.masks[group] |= 1 << bit;
                    if let InterruptMode::Tracking(groups) = &mut state.mode {
                        *groups |= 1 << group;
                    }
                }
                _ => {
                    warn!("spi: pin {} is not classifiable, suppressing all interrupt sources", pin);
                    state.mode = InterruptMode::Overflow;
                }
            }
        });
    }

    /// Unregisters `pin`.
    ///
    /// A no-op once overflowed: the unclassifiable pin could have belonged
    /// to any group, so precise tracking cannot be recovered by removals.
    /// Out-of-range pins are ignored here, unlike in [`add`](Self::add),
    /// because clearing nothing is always safe.
    pub(crate) fn remove(&self, pins: &impl BoardPins, pin: PinId) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.mode == InterruptMode::Overflow {
                return;
            }
            if let Some(PinClass::Port(port, bit)) = pins.describe(pin).map(|desc| desc.class) {
                let group = port.index();
                state.masks[group] &= !(1 << bit);
                if state.masks[group] == 0 {
                    if let InterruptMode::Tracking(groups) = &mut state.mode {
                        *groups &= !(1 << group);
                    }
                }
            }
        });
    }

    /// Clears all tracking state. Only called on the controller's first
    /// activation.
    pub(crate) fn reset(&self, cs: CriticalSection<'_>) {
        let mut state = self.state.borrow_ref_mut(cs);
        state.masks = [0; GpioPort::COUNT];
        state.mode = InterruptMode::Tracking(0);
    }

    pub(crate) fn mode(&self) -> InterruptMode {
        critical_section::with(|cs| self.state.borrow_ref(cs).mode)
    }

    pub(crate) fn mask(&self, port: GpioPort) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).masks[port.index()])
    }
}
