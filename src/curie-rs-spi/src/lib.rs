#![cfg_attr(not(test), no_std)]

//! Driver for the memory-mapped SPI master controllers of the Quark SE C1000.
//!
//! Each [`SpiController`] owns one controller's register block and provides:
//!
//! - a reference-counted lifecycle ([`SpiController::start`] /
//!   [`SpiController::stop`]) that gates the peripheral clock, the
//!   chip-select GPIO and the bus pin multiplexing,
//! - clock divider and data mode configuration with the
//!   disable-modify-re-enable sequence the controller requires,
//! - a per-GPIO-port tracker of interrupt sources that have to be suppressed
//!   while an SPI transaction holds the bus ([`InterruptMode`]).
//!
//! Byte transfer, the pin description table and the global interrupt toggles
//! live elsewhere; the driver reaches the board through
//! [`curie_rs_hal_common::gpio::BoardPins`] and exposes its aggregated
//! interrupt state to the transfer subsystem read-only.

mod controller;
mod regs;
mod tracker;

pub use controller::{
    SpiController, SpiDevice, SpiPins, CLOCK_DIV128, CLOCK_DIV16, CLOCK_DIV2, CLOCK_DIV32,
    CLOCK_DIV4, CLOCK_DIV64, CLOCK_DIV8, CLOCK_DIV_DEFAULT,
};
pub use tracker::{GroupBits, InterruptMode};

pub use curie_rs_hal_common::spi::{BitOrder, Mode};
