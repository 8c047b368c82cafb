#![cfg_attr(not(test), no_std)]

//! Hardware-agnostic types shared by the curie-rs crates.
//!
//! Peripheral drivers consume the board support layer through the seams
//! defined here ([`gpio::BoardPins`]) instead of talking to pin-mux and GPIO
//! registers themselves, so that board definitions stay swappable and the
//! drivers stay testable off-target.

pub mod gpio;
pub mod spi;
