//! GPIO-related types and the board pin collaborator trait.

/// Logical board pin number, as printed on the silkscreen.
pub type PinId = u8;

/// Digital level of an input or output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Digital low level.
    Low,
    /// Digital high level.
    High,
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => false,
            Level::High => true,
        }
    }
}

impl From<bool> for Level {
    fn from(boolean: bool) -> Self {
        if boolean {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<embedded_hal::digital::PinState> for Level {
    fn from(pin_state: embedded_hal::digital::PinState) -> Self {
        bool::from(pin_state).into()
    }
}

impl From<Level> for embedded_hal::digital::PinState {
    fn from(level: Level) -> Self {
        bool::from(level).into()
    }
}

/// GPIO port groups of the SoC, as recognized by the pin description table.
///
/// The two small ports carry eight pins each, the large one thirty-two; a
/// pin's interrupt enable bit lives in its port's register bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPort {
    /// First 8-bit port.
    Gpio8b0,
    /// Second 8-bit port.
    Gpio8b1,
    /// 32-bit port.
    Gpio32,
}

impl GpioPort {
    /// Number of recognized port groups.
    pub const COUNT: usize = 3;

    /// Index of this port group, in `0..COUNT`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Gpio8b0 => 0,
            Self::Gpio8b1 => 1,
            Self::Gpio32 => 2,
        }
    }
}

/// Pin multiplexer function select.
///
/// The mux has a 2-bit select field per SoC pin; which peripheral function
/// sits behind each mode is a property of the pin, not of the mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MuxMode {
    /// Function select 0.
    ModeA,
    /// Function select 1.
    ModeB,
    /// Function select 2.
    ModeC,
    /// Function select 3.
    ModeD,
}

/// Classification of a pin for interrupt participation purposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinClass {
    /// The pin sits on one of the recognized port groups, at the given bit
    /// position within the group.
    Port(GpioPort, u8),
    /// Valid pin that belongs to none of the recognized groups.
    Other,
}

/// Pin-description entry for one logical pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinDescription {
    /// SoC pin behind the logical pin; the identity the pin multiplexer
    /// works with.
    pub soc_pin: u8,
    /// Port-group classification.
    pub class: PinClass,
}

/// Access to the board's pin description table and GPIO ports.
///
/// Implemented by the board support layer. Peripheral drivers consume it for
/// chip-select handling, pin multiplexing and interrupt-source
/// classification; they never reach into the pin-mux or GPIO registers
/// directly.
pub trait BoardPins {
    /// Looks up the description of `pin`.
    ///
    /// Returns `None` when the pin id is out of range for the board.
    fn describe(&self, pin: PinId) -> Option<PinDescription>;

    /// Reads the current level of `pin`.
    fn read(&self, pin: PinId) -> Level;

    /// Drives `pin` to `level`.
    ///
    /// The data register is updated even while the pin is not configured as
    /// an output, so a level can be staged before switching direction.
    fn write(&mut self, pin: PinId, level: Level);

    /// Configures `pin` as a general purpose output.
    fn set_output(&mut self, pin: PinId);

    /// Selects `mode` on the pin multiplexer for `soc_pin` and updates the
    /// cached pin-mode metadata.
    fn set_mux(&mut self, soc_pin: u8, mode: MuxMode);
}
