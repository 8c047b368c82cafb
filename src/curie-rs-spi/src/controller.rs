//! Controller lifecycle and configuration.

use curie_rs_debug::log::debug;
use curie_rs_hal_common::gpio::{BoardPins, GpioPort, Level, MuxMode, PinId};
use curie_rs_hal_common::spi::{BitOrder, Mode};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::regs::{self, ClockGate, SpiRegs};
use crate::tracker::{InterruptMode, InterruptTracker};

/// Serial clock divider values for the 32 MHz SSI clock, producing the bus
/// rates the classic 16 MHz parts get from their power-of-two dividers.
pub const CLOCK_DIV2: u32 = 4;
pub const CLOCK_DIV4: u32 = 8;
pub const CLOCK_DIV8: u32 = 16;
pub const CLOCK_DIV16: u32 = 32;
pub const CLOCK_DIV32: u32 = 64;
pub const CLOCK_DIV64: u32 = 128;
pub const CLOCK_DIV128: u32 = 256;

/// Power-on default divider (4 MHz bus clock).
pub const CLOCK_DIV_DEFAULT: u32 = CLOCK_DIV4;

const SPI_M0_BASE: usize = 0xB000_1000;
const SPI_M1_BASE: usize = 0xB000_1400;

/// Peripheral clock gate control register in the system control space.
const PERIPH_CLK_GATE_CTL: usize = 0xB080_0018;

/// Pin-mux function select carrying the SPI signals on all three bus pins.
const SPI_MUX_MODE: MuxMode = MuxMode::ModeB;

/// Identity of a physical SPI master controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiDevice {
    /// SPI master 0.
    SpiM0,
    /// SPI master 1.
    SpiM1,
}

impl SpiDevice {
    const fn base_addr(self) -> usize {
        match self {
            Self::SpiM0 => SPI_M0_BASE,
            Self::SpiM1 => SPI_M1_BASE,
        }
    }

    const fn clk_gate_bit(self) -> u32 {
        match self {
            Self::SpiM0 => 1 << 14,
            Self::SpiM1 => 1 << 15,
        }
    }
}

/// Board pin assignment of one controller.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPins {
    /// Chip select, driven as a plain GPIO output; the controller's own
    /// slave-select outputs are unused.
    pub ss: PinId,
    /// Data out.
    pub mosi: PinId,
    /// Data in.
    pub miso: PinId,
    /// Serial clock.
    pub sck: PinId,
}

/// One memory-mapped SPI master controller.
///
/// Constructed once per physical device at system start and passed by
/// reference to anything needing bus access; the two devices are fully
/// independent. All methods take `&self`, so a controller can live in a
/// `static`.
///
/// [`start`](Self::start) and [`stop`](Self::stop) are reference-counted:
/// the hardware is powered and enabled exactly while the count is non-zero.
pub struct SpiController {
    regs: SpiRegs,
    clk_gate: ClockGate,
    pins: SpiPins,
    /// Hardware is powered and enabled iff this is non-zero.
    ref_count: AtomicU32,
    /// Last programmed divider value, after masking.
    clock_divider: AtomicU32,
    /// Last programmed mode field value.
    data_mode: AtomicU32,
    /// Frame size field value used when rebuilding CTRLR0.
    frame_size: AtomicU32,
    /// Reserved: the controller always shifts MSB-first; honoring the flag
    /// is left to the transfer subsystem.
    lsb_first: AtomicBool,
    tracker: InterruptTracker,
}

impl SpiController {
    /// Creates the controller for `dev` with its fixed register addresses.
    ///
    /// At most one controller may exist per physical device.
    #[must_use]
    pub const fn new(dev: SpiDevice, pins: SpiPins) -> Self {
        // SAFETY: base and clock-gate addresses are the fixed register map
        // of this device.
        unsafe {
            Self::from_parts(
                dev.base_addr(),
                PERIPH_CLK_GATE_CTL,
                dev.clk_gate_bit(),
                pins,
            )
        }
    }

    /// Creates a controller from raw register addresses.
    ///
    /// # Safety
    ///
    /// `regs_base` must be the base address of an SSI register block and
    /// `clk_gate_addr` the address of the peripheral clock gate control
    /// register (or of writable memory standing in for them), both valid for
    /// the controller's lifetime. At most one controller may drive a given
    /// register block.
    #[must_use]
    pub const unsafe fn from_parts(
        regs_base: usize,
        clk_gate_addr: usize,
        clk_gate_bit: u32,
        pins: SpiPins,
    ) -> Self {
        Self {
            // SAFETY: forwarded from this function's contract.
            regs: unsafe { SpiRegs::new(regs_base) },
            // SAFETY: forwarded from this function's contract.
            clk_gate: unsafe { ClockGate::new(clk_gate_addr, clk_gate_bit) },
            pins,
            ref_count: AtomicU32::new(0),
            clock_divider: AtomicU32::new(0),
            data_mode: AtomicU32::new(0),
            frame_size: AtomicU32::new(regs::ctrlr0::FRAME_8_BIT),
            lsb_first: AtomicBool::new(false),
            tracker: InterruptTracker::new(),
        }
    }

    /// Takes a reference on the controller, powering it up on the first one.
    ///
    /// The first activation resets the transient state (interrupt tracker,
    /// frame size, bit order), parks the chip select high, ungates the
    /// peripheral clock, programs the power-on defaults and hands the bus
    /// pins to the SPI function. Every later call only bumps the reference
    /// count. Calls must be balanced with [`stop`](Self::stop).
    pub fn start(&self, pins: &mut impl BoardPins) {
        // The count and the one-time bring-up have to be atomic with respect
        // to interrupt handlers and a concurrently starting transaction.
        critical_section::with(|cs| {
            if self.ref_count.load(Ordering::Relaxed) == 0 {
                self.tracker.reset(cs);
                self.frame_size
                    .store(regs::ctrlr0::FRAME_8_BIT, Ordering::Relaxed);
                self.lsb_first.store(false, Ordering::Relaxed);

                // Deselect any connected chip before the controller can
                // drive the bus. The data register is updated even while the
                // pin is still an input.
                pins.write(self.pins.ss, Level::High);
                pins.set_output(self.pins.ss);

                self.regs.disable();
                self.clk_gate.enable();

                self.regs.write(regs::BAUDR, CLOCK_DIV_DEFAULT);
                self.clock_divider
                    .store(CLOCK_DIV_DEFAULT, Ordering::Relaxed);
                let frame_size = self.frame_size.load(Ordering::Relaxed);
                self.regs.write(
                    regs::CTRLR0,
                    (frame_size << regs::ctrlr0::FRAME_SIZE_SHIFT)
                        | (Mode::Mode0.bits() << regs::ctrlr0::MODE_SHIFT),
                );
                self.data_mode.store(Mode::Mode0.bits(), Ordering::Relaxed);

                // Polled operation only.
                self.regs.write(regs::IMR, regs::imr::MASK_ALL);
                // A non-zero slave enable field is mandatory even though the
                // SS signals are unused.
                self.regs.write(regs::SER, regs::ser::SS0);
                self.regs.enable();

                self.mux_bus_pin(pins, self.pins.mosi);
                self.mux_bus_pin(pins, self.pins.miso);
                self.mux_bus_pin(pins, self.pins.sck);

                debug!("spi: controller powered up");
            }
            self.ref_count.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Releases one reference, powering the controller down on the last.
    ///
    /// The final release clears the enable bit and gates the peripheral
    /// clock off; pin multiplexing and the chip-select GPIO keep their
    /// state. Calling with no outstanding reference is a no-op.
    pub fn stop(&self) {
        critical_section::with(|_| {
            let count = self.ref_count.load(Ordering::Relaxed);
            if count == 0 {
                return;
            }
            self.ref_count.store(count - 1, Ordering::Relaxed);
            if count == 1 {
                self.regs.disable();
                self.clk_gate.disable();
                debug!("spi: controller powered down");
            }
        });
    }

    /// Programs the serial clock divider.
    ///
    /// The value is truncated to the 16-bit divider field; high bits are
    /// discarded, not rejected. The controller is disabled around the write,
    /// so callers must not run this concurrently with
    /// [`start`](Self::start)/[`stop`](Self::stop) or an in-flight transfer.
    pub fn set_clock_divider(&self, divider: u32) {
        let divider = divider & regs::baudr::DIV_MASK;
        self.regs.disable();
        self.regs.write(regs::BAUDR, divider);
        self.clock_divider.store(divider, Ordering::Relaxed);
        self.regs.enable();
    }

    /// Programs the clock phase/polarity mode.
    ///
    /// Rewrites only the mode field of CTRLR0, preserving the frame size.
    /// Same caller contract as [`set_clock_divider`](Self::set_clock_divider).
    pub fn set_data_mode(&self, mode: Mode) {
        self.regs.disable();
        let ctrlr0 = self.regs.read(regs::CTRLR0);
        self.regs.write(
            regs::CTRLR0,
            (ctrlr0 & !regs::ctrlr0::MODE_MASK)
                | ((mode.bits() << regs::ctrlr0::MODE_SHIFT) & regs::ctrlr0::MODE_MASK),
        );
        self.data_mode.store(mode.bits(), Ordering::Relaxed);
        self.regs.enable();
    }

    /// Records the requested bit order.
    ///
    /// The controller always shifts MSB-first; the transfer subsystem
    /// reverses bytes in software when `LsbFirst` is recorded here.
    pub fn set_bit_order(&self, order: BitOrder) {
        self.lsb_first
            .store(matches!(order, BitOrder::LsbFirst), Ordering::Relaxed);
    }

    /// Registers `pin` as an interrupt source participating in SPI
    /// transactions; see [`InterruptMode`] for the aggregation rules.
    pub fn using_interrupt(&self, pins: &impl BoardPins, pin: PinId) {
        self.tracker.add(pins, pin);
    }

    /// Unregisters `pin` from interrupt participation tracking.
    pub fn not_using_interrupt(&self, pins: &impl BoardPins, pin: PinId) {
        self.tracker.remove(pins, pin);
    }

    /// Aggregate interrupt participation state, for the transfer subsystem.
    pub fn interrupt_mode(&self) -> InterruptMode {
        self.tracker.mode()
    }

    /// Participation mask of one port group, bit set per registered pin.
    pub fn interrupt_mask(&self, port: GpioPort) -> u32 {
        self.tracker.mask(port)
    }

    /// Number of outstanding [`start`](Self::start) references.
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Relaxed)
    }

    /// Whether the controller enable bit is currently set.
    pub fn is_enabled(&self) -> bool {
        self.regs.is_enabled()
    }

    /// Last programmed divider value.
    pub fn clock_divider(&self) -> u32 {
        self.clock_divider.load(Ordering::Relaxed)
    }

    /// Last programmed mode field value.
    pub fn data_mode(&self) -> u32 {
        self.data_mode.load(Ordering::Relaxed)
    }

    /// Currently recorded bit order.
    pub fn bit_order(&self) -> BitOrder {
        if self.lsb_first.load(Ordering::Relaxed) {
            BitOrder::LsbFirst
        } else {
            BitOrder::MsbFirst
        }
    }

    fn mux_bus_pin(&self, pins: &mut impl BoardPins, pin: PinId) {
        if let Some(desc) = pins.describe(pin) {
            pins.set_mux(desc.soc_pin, SPI_MUX_MODE);
        }
    }
}
