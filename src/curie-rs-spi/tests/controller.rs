// Test tables are indexed with known-good offsets.
#![allow(clippy::indexing_slicing)]

//! Exercises the controller's register sequencing against a fake register
//! file and a recording board pin table.

use core::cell::UnsafeCell;

use curie_rs_hal_common::gpio::{
    BoardPins, GpioPort, Level, MuxMode, PinClass, PinDescription, PinId,
};
use curie_rs_spi::{BitOrder, InterruptMode, Mode, SpiController, SpiPins, CLOCK_DIV_DEFAULT};

// Register offsets of the controller block, as the driver programs them.
const CTRLR0: usize = 0x00;
const SSIENR: usize = 0x08;
const SER: usize = 0x10;
const BAUDR: usize = 0x14;
const IMR: usize = 0x2C;

const REG_WORDS: usize = 0x40 / 4;
const CLK_GATE_BIT: u32 = 1 << 14;

const PINS: SpiPins = SpiPins {
    ss: 10,
    mosi: 11,
    miso: 12,
    sck: 13,
};

/// Offset between a logical pin id and its SoC pin in the test table.
const SOC_PIN_BASE: u8 = 40;

/// Writable memory standing in for one controller's register block plus its
/// clock gate register.
struct FakeDevice {
    regs: Box<[UnsafeCell<u32>; REG_WORDS]>,
    clk_gate: Box<UnsafeCell<u32>>,
}

impl FakeDevice {
    fn new() -> Self {
        Self {
            regs: Box::new(core::array::from_fn(|_| UnsafeCell::new(0))),
            clk_gate: Box::new(UnsafeCell::new(0)),
        }
    }

    fn controller(&self) -> SpiController {
        // SAFETY: the boxed fake registers outlive the controller, which the
        // tests only use while `self` is alive.
        unsafe {
            SpiController::from_parts(
                self.regs.as_ptr() as usize,
                self.clk_gate.get() as usize,
                CLK_GATE_BIT,
                PINS,
            )
        }
    }

    fn reg(&self, offset: usize) -> u32 {
        // SAFETY: the cell is ours and the driver accesses it from this
        // thread only.
        unsafe { self.regs[offset / 4].get().read_volatile() }
    }

    fn clk_gate(&self) -> u32 {
        // SAFETY: see reg().
        unsafe { self.clk_gate.get().read_volatile() }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PinOp {
    Write(PinId, Level),
    SetOutput(PinId),
    SetMux(u8, MuxMode),
}

/// Board pin table with a pin in every port group, recording every mutation
/// in call order.
#[derive(Default)]
struct TestPins {
    ops: Vec<PinOp>,
}

impl BoardPins for TestPins {
    fn describe(&self, pin: PinId) -> Option<PinDescription> {
        let class = match pin {
            0..=7 => PinClass::Port(GpioPort::Gpio8b0, pin),
            8..=15 => PinClass::Port(GpioPort::Gpio8b1, pin - 8),
            16..=23 => PinClass::Port(GpioPort::Gpio32, pin - 16),
            24 => PinClass::Other,
            _ => return None,
        };
        Some(PinDescription {
            soc_pin: pin + SOC_PIN_BASE,
            class,
        })
    }

    fn read(&self, pin: PinId) -> Level {
        // Reads back the last written level, high when never written.
        self.ops
            .iter()
            .rev()
            .find_map(|op| match op {
                PinOp::Write(p, level) if *p == pin => Some(*level),
                _ => None,
            })
            .unwrap_or(Level::High)
    }

    fn write(&mut self, pin: PinId, level: Level) {
        self.ops.push(PinOp::Write(pin, level));
    }

    fn set_output(&mut self, pin: PinId) {
        self.ops.push(PinOp::SetOutput(pin));
    }

    fn set_mux(&mut self, soc_pin: u8, mode: MuxMode) {
        self.ops.push(PinOp::SetMux(soc_pin, mode));
    }
}

#[test]
fn test_start_initializes_hardware_once() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();

    assert!(!spi.is_enabled());

    spi.start(&mut pins);

    assert!(spi.is_enabled());
    assert_eq!(spi.ref_count(), 1);
    assert_eq!(dev.clk_gate() & CLK_GATE_BIT, CLK_GATE_BIT);
    assert_eq!(dev.reg(BAUDR), CLOCK_DIV_DEFAULT);
    // 8-bit frames, mode 0.
    assert_eq!(dev.reg(CTRLR0), 7);
    assert_eq!(dev.reg(IMR), 0);
    assert_eq!(dev.reg(SER), 0x1);
    assert_eq!(dev.reg(SSIENR), 0x1);

    // Chip select is parked high before the pin becomes an output.
    assert_eq!(pins.ops[0], PinOp::Write(PINS.ss, Level::High));
    assert_eq!(pins.ops[1], PinOp::SetOutput(PINS.ss));

    // All three bus pins are handed to the same mux function, by SoC pin.
    let mux_ops: Vec<(u8, MuxMode)> = pins
        .ops
        .iter()
        .filter_map(|op| match op {
            PinOp::SetMux(soc_pin, mode) => Some((*soc_pin, *mode)),
            _ => None,
        })
        .collect();
    assert_eq!(mux_ops.len(), 3);
    assert_eq!(mux_ops[0].0, PINS.mosi + SOC_PIN_BASE);
    assert_eq!(mux_ops[1].0, PINS.miso + SOC_PIN_BASE);
    assert_eq!(mux_ops[2].0, PINS.sck + SOC_PIN_BASE);
    assert!(mux_ops.iter().all(|&(_, mode)| mode == mux_ops[0].1));

    // Later starts only bump the reference count.
    let op_count = pins.ops.len();
    spi.start(&mut pins);
    assert_eq!(spi.ref_count(), 2);
    assert_eq!(pins.ops.len(), op_count);
}

#[test]
fn test_balanced_start_stop_gates_hardware_at_the_edges() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();

    for count in 1..=4 {
        for started in 1..=count {
            spi.start(&mut pins);
            assert!(spi.is_enabled(), "enabled after start {started}/{count}");
        }
        for remaining in (0..count).rev() {
            spi.stop();
            assert_eq!(spi.is_enabled(), remaining > 0);
            assert_eq!((dev.clk_gate() & CLK_GATE_BIT) != 0, remaining > 0);
        }
    }
}

#[test]
fn test_stop_without_start_is_a_noop() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();

    spi.stop();
    assert_eq!(spi.ref_count(), 0);
    assert_eq!(dev.reg(SSIENR), 0);
    assert_eq!(dev.clk_gate(), 0);

    // A stray extra stop after a full cycle does not re-trigger teardown.
    spi.start(&mut pins);
    spi.stop();
    spi.stop();
    assert_eq!(spi.ref_count(), 0);
    assert!(!spi.is_enabled());
}

#[test]
fn test_clock_divider_is_masked_not_rejected() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();
    spi.start(&mut pins);

    spi.set_clock_divider(0x0003_2345);
    assert_eq!(dev.reg(BAUDR), 0x2345);
    assert_eq!(spi.clock_divider(), 0x2345);
    // The controller comes back enabled after the reprogramming sequence.
    assert!(spi.is_enabled());

    spi.set_clock_divider(0xFFFF_0000);
    assert_eq!(dev.reg(BAUDR), 0);
}

#[test]
fn test_data_mode_preserves_frame_size() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();
    spi.start(&mut pins);

    spi.set_data_mode(Mode::Mode3);
    assert_eq!(dev.reg(CTRLR0) & 0xF, 7);
    assert_eq!((dev.reg(CTRLR0) >> 6) & 0x3, 3);
    assert_eq!(spi.data_mode(), 3);
    assert!(spi.is_enabled());

    spi.set_data_mode(Mode::Mode1);
    assert_eq!(dev.reg(CTRLR0) & 0xF, 7);
    assert_eq!((dev.reg(CTRLR0) >> 6) & 0x3, 1);
}

#[test]
fn test_bit_order_is_recorded_but_not_programmed() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();
    spi.start(&mut pins);

    let ctrlr0 = dev.reg(CTRLR0);
    assert_eq!(spi.bit_order(), BitOrder::MsbFirst);
    spi.set_bit_order(BitOrder::LsbFirst);
    assert_eq!(spi.bit_order(), BitOrder::LsbFirst);
    assert_eq!(dev.reg(CTRLR0), ctrlr0);
}

#[test]
fn test_interrupt_tracking_scenario() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();
    spi.start(&mut pins);

    // Pin 3 classifies as port group 0, bit 3.
    spi.using_interrupt(&pins, 3);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Tracking(0b001));
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b0), 0x8);

    // Out-of-range pin: escalate, leave the masks alone.
    spi.using_interrupt(&pins, 200);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Overflow);
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b0), 0x8);

    // Overflow is sticky under removal.
    spi.not_using_interrupt(&pins, 3);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Overflow);

    // Teardown powers the hardware down but leaves the tracker alone.
    spi.stop();
    assert!(!spi.is_enabled());
    assert_eq!(spi.interrupt_mode(), InterruptMode::Overflow);
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b0), 0x8);
}

#[test]
fn test_restart_resets_transient_state() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();

    spi.start(&mut pins);
    spi.using_interrupt(&pins, 200);
    spi.set_bit_order(BitOrder::LsbFirst);
    spi.stop();
    assert_eq!(spi.interrupt_mode(), InterruptMode::Overflow);

    // The next first activation starts from a clean slate.
    spi.start(&mut pins);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Tracking(0));
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b0), 0);
    assert_eq!(spi.bit_order(), BitOrder::MsbFirst);
    assert!(spi.is_enabled());
}

#[test]
fn test_unclassifiable_pin_escalates_and_removal_ignores_unknown() {
    let dev = FakeDevice::new();
    let spi = dev.controller();
    let mut pins = TestPins::default();
    spi.start(&mut pins);

    spi.using_interrupt(&pins, 9);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Tracking(0b010));
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b1), 0x2);

    // Removing an out-of-range pin is silently ignored.
    spi.not_using_interrupt(&pins, 200);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Tracking(0b010));

    // A valid pin outside every recognized group escalates.
    spi.using_interrupt(&pins, 24);
    assert_eq!(spi.interrupt_mode(), InterruptMode::Overflow);
    assert_eq!(spi.interrupt_mask(GpioPort::Gpio8b1), 0x2);
}
