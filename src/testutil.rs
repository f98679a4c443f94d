//! Shared fakes and fixtures for the unit tests.

use core::convert::Infallible;
use std::vec::Vec;

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

use crate::event::{EventSink, KeyEvent, TouchscreenState};
use crate::power::ControlLines;
use crate::update::Flasher;
use crate::{Config, Tc360l};

pub(crate) const ADDR: u8 = 0x20;

pub(crate) type TestDriver = Tc360l<I2cMock, IdleInt, Lines, NoopDelay>;

/// Interrupt pin whose edges fire immediately.
pub(crate) struct IdleInt;

impl embedded_hal::digital::ErrorType for IdleInt {
  type Error = Infallible;
}

impl embedded_hal_async::digital::Wait for IdleInt {
  async fn wait_for_high(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_low(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
    Ok(())
  }

  async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
    Ok(())
  }
}

/// Records every control-line transition for later assertions.
#[derive(Default)]
pub(crate) struct Lines {
  pub regulator: Vec<bool>,
  pub led_supply: Vec<bool>,
  pub int_parks: usize,
  pub int_restores: usize,
  pub bus_parks: usize,
}

impl ControlLines for Lines {
  fn set_regulator(&mut self, on: bool) {
    self.regulator.push(on);
  }

  fn set_led_supply(&mut self, on: bool) {
    self.led_supply.push(on);
  }

  fn park_int_line(&mut self) {
    self.int_parks += 1;
  }

  fn restore_int_line(&mut self) {
    self.int_restores += 1;
  }

  fn park_bus_lines(&mut self) {
    self.bus_parks += 1;
  }
}

/// Collects reported events and sync pulses.
#[derive(Default)]
pub(crate) struct Sink {
  pub events: Vec<KeyEvent>,
  pub syncs: usize,
}

impl EventSink for Sink {
  fn key_event(&mut self, event: KeyEvent) {
    self.events.push(event);
  }

  fn sync(&mut self) {
    self.syncs += 1;
  }
}

/// Fixed touchscreen contact state.
pub(crate) struct Touch(pub bool);

impl TouchscreenState for Touch {
  fn contact_active(&self) -> bool {
    self.0
  }
}

/// Flasher scripted to fail a fixed number of times before succeeding.
pub(crate) struct ScriptedFlasher {
  pub failures_before_success: usize,
  pub attempts: usize,
}

impl ScriptedFlasher {
  pub fn succeeding_after(failures: usize) -> Self {
    Self { failures_before_success: failures, attempts: 0 }
  }

  pub fn always_failing() -> Self {
    Self::succeeding_after(usize::MAX)
  }
}

impl Flasher for ScriptedFlasher {
  type Error = ();

  async fn flash(&mut self) -> Result<(), ()> {
    self.attempts += 1;
    if self.attempts > self.failures_before_success {
      Ok(())
    } else {
      Err(())
    }
  }
}

/// Driver over mocks with autocalibration off, so no workflow calibrates
/// implicitly unless a test opts in via [`driver_with`].
pub(crate) fn driver(transactions: &[Transaction]) -> TestDriver {
  driver_with(transactions, Config::default().with_autocal(false))
}

pub(crate) fn driver_with(transactions: &[Transaction], config: Config) -> TestDriver {
  Tc360l::new(I2cMock::new(transactions), IdleInt, Lines::default(), NoopDelay, config)
}

/// Mark the device powered and armed without going through `resume`.
pub(crate) fn activate(dev: &mut TestDriver) {
  dev.state.enabled = true;
  dev.state.suspended = false;
  dev.state.irq_enabled = true;
}

/// Verify the mock consumed every scripted transaction; returns the recorded
/// control lines for further assertions.
pub(crate) fn finish(dev: TestDriver) -> Lines {
  let (mut i2c, _, lines, _) = dev.release();
  i2c.done();
  lines
}
