#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver for the CoreRiver TC360L capacitive touch-key
//! controller.
//!
//! The TC360L sits below a phone touchscreen and reports two capacitive keys
//! (menu and back) over a two-wire register bus. This crate implements the
//! driver core on top of `embedded-hal` / `embedded-hal-async` 1.0 traits:
//!
//! - Retrying register reads and writes; the controller transmits no
//!   sub-register address, the transfer length alone selects which fields
//!   are populated
//! - Decoding interrupt status frames into key press/release events, with
//!   suppression of presses that land while a touchscreen contact is active
//! - The suspend/resume sequence for the controller's regulator, backlight
//!   LED, and interrupt line
//! - Factory autocalibration and firmware-update workflows with bounded
//!   retries and a pollable download status
//!
//! The host platform supplies the bus, the interrupt pin, the discrete
//! control lines, the input-event sink, and the vendor flashing routine;
//! see [`ControlLines`], [`EventSink`], [`TouchscreenState`] and [`Flasher`].
//!
//! ```no_run
//! use embedded_hal_async::delay::DelayNs;
//! use embedded_hal_async::digital::Wait;
//! use embedded_hal_async::i2c::{I2c, SevenBitAddress};
//! use tc360l::{Config, ControlLines, EventSink, Tc360l, TouchscreenState};
//!
//! async fn example<I2C, INT, LINES, D, E>(
//!   i2c: I2C,
//!   int: INT,
//!   lines: LINES,
//!   delay: D,
//!   touch: &impl TouchscreenState,
//!   sink: &mut impl EventSink,
//! ) where
//!   I2C: I2c<SevenBitAddress, Error = E>,
//!   INT: Wait,
//!   LINES: ControlLines,
//!   D: DelayNs,
//! {
//!   let config = Config::default().with_bundled_versions(0x06, 0x02);
//!   let mut keys = Tc360l::new(i2c, int, lines, delay, config);
//!   keys.resume().await;
//!
//!   loop {
//!     // One falling edge on the interrupt line yields at most one event;
//!     // the sink has already received it when `Some` comes back.
//!     let _ = keys.next_event(touch, sink).await;
//!   }
//! }
//! ```

#[cfg(test)]
extern crate std;

// This module must come first so the logging macros are visible below.
mod fmt;

mod calib;
mod config;
mod defs;
mod diag;
mod event;
mod power;
mod rw;
mod update;

#[cfg(test)]
mod testutil;

pub use config::{Config, FrameMode, PowerRail};
pub use diag::DIAG_CHANNELS;
pub use event::{EventSink, Key, KeyEvent, TouchscreenState};
pub use power::ControlLines;
pub use update::{Flasher, UpdateStatus};

/// Bus transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
  /// The device is disabled or suspended; nothing was put on the wire.
  NotReady,
  /// The transaction still failed after every retry, with the last bus error.
  Transport(E),
}

/// Backlight and power-path failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerError {
  /// The operation needs a powered, non-suspended controller.
  NotReady,
}

/// Autocalibration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
  /// The controller never raised its autocal flag within the retry budget.
  /// Diagnostic condition; the device keeps working with its previous tuning.
  NotConverged,
}

/// Firmware-update failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
  /// An update was requested while the device is disabled or suspended.
  AlreadyDisabled,
  /// Every flash attempt failed; [`UpdateStatus::Fail`] has been recorded.
  FlashFailed,
  /// The image was flashed and [`UpdateStatus::Pass`] recorded, but the
  /// version read-back afterwards failed. `Pass` stays recorded.
  VerifyFailed,
}

/// Mutable per-device bookkeeping, owned by the driver for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceState {
  enabled: bool,
  suspended: bool,
  led_on: bool,
  irq_enabled: bool,
  firmware_ver: u8,
  module_ver: u8,
  menu_sensitivity: u16,
  back_sensitivity: u16,
  update_status: UpdateStatus,
  autocal_enabled: bool,
}

impl DeviceState {
  /// State of a freshly attached, not yet powered controller.
  const fn detached() -> Self {
    Self {
      enabled: false,
      suspended: true,
      led_on: false,
      irq_enabled: false,
      firmware_ver: 0,
      module_ver: 0,
      menu_sensitivity: 0,
      back_sensitivity: 0,
      update_status: UpdateStatus::Idle,
      autocal_enabled: false,
    }
  }
}

/// Driver for the CoreRiver TC360L touch-key controller.
///
/// Owns the I²C peripheral, the interrupt-wait pin, the board's discrete
/// control lines and a delay provider. Every workflow borrows the driver
/// mutably, so the half-duplex bus sees at most one transaction sequence at
/// a time by construction. Create one instance per physical controller with
/// [`Tc360l::new`] and bring it up with [`Tc360l::resume`].
pub struct Tc360l<I, INT, L, D> {
  i2c: I,
  int: INT,
  lines: L,
  delay: D,
  config: Config,
  state: DeviceState,
}

impl<I, INT, L, D> Tc360l<I, INT, L, D> {
  /// Create a driver for an attached controller.
  ///
  /// The controller starts out suspended and disabled; call
  /// [`Tc360l::resume`] to power it up before anything touches the bus.
  pub fn new(i2c: I, int: INT, lines: L, delay: D, config: Config) -> Self {
    Self { i2c, int, lines, delay, config, state: DeviceState::detached() }
  }

  /// Tear the driver down on detach and hand the peripherals back.
  pub fn release(self) -> (I, INT, L, D) {
    (self.i2c, self.int, self.lines, self.delay)
  }

  /// Firmware version cached by the last version read.
  pub fn firmware_version(&self) -> u8 {
    self.state.firmware_ver
  }

  /// Module (panel) version cached by the last version read.
  pub fn module_version(&self) -> u8 {
    self.state.module_ver
  }

  /// Menu-key sensitivity cached by the last sensitivity-bearing read.
  pub fn menu_sensitivity(&self) -> u16 {
    self.state.menu_sensitivity
  }

  /// Back-key sensitivity cached by the last sensitivity-bearing read.
  pub fn back_sensitivity(&self) -> u16 {
    self.state.back_sensitivity
  }

  /// Progress of the most recent firmware download, pollable at any time.
  pub fn update_status(&self) -> UpdateStatus {
    self.state.update_status
  }

  /// Whether the controller is powered and may be addressed.
  pub fn is_enabled(&self) -> bool {
    self.state.enabled
  }

  /// Whether the controller is in the suspended state.
  pub fn is_suspended(&self) -> bool {
    self.state.suspended
  }

  /// Whether the key backlight is currently driven.
  pub fn is_led_on(&self) -> bool {
    self.state.led_on
  }

  /// Whether interrupt servicing is currently armed.
  pub fn interrupts_enabled(&self) -> bool {
    self.state.irq_enabled
  }

  /// Whether a calibration run has confirmed autocalibration as enabled.
  pub fn autocal_enabled(&self) -> bool {
    self.state.autocal_enabled
  }
}
