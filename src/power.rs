use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::event::{EventSink, Key, KeyEvent};
use crate::rw::{retry, LED_RETRY};
use crate::{PowerError, PowerRail, Tc360l};

/// Board wiring for the controller's discrete control lines.
///
/// Implementations are expected to be infallible; boards with fallible pin
/// drivers handle or log those failures themselves. The edge-wait half of
/// the interrupt line is owned separately by the driver as a [`Wait`] pin;
/// `park_int_line`/`restore_int_line` reconfigure the same pad between its
/// quiescent output level and its active input mode.
///
/// [`Wait`]: embedded_hal_async::digital::Wait
pub trait ControlLines {
  /// Switch the controller's supply regulator.
  fn set_regulator(&mut self, on: bool);
  /// Switch the backlight LED supply.
  fn set_led_supply(&mut self, on: bool);
  /// Drive the interrupt pad low for the suspended state.
  fn park_int_line(&mut self);
  /// Return the interrupt pad to input mode.
  fn restore_int_line(&mut self);
  /// Drive both bus lines to their idle-high level for the suspended state.
  fn park_bus_lines(&mut self);
}

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  L: ControlLines,
  D: DelayNs,
{
  /// Enter the suspended state. A no-op when already suspended.
  ///
  /// Parks the interrupt pad and bus lines, disarms interrupt delivery,
  /// reports a release for every mapped key so none stays latched across
  /// the suspend boundary, then drops the supply rail on boards that switch
  /// it. Exclusive access to the driver guarantees no calibration or update
  /// is in flight when this runs.
  pub async fn suspend<S: EventSink>(&mut self, sink: &mut S) {
    if self.state.suspended {
      return;
    }
    debug!("entering suspend");

    self.lines.park_int_line();
    self.lines.park_bus_lines();
    self.state.irq_enabled = false;

    for key in Key::ALL {
      sink.key_event(KeyEvent { key, pressed: false });
    }
    sink.sync();

    self.state.suspended = true;
    self.state.enabled = false;
    if matches!(self.config.power_rail, PowerRail::Switched) {
      self.lines.set_regulator(false);
      self.state.led_on = false;
    }
  }

  /// Leave the suspended state. A no-op when already active.
  ///
  /// Restores the interrupt pad, powers the rail back up, recalibrates
  /// (best effort) and re-arms interrupt delivery. Also serves as the
  /// initial power-up for a freshly constructed driver.
  pub async fn resume(&mut self) {
    if !self.state.suspended {
      return;
    }
    debug!("leaving suspend");

    self.lines.restore_int_line();
    if matches!(self.config.power_rail, PowerRail::Switched) {
      self.lines.set_regulator(true);
      self.delay.delay_ms(POWER_UP_SETTLE_MS).await;
    }

    // Flags first: the calibration below goes through the bus precondition.
    self.state.suspended = false;
    self.state.enabled = true;

    if self.calibrate().await.is_err() {
      warn!("calibration failed on resume");
    }
    self.state.irq_enabled = true;
  }

  /// Switch the key backlight.
  ///
  /// Turning on raises the LED supply line and sends the on command over
  /// the bus with up to two attempts (a command that still fails is logged,
  /// the supply stays up). Turning off only drops the supply line and never
  /// touches the bus. Calling this on a suspended or disabled controller is
  /// a caller error and fails fast.
  pub async fn set_led(&mut self, on: bool) -> Result<(), PowerError> {
    if self.state.suspended || !self.state.enabled {
      return Err(PowerError::NotReady);
    }

    if on {
      self.lines.set_led_supply(true);
      self.delay.delay_ms(LED_SUPPLY_SETTLE_MS).await;
      if retry!(self, LED_RETRY, self.i2c.write(I2C_ADDR, &[CMD_LED_ON]).await).is_err() {
        warn!("backlight on command failed");
      }
    } else {
      self.lines.set_led_supply(false);
    }
    self.state.led_on = on;
    Ok(())
  }

  /// Attribute-layer brightness action: intensities of 100 and above turn
  /// the backlight on, everything below turns it off.
  pub async fn set_led_intensity(&mut self, intensity: u8) -> Result<(), PowerError> {
    self.set_led(intensity >= 100).await
  }
}
