//! Diagnostics reads and the sensitivity test mode, as consumed by the
//! platform's attribute layer. All snapshots are best-effort: values read
//! here and values cached by the interrupt path need not be mutually
//! consistent.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::power::ControlLines;
use crate::{BusError, PowerError, Tc360l};

/// Sensing channels with per-key raw counts and trim values.
pub const DIAG_CHANNELS: usize = 4;

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Read the firmware and module versions and refresh the cache.
  pub async fn refresh_versions(&mut self) -> Result<(u8, u8), BusError<E>> {
    let mut frame = [0u8; LEN_STATUS];
    self.read_frame(&mut frame).await?;
    self.state.firmware_ver = frame[OFF_FIRMWARE_VER];
    self.state.module_ver = frame[OFF_MODULE_VER];
    Ok((self.state.firmware_ver, self.state.module_ver))
  }

  /// Read the current menu-key sensitivity and refresh the cache.
  pub async fn read_menu_sensitivity(&mut self) -> Result<u16, BusError<E>> {
    let mut frame = [0u8; LEN_SENSITIVITY];
    self.read_frame(&mut frame).await?;
    self.state.menu_sensitivity = be16(&frame, OFF_MENU_SENSITIVITY);
    Ok(self.state.menu_sensitivity)
  }

  /// Read the current back-key sensitivity and refresh the cache.
  pub async fn read_back_sensitivity(&mut self) -> Result<u16, BusError<E>> {
    let mut frame = [0u8; LEN_SENSITIVITY];
    self.read_frame(&mut frame).await?;
    self.state.back_sensitivity = be16(&frame, OFF_BACK_SENSITIVITY);
    Ok(self.state.back_sensitivity)
  }

  /// Raw capacitance counts per sensing channel.
  pub async fn raw_counts(&mut self) -> Result<[u16; DIAG_CHANNELS], BusError<E>> {
    let mut frame = [0u8; LEN_RAW_COUNTS];
    self.read_frame(&mut frame).await?;
    let mut counts = [0u16; DIAG_CHANNELS];
    for (channel, count) in counts.iter_mut().enumerate() {
      *count = be16(&frame, OFF_RAW_COUNTS + 2 * channel);
    }
    Ok(counts)
  }

  /// Per-channel calibration trim values (IDAC), read-only diagnostics.
  pub async fn idac(&mut self) -> Result<[u8; DIAG_CHANNELS], BusError<E>> {
    let mut frame = [0u8; LEN_IDAC];
    self.read_frame(&mut frame).await?;
    let mut trims = [0u8; DIAG_CHANNELS];
    trims.copy_from_slice(&frame[OFF_IDAC..OFF_IDAC + DIAG_CHANNELS]);
    Ok(trims)
  }

  /// Touch detection threshold.
  pub async fn threshold(&mut self) -> Result<u8, BusError<E>> {
    let mut frame = [0u8; LEN_IDAC];
    self.read_frame(&mut frame).await?;
    Ok(frame[OFF_THRESHOLD])
  }

  /// Whether the controller currently reports autocalibration as enabled.
  pub async fn autocal_status(&mut self) -> Result<bool, BusError<E>> {
    let mut frame = [0u8; LEN_AUTOCAL_STATUS];
    self.read_frame(&mut frame).await?;
    Ok(frame[OFF_AUTOCAL_FLAGS] & AUTOCAL_ENABLED_BIT != 0)
  }
}

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  L: ControlLines,
  D: DelayNs,
{
  /// Put the controller into its sensitivity measurement mode.
  pub async fn start_test_mode(&mut self) -> Result<(), BusError<E>> {
    self.write_frame(&[CMD_TEST_MODE]).await
  }

  /// Leave sensitivity measurement mode.
  ///
  /// Power-cycles the backlight to reset the sensing front end, then
  /// recalibrates; a calibration that does not converge is logged and
  /// otherwise ignored here.
  pub async fn stop_test_mode(&mut self) -> Result<(), PowerError> {
    self.set_led(false).await?;
    self.delay.delay_ms(LED_CYCLE_SETTLE_MS).await;
    self.set_led(true).await?;
    self.delay.delay_ms(LED_CYCLE_SETTLE_MS).await;

    if self.calibrate().await.is_err() {
      warn!("calibration failed leaving test mode");
    }
    Ok(())
  }
}
