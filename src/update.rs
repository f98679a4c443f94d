use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::power::ControlLines;
use crate::rw::{retry, FLASH_RETRY};
use crate::{Tc360l, UpdateError};

/// Firmware download lifecycle: `Idle → Downloading → {Pass, Fail}`.
///
/// `Pass` and `Fail` are terminal until the next update attempt re-enters
/// `Downloading`. Written only by the update workflow; readable at any time
/// through [`Tc360l::update_status`](crate::Tc360l::update_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateStatus {
  #[default]
  Idle,
  Downloading,
  Pass,
  Fail,
}

/// The vendor flashing routine, reduced to "flash one image".
///
/// The driver owns retries, status reporting and interrupt gating around the
/// call; an implementation only pushes the image it was built with and says
/// whether that worked.
#[allow(async_fn_in_trait)]
pub trait Flasher {
  type Error;
  async fn flash(&mut self) -> Result<(), Self::Error>;
}

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  L: ControlLines,
  D: DelayNs,
{
  /// Automatic update path, run once per attach.
  ///
  /// Reads the device's firmware and module versions and only flashes when
  /// the device firmware is older than the bundled image and the module
  /// revision is one the image supports. An up-to-date device short-circuits
  /// to `Pass` without a single flash attempt, so re-running this is always
  /// safe. A failed version read is treated as a blank device and flashed.
  ///
  /// Interrupt delivery is disarmed for the whole workflow and re-armed on
  /// every exit path.
  pub async fn update_firmware<F: Flasher>(&mut self, flasher: &mut F) -> Result<UpdateStatus, UpdateError> {
    if !self.state.enabled || self.state.suspended {
      return Err(UpdateError::AlreadyDisabled);
    }
    self.state.irq_enabled = false;

    if self.refresh_versions().await.is_err() {
      warn!("version read failed before update, assuming blank device");
      self.state.firmware_ver = 0;
      self.state.module_ver = 0;
    }
    info!(
      "device firmware {} module {}, bundled {} for module {}",
      self.state.firmware_ver,
      self.state.module_ver,
      self.config.bundled_firmware,
      self.config.bundled_module,
    );

    let stale = self.state.firmware_ver < self.config.bundled_firmware
      && self.state.module_ver <= self.config.bundled_module;
    if !stale {
      debug!("firmware already current, not flashing");
      self.state.irq_enabled = true;
      return Ok(UpdateStatus::Pass);
    }

    self.run_flash(flasher).await
  }

  /// Manually triggered update: the same state machine with the version
  /// gate skipped, so a manual trigger always attempts a flash.
  pub async fn force_update<F: Flasher>(&mut self, flasher: &mut F) -> Result<UpdateStatus, UpdateError> {
    if !self.state.enabled || self.state.suspended {
      return Err(UpdateError::AlreadyDisabled);
    }
    self.state.irq_enabled = false;

    if let Ok((firmware, module)) = self.refresh_versions().await {
      info!("manual update over firmware {} module {}", firmware, module);
    }

    self.run_flash(flasher).await
  }

  async fn run_flash<F: Flasher>(&mut self, flasher: &mut F) -> Result<UpdateStatus, UpdateError> {
    self.state.update_status = UpdateStatus::Downloading;

    match retry!(self, FLASH_RETRY, flasher.flash().await) {
      Ok(()) => {
        self.delay.delay_ms(FLASH_SETTLE_MS).await;
        self.state.update_status = UpdateStatus::Pass;
        info!("firmware update succeeded");

        if self.calibrate().await.is_err() {
          warn!("calibration failed after flash");
        }

        // Pass stays recorded even when this validation read fails; the
        // caller sees the failed read-back as its own error.
        let verified = self.refresh_versions().await;
        self.state.irq_enabled = true;
        match verified {
          Ok(_) => Ok(UpdateStatus::Pass),
          Err(_) => Err(UpdateError::VerifyFailed),
        }
      }
      Err(_) => {
        warn!("firmware update failed, out of retries");
        // Backlight off is the safe state for a half-programmed controller.
        self.lines.set_led_supply(false);
        self.state.led_on = false;
        self.state.update_status = UpdateStatus::Fail;
        self.state.irq_enabled = true;
        Err(UpdateError::FlashFailed)
      }
    }
  }
}
