use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::rw::{retry, AUTOCAL_RETRY};
use crate::{CalibrationError, Tc360l};

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Run the controller's autocalibration, up to three command/verify rounds.
  ///
  /// Convergence is recorded in the device state; a controller that never
  /// raises its autocal flag leaves all state untouched and reports
  /// [`CalibrationError::NotConverged`]. Does nothing on hardware configured
  /// without autocalibration support.
  pub async fn calibrate(&mut self) -> Result<(), CalibrationError> {
    if !self.config.autocal {
      return Ok(());
    }

    match retry!(self, AUTOCAL_RETRY, self.autocal_round().await) {
      Ok(()) => {
        debug!("autocalibration enabled");
        self.state.autocal_enabled = true;
        Ok(())
      }
      Err(err) => {
        warn!("autocalibration did not converge");
        Err(err)
      }
    }
  }

  /// One command/verify round. A bus failure counts as a failed round.
  async fn autocal_round(&mut self) -> Result<(), CalibrationError> {
    let mut window = [0u8; LEN_AUTOCAL_WINDOW];
    if self.read_frame(&mut window).await.is_err() {
      return Err(CalibrationError::NotConverged);
    }

    window[OFF_STATUS] = CMD_AUTOCAL;
    window[OFF_AUTOCAL_TRIGGER] = AUTOCAL_TRIGGER;
    if self.write_frame(&window).await.is_err() {
      return Err(CalibrationError::NotConverged);
    }

    self.delay.delay_ms(AUTOCAL_SETTLE_MS).await;

    let mut status = [0u8; LEN_AUTOCAL_STATUS];
    if self.read_frame(&mut status).await.is_err() {
      return Err(CalibrationError::NotConverged);
    }
    if status[OFF_AUTOCAL_FLAGS] & AUTOCAL_ENABLED_BIT != 0 {
      Ok(())
    } else {
      Err(CalibrationError::NotConverged)
    }
  }
}
