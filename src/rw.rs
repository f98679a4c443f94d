use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::{BusError, Tc360l};

/// Bounded-retry policy shared by every retryable transaction in the driver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Retry {
  pub attempts: u8,
  /// Recovery delay between failed attempts; 0 retries back-to-back.
  pub delay_ms: u32,
}

/// Register transactions: three attempts, 10 ms for the bus to recover.
pub(crate) const BUS_RETRY: Retry = Retry { attempts: 3, delay_ms: BUS_RETRY_DELAY_MS };
/// Backlight on command: two quick attempts.
pub(crate) const LED_RETRY: Retry = Retry { attempts: 2, delay_ms: 0 };
/// Autocalibration rounds; the settle time lives inside the round itself.
pub(crate) const AUTOCAL_RETRY: Retry = Retry { attempts: 3, delay_ms: 0 };
/// Firmware flash attempts.
pub(crate) const FLASH_RETRY: Retry = Retry { attempts: 3, delay_ms: FLASH_SETTLE_MS };

/// Runs `$op` up to `$policy.attempts` times, sleeping `$policy.delay_ms` on
/// `$dev`'s delay provider between failed attempts. Yields the first `Ok` or
/// the final `Err`.
macro_rules! retry {
  ($dev:expr, $policy:expr, $op:expr) => {{
    let policy: crate::rw::Retry = $policy;
    let mut attempt: u8 = 1;
    loop {
      match $op {
        Ok(value) => break Ok(value),
        Err(err) => {
          if attempt >= policy.attempts {
            break Err(err);
          }
          attempt += 1;
          if policy.delay_ms > 0 {
            $dev.delay.delay_ms(policy.delay_ms).await;
          }
        }
      }
    }
  }};
}

pub(crate) use retry;

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Read `buf.len()` bytes from the controller's register window.
  ///
  /// Fails with [`BusError::NotReady`] before touching the wire while the
  /// device is disabled or suspended; that is a precondition check, not a
  /// bus fault, and is never retried.
  pub(crate) async fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), BusError<E>> {
    if !self.state.enabled || self.state.suspended {
      return Err(BusError::NotReady);
    }
    retry!(self, BUS_RETRY, self.i2c.read(I2C_ADDR, buf).await).map_err(|err| {
      warn!("register read failed after retries");
      BusError::Transport(err)
    })
  }

  /// Write `data` to the controller's register window.
  pub(crate) async fn write_frame(&mut self, data: &[u8]) -> Result<(), BusError<E>> {
    retry!(self, BUS_RETRY, self.i2c.write(I2C_ADDR, data).await).map_err(|err| {
      warn!("register write failed after retries");
      BusError::Transport(err)
    })
  }
}
