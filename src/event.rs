use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::*;
use crate::{FrameMode, Tc360l};

/// A capacitive key reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
  Menu,
  Back,
}

impl Key {
  /// Every mapped key, in wire-index order.
  pub const ALL: [Key; 2] = [Key::Menu, Key::Back];

  /// Map a wire index from the status byte. Index 0 and anything past the
  /// last mapped key carry no event.
  pub(crate) const fn from_index(index: u8) -> Option<Self> {
    match index {
      1 => Some(Key::Menu),
      2 => Some(Key::Back),
      _ => None,
    }
  }
}

/// A single press or release. Produced by the decoder, handed straight to
/// the [`EventSink`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
  pub key: Key,
  pub pressed: bool,
}

/// Destination for decoded key events, typically the platform's input
/// device. Each accepted event is reported exactly once, immediately
/// followed by one [`EventSink::sync`] call.
pub trait EventSink {
  fn key_event(&mut self, event: KeyEvent);
  fn sync(&mut self);
}

/// Live state of the companion touchscreen.
///
/// A key press that arrives while a contact is active on the panel is
/// discarded so swipe gestures that graze the key area do not trigger keys.
/// Releases always pass.
pub trait TouchscreenState {
  fn contact_active(&self) -> bool;
}

/// Decode one status byte into a key event; `None` for unmapped indices.
pub(crate) const fn decode_status(status: u8) -> Option<KeyEvent> {
  match Key::from_index(status & KEYCODE_MASK) {
    Some(key) => Some(KeyEvent { key, pressed: status & PRESS_EVENT_BIT == 0 }),
    None => None,
  }
}

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  INT: Wait,
  D: DelayNs,
{
  /// Await the next falling edge on the interrupt line and service it.
  ///
  /// Returns the accepted event, or `None` when the interrupt was dropped
  /// (bus failure, unmapped index, or touchscreen suppression). The sink has
  /// already been fed when `Some` comes back.
  pub async fn next_event<T, S>(&mut self, touch: &T, sink: &mut S) -> Option<KeyEvent>
  where
    T: TouchscreenState,
    S: EventSink,
  {
    if self.int.wait_for_falling_edge().await.is_err() {
      return None;
    }
    self.service_interrupt(touch, sink).await
  }
}

impl<I, E, INT, L, D> Tc360l<I, INT, L, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Turn one interrupt's status read into at most one key event.
  ///
  /// Stateless per invocation; the status byte itself encodes the current
  /// key and press/release direction. Nothing here propagates an error: a
  /// read that exhausts its retries drops the interrupt and leaves the
  /// pipeline armed for the next edge, since one missed key is recoverable
  /// and a stalled pipeline is not.
  pub async fn service_interrupt<T, S>(&mut self, touch: &T, sink: &mut S) -> Option<KeyEvent>
  where
    T: TouchscreenState,
    S: EventSink,
  {
    if !self.state.irq_enabled {
      return None;
    }

    let status = match self.config.frame_mode {
      FrameMode::Status => {
        let mut frame = [0u8; LEN_STATUS];
        if self.read_frame(&mut frame).await.is_err() {
          warn!("status read failed, dropping interrupt");
          return None;
        }
        frame[OFF_STATUS]
      }
      FrameMode::StatusWithSensitivity => {
        let mut frame = [0u8; LEN_STATUS_EXTENDED];
        if self.read_frame(&mut frame).await.is_err() {
          warn!("status read failed, dropping interrupt");
          return None;
        }
        // Snapshots are harvested even when the event below is rejected.
        self.state.menu_sensitivity = be16(&frame, OFF_MENU_SENSITIVITY);
        self.state.back_sensitivity = be16(&frame, OFF_BACK_SENSITIVITY);
        frame[OFF_STATUS]
      }
    };

    let event = match decode_status(status) {
      Some(event) => event,
      None => {
        debug!("unmapped key index in status byte");
        return None;
      }
    };

    if event.pressed && touch.contact_active() {
      debug!("touchscreen contact active, suppressing key press");
      return None;
    }

    sink.key_event(event);
    sink.sync();
    Some(event)
  }
}

#[cfg(test)]
mod tests {
  use std::vec;

  use embedded_hal::i2c::ErrorKind;
  use embedded_hal_mock::eh1::i2c::Transaction;

  use super::*;
  use crate::testutil::*;
  use crate::Config;

  #[test]
  fn status_byte_decoding_is_deterministic() {
    assert_eq!(decode_status(0x01), Some(KeyEvent { key: Key::Menu, pressed: true }));
    assert_eq!(decode_status(0x02), Some(KeyEvent { key: Key::Back, pressed: true }));
    assert_eq!(decode_status(0x81), Some(KeyEvent { key: Key::Menu, pressed: false }));
    assert_eq!(decode_status(0x82), Some(KeyEvent { key: Key::Back, pressed: false }));
  }

  #[test]
  fn unmapped_indices_decode_to_nothing() {
    assert_eq!(decode_status(0x00), None);
    assert_eq!(decode_status(0x03), None);
    assert_eq!(decode_status(0x07), None);
    assert_eq!(decode_status(0x80), None);
  }

  #[test]
  fn keycode_mask_ignores_upper_bits() {
    // 0x7A & 0x07 == 2, press bit clear
    assert_eq!(decode_status(0x7A), Some(KeyEvent { key: Key::Back, pressed: true }));
  }

  #[tokio::test]
  async fn accepted_press_reaches_the_sink_once() {
    let mut dev = driver(&[Transaction::read(ADDR, vec![0x02, 0, 0])]);
    activate(&mut dev);
    let mut sink = Sink::default();

    let event = dev.service_interrupt(&Touch(false), &mut sink).await;

    assert_eq!(event, Some(KeyEvent { key: Key::Back, pressed: true }));
    assert_eq!(sink.events, vec![KeyEvent { key: Key::Back, pressed: true }]);
    assert_eq!(sink.syncs, 1);
    finish(dev);
  }

  #[tokio::test]
  async fn press_is_suppressed_while_touchscreen_is_in_use() {
    let mut dev = driver(&[Transaction::read(ADDR, vec![0x02, 0, 0])]);
    activate(&mut dev);
    let mut sink = Sink::default();

    assert_eq!(dev.service_interrupt(&Touch(true), &mut sink).await, None);
    assert!(sink.events.is_empty());
    assert_eq!(sink.syncs, 0);
    finish(dev);
  }

  #[tokio::test]
  async fn release_is_never_suppressed() {
    let mut dev = driver(&[Transaction::read(ADDR, vec![0x82, 0, 0])]);
    activate(&mut dev);
    let mut sink = Sink::default();

    let event = dev.service_interrupt(&Touch(true), &mut sink).await;

    assert_eq!(event, Some(KeyEvent { key: Key::Back, pressed: false }));
    assert_eq!(sink.events.len(), 1);
    finish(dev);
  }

  #[tokio::test]
  async fn unmapped_index_is_dropped_silently() {
    let mut dev = driver(&[Transaction::read(ADDR, vec![0x07, 0, 0])]);
    activate(&mut dev);
    let mut sink = Sink::default();

    assert_eq!(dev.service_interrupt(&Touch(false), &mut sink).await, None);
    assert!(sink.events.is_empty());
    finish(dev);
  }

  #[tokio::test]
  async fn exhausted_read_drops_interrupt_and_stays_armed() {
    let mut dev = driver(&[
      Transaction::read(ADDR, vec![0; 3]).with_error(ErrorKind::Bus),
      Transaction::read(ADDR, vec![0; 3]).with_error(ErrorKind::Bus),
      Transaction::read(ADDR, vec![0; 3]).with_error(ErrorKind::Bus),
    ]);
    activate(&mut dev);
    let mut sink = Sink::default();

    assert_eq!(dev.service_interrupt(&Touch(false), &mut sink).await, None);
    assert!(sink.events.is_empty());
    assert!(dev.interrupts_enabled());
    finish(dev);
  }

  #[tokio::test]
  async fn extended_frame_caches_sensitivity_even_when_suppressed() {
    let mut frame = vec![0u8; 18];
    frame[0] = 0x01; // menu press, about to be suppressed
    frame[10] = 0x01;
    frame[11] = 0xF4; // menu sensitivity 500
    frame[12] = 0x01;
    frame[13] = 0x02; // back sensitivity 258
    let config = Config::default()
      .with_autocal(false)
      .with_frame_mode(crate::FrameMode::StatusWithSensitivity);
    let mut dev = driver_with(&[Transaction::read(ADDR, frame)], config);
    activate(&mut dev);
    let mut sink = Sink::default();

    assert_eq!(dev.service_interrupt(&Touch(true), &mut sink).await, None);
    assert!(sink.events.is_empty());
    assert_eq!(dev.menu_sensitivity(), 500);
    assert_eq!(dev.back_sensitivity(), 258);
    finish(dev);
  }

  #[tokio::test]
  async fn next_event_services_the_edge() {
    let mut dev = driver(&[Transaction::read(ADDR, vec![0x01, 0, 0])]);
    activate(&mut dev);
    let mut sink = Sink::default();

    let event = dev.next_event(&Touch(false), &mut sink).await;

    assert_eq!(event, Some(KeyEvent { key: Key::Menu, pressed: true }));
    finish(dev);
  }
}
