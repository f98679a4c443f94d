/// Which read window the interrupt path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameMode {
  /// 3-byte status window; key events only.
  Status,
  /// 18-byte window; key events plus per-interrupt sensitivity snapshots.
  StatusWithSensitivity,
}

/// How the controller's supply rail is wired on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRail {
  /// Permanently powered; suspend only gates interrupts and the enable flag.
  AlwaysOn,
  /// A dedicated regulator line is driven across suspend/resume.
  Switched,
}

/// Board- and build-level capabilities, resolved at construction time.
///
/// The defaults describe a permanently powered panel with autocalibration
/// support and no bundled firmware image (so the automatic update path never
/// flashes). Adjust with the `with_*` helpers.
///
/// # Example
/// ```no_run
/// use tc360l::{Config, FrameMode, PowerRail};
///
/// let config = Config::default()
///   .with_power_rail(PowerRail::Switched)
///   .with_frame_mode(FrameMode::StatusWithSensitivity)
///   .with_bundled_versions(0x06, 0x02);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
  pub frame_mode: FrameMode,
  pub power_rail: PowerRail,
  /// Whether the controller supports the autocalibration command set.
  pub autocal: bool,
  /// Firmware version of the image bundled with the host build.
  pub bundled_firmware: u8,
  /// Newest module revision the bundled image may be flashed onto.
  pub bundled_module: u8,
}

impl Config {
  pub const fn new() -> Self {
    Self {
      frame_mode: FrameMode::Status,
      power_rail: PowerRail::AlwaysOn,
      autocal: true,
      bundled_firmware: 0,
      bundled_module: 0,
    }
  }

  pub const fn with_frame_mode(mut self, frame_mode: FrameMode) -> Self {
    self.frame_mode = frame_mode;
    self
  }

  pub const fn with_power_rail(mut self, power_rail: PowerRail) -> Self {
    self.power_rail = power_rail;
    self
  }

  pub const fn with_autocal(mut self, autocal: bool) -> Self {
    self.autocal = autocal;
    self
  }

  /// Set the firmware/module versions the automatic update path compares
  /// the device against.
  pub const fn with_bundled_versions(mut self, firmware: u8, module: u8) -> Self {
    self.bundled_firmware = firmware;
    self.bundled_module = module;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}
