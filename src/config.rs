use embedded_hal::spi::{Phase, Polarity};

use crate::{Error, Result};

/// Largest transfer the controller accepts when no limit is configured
pub const DEFAULT_MAX_TRANSFER_SIZE: usize = 4094;

/// SPI controllers available to register devices on
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Controller {
    Hspi = 1,
    Vspi = 2,
}
impl core::fmt::Display for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Controller::Hspi => write!(f, "HSPI"),
            Controller::Vspi => write!(f, "VSPI"),
        }
    }
}

/// SPI clock mode (CPOL, CPHA)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    #[default]
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
}

impl Mode {
    pub fn polarity(self) -> Polarity {
        match self {
            Mode::Mode0 | Mode::Mode1 => Polarity::IdleLow,
            Mode::Mode2 | Mode::Mode3 => Polarity::IdleHigh,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Mode::Mode0 | Mode::Mode2 => Phase::CaptureOnFirstTransition,
            Mode::Mode1 | Mode::Mode3 => Phase::CaptureOnSecondTransition,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = Error<core::convert::Infallible>;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Mode0),
            1 => Ok(Mode::Mode1),
            2 => Ok(Mode::Mode2),
            3 => Ok(Mode::Mode3),
            _ => Err(Error::InvalidArg),
        }
    }
}

impl From<Mode> for embedded_hal::spi::Mode {
    fn from(mode: Mode) -> Self {
        embedded_hal::spi::Mode {
            polarity: mode.polarity(),
            phase: mode.phase(),
        }
    }
}

/// Pin set and limits used to bring up a controller
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub mosi: Option<u8>,
    pub miso: Option<u8>,
    pub sclk: Option<u8>,
    pub max_transfer_size: usize,
    /// Level for the per-transfer trace, `None` keeps it off
    pub log_readwrites: Option<log::Level>,
}

impl BusConfig {
    /// Create a bus configuration
    ///
    /// # Arguments
    /// * `mosi` - GPIO for Master-out Slave-in, `None` if unused
    /// * `miso` - GPIO for Master-in Slave-out, `None` if unused
    /// * `sclk` - GPIO for the clock line
    pub fn new(mosi: Option<u8>, miso: Option<u8>, sclk: Option<u8>) -> Self {
        Self {
            mosi,
            miso,
            sclk,
            max_transfer_size: DEFAULT_MAX_TRANSFER_SIZE,
            log_readwrites: None,
        }
    }

    /// Maximum transfer size in bytes, 0 restores the default
    pub fn max_transfer_size(mut self, size: usize) -> Self {
        self.max_transfer_size = if size == 0 {
            DEFAULT_MAX_TRANSFER_SIZE
        } else {
            size
        };
        self
    }

    pub fn log_readwrites(mut self, level: log::Level) -> Self {
        self.log_readwrites = Some(level);
        self
    }

    pub fn validate<E>(&self) -> Result<(), E> {
        let Some(sclk) = self.sclk else {
            return Err(Error::InvalidArg);
        };
        match (self.mosi, self.miso) {
            (None, None) => Err(Error::InvalidArg),
            (Some(mosi), Some(miso)) if mosi == miso => Err(Error::InvalidArg),
            (mosi, miso) if mosi == Some(sclk) || miso == Some(sclk) => Err(Error::InvalidArg),
            _ => Ok(()),
        }
    }

    /// Whether `gpio` is one of the data or clock lines
    pub fn uses_pin(&self, gpio: u8) -> bool {
        [self.mosi, self.miso, self.sclk].contains(&Some(gpio))
    }
}

/// Interface settings for one device on the bus
///
/// The register helpers put the register address in a single 8-bit address
/// phase, so `address_bits` is always 8 once the device is registered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub mode: Mode,
    pub clock_speed_hz: u32,
    /// Chip-select GPIO, `None` if the device has no CS line
    pub cs_pin: Option<u8>,
    pub command_bits: u8,
    pub address_bits: u8,
    pub dummy_bits: u8,
    /// Duty cycle of the positive clock, in 1/256ths (128 = 50%)
    pub duty_cycle_pos: u8,
    pub cs_ena_pretrans: u8,
    pub cs_ena_posttrans: u8,
    pub queue_size: u8,
}

impl DeviceConfig {
    pub fn new(mode: Mode, clock_speed_hz: u32, cs_pin: Option<u8>) -> Self {
        Self {
            mode,
            clock_speed_hz,
            cs_pin,
            command_bits: 0,
            address_bits: 8,
            dummy_bits: 0,
            duty_cycle_pos: 128,
            cs_ena_pretrans: 0,
            cs_ena_posttrans: 0,
            queue_size: 1,
        }
    }

    pub fn validate<E>(&self) -> Result<(), E> {
        if self.clock_speed_hz == 0 || self.queue_size == 0 || self.address_bits != 8 {
            return Err(Error::InvalidArg);
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new(Mode::Mode0, 1_000_000, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_raw_value() {
        assert_eq!(Mode::try_from(2), Ok(Mode::Mode2));
        assert_eq!(Mode::try_from(4), Err(Error::InvalidArg));
        let hal: embedded_hal::spi::Mode = Mode::Mode3.into();
        assert_eq!(hal, embedded_hal::spi::MODE_3);
    }

    #[test]
    fn bus_config_pins() {
        assert!(BusConfig::new(Some(5), Some(17), Some(23)).validate::<()>().is_ok());
        assert!(BusConfig::new(Some(5), None, Some(23)).validate::<()>().is_ok());
        assert_eq!(
            BusConfig::new(Some(5), Some(17), None).validate::<()>(),
            Err(Error::InvalidArg)
        );
        assert_eq!(
            BusConfig::new(None, None, Some(23)).validate::<()>(),
            Err(Error::InvalidArg)
        );
        assert_eq!(
            BusConfig::new(Some(5), Some(23), Some(23)).validate::<()>(),
            Err(Error::InvalidArg)
        );
    }

    #[test]
    fn zero_transfer_size_means_default() {
        let config = BusConfig::new(Some(5), Some(17), Some(23)).max_transfer_size(64);
        assert_eq!(config.max_transfer_size, 64);
        let config = config.max_transfer_size(0);
        assert_eq!(config.max_transfer_size, DEFAULT_MAX_TRANSFER_SIZE);
    }

    #[test]
    fn register_device_profile() {
        let config = DeviceConfig::new(Mode::Mode0, 1_000_000, Some(16));
        assert_eq!(config.address_bits, 8);
        assert_eq!(config.command_bits, 0);
        assert_eq!(config.dummy_bits, 0);
        assert_eq!(config.queue_size, 1);
        assert!(config.validate::<()>().is_ok());

        let zero_clock = DeviceConfig::new(Mode::Mode0, 0, Some(16));
        assert_eq!(zero_clock.validate::<()>(), Err(Error::InvalidArg));
    }
}
