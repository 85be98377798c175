//! Register access for 8-bit SPI peripherals.
//!
//! Every transfer is one address byte followed by the payload. Bit 7 of the
//! address byte selects the direction (set = read, cleared = write), the
//! register number sits in the low 7 bits.
//!
//! # Example
//!
//! ```ignore
//! use spibus::*;
//!
//! async fn example() -> Result<(), Error<impl core::fmt::Debug>> {
//!     // Any SpiHost works, HalHost wraps an embedded-hal SPI bus
//!     let mut host = HalHost::new(Controller::Vspi, spi, Mode::Mode0);
//!     host.cs_pin(16, cs)?;
//!
//!     let mut bus = SpiBus::new(host);
//!     bus.begin(BusConfig::new(Some(5), Some(17), Some(23)))?;
//!     let device = bus.add_device(Mode::Mode0, 1_000_000, Some(16))?;
//!
//!     // Burst read of six registers
//!     let mut buffer = [0u8; 6];
//!     bus.read_bytes(&device, 0x3B, &mut buffer).await?;
//!
//!     // Bit and field access
//!     bus.write_bit(&device, 0x6B, 6, false).await?;
//!     bus.write_bits(&device, 0x1B, 4, 2, 0b11).await?;
//!     let clock_source = bus.read_bits(&device, 0x6B, 2, 3).await?;
//!
//!     bus.remove_device(&device)?;
//!     bus.close()?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod bus;
pub mod config;
pub mod error;
pub mod field;
pub mod host;
pub mod spi;

pub use bus::{DeviceHandle, SpiBus};
pub use config::{BusConfig, Controller, DeviceConfig, Mode, DEFAULT_MAX_TRANSFER_SIZE};
pub use error::{Error, Result};
pub use field::Field;
pub use host::{Data, Slot, SpiHost, Transaction};
pub use spi::{HalError, HalHost};

/// Set on the address byte of a read (`addr | READ_FLAG`)
pub const READ_FLAG: u8 = 0x80;
/// Applied to the address byte of a write (`addr & WRITE_MASK`)
pub const WRITE_MASK: u8 = 0x7F;

/// Chip-select slots per controller
pub const MAX_DEVICES: usize = 3;
