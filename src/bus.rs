use log::{debug, warn};

use crate::config::{BusConfig, Controller, DeviceConfig, Mode};
use crate::field::Field;
use crate::host::{Slot, SpiHost, Transaction};
use crate::{Error, Result, MAX_DEVICES};

/// Token for a device registered on a [`SpiBus`]
///
/// Valid from [`SpiBus::add_device`] until [`SpiBus::remove_device`]. Once
/// removed, every operation given the handle fails with
/// [`Error::NotFound`], even if the slot was handed to another device.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceHandle {
    controller: Controller,
    slot: Slot,
    generation: u32,
}

impl DeviceHandle {
    pub fn controller(&self) -> Controller {
        self.controller
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}

#[derive(Debug, Copy, Clone)]
struct Registered {
    generation: u32,
    config: DeviceConfig,
}

/// Register access to 8-bit SPI peripherals on one controller
///
/// Every helper issues whole transactions of one address byte (bit 7 set for
/// reads) followed by the payload. The bit and field writers are
/// read-modify-write sequences of two transactions and are not atomic with
/// respect to anything else writing the same register.
pub struct SpiBus<H>
where
    H: SpiHost,
{
    host: H,
    config: Option<BusConfig>,
    devices: [Option<Registered>; MAX_DEVICES],
    generation: u32,
}

impl<H> SpiBus<H>
where
    H: SpiHost,
{
    pub fn new(host: H) -> Self {
        Self {
            host,
            config: None,
            devices: [None; MAX_DEVICES],
            generation: 0,
        }
    }

    pub fn controller(&self) -> Controller {
        self.host.controller()
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&BusConfig> {
        self.config.as_ref()
    }

    pub fn device_count(&self) -> usize {
        self.devices.iter().flatten().count()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access to the host; transactions issued through it bypass the
    /// handle checks.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Configure and initialize the controller
    ///
    /// Fails with `InvalidArg` for an invalid pin set, `InvalidState` if the
    /// bus is already initialized, or whatever the host reports.
    pub fn begin(&mut self, config: BusConfig) -> Result<(), H::Error> {
        if self.config.is_some() {
            return Err(Error::InvalidState);
        }
        config.validate::<H::Error>()?;
        // a zero limit selects the default, however the config was built
        let config = config.max_transfer_size(config.max_transfer_size);
        self.host.initialize(&config)?;
        debug!(
            "{} initialized: mosi {:?}, miso {:?}, sclk {:?}, max transfer {} bytes",
            self.controller(),
            config.mosi,
            config.miso,
            config.sclk,
            config.max_transfer_size
        );
        self.config = Some(config);
        Ok(())
    }

    /// Release the controller
    ///
    /// All devices have to be removed first, `InvalidState` otherwise.
    pub fn close(&mut self) -> Result<(), H::Error> {
        if self.config.is_none() || self.device_count() > 0 {
            return Err(Error::InvalidState);
        }
        self.host.free()?;
        self.config = None;
        debug!("{} freed", self.controller());
        Ok(())
    }

    /// Register a device with the fixed register-access profile: 8 address
    /// bits, no command or dummy bits, one queued transaction.
    ///
    /// # Arguments
    /// * `mode` - SPI mode
    /// * `clock_speed_hz` - Clock speed, in Hz
    /// * `cs_pin` - Chip-select GPIO, `None` if not used
    pub fn add_device(
        &mut self,
        mode: Mode,
        clock_speed_hz: u32,
        cs_pin: Option<u8>,
    ) -> Result<DeviceHandle, H::Error> {
        self.add_device_with_config(DeviceConfig::new(mode, clock_speed_hz, cs_pin))
    }

    /// Register a device with a custom configuration. The address phase is
    /// forced to 8 bits, the register helpers depend on it.
    ///
    /// Fails with `NoMem` once the bus has handed out `u32::MAX` handles.
    pub fn add_device_with_config(
        &mut self,
        mut config: DeviceConfig,
    ) -> Result<DeviceHandle, H::Error> {
        if self.config.is_none() {
            return Err(Error::InvalidState);
        }
        config.address_bits = 8;
        config.validate::<H::Error>()?;

        let slots = self.host.cs_slots().min(MAX_DEVICES);
        let index = self.devices[..slots]
            .iter()
            .position(Option::is_none)
            .ok_or(Error::NotFound)?;
        let slot = Slot(index as u8);
        // generations are never reused, a stale handle must not come back to life
        let generation = self.generation.checked_add(1).ok_or(Error::NoMem)?;
        self.host.add_device(slot, &config)?;

        self.generation = generation;
        self.devices[index] = Some(Registered { generation, config });
        debug!(
            "{} slot {}: added device, {:?} at {} Hz, cs {:?}",
            self.controller(),
            slot.0,
            config.mode,
            config.clock_speed_hz,
            config.cs_pin
        );
        Ok(DeviceHandle {
            controller: self.controller(),
            slot,
            generation,
        })
    }

    /// Free the slot held by `device`; the handle is dead afterwards
    pub fn remove_device(&mut self, device: &DeviceHandle) -> Result<(), H::Error> {
        let slot = self.lookup(device)?;
        self.host.remove_device(slot)?;
        self.devices[slot.index()] = None;
        debug!("{} slot {}: removed device", self.controller(), slot.0);
        Ok(())
    }

    pub fn device_config(&self, device: &DeviceHandle) -> Result<&DeviceConfig, H::Error> {
        let slot = self.lookup(device)?;
        self.devices[slot.index()]
            .as_ref()
            .map(|registered| &registered.config)
            .ok_or(Error::NotFound)
    }

    fn lookup(&self, device: &DeviceHandle) -> Result<Slot, H::Error> {
        if device.controller != self.controller() {
            return Err(Error::NotFound);
        }
        match self.devices.get(device.slot.index()) {
            Some(Some(registered)) if registered.generation == device.generation => {
                Ok(device.slot)
            }
            _ => Err(Error::NotFound),
        }
    }

    fn check_length(&self, length: usize) -> Result<(), H::Error> {
        let config = self.config.as_ref().ok_or(Error::InvalidState)?;
        if length == 0 {
            return Err(Error::InvalidSize);
        }
        if length > config.max_transfer_size {
            return Err(Error::InvalidArg);
        }
        Ok(())
    }

    fn trace(&self, slot: Slot, direction: &str, register: u8, data: &[u8]) {
        if let Some(level) = self.config.as_ref().and_then(|config| config.log_readwrites) {
            log::log!(
                level,
                "[{}, slot:{}] {} {} bytes, register {:#04x}, data: {:02x?}",
                self.controller(),
                slot.0,
                direction,
                data.len(),
                register,
                data
            );
        }
    }

    /// Write `data` to consecutive registers starting at `register`
    pub async fn write_bytes(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        data: &[u8],
    ) -> Result<(), H::Error> {
        let slot = self.lookup(device)?;
        self.check_length(data.len())?;
        let mut transaction = Transaction::write(register, data);
        self.host.transmit(slot, &mut transaction).await?;
        self.trace(slot, "Write", register, data);
        Ok(())
    }

    /// Fill `buffer` from consecutive registers starting at `register`
    pub async fn read_bytes(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), H::Error> {
        let slot = self.lookup(device)?;
        self.check_length(buffer.len())?;
        let mut transaction = Transaction::read(register, buffer);
        self.host.transmit(slot, &mut transaction).await?;
        self.trace(slot, "Read", register, buffer);
        Ok(())
    }

    pub async fn write_byte(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        data: u8,
    ) -> Result<(), H::Error> {
        self.write_bytes(device, register, &[data]).await
    }

    pub async fn read_byte(&mut self, device: &DeviceHandle, register: u8) -> Result<u8, H::Error> {
        let mut buffer = [0u8; 1];
        self.read_bytes(device, register, &mut buffer).await?;
        Ok(buffer[0])
    }

    /// Set or clear bit `bit_num` (0 = LSB) of a register
    pub async fn write_bit(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        bit_num: u8,
        value: bool,
    ) -> Result<(), H::Error> {
        let field = Field::bit(bit_num).ok_or(Error::InvalidArg)?;
        let current = self.read_byte(device, register).await?;
        self.write_byte(device, register, field.insert(current, value as u8))
            .await
    }

    /// Write `value` into the `length` bits of a register that end at
    /// `bit_start` (MSB of the field) and run towards bit 0
    pub async fn write_bits(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        bit_start: u8,
        length: u8,
        value: u8,
    ) -> Result<(), H::Error> {
        let field = Field::new(bit_start, length).ok_or(Error::InvalidArg)?;
        let current = self.read_byte(device, register).await?;
        self.write_byte(device, register, field.insert(current, value))
            .await
    }

    pub async fn read_bit(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        bit_num: u8,
    ) -> Result<bool, H::Error> {
        Ok(self.read_bits(device, register, bit_num, 1).await? != 0)
    }

    /// Read the `length` bits ending at `bit_start`, shifted down to bit 0
    pub async fn read_bits(
        &mut self,
        device: &DeviceHandle,
        register: u8,
        bit_start: u8,
        length: u8,
    ) -> Result<u8, H::Error> {
        let field = Field::new(bit_start, length).ok_or(Error::InvalidArg)?;
        let current = self.read_byte(device, register).await?;
        Ok(field.extract(current))
    }
}

impl<H> Drop for SpiBus<H>
where
    H: SpiHost,
{
    fn drop(&mut self) {
        if self.config.is_none() {
            return;
        }
        let devices = self.device_count();
        if devices > 0 {
            warn!(
                "{} dropped with {} devices registered, controller left initialized",
                self.controller(),
                devices
            );
            return;
        }
        if let Err(err) = self.host.free() {
            warn!("{} free on drop failed: {}", self.controller(), err);
        }
    }
}
