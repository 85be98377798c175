use crate::config::{BusConfig, Controller, DeviceConfig};
use crate::{Result, MAX_DEVICES, READ_FLAG, WRITE_MASK};

/// Hardware chip-select slot of a controller
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot(pub u8);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Data phase of a transaction
#[derive(Debug)]
pub enum Data<'a> {
    /// Bytes clocked out after the address byte
    Write(&'a [u8]),
    /// Buffer filled with the bytes clocked in after the address byte
    Read(&'a mut [u8]),
}

/// One address phase followed by one data phase
#[derive(Debug)]
pub struct Transaction<'a> {
    address: u8,
    data: Data<'a>,
}

impl<'a> Transaction<'a> {
    /// Write transaction, bit 7 of the address byte cleared
    pub fn write(register: u8, data: &'a [u8]) -> Self {
        Self {
            address: register & WRITE_MASK,
            data: Data::Write(data),
        }
    }

    /// Read transaction, bit 7 of the address byte set
    pub fn read(register: u8, buffer: &'a mut [u8]) -> Self {
        Self {
            address: register | READ_FLAG,
            data: Data::Read(buffer),
        }
    }

    /// Address byte as it goes on the wire
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn data(&self) -> &Data<'a> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data<'a> {
        &mut self.data
    }

    pub fn is_read(&self) -> bool {
        matches!(self.data, Data::Read(_))
    }

    pub fn len(&self) -> usize {
        match &self.data {
            Data::Write(data) => data.len(),
            Data::Read(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the data phase in bits
    pub fn bit_length(&self) -> usize {
        self.len() * 8
    }
}

/// SPI master controller driver that [`SpiBus`](crate::SpiBus) delegates to.
///
/// Implementations own the controller: they apply the pin set, keep the
/// per-slot device settings and clock each transaction out. They can assume
/// the bus manager only hands them validated configurations and free slots.
pub trait SpiHost {
    type Error: core::fmt::Debug;

    fn controller(&self) -> Controller;

    /// Number of hardware chip-select slots
    fn cs_slots(&self) -> usize {
        MAX_DEVICES
    }

    fn initialize(&mut self, config: &BusConfig) -> Result<(), Self::Error>;

    fn free(&mut self) -> Result<(), Self::Error>;

    fn add_device(&mut self, slot: Slot, config: &DeviceConfig) -> Result<(), Self::Error>;

    fn remove_device(&mut self, slot: Slot) -> Result<(), Self::Error>;

    /// Run one transaction and wait for it to complete
    async fn transmit(
        &mut self,
        slot: Slot,
        transaction: &mut Transaction<'_>,
    ) -> Result<(), Self::Error>;
}
