use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus as HalSpiBus;

use crate::config::{BusConfig, Controller, DeviceConfig, Mode};
use crate::host::{Data, Slot, SpiHost, Transaction};
use crate::{Error, Result, MAX_DEVICES};

/// Failure of the SPI peripheral or of a chip-select line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError<SE, PE> {
    Spi(SE),
    Pin(PE),
}

struct CsLine<CS> {
    gpio: u8,
    pin: CS,
}

#[derive(Debug, Copy, Clone)]
struct SlotState {
    line: Option<usize>,
    config: DeviceConfig,
}

/// [`SpiHost`] on top of an embedded-hal SPI bus with GPIO chip selects
///
/// The HAL fixes mode and clock when the SPI peripheral is built, so every
/// device has to use the mode given to [`HalHost::new`]; the clock speed of
/// a device is recorded but not applied. Chip selects are active low and are
/// registered up front under their GPIO number.
pub struct HalHost<SPI, CS> {
    controller: Controller,
    spi: SPI,
    mode: Mode,
    cs: [Option<CsLine<CS>>; MAX_DEVICES],
    slots: [Option<SlotState>; MAX_DEVICES],
    initialized: bool,
}

impl<SPI, CS> HalHost<SPI, CS>
where
    SPI: HalSpiBus,
    CS: OutputPin,
{
    pub fn new(controller: Controller, spi: SPI, mode: Mode) -> Self {
        Self {
            controller,
            spi,
            mode,
            cs: core::array::from_fn(|_| None),
            slots: [None; MAX_DEVICES],
            initialized: false,
        }
    }

    /// Make `pin` available as chip select `gpio`
    pub fn cs_pin(&mut self, gpio: u8, pin: CS) -> Result<(), HalError<SPI::Error, CS::Error>> {
        if self.cs.iter().flatten().any(|line| line.gpio == gpio) {
            return Err(Error::InvalidArg);
        }
        let free = self
            .cs
            .iter_mut()
            .find(|line| line.is_none())
            .ok_or(Error::NoMem)?;
        *free = Some(CsLine { gpio, pin });
        Ok(())
    }

    /// Settings of the device in `slot`
    pub fn device(&self, slot: Slot) -> Option<&DeviceConfig> {
        self.slots
            .get(slot.index())
            .and_then(Option::as_ref)
            .map(|state| &state.config)
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    fn set_cs(&mut self, line: usize, high: bool) -> Result<(), HalError<SPI::Error, CS::Error>> {
        let Some(cs) = self.cs[line].as_mut() else {
            return Err(Error::NotFound);
        };
        let result = if high {
            cs.pin.set_high()
        } else {
            cs.pin.set_low()
        };
        result.map_err(|err| Error::Bus(HalError::Pin(err)))
    }

    async fn exchange(
        &mut self,
        transaction: &mut Transaction<'_>,
    ) -> core::result::Result<(), SPI::Error> {
        self.spi.write(&[transaction.address()]).await?;
        match transaction.data_mut() {
            Data::Write(data) => self.spi.write(*data).await?,
            Data::Read(buffer) => self.spi.read(&mut **buffer).await?,
        }
        self.spi.flush().await
    }
}

impl<SPI, CS> SpiHost for HalHost<SPI, CS>
where
    SPI: HalSpiBus,
    CS: OutputPin,
{
    type Error = HalError<SPI::Error, CS::Error>;

    fn controller(&self) -> Controller {
        self.controller
    }

    fn initialize(&mut self, config: &BusConfig) -> Result<(), Self::Error> {
        if self.initialized {
            return Err(Error::InvalidState);
        }
        if self.cs.iter().flatten().any(|line| config.uses_pin(line.gpio)) {
            return Err(Error::InvalidArg);
        }
        for line in 0..MAX_DEVICES {
            if self.cs[line].is_some() {
                self.set_cs(line, true)?;
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn free(&mut self) -> Result<(), Self::Error> {
        if !self.initialized || self.slots.iter().any(Option::is_some) {
            return Err(Error::InvalidState);
        }
        self.initialized = false;
        Ok(())
    }

    fn add_device(&mut self, slot: Slot, config: &DeviceConfig) -> Result<(), Self::Error> {
        if !self.initialized {
            return Err(Error::InvalidState);
        }
        match self.slots.get(slot.index()) {
            Some(None) => {}
            _ => return Err(Error::NotFound),
        }
        if config.mode != self.mode {
            return Err(Error::InvalidArg);
        }
        let line = match config.cs_pin {
            None => None,
            Some(gpio) => {
                let line = self
                    .cs
                    .iter()
                    .position(|line| matches!(line, Some(line) if line.gpio == gpio))
                    .ok_or(Error::InvalidArg)?;
                let claimed = self.slots.iter().flatten().any(|state| state.line == Some(line));
                if claimed {
                    return Err(Error::InvalidArg);
                }
                Some(line)
            }
        };
        self.slots[slot.index()] = Some(SlotState {
            line,
            config: *config,
        });
        Ok(())
    }

    fn remove_device(&mut self, slot: Slot) -> Result<(), Self::Error> {
        match self.slots.get_mut(slot.index()) {
            Some(state @ Some(_)) => {
                *state = None;
                Ok(())
            }
            _ => Err(Error::NotFound),
        }
    }

    async fn transmit(
        &mut self,
        slot: Slot,
        transaction: &mut Transaction<'_>,
    ) -> Result<(), Self::Error> {
        let state = self
            .slots
            .get(slot.index())
            .copied()
            .flatten()
            .ok_or(Error::NotFound)?;

        if let Some(line) = state.line {
            self.set_cs(line, false)?;
        }
        let result = self.exchange(transaction).await;
        // CS goes back high even when the transfer failed; the transfer
        // error wins over a failed release
        let released = match state.line {
            Some(line) => self.set_cs(line, true),
            None => Ok(()),
        };
        result.map_err(|err| Error::Bus(HalError::Spi(err)))?;
        released
    }
}
