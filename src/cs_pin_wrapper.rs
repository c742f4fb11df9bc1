// src/cs_pin_wrapper.rs

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::interface::Interface;

/// Error from a bus + chip-select transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError<S, P> {
    Spi(S),
    Pin(P),
}

/// Transport over a raw SPI bus with a separately driven, active-low chip select.
pub struct CsPinWrapper<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> CsPinWrapper<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Takes ownership of the bus and parks chip select high.
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self, BusError<SPI::Error, CS::Error>> {
        cs.set_high().map_err(BusError::Pin)?;
        Ok(CsPinWrapper { spi, cs })
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), SPI::Error> {
        self.spi.transfer_in_place(buf)?;
        self.spi.flush()
    }
}

impl<SPI, CS> Interface for CsPinWrapper<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    type Error = BusError<SPI::Error, CS::Error>;

    fn exchange(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(BusError::Pin)?;
        let result = self.transfer(buf).map_err(BusError::Spi);
        // Release chip select even when the transfer failed.
        self.cs.set_high().map_err(BusError::Pin)?;
        result
    }
}
