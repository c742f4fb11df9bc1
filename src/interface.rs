// src/interface.rs

use embedded_hal::spi::SpiDevice;

/// Full-duplex byte exchange with the MFRC522.
///
/// `buf` goes out on MOSI and is overwritten in place with what came back on
/// MISO, one byte per byte, under a single chip-select assertion.
pub trait Interface {
    type Error;

    fn exchange(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Transport over an `embedded-hal` SPI device that manages its own chip select.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI>
where
    SPI: SpiDevice<u8>,
{
    pub fn new(spi: SPI) -> Self {
        SpiInterface { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Interface for SpiInterface<SPI>
where
    SPI: SpiDevice<u8>,
{
    type Error = SPI::Error;

    fn exchange(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transfer_in_place(buf)
    }
}
