use core::fmt::{Debug, Formatter, Result};
use ufmt::{uDebug, uWrite};

/// 6-byte Crypto1 sector key.
pub type SectorKey = [u8; 6];

/// Factory default key of a blank MIFARE Classic card.
pub const DEFAULT_KEY: SectorKey = [0xFF; 6];

/// One 16-byte MIFARE Classic block.
pub type Block = [u8; 16];

/// Number of blocks on a MIFARE Classic 1K card.
pub const CLASSIC_1K_BLOCKS: u8 = 64;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    MifareMini,
    Mifare1K,
    Mifare4K,
    MifareUltralight,
    MifarePlus,
    Iso14443_4,
    Unknown,
}

impl CardType {
    /// Classifies a tag by its SAK (NXP AN10833, section 3.2).
    pub fn from_sak(sak: u8) -> Self {
        match sak & 0x7F {
            0x09 => CardType::MifareMini,
            0x08 => CardType::Mifare1K,
            0x18 => CardType::Mifare4K,
            0x00 => CardType::MifareUltralight,
            0x10 | 0x11 => CardType::MifarePlus,
            0x20 => CardType::Iso14443_4,
            _ => CardType::Unknown,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CardType::MifareMini => "MifareMini",
            CardType::Mifare1K => "Mifare1K",
            CardType::Mifare4K => "Mifare4K",
            CardType::MifareUltralight => "MifareUltralight",
            CardType::MifarePlus => "MifarePlus",
            CardType::Iso14443_4 => "Iso14443_4",
            CardType::Unknown => "Unknown",
        }
    }
}

impl Debug for CardType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.name())
    }
}

impl uDebug for CardType {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.name())
    }
}

/// Single-size (4 byte) UID resolved by anticollision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uid {
    bytes: [u8; 4],
}

impl Uid {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Uid { bytes }
    }

    /// Validates a 5-byte anticollision answer (4 UID bytes + BCC).
    ///
    /// Returns the XOR over all five bytes on failure; it is zero for a valid serial.
    pub fn from_serial(serial: &[u8; 5]) -> core::result::Result<Self, u8> {
        let check = serial.iter().fold(0u8, |acc, b| acc ^ b);
        if check != 0 {
            return Err(check);
        }
        Ok(Uid {
            bytes: [serial[0], serial[1], serial[2], serial[3]],
        })
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.bytes
    }

    /// Block check character sent after the UID in a select frame.
    pub fn bcc(&self) -> u8 {
        self.bytes.iter().fold(0u8, |acc, b| acc ^ b)
    }
}

impl uDebug for Uid {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uDebug::fmt(&self.bytes[..], f)
    }
}
