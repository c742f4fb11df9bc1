use core::fmt::{self, Debug, Display, Formatter};
use ufmt::{uDebug, uWrite};

/// Why the chip or card refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipFault {
    /// ErrorReg snapshot with at least one fatal bit set.
    Register(u8),
    /// Response bit length other than the one the protocol step requires.
    UnexpectedBits(u16),
    /// 4-bit answer that was not an ACK.
    Nack(u8),
}

/// Structural problem with an anticollision response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidUid {
    /// Serial number was not 5 bytes long.
    Length(u8),
    /// XOR over all 5 bytes was not zero.
    Checksum(u8),
}

/// Errors raised by the driver; `E` is the transport error.
#[derive(Clone, PartialEq, Eq)]
pub enum RFIDError<E> {
    /// Transport failure, passed through untouched.
    Bus(E),
    /// A bounded poll ran out of attempts. Carries the last interrupt register read.
    Timeout { irq: u8 },
    Chip(ChipFault),
    /// The chip timer expired without any card answering.
    NoCardInField,
    InvalidCard(InvalidUid),
    /// Crypto1 handshake rejected. Carries Status2Reg at the time of failure.
    MifareAuth { status2: u8 },
    /// A sector is already authenticated; stop crypto before authenticating again.
    SessionActive,
}

impl<E> RFIDError<E> {
    /// `true` for the expected "nothing in the field" outcome of a poll.
    pub fn is_no_card(&self) -> bool {
        matches!(self, RFIDError::NoCardInField)
    }
}

impl<E: Debug> Debug for RFIDError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RFIDError::Bus(e) => write!(f, "Bus({:?})", e),
            RFIDError::Timeout { irq } => write!(f, "Timeout {{ irq: {:#04x} }}", irq),
            RFIDError::Chip(fault) => write!(f, "Chip({:?})", fault),
            RFIDError::NoCardInField => write!(f, "NoCardInField"),
            RFIDError::InvalidCard(reason) => write!(f, "InvalidCard({:?})", reason),
            RFIDError::MifareAuth { status2 } => write!(f, "MifareAuth {{ status2: {:#04x} }}", status2),
            RFIDError::SessionActive => write!(f, "SessionActive"),
        }
    }
}

impl<E> Display for RFIDError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RFIDError::Bus(_) => write!(f, "bus transfer failed"),
            RFIDError::Timeout { irq } => write!(f, "no response within waiting period (irq {:#04x})", irq),
            RFIDError::Chip(ChipFault::Register(err)) => write!(f, "chip reported error {:#04x}", err),
            RFIDError::Chip(ChipFault::UnexpectedBits(bits)) => write!(f, "unexpected response length of {} bits", bits),
            RFIDError::Chip(ChipFault::Nack(ack)) => write!(f, "card answered NAK {:#03x}", ack),
            RFIDError::NoCardInField => write!(f, "no card in field"),
            RFIDError::InvalidCard(InvalidUid::Length(len)) => write!(f, "serial number had invalid length {}", len),
            RFIDError::InvalidCard(InvalidUid::Checksum(xor)) => write!(f, "serial number checksum failed ({:#04x})", xor),
            RFIDError::MifareAuth { .. } => write!(f, "authentication failed"),
            RFIDError::SessionActive => write!(f, "a sector is already authenticated"),
        }
    }
}

impl uDebug for ChipFault {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            ChipFault::Register(err) => f.debug_tuple("Register")?.field(err)?.finish(),
            ChipFault::UnexpectedBits(bits) => f.debug_tuple("UnexpectedBits")?.field(bits)?.finish(),
            ChipFault::Nack(ack) => f.debug_tuple("Nack")?.field(ack)?.finish(),
        }
    }
}

impl uDebug for InvalidUid {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            InvalidUid::Length(len) => f.debug_tuple("Length")?.field(len)?.finish(),
            InvalidUid::Checksum(xor) => f.debug_tuple("Checksum")?.field(xor)?.finish(),
        }
    }
}

// The transport error is usually not uDebug, so only its presence is printed.
impl<E> uDebug for RFIDError<E> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            RFIDError::Bus(_) => f.write_str("Bus"),
            RFIDError::Timeout { irq } => f.debug_struct("Timeout")?.field("irq", irq)?.finish(),
            RFIDError::Chip(fault) => f.debug_tuple("Chip")?.field(fault)?.finish(),
            RFIDError::NoCardInField => f.write_str("NoCardInField"),
            RFIDError::InvalidCard(reason) => f.debug_tuple("InvalidCard")?.field(reason)?.finish(),
            RFIDError::MifareAuth { status2 } => f.debug_struct("MifareAuth")?.field("status2", status2)?.finish(),
            RFIDError::SessionActive => f.write_str("SessionActive"),
        }
    }
}
