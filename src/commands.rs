// src/commands.rs

use crate::registers::{IRQ_ERR, IRQ_IDLE, IRQ_RX, IRQ_TIMER};

/// Commands for the MFRC522 command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Idle = 0x00,
    CalcCrc = 0x03,
    Transmit = 0x04,
    Receive = 0x08,
    Transceive = 0x0C,
    Authent = 0x0E,
    SoftReset = 0x0F,
}

impl Command {
    /// Interrupts enabled while the command runs.
    pub const fn irq_enable(self) -> u8 {
        match self {
            Command::Authent => IRQ_IDLE | IRQ_ERR | IRQ_TIMER,
            Command::Transceive => 0x77,
            _ => 0x00,
        }
    }

    /// ComIrqReg bits that signal the command has completed.
    pub const fn wait_irq(self) -> u8 {
        match self {
            Command::Transceive => IRQ_RX | IRQ_IDLE,
            _ => IRQ_IDLE,
        }
    }
}

// Commands sent to the PICC
pub const PICC_REQIDL: u8 = 0x26;
pub const PICC_REQALL: u8 = 0x52;
pub const PICC_SEL_CL1: u8 = 0x93;
pub const PICC_AUTH_KEY_A: u8 = 0x60;
pub const PICC_AUTH_KEY_B: u8 = 0x61;
pub const PICC_READ: u8 = 0x30;
pub const PICC_WRITE: u8 = 0xA0;
pub const PICC_HALT: u8 = 0x50;

/// NVB for an anticollision frame: SEL + NVB only.
pub const NVB_ANTICOLL: u8 = 0x20;
/// NVB for a select frame: seven whole bytes.
pub const NVB_SELECT: u8 = 0x70;

/// MIFARE 4-bit acknowledge.
pub const MF_ACK: u8 = 0x0A;

/// Which card population a request wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// REQA: only cards in the IDLE state answer.
    Idle,
    /// WUPA: cards in IDLE and HALT answer.
    All,
}

impl RequestMode {
    pub const fn code(self) -> u8 {
        match self {
            RequestMode::Idle => PICC_REQIDL,
            RequestMode::All => PICC_REQALL,
        }
    }
}

/// Key slot used for Crypto1 authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    A,
    B,
}

impl KeyType {
    pub const fn code(self) -> u8 {
        match self {
            KeyType::A => PICC_AUTH_KEY_A,
            KeyType::B => PICC_AUTH_KEY_B,
        }
    }
}
