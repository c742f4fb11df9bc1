#![no_std]
// src/lib.rs

pub mod registers;
pub mod commands;
pub mod errors;
pub mod card_types;
pub mod config;
pub mod interface;
pub mod cs_pin_wrapper;
pub mod poll;
pub mod rfid_rc522;
pub mod mifare;

#[cfg(test)]
mod sim;

pub use card_types::{Block, CardType, SectorKey, Uid, DEFAULT_KEY};
pub use commands::{KeyType, RequestMode};
pub use config::{AuthCheck, Config, CrcTimeout, PollPolicy};
pub use cs_pin_wrapper::{BusError, CsPinWrapper};
pub use errors::{ChipFault, InvalidUid, RFIDError};
pub use interface::{Interface, SpiInterface};
pub use mifare::Session;
pub use rfid_rc522::{Frame, RfidRc522};
