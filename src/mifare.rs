//! ISO14443-A activation and MIFARE Classic block access.
//!
//! A caller walks the card through
//! `request → anticollide → select_tag → authenticate → read/write → stop_crypto`.
//! Each step is one or more command cycles on the chip. The driver mirrors
//! the chip's Crypto1 flag in [`Session`] so that a stale authentication is
//! never silently reused.

use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

use crate::card_types::{Block, SectorKey, Uid, CLASSIC_1K_BLOCKS};
use crate::commands::*;
use crate::config::AuthCheck;
use crate::errors::{ChipFault, InvalidUid, RFIDError};
use crate::interface::Interface;
use crate::registers::{Register, STATUS2_CRYPTO1_ON};
use crate::rfid_rc522::{Frame, Result, RfidRc522};

/// Where the card is in the activation sequence, as far as the driver knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Idle,
    /// A card answered REQA/WUPA; its UID is not resolved yet.
    CardPresent { atqa: [u8; 2] },
    Selected { uid: Uid, sak: u8 },
    /// Crypto1 is armed for the sector holding `block`.
    Authenticated { uid: Uid, sak: u8, block: u8, key_type: KeyType },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }
}

impl<I, D> RfidRc522<I, D>
where
    I: Interface,
    D: DelayNs,
{
    pub fn session(&self) -> Session {
        self.session
    }

    /// Sends REQA or WUPA and returns the card's ATQA.
    pub fn request(&mut self, mode: RequestMode) -> Result<[u8; 2], I::Error> {
        let result = self.try_request(mode);
        self.guard(result)
    }

    fn try_request(&mut self, mode: RequestMode) -> Result<[u8; 2], I::Error> {
        self.end_session()?;
        // Short frame: only 7 bits of the single byte are sent.
        self.write_register(Register::BitFraming, 0x07)?;
        let frame = self.execute(Command::Transceive, &[mode.code()])?;
        if frame.bits() != 16 {
            return Err(RFIDError::Chip(ChipFault::UnexpectedBits(frame.bits())));
        }
        let atqa = [frame.data()[0], frame.data()[1]];
        debug!("card answered {:?} with ATQA {:02x?}", mode, atqa);
        self.session = Session::CardPresent { atqa };
        Ok(atqa)
    }

    /// Cascade level 1 anticollision. Only a single card in the field is supported.
    pub fn anticollide(&mut self) -> Result<Uid, I::Error> {
        let result = self.try_anticollide();
        self.guard(result)
    }

    fn try_anticollide(&mut self) -> Result<Uid, I::Error> {
        self.write_register(Register::BitFraming, 0x00)?;
        let frame = self.execute(Command::Transceive, &[PICC_SEL_CL1, NVB_ANTICOLL])?;
        let serial: &[u8; 5] = frame
            .data()
            .try_into()
            .map_err(|_| RFIDError::InvalidCard(InvalidUid::Length(frame.len() as u8)))?;
        let uid = Uid::from_serial(serial).map_err(|xor| RFIDError::InvalidCard(InvalidUid::Checksum(xor)))?;
        debug!("anticollision resolved UID {:02x?}", uid.as_bytes());
        Ok(uid)
    }

    /// Selects `uid` and returns its SAK.
    ///
    /// A rejected or garbled select yields `Ok(0)` rather than an error, since
    /// cards leaving the field mid-selection are routine. Transport failures
    /// are still returned.
    pub fn select_tag(&mut self, uid: &Uid) -> Result<u8, I::Error> {
        match self.try_select(uid) {
            Ok(sak) => Ok(sak),
            Err(RFIDError::Bus(e)) => self.guard(Err(RFIDError::Bus(e))),
            Err(err) => {
                debug!("select {:02x?} failed: {}", uid.as_bytes(), err);
                self.end_session()?;
                Ok(0)
            }
        }
    }

    fn try_select(&mut self, uid: &Uid) -> Result<u8, I::Error> {
        self.end_session()?;
        self.write_register(Register::BitFraming, 0x00)?;
        let id = uid.as_bytes();
        let mut buf = [PICC_SEL_CL1, NVB_SELECT, id[0], id[1], id[2], id[3], uid.bcc(), 0, 0];
        self.append_crc(&mut buf)?;
        let frame = self.execute(Command::Transceive, &buf)?;
        // SAK + CRC_A
        if frame.bits() != 24 {
            return Err(RFIDError::Chip(ChipFault::UnexpectedBits(frame.bits())));
        }
        let sak = frame.data()[0];
        debug!("selected {:02x?}, SAK {:#04x}", id, sak);
        self.session = Session::Selected { uid: *uid, sak };
        Ok(sak)
    }

    /// Three-pass Crypto1 authentication of the sector containing `block`.
    ///
    /// `NoCardInField` is returned as is; any other chip or card failure
    /// becomes `MifareAuth`. Fails with `SessionActive` if a sector is still
    /// authenticated: call [`stop_crypto`](Self::stop_crypto) or
    /// [`halt`](Self::halt) first.
    pub fn authenticate(&mut self, key_type: KeyType, block: u8, key: &SectorKey, uid: &Uid) -> Result<(), I::Error> {
        if self.session.is_authenticated() {
            return Err(RFIDError::SessionActive);
        }
        let result = self.try_authenticate(key_type, block, key, uid);
        self.guard(result)
    }

    fn try_authenticate(&mut self, key_type: KeyType, block: u8, key: &SectorKey, uid: &Uid) -> Result<(), I::Error> {
        let mut buf = [0u8; 12];
        buf[0] = key_type.code();
        buf[1] = block;
        buf[2..8].copy_from_slice(key);
        buf[8..].copy_from_slice(uid.as_bytes());

        match self.execute(Command::Authent, &buf) {
            Ok(_) => {}
            Err(err @ (RFIDError::NoCardInField | RFIDError::Bus(_))) => return Err(err),
            Err(err) => {
                debug!("authentication of block {} failed: {}", block, err);
                let status2 = self.read_register(Register::Status2)?;
                return Err(RFIDError::MifareAuth { status2 });
            }
        }

        let status2 = self.read_register(Register::Status2)?;
        if status2 & STATUS2_CRYPTO1_ON == 0 {
            match self.config.auth_check {
                AuthCheck::Strict => return Err(RFIDError::MifareAuth { status2 }),
                AuthCheck::Lenient => warn!("MFCrypto1On not set after authenticating block {}", block),
            }
        }

        let sak = match self.session {
            Session::Selected { sak, .. } | Session::Authenticated { sak, .. } => sak,
            _ => 0,
        };
        self.session = Session::Authenticated {
            uid: *uid,
            sak,
            block,
            key_type,
        };
        debug!("authenticated block {} with key {:?}", block, key_type);
        Ok(())
    }

    /// Switches the Crypto1 unit off, ending the authenticated session.
    pub fn stop_crypto(&mut self) -> Result<(), I::Error> {
        self.clear_bits(Register::Status2, STATUS2_CRYPTO1_ON)?;
        self.session = Session::Idle;
        Ok(())
    }

    /// Reads one block. Returns up to 16 bytes; the card's CRC_A is dropped.
    pub fn read_block(&mut self, address: u8) -> Result<Frame, I::Error> {
        let result = self.try_read_block(address);
        self.guard(result)
    }

    fn try_read_block(&mut self, address: u8) -> Result<Frame, I::Error> {
        let mut buf = [PICC_READ, address, 0, 0];
        self.append_crc(&mut buf)?;
        let frame = self.execute(Command::Transceive, &buf)?;
        debug!("block {}: {:02x?}", address, frame.data());
        Ok(frame)
    }

    /// Writes one block in two phases: the WRITE command, then the 16 data
    /// bytes. Each phase must be acknowledged. A failure in the data phase
    /// leaves the card's previous contents in an unknown state.
    pub fn write_block(&mut self, address: u8, data: &Block) -> Result<(), I::Error> {
        let result = self.try_write_block(address, data);
        self.guard(result)
    }

    fn try_write_block(&mut self, address: u8, data: &Block) -> Result<(), I::Error> {
        let mut command = [PICC_WRITE, address, 0, 0];
        self.append_crc(&mut command)?;
        let ack = self.execute(Command::Transceive, &command)?;
        check_ack(&ack)?;

        let mut payload = [0u8; 18];
        payload[..16].copy_from_slice(data);
        self.append_crc(&mut payload)?;
        let ack = self.execute(Command::Transceive, &payload)?;
        check_ack(&ack)?;

        debug!("wrote block {}", address);
        Ok(())
    }

    /// Sends HLTA and ends any session. A halted card does not answer, so
    /// silence is the success case.
    pub fn halt(&mut self) -> Result<(), I::Error> {
        let result = self.try_halt();
        self.guard(result)?;
        self.end_session()
    }

    fn try_halt(&mut self) -> Result<(), I::Error> {
        self.write_register(Register::BitFraming, 0x00)?;
        let mut buf = [PICC_HALT, 0x00, 0, 0];
        self.append_crc(&mut buf)?;
        match self.execute(Command::Transceive, &buf) {
            Err(RFIDError::NoCardInField) => Ok(()),
            Ok(frame) => Err(RFIDError::Chip(ChipFault::UnexpectedBits(frame.bits()))),
            Err(err) => Err(err),
        }
    }

    /// Authenticates (key A) and reads each of the 64 blocks of a 1K card in
    /// turn, handing every block to `sink`. The first failure ends the dump.
    ///
    /// The last sector stays authenticated afterwards.
    pub fn dump_classic_1k<F>(&mut self, key: &SectorKey, uid: &Uid, mut sink: F) -> Result<(), I::Error>
    where
        F: FnMut(u8, &Frame),
    {
        if self.session.is_authenticated() {
            return Err(RFIDError::SessionActive);
        }
        for block in 0..CLASSIC_1K_BLOCKS {
            // Re-authenticating with Crypto1 on is a nested authentication,
            // which the chip handles itself.
            let result = self.try_authenticate(KeyType::A, block, key, uid);
            self.guard(result)?;
            let frame = self.read_block(block)?;
            sink(block, &frame);
        }
        Ok(())
    }

    /// Drops Crypto1 if it is armed and forgets the card. Also run before a
    /// fresh request or select.
    fn end_session(&mut self) -> Result<(), I::Error> {
        if self.session.is_authenticated() {
            self.clear_bits(Register::Status2, STATUS2_CRYPTO1_ON)?;
        }
        self.session = Session::Idle;
        Ok(())
    }

    /// Failure path of every protocol step: the card has dropped back to
    /// IDLE or HALT, so the chip must not keep encrypting.
    fn guard<T>(&mut self, result: Result<T, I::Error>) -> Result<T, I::Error> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if err.is_no_card() {
            trace!("no card in field");
        } else {
            debug!("card step failed: {}", err);
        }
        if !matches!(err, RFIDError::Bus(_)) {
            self.end_session()?;
        } else {
            self.session = Session::Idle;
        }
        Err(err)
    }
}

fn check_ack<E>(frame: &Frame) -> Result<(), E> {
    if frame.bits() != 4 {
        return Err(RFIDError::Chip(ChipFault::UnexpectedBits(frame.bits())));
    }
    let nibble = frame.data()[0] & 0x0F;
    if nibble != MF_ACK {
        return Err(RFIDError::Chip(ChipFault::Nack(nibble)));
    }
    Ok(())
}
