//! Register-level model of an MFRC522 with an optional MIFARE Classic 1K card
//! in its field. Implements [`Interface`] so the driver can run against it
//! unchanged.

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crc::{Crc, CRC_16_ISO_IEC_14443_3_A};
use embedded_hal::delay::DelayNs;

use crate::card_types::{Block, SectorKey, DEFAULT_KEY};
use crate::interface::Interface;
use crate::registers::*;

const CRC_A: Crc<u16> = Crc::<u16>::new(&CRC_16_ISO_IEC_14443_3_A);

fn crc_a(data: &[u8]) -> [u8; 2] {
    CRC_A.checksum(data).to_le_bytes()
}

fn with_crc(data: &[u8]) -> Vec<u8> {
    let mut frame = data.to_vec();
    frame.extend_from_slice(&crc_a(data));
    frame
}

fn crc_ok(frame: &[u8]) -> bool {
    frame.len() > 2 && crc_a(&frame[..frame.len() - 2]) == frame[frame.len() - 2..]
}

/// One register access as seen on the bus: `(address, value)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u8, u8),
    Write(u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusFault;

#[derive(Debug, Default)]
pub struct Faults {
    /// Every exchange fails.
    pub bus_down: bool,
    /// Transceive never raises an interrupt.
    pub never_idle: bool,
    /// CalcCRC never raises CRCIRq.
    pub crc_stuck: bool,
    /// Transceive completes with this ErrorReg value.
    pub error_reg: Option<u8>,
    /// Authent succeeds without setting MFCrypto1On.
    pub auth_without_crypto: bool,
}

pub struct SimChip {
    regs: [u8; 64],
    fifo: VecDeque<u8>,
    log: Vec<Access>,
    preloaded: Option<(Vec<u8>, u8)>,
    pub card: Option<SimCard>,
    pub faults: Faults,
}

impl SimChip {
    pub fn new() -> Self {
        let mut chip = SimChip {
            regs: [0; 64],
            fifo: VecDeque::new(),
            log: Vec::new(),
            preloaded: None,
            card: None,
            faults: Faults::default(),
        };
        chip.power_on();
        chip
    }

    fn power_on(&mut self) {
        self.regs = [0; 64];
        self.regs[Register::Command as usize] = 0x20;
        self.regs[Register::ComIEn as usize] = 0x80;
        self.regs[Register::Mode as usize] = 0x3F;
        self.regs[Register::TxControl as usize] = 0x80;
        self.regs[Register::RfCfg as usize] = 0x48;
        self.regs[Register::Version as usize] = 0x92;
        self.fifo.clear();
    }

    /// Next Transceive answers with `data` regardless of what was sent.
    pub fn preload_answer(&mut self, data: &[u8], last_bits: u8) {
        self.preloaded = Some((data.to_vec(), last_bits));
    }

    pub fn accesses(&self) -> &[Access] {
        &self.log
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, value) => Some((addr, value)),
                Access::Read(..) => None,
            })
            .collect()
    }

    pub fn reads_of(&self, reg: Register) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::Read(addr, _) if *addr == reg as u8))
            .count()
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.regs[reg as usize]
    }

    fn read(&mut self, addr: u8) -> u8 {
        if addr == Register::FifoData as u8 {
            self.fifo.pop_front().unwrap_or(0)
        } else if addr == Register::FifoLevel as u8 {
            self.fifo.len() as u8
        } else {
            self.regs[addr as usize]
        }
    }

    fn write(&mut self, addr: u8, value: u8) {
        match addr {
            a if a == Register::FifoData as u8 => self.fifo.push_back(value),
            a if a == Register::FifoLevel as u8 => {
                if value & FIFO_FLUSH != 0 {
                    self.fifo.clear();
                }
            }
            a if a == Register::ComIrq as u8 || a == Register::DivIrq as u8 => {
                let bits = value & !IRQ_SET1;
                if value & IRQ_SET1 != 0 {
                    self.regs[addr as usize] |= bits;
                } else {
                    self.regs[addr as usize] &= !bits;
                }
            }
            a if a == Register::Command as u8 => self.start_command(value & 0x0F),
            a if a == Register::BitFraming as u8 => {
                self.regs[addr as usize] = value;
                let transceiving = self.regs[Register::Command as usize] & 0x0F == 0x0C;
                if value & BIT_FRAMING_START_SEND != 0 && transceiving {
                    self.transceive(value & 0x07);
                }
            }
            _ => self.regs[addr as usize] = value,
        }
    }

    fn raise(&mut self, irq: u8) {
        self.regs[Register::ComIrq as usize] |= irq;
    }

    fn start_command(&mut self, command: u8) {
        if command == 0x0F {
            self.power_on();
            return;
        }
        self.regs[Register::Command as usize] = command;
        if command != 0x00 {
            self.regs[Register::Error as usize] = 0;
        }
        match command {
            0x03 => self.calc_crc(),
            0x04 => {
                self.fifo.clear();
                self.raise(IRQ_TX | IRQ_IDLE);
                self.regs[Register::Command as usize] = 0;
            }
            0x0E => self.authent(),
            _ => {}
        }
    }

    fn calc_crc(&mut self) {
        if self.faults.crc_stuck {
            return;
        }
        let data: Vec<u8> = self.fifo.drain(..).collect();
        let [low, high] = crc_a(&data);
        self.regs[Register::CrcResultLow as usize] = low;
        self.regs[Register::CrcResultHigh as usize] = high;
        self.regs[Register::DivIrq as usize] |= DIV_IRQ_CRC;
    }

    fn authent(&mut self) {
        let payload: Vec<u8> = self.fifo.drain(..).collect();
        self.regs[Register::Command as usize] = 0;
        let Some(card) = self.card.as_mut() else {
            self.raise(IRQ_TIMER);
            return;
        };
        if card.authenticate(&payload) {
            if !self.faults.auth_without_crypto {
                self.regs[Register::Status2 as usize] |= STATUS2_CRYPTO1_ON;
            }
            self.raise(IRQ_IDLE);
        } else {
            self.regs[Register::Status2 as usize] &= !STATUS2_CRYPTO1_ON;
            self.regs[Register::Error as usize] = ERR_PROTOCOL;
            self.raise(IRQ_ERR | IRQ_IDLE);
        }
    }

    fn transceive(&mut self, tx_last_bits: u8) {
        let sent: Vec<u8> = self.fifo.drain(..).collect();
        if self.faults.never_idle {
            return;
        }
        if let Some(err) = self.faults.error_reg {
            self.regs[Register::Error as usize] = err;
            self.raise(IRQ_ERR | IRQ_IDLE);
            return;
        }
        let answer = match self.preloaded.take() {
            Some(answer) => Some(answer),
            None => self.card.as_mut().and_then(|card| card.respond(&sent, tx_last_bits)),
        };
        match answer {
            Some((data, last_bits)) => {
                self.fifo.extend(data);
                let control = &mut self.regs[Register::Control as usize];
                *control = (*control & !CONTROL_RX_LAST_BITS) | last_bits;
                self.raise(IRQ_RX | IRQ_IDLE);
            }
            None => self.raise(IRQ_TIMER),
        }
    }
}

impl Interface for SimChip {
    type Error = SimBusFault;

    fn exchange(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        if self.faults.bus_down {
            return Err(SimBusFault);
        }
        let addr = (buf[0] >> 1) & 0x3F;
        if buf[0] & 0x80 != 0 {
            let value = self.read(addr);
            self.log.push(Access::Read(addr, value));
            buf[0] = 0;
            buf[1] = value;
        } else {
            let value = buf[1];
            self.log.push(Access::Write(addr, value));
            self.write(addr, value);
            buf.fill(0);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    Idle,
    Ready,
    Active,
    Authenticated { sector: u8 },
    Halt,
}

/// A MIFARE Classic 1K as seen through the air interface. Frames arrive in
/// plaintext; Crypto1 itself is not modelled.
pub struct SimCard {
    pub uid: [u8; 4],
    pub atqa: [u8; 2],
    pub sak: u8,
    pub key_a: SectorKey,
    pub key_b: SectorKey,
    pub blocks: [Block; 64],
    /// Anticollision answer carries a BCC with bit 0 flipped.
    pub corrupt_serial: bool,
    /// WRITE requests are refused with a NAK.
    pub nak_writes: bool,
    state: CardState,
    write_pending: Option<u8>,
}

const ACK: (u8, u8) = (0x0A, 4);
const NAK: (u8, u8) = (0x04, 4);

impl SimCard {
    /// Factory-fresh card: default keys, transport access bits, empty data blocks.
    pub fn classic_1k(uid: [u8; 4]) -> Self {
        let bcc = uid.iter().fold(0u8, |acc, b| acc ^ b);
        let mut blocks = [[0u8; 16]; 64];
        blocks[0][..4].copy_from_slice(&uid);
        blocks[0][4] = bcc;
        blocks[0][5] = 0x08;
        blocks[0][6..8].copy_from_slice(&[0x04, 0x00]);
        for trailer in blocks.iter_mut().skip(3).step_by(4) {
            trailer[..6].copy_from_slice(&DEFAULT_KEY);
            trailer[6..10].copy_from_slice(&[0xFF, 0x07, 0x80, 0x69]);
            trailer[10..].copy_from_slice(&DEFAULT_KEY);
        }
        SimCard {
            uid,
            atqa: [0x04, 0x00],
            sak: 0x08,
            key_a: DEFAULT_KEY,
            key_b: DEFAULT_KEY,
            blocks,
            corrupt_serial: false,
            nak_writes: false,
            state: CardState::Idle,
            write_pending: None,
        }
    }

    fn bcc(&self) -> u8 {
        self.uid.iter().fold(0u8, |acc, b| acc ^ b)
    }

    fn short(value: (u8, u8)) -> Option<(Vec<u8>, u8)> {
        Some((std::vec![value.0], value.1))
    }

    /// Answer to one frame, or `None` for silence.
    fn respond(&mut self, frame: &[u8], tx_last_bits: u8) -> Option<(Vec<u8>, u8)> {
        // Only REQA and WUPA are short frames; anything else with a partial
        // last byte is garbled.
        if tx_last_bits != 0 {
            let wakes = tx_last_bits == 7
                && frame.len() == 1
                && matches!(
                    (frame[0], self.state),
                    (0x26, CardState::Idle) | (0x52, CardState::Idle | CardState::Halt)
                );
            if wakes {
                self.state = CardState::Ready;
                return Some((self.atqa.to_vec(), 0));
            }
            if self.state != CardState::Halt {
                self.state = CardState::Idle;
            }
            return None;
        }

        if let Some(block) = self.write_pending.take() {
            if frame.len() == 18 && crc_ok(frame) {
                self.blocks[block as usize].copy_from_slice(&frame[..16]);
                return Self::short(ACK);
            }
            self.state = CardState::Idle;
            return Self::short(NAK);
        }

        match (self.state, frame) {
            (CardState::Ready, [0x93, 0x20]) => {
                let mut serial = self.uid.to_vec();
                serial.push(if self.corrupt_serial { self.bcc() ^ 0x01 } else { self.bcc() });
                Some((serial, 0))
            }
            (CardState::Ready, [0x93, 0x70, rest @ ..]) if rest.len() == 7 && crc_ok(frame) => {
                if rest[..4] != self.uid || rest[4] != self.bcc() {
                    return None;
                }
                self.state = CardState::Active;
                Some((with_crc(&[self.sak]), 0))
            }
            (_, [0x50, 0x00, _, _]) if crc_ok(frame) => {
                self.state = CardState::Halt;
                None
            }
            (CardState::Authenticated { sector }, [0x30, addr, _, _]) if crc_ok(frame) => {
                if *addr >= 64 || addr / 4 != sector {
                    self.state = CardState::Idle;
                    return Self::short(NAK);
                }
                Some((with_crc(&self.blocks[*addr as usize]), 0))
            }
            (CardState::Authenticated { sector }, [0xA0, addr, _, _]) if crc_ok(frame) => {
                if self.nak_writes || *addr >= 64 || addr / 4 != sector {
                    self.state = CardState::Idle;
                    return Self::short(NAK);
                }
                self.write_pending = Some(*addr);
                Self::short(ACK)
            }
            _ => {
                if self.state != CardState::Halt {
                    self.state = CardState::Idle;
                }
                None
            }
        }
    }

    /// `[key type, block, key(6), uid(4)]` as loaded for the Authent command.
    fn authenticate(&mut self, payload: &[u8]) -> bool {
        let selected = matches!(self.state, CardState::Active | CardState::Authenticated { .. });
        if !selected || payload.len() != 12 || payload[1] >= 64 || payload[8..] != self.uid {
            self.state = CardState::Idle;
            return false;
        }
        let key = match payload[0] {
            0x60 => self.key_a,
            0x61 => self.key_b,
            _ => {
                self.state = CardState::Idle;
                return false;
            }
        };
        if payload[2..8] != key {
            self.state = CardState::Idle;
            return false;
        }
        self.state = CardState::Authenticated { sector: payload[1] / 4 };
        true
    }
}

/// Delay that records what was asked of it instead of sleeping.
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub calls: u32,
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += ns as u64;
    }
}
