use core::fmt::{Debug, Formatter};

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::card_types::Block;
use crate::commands::Command;
use crate::config::{Config, CrcTimeout, PollPolicy};
use crate::errors::{ChipFault, RFIDError};
use crate::interface::Interface;
use crate::mifare::Session;
use crate::poll::Poller;
use crate::registers::*;

/// Most bytes drained from the FIFO after a Transceive.
pub const MAX_LEN: usize = 16;

pub type Result<T, E> = core::result::Result<T, RFIDError<E>>;

/// Bytes received by a Transceive, plus the exact number of bits the card sent.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    buf: [u8; MAX_LEN],
    len: u8,
    bits: u16,
}

impl Frame {
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    /// Received length in bits, computed before the FIFO drain was clamped.
    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` when `data()` does not hold every received bit.
    pub fn is_clamped(&self) -> bool {
        (self.bits as usize + 7) / 8 != self.len as usize
    }

    /// The frame as a full 16-byte block, if that is what it holds.
    pub fn to_block(&self) -> Option<Block> {
        self.data().try_into().ok()
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Frame({} bits, {:02x?})", self.bits, self.data())
    }
}

pub struct RfidRc522<I, D> {
    iface: I,
    delay: D,
    pub(crate) config: Config,
    pub(crate) session: Session,
}

impl<I, D> RfidRc522<I, D>
where
    I: Interface,
    D: DelayNs,
{
    pub fn new(iface: I, delay: D) -> Self {
        Self::with_config(iface, delay, Config::default())
    }

    pub fn with_config(iface: I, delay: D, config: Config) -> Self {
        RfidRc522 {
            iface,
            delay,
            config,
            session: Session::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn release(self) -> (I, D) {
        (self.iface, self.delay)
    }

    /// Soft reset followed by the timer, modulation and CRC preset the
    /// protocol layer relies on. Assumes the reset pin is already released.
    pub fn init(&mut self) -> Result<(), I::Error> {
        self.reset()?;

        // TAuto=1, TPreScaler=0xD3E: f_timer = 13.56 MHz / (2*3390+1) ~ 2 kHz
        self.write_register(Register::TMode, 0x8D)?;
        self.write_register(Register::TPrescaler, 0x3E)?;
        // 30 ticks ~ 15 ms before the chip gives up on the card
        self.write_register(Register::TReloadLow, 30)?;
        self.write_register(Register::TReloadHigh, 0)?;

        self.write_register(Register::TxAsk, 0x40)?; // 100% ASK
        self.write_register(Register::Mode, 0x3D)?; // CRC preset 0x6363
        self.antenna_on()?;

        self.session = Session::Idle;
        let version = self.version()?;
        debug!("MFRC522 initialised, version {:#04x}", version);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), I::Error> {
        self.write_register(Register::Command, Command::SoftReset as u8)?;
        // Oscillator start-up; the chip clears PowerDown once it is ready.
        let mut poller = Poller::new(PollPolicy::new(50_000, 3));
        while poller.tick(&mut self.delay) {
            if self.read_register(Register::Command)? & COMMAND_POWER_DOWN == 0 {
                break;
            }
        }
        self.session = Session::Idle;
        Ok(())
    }

    pub fn version(&mut self) -> Result<u8, I::Error> {
        self.read_register(Register::Version)
    }

    pub fn antenna_on(&mut self) -> Result<(), I::Error> {
        let current = self.read_register(Register::TxControl)?;
        if (current & TX_CONTROL_ANTENNA) != TX_CONTROL_ANTENNA {
            self.write_register(Register::TxControl, current | TX_CONTROL_ANTENNA)?;
        }
        Ok(())
    }

    pub fn antenna_off(&mut self) -> Result<(), I::Error> {
        self.clear_bits(Register::TxControl, TX_CONTROL_ANTENNA)
    }

    /// Receiver gain, 0 (18 dB) to 7 (48 dB).
    pub fn set_antenna_gain(&mut self, gain: u8) -> Result<(), I::Error> {
        self.clear_bits(Register::RfCfg, 0x70)?;
        self.set_bits(Register::RfCfg, (gain & 0x07) << 4)
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u8, I::Error> {
        let mut buf = [reg.read_address(), 0x00];
        self.iface.exchange(&mut buf).map_err(RFIDError::Bus)?;
        Ok(buf[1])
    }

    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), I::Error> {
        let mut buf = [reg.write_address(), value];
        self.iface.exchange(&mut buf).map_err(RFIDError::Bus)
    }

    /// Read-modify-write; relies on `&mut self` for exclusive bus access.
    pub fn set_bits(&mut self, reg: Register, mask: u8) -> Result<(), I::Error> {
        let current = self.read_register(reg)?;
        self.write_register(reg, current | mask)
    }

    pub fn clear_bits(&mut self, reg: Register, mask: u8) -> Result<(), I::Error> {
        let current = self.read_register(reg)?;
        self.write_register(reg, current & !mask)
    }

    fn write_fifo(&mut self, data: &[u8]) -> Result<(), I::Error> {
        for &byte in data {
            self.write_register(Register::FifoData, byte)?;
        }
        Ok(())
    }

    /// Runs `data` through the chip's CRC_A coprocessor. Returns `[low, high]`.
    pub fn calculate_crc(&mut self, data: &[u8]) -> Result<[u8; 2], I::Error> {
        self.write_register(Register::Command, Command::Idle as u8)?;
        self.write_register(Register::DivIrq, DIV_IRQ_CRC)?; // Set2=0 clears CRCIRq
        self.set_bits(Register::FifoLevel, FIFO_FLUSH)?;
        self.write_fifo(data)?;
        self.write_register(Register::Command, Command::CalcCrc as u8)?;

        let mut poller = Poller::new(self.config.crc_poll);
        let mut irq = 0;
        let mut done = false;
        while poller.tick(&mut self.delay) {
            irq = self.read_register(Register::DivIrq)?;
            if irq & DIV_IRQ_CRC != 0 {
                done = true;
                break;
            }
        }
        if !done {
            match self.config.crc_timeout {
                CrcTimeout::Fail => return Err(RFIDError::Timeout { irq }),
                CrcTimeout::Proceed => warn!("CRC coprocessor did not finish, using stale result"),
            }
        }

        self.write_register(Register::Command, Command::Idle as u8)?;
        let low = self.read_register(Register::CrcResultLow)?;
        let high = self.read_register(Register::CrcResultHigh)?;
        Ok([low, high])
    }

    /// Fills the last two bytes of `frame` with the CRC_A of the rest.
    pub(crate) fn append_crc<const N: usize>(&mut self, frame: &mut [u8; N]) -> Result<(), I::Error> {
        let crc = self.calculate_crc(&frame[..N - 2])?;
        frame[N - 2..].copy_from_slice(&crc);
        Ok(())
    }

    /// One full command cycle: load the FIFO, run `command`, wait for the
    /// chip, and for Transceive drain the answer.
    pub fn execute(&mut self, command: Command, payload: &[u8]) -> Result<Frame, I::Error> {
        let irq_en = command.irq_enable();
        let wait_irq = command.wait_irq();

        self.write_register(Register::ComIEn, irq_en | COM_IEN_IRQ_INV)?;
        self.write_register(Register::ComIrq, !IRQ_SET1)?; // clear all request bits
        self.set_bits(Register::FifoLevel, FIFO_FLUSH)?;
        self.write_register(Register::Command, Command::Idle as u8)?;

        self.write_fifo(payload)?;
        self.write_register(Register::Command, command as u8)?;

        let started = if command == Command::Transceive {
            self.set_bits(Register::BitFraming, BIT_FRAMING_START_SEND)
        } else {
            Ok(())
        };
        let irq = started.and_then(|()| self.await_irq(wait_irq));
        // StartSend must not stay armed, whatever happened above.
        let cleared = self.clear_bits(Register::BitFraming, BIT_FRAMING_START_SEND);
        let irq = irq?;
        cleared?;

        let error = self.read_register(Register::Error)?;
        if error & ERR_FATAL != 0 {
            return Err(RFIDError::Chip(ChipFault::Register(error)));
        }
        if irq & irq_en & IRQ_TIMER != 0 {
            return Err(RFIDError::NoCardInField);
        }
        if command != Command::Transceive {
            return Ok(Frame::default());
        }

        let count = self.read_register(Register::FifoLevel)?;
        let last_bits = self.read_register(Register::Control)? & CONTROL_RX_LAST_BITS;
        let bits = if last_bits != 0 {
            (count as u16).saturating_sub(1) * 8 + last_bits as u16
        } else {
            count as u16 * 8
        };

        let mut frame = Frame {
            bits,
            len: count.clamp(1, MAX_LEN as u8),
            ..Frame::default()
        };
        for slot in frame.buf.iter_mut().take(frame.len as usize) {
            *slot = self.read_register(Register::FifoData)?;
        }
        Ok(frame)
    }

    fn await_irq(&mut self, wait_irq: u8) -> Result<u8, I::Error> {
        let mut poller = Poller::new(self.config.command_poll);
        let mut irq = 0;
        while poller.tick(&mut self.delay) {
            irq = self.read_register(Register::ComIrq)?;
            if irq & (IRQ_TIMER | wait_irq) != 0 {
                return Ok(irq);
            }
        }
        Err(RFIDError::Timeout { irq })
    }
}
