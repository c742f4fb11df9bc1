// src/registers.rs

/// MFRC522 register map (datasheet section 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    // Command and status
    Command = 0x01,
    ComIEn = 0x02,      // Enable and disable interrupt request control bits
    DivIEn = 0x03,      // DivIrq interrupt enable
    ComIrq = 0x04,      // Interrupt request bits
    DivIrq = 0x05,      // Set bits to signal internal events
    Error = 0x06,       // Error bits showing the error status of the last command
    Status1 = 0x07,     // Communication status bits
    Status2 = 0x08,     // Receiver and transmitter status bits
    FifoData = 0x09,    // FIFO data input/output
    FifoLevel = 0x0A,   // Number of bytes in the FIFO buffer
    WaterLevel = 0x0B,  // Level for FIFO underflow and overflow warning
    Control = 0x0C,     // Miscellaneous control bits
    BitFraming = 0x0D,  // Adjustments for bit-oriented frames
    Coll = 0x0E,        // Collision detection

    // Command
    Mode = 0x11,        // Defines general modes for transmitting and receiving
    TxMode = 0x12,      // Transmission data rate and framing
    RxMode = 0x13,      // Reception data rate and framing
    TxControl = 0x14,   // Logical behavior of the antenna driver pins TX1 and TX2
    TxAsk = 0x15,       // Transmission modulation
    TxSel = 0x16,
    RxSel = 0x17,
    RxThreshold = 0x18,
    Demod = 0x19,
    MfTx = 0x1C,
    MfRx = 0x1D,
    SerialSpeed = 0x1F,

    // Configuration
    CrcResultHigh = 0x21, // CRC calculation result, MSB
    CrcResultLow = 0x22,  // CRC calculation result, LSB
    ModWidth = 0x24,
    RfCfg = 0x26,       // Receiver gain
    GsN = 0x27,
    CwGsP = 0x28,
    ModGsP = 0x29,
    TMode = 0x2A,       // Timer settings
    TPrescaler = 0x2B,
    TReloadHigh = 0x2C,
    TReloadLow = 0x2D,
    TCounterValHigh = 0x2E,
    TCounterValLow = 0x2F,

    // Test
    TestSel1 = 0x31,
    TestSel2 = 0x32,
    TestPinEn = 0x33,
    TestPinValue = 0x34,
    TestBus = 0x35,
    AutoTest = 0x36,
    Version = 0x37,     // Shows the software version
    AnalogTest = 0x38,
    TestDac1 = 0x39,
    TestDac2 = 0x3A,
    TestAdc = 0x3B,
}

impl Register {
    /// Address byte for an SPI read: `1 aaaaaa 0`.
    pub const fn read_address(self) -> u8 {
        ((self as u8) << 1) & 0x7E | 0x80
    }

    /// Address byte for an SPI write: `0 aaaaaa 0`.
    pub const fn write_address(self) -> u8 {
        ((self as u8) << 1) & 0x7E
    }
}

// ComIEnReg bit 7 inverts the IRQ pin
pub const COM_IEN_IRQ_INV: u8 = 0x80;

// ComIEnReg / ComIrqReg bits
pub const IRQ_SET1: u8 = 0x80;
pub const IRQ_TX: u8 = 0x40;
pub const IRQ_RX: u8 = 0x20;
pub const IRQ_IDLE: u8 = 0x10;
pub const IRQ_HI_ALERT: u8 = 0x08;
pub const IRQ_LO_ALERT: u8 = 0x04;
pub const IRQ_ERR: u8 = 0x02;
pub const IRQ_TIMER: u8 = 0x01;

// DivIrqReg bits
pub const DIV_IRQ_CRC: u8 = 0x04;

// ErrorReg bits
pub const ERR_WR: u8 = 0x80;
pub const ERR_TEMP: u8 = 0x40;
pub const ERR_BUFFER_OVFL: u8 = 0x10;
pub const ERR_COLL: u8 = 0x08;
pub const ERR_CRC: u8 = 0x04;
pub const ERR_PARITY: u8 = 0x02;
pub const ERR_PROTOCOL: u8 = 0x01;

/// Error bits that abort a command cycle.
pub const ERR_FATAL: u8 = ERR_BUFFER_OVFL | ERR_COLL | ERR_CRC | ERR_PARITY | ERR_PROTOCOL;

// Status2Reg bits
pub const STATUS2_CRYPTO1_ON: u8 = 0x08;

// FIFOLevelReg bits
pub const FIFO_FLUSH: u8 = 0x80;

// ControlReg bits
pub const CONTROL_RX_LAST_BITS: u8 = 0x07;

// BitFramingReg bits
pub const BIT_FRAMING_START_SEND: u8 = 0x80;

// CommandReg bits
pub const COMMAND_POWER_DOWN: u8 = 0x10;

// TxControlReg bits
pub const TX_CONTROL_ANTENNA: u8 = 0x03;
