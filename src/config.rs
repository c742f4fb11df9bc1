//! Driver tuning.
//!
//! Chip register values written by `init` are fixed; what varies between
//! deployments is how long the driver waits and how strictly it treats the
//! two historically lenient checks.

/// Bounded poll: wait `interval_us` before each of `attempts` probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval_us: u32,
    pub attempts: u16,
}

impl PollPolicy {
    pub const fn new(interval_us: u32, attempts: u16) -> Self {
        PollPolicy { interval_us, attempts }
    }

    /// Tight spin with no delay between probes.
    pub const fn spin(attempts: u16) -> Self {
        PollPolicy { interval_us: 0, attempts }
    }

    /// Worst-case wait in microseconds.
    pub const fn budget_us(&self) -> u64 {
        self.interval_us as u64 * self.attempts as u64
    }
}

/// What to do when the CRC coprocessor never raises CRCIRq.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcTimeout {
    /// Fail with `Timeout`.
    Fail,
    /// Read whatever is in the result registers.
    Proceed,
}

/// What to do when authentication completes but MFCrypto1On is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCheck {
    /// Fail with `MifareAuth`.
    Strict,
    /// Log a warning and treat the sector as authenticated.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Polling of ComIrqReg during a command cycle.
    pub command_poll: PollPolicy,
    /// Polling of DivIrqReg during a CRC calculation.
    pub crc_poll: PollPolicy,
    pub crc_timeout: CrcTimeout,
    pub auth_check: AuthCheck,
}

impl Config {
    /// Permissive mode for callers written against older drivers: stale CRC
    /// results and an unchecked crypto flag are both tolerated.
    pub const fn legacy() -> Self {
        Config {
            crc_timeout: CrcTimeout::Proceed,
            auth_check: AuthCheck::Lenient,
            ..Self::DEFAULT
        }
    }

    const DEFAULT: Config = Config {
        command_poll: PollPolicy::new(10_000, 100),
        crc_poll: PollPolicy::spin(255),
        crc_timeout: CrcTimeout::Fail,
        auth_check: AuthCheck::Strict,
    };

    pub const fn with_command_poll(mut self, poll: PollPolicy) -> Self {
        self.command_poll = poll;
        self
    }

    pub const fn with_crc_poll(mut self, poll: PollPolicy) -> Self {
        self.crc_poll = poll;
        self
    }

    pub const fn with_crc_timeout(mut self, crc_timeout: CrcTimeout) -> Self {
        self.crc_timeout = crc_timeout;
        self
    }

    pub const fn with_auth_check(mut self, auth_check: AuthCheck) -> Self {
        self.auth_check = auth_check;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
