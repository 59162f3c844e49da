#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The target probe failed or the driver hit an unrecoverable error.
    Failure = 1,

    /// Invalid CLI input (bad flags, invalid durations, out-of-range values).
    InvalidInput = 2,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
