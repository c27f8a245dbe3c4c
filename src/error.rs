// error.rs — Crate-wide error type.
//
// The original errno surface maps onto variants as follows:
//   ENODEV    -> NoDevice
//   ETIMEDOUT -> Usb(rusb::Error::Timeout)
//   EIO       -> Protocol / PowerUp / ShortIrq / ShortRead / NoData
//   EFBIG     -> ImageTooTall
//   EINVAL    -> SizeMismatch / InvalidInput
//
// Protocol-state errors are retried locally with bounded budgets (hwstat
// recovery loop, power loop, interrupt discard loop) and only surface
// here once the budget is exhausted.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No device with a (VID, PID) known to the registry was found.
    #[error("no supported fingerprint reader found")]
    NoDevice,

    /// Transport-level failure, including timeouts.
    #[error("usb transfer failed: {0}")]
    Usb(#[from] rusb::Error),

    /// The vendor interface did not have the expected endpoint layout.
    #[error("unexpected endpoint layout on vendor interface")]
    BadEndpoints,

    /// The device never cleared the SCANPWR_OFF bit during power-up.
    #[error("device did not power up")]
    PowerUp,

    /// An interrupt transfer returned fewer than the 64 expected bytes.
    #[error("received {0} byte interrupt packet")]
    ShortIrq(usize),

    /// A bulk block came back shorter than the protocol allows.
    #[error("short bulk read: got {got} of {want} bytes")]
    ShortRead { got: usize, want: usize },

    /// The device violated the wire protocol in some other way.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Operation requires pixel data but the frame holds none.
    #[error("frame contains no pixel data")]
    NoData,

    /// PGM output refuses images taller than 999 rows.
    #[error("image too tall for PGM output ({0} rows)")]
    ImageTooTall(usize),

    /// Two frames were combined despite holding different amounts of data.
    #[error("frame size mismatch: {a} vs {b} bytes")]
    SizeMismatch { a: usize, b: usize },

    /// A caller-supplied argument was out of range.
    #[error("invalid argument: {0}")]
    InvalidInput(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that may resolve on retry (used by the interrupt
    /// wait loop, which treats timeouts as non-fatal).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Usb(rusb::Error::Timeout))
    }
}
