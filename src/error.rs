use thiserror::Error;

/// Everything that can go wrong while talking to a CEC bus.
///
/// All variants are recoverable: a failed [`Session::open`](crate::Session::open)
/// can be retried with another adapter fragment and a rejected command can be
/// sent again.
#[derive(Error, Debug)]
pub enum CecError {
    #[error("driver rejected the device profile: {0}")]
    InitFailed(String),

    #[error("no adapter matches {0:?}")]
    NoAdapterFound(String),

    #[error("failed to open adapter {comm}: {reason}")]
    OpenFailed { comm: String, reason: String },

    #[error("malformed frame {0:?}")]
    MalformedFrame(String),

    #[error("frame carries {0} parameter bytes, at most 14 fit")]
    FrameTooLong(usize),

    #[error("session is not open")]
    NotOpen,

    #[error("logical address {0} is outside 0..=15")]
    OutOfRange(u32),

    #[error("{0:?} is neither a logical address name nor a number")]
    UnknownAddress(String),

    #[error("driver rejected {0}")]
    CommandRejected(&'static str),

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CecError>;
