//! Error types for slotlog.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlotError>;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("out of memory allocating slot buffers")]
    Oom,

    #[error("record of {size} bytes exceeds the maximum joinable size of {max} bytes")]
    RecordTooLarge { size: u32, max: u32 },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl SlotError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn record_too_large(size: u32, max: u32) -> Self {
        Self::RecordTooLarge { size, max }
    }
}
