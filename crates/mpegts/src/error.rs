//! Error types for transport packet and PSI decoding.

use thiserror::Error;

/// Errors that can occur while decoding transport packets, adaptation fields,
/// PSI sections and descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsError {
    /// The buffer handed to the packet decoder is not 188 bytes long.
    #[error("invalid packet size: expected 188 bytes, got {0}")]
    InvalidPacketSize(usize),

    /// The first byte of the packet is not the 0x47 sync byte.
    #[error("invalid sync byte: expected 0x47, got {0:#04x}")]
    InvalidSyncByte(u8),

    /// The declared adaptation field length runs past the end of the packet.
    #[error("adaptation field length {0} exceeds the packet bounds")]
    InvalidAdaptationFieldLength(u8),

    /// A record or field needs more bytes than are available.
    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData {
        /// Number of bytes needed.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// A record-oriented descriptor payload is not a whole number of records.
    #[error(
        "invalid length for descriptor {tag:#04x}: {length} is not a multiple of {record_size}"
    )]
    InvalidDescriptorLength {
        /// Descriptor tag.
        tag: u8,
        /// Declared payload length.
        length: usize,
        /// Fixed record size of the descriptor variant.
        record_size: usize,
    },

    /// The stored section CRC does not match the computed one.
    #[error("CRC-32 mismatch: stored {expected:#010x}, calculated {calculated:#010x}")]
    Crc32Mismatch { expected: u32, calculated: u32 },
}

impl TsError {
    pub(crate) fn insufficient(expected: usize, actual: usize) -> Self {
        TsError::InsufficientData { expected, actual }
    }
}
