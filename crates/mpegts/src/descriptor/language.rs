//! ISO 639 language descriptor (ISO/IEC 13818-1 2.6.18).

use super::{LanguageCode, RawDescriptor};
use crate::Result;

const RECORD_SIZE: usize = 4;

/// Audio type of an ISO 639 language entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioType(pub u8);

impl AudioType {
    pub const UNDEFINED: AudioType = AudioType(0x00);
    pub const CLEAN_EFFECTS: AudioType = AudioType(0x01);
    pub const HEARING_IMPAIRED: AudioType = AudioType(0x02);
    pub const VISUAL_IMPAIRED_COMMENTARY: AudioType = AudioType(0x03);
    // 0x04 - 0x7F user private
    // 0x80 - 0xFF reserved
}

/// A single ISO 639 language entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageEntry {
    pub code: LanguageCode,
    pub audio_type: AudioType,
}

/// ISO 639 language descriptor (tag 0x0A): a list of 4-byte entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDescriptor(pub(crate) RawDescriptor);

impl LanguageDescriptor {
    pub fn raw(&self) -> &RawDescriptor {
        &self.0
    }

    /// Decode the language entries. Fails if the payload length is not a
    /// multiple of 4.
    pub fn languages(&self) -> Result<Vec<LanguageEntry>> {
        Ok(self
            .0
            .records(RECORD_SIZE)?
            .map(|record| LanguageEntry {
                code: LanguageCode::from_record(record),
                audio_type: AudioType(record[3]),
            })
            .collect())
    }
}
