//! DVB teletext descriptor (ETSI EN 300 468 6.2.43).

use super::{LanguageCode, RawDescriptor};
use crate::Result;

const RECORD_SIZE: usize = 5;

/// Teletext page type (5 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeletextType(pub u8);

impl TeletextType {
    /// initial Teletext page
    pub const INITIAL: TeletextType = TeletextType(0x01);
    /// Teletext subtitle page
    pub const SUBTITLES: TeletextType = TeletextType(0x02);
    /// additional information page
    pub const ADDITIONAL_INFO: TeletextType = TeletextType(0x03);
    /// programme schedule page
    pub const PROGRAMME_SCHEDULE: TeletextType = TeletextType(0x04);
    /// Teletext subtitle page for hearing impaired people
    pub const SUBTITLES_HEARING_IMPAIRED: TeletextType = TeletextType(0x05);
}

/// A single teletext page entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeletextEntry {
    pub language: LanguageCode,
    pub teletext_type: TeletextType,
    /// 3-bit magazine number.
    pub magazine_number: u8,
    /// Page number as two BCD digits.
    pub page_number: u8,
}

/// Teletext descriptor (tag 0x56): a list of 5-byte entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeletextDescriptor(pub(crate) RawDescriptor);

impl TeletextDescriptor {
    pub fn raw(&self) -> &RawDescriptor {
        &self.0
    }

    /// Decode the teletext entries. Fails if the payload length is not a
    /// multiple of 5.
    pub fn entries(&self) -> Result<Vec<TeletextEntry>> {
        Ok(self
            .0
            .records(RECORD_SIZE)?
            .map(|record| TeletextEntry {
                language: LanguageCode::from_record(record),
                teletext_type: TeletextType(record[3] >> 3),
                magazine_number: record[3] & 0x07,
                page_number: record[4],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::TsError;
    use crate::descriptor::{Descriptor, TAG_TELETEXT, build_descriptor};

    fn teletext(bytes: Vec<u8>) -> TeletextDescriptor {
        match build_descriptor(Bytes::from(bytes)) {
            Descriptor::Teletext(d) => d,
            other => panic!("expected teletext descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_entries() {
        // Subtitles on page 888: magazine 8 is coded as 0.
        let d = teletext(vec![
            0x56, 0x0A, //
            b'e', b'n', b'g', 0x02 << 3, 0x88, //
            b'n', b'o', b'r', (0x01 << 3) | 0x01, 0x00,
        ]);
        let entries = d.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].language, "eng");
        assert_eq!(entries[0].teletext_type, TeletextType::SUBTITLES);
        assert_eq!(entries[0].magazine_number, 0);
        assert_eq!(entries[0].page_number, 0x88);
        assert_eq!(entries[1].language, "nor");
        assert_eq!(entries[1].teletext_type, TeletextType::INITIAL);
        assert_eq!(entries[1].magazine_number, 1);
        assert_eq!(entries[1].page_number, 0x00);
    }

    #[test]
    fn test_length_not_a_multiple_of_record_size() {
        for length in [4u8, 6, 9, 11] {
            let mut bytes = vec![0x56, length];
            bytes.resize(2 + length as usize, 0x00);
            assert_eq!(
                teletext(bytes).entries(),
                Err(TsError::InvalidDescriptorLength {
                    tag: TAG_TELETEXT,
                    length: length as usize,
                    record_size: 5
                })
            );
        }
    }

    #[test]
    fn test_valid_multiple_yields_one_entry_per_record() {
        let mut bytes = vec![0x56, 15];
        bytes.resize(17, b'a');
        assert_eq!(teletext(bytes).entries().unwrap().len(), 3);
    }
}
