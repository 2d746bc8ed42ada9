//! DVB subtitling descriptor (ETSI EN 300 468 6.2.41).

use bytes::Buf;

use super::{LanguageCode, RawDescriptor};
use crate::Result;

const RECORD_SIZE: usize = 8;

/// Subtitling type, shared with the component descriptor's `component_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubtitlingType(pub u8);

impl SubtitlingType {
    /// EBU Teletext subtitles
    pub const EBU_TELETEXT: SubtitlingType = SubtitlingType(0x01);
    /// associated EBU Teletext
    pub const ASSOCIATED_EBU_TELETEXT: SubtitlingType = SubtitlingType(0x02);
    /// VBI data
    pub const VBI: SubtitlingType = SubtitlingType(0x03);
    /// DVB subtitles (normal) with no monitor aspect ratio criticality
    pub const DVB: SubtitlingType = SubtitlingType(0x10);
    /// DVB subtitles (normal) for display on 4:3 aspect ratio monitor
    pub const DVB_4_3: SubtitlingType = SubtitlingType(0x11);
    /// DVB subtitles (normal) for display on 16:9 aspect ratio monitor
    pub const DVB_16_9: SubtitlingType = SubtitlingType(0x12);
    /// DVB subtitles (normal) for display on 2.21:1 aspect ratio monitor
    pub const DVB_221_1: SubtitlingType = SubtitlingType(0x13);
    /// DVB subtitles (normal) for display on a high definition monitor
    pub const DVB_HD: SubtitlingType = SubtitlingType(0x14);
    /// DVB subtitles (normal) with plano-stereoscopic disparity
    pub const DVB_STEREOSCOPIC: SubtitlingType = SubtitlingType(0x15);
    /// DVB subtitles (for the hard of hearing) with no monitor aspect ratio criticality
    pub const DVB_HARD_OF_HEARING: SubtitlingType = SubtitlingType(0x20);
    /// DVB subtitles (for the hard of hearing) for display on 4:3 aspect ratio monitor
    pub const DVB_HARD_OF_HEARING_4_3: SubtitlingType = SubtitlingType(0x21);
    /// DVB subtitles (for the hard of hearing) for display on 16:9 aspect ratio monitor
    pub const DVB_HARD_OF_HEARING_16_9: SubtitlingType = SubtitlingType(0x22);
    /// DVB subtitles (for the hard of hearing) for display on 2.21:1 aspect ratio monitor
    pub const DVB_HARD_OF_HEARING_221_1: SubtitlingType = SubtitlingType(0x23);
    /// DVB subtitles (for the hard of hearing) for display on a high definition monitor
    pub const DVB_HARD_OF_HEARING_HD: SubtitlingType = SubtitlingType(0x24);
    /// DVB subtitles (for the hard of hearing) with plano-stereoscopic disparity
    pub const DVB_HARD_OF_HEARING_STEREOSCOPIC: SubtitlingType = SubtitlingType(0x25);
    /// open (in-vision) sign language interpretation for the deaf
    pub const OPEN_SIGN_LANGUAGE: SubtitlingType = SubtitlingType(0x30);
    /// closed sign language interpretation for the deaf
    pub const CLOSED_SIGN_LANGUAGE: SubtitlingType = SubtitlingType(0x31);
    /// video up-sampled from standard definition source material
    pub const UP_SAMPLED: SubtitlingType = SubtitlingType(0x40);
    /// dependent SAOC-DE data stream
    pub const SAOC_DE: SubtitlingType = SubtitlingType(0x80);

    /// Whether this is one of the DVB bitmap subtitle types.
    #[inline]
    pub fn is_dvb_subtitles(&self) -> bool {
        matches!(self.0, 0x10..=0x15 | 0x20..=0x25)
    }
}

/// A single subtitling entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitlingEntry {
    pub language: LanguageCode,
    pub subtitling_type: SubtitlingType,
    pub composition_page_id: u16,
    pub ancillary_page_id: u16,
}

/// Subtitling descriptor (tag 0x59): a list of 8-byte entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitlingDescriptor(pub(crate) RawDescriptor);

impl SubtitlingDescriptor {
    pub fn raw(&self) -> &RawDescriptor {
        &self.0
    }

    /// Decode the subtitling entries. Fails if the payload length is not a
    /// multiple of 8.
    pub fn entries(&self) -> Result<Vec<SubtitlingEntry>> {
        Ok(self
            .0
            .records(RECORD_SIZE)?
            .map(|record| {
                let mut ids = &record[4..];
                SubtitlingEntry {
                    language: LanguageCode::from_record(record),
                    subtitling_type: SubtitlingType(record[3]),
                    composition_page_id: ids.get_u16(),
                    ancillary_page_id: ids.get_u16(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::TsError;
    use crate::descriptor::{Descriptor, TAG_SUBTITLING, build_descriptor};

    fn subtitling(bytes: Vec<u8>) -> SubtitlingDescriptor {
        match build_descriptor(Bytes::from(bytes)) {
            Descriptor::Subtitling(d) => d,
            other => panic!("expected subtitling descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_entries() {
        let d = subtitling(vec![
            0x59, 0x10, //
            b'd', b'e', b'u', 0x10, 0x00, 0x02, 0x00, 0x03, //
            b'e', b'n', b'g', 0x24, 0x01, 0x00, 0x01, 0x01,
        ]);
        let entries = d.entries().unwrap();
        assert_eq!(
            entries,
            vec![
                SubtitlingEntry {
                    language: crate::descriptor::LanguageCode(*b"deu"),
                    subtitling_type: SubtitlingType::DVB,
                    composition_page_id: 2,
                    ancillary_page_id: 3,
                },
                SubtitlingEntry {
                    language: crate::descriptor::LanguageCode(*b"eng"),
                    subtitling_type: SubtitlingType::DVB_HARD_OF_HEARING_HD,
                    composition_page_id: 0x0100,
                    ancillary_page_id: 0x0101,
                },
            ]
        );
        assert!(entries.iter().all(|e| e.subtitling_type.is_dvb_subtitles()));
    }

    #[test]
    fn test_length_not_a_multiple_of_record_size() {
        let mut bytes = vec![0x59, 12];
        bytes.resize(14, 0x00);
        assert_eq!(
            subtitling(bytes).entries(),
            Err(TsError::InvalidDescriptorLength {
                tag: TAG_SUBTITLING,
                length: 12,
                record_size: 8
            })
        );
    }

    #[test]
    fn test_incomplete_descriptor() {
        let d = subtitling(vec![0x59, 0x08, b'e', b'n', b'g']);
        assert!(matches!(d.entries(), Err(TsError::InsufficientData { .. })));
    }
}
