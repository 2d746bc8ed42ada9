//! Descriptors carried in PSI descriptor loops.
//!
//! Every descriptor is `[tag: u8][length: u8][data: length bytes]`.
//! [`build_descriptor`] picks the [`Descriptor`] variant from the tag; the
//! record-oriented variants check their payload layout only when their
//! records are read, so a malformed descriptor never stops a loop from
//! advancing past it.

pub mod ca;
pub mod language;
pub mod subtitling;
pub mod teletext;

use std::fmt;

use bytes::{Buf, Bytes};
use tracing::{debug, trace};

use crate::{Result, TsError};

pub use ca::CaDescriptor;
pub use language::{AudioType, LanguageDescriptor, LanguageEntry};
pub use subtitling::{SubtitlingDescriptor, SubtitlingEntry, SubtitlingType};
pub use teletext::{TeletextDescriptor, TeletextEntry, TeletextType};

/// Video stream descriptor (tag 0x02)
pub const TAG_VIDEO_STREAM: u8 = 0x02;
/// Audio stream descriptor (tag 0x03)
pub const TAG_AUDIO_STREAM: u8 = 0x03;
/// Hierarchy descriptor (tag 0x04)
pub const TAG_HIERARCHY: u8 = 0x04;
/// Registration descriptor (tag 0x05)
pub const TAG_REGISTRATION: u8 = 0x05;
/// Data stream alignment descriptor (tag 0x06)
pub const TAG_DATA_STREAM_ALIGNMENT: u8 = 0x06;
/// Conditional access descriptor (tag 0x09)
pub const TAG_CA: u8 = 0x09;
/// ISO 639 language descriptor (tag 0x0A)
pub const TAG_ISO_639_LANGUAGE: u8 = 0x0A;
/// System clock descriptor (tag 0x0B)
pub const TAG_SYSTEM_CLOCK: u8 = 0x0B;
/// Maximum bitrate descriptor (tag 0x0E)
pub const TAG_MAXIMUM_BITRATE: u8 = 0x0E;
/// MPEG-4 video descriptor (tag 0x1B)
pub const TAG_MPEG4_VIDEO: u8 = 0x1B;
/// MPEG-4 audio descriptor (tag 0x1C)
pub const TAG_MPEG4_AUDIO: u8 = 0x1C;
/// AVC video descriptor (tag 0x28)
pub const TAG_AVC_VIDEO: u8 = 0x28;
/// MPEG-2 AAC audio descriptor (tag 0x2B)
pub const TAG_MPEG2_AAC_AUDIO: u8 = 0x2B;
/// MPEG-4 audio extension descriptor (tag 0x2E)
pub const TAG_MPEG4_AUDIO_EXTENSION: u8 = 0x2E;
/// JPEG 2000 video descriptor (tag 0x32)
pub const TAG_J2K_VIDEO: u8 = 0x32;
/// DVB teletext descriptor (tag 0x56)
pub const TAG_TELETEXT: u8 = 0x56;
/// DVB subtitling descriptor (tag 0x59)
pub const TAG_SUBTITLING: u8 = 0x59;
/// AC-3 audio descriptor (tag 0x6A)
pub const TAG_AC3: u8 = 0x6A;
/// Enhanced AC-3 audio descriptor (tag 0x7A)
pub const TAG_EAC3: u8 = 0x7A;
/// DTS audio descriptor (tag 0x7B)
pub const TAG_DTS: u8 = 0x7B;
/// AAC audio descriptor (tag 0x7C)
pub const TAG_AAC: u8 = 0x7C;
/// ATSC AC-3 audio descriptor (tag 0x81)
pub const TAG_ATSC_AC3: u8 = 0x81;
/// ATSC Enhanced AC-3 audio descriptor (tag 0xCC)
pub const TAG_ATSC_EAC3: u8 = 0xCC;

const HEADER_SIZE: usize = 2;

/// Descriptor bytes: tag, length and as much of the payload as was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    data: Bytes,
}

impl RawDescriptor {
    pub fn tag(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }

    /// Payload length declared in the descriptor header.
    pub fn data_length(&self) -> u8 {
        self.data.get(1).copied().unwrap_or(0)
    }

    /// Number of bytes this descriptor occupies in its loop. Equal to
    /// `2 + data_length()` once the descriptor is complete.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the whole declared payload is present.
    pub fn is_complete(&self) -> bool {
        self.data.len() >= HEADER_SIZE
            && self.data.len() == HEADER_SIZE + self.data_length() as usize
    }

    /// Payload bytes following the header.
    pub fn payload(&self) -> Bytes {
        self.data.slice(HEADER_SIZE.min(self.data.len())..)
    }

    /// The descriptor bytes, header included.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Payload split into fixed-size records.
    fn records(&self, record_size: usize) -> Result<std::slice::ChunksExact<'_, u8>> {
        let length = self.data_length() as usize;
        if length % record_size != 0 {
            return Err(TsError::InvalidDescriptorLength {
                tag: self.tag(),
                length,
                record_size,
            });
        }
        self.complete_payload().map(|payload| payload.chunks_exact(record_size))
    }

    fn complete_payload(&self) -> Result<&[u8]> {
        if !self.is_complete() {
            return Err(TsError::insufficient(
                HEADER_SIZE + self.data_length() as usize,
                self.data.len(),
            ));
        }
        Ok(&self.data[HEADER_SIZE..])
    }
}

/// A descriptor, typed by its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Any tag without a dedicated decoder.
    Generic(RawDescriptor),
    ConditionalAccess(CaDescriptor),
    Iso639Language(LanguageDescriptor),
    Subtitling(SubtitlingDescriptor),
    Teletext(TeletextDescriptor),
}

impl Descriptor {
    pub fn raw(&self) -> &RawDescriptor {
        match self {
            Descriptor::Generic(raw) => raw,
            Descriptor::ConditionalAccess(d) => d.raw(),
            Descriptor::Iso639Language(d) => d.raw(),
            Descriptor::Subtitling(d) => d.raw(),
            Descriptor::Teletext(d) => d.raw(),
        }
    }

    pub fn tag(&self) -> u8 {
        self.raw().tag()
    }

    pub fn data_length(&self) -> u8 {
        self.raw().data_length()
    }

    /// Bytes occupied in the loop, header included.
    pub fn len(&self) -> usize {
        self.raw().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.raw().is_complete()
    }

    pub fn payload(&self) -> Bytes {
        self.raw().payload()
    }

    /// Whether the tag describes an audio elementary stream.
    pub fn is_audio(&self) -> bool {
        matches!(
            self.tag(),
            TAG_AUDIO_STREAM
                | TAG_MPEG4_AUDIO
                | TAG_MPEG2_AAC_AUDIO
                | TAG_MPEG4_AUDIO_EXTENSION
                | TAG_AC3
                | TAG_EAC3
                | TAG_DTS
                | TAG_AAC
                | TAG_ATSC_AC3
                | TAG_ATSC_EAC3
        )
    }

    /// Whether the tag describes a video elementary stream.
    pub fn is_video(&self) -> bool {
        matches!(
            self.tag(),
            TAG_VIDEO_STREAM | TAG_MPEG4_VIDEO | TAG_AVC_VIDEO | TAG_J2K_VIDEO
        )
    }
}

/// Build a descriptor from bytes starting at its tag.
///
/// The descriptor keeps `2 + length` bytes (fewer if the buffer ends first),
/// so its [`len`](Descriptor::len) advances a loop cursor correctly whether
/// or not the tag is recognized. Construction never fails.
pub fn build_descriptor(data: Bytes) -> Descriptor {
    let end = match data.get(1) {
        Some(&length) => (HEADER_SIZE + length as usize).min(data.len()),
        None => data.len(),
    };
    let raw = RawDescriptor {
        data: data.slice(..end),
    };

    match raw.tag() {
        TAG_CA => Descriptor::ConditionalAccess(CaDescriptor(raw)),
        TAG_ISO_639_LANGUAGE => Descriptor::Iso639Language(LanguageDescriptor(raw)),
        TAG_SUBTITLING => Descriptor::Subtitling(SubtitlingDescriptor(raw)),
        TAG_TELETEXT => Descriptor::Teletext(TeletextDescriptor(raw)),
        _ => Descriptor::Generic(raw),
    }
}

/// Iterator over the descriptors of a descriptor loop.
///
/// Iteration ends at the end of the region or at the first descriptor that
/// is cut off. By default that descriptor is dropped silently, since in a
/// section still being reassembled the rest has not arrived yet. With
/// [`with_truncated_tail`](DescriptorLoop::with_truncated_tail) it is yielded
/// as the last item instead, and its accessors report the missing bytes.
#[derive(Debug, Clone)]
pub struct DescriptorLoop {
    data: Bytes,
    truncated_tail: bool,
}

impl DescriptorLoop {
    /// Create a loop over a descriptor region.
    pub fn new(data: Bytes) -> Self {
        DescriptorLoop {
            data,
            truncated_tail: false,
        }
    }

    /// Yield a cut-off descriptor at the end of the region instead of
    /// dropping it. Used once no more bytes can arrive.
    pub fn with_truncated_tail(mut self, enable: bool) -> Self {
        self.truncated_tail = enable;
        self
    }
}

impl Iterator for DescriptorLoop {
    type Item = Descriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let descriptor = build_descriptor(self.data.clone());
        if !descriptor.is_complete() {
            self.data.advance(self.data.remaining());
            if self.truncated_tail {
                debug!(
                    tag = descriptor.tag(),
                    available = descriptor.len(),
                    declared = descriptor.data_length(),
                    "Descriptor overruns its loop"
                );
                return Some(descriptor);
            }
            trace!(
                tag = descriptor.tag(),
                available = descriptor.len(),
                declared = descriptor.data_length(),
                "Descriptor loop stops at an incomplete descriptor"
            );
            return None;
        }

        self.data.advance(descriptor.len());
        Some(descriptor)
    }
}

/// ISO 639-2 three-letter language code as carried in descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageCode(pub [u8; 3]);

impl LanguageCode {
    pub(crate) fn from_record(record: &[u8]) -> Self {
        LanguageCode([record[0], record[1], record[2]])
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguageCode({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl PartialEq<str> for LanguageCode {
    fn eq(&self, other: &str) -> bool {
        self.0[..] == *other.as_bytes()
    }
}

impl PartialEq<&str> for LanguageCode {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_empty() {
        assert_eq!(DescriptorLoop::new(Bytes::new()).count(), 0);
    }

    #[test]
    fn test_loop_single() {
        let data = Bytes::from_static(&[0x05, 0x04, b'C', b'U', b'E', b'I']);
        let descriptors: Vec<_> = DescriptorLoop::new(data).collect();
        assert_eq!(descriptors.len(), 1);
        assert!(matches!(descriptors[0], Descriptor::Generic(_)));
        assert_eq!(descriptors[0].tag(), TAG_REGISTRATION);
        assert_eq!(&descriptors[0].payload()[..], b"CUEI");
        assert_eq!(descriptors[0].len(), 6);
    }

    #[test]
    fn test_loop_mixed_known_and_unknown() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0xF0, 0x03, 0x01, 0x02, 0x03]);
        data.extend_from_slice(&[0x0A, 0x04, b'e', b'n', b'g', 0x01]);
        data.extend_from_slice(&[0xF1, 0x00]);
        data.extend_from_slice(&[0x09, 0x04, 0x0B, 0x00, 0xE1, 0x23]);
        let descriptors: Vec<_> = DescriptorLoop::new(Bytes::from(data)).collect();

        let tags: Vec<_> = descriptors.iter().map(Descriptor::tag).collect();
        assert_eq!(tags, vec![0xF0, TAG_ISO_639_LANGUAGE, 0xF1, TAG_CA]);
        let lengths: Vec<_> = descriptors.iter().map(Descriptor::len).collect();
        assert_eq!(lengths, vec![5, 6, 2, 6]);
        assert!(matches!(descriptors[1], Descriptor::Iso639Language(_)));
        assert!(matches!(descriptors[3], Descriptor::ConditionalAccess(_)));
    }

    #[test]
    fn test_loop_stops_at_truncated_descriptor() {
        let data = Bytes::from_static(&[0x0A, 0x04, b'e', b'n', b'g', 0x00, 0x05, 0xFF, 0x01]);
        let descriptors: Vec<_> = DescriptorLoop::new(data).collect();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].tag(), TAG_ISO_639_LANGUAGE);
    }

    #[test]
    fn test_loop_stops_at_lone_tag_byte() {
        let data = Bytes::from_static(&[0x52, 0x01, 0x00, 0x52]);
        assert_eq!(DescriptorLoop::new(data).count(), 1);
    }

    #[test]
    fn test_loop_yields_truncated_tail_when_asked() {
        let data = Bytes::from_static(&[0xF0, 0x00, 0x09, 0x04, 0x0B, 0x00]);
        let descriptors: Vec<_> = DescriptorLoop::new(data.clone())
            .with_truncated_tail(true)
            .collect();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].is_complete());
        assert!(!descriptors[1].is_complete());
        assert_eq!(descriptors[1].len(), 4);
        let Descriptor::ConditionalAccess(ca) = &descriptors[1] else {
            panic!("expected a CA descriptor");
        };
        assert_eq!(
            ca.ca_pid(),
            Err(TsError::InsufficientData {
                expected: 6,
                actual: 4
            })
        );

        assert_eq!(DescriptorLoop::new(data).count(), 1);
    }

    #[test]
    fn test_build_unknown_tag() {
        let descriptor = build_descriptor(Bytes::from_static(&[0xE7, 0x02, 0xAA, 0xBB, 0xCC]));
        assert!(matches!(descriptor, Descriptor::Generic(_)));
        assert_eq!(descriptor.len(), 4);
        assert_eq!(descriptor.data_length(), 2);
        assert!(descriptor.is_complete());
        assert_eq!(&descriptor.payload()[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_build_clamps_to_available_bytes() {
        let descriptor = build_descriptor(Bytes::from_static(&[0x59, 0x08, b'e', b'n']));
        assert!(matches!(descriptor, Descriptor::Subtitling(_)));
        assert_eq!(descriptor.len(), 4);
        assert!(!descriptor.is_complete());

        let empty = build_descriptor(Bytes::new());
        assert!(empty.is_empty());
        assert!(!empty.is_complete());
    }

    #[test]
    fn test_dispatch_by_tag() {
        let build = |tag| build_descriptor(Bytes::from(vec![tag, 0x00]));
        assert!(matches!(build(TAG_CA), Descriptor::ConditionalAccess(_)));
        assert!(matches!(
            build(TAG_ISO_639_LANGUAGE),
            Descriptor::Iso639Language(_)
        ));
        assert!(matches!(build(TAG_SUBTITLING), Descriptor::Subtitling(_)));
        assert!(matches!(build(TAG_TELETEXT), Descriptor::Teletext(_)));
        assert!(matches!(build(TAG_AC3), Descriptor::Generic(_)));
    }

    #[test]
    fn test_audio_and_video_classification() {
        let build = |tag| build_descriptor(Bytes::from(vec![tag, 0x00]));
        assert!(build(TAG_AC3).is_audio());
        assert!(build(TAG_MPEG2_AAC_AUDIO).is_audio());
        assert!(!build(TAG_AC3).is_video());
        assert!(build(TAG_AVC_VIDEO).is_video());
        assert!(!build(TAG_ISO_639_LANGUAGE).is_audio());
        assert!(!build(TAG_ISO_639_LANGUAGE).is_video());
    }

    #[test]
    fn test_language_code_comparisons() {
        let code = LanguageCode(*b"fra");
        assert_eq!(code, "fra");
        assert_ne!(code, "eng");
        assert_eq!(code.to_string(), "fra");
        assert_eq!(format!("{code:?}"), "LanguageCode(\"fra\")");
    }
}
