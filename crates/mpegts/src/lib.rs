//! MPEG-2 Transport Stream (ISO/IEC 13818-1) packet and PSI decoder.
//!
//! This crate decodes 188-byte transport packets with their adaptation
//! fields (PCR/OPCR, splice countdown, private data, extension), PSI
//! sections (PAT, CAT, PMT) reassembled from one or more packet payloads,
//! and the descriptors found in their descriptor loops.
//!
//! Locating sync bytes in a raw stream, continuity checking and PES
//! reassembly are left to the caller.

pub mod adaptation_field;
pub mod crc32;
pub mod descriptor;
pub mod error;
pub mod packet;
pub mod section;

pub use adaptation_field::{
    AdaptationExtension, AdaptationField, ExtensionOffsets, FieldOffsets, LegalTimeWindow, Pcr,
    SeamlessSplice,
};
pub use crc32::{mpeg2_crc32, verify_section_crc};
pub use descriptor::{
    AudioType, CaDescriptor, Descriptor, DescriptorLoop, LanguageCode, LanguageDescriptor,
    LanguageEntry, RawDescriptor, SubtitlingDescriptor, SubtitlingEntry, SubtitlingType,
    TeletextDescriptor, TeletextEntry, TeletextType, build_descriptor,
};
pub use error::TsError;
pub use packet::{
    AdaptationFieldControl, PACKET_SIZE, PID_CAT, PID_NULL, PID_PAT, SYNC_BYTE,
    ScramblingControl, TsPacket,
};
pub use section::{
    ElementaryStream, PatProgram, PsiSection, StreamType, TABLE_ID_CAT, TABLE_ID_PAT,
    TABLE_ID_PMT,
};

/// Result type for TS parsing operations
pub type Result<T> = std::result::Result<T, TsError>;
