use std::cell::OnceCell;

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::crc32::verify_section_crc;
use crate::descriptor::{Descriptor, DescriptorLoop};
use crate::packet::{PID_CAT, PID_PAT, TsPacket};
use crate::{Result, TsError};

/// Program association section
pub const TABLE_ID_PAT: u8 = 0x00;
/// Conditional access section
pub const TABLE_ID_CAT: u8 = 0x01;
/// TS program map section
pub const TABLE_ID_PMT: u8 = 0x02;

/// Bytes between the table id and the section body.
const HEADER_SIZE: usize = 3;
/// Syntax header: table id extension, version, section numbers.
const SYNTAX_HEADER_SIZE: usize = 5;
/// PMT body bytes before the program info loop.
const PMT_FIXED_SIZE: usize = 9;
const STREAM_HEADER_SIZE: usize = 5;
const CRC_SIZE: usize = 4;

/// Elementary stream type as carried in the PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamType(pub u8);

impl StreamType {
    pub const MPEG1_VIDEO: StreamType = StreamType(0x01);
    pub const MPEG2_VIDEO: StreamType = StreamType(0x02);
    pub const MPEG1_AUDIO: StreamType = StreamType(0x03);
    pub const MPEG2_AUDIO: StreamType = StreamType(0x04);
    pub const PRIVATE_SECTIONS: StreamType = StreamType(0x05);
    pub const PES_PRIVATE_DATA: StreamType = StreamType(0x06);
    pub const ADTS_AAC: StreamType = StreamType(0x0F);
    pub const MPEG4_VIDEO: StreamType = StreamType(0x10);
    pub const LATM_AAC: StreamType = StreamType(0x11);
    pub const METADATA: StreamType = StreamType(0x15);
    pub const H264: StreamType = StreamType(0x1B);
    pub const H265: StreamType = StreamType(0x24);
    pub const AC3: StreamType = StreamType(0x81);
    pub const SCTE35: StreamType = StreamType(0x86);
    pub const EAC3: StreamType = StreamType(0x87);

    #[inline]
    pub fn is_video(&self) -> bool {
        matches!(self.0, 0x01 | 0x02 | 0x10 | 0x1B | 0x24)
    }

    #[inline]
    pub fn is_audio(&self) -> bool {
        matches!(self.0, 0x03 | 0x04 | 0x0F | 0x11 | 0x81 | 0x87)
    }
}

/// PAT program entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatProgram {
    pub program_number: u16,
    /// Network PID for program 0, program map PID otherwise.
    pub pid: u16,
}

impl PatProgram {
    pub fn is_network_pid(&self) -> bool {
        self.program_number == 0
    }
}

/// PMT elementary stream entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStream {
    pub stream_type: StreamType,
    /// 13-bit elementary PID
    pub pid: u16,
    /// 12-bit length of the ES info loop
    pub es_info_length: u16,
    pub es_infos: Vec<Descriptor>,
}

#[derive(Debug, Clone, Default)]
struct SectionCache {
    section: OnceCell<Bytes>,
    programs: OnceCell<Vec<PatProgram>>,
    program_descriptors: OnceCell<Vec<Descriptor>>,
    elementary_streams: OnceCell<Vec<ElementaryStream>>,
    ca_descriptors: OnceCell<Vec<Descriptor>>,
}

/// A PSI section being reassembled from packet payloads.
///
/// The section is created from the payload of the packet that starts it
/// (pointer field first) and grows with [`append`](PsiSection::append) as
/// continuation payloads arrive. Derived views are computed on first access
/// and dropped on every append.
///
/// Table fields are read at fixed body offsets; the caller picks the reading
/// that matches [`table_id`](PsiSection::table_id). Loops over a section that
/// is still incomplete return what has arrived so far.
#[derive(Debug, Clone)]
pub struct PsiSection {
    data: Bytes,
    validate_crc: bool,
    cache: SectionCache,
}

impl PsiSection {
    /// Create a section from the payload that starts it.
    pub fn new(data: Bytes) -> Self {
        PsiSection {
            data,
            validate_crc: false,
            cache: SectionCache::default(),
        }
    }

    /// Start a section from a packet that has the payload unit start
    /// indicator set.
    pub fn from_packet(packet: &TsPacket) -> Option<Self> {
        if !packet.payload_unit_start_indicator {
            return None;
        }
        packet
            .payload()
            .filter(|payload| !payload.is_empty())
            .map(Self::new)
    }

    /// Enable or disable CRC-32/MPEG-2 checking in [`validate`](PsiSection::validate).
    pub fn with_crc_validation(mut self, enable: bool) -> Self {
        self.validate_crc = enable;
        self
    }

    pub fn is_pat_pid(pid: u16) -> bool {
        pid == PID_PAT
    }

    pub fn is_cat_pid(pid: u16) -> bool {
        pid == PID_CAT
    }

    /// Grow the section with the payload of a continuation packet.
    ///
    /// Every view computed so far is discarded.
    pub fn append(&mut self, chunk: &[u8]) -> &mut Self {
        let mut data = BytesMut::with_capacity(self.data.len() + chunk.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(chunk);
        self.data = data.freeze();
        self.cache = SectionCache::default();
        trace!(
            appended = chunk.len(),
            buffered = self.data.len(),
            complete = self.is_complete(),
            "Appended to PSI section"
        );
        self
    }

    /// The buffered bytes, pointer field included.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn pointer_field(&self) -> Result<u8> {
        self.data
            .first()
            .copied()
            .ok_or(TsError::insufficient(1, 0))
    }

    fn table_start(&self) -> Result<usize> {
        Ok(1 + self.pointer_field()? as usize)
    }

    fn header_byte(&self, index: usize) -> Result<u8> {
        let position = self.table_start()? + index;
        self.data
            .get(position)
            .copied()
            .ok_or(TsError::insufficient(position + 1, self.data.len()))
    }

    pub fn table_id(&self) -> Result<u8> {
        self.header_byte(0)
    }

    pub fn section_syntax_indicator(&self) -> Result<bool> {
        Ok(self.header_byte(1)? & 0x80 != 0)
    }

    pub fn private_bit(&self) -> Result<bool> {
        Ok(self.header_byte(1)? & 0x40 != 0)
    }

    pub fn reserved_bits(&self) -> Result<u8> {
        Ok((self.header_byte(1)? & 0x30) >> 4)
    }

    /// 12-bit number of body bytes following the length field.
    pub fn section_length(&self) -> Result<u16> {
        let high = self.header_byte(1)?;
        let low = self.header_byte(2)?;
        Ok(((high as u16 & 0x0F) << 8) | low as u16)
    }

    /// Buffer range `(start, end)` of the section body as declared.
    fn body_range(&self) -> Result<(usize, usize)> {
        let start = self.table_start()? + HEADER_SIZE;
        Ok((start, start + self.section_length()? as usize))
    }

    /// Whether the whole declared section has been buffered.
    pub fn is_complete(&self) -> bool {
        self.body_range()
            .is_ok_and(|(_, end)| end <= self.data.len())
    }

    /// Number of section bytes still to be appended, if the header is known.
    pub fn remaining(&self) -> Option<usize> {
        self.body_range()
            .ok()
            .map(|(_, end)| end.saturating_sub(self.data.len()))
    }

    /// The section body: the `section_length` bytes after the length field,
    /// or as many of them as have arrived. Empty while the header is missing.
    pub fn section(&self) -> &Bytes {
        self.cache.section.get_or_init(|| match self.body_range() {
            Ok((start, end)) if start <= self.data.len() => {
                self.data.slice(start..end.min(self.data.len()))
            }
            _ => Bytes::new(),
        })
    }

    fn body_u8(&self, offset: usize) -> Result<u8> {
        let section = self.section();
        section
            .get(offset)
            .copied()
            .ok_or(TsError::insufficient(offset + 1, section.len()))
    }

    fn body_u16(&self, offset: usize) -> Result<u16> {
        let section = self.section();
        match section.get(offset..offset + 2) {
            Some(mut field) => Ok(field.get_u16()),
            None => Err(TsError::insufficient(offset + 2, section.len())),
        }
    }

    /// Transport stream id (PAT), program number (PMT) or reserved (CAT).
    pub fn table_id_extension(&self) -> Result<u16> {
        self.body_u16(0)
    }

    pub fn version_number(&self) -> Result<u8> {
        Ok((self.body_u8(2)? & 0x3E) >> 1)
    }

    pub fn current_next_indicator(&self) -> Result<bool> {
        Ok(self.body_u8(2)? & 0x01 != 0)
    }

    pub fn section_number(&self) -> Result<u8> {
        self.body_u8(3)
    }

    pub fn last_section_number(&self) -> Result<u8> {
        self.body_u8(4)
    }

    /// The stored CRC-32 of a complete section.
    pub fn crc32(&self) -> Result<u32> {
        let (start, end) = self.body_range()?;
        if end > self.data.len() {
            return Err(TsError::insufficient(end, self.data.len()));
        }
        if end - start < CRC_SIZE {
            return Err(TsError::insufficient(CRC_SIZE, end - start));
        }
        Ok((&self.data[end - CRC_SIZE..end]).get_u32())
    }

    /// Check that the section is complete and, with CRC validation enabled,
    /// that its CRC matches.
    pub fn validate(&self) -> Result<()> {
        let (_, end) = self.body_range()?;
        if end > self.data.len() {
            return Err(TsError::insufficient(end, self.data.len()));
        }
        if self.validate_crc {
            verify_section_crc(&self.data[self.table_start()?..end])?;
        }
        Ok(())
    }

    /// Body bytes from `offset` up to the CRC, or up to the end of the
    /// buffered bytes while the section is incomplete.
    fn body_tail(&self, offset: usize) -> Bytes {
        let section = self.section();
        let end = if self.is_complete() {
            section.len().saturating_sub(CRC_SIZE)
        } else {
            section.len()
        };
        section.slice(offset.min(end)..end)
    }

    // PAT

    /// Program number of the first PAT entry.
    pub fn program_number(&self) -> Result<u16> {
        self.body_u16(5)
    }

    /// Program map PID of the first PAT entry.
    pub fn program_map_pid(&self) -> Result<u16> {
        Ok(self.body_u16(7)? & 0x1FFF)
    }

    /// Every PAT entry received so far.
    pub fn programs(&self) -> &[PatProgram] {
        self.cache.programs.get_or_init(|| {
            let mut entries = self.body_tail(SYNTAX_HEADER_SIZE);
            let mut programs = Vec::with_capacity(entries.len() / 4);
            while entries.remaining() >= 4 {
                programs.push(PatProgram {
                    program_number: entries.get_u16(),
                    pid: entries.get_u16() & 0x1FFF,
                });
            }
            programs
        })
    }

    // CAT

    /// CA descriptors of a CAT.
    pub fn ca_descriptors(&self) -> &[Descriptor] {
        self.cache.ca_descriptors.get_or_init(|| {
            DescriptorLoop::new(self.body_tail(SYNTAX_HEADER_SIZE))
                .with_truncated_tail(self.is_complete())
                .collect()
        })
    }

    // PMT

    pub fn pcr_pid(&self) -> Result<u16> {
        Ok(self.body_u16(5)? & 0x1FFF)
    }

    pub fn program_info_length(&self) -> Result<u16> {
        Ok(self.body_u16(7)? & 0x03FF)
    }

    /// Descriptors of the program info loop.
    ///
    /// While the section is incomplete, stops without error at the first
    /// descriptor that has not fully arrived; call again after appending.
    /// In a complete section a descriptor that overruns the loop is kept as
    /// the last item and reports the missing bytes from its accessors.
    pub fn program_descriptors(&self) -> &[Descriptor] {
        self.cache.program_descriptors.get_or_init(|| {
            let Ok(program_info_length) = self.program_info_length() else {
                return Vec::new();
            };
            let section = self.section();
            let end = (PMT_FIXED_SIZE + program_info_length as usize).min(section.len());
            DescriptorLoop::new(section.slice(PMT_FIXED_SIZE.min(end)..end))
                .with_truncated_tail(self.is_complete())
                .collect()
        })
    }

    /// The elementary stream loop of a PMT, CRC excluded.
    pub fn stream_info_data(&self) -> Bytes {
        match self.program_info_length() {
            Ok(length) => self.body_tail(PMT_FIXED_SIZE + length as usize),
            Err(_) => Bytes::new(),
        }
    }

    /// Elementary streams of a PMT, each with its ES info descriptors.
    ///
    /// A stream entry whose 5-byte header has not fully arrived ends the
    /// loop; a stream whose ES info is cut off keeps the descriptors that
    /// are complete.
    pub fn elementary_streams(&self) -> &[ElementaryStream] {
        self.cache.elementary_streams.get_or_init(|| {
            let data = self.stream_info_data();
            let complete = self.is_complete();
            let mut streams = Vec::new();
            let mut offset = 0;

            while offset < data.len() {
                if offset + STREAM_HEADER_SIZE > data.len() {
                    trace!(
                        offset,
                        available = data.len(),
                        "Stream loop stops at an incomplete entry"
                    );
                    break;
                }
                let mut header = &data[offset..offset + STREAM_HEADER_SIZE];
                let stream_type = StreamType(header.get_u8());
                let pid = header.get_u16() & 0x1FFF;
                let es_info_length = header.get_u16() & 0x0FFF;

                let es_start = offset + STREAM_HEADER_SIZE;
                let es_end = (es_start + es_info_length as usize).min(data.len());
                streams.push(ElementaryStream {
                    stream_type,
                    pid,
                    es_info_length,
                    es_infos: DescriptorLoop::new(data.slice(es_start..es_end))
                        .with_truncated_tail(complete)
                        .collect(),
                });

                offset = es_start + es_info_length as usize;
            }

            streams
        })
    }
}
