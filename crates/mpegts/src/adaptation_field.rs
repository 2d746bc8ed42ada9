use bytes::{Buf, Bytes};

use crate::{Result, TsError};

/// Program Clock Reference: 33-bit base at 90 kHz plus a 9-bit extension at 27 MHz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcr {
    /// 33-bit base value at 90 kHz
    pub base: u64,
    /// 9-bit extension value at 27 MHz
    pub extension: u16,
}

impl Pcr {
    /// Encoded size of a PCR or OPCR field.
    pub const SIZE: usize = 6;

    /// Parse PCR from exactly 6 bytes.
    ///
    /// Layout: `[base32..1 (32 bits)][base0 | reserved(6) | ext8][ext7..0]`
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let mut reader = data;
        let base32 = reader.get_u32();
        let byte4 = reader.get_u8();
        let byte5 = reader.get_u8();

        let base = u64::from(base32) * 2 + u64::from(byte4 >> 7);
        let extension = u16::from(byte4 & 0x01) * 256 + u16::from(byte5);
        Some(Pcr { base, extension })
    }

    /// Full 42-bit PCR value at 27 MHz resolution.
    pub fn as_27mhz(&self) -> u64 {
        self.base * 300 + u64::from(self.extension)
    }

    /// PCR as seconds (floating point).
    pub fn as_seconds(&self) -> f64 {
        self.as_27mhz() as f64 / 27_000_000.0
    }
}

/// Decode a 33-bit timestamp in PES packing: `[x(4) | 32..30 | 1][29..22][21..15 | 1][14..7][6..0 | 1]`.
fn parse_timestamp(data: &[u8]) -> u64 {
    (((data[0] as u64 >> 1) & 0x07) << 30)
        | ((data[1] as u64) << 22)
        | (((data[2] as u64 >> 1) & 0x7F) << 15)
        | ((data[3] as u64) << 7)
        | ((data[4] as u64 >> 1) & 0x7F)
}

/// Sequential reader over a length-prefixed record region.
struct RecordCursor<'a> {
    data: &'a Bytes,
    offset: usize,
}

impl<'a> RecordCursor<'a> {
    fn new(data: &'a Bytes, offset: usize) -> Self {
        RecordCursor { data, offset }
    }

    fn take(&mut self, len: usize) -> Result<Bytes> {
        let end = self.offset + len;
        if end > self.data.len() {
            return Err(TsError::insufficient(end, self.data.len()));
        }
        let bytes = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_pcr(&mut self) -> Result<Pcr> {
        let field = self.take(Pcr::SIZE)?;
        Pcr::parse(&field).ok_or(TsError::insufficient(Pcr::SIZE, field.len()))
    }
}

/// Returns the bytes of a length-prefixed region (length byte included),
/// trimmed to the declared length.
fn length_prefixed(data: Bytes) -> Result<Bytes> {
    let Some(&length) = data.first() else {
        return Err(TsError::insufficient(1, 0));
    };
    let total = 1 + length as usize;
    if data.len() < total {
        return Err(TsError::insufficient(total, data.len()));
    }
    Ok(data.slice(..total))
}

/// Start offsets of the chained adaptation field records, relative to the
/// adaptation field length byte.
///
/// Each offset is the previous one plus the width of the previous record
/// when that record is present, so records that follow an absent one move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOffsets {
    pub pcr: usize,
    pub opcr: usize,
    pub splice_countdown: usize,
    pub transport_private_data_length: usize,
    pub transport_private_data: usize,
    pub extension: usize,
}

/// Adaptation field decoded from the packet bytes that start at its length byte.
#[derive(Debug, Clone)]
pub struct AdaptationField {
    /// Number of bytes following the length byte.
    pub adaptation_field_length: u8,
    pub discontinuity_indicator: bool,
    pub random_access_indicator: bool,
    pub elementary_stream_priority_indicator: bool,
    pub pcr_flag: bool,
    pub opcr_flag: bool,
    pub splicing_point_flag: bool,
    pub transport_private_data_flag: bool,
    pub adaptation_field_extension_flag: bool,
    pub pcr: Option<Pcr>,
    pub opcr: Option<Pcr>,
    pub splice_countdown: Option<i8>,
    pub transport_private_data: Option<Bytes>,
    pub extension: Option<AdaptationExtension>,
    pub offsets: FieldOffsets,
}

impl AdaptationField {
    /// Parse an adaptation field starting at its length byte.
    ///
    /// A field of length zero carries no flags byte and decodes with every
    /// flag cleared. A record announced by its flag that does not fit inside
    /// the declared length is an error.
    pub fn parse(data: Bytes) -> Result<Self> {
        let data = length_prefixed(data)?;
        let adaptation_field_length = data[0];
        let flags = data.get(1).copied().unwrap_or(0);

        let pcr_flag = (flags & 0x10) != 0;
        let opcr_flag = (flags & 0x08) != 0;
        let splicing_point_flag = (flags & 0x04) != 0;
        let transport_private_data_flag = (flags & 0x02) != 0;
        let adaptation_field_extension_flag = (flags & 0x01) != 0;

        let mut cursor = RecordCursor::new(&data, 2);

        let pcr_offset = cursor.offset;
        let pcr = if pcr_flag {
            Some(cursor.read_pcr()?)
        } else {
            None
        };

        let opcr_offset = cursor.offset;
        let opcr = if opcr_flag {
            Some(cursor.read_pcr()?)
        } else {
            None
        };

        let splice_countdown_offset = cursor.offset;
        let splice_countdown = if splicing_point_flag {
            Some(cursor.read_u8()? as i8)
        } else {
            None
        };

        let private_data_length_offset = cursor.offset;
        let private_data_length = if transport_private_data_flag {
            cursor.read_u8()? as usize
        } else {
            0
        };
        let private_data_offset = cursor.offset;
        let transport_private_data = if transport_private_data_flag {
            Some(cursor.take(private_data_length)?)
        } else {
            None
        };

        let extension_offset = cursor.offset;
        let extension = if adaptation_field_extension_flag {
            let region = data.slice(extension_offset.min(data.len())..);
            Some(AdaptationExtension::parse(region)?)
        } else {
            None
        };

        Ok(AdaptationField {
            adaptation_field_length,
            discontinuity_indicator: (flags & 0x80) != 0,
            random_access_indicator: (flags & 0x40) != 0,
            elementary_stream_priority_indicator: (flags & 0x20) != 0,
            pcr_flag,
            opcr_flag,
            splicing_point_flag,
            transport_private_data_flag,
            adaptation_field_extension_flag,
            pcr,
            opcr,
            splice_countdown,
            transport_private_data,
            extension,
            offsets: FieldOffsets {
                pcr: pcr_offset,
                opcr: opcr_offset,
                splice_countdown: splice_countdown_offset,
                transport_private_data_length: private_data_length_offset,
                transport_private_data: private_data_offset,
                extension: extension_offset,
            },
        })
    }

    /// Length of the transport private data, when the private data flag is set.
    pub fn transport_private_data_length(&self) -> Option<u8> {
        self.transport_private_data
            .as_ref()
            .map(|data| data.len() as u8)
    }

    /// Size of the adaptation field extension including its length byte,
    /// or 0 when there is no extension.
    pub fn adaptation_extension_total_length(&self) -> usize {
        self.extension
            .as_ref()
            .map_or(0, |ext| 1 + ext.adaptation_extension_length as usize)
    }
}

/// Legal time window of the adaptation field extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalTimeWindow {
    pub valid: bool,
    /// 15-bit offset.
    pub offset: u16,
}

/// Seamless splice parameters of the adaptation field extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeamlessSplice {
    /// 4-bit splice type.
    pub splice_type: u8,
    /// 33-bit DTS of the next access unit.
    pub dts_next_access_unit: u64,
}

/// Start offsets of the extension records, relative to the extension length byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionOffsets {
    pub legal_time_window: usize,
    pub piecewise_rate: usize,
    pub seamless_splice: usize,
}

/// Adaptation field extension.
#[derive(Debug, Clone)]
pub struct AdaptationExtension {
    /// Number of bytes following the extension length byte.
    pub adaptation_extension_length: u8,
    pub legal_time_window_flag: bool,
    pub piecewise_rate_flag: bool,
    pub seamless_splice_flag: bool,
    pub legal_time_window: Option<LegalTimeWindow>,
    /// 22-bit piecewise rate.
    pub piecewise_rate: Option<u32>,
    pub seamless_splice: Option<SeamlessSplice>,
    pub offsets: ExtensionOffsets,
}

impl AdaptationExtension {
    const LEGAL_TIME_WINDOW_SIZE: usize = 2;
    const PIECEWISE_RATE_SIZE: usize = 3;
    const SEAMLESS_SPLICE_SIZE: usize = 5;

    /// Parse an adaptation field extension starting at its length byte.
    pub fn parse(data: Bytes) -> Result<Self> {
        let data = length_prefixed(data)?;
        let adaptation_extension_length = data[0];
        let flags = data.get(1).copied().unwrap_or(0);

        let legal_time_window_flag = (flags & 0x80) != 0;
        let piecewise_rate_flag = (flags & 0x40) != 0;
        let seamless_splice_flag = (flags & 0x20) != 0;

        let mut cursor = RecordCursor::new(&data, 2);

        let legal_time_window_offset = cursor.offset;
        let legal_time_window = if legal_time_window_flag {
            let mut field = cursor.take(Self::LEGAL_TIME_WINDOW_SIZE)?;
            let word = field.get_u16();
            Some(LegalTimeWindow {
                valid: (word & 0x8000) != 0,
                offset: word & 0x7FFF,
            })
        } else {
            None
        };

        let piecewise_rate_offset = cursor.offset;
        let piecewise_rate = if piecewise_rate_flag {
            let field = cursor.take(Self::PIECEWISE_RATE_SIZE)?;
            Some(
                (u32::from(field[0] & 0x3F) << 16)
                    | (u32::from(field[1]) << 8)
                    | u32::from(field[2]),
            )
        } else {
            None
        };

        let seamless_splice_offset = cursor.offset;
        let seamless_splice = if seamless_splice_flag {
            let field = cursor.take(Self::SEAMLESS_SPLICE_SIZE)?;
            Some(SeamlessSplice {
                splice_type: field[0] >> 4,
                dts_next_access_unit: parse_timestamp(&field),
            })
        } else {
            None
        };

        Ok(AdaptationExtension {
            adaptation_extension_length,
            legal_time_window_flag,
            piecewise_rate_flag,
            seamless_splice_flag,
            legal_time_window,
            piecewise_rate,
            seamless_splice,
            offsets: ExtensionOffsets {
                legal_time_window: legal_time_window_offset,
                piecewise_rate: piecewise_rate_offset,
                seamless_splice: seamless_splice_offset,
            },
        })
    }
}
