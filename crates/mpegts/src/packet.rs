use std::cell::OnceCell;

use bytes::Bytes;
use tracing::debug;

use crate::adaptation_field::AdaptationField;
use crate::{Result, TsError};

/// Size of a transport stream packet.
pub const PACKET_SIZE: usize = 188;

/// Sync byte every packet starts with.
pub const SYNC_BYTE: u8 = 0x47;

/// PAT PID (always 0x0000)
pub const PID_PAT: u16 = 0x0000;

/// CAT PID (always 0x0001)
pub const PID_CAT: u16 = 0x0001;

/// NULL PID (always 0x1FFF)
pub const PID_NULL: u16 = 0x1FFF;

const HEADER_SIZE: usize = 4;

/// Transport scrambling control (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramblingControl {
    NotScrambled,
    /// `0b01`, reserved by ISO/IEC 13818-1 and passed through.
    Reserved,
    EvenKey,
    OddKey,
}

impl From<u8> for ScramblingControl {
    fn from(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => ScramblingControl::NotScrambled,
            0b01 => ScramblingControl::Reserved,
            0b10 => ScramblingControl::EvenKey,
            _ => ScramblingControl::OddKey,
        }
    }
}

/// Adaptation field control (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationFieldControl {
    /// `0b00`, reserved by ISO/IEC 13818-1 and passed through. Such a packet
    /// has neither an adaptation field nor a payload.
    Reserved,
    /// No adaptation field, payload only.
    PayloadOnly,
    /// Adaptation field only, no payload.
    AdaptationOnly,
    /// Adaptation field followed by payload.
    AdaptationAndPayload,
}

impl From<u8> for AdaptationFieldControl {
    fn from(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => AdaptationFieldControl::Reserved,
            0b01 => AdaptationFieldControl::PayloadOnly,
            0b10 => AdaptationFieldControl::AdaptationOnly,
            _ => AdaptationFieldControl::AdaptationAndPayload,
        }
    }
}

impl AdaptationFieldControl {
    /// Whether packets with this control value carry an adaptation field.
    pub fn has_adaptation_field(self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::AdaptationOnly | AdaptationFieldControl::AdaptationAndPayload
        )
    }

    /// Whether packets with this control value carry a payload.
    pub fn has_payload(self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::PayloadOnly | AdaptationFieldControl::AdaptationAndPayload
        )
    }
}

/// Transport Stream packet view over a 188-byte buffer.
///
/// Header fields are decoded on construction. The adaptation field is decoded
/// on first access and kept for later calls.
#[derive(Debug, Clone)]
pub struct TsPacket {
    data: Bytes,
    pub transport_error_indicator: bool,
    pub payload_unit_start_indicator: bool,
    pub transport_priority: bool,
    /// 13-bit packet identifier
    pub pid: u16,
    pub transport_scrambling_control: ScramblingControl,
    pub adaptation_field_control: AdaptationFieldControl,
    /// 4-bit continuity counter
    pub continuity_counter: u8,
    payload_offset: usize,
    adaptation_field: OnceCell<Option<Result<AdaptationField>>>,
}

impl TsPacket {
    /// Parse a TS packet from 188 bytes
    pub fn parse(data: Bytes) -> Result<Self> {
        if data.len() != PACKET_SIZE {
            return Err(TsError::InvalidPacketSize(data.len()));
        }
        if data[0] != SYNC_BYTE {
            return Err(TsError::InvalidSyncByte(data[0]));
        }

        let byte1 = data[1];
        let byte2 = data[2];
        let byte3 = data[3];

        let adaptation_field_control = AdaptationFieldControl::from(byte3 >> 4);
        let adaptation_field_total_length = if adaptation_field_control.has_adaptation_field() {
            1 + data[HEADER_SIZE] as usize
        } else {
            0
        };
        // An overlong adaptation field is reported by `adaptation_field()`;
        // the header stays readable and the payload is empty.
        let payload_offset = (HEADER_SIZE + adaptation_field_total_length).min(PACKET_SIZE);

        Ok(TsPacket {
            transport_error_indicator: (byte1 & 0x80) != 0,
            payload_unit_start_indicator: (byte1 & 0x40) != 0,
            transport_priority: (byte1 & 0x20) != 0,
            pid: ((byte1 as u16 & 0x1F) << 8) | byte2 as u16,
            transport_scrambling_control: ScramblingControl::from(byte3 >> 6),
            adaptation_field_control,
            continuity_counter: byte3 & 0x0F,
            payload_offset,
            adaptation_field: OnceCell::new(),
            data,
        })
    }

    /// The packet bytes this view was built from.
    pub fn raw(&self) -> &Bytes {
        &self.data
    }

    /// Check if this packet has a payload
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control.has_payload()
    }

    /// Check if this packet has an adaptation field
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control.has_adaptation_field()
    }

    pub fn is_pat(&self) -> bool {
        self.pid == PID_PAT
    }

    pub fn is_cat(&self) -> bool {
        self.pid == PID_CAT
    }

    /// Total size of the adaptation field including its length byte, or 0
    /// when the packet carries none. Never extends past the packet end.
    pub fn adaptation_field_total_length(&self) -> usize {
        self.payload_offset - HEADER_SIZE
    }

    /// Whether the declared adaptation field length runs past the packet end.
    fn adaptation_field_overruns(&self) -> bool {
        self.has_adaptation_field()
            && HEADER_SIZE + 1 + self.data[HEADER_SIZE] as usize > PACKET_SIZE
    }

    /// The decoded adaptation field, if the control bits announce one.
    ///
    /// Decoding happens on the first call. A declared length that runs past
    /// the packet end, or records that overrun the declared length, yield
    /// the same error on every call.
    pub fn adaptation_field(&self) -> Result<Option<&AdaptationField>> {
        let decoded = self.adaptation_field.get_or_init(|| {
            if !self.has_adaptation_field() {
                return None;
            }
            let result = if self.adaptation_field_overruns() {
                Err(TsError::InvalidAdaptationFieldLength(self.data[HEADER_SIZE]))
            } else {
                AdaptationField::parse(self.data.slice(HEADER_SIZE..self.payload_offset))
            };
            if let Err(e) = &result {
                debug!(pid = self.pid, error = %e, "Failed to decode adaptation field");
            }
            Some(result)
        });

        match decoded {
            None => Ok(None),
            Some(Ok(field)) => Ok(Some(field)),
            Some(Err(e)) => Err(e.clone()),
        }
    }

    /// The bytes after the adaptation field, if the control bits announce a
    /// payload. The slice may be empty.
    pub fn payload(&self) -> Option<Bytes> {
        self.has_payload()
            .then(|| self.data.slice(self.payload_offset..))
    }

    /// Check if this packet has the random access indicator set.
    ///
    /// Reads the flag directly so that a malformed adaptation field tail does
    /// not hide it.
    pub fn has_random_access_indicator(&self) -> bool {
        self.adaptation_field_total_length() > 1 && (self.data[HEADER_SIZE + 1] & 0x40) != 0
    }
}
