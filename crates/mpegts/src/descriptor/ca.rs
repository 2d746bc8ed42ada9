//! Conditional access descriptor (ISO/IEC 13818-1 2.6.16).

use bytes::{Buf, Bytes};

use super::RawDescriptor;
use crate::{Result, TsError};

const FIXED_SIZE: usize = 4;

/// Conditional access descriptor (tag 0x09): CA system and the PID carrying
/// its ECMs (in a PMT) or EMMs (in a CAT).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaDescriptor(pub(crate) RawDescriptor);

impl CaDescriptor {
    pub fn raw(&self) -> &RawDescriptor {
        &self.0
    }

    fn fixed(&self) -> Result<&[u8]> {
        let payload = self.0.complete_payload()?;
        if payload.len() < FIXED_SIZE {
            return Err(TsError::insufficient(FIXED_SIZE, payload.len()));
        }
        Ok(payload)
    }

    pub fn ca_system_id(&self) -> Result<u16> {
        let mut payload = self.fixed()?;
        Ok(payload.get_u16())
    }

    /// 13-bit PID of the ECM/EMM stream.
    pub fn ca_pid(&self) -> Result<u16> {
        let mut payload = &self.fixed()?[2..];
        Ok(payload.get_u16() & 0x1FFF)
    }

    /// System-specific bytes following the PID.
    pub fn private_data(&self) -> Result<Bytes> {
        self.fixed()?;
        Ok(self.0.payload().slice(FIXED_SIZE..))
    }
}
