//! CRC-32/MPEG-2 (ISO/IEC 13818-1 Annex A) as carried at the end of PSI sections.
//!
//! Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, MSB first, no final XOR.
//! A section that includes its own CRC therefore checksums to zero.

use bytes::Buf;

use crate::{Result, TsError};

const POLYNOMIAL: u32 = 0x04C1_1DB7;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = (index as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000_0000 != 0 {
                (value << 1) ^ POLYNOMIAL
            } else {
                value << 1
            };
            bit += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

/// Compute the MPEG-2 CRC-32 of `data`.
pub fn mpeg2_crc32(data: &[u8]) -> u32 {
    data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
        (crc << 8) ^ TABLE[usize::from((crc >> 24) as u8 ^ byte)]
    })
}

/// Verify a complete section, from the table id through the trailing CRC.
pub fn verify_section_crc(section: &[u8]) -> Result<()> {
    if section.len() < 4 {
        return Err(TsError::insufficient(4, section.len()));
    }
    let (covered, mut stored) = section.split_at(section.len() - 4);
    let expected = stored.get_u32();
    let calculated = mpeg2_crc32(covered);
    if expected != calculated {
        return Err(TsError::Crc32Mismatch {
            expected,
            calculated,
        });
    }
    Ok(())
}
