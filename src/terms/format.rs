//! On-disk layout of a term dictionary (big endian)
//!
//! ```text
//! magic "FWDT" | format version (u32)
//! locale (u32 length + UTF-8) | collator version tag (u32)
//! term count (u32) | block size (u32) | block count (u32)
//! sensitive positions (u32 × n) | sensitive ids (u32 × n)
//! insensitive positions (u32 × n) | insensitive ids (u32 × n)
//! block offsets (u64 × (block count + 1), absolute)
//! blocks of terms (u32 length + UTF-8 each)
//! ```

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::utils::buffer::Buffer;

pub(crate) const MAGIC: &[u8; 4] = b"FWDT";
pub(crate) const FORMAT_VERSION: u32 = 1;

fn block_count(term_count: u32, block_size: u32) -> u32 {
    ((term_count as u64 + block_size as u64 - 1) / block_size as u64) as u32
}

pub(crate) struct TermsHeader {
    pub locale: String,
    pub collator_tag: u32,
    pub term_count: u32,
    pub block_size: u32,
    pub block_count: u32,
}

impl TermsHeader {
    pub fn new(locale: &str, collator_tag: u32, term_count: u32, block_size: u32) -> Self {
        Self {
            locale: locale.to_string(),
            collator_tag,
            term_count,
            block_size,
            block_count: block_count(term_count, block_size),
        }
    }

    fn size(&self) -> usize {
        4 + 4 + 4 + self.locale.len() + 4 * 4
    }

    /// Offset of one of the four permutation tables
    /// (0/1: sensitive positions/ids, 2/3: insensitive positions/ids)
    pub fn table_offset(&self, table: usize) -> usize {
        self.size() + table * 4 * self.term_count as usize
    }

    pub fn block_table_offset(&self) -> usize {
        self.table_offset(4)
    }

    pub fn data_offset(&self) -> usize {
        self.block_table_offset() + 8 * (self.block_count as usize + 1)
    }

    pub fn write(&self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(MAGIC)?;
        out.write_u32::<BigEndian>(FORMAT_VERSION)?;
        out.write_u32::<BigEndian>(self.locale.len() as u32)?;
        out.write_all(self.locale.as_bytes())?;
        out.write_u32::<BigEndian>(self.collator_tag)?;
        out.write_u32::<BigEndian>(self.term_count)?;
        out.write_u32::<BigEndian>(self.block_size)?;
        out.write_u32::<BigEndian>(self.block_count)?;
        Ok(())
    }

    pub fn read(buffer: &dyn Buffer) -> Result<Self, String> {
        let truncated = |e: std::io::Error| format!("truncated header ({})", e);

        if buffer.slice(0, 4).map_err(truncated)? != MAGIC {
            return Err("not a term dictionary (bad magic)".to_string());
        }
        let version = buffer.u32_at(4).map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", version));
        }

        let locale_len = buffer.u32_at(8).map_err(truncated)? as usize;
        let locale = std::str::from_utf8(buffer.slice(12, 12 + locale_len).map_err(truncated)?)
            .map_err(|e| format!("invalid locale ({})", e))?
            .to_string();

        let base = 12 + locale_len;
        let header = Self {
            locale,
            collator_tag: buffer.u32_at(base).map_err(truncated)?,
            term_count: buffer.u32_at(base + 4).map_err(truncated)?,
            block_size: buffer.u32_at(base + 8).map_err(truncated)?,
            block_count: buffer.u32_at(base + 12).map_err(truncated)?,
        };

        if header.block_size == 0
            || header.block_count != block_count(header.term_count, header.block_size)
        {
            return Err(format!(
                "inconsistent blocks ({} blocks of {} for {} terms)",
                header.block_count, header.block_size, header.term_count
            ));
        }
        if header.data_offset() > buffer.len() {
            return Err("truncated tables".to_string());
        }
        Ok(header)
    }
}
