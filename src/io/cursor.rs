//! `DbCursor`: typed, order-enforcing reader over the database byte stream.
//!
//! The database has no schema tags, so correctness rests on consuming records
//! in the exact order the mesher wrote them. The cursor only exposes "read the
//! next expected field" calls; there is no seek. Each call carries a field
//! label so a truncated or malformed stream names the record it died in.

use crate::error::AxipartError;
use crate::io::wire::{self, MODEL_NAME_LEN, WireDisc, WireExtremum, WireHeader};
use std::io::Read;

/// Sequential reader with byte-offset tracking for error reporting.
pub struct DbCursor<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> DbCursor<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Byte offset of the next unread field.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self, buf: &mut [u8], field: &'static str) -> Result<(), AxipartError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(AxipartError::Truncated {
                field,
                offset: self.offset,
            }),
            Err(e) => Err(AxipartError::ReadFailed {
                field,
                offset: self.offset,
                source: e,
            }),
        }
    }

    /// Consume and validate the file header (magic + format version).
    pub fn read_header(&mut self) -> Result<(), AxipartError> {
        let mut raw = [0u8; size_of::<WireHeader>()];
        self.fill(&mut raw, "header")?;
        let hdr: WireHeader = bytemuck::pod_read_unaligned(&raw);
        if hdr.magic() != wire::DB_MAGIC {
            return Err(AxipartError::BadMagic { found: hdr.magic() });
        }
        if hdr.version() != wire::DB_VERSION {
            return Err(AxipartError::UnsupportedVersion {
                found: hdr.version(),
            });
        }
        Ok(())
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, AxipartError> {
        let mut raw = [0u8; 4];
        self.fill(&mut raw, field)?;
        Ok(i32::from_le_bytes(raw))
    }

    /// Read a count field, rejecting negatives.
    pub fn read_count(&mut self, field: &'static str) -> Result<usize, AxipartError> {
        let v = self.read_i32(field)?;
        if v < 0 {
            return Err(AxipartError::NegativeCount {
                field,
                value: v as i64,
            });
        }
        Ok(v as usize)
    }

    pub fn read_f64(&mut self, field: &'static str) -> Result<f64, AxipartError> {
        let mut raw = [0u8; 8];
        self.fill(&mut raw, field)?;
        Ok(f64::from_le_bytes(raw))
    }

    /// Read an `i32` boolean; anything but 0 or 1 is corrupt.
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, AxipartError> {
        match self.read_i32(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(AxipartError::InvalidBool { field, value }),
        }
    }

    /// Read the fixed-width model name field, trimming trailing padding.
    pub fn read_name(&mut self, field: &'static str) -> Result<String, AxipartError> {
        let mut raw = [0u8; MODEL_NAME_LEN];
        self.fill(&mut raw, field)?;
        let trimmed: &[u8] = {
            let mut end = raw.len();
            while end > 0 && (raw[end - 1] == b' ' || raw[end - 1] == 0) {
                end -= 1;
            }
            &raw[..end]
        };
        if !trimmed.iter().all(|b| b.is_ascii_graphic()) {
            return Err(AxipartError::BadModelName);
        }
        // Field is pure ASCII at this point.
        Ok(String::from_utf8_lossy(trimmed).into_owned())
    }

    /// Read `len` indices, each required to lie in `0..limit`.
    pub fn read_index_vec(
        &mut self,
        len: usize,
        limit: usize,
        field: &'static str,
    ) -> Result<Vec<usize>, AxipartError> {
        let mut raw = vec![0u8; len * 4];
        self.fill(&mut raw, field)?;
        let mut out = Vec::with_capacity(len);
        for chunk in raw.chunks_exact(4) {
            let idx = i32::from_le_bytes(chunk.try_into().unwrap_or([0; 4]));
            if idx < 0 || idx as usize >= limit {
                return Err(AxipartError::IndexOutOfRange {
                    field,
                    index: idx as i64,
                    limit,
                });
            }
            out.push(idx as usize);
        }
        Ok(out)
    }

    pub fn read_i32_vec(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<Vec<i32>, AxipartError> {
        let mut raw = vec![0u8; len * 4];
        self.fill(&mut raw, field)?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap_or([0; 4])))
            .collect())
    }

    /// Read `len` coordinate pairs `(s, z)`.
    pub fn read_f64_pairs(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<Vec<(f64, f64)>, AxipartError> {
        let mut raw = vec![0u8; len * 16];
        self.fill(&mut raw, field)?;
        Ok(raw
            .chunks_exact(16)
            .map(|c| {
                let s = f64::from_le_bytes(c[..8].try_into().unwrap_or([0; 8]));
                let z = f64::from_le_bytes(c[8..].try_into().unwrap_or([0; 8]));
                (s, z)
            })
            .collect())
    }

    pub fn read_disc(&mut self, field: &'static str) -> Result<WireDisc, AxipartError> {
        let mut raw = [0u8; size_of::<WireDisc>()];
        self.fill(&mut raw, field)?;
        Ok(bytemuck::pod_read_unaligned(&raw))
    }

    pub fn read_extremum(&mut self, field: &'static str) -> Result<WireExtremum, AxipartError> {
        let mut raw = [0u8; size_of::<WireExtremum>()];
        self.fill(&mut raw, field)?;
        Ok(bytemuck::pod_read_unaligned(&raw))
    }

    /// Require the stream to be exhausted; trailing bytes are corruption.
    pub fn expect_eof(&mut self) -> Result<(), AxipartError> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte) {
            Ok(0) => Ok(()),
            Ok(_) => {
                let rest = std::io::copy(&mut self.inner, &mut std::io::sink()).unwrap_or(0);
                Err(AxipartError::TrailingBytes { extra: 1 + rest })
            }
            Err(e) => Err(AxipartError::ReadFailed {
                field: "end-of-stream",
                offset: self.offset,
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::wire::WireHeader;
    use std::io::Cursor;

    fn cursor(bytes: Vec<u8>) -> DbCursor<Cursor<Vec<u8>>> {
        DbCursor::new(Cursor::new(bytes))
    }

    #[test]
    fn scalar_reads_advance_offset() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&2.5f64.to_le_bytes());
        let mut c = cursor(bytes);
        assert_eq!(c.read_i32("a").unwrap(), 7);
        assert_eq!(c.read_f64("b").unwrap(), 2.5);
        assert_eq!(c.offset(), 12);
        assert!(c.expect_eof().is_ok());
    }

    #[test]
    fn truncation_names_the_field() {
        let mut c = cursor(vec![1, 2]);
        let err = c.read_i32("npoin").unwrap_err();
        assert!(matches!(
            err,
            AxipartError::Truncated { field: "npoin", .. }
        ));
    }

    #[test]
    fn negative_count_rejected() {
        let mut c = cursor((-3i32).to_le_bytes().to_vec());
        assert!(matches!(
            c.read_count("ndisc").unwrap_err(),
            AxipartError::NegativeCount { value: -3, .. }
        ));
    }

    #[test]
    fn bool_rejects_garbage() {
        let mut c = cursor(2i32.to_le_bytes().to_vec());
        assert!(matches!(
            c.read_bool("has_fluid").unwrap_err(),
            AxipartError::InvalidBool { value: 2, .. }
        ));
    }

    #[test]
    fn name_trims_padding() {
        let mut raw = [b' '; MODEL_NAME_LEN];
        raw[..4].copy_from_slice(b"prem");
        let mut c = cursor(raw.to_vec());
        assert_eq!(c.read_name("model").unwrap(), "prem");
    }

    #[test]
    fn name_rejects_binary_junk() {
        let raw = [0xFFu8; MODEL_NAME_LEN];
        let mut c = cursor(raw.to_vec());
        assert!(matches!(
            c.read_name("model").unwrap_err(),
            AxipartError::BadModelName
        ));
    }

    #[test]
    fn index_vec_bounds_checked() {
        let mut bytes = Vec::new();
        for v in [0i32, 4, 9] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut c = cursor(bytes.clone());
        assert_eq!(c.read_index_vec(3, 10, "conn").unwrap(), vec![0, 4, 9]);
        let mut c = cursor(bytes);
        assert!(matches!(
            c.read_index_vec(3, 9, "conn").unwrap_err(),
            AxipartError::IndexOutOfRange { index: 9, .. }
        ));
    }

    #[test]
    fn header_mismatch_is_corrupt() {
        let mut hdr = WireHeader::new();
        hdr.magic_le = 0xDEAD_BEEFu32.to_le();
        let mut c = cursor(bytemuck::bytes_of(&hdr).to_vec());
        assert!(matches!(
            c.read_header().unwrap_err(),
            AxipartError::BadMagic { .. }
        ));
    }

    #[test]
    fn trailing_bytes_counted() {
        let mut c = cursor(vec![0u8; 5]);
        c.read_i32("x").unwrap();
        assert!(matches!(
            c.expect_eof().unwrap_err(),
            AxipartError::TrailingBytes { extra: 1 }
        ));
    }
}
