//! Vector matrix blob format definitions
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (64 bytes)                                            │
//! │   magic: u32      = 0x5645434D ("VECM")                      │
//! │   version: u32    = 1                                        │
//! │   dims: u32       = vector dimensions                        │
//! │   count: u64      = number of rows                           │
//! │   checksum: u32   = CRC32 of the payload                     │
//! │   _reserved: [u8; 40]                                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Row 0: [f32 LE; dims]                                        │
//! │ Row 1: [f32 LE; dims]                                        │
//! │ ...                                                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use super::VectorMatrix;
use crate::defaults::{VECTOR_MATRIX_HEADER_SIZE, VECTOR_MATRIX_MAGIC, VECTOR_MATRIX_VERSION};
use bytes::{BufMut, Bytes, BytesMut};

pub const HEADER_SIZE: usize = VECTOR_MATRIX_HEADER_SIZE;

/// Errors decoding a vector matrix blob
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FormatError {
    #[error("Blob too short: {0} bytes")]
    Truncated(usize),

    #[error("Invalid magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("Header declares {count} rows of {dims} dimensions, which overflows")]
    SizeOverflow { count: u64, dims: u32 },

    #[error("Payload is {actual} bytes, header declares {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Checksum mismatch: header {expected:#010x}, payload {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixHeader {
    pub magic: u32,
    pub version: u32,
    pub dims: u32,
    pub count: u64,
    pub checksum: u32,
}

impl MatrixHeader {
    pub fn new(dims: usize, count: usize, checksum: u32) -> Self {
        Self {
            magic: VECTOR_MATRIX_MAGIC,
            version: VECTOR_MATRIX_VERSION,
            dims: dims as u32,
            count: count as u64,
            checksum,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.dims.to_le_bytes());
        bytes[12..20].copy_from_slice(&self.count.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated(bytes.len()));
        }

        let u32_at = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(buf)
        };
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[12..20]);

        Ok(Self {
            magic: u32_at(0),
            version: u32_at(4),
            dims: u32_at(8),
            count: u64::from_le_bytes(count),
            checksum: u32_at(20),
        })
    }
}

/// Serialize a matrix into a blob
pub fn encode_matrix(matrix: &VectorMatrix) -> Bytes {
    let mut payload = BytesMut::with_capacity(matrix.as_slice().len() * 4);
    for &val in matrix.as_slice() {
        payload.put_f32_le(val);
    }

    let header = MatrixHeader::new(matrix.dims(), matrix.rows(), crc32fast::hash(&payload));

    let mut blob = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    blob.put_slice(&header.to_bytes());
    blob.put_slice(&payload);
    blob.freeze()
}

/// Parse a blob back into a matrix, validating header and checksum
pub fn decode_matrix(bytes: &[u8]) -> Result<VectorMatrix, FormatError> {
    let header = MatrixHeader::from_bytes(bytes)?;

    if header.magic != VECTOR_MATRIX_MAGIC {
        return Err(FormatError::BadMagic(header.magic));
    }
    if header.version != VECTOR_MATRIX_VERSION {
        return Err(FormatError::UnsupportedVersion(header.version));
    }

    let payload = &bytes[HEADER_SIZE..];
    let expected = header
        .count
        .checked_mul(header.dims as u64)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(FormatError::SizeOverflow {
            count: header.count,
            dims: header.dims,
        })?;
    if payload.len() != expected {
        return Err(FormatError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(FormatError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let data: Vec<f32> = payload
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(VectorMatrix::from_flat(header.dims as usize, data))
}
