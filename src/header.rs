//! Global header
//!
//! The first 128 bytes of every image. All integer fields are little-endian;
//! string fields are fixed-length, NUL-terminated ASCII.

use crate::arch;
use crate::error::{Result, SifError};
use uuid::Uuid;

/// Size of the encoded global header in bytes.
pub const HEADER_LEN: usize = 128;

/// Magic bytes identifying an image file.
pub const MAGIC: [u8; 10] = *b"SIF_MAGIC\0";

/// Image format version implemented by this crate.
pub const VERSION: &str = "01";

/// Launch script placed in the header when none is supplied and the image is
/// not created in deterministic mode.
pub const DEFAULT_LAUNCH_SCRIPT: &str = "#!/usr/bin/env run-singularity\n";

const LAUNCH_LEN: usize = 32;
const VERSION_LEN: usize = 3;
const ARCH_LEN: usize = 3;

/// Global image header.
///
/// Holds the launch script, identity and timestamps of the image, and the
/// location of the descriptor table and data area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub(crate) launch_script: String,
    pub(crate) arch: String,
    pub(crate) id: Uuid,
    pub(crate) created_at: i64,
    pub(crate) modified_at: i64,
    pub(crate) descriptors_total: u64,
    pub(crate) descriptors_used: u64,
    pub(crate) descriptors_offset: u64,
    pub(crate) descriptors_size: u64,
    pub(crate) data_offset: u64,
    pub(crate) data_size: u64,
}

impl Header {
    /// Launch script, without field padding.
    pub fn launch_script(&self) -> &str {
        &self.launch_script
    }

    /// Architecture name of the primary system partition, or "unknown".
    pub fn arch(&self) -> &str {
        arch::arch_name(&self.arch)
    }

    /// Unique image identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation time, in seconds since the Unix epoch.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Last modification time, in seconds since the Unix epoch.
    pub fn modified_at(&self) -> i64 {
        self.modified_at
    }

    /// Number of descriptor slots in the table.
    pub fn descriptors_total(&self) -> u64 {
        self.descriptors_total
    }

    /// Number of live descriptors.
    pub fn descriptors_used(&self) -> u64 {
        self.descriptors_used
    }

    /// Offset of the descriptor table from the start of the file.
    pub fn descriptors_offset(&self) -> u64 {
        self.descriptors_offset
    }

    /// Size of the descriptor table in bytes.
    pub fn descriptors_size(&self) -> u64 {
        self.descriptors_size
    }

    /// Offset of the data area from the start of the file.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Size of the data area in bytes.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Serialize the header to its 128-byte encoding.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN]> {
        let mut buf = [0u8; HEADER_LEN];

        put_fixed_str(&mut buf[0..32], &self.launch_script, "launch script")?;
        buf[32..42].copy_from_slice(&MAGIC);
        put_fixed_str(&mut buf[42..45], VERSION, "version")?;
        put_fixed_str(&mut buf[45..48], &self.arch, "architecture")?;
        buf[48..64].copy_from_slice(self.id.as_bytes());
        buf[64..72].copy_from_slice(&self.created_at.to_le_bytes());
        buf[72..80].copy_from_slice(&self.modified_at.to_le_bytes());
        buf[80..88].copy_from_slice(&self.descriptors_total.to_le_bytes());
        buf[88..96].copy_from_slice(&self.descriptors_used.to_le_bytes());
        buf[96..104].copy_from_slice(&self.descriptors_offset.to_le_bytes());
        buf[104..112].copy_from_slice(&self.descriptors_size.to_le_bytes());
        buf[112..120].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[120..128].copy_from_slice(&self.data_size.to_le_bytes());

        Ok(buf)
    }

    /// Deserialize a header from bytes, verifying magic and version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SifError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "insufficient bytes for header",
            )));
        }

        if bytes[32..42] != MAGIC {
            return Err(SifError::InvalidMagic);
        }

        let version = fixed_str(&bytes[42..45]);
        if version != VERSION {
            return Err(SifError::UnsupportedVersion(version));
        }

        let mut id = [0u8; 16];
        id.copy_from_slice(&bytes[48..64]);

        Ok(Header {
            launch_script: fixed_str(&bytes[0..32]),
            arch: fixed_str(&bytes[45..48]),
            id: Uuid::from_bytes(id),
            created_at: get_i64(bytes, 64),
            modified_at: get_i64(bytes, 72),
            descriptors_total: get_u64(bytes, 80),
            descriptors_used: get_u64(bytes, 88),
            descriptors_offset: get_u64(bytes, 96),
            descriptors_size: get_u64(bytes, 104),
            data_offset: get_u64(bytes, 112),
            data_size: get_u64(bytes, 120),
        })
    }
}

/// Copy `s` into a fixed NUL-padded field, rejecting strings that do not
/// leave room for the terminator.
pub(crate) fn put_fixed_str(dst: &mut [u8], s: &str, field: &'static str) -> Result<()> {
    let b = s.as_bytes();
    if b.len() >= dst.len() {
        return Err(SifError::InvalidExtra(field));
    }
    dst[..b.len()].copy_from_slice(b);
    Ok(())
}

/// Read a NUL-terminated string out of a fixed field.
pub(crate) fn fixed_str(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

pub(crate) fn get_u32(b: &[u8], off: usize) -> u32 {
    let mut a = [0u8; 4];
    a.copy_from_slice(&b[off..off + 4]);
    u32::from_le_bytes(a)
}

pub(crate) fn get_u64(b: &[u8], off: usize) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[off..off + 8]);
    u64::from_le_bytes(a)
}

pub(crate) fn get_i64(b: &[u8], off: usize) -> i64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[off..off + 8]);
    i64::from_le_bytes(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            launch_script: DEFAULT_LAUNCH_SCRIPT.to_string(),
            arch: "02".to_string(),
            id: Uuid::nil(),
            created_at: 1593475316,
            modified_at: 1593475316,
            descriptors_total: 48,
            descriptors_used: 2,
            descriptors_offset: 128,
            descriptors_size: 48 * 589,
            data_offset: 128 + 48 * 589,
            data_size: 274,
        }
    }

    #[test]
    fn test_header_size() {
        let bytes = sample_header().to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        let decoded = Header::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_field_offsets() {
        let bytes = sample_header().to_bytes().unwrap();
        assert_eq!(&bytes[32..42], b"SIF_MAGIC\0");
        assert_eq!(&bytes[42..45], b"01\0");
        assert_eq!(&bytes[45..48], b"02\0");
        assert_eq!(get_u64(&bytes, 80), 48);
        assert_eq!(get_u64(&bytes, 112), 128 + 48 * 589);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[32] = b'X';
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(SifError::InvalidMagic)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[42..45].copy_from_slice(b"99\0");
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(SifError::UnsupportedVersion(v)) if v == "99"
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = sample_header().to_bytes().unwrap();
        assert!(matches!(
            Header::from_bytes(&bytes[..64]),
            Err(SifError::Io(_))
        ));
    }

    #[test]
    fn test_launch_script_too_long() {
        let mut header = sample_header();
        header.launch_script = "#".repeat(32);
        assert!(matches!(
            header.to_bytes(),
            Err(SifError::InvalidExtra("launch script"))
        ));
    }
}
