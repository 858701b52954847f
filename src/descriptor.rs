//! Data object descriptors
//!
//! Each data object in an image is described by one fixed-size descriptor
//! record: type, identity, grouping, location, timestamps, a short name, and
//! a type-specific extra area. Records are 585 bytes, stored in 589-byte
//! slots (4 trailing pad bytes). A slot whose used flag is clear is free and
//! is encoded as all zeroes.

use crate::arch;
use crate::error::{Result, SifError};
use crate::header::{fixed_str, get_i64, get_u32, put_fixed_str};
use std::fmt;

/// Size of an encoded descriptor record in bytes.
pub const DESCRIPTOR_LEN: usize = 585;

/// Size of a descriptor slot in the on-disk table.
pub const DESCRIPTOR_SLOT_LEN: usize = 589;

/// Maximum descriptor name length, including the NUL terminator.
pub const NAME_LEN: usize = 128;

/// Size of the type-specific extra area.
pub const EXTRA_LEN: usize = 384;

/// Flag bit marking a group id (in the group field) or a group link (in the
/// link field).
pub const GROUP_FLAG: u32 = 1 << 31;

/// Group new objects land in unless the input says otherwise.
pub const DEFAULT_GROUP: u32 = 1;

/// Data object content type.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Deffile = 1,
    EnvVar = 2,
    Labels = 3,
    Partition = 4,
    Signature = 5,
    GenericJson = 6,
    Generic = 7,
    CryptoMessage = 8,
    Sbom = 9,
}

impl DataType {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Deffile),
            2 => Some(Self::EnvVar),
            3 => Some(Self::Labels),
            4 => Some(Self::Partition),
            5 => Some(Self::Signature),
            6 => Some(Self::GenericJson),
            7 => Some(Self::Generic),
            8 => Some(Self::CryptoMessage),
            9 => Some(Self::Sbom),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deffile => "Def.FILE",
            Self::EnvVar => "Env.Vars",
            Self::Labels => "JSON.Labels",
            Self::Partition => "FS",
            Self::Signature => "Signature",
            Self::GenericJson => "JSON.Generic",
            Self::Generic => "Generic/Raw",
            Self::CryptoMessage => "Cryptographic Message",
            Self::Sbom => "SBOM",
        };
        f.write_str(s)
    }
}

/// Filesystem type of a partition object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    Squash = 1,
    Ext3 = 2,
    ImmutableObject = 3,
    Raw = 4,
    EncryptedSquash = 5,
}

impl FsType {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Squash),
            2 => Some(Self::Ext3),
            3 => Some(Self::ImmutableObject),
            4 => Some(Self::Raw),
            5 => Some(Self::EncryptedSquash),
            _ => None,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Squash => "Squashfs",
            Self::Ext3 => "Ext3",
            Self::ImmutableObject => "Archive",
            Self::Raw => "Raw",
            Self::EncryptedSquash => "Encrypted squashfs",
        };
        f.write_str(s)
    }
}

/// Role of a partition object within its group.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartType {
    PrimSys = 1,
    System = 2,
    Data = 3,
    Overlay = 4,
}

impl PartType {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::PrimSys),
            2 => Some(Self::System),
            3 => Some(Self::Data),
            4 => Some(Self::Overlay),
            _ => None,
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PrimSys => "Primary System",
            Self::System => "System",
            Self::Data => "Data",
            Self::Overlay => "Overlay",
        };
        f.write_str(s)
    }
}

/// Digest algorithm recorded in a signature object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    Sha256 = 1,
    Sha384 = 2,
    Sha512 = 3,
    Blake2s = 4,
    Blake2b = 5,
}

impl HashType {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Sha256),
            2 => Some(Self::Sha384),
            3 => Some(Self::Sha512),
            4 => Some(Self::Blake2s),
            5 => Some(Self::Blake2b),
            _ => None,
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake2s => "BLAKE2s",
            Self::Blake2b => "BLAKE2b",
        };
        f.write_str(s)
    }
}

/// Encoding of a cryptographic message object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoFormat {
    OpenPgp = 1,
}

impl CryptoFormat {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::OpenPgp),
            _ => None,
        }
    }
}

impl fmt::Display for CryptoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenPgp => "OpenPGP",
        })
    }
}

/// Kind of a cryptographic message object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    ClearSignature = 1,
    DetachedSignature = 2,
}

impl MessageKind {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::ClearSignature),
            2 => Some(Self::DetachedSignature),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClearSignature => "Clear Signature",
            Self::DetachedSignature => "Detached Signature",
        })
    }
}

/// Document format of an SBOM object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomFormat {
    CycloneDxJson = 1,
    CycloneDxXml = 2,
    SpdxJson = 3,
    SpdxTagValue = 4,
    SpdxRdf = 5,
    SpdxYaml = 6,
    SyftJson = 7,
}

impl SbomFormat {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::CycloneDxJson),
            2 => Some(Self::CycloneDxXml),
            3 => Some(Self::SpdxJson),
            4 => Some(Self::SpdxTagValue),
            5 => Some(Self::SpdxRdf),
            6 => Some(Self::SpdxYaml),
            7 => Some(Self::SyftJson),
            _ => None,
        }
    }
}

impl fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CycloneDxJson => "cyclonedx+json",
            Self::CycloneDxXml => "cyclonedx+xml",
            Self::SpdxJson => "spdx+json",
            Self::SpdxTagValue => "spdx+tag-value",
            Self::SpdxRdf => "spdx+rdf",
            Self::SpdxYaml => "spdx+yaml",
            Self::SyftJson => "syft+json",
        };
        f.write_str(s)
    }
}

/// Relation from one descriptor to another descriptor or to a whole group.
///
/// Links are identifiers, never in-memory references; the file stays
/// self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Link {
    #[default]
    None,
    Object(u32),
    Group(u32),
}

impl Link {
    pub(crate) fn to_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Object(id) => id,
            Self::Group(gid) => GROUP_FLAG | gid,
        }
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Self::None
        } else if raw & GROUP_FLAG != 0 {
            Self::Group(raw & !GROUP_FLAG)
        } else {
            Self::Object(raw)
        }
    }
}

/// Partition extra metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub fs_type: FsType,
    pub part_type: PartType,
    pub(crate) arch: String,
}

impl PartitionMetadata {
    /// Architecture name of the partition content.
    pub fn arch(&self) -> &str {
        arch::arch_name(&self.arch)
    }
}

/// Signature extra metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMetadata {
    pub hash_type: HashType,
    pub fingerprint: [u8; 20],
}

/// Cryptographic message extra metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoMessageMetadata {
    pub format: CryptoFormat,
    pub kind: MessageKind,
}

/// A live descriptor: the metadata record of one data object.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub(crate) data_type: DataType,
    pub(crate) id: u32,
    pub(crate) group_id: u32,
    pub(crate) linked_id: u32,
    pub(crate) offset: i64,
    pub(crate) size: i64,
    pub(crate) size_with_padding: i64,
    pub(crate) created_at: i64,
    pub(crate) modified_at: i64,
    pub(crate) uid: i64,
    pub(crate) gid: i64,
    pub(crate) name: String,
    pub(crate) extra: [u8; EXTRA_LEN],
}

impl Descriptor {
    /// Content type of the object.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Unique object id, 1-based.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Group id, or 0 when the object is ungrouped.
    pub fn group_id(&self) -> u32 {
        self.group_id & !GROUP_FLAG
    }

    /// Link to another descriptor or group.
    pub fn link(&self) -> Link {
        Link::from_raw(self.linked_id)
    }

    /// Offset of the object bytes from the start of the file.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Size of the object bytes.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Creation time, in seconds since the Unix epoch.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Last modification time, in seconds since the Unix epoch.
    pub fn modified_at(&self) -> i64 {
        self.modified_at
    }

    /// Object name, possibly empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Partition metadata from the extra area.
    ///
    /// Fails with [`SifError::UnexpectedDataType`] when the object is not a
    /// partition.
    pub fn partition_metadata(&self) -> Result<PartitionMetadata> {
        self.expect_type(DataType::Partition)?;

        let fs_type = FsType::from_u32(get_u32(&self.extra, 0))
            .ok_or(SifError::InvalidExtra("filesystem type"))?;
        let part_type = PartType::from_u32(get_u32(&self.extra, 4))
            .ok_or(SifError::InvalidExtra("partition type"))?;

        Ok(PartitionMetadata {
            fs_type,
            part_type,
            arch: fixed_str(&self.extra[8..11]),
        })
    }

    /// Signature metadata from the extra area.
    pub fn signature_metadata(&self) -> Result<SignatureMetadata> {
        self.expect_type(DataType::Signature)?;

        let hash_type = HashType::from_u32(get_u32(&self.extra, 0))
            .ok_or(SifError::InvalidExtra("hash type"))?;
        let mut fingerprint = [0u8; 20];
        fingerprint.copy_from_slice(&self.extra[4..24]);

        Ok(SignatureMetadata {
            hash_type,
            fingerprint,
        })
    }

    /// Cryptographic message metadata from the extra area.
    pub fn crypto_message_metadata(&self) -> Result<CryptoMessageMetadata> {
        self.expect_type(DataType::CryptoMessage)?;

        let format = CryptoFormat::from_u32(get_u32(&self.extra, 0))
            .ok_or(SifError::InvalidExtra("crypto message format"))?;
        let kind = MessageKind::from_u32(get_u32(&self.extra, 4))
            .ok_or(SifError::InvalidExtra("crypto message kind"))?;

        Ok(CryptoMessageMetadata { format, kind })
    }

    /// SBOM document format from the extra area.
    pub fn sbom_format(&self) -> Result<SbomFormat> {
        self.expect_type(DataType::Sbom)?;

        SbomFormat::from_u32(get_u32(&self.extra, 0))
            .ok_or(SifError::InvalidExtra("SBOM format"))
    }

    fn expect_type(&self, want: DataType) -> Result<()> {
        if self.data_type != want {
            return Err(SifError::UnexpectedDataType {
                got: self.data_type,
                want,
            });
        }
        Ok(())
    }

    /// Serialize the descriptor into a full slot, used flag set.
    pub(crate) fn to_bytes(&self) -> Result<[u8; DESCRIPTOR_SLOT_LEN]> {
        let mut buf = [0u8; DESCRIPTOR_SLOT_LEN];

        buf[0..4].copy_from_slice(&(self.data_type as u32).to_le_bytes());
        buf[4] = 1;
        buf[5..9].copy_from_slice(&self.id.to_le_bytes());
        buf[9..13].copy_from_slice(&self.group_id.to_le_bytes());
        buf[13..17].copy_from_slice(&self.linked_id.to_le_bytes());
        buf[17..25].copy_from_slice(&self.offset.to_le_bytes());
        buf[25..33].copy_from_slice(&self.size.to_le_bytes());
        buf[33..41].copy_from_slice(&self.size_with_padding.to_le_bytes());
        buf[41..49].copy_from_slice(&self.created_at.to_le_bytes());
        buf[49..57].copy_from_slice(&self.modified_at.to_le_bytes());
        buf[57..65].copy_from_slice(&self.uid.to_le_bytes());
        buf[65..73].copy_from_slice(&self.gid.to_le_bytes());
        put_fixed_str(&mut buf[73..201], &self.name, "name")?;
        buf[201..585].copy_from_slice(&self.extra);

        Ok(buf)
    }

    /// Deserialize one slot. Returns `None` for a free slot.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.len() < DESCRIPTOR_LEN {
            return Err(SifError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "insufficient bytes for descriptor",
            )));
        }

        if bytes[4] == 0 {
            return Ok(None);
        }

        let raw_type = get_u32(bytes, 0);
        let data_type =
            DataType::from_u32(raw_type).ok_or(SifError::UnknownDataType(raw_type))?;

        let mut extra = [0u8; EXTRA_LEN];
        extra.copy_from_slice(&bytes[201..585]);

        Ok(Some(Descriptor {
            data_type,
            id: get_u32(bytes, 5),
            group_id: get_u32(bytes, 9),
            linked_id: get_u32(bytes, 13),
            offset: get_i64(bytes, 17),
            size: get_i64(bytes, 25),
            size_with_padding: get_i64(bytes, 33),
            created_at: get_i64(bytes, 41),
            modified_at: get_i64(bytes, 49),
            uid: get_i64(bytes, 57),
            gid: get_i64(bytes, 65),
            name: fixed_str(&bytes[73..201]),
            extra,
        }))
    }
}

/// Build a partition extra area. The architecture must be a known name.
pub(crate) fn partition_extra(
    fs_type: FsType,
    part_type: PartType,
    arch_name: &str,
) -> Result<[u8; EXTRA_LEN]> {
    let code = arch::arch_code(arch_name);
    if code == arch::ARCH_UNKNOWN {
        return Err(SifError::InvalidExtra("architecture"));
    }

    let mut extra = [0u8; EXTRA_LEN];
    extra[0..4].copy_from_slice(&(fs_type as u32).to_le_bytes());
    extra[4..8].copy_from_slice(&(part_type as u32).to_le_bytes());
    put_fixed_str(&mut extra[8..11], code, "architecture")?;
    Ok(extra)
}

/// Build a signature extra area.
pub(crate) fn signature_extra(hash_type: HashType, fingerprint: [u8; 20]) -> [u8; EXTRA_LEN] {
    let mut extra = [0u8; EXTRA_LEN];
    extra[0..4].copy_from_slice(&(hash_type as u32).to_le_bytes());
    extra[4..24].copy_from_slice(&fingerprint);
    extra
}

/// Build a cryptographic message extra area.
pub(crate) fn crypto_message_extra(format: CryptoFormat, kind: MessageKind) -> [u8; EXTRA_LEN] {
    let mut extra = [0u8; EXTRA_LEN];
    extra[0..4].copy_from_slice(&(format as u32).to_le_bytes());
    extra[4..8].copy_from_slice(&(kind as u32).to_le_bytes());
    extra
}

/// Build an SBOM extra area.
pub(crate) fn sbom_extra(format: SbomFormat) -> [u8; EXTRA_LEN] {
    let mut extra = [0u8; EXTRA_LEN];
    extra[0..4].copy_from_slice(&(format as u32).to_le_bytes());
    extra
}
