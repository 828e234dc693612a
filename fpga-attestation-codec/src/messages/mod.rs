use crate::{
    endianness::Actor,
    error::{CodecError, Result},
};

pub mod device_header;
pub mod get_measurement;
pub mod psg_signature;
pub mod sigma_enc;
pub mod sigma_m1;
pub mod sigma_m2;
pub mod sigma_m3;
pub mod spdm_certificate;

/// A message with a byte-exact wire layout.
///
/// `signable_bytes` and `macable_bytes` are always produced in the
/// device-native layout, since that is what the device signed or MACed.
pub trait WireMessage: Sized {
    /// Parses a complete message. The buffer must be consumed exactly.
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self>;

    /// Serializes the message in the layout of `actor`.
    fn build(&self, actor: Actor) -> Result<Vec<u8>>;

    /// Fields covered by the device's asymmetric signature.
    fn signable_bytes(&self) -> Result<Vec<u8>>;

    /// Fields covered by the session MAC.
    fn macable_bytes(&self) -> Result<Vec<u8>>;
}

pub mod field_size {
    /// The size of the reserved header preceding every command or response.
    pub const RESERVED_HEADER: usize = 4;
    /// The size of a message magic.
    pub const MAGIC: usize = 4;
    /// The size of the SDM session identifier.
    pub const SDM_SESSION_ID: usize = 4;
    /// The size of the device unique identifier.
    pub const DEVICE_UNIQUE_ID: usize = 8;
    /// The size of the ROM version number.
    pub const ROM_VERSION_NUM: usize = 4;
    /// The size of the SDM firmware build identifier.
    pub const SDM_FW_BUILD_ID: usize = 28;
    /// The size of the SDM firmware security version number.
    pub const SDM_FW_SECURITY_VERSION_NUM: usize = 4;
    /// The size of the reserved span following the device family fuse map.
    pub const FUSE_MAP_RESERVED: usize = 3;
    /// The size of an uncompressed SECP384R1 Diffie-Hellman public key.
    pub const DH_PUB_KEY: usize = 96;
    /// The size of the CMF descriptor hash.
    pub const CMF_DESCRIPTOR_HASH: usize = 48;
    /// The size of a SHA-384 HMAC.
    pub const SHA_384_MAC: usize = 48;
    /// The size of a SHA-256 HMAC.
    pub const SHA_256_MAC: usize = 32;
}

/// Device family advertised in the public fuse map byte.
///
/// The family determines how many public efuse bytes follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceFamily {
    #[default]
    S10,
    Fm568,
}

impl DeviceFamily {
    pub fn efuse_values_len(self) -> usize {
        match self {
            Self::S10 => 256,
            Self::Fm568 => 448,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::S10 => 0,
            Self::Fm568 => 1,
        }
    }
}

impl TryFrom<u8> for DeviceFamily {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::S10),
            1 => Ok(Self::Fm568),
            _ => Err(CodecError::UnsupportedDeviceFamily { value }),
        }
    }
}

/// Checks a field's length before it is serialized.
pub(crate) fn check_len(field: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(CodecError::InvalidFieldLength {
            field,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
