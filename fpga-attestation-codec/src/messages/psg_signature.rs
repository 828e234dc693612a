use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::{CodecError, Result},
    messages::{check_len, device_header::read_u32, WireMessage},
};

/// Magic opening every PSG signature block.
pub const SIGNATURE_MAGIC: u32 = 0x7488_1520;

/// The size of the fixed PSG signature header (magic, sizes, curve magic).
pub const SIGNATURE_HEADER_SIZE: usize = 16;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::PsgSignatureMagic, SwapRule::Convert),
    (Field::PsgSignatureSizeR, SwapRule::Convert),
    (Field::PsgSignatureSizeS, SwapRule::Convert),
    (Field::PsgSignatureCurveMagic, SwapRule::Convert),
    (Field::PsgSignatureR, SwapRule::None),
    (Field::PsgSignatureS, SwapRule::None),
];

/// Curve the signature components belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsgCurve {
    Secp256r1,
    #[default]
    Secp384r1,
}

impl PsgCurve {
    pub fn magic(self) -> u32 {
        match self {
            Self::Secp256r1 => 0x3054_8820,
            Self::Secp384r1 => 0x5471_3230,
        }
    }

    /// Size of each of the `r` and `s` components.
    pub fn component_size(self) -> usize {
        match self {
            Self::Secp256r1 => 32,
            Self::Secp384r1 => 48,
        }
    }

    pub fn from_magic(magic: u32) -> Result<Self> {
        [Self::Secp256r1, Self::Secp384r1]
            .into_iter()
            .find(|curve| curve.magic() == magic)
            .ok_or(CodecError::UnsupportedSignatureCurve { magic })
    }
}

/// ECDSA signature block as emitted by the secure device manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsgSignature {
    pub curve: PsgCurve,
    pub size_r: u32,
    pub size_s: u32,
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

impl Default for PsgSignature {
    fn default() -> Self {
        Self::empty(PsgCurve::default())
    }
}

impl PsgSignature {
    /// A zeroed signature for `curve`.
    pub fn empty(curve: PsgCurve) -> Self {
        Self {
            curve,
            size_r: 0,
            size_s: 0,
            r: vec![0; curve.component_size()],
            s: vec![0; curve.component_size()],
        }
    }

    /// Total encoded size of the block.
    pub fn encoded_len(&self) -> usize {
        SIGNATURE_HEADER_SIZE + 2 * self.curve.component_size()
    }

    /// Concatenated `r || s`, the form the signature verifier consumes.
    pub fn raw_signature(&self) -> Vec<u8> {
        [self.r.as_slice(), self.s.as_slice()].concat()
    }

    /// Reads a signature block embedded in a larger message.
    pub fn read(cursor: &mut ByteCursor<'_>, actor: Actor) -> Result<Self> {
        let magic = read_u32(cursor, ENDIANNESS, Field::PsgSignatureMagic, actor)?;
        if magic != SIGNATURE_MAGIC {
            tracing::error!(
                expected = SIGNATURE_MAGIC,
                actual = magic,
                "Invalid PSG signature magic"
            );
            return Err(CodecError::InvalidSignatureMagic {
                expected: SIGNATURE_MAGIC,
                actual: magic,
            });
        }
        let size_r = read_u32(cursor, ENDIANNESS, Field::PsgSignatureSizeR, actor)?;
        let size_s = read_u32(cursor, ENDIANNESS, Field::PsgSignatureSizeS, actor)?;
        let curve_magic = read_u32(cursor, ENDIANNESS, Field::PsgSignatureCurveMagic, actor)?;
        let curve = PsgCurve::from_magic(curve_magic)?;
        let r = convert(
            ENDIANNESS,
            Field::PsgSignatureR,
            cursor.read_slice(curve.component_size())?,
            actor,
        )?;
        let s = convert(
            ENDIANNESS,
            Field::PsgSignatureS,
            cursor.read_slice(curve.component_size())?,
            actor,
        )?;
        Ok(Self {
            curve,
            size_r,
            size_s,
            r,
            s,
        })
    }

    /// Encodes the signature block in the layout of `actor`.
    pub fn to_bytes(&self, actor: Actor) -> Result<Vec<u8>> {
        check_len("signature_r", &self.r, self.curve.component_size())?;
        check_len("signature_s", &self.s, self.curve.component_size())?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer
            .put(Field::PsgSignatureMagic, &SIGNATURE_MAGIC.to_be_bytes())?
            .put(Field::PsgSignatureSizeR, &self.size_r.to_be_bytes())?
            .put(Field::PsgSignatureSizeS, &self.size_s.to_be_bytes())?
            .put(Field::PsgSignatureCurveMagic, &self.curve.magic().to_be_bytes())?
            .put(Field::PsgSignatureR, &self.r)?
            .put(Field::PsgSignatureS, &self.s)?;
        Ok(writer.finish())
    }
}

impl WireMessage for PsgSignature {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let signature = Self::read(&mut cursor, actor)?;
        cursor.read_exact_remaining(0)?;
        Ok(signature)
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        self.to_bytes(actor)
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
