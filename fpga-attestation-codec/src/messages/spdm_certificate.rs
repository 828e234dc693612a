use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::{CodecError, Result},
    messages::{check_len, device_header::read_u16, WireMessage},
};

/// The size of the certificate chain hash (SHA-384).
pub const CERT_CHAIN_HASH_SIZE: usize = 48;

/// totalLen, reserved and hash.
pub const SPDM_CERTIFICATE_HEADER_SIZE: usize = 2 + 2 + CERT_CHAIN_HASH_SIZE;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::SpdmCertificateTotalLen, SwapRule::Convert),
    (Field::SpdmCertificateChainHash, SwapRule::None),
    (Field::SpdmCertificateChain, SwapRule::None),
];

/// Certificate chain returned by an SPDM GET_CERTIFICATE exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpdmCertificateResponse {
    pub reserved: Vec<u8>,
    pub cert_chain_hash: Vec<u8>,
    /// Concatenated DER certificates, root first.
    pub cert_chain: Vec<u8>,
}

impl Default for SpdmCertificateResponse {
    fn default() -> Self {
        Self {
            reserved: vec![0; 2],
            cert_chain_hash: vec![0; CERT_CHAIN_HASH_SIZE],
            cert_chain: Vec::new(),
        }
    }
}

impl SpdmCertificateResponse {
    pub fn total_len(&self) -> usize {
        SPDM_CERTIFICATE_HEADER_SIZE + self.cert_chain.len()
    }
}

impl WireMessage for SpdmCertificateResponse {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let total_len = read_u16(
            &mut cursor,
            ENDIANNESS,
            Field::SpdmCertificateTotalLen,
            actor,
        )?;
        if usize::from(total_len) != bytes.len() {
            tracing::error!(
                total_len,
                buffer_len = bytes.len(),
                "SPDM certificate length field does not match the response"
            );
            return Err(CodecError::LengthFieldMismatch {
                message: "SPDM certificate total length".to_string(),
                expected: bytes.len(),
                actual: usize::from(total_len),
            });
        }
        let reserved = cursor.read_bytes(2)?;
        let cert_chain_hash = convert(
            ENDIANNESS,
            Field::SpdmCertificateChainHash,
            cursor.read_slice(CERT_CHAIN_HASH_SIZE)?,
            actor,
        )?;
        let cert_chain = convert(
            ENDIANNESS,
            Field::SpdmCertificateChain,
            &cursor.read_rest(),
            actor,
        )?;
        Ok(Self {
            reserved,
            cert_chain_hash,
            cert_chain,
        })
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        check_len("reserved", &self.reserved, 2)?;
        check_len(
            "cert_chain_hash",
            &self.cert_chain_hash,
            CERT_CHAIN_HASH_SIZE,
        )?;
        let total_len =
            u16::try_from(self.total_len()).map_err(|_| CodecError::InvalidFieldLength {
                field: "cert_chain",
                expected: usize::from(u16::MAX) - SPDM_CERTIFICATE_HEADER_SIZE,
                actual: self.cert_chain.len(),
            })?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer
            .put(Field::SpdmCertificateTotalLen, &total_len.to_be_bytes())?
            .put_raw(&self.reserved)
            .put(Field::SpdmCertificateChainHash, &self.cert_chain_hash)?
            .put(Field::SpdmCertificateChain, &self.cert_chain)?;
        Ok(writer.finish())
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
