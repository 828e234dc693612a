use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::{CodecError, Result},
    messages::{check_len, device_header::read_u32, field_size, WireMessage},
};

/// Magic of a SIGMA_ENC message and its response.
pub const SIGMA_ENC_MAGIC: u32 = 0x5E1D_A39B;

/// The size of the AES-CTR initial IV.
pub const INITIAL_IV_SIZE: usize = 16;

const RESERVED1_SIZE: usize = 8;
const RESERVED2_SIZE: usize = 3;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::SigmaEncMagic, SwapRule::Convert),
    (Field::SigmaEncSdmSessionId, SwapRule::Convert),
    (Field::SigmaEncMessageCounter, SwapRule::Convert),
    (Field::SigmaEncPayloadLen, SwapRule::Convert),
    (Field::SigmaEncInitialIv, SwapRule::None),
    (Field::SigmaEncPayload, SwapRule::None),
    (Field::SigmaEncMac, SwapRule::None),
];

/// Encrypted command envelope exchanged inside an established SIGMA session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigmaEncMessage {
    pub reserved_header: Vec<u8>,
    pub magic: u32,
    pub sdm_session_id: u32,
    pub message_counter: u32,
    pub reserved1: Vec<u8>,
    pub initial_iv: Vec<u8>,
    pub number_of_padding_bytes: u8,
    pub reserved2: Vec<u8>,
    /// Ciphertext; its length is the payload length field.
    pub encrypted_payload: Vec<u8>,
    pub mac: Vec<u8>,
}

impl Default for SigmaEncMessage {
    fn default() -> Self {
        Self {
            reserved_header: vec![0; field_size::RESERVED_HEADER],
            magic: SIGMA_ENC_MAGIC,
            sdm_session_id: 0,
            message_counter: 0,
            reserved1: vec![0; RESERVED1_SIZE],
            initial_iv: vec![0; INITIAL_IV_SIZE],
            number_of_padding_bytes: 0,
            reserved2: vec![0; RESERVED2_SIZE],
            encrypted_payload: Vec::new(),
            mac: vec![0; field_size::SHA_256_MAC],
        }
    }
}

impl SigmaEncMessage {
    /// Reads everything after `sdm_session_id`.
    fn read_body(
        cursor: &mut ByteCursor<'_>,
        reserved_header: Vec<u8>,
        magic: u32,
        sdm_session_id: u32,
        actor: Actor,
    ) -> Result<Self> {
        let message_counter = read_u32(cursor, ENDIANNESS, Field::SigmaEncMessageCounter, actor)?;
        let reserved1 = cursor.read_bytes(RESERVED1_SIZE)?;
        let payload_len = read_u32(cursor, ENDIANNESS, Field::SigmaEncPayloadLen, actor)?;
        let initial_iv = convert(
            ENDIANNESS,
            Field::SigmaEncInitialIv,
            cursor.read_slice(INITIAL_IV_SIZE)?,
            actor,
        )?;
        let number_of_padding_bytes = cursor.read_u8()?;
        let reserved2 = cursor.read_bytes(RESERVED2_SIZE)?;
        let encrypted_payload = convert(
            ENDIANNESS,
            Field::SigmaEncPayload,
            cursor.read_slice(payload_len as usize)?,
            actor,
        )?;
        let mac = convert(
            ENDIANNESS,
            Field::SigmaEncMac,
            &cursor.read_exact_remaining(field_size::SHA_256_MAC)?,
            actor,
        )?;
        Ok(Self {
            reserved_header,
            magic,
            sdm_session_id,
            message_counter,
            reserved1,
            initial_iv,
            number_of_padding_bytes,
            reserved2,
            encrypted_payload,
            mac,
        })
    }

    fn write_macable_part(&self, writer: &mut FieldWriter) -> Result<()> {
        check_len("reserved1", &self.reserved1, RESERVED1_SIZE)?;
        check_len("initial_iv", &self.initial_iv, INITIAL_IV_SIZE)?;
        check_len("reserved2", &self.reserved2, RESERVED2_SIZE)?;
        let payload_len = u32::try_from(self.encrypted_payload.len()).map_err(|_| {
            CodecError::InvalidFieldLength {
                field: "encrypted_payload",
                expected: u32::MAX as usize,
                actual: self.encrypted_payload.len(),
            }
        })?;
        writer
            .put(Field::SigmaEncMagic, &self.magic.to_be_bytes())?
            .put(Field::SigmaEncSdmSessionId, &self.sdm_session_id.to_be_bytes())?
            .put(
                Field::SigmaEncMessageCounter,
                &self.message_counter.to_be_bytes(),
            )?
            .put_raw(&self.reserved1)
            .put(Field::SigmaEncPayloadLen, &payload_len.to_be_bytes())?
            .put(Field::SigmaEncInitialIv, &self.initial_iv)?
            .put_raw(&[self.number_of_padding_bytes])
            .put_raw(&self.reserved2)
            .put(Field::SigmaEncPayload, &self.encrypted_payload)?;
        Ok(())
    }
}

impl WireMessage for SigmaEncMessage {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let reserved_header = cursor.read_bytes(field_size::RESERVED_HEADER)?;
        let magic = read_u32(&mut cursor, ENDIANNESS, Field::SigmaEncMagic, actor)?;
        let sdm_session_id = read_u32(&mut cursor, ENDIANNESS, Field::SigmaEncSdmSessionId, actor)?;
        Self::read_body(&mut cursor, reserved_header, magic, sdm_session_id, actor)
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        check_len(
            "reserved_header",
            &self.reserved_header,
            field_size::RESERVED_HEADER,
        )?;
        check_len("mac", &self.mac, field_size::SHA_256_MAC)?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer.put_raw(&self.reserved_header);
        self.write_macable_part(&mut writer)?;
        writer.put(Field::SigmaEncMac, &self.mac)?;
        Ok(writer.finish())
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = FieldWriter::new(ENDIANNESS, Actor::Firmware);
        self.write_macable_part(&mut writer)?;
        Ok(writer.finish())
    }
}

/// Device response to a SIGMA_ENC message.
///
/// A device that has nothing to return answers with the bare header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigmaEncResponse {
    HeaderOnly {
        reserved_header: Vec<u8>,
        magic: u32,
        sdm_session_id: u32,
    },
    WithEncryptedResponse(SigmaEncMessage),
}

impl SigmaEncResponse {
    pub fn is_header_only(&self) -> bool {
        matches!(self, Self::HeaderOnly { .. })
    }

    pub fn sdm_session_id(&self) -> u32 {
        match self {
            Self::HeaderOnly { sdm_session_id, .. } => *sdm_session_id,
            Self::WithEncryptedResponse(message) => message.sdm_session_id,
        }
    }
}

impl WireMessage for SigmaEncResponse {
    #[tracing::instrument(level = "debug", name = "parse_sigma_enc_response", skip_all)]
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let reserved_header = cursor.read_bytes(field_size::RESERVED_HEADER)?;
        let magic = read_u32(&mut cursor, ENDIANNESS, Field::SigmaEncMagic, actor)?;
        let sdm_session_id = read_u32(&mut cursor, ENDIANNESS, Field::SigmaEncSdmSessionId, actor)?;
        if !cursor.has_remaining() {
            tracing::debug!(sdm_session_id, "SIGMA_ENC response carries no payload");
            return Ok(Self::HeaderOnly {
                reserved_header,
                magic,
                sdm_session_id,
            });
        }
        SigmaEncMessage::read_body(&mut cursor, reserved_header, magic, sdm_session_id, actor)
            .map(Self::WithEncryptedResponse)
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        match self {
            Self::HeaderOnly {
                reserved_header,
                magic,
                sdm_session_id,
            } => {
                check_len("reserved_header", reserved_header, field_size::RESERVED_HEADER)?;
                let mut writer = FieldWriter::new(ENDIANNESS, actor);
                writer
                    .put_raw(reserved_header)
                    .put(Field::SigmaEncMagic, &magic.to_be_bytes())?
                    .put(Field::SigmaEncSdmSessionId, &sdm_session_id.to_be_bytes())?;
                Ok(writer.finish())
            }
            Self::WithEncryptedResponse(message) => message.build(actor),
        }
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::HeaderOnly { .. } => Ok(Vec::new()),
            Self::WithEncryptedResponse(message) => message.macable_bytes(),
        }
    }
}
