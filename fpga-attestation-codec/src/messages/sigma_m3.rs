use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::Result,
    messages::{
        check_len, device_header::read_u32, field_size, psg_signature::PsgSignature, WireMessage,
    },
};

/// Magic of a SIGMA M3 message.
pub const SIGMA_M3_MAGIC: u32 = 0x2F8A_45C1;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::SigmaM3Magic, SwapRule::Convert),
    (Field::SigmaM3SdmSessionId, SwapRule::Convert),
    (Field::SigmaM3BkpsDhPubKey, SwapRule::None),
    (Field::SigmaM3DeviceDhPubKey, SwapRule::None),
    (Field::SigmaM3Mac, SwapRule::None),
];

/// Final message of the SIGMA key exchange, sent by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigmaM3Message {
    pub reserved_header: Vec<u8>,
    pub magic: u32,
    pub sdm_session_id: u32,
    pub bkps_dh_pub_key: Vec<u8>,
    pub device_dh_pub_key: Vec<u8>,
    pub signature: PsgSignature,
    pub mac: Vec<u8>,
}

impl Default for SigmaM3Message {
    fn default() -> Self {
        Self {
            reserved_header: vec![0; field_size::RESERVED_HEADER],
            magic: SIGMA_M3_MAGIC,
            sdm_session_id: 0,
            bkps_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            device_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            signature: PsgSignature::default(),
            mac: vec![0; field_size::SHA_384_MAC],
        }
    }
}

impl SigmaM3Message {
    fn write_signed_part(&self, writer: &mut FieldWriter) -> Result<()> {
        check_len(
            "bkps_dh_pub_key",
            &self.bkps_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        check_len(
            "device_dh_pub_key",
            &self.device_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        writer
            .put(Field::SigmaM3Magic, &self.magic.to_be_bytes())?
            .put(Field::SigmaM3SdmSessionId, &self.sdm_session_id.to_be_bytes())?
            .put(Field::SigmaM3BkpsDhPubKey, &self.bkps_dh_pub_key)?
            .put(Field::SigmaM3DeviceDhPubKey, &self.device_dh_pub_key)?;
        Ok(())
    }
}

impl WireMessage for SigmaM3Message {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let reserved_header = cursor.read_bytes(field_size::RESERVED_HEADER)?;
        let magic = read_u32(&mut cursor, ENDIANNESS, Field::SigmaM3Magic, actor)?;
        let sdm_session_id = read_u32(&mut cursor, ENDIANNESS, Field::SigmaM3SdmSessionId, actor)?;
        let bkps_dh_pub_key = convert(
            ENDIANNESS,
            Field::SigmaM3BkpsDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let device_dh_pub_key = convert(
            ENDIANNESS,
            Field::SigmaM3DeviceDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let signature = PsgSignature::read(&mut cursor, actor)?;
        let mac = convert(
            ENDIANNESS,
            Field::SigmaM3Mac,
            &cursor.read_exact_remaining(field_size::SHA_384_MAC)?,
            actor,
        )?;
        Ok(Self {
            reserved_header,
            magic,
            sdm_session_id,
            bkps_dh_pub_key,
            device_dh_pub_key,
            signature,
            mac,
        })
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        check_len(
            "reserved_header",
            &self.reserved_header,
            field_size::RESERVED_HEADER,
        )?;
        check_len("mac", &self.mac, field_size::SHA_384_MAC)?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer.put_raw(&self.reserved_header);
        self.write_signed_part(&mut writer)?;
        writer
            .put_raw(&self.signature.to_bytes(actor)?)
            .put(Field::SigmaM3Mac, &self.mac)?;
        Ok(writer.finish())
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = FieldWriter::new(ENDIANNESS, Actor::Firmware);
        self.write_signed_part(&mut writer)?;
        Ok(writer.finish())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        let mut data = self.signable_bytes()?;
        data.extend_from_slice(&self.signature.to_bytes(Actor::Firmware)?);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn test_layout_size() {
        let bytes = SigmaM3Message::default().build(Actor::Firmware).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 4 + 96 + 96 + 112 + 48);
    }

    #[test]
    fn test_mac_must_fill_the_rest() {
        let mut bytes = SigmaM3Message::default().build(Actor::Firmware).unwrap();
        bytes.extend_from_slice(&[0; 2]);
        assert_eq!(
            SigmaM3Message::parse(&bytes, Actor::Firmware).unwrap_err(),
            CodecError::RemainingLengthMismatch {
                remaining: 50,
                expected: 48
            }
        );
    }

    #[test]
    fn test_session_id_round_trip() {
        let message = SigmaM3Message {
            sdm_session_id: 0x0102_0304,
            ..Default::default()
        };
        let bytes = message.build(Actor::Firmware).unwrap();
        assert_eq!(&bytes[8..12], &[4, 3, 2, 1]);
        assert_eq!(SigmaM3Message::parse(&bytes, Actor::Firmware).unwrap(), message);
    }
}
