use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::Result,
    messages::{
        check_len,
        device_header::{DeviceHeader, HeaderFields},
        field_size,
        psg_signature::PsgSignature,
        WireMessage,
    },
};

/// Magic of a SIGMA M2 message.
pub const SIGMA_M2_MAGIC: u32 = 0xFC06_A385;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::SigmaM2Magic, SwapRule::Convert),
    (Field::SigmaM2SdmSessionId, SwapRule::Convert),
    (Field::SigmaM2DeviceUniqueId, SwapRule::None),
    (Field::SigmaM2RomVersionNum, SwapRule::Convert),
    (Field::SigmaM2SdmFwBuildId, SwapRule::None),
    (Field::SigmaM2SdmFwSecurityVersionNum, SwapRule::Convert),
    (Field::SigmaM2PublicEfuseValues, SwapRule::Swap32),
    (Field::SigmaM2DeviceDhPubKey, SwapRule::None),
    (Field::SigmaM2BkpsDhPubKey, SwapRule::None),
    (Field::SigmaM2Mac, SwapRule::None),
];

const HEADER_FIELDS: HeaderFields = HeaderFields {
    magic: Field::SigmaM2Magic,
    sdm_session_id: Field::SigmaM2SdmSessionId,
    device_unique_id: Field::SigmaM2DeviceUniqueId,
    rom_version_num: Field::SigmaM2RomVersionNum,
    sdm_fw_build_id: Field::SigmaM2SdmFwBuildId,
    sdm_fw_security_version_num: Field::SigmaM2SdmFwSecurityVersionNum,
    public_efuse_values: Field::SigmaM2PublicEfuseValues,
};

/// Device answer to SIGMA M1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigmaM2Message {
    pub header: DeviceHeader,
    pub device_dh_pub_key: Vec<u8>,
    pub bkps_dh_pub_key: Vec<u8>,
    pub signature: PsgSignature,
    pub mac: Vec<u8>,
}

impl Default for SigmaM2Message {
    fn default() -> Self {
        Self {
            header: DeviceHeader::new(SIGMA_M2_MAGIC),
            device_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            bkps_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            signature: PsgSignature::default(),
            mac: vec![0; field_size::SHA_384_MAC],
        }
    }
}

impl SigmaM2Message {
    fn write_signed_part(&self, writer: &mut FieldWriter) -> Result<()> {
        check_len(
            "device_dh_pub_key",
            &self.device_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        check_len(
            "bkps_dh_pub_key",
            &self.bkps_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        self.header.write_signed_part(writer, &HEADER_FIELDS)?;
        writer
            .put(Field::SigmaM2DeviceDhPubKey, &self.device_dh_pub_key)?
            .put(Field::SigmaM2BkpsDhPubKey, &self.bkps_dh_pub_key)?;
        Ok(())
    }
}

impl WireMessage for SigmaM2Message {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = DeviceHeader::read(&mut cursor, ENDIANNESS, &HEADER_FIELDS, actor)?;
        let device_dh_pub_key = convert(
            ENDIANNESS,
            Field::SigmaM2DeviceDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let bkps_dh_pub_key = convert(
            ENDIANNESS,
            Field::SigmaM2BkpsDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let signature = PsgSignature::read(&mut cursor, actor)?;
        let mac = convert(
            ENDIANNESS,
            Field::SigmaM2Mac,
            &cursor.read_exact_remaining(field_size::SHA_384_MAC)?,
            actor,
        )?;
        Ok(Self {
            header,
            device_dh_pub_key,
            bkps_dh_pub_key,
            signature,
            mac,
        })
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        self.header.check_reserved_header()?;
        check_len("mac", &self.mac, field_size::SHA_384_MAC)?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer.put_raw(&self.header.reserved_header);
        self.write_signed_part(&mut writer)?;
        writer
            .put_raw(&self.signature.to_bytes(actor)?)
            .put(Field::SigmaM2Mac, &self.mac)?;
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

    #[test]
    fn test_magic_on_the_wire() {
        let bytes = SigmaM2Message::default().build(Actor::Firmware).unwrap();
        assert_eq!(&bytes[4..8], &[0x85, 0xA3, 0x06, 0xFC]);
        let service = SigmaM2Message::default().build(Actor::Service).unwrap();
        assert_eq!(&service[4..8], &[0xFC, 0x06, 0xA3, 0x85]);
    }

    #[test]
    fn test_efuse_values_are_swapped_per_word() {
        let mut message = SigmaM2Message::default();
        message.header.public_efuse_values[..4].copy_from_slice(&[1, 2, 3, 4]);
        let bytes = message.build(Actor::Firmware).unwrap();
        let efuse_offset = 4 + 4 + 4 + 8 + 4 + 28 + 4 + 1 + 3;
        assert_eq!(&bytes[efuse_offset..efuse_offset + 4], &[4, 3, 2, 1]);
        assert_eq!(SigmaM2Message::parse(&bytes, Actor::Firmware).unwrap(), message);
    }

    #[test]
    fn test_signable_and_macable_spans() {
        let message = SigmaM2Message::default();
        let wire = message.build(Actor::Firmware).unwrap();
        let signature_len = message.signature.encoded_len();
        let mac_start = wire.len() - field_size::SHA_384_MAC;
        assert_eq!(
            message.signable_bytes().unwrap().as_slice(),
            &wire[4..mac_start - signature_len]
        );
        assert_eq!(message.macable_bytes().unwrap().as_slice(), &wire[4..mac_start]);
    }
}
