use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::Result,
    messages::{
        check_len,
        device_header::{read_u16, DeviceHeader, HeaderFields},
        field_size,
        psg_signature::PsgSignature,
        WireMessage,
    },
};

/// Magic of a GET_MEASUREMENT response.
pub const GET_MEASUREMENT_RSP_MAGIC: u32 = 0x8C6F_1A35;

/// The size of the reserved span after the CMF descriptor hash.
pub const RESERVED2_SIZE: usize = 12;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::GetMeasurementMagic, SwapRule::Convert),
    (Field::GetMeasurementSdmSessionId, SwapRule::Convert),
    (Field::GetMeasurementDeviceUniqueId, SwapRule::None),
    (Field::GetMeasurementRomVersionNum, SwapRule::Convert),
    (Field::GetMeasurementSdmFwBuildId, SwapRule::None),
    (Field::GetMeasurementSdmFwSecurityVersionNum, SwapRule::Convert),
    (Field::GetMeasurementPublicEfuseValues, SwapRule::Swap32),
    (Field::GetMeasurementDeviceDhPubKey, SwapRule::None),
    (Field::GetMeasurementVerifierDhPubKey, SwapRule::None),
    (Field::GetMeasurementCmfDescriptorHash, SwapRule::None),
    (Field::GetMeasurementRecordLen, SwapRule::Convert),
    (Field::GetMeasurementMac, SwapRule::None),
];

const HEADER_FIELDS: HeaderFields = HeaderFields {
    magic: Field::GetMeasurementMagic,
    sdm_session_id: Field::GetMeasurementSdmSessionId,
    device_unique_id: Field::GetMeasurementDeviceUniqueId,
    rom_version_num: Field::GetMeasurementRomVersionNum,
    sdm_fw_build_id: Field::GetMeasurementSdmFwBuildId,
    sdm_fw_security_version_num: Field::GetMeasurementSdmFwSecurityVersionNum,
    public_efuse_values: Field::GetMeasurementPublicEfuseValues,
};

/// Signed device response carrying the measurement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMeasurementResponse {
    pub header: DeviceHeader,
    pub device_dh_pub_key: Vec<u8>,
    pub verifier_dh_pub_key: Vec<u8>,
    pub cmf_descriptor_hash: Vec<u8>,
    pub reserved2: Vec<u8>,
    pub number_of_measurement_blocks: u8,
    pub reserved3: u8,
    /// Concatenated measurement blocks; its length is the record length field.
    pub measurement_record: Vec<u8>,
    pub signature: PsgSignature,
    pub mac: Vec<u8>,
}

impl Default for GetMeasurementResponse {
    fn default() -> Self {
        Self {
            header: DeviceHeader::new(GET_MEASUREMENT_RSP_MAGIC),
            device_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            verifier_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            cmf_descriptor_hash: vec![0; field_size::CMF_DESCRIPTOR_HASH],
            reserved2: vec![0; RESERVED2_SIZE],
            number_of_measurement_blocks: 0,
            reserved3: 0,
            measurement_record: Vec::new(),
            signature: PsgSignature::default(),
            mac: vec![0; field_size::SHA_384_MAC],
        }
    }
}

impl GetMeasurementResponse {
    fn write_signed_part(&self, writer: &mut FieldWriter) -> Result<()> {
        check_len(
            "device_dh_pub_key",
            &self.device_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        check_len(
            "verifier_dh_pub_key",
            &self.verifier_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        check_len(
            "cmf_descriptor_hash",
            &self.cmf_descriptor_hash,
            field_size::CMF_DESCRIPTOR_HASH,
        )?;
        check_len("reserved2", &self.reserved2, RESERVED2_SIZE)?;
        let record_len = u16::try_from(self.measurement_record.len()).map_err(|_| {
            crate::error::CodecError::InvalidFieldLength {
                field: "measurement_record",
                expected: usize::from(u16::MAX),
                actual: self.measurement_record.len(),
            }
        })?;
        self.header.write_signed_part(writer, &HEADER_FIELDS)?;
        writer
            .put(Field::GetMeasurementDeviceDhPubKey, &self.device_dh_pub_key)?
            .put(Field::GetMeasurementVerifierDhPubKey, &self.verifier_dh_pub_key)?
            .put(
                Field::GetMeasurementCmfDescriptorHash,
                &self.cmf_descriptor_hash,
            )?
            .put_raw(&self.reserved2)
            .put_raw(&[self.number_of_measurement_blocks, self.reserved3])
            .put(Field::GetMeasurementRecordLen, &record_len.to_be_bytes())?
            .put_raw(&self.measurement_record);
        Ok(())
    }
}

impl WireMessage for GetMeasurementResponse {
    #[tracing::instrument(level = "debug", name = "parse_get_measurement_response", skip_all)]
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = DeviceHeader::read(&mut cursor, ENDIANNESS, &HEADER_FIELDS, actor)?;
        let device_dh_pub_key = convert(
            ENDIANNESS,
            Field::GetMeasurementDeviceDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let verifier_dh_pub_key = convert(
            ENDIANNESS,
            Field::GetMeasurementVerifierDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let cmf_descriptor_hash = convert(
            ENDIANNESS,
            Field::GetMeasurementCmfDescriptorHash,
            cursor.read_slice(field_size::CMF_DESCRIPTOR_HASH)?,
            actor,
        )?;
        let reserved2 = cursor.read_bytes(RESERVED2_SIZE)?;
        let number_of_measurement_blocks = cursor.read_u8()?;
        let reserved3 = cursor.read_u8()?;
        let record_len = read_u16(
            &mut cursor,
            ENDIANNESS,
            Field::GetMeasurementRecordLen,
            actor,
        )?;
        let measurement_record = cursor.read_bytes(usize::from(record_len))?;
        let signature = PsgSignature::read(&mut cursor, actor)?;
        let mac = convert(
            ENDIANNESS,
            Field::GetMeasurementMac,
            &cursor.read_exact_remaining(field_size::SHA_384_MAC)?,
            actor,
        )?;
        tracing::debug!(
            number_of_measurement_blocks,
            record_len,
            "Parsed GET_MEASUREMENT response"
        );
        Ok(Self {
            header,
            device_dh_pub_key,
            verifier_dh_pub_key,
            cmf_descriptor_hash,
            reserved2,
            number_of_measurement_blocks,
            reserved3,
            measurement_record,
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
            .put(Field::GetMeasurementMac, &self.mac)?;
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
    use crate::error::{CodecError, ErrorKind};

    fn sample() -> GetMeasurementResponse {
        let mut response = GetMeasurementResponse::default();
        response.header.sdm_session_id = 1;
        response.number_of_measurement_blocks = 1;
        response.measurement_record = vec![0xA5; 16];
        response
    }

    #[test]
    fn test_default_layout_size() {
        let bytes = GetMeasurementResponse::default()
            .build(Actor::Firmware)
            .unwrap();
        // header, efuses (S10), keys, hash, reserved2, counts and length,
        // signature and mac
        let expected = 4 + 4 + 4 + 8 + 4 + 28 + 4 + 1 + 3 + 256 + 96 + 96 + 48 + 12 + 4
            + 112
            + 48;
        assert_eq!(bytes.len(), expected);
    }

    #[test]
    fn test_record_length_is_little_endian_on_the_wire() {
        let response = sample();
        let bytes = response.build(Actor::Firmware).unwrap();
        let offset = 4 + 4 + 4 + 8 + 4 + 28 + 4 + 1 + 3 + 256 + 96 + 96 + 48 + 12 + 2;
        assert_eq!(&bytes[offset..offset + 2], &[16, 0]);
        assert_eq!(&bytes[4..8], &GET_MEASUREMENT_RSP_MAGIC.to_le_bytes());
    }

    #[test]
    fn test_trailing_byte_is_rejected() {
        let mut bytes = sample().build(Actor::Firmware).unwrap();
        bytes.push(0);
        let err = GetMeasurementResponse::parse(&bytes, Actor::Firmware).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Buffer);
        assert!(matches!(err, CodecError::RemainingLengthMismatch { .. }));
    }

    #[test]
    fn test_truncated_mac_is_rejected() {
        let bytes = sample().build(Actor::Firmware).unwrap();
        let err =
            GetMeasurementResponse::parse(&bytes[..bytes.len() - 1], Actor::Firmware).unwrap_err();
        assert_eq!(
            err,
            CodecError::RemainingLengthMismatch {
                remaining: 47,
                expected: 48
            }
        );
    }

    #[test]
    fn test_record_length_beyond_buffer_is_rejected() {
        let bytes = sample().build(Actor::Firmware).unwrap();
        let record_len_offset = 4 + 4 + 4 + 8 + 4 + 28 + 4 + 1 + 3 + 256 + 96 + 96 + 48 + 12 + 2;
        let mut truncated = bytes[..record_len_offset + 2].to_vec();
        truncated.extend_from_slice(&[0xA5; 4]);
        assert!(matches!(
            GetMeasurementResponse::parse(&truncated, Actor::Firmware),
            Err(CodecError::BufferUnderflow {
                remaining: 4,
                requested: 16
            })
        ));
    }

    #[test]
    fn test_unknown_device_family_is_structural() {
        let mut bytes = sample().build(Actor::Firmware).unwrap();
        bytes[4 + 4 + 4 + 8 + 4 + 28 + 4] = 7;
        let err = GetMeasurementResponse::parse(&bytes, Actor::Firmware).unwrap_err();
        assert_eq!(err, CodecError::UnsupportedDeviceFamily { value: 7 });
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_signable_excludes_reserved_header_and_signature() {
        let mut response = sample();
        response.header.reserved_header = vec![0xEE; 4];
        let wire = response.build(Actor::Firmware).unwrap();
        let signable = response.signable_bytes().unwrap();
        let signature_len = response.signature.encoded_len();
        assert_eq!(
            signable.as_slice(),
            &wire[4..wire.len() - signature_len - field_size::SHA_384_MAC]
        );
        let macable = response.macable_bytes().unwrap();
        assert_eq!(macable.as_slice(), &wire[4..wire.len() - field_size::SHA_384_MAC]);
    }

    #[test]
    fn test_fm568_efuse_length() {
        let mut response = sample();
        response.header.device_family = crate::messages::DeviceFamily::Fm568;
        assert!(matches!(
            response.build(Actor::Firmware),
            Err(CodecError::InvalidFieldLength {
                field: "public_efuse_values",
                ..
            })
        ));
        response.header.public_efuse_values = vec![0x5A; 448];
        let bytes = response.build(Actor::Firmware).unwrap();
        let parsed = GetMeasurementResponse::parse(&bytes, Actor::Firmware).unwrap();
        assert_eq!(parsed, response);
    }
}
