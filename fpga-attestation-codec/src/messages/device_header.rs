use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable},
    error::Result,
    messages::{check_len, field_size, DeviceFamily},
};

/// Field identifiers used by one message for the shared device header.
pub(crate) struct HeaderFields {
    pub magic: Field,
    pub sdm_session_id: Field,
    pub device_unique_id: Field,
    pub rom_version_num: Field,
    pub sdm_fw_build_id: Field,
    pub sdm_fw_security_version_num: Field,
    pub public_efuse_values: Field,
}

/// Device identity block shared by GET_MEASUREMENT responses and SIGMA M2.
///
/// Integer fields hold service-layout values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHeader {
    pub reserved_header: Vec<u8>,
    pub magic: u32,
    pub sdm_session_id: u32,
    pub device_unique_id: Vec<u8>,
    pub rom_version_num: u32,
    pub sdm_fw_build_id: Vec<u8>,
    pub sdm_fw_security_version_num: u32,
    pub device_family: DeviceFamily,
    pub reserved: Vec<u8>,
    pub public_efuse_values: Vec<u8>,
}

impl DeviceHeader {
    pub fn new(magic: u32) -> Self {
        let device_family = DeviceFamily::default();
        Self {
            reserved_header: vec![0; field_size::RESERVED_HEADER],
            magic,
            sdm_session_id: 0,
            device_unique_id: vec![0; field_size::DEVICE_UNIQUE_ID],
            rom_version_num: 0,
            sdm_fw_build_id: vec![0; field_size::SDM_FW_BUILD_ID],
            sdm_fw_security_version_num: 0,
            device_family,
            reserved: vec![0; field_size::FUSE_MAP_RESERVED],
            public_efuse_values: vec![0; device_family.efuse_values_len()],
        }
    }

    pub(crate) fn read(
        cursor: &mut ByteCursor<'_>,
        rules: RuleTable,
        fields: &HeaderFields,
        actor: Actor,
    ) -> Result<Self> {
        let reserved_header = cursor.read_bytes(field_size::RESERVED_HEADER)?;
        let magic = read_u32(cursor, rules, fields.magic, actor)?;
        let sdm_session_id = read_u32(cursor, rules, fields.sdm_session_id, actor)?;
        let device_unique_id = convert(
            rules,
            fields.device_unique_id,
            cursor.read_slice(field_size::DEVICE_UNIQUE_ID)?,
            actor,
        )?;
        let rom_version_num = read_u32(cursor, rules, fields.rom_version_num, actor)?;
        let sdm_fw_build_id = convert(
            rules,
            fields.sdm_fw_build_id,
            cursor.read_slice(field_size::SDM_FW_BUILD_ID)?,
            actor,
        )?;
        let sdm_fw_security_version_num =
            read_u32(cursor, rules, fields.sdm_fw_security_version_num, actor)?;
        let device_family = DeviceFamily::try_from(cursor.read_u8()?)?;
        let reserved = cursor.read_bytes(field_size::FUSE_MAP_RESERVED)?;
        let public_efuse_values = convert(
            rules,
            fields.public_efuse_values,
            cursor.read_slice(device_family.efuse_values_len())?,
            actor,
        )?;
        Ok(Self {
            reserved_header,
            magic,
            sdm_session_id,
            device_unique_id,
            rom_version_num,
            sdm_fw_build_id,
            sdm_fw_security_version_num,
            device_family,
            reserved,
            public_efuse_values,
        })
    }

    /// Writes everything from `magic` onwards; the reserved header is
    /// written by the caller since it is never signed.
    pub(crate) fn write_signed_part(
        &self,
        writer: &mut FieldWriter,
        fields: &HeaderFields,
    ) -> Result<()> {
        check_len(
            "device_unique_id",
            &self.device_unique_id,
            field_size::DEVICE_UNIQUE_ID,
        )?;
        check_len(
            "sdm_fw_build_id",
            &self.sdm_fw_build_id,
            field_size::SDM_FW_BUILD_ID,
        )?;
        check_len("reserved", &self.reserved, field_size::FUSE_MAP_RESERVED)?;
        check_len(
            "public_efuse_values",
            &self.public_efuse_values,
            self.device_family.efuse_values_len(),
        )?;
        writer
            .put(fields.magic, &self.magic.to_be_bytes())?
            .put(fields.sdm_session_id, &self.sdm_session_id.to_be_bytes())?
            .put(fields.device_unique_id, &self.device_unique_id)?
            .put(fields.rom_version_num, &self.rom_version_num.to_be_bytes())?
            .put(fields.sdm_fw_build_id, &self.sdm_fw_build_id)?
            .put(
                fields.sdm_fw_security_version_num,
                &self.sdm_fw_security_version_num.to_be_bytes(),
            )?
            .put_raw(&[self.device_family.as_byte()])
            .put_raw(&self.reserved)
            .put(fields.public_efuse_values, &self.public_efuse_values)?;
        Ok(())
    }

    pub(crate) fn check_reserved_header(&self) -> Result<()> {
        check_len(
            "reserved_header",
            &self.reserved_header,
            field_size::RESERVED_HEADER,
        )
    }
}

pub(crate) fn read_u32(
    cursor: &mut ByteCursor<'_>,
    rules: RuleTable,
    field: Field,
    actor: Actor,
) -> Result<u32> {
    let converted = convert(rules, field, &cursor.read_fixed::<4>()?, actor)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(&converted);
    Ok(u32::from_be_bytes(word))
}

pub(crate) fn read_u16(
    cursor: &mut ByteCursor<'_>,
    rules: RuleTable,
    field: Field,
    actor: Actor,
) -> Result<u16> {
    let converted = convert(rules, field, &cursor.read_fixed::<2>()?, actor)?;
    let mut half = [0u8; 2];
    half.copy_from_slice(&converted);
    Ok(u16::from_be_bytes(half))
}
