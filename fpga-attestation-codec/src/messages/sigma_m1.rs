use crate::{
    cursor::ByteCursor,
    endianness::{convert, Actor, Field, FieldWriter, RuleTable, SwapRule},
    error::Result,
    messages::{check_len, device_header::read_u32, field_size, WireMessage},
};

/// Magic of a SIGMA M1 message.
pub const SIGMA_M1_MAGIC: u32 = 0x6E3A_7DAC;

const RESERVED1_SIZE: usize = 4;
const RESERVED2_SIZE: usize = 12;

pub(crate) const ENDIANNESS: RuleTable = &[
    (Field::SigmaM1Magic, SwapRule::Convert),
    (Field::SigmaM1BkpsDhPubKey, SwapRule::None),
    (Field::SigmaM1PufType, SwapRule::Convert),
    (Field::SigmaM1UserKeyChain, SwapRule::None),
];

/// First message of the SIGMA key exchange, sent by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigmaM1Message {
    pub reserved_header: Vec<u8>,
    pub magic: u32,
    pub reserved1: Vec<u8>,
    pub bkps_dh_pub_key: Vec<u8>,
    pub puf_type: u32,
    pub reserved2: Vec<u8>,
    pub user_key_chain: Vec<u8>,
}

impl Default for SigmaM1Message {
    fn default() -> Self {
        Self {
            reserved_header: vec![0; field_size::RESERVED_HEADER],
            magic: SIGMA_M1_MAGIC,
            reserved1: vec![0; RESERVED1_SIZE],
            bkps_dh_pub_key: vec![0; field_size::DH_PUB_KEY],
            puf_type: 0,
            reserved2: vec![0; RESERVED2_SIZE],
            user_key_chain: Vec::new(),
        }
    }
}

impl SigmaM1Message {
    fn write_signed_part(&self, writer: &mut FieldWriter) -> Result<()> {
        check_len("reserved1", &self.reserved1, RESERVED1_SIZE)?;
        check_len(
            "bkps_dh_pub_key",
            &self.bkps_dh_pub_key,
            field_size::DH_PUB_KEY,
        )?;
        check_len("reserved2", &self.reserved2, RESERVED2_SIZE)?;
        writer
            .put(Field::SigmaM1Magic, &self.magic.to_be_bytes())?
            .put_raw(&self.reserved1)
            .put(Field::SigmaM1BkpsDhPubKey, &self.bkps_dh_pub_key)?
            .put(Field::SigmaM1PufType, &self.puf_type.to_be_bytes())?
            .put_raw(&self.reserved2);
        Ok(())
    }
}

impl WireMessage for SigmaM1Message {
    fn parse(bytes: &[u8], actor: Actor) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let reserved_header = cursor.read_bytes(field_size::RESERVED_HEADER)?;
        let magic = read_u32(&mut cursor, ENDIANNESS, Field::SigmaM1Magic, actor)?;
        let reserved1 = cursor.read_bytes(RESERVED1_SIZE)?;
        let bkps_dh_pub_key = convert(
            ENDIANNESS,
            Field::SigmaM1BkpsDhPubKey,
            cursor.read_slice(field_size::DH_PUB_KEY)?,
            actor,
        )?;
        let puf_type = read_u32(&mut cursor, ENDIANNESS, Field::SigmaM1PufType, actor)?;
        let reserved2 = cursor.read_bytes(RESERVED2_SIZE)?;
        let user_key_chain = convert(
            ENDIANNESS,
            Field::SigmaM1UserKeyChain,
            &cursor.read_rest(),
            actor,
        )?;
        Ok(Self {
            reserved_header,
            magic,
            reserved1,
            bkps_dh_pub_key,
            puf_type,
            reserved2,
            user_key_chain,
        })
    }

    fn build(&self, actor: Actor) -> Result<Vec<u8>> {
        check_len(
            "reserved_header",
            &self.reserved_header,
            field_size::RESERVED_HEADER,
        )?;
        let mut writer = FieldWriter::new(ENDIANNESS, actor);
        writer.put_raw(&self.reserved_header);
        self.write_signed_part(&mut writer)?;
        writer.put(Field::SigmaM1UserKeyChain, &self.user_key_chain)?;
        Ok(writer.finish())
    }

    fn signable_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = FieldWriter::new(ENDIANNESS, Actor::Firmware);
        self.write_signed_part(&mut writer)?;
        Ok(writer.finish())
    }

    fn macable_bytes(&self) -> Result<Vec<u8>> {
        let mut data = self.signable_bytes()?;
        data.extend_from_slice(&convert(
            ENDIANNESS,
            Field::SigmaM1UserKeyChain,
            &self.user_key_chain,
            Actor::Firmware,
        )?);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_chain_takes_the_rest() {
        let message = SigmaM1Message {
            puf_type: 3,
            user_key_chain: vec![0x42; 37],
            ..Default::default()
        };
        let bytes = message.build(Actor::Firmware).unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 4 + 96 + 4 + 12 + 37);
        assert_eq!(&bytes[108..112], &3u32.to_le_bytes());
        assert_eq!(SigmaM1Message::parse(&bytes, Actor::Firmware).unwrap(), message);
    }

    #[test]
    fn test_empty_user_key_chain() {
        let bytes = SigmaM1Message::default().build(Actor::Service).unwrap();
        let parsed = SigmaM1Message::parse(&bytes, Actor::Service).unwrap();
        assert!(parsed.user_key_chain.is_empty());
        assert_eq!(parsed.magic, SIGMA_M1_MAGIC);
    }

    #[test]
    fn test_macable_appends_user_key_chain() {
        let message = SigmaM1Message {
            user_key_chain: vec![1, 2, 3],
            ..Default::default()
        };
        let signable = message.signable_bytes().unwrap();
        assert_eq!(signable.len(), 4 + 4 + 96 + 4 + 12);
        assert_eq!(
            message.macable_bytes().unwrap(),
            [signable.as_slice(), &[1, 2, 3]].concat()
        );
    }
}
