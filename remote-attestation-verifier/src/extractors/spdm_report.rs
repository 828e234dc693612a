use fpga_attestation_codec::ByteCursor;
use tracing::{debug, error, instrument, warn};

use crate::{
    errors::{AttestError, Result},
    extractors::{section_record, Section},
    measurement::MeasurementRecord,
};

/// Measurement specification value of DMTF formatted records.
pub const DMTF_MEASUREMENT_SPEC: u8 = 1;

/// The size of the DMTF header (value type and value size).
pub const DMTF_HEADER_SIZE: usize = 3;

/// First SPDM measurement index used for partial reconfiguration regions.
pub const PR_SECTION_INDEX_SHIFT: u8 = 0x40;

/// Last SPDM measurement index used for partial reconfiguration regions.
pub const PR_SECTION_INDEX_LAST: u8 = 0x5F;

/// Header of one SPDM measurement block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpdmRecordHeader {
    pub index: u8,
    pub measurement_spec: u8,
    pub measurement_size: u16,
}

impl SpdmRecordHeader {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            index: cursor.read_u8()?,
            measurement_spec: cursor.read_u8()?,
            measurement_size: cursor.read_u16_le()?,
        })
    }

    fn is_dmtf(&self) -> bool {
        self.measurement_spec == DMTF_MEASUREMENT_SPEC
    }

    /// Maps the SPDM index and DMTF value type to a section and the key
    /// index of that section.
    fn section(&self, dmtf_type: u8) -> Option<(Section, i64)> {
        match self.index {
            PR_SECTION_INDEX_SHIFT..=PR_SECTION_INDEX_LAST => {
                (Some(dmtf_type) == Section::Pr.dmtf_type()).then(|| {
                    let region = u32::from(self.index - PR_SECTION_INDEX_SHIFT + 1);
                    (Section::Pr, i64::from(region.swap_bytes()))
                })
            }
            1..=5 => Section::from_value(self.index)
                .filter(|section| section.dmtf_type() == Some(dmtf_type))
                .map(|section| (section, 0)),
            _ => None,
        }
    }
}

/// Maps the measurement record of an SPDM MEASUREMENTS response.
pub struct SpdmMeasurementExtractor;

impl SpdmMeasurementExtractor {
    /// Extracts one record per known measurement block.
    ///
    /// Blocks that are not DMTF formatted or whose index and type do not
    /// name a known section are consumed and skipped.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if a block is truncated, a DMTF block is shorter
    /// than its header, or a digest has an unsupported size.
    #[instrument(level = "debug", name = "map_spdm_report", skip_all, fields(len = record.len()))]
    pub fn map(record: &[u8]) -> Result<Vec<MeasurementRecord>> {
        let mut cursor = ByteCursor::new(record);
        let mut records = Vec::new();
        while cursor.has_remaining() {
            let header = SpdmRecordHeader::read(&mut cursor)?;
            let body = cursor.read_slice(usize::from(header.measurement_size))?;
            if !header.is_dmtf() {
                warn!(
                    index = header.index,
                    measurement_spec = header.measurement_spec,
                    "Skipping measurement block with unsupported measurement specification"
                );
                continue;
            }
            let mut body = ByteCursor::new(body);
            let value_size = usize::from(header.measurement_size)
                .checked_sub(DMTF_HEADER_SIZE)
                .ok_or_else(|| {
                    error!(
                        index = header.index,
                        size = header.measurement_size,
                        "DMTF measurement block is smaller than its header"
                    );
                    AttestError::InvalidBlockSize {
                        expected: DMTF_HEADER_SIZE,
                        actual: usize::from(header.measurement_size),
                    }
                })?;
            let dmtf_type = body.read_u8()?;
            body.skip(2)?;
            let value = body.read_slice(value_size)?;
            let Some((section, index)) = header.section(dmtf_type) else {
                warn!(
                    index = header.index,
                    dmtf_type,
                    "Skipping measurement block of unknown section"
                );
                continue;
            };
            if let Some(record) = section_record(section, index, value)? {
                debug!(section = ?section, key = %record.key, "Mapped SPDM measurement block");
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SHA384_OID;

    const DEVICE_STATE_RECORD: &str = "01010b008208000000000002000000";
    const IO_RECORD: &str = "02013300013000d83677e64f512f69164a5c00ddfc14eb9d4a40edb11244235ab6a3de7\
                             38f3b6c7e3f022c765b5d81fa7afd257d3337bf";
    const IO_DIGEST: &str = "D83677E64F512F69164A5C00DDFC14EB9D4A40EDB11244235AB6A3DE738F3B6C7E3F022C\
                             765B5D81FA7AFD257D3337BF";
    const UNKNOWN_RECORD: &str = "fd016d00846a00db0000000100000000a1009803a4004b6086480186f84d010f04\
                                  010169696e74656c2e636f6d030220811801a4004b6086480186f84d010f040201\
                                  69696e74656c2e636f6d030220811802a4004b6086480186f84d010f0403016969\
                                  6e74656c2e636f6d030220811803";

    fn decode(record: &str) -> Vec<u8> {
        hex::decode(record).unwrap()
    }

    #[test]
    fn test_device_state_record() {
        let records = SpdmMeasurementExtractor::map(&decode(DEVICE_STATE_RECORD)).unwrap();
        assert_eq!(records.len(), 1);
        let info = records[0].value.masked_vendor_info.as_ref().unwrap();
        assert_eq!(info.value, "0000000002000000");
        assert_eq!(
            records[0].key.measurement_type.as_deref(),
            Some("2.16.840.1.113741.1.15.4.1")
        );
    }

    #[test]
    fn test_io_record() {
        let records = SpdmMeasurementExtractor::map(&decode(IO_RECORD)).unwrap();
        assert_eq!(records.len(), 1);
        let fwid = records[0].value.fwid.as_ref().unwrap();
        assert_eq!(fwid.digest, IO_DIGEST);
        assert_eq!(fwid.hash_alg, SHA384_OID);
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        let records = SpdmMeasurementExtractor::map(&decode(UNKNOWN_RECORD)).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_concatenated_records() {
        let record = [
            decode(DEVICE_STATE_RECORD),
            decode(UNKNOWN_RECORD),
            decode(IO_RECORD),
        ]
        .concat();
        let records = SpdmMeasurementExtractor::map(&record).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].value.masked_vendor_info.is_some());
        assert!(records[1].value.fwid.is_some());
    }

    #[test]
    fn test_pr_region_index() {
        let mut record = vec![0x41, 0x01, 0x33, 0x00, 0x01, 0x30, 0x00];
        record.extend_from_slice(&[0xAA; 48]);
        let records = SpdmMeasurementExtractor::map(&record).unwrap();
        assert_eq!(records[0].key.index, 33554432);
    }

    #[test]
    fn test_mismatched_dmtf_type_is_skipped() {
        // IO index reported with the device state value type.
        let mut record = vec![0x02, 0x01, 0x33, 0x00, 0x82, 0x30, 0x00];
        record.extend_from_slice(&[0xAA; 48]);
        assert!(SpdmMeasurementExtractor::map(&record).unwrap().is_empty());
    }

    #[test]
    fn test_non_dmtf_record_is_skipped() {
        let record = vec![0x02, 0x02, 0x02, 0x00, 0xAA, 0xBB];
        assert!(SpdmMeasurementExtractor::map(&record).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_record() {
        let record = decode(IO_RECORD);
        assert!(matches!(
            SpdmMeasurementExtractor::map(&record[..record.len() - 1]),
            Err(AttestError::CodecError(_))
        ));
        assert!(matches!(
            SpdmMeasurementExtractor::map(&[0x02, 0x01, 0x02, 0x00, 0x01, 0x00]),
            Err(AttestError::InvalidBlockSize { .. })
        ));
    }
}
