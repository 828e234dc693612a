use fpga_attestation_codec::{ByteCursor, GetMeasurementResponse};
use tracing::{debug, error, instrument, warn};

use crate::{
    errors::{AttestError, Result},
    extractors::{section_record, Section},
    measurement::MeasurementRecord,
};

/// The size of a device report block header.
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Header of one measurement block in a GET_MEASUREMENT record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub section_type: u8,
    /// Header plus value, in bytes.
    pub measurement_with_header_size: u8,
    /// Partial reconfiguration region, read big-endian (region 1 is
    /// `0x01000000`) to match the index used by reference manifests.
    pub section_index: u32,
}

impl BlockHeader {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let section_type = cursor.read_u8()?;
        cursor.skip(2)?;
        let measurement_with_header_size = cursor.read_u8()?;
        let section_index = cursor.read_u32_be()?;
        Ok(Self {
            section_type,
            measurement_with_header_size,
            section_index,
        })
    }

    fn value_size(&self) -> Result<usize> {
        usize::from(self.measurement_with_header_size)
            .checked_sub(BLOCK_HEADER_SIZE)
            .ok_or_else(|| {
                error!(
                    section_type = self.section_type,
                    size = self.measurement_with_header_size,
                    "Measurement block is smaller than its header"
                );
                AttestError::InvalidBlockSize {
                    expected: BLOCK_HEADER_SIZE,
                    actual: usize::from(self.measurement_with_header_size),
                }
            })
    }
}

/// Maps the measurement record of a GET_MEASUREMENT response.
pub struct DeviceReportExtractor;

impl DeviceReportExtractor {
    /// Extracts one record per known measurement block.
    ///
    /// # Arguments
    ///
    /// * `response` - A parsed GET_MEASUREMENT response
    ///
    /// # Returns
    ///
    /// The records of every block whose section carries a measurement, in
    /// record order.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if:
    /// * A block is truncated or smaller than its header
    /// * A digest has an unsupported size
    /// * Bytes remain after the announced number of blocks
    #[instrument(
        level = "debug",
        name = "map_device_report",
        skip(response),
        fields(blocks = response.number_of_measurement_blocks)
    )]
    pub fn map(response: &GetMeasurementResponse) -> Result<Vec<MeasurementRecord>> {
        let mut cursor = ByteCursor::new(&response.measurement_record);
        let mut records = Vec::new();
        for block in 0..response.number_of_measurement_blocks {
            let header = BlockHeader::read(&mut cursor)?;
            let value = cursor.read_slice(header.value_size()?)?;
            let Some(section) = Section::from_value(header.section_type) else {
                warn!(
                    block,
                    section_type = header.section_type,
                    "Skipping measurement block of unknown section"
                );
                continue;
            };
            let index = i64::from(header.section_index);
            if let Some(record) = section_record(section, index, value)? {
                debug!(block, section = ?section, key = %record.key, "Mapped measurement block");
                records.push(record);
            }
        }
        if cursor.has_remaining() {
            error!(
                remaining = cursor.remaining(),
                "Measurement record has data beyond the announced blocks"
            );
            return Err(AttestError::TrailingMeasurementData {
                remaining: cursor.remaining(),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(section_type: u8, index: u32, value: &[u8]) -> Vec<u8> {
        let mut block = vec![section_type, 0, 0, (value.len() + BLOCK_HEADER_SIZE) as u8];
        block.extend_from_slice(&index.to_be_bytes());
        block.extend_from_slice(value);
        block
    }

    fn response(blocks: &[Vec<u8>]) -> GetMeasurementResponse {
        GetMeasurementResponse {
            number_of_measurement_blocks: blocks.len() as u8,
            measurement_record: blocks.concat(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stratix10_layout() {
        let response = response(&[
            block(1, 0, &hex::decode("0002000002000000").unwrap()),
            block(2, 0, &[0x66; 48]),
            block(3, 0, &[0x5D; 48]),
            block(6, 0x0100_0000, &[0xCB; 48]),
        ]);
        assert_eq!(response.measurement_record.len(), 184);
        let records = DeviceReportExtractor::map(&response).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0].value.masked_vendor_info.as_ref().unwrap().value,
            "0002000002000000"
        );
        assert_eq!(records[1].value.fwid.as_ref().unwrap().digest, "66".repeat(48));
        assert_eq!(records[3].key.index, 16777216);
        assert_eq!(records[1].key.index, 0);
    }

    #[test]
    fn test_second_pr_region() {
        let response = response(&[
            block(6, 0x0100_0000, &[0xCB; 48]),
            block(6, 0x0200_0000, &[0xED; 48]),
        ]);
        let records = DeviceReportExtractor::map(&response).unwrap();
        assert_eq!(records[1].key.index, 33554432);
        assert_ne!(records[0].key, records[1].key);
    }

    #[test]
    fn test_block_smaller_than_header() {
        let mut response = response(&[block(2, 0, &[])]);
        response.measurement_record[3] = 4;
        assert!(matches!(
            DeviceReportExtractor::map(&response),
            Err(AttestError::InvalidBlockSize {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_trailing_data_is_rejected() {
        let mut response = response(&[block(2, 0, &[0x11; 48])]);
        response.measurement_record.push(0);
        assert!(matches!(
            DeviceReportExtractor::map(&response),
            Err(AttestError::TrailingMeasurementData { remaining: 1 })
        ));
    }

    #[test]
    fn test_truncated_block_is_rejected() {
        let mut response = response(&[block(2, 0, &[0x11; 48])]);
        response.number_of_measurement_blocks = 2;
        assert!(matches!(
            DeviceReportExtractor::map(&response),
            Err(AttestError::CodecError(_))
        ));
    }

    #[test]
    fn test_unknown_section_is_consumed() {
        let response = response(&[block(0x7F, 0, &[0; 12]), block(3, 0, &[0x22; 64])]);
        let records = DeviceReportExtractor::map(&response).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].value.fwid.as_ref().unwrap().hash_alg,
            crate::constants::SHA512_OID
        );
    }
}
