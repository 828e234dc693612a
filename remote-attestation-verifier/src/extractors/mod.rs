//! Extractors turning device evidence into canonical measurement records.
//!
//! Every source (the GET_MEASUREMENT device report, SPDM measurement records
//! and DICE certificate extensions) produces the same [`MeasurementRecord`]
//! shape, so the verifier never needs to know where a measurement came from.

pub mod certificate;
pub mod device_report;
pub mod spdm_report;

pub use certificate::CertificateExtractor;
pub use device_report::DeviceReportExtractor;
pub use spdm_report::SpdmMeasurementExtractor;

use tracing::{debug, error};

use crate::{
    constants::{DEVICE_MEASUREMENT_LAYER, INTEL_VENDOR, SHA384_OID, SHA512_OID},
    errors::{AttestError, Result},
    measurement::{Fwid, MaskedVendorInfo, MeasurementKey, MeasurementRecord, MeasurementValue},
    utils::measurement_type_oid,
};

/// Measured section of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Reserved,
    DeviceState,
    Io,
    Core,
    Hpio,
    Hps,
    Pr,
    Layer0FwRomExt,
    Layer1FwCmf,
    Layer2BaseDesign,
}

impl Section {
    pub fn value(self) -> u8 {
        match self {
            Self::Reserved => 0,
            Self::DeviceState => 1,
            Self::Io => 2,
            Self::Core => 3,
            Self::Hpio => 4,
            Self::Hps => 5,
            Self::Pr => 6,
            Self::Layer0FwRomExt => 10,
            Self::Layer1FwCmf => 11,
            Self::Layer2BaseDesign => 12,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Reserved),
            1 => Some(Self::DeviceState),
            2 => Some(Self::Io),
            3 => Some(Self::Core),
            4 => Some(Self::Hpio),
            5 => Some(Self::Hps),
            6 => Some(Self::Pr),
            10 => Some(Self::Layer0FwRomExt),
            11 => Some(Self::Layer1FwCmf),
            12 => Some(Self::Layer2BaseDesign),
            _ => None,
        }
    }

    /// DMTF measurement value type reported for this section over SPDM.
    pub fn dmtf_type(self) -> Option<u8> {
        match self {
            Self::DeviceState => Some(0x82),
            Self::Io | Self::Core | Self::Hpio | Self::Hps | Self::Pr => Some(0x01),
            Self::Reserved | Self::Layer0FwRomExt | Self::Layer1FwCmf | Self::Layer2BaseDesign => {
                None
            }
        }
    }
}

/// Returns the hash algorithm OID matching a digest's size.
pub fn hash_alg_for_digest(digest: &[u8]) -> Result<&'static str> {
    match digest.len() {
        48 => Ok(SHA384_OID),
        64 => Ok(SHA512_OID),
        actual => {
            error!(actual, "Measurement digest has unsupported size");
            Err(AttestError::InvalidDigestSize { actual })
        }
    }
}

/// Builds the record for one measured section.
///
/// `index` is only kept for partial reconfiguration regions. Returns `None`
/// for sections that carry no reference-comparable measurement.
pub(crate) fn section_record(
    section: Section,
    index: i64,
    data: &[u8],
) -> Result<Option<MeasurementRecord>> {
    let mut key = MeasurementKey {
        vendor: INTEL_VENDOR.to_string(),
        model: None,
        layer: DEVICE_MEASUREMENT_LAYER,
        index: 0,
        measurement_type: Some(measurement_type_oid(section.value())),
    };
    let mut value = MeasurementValue::default();
    match section {
        Section::DeviceState => {
            value.masked_vendor_info = Some(MaskedVendorInfo::new(&hex::encode_upper(data), None));
        }
        Section::Pr => {
            key.index = index;
            value.fwid = Some(Fwid::new(hash_alg_for_digest(data)?, &hex::encode(data)));
        }
        Section::Io | Section::Core | Section::Hpio | Section::Hps => {
            value.fwid = Some(Fwid::new(hash_alg_for_digest(data)?, &hex::encode(data)));
        }
        Section::Reserved
        | Section::Layer0FwRomExt
        | Section::Layer1FwCmf
        | Section::Layer2BaseDesign => {
            debug!(section = ?section, "Skipping section without reference measurement");
            return Ok(None);
        }
    }
    Ok(Some(MeasurementRecord::new(key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_alg_by_digest_size() {
        assert_eq!(hash_alg_for_digest(&[0; 48]).unwrap(), SHA384_OID);
        assert_eq!(hash_alg_for_digest(&[0; 64]).unwrap(), SHA512_OID);
        assert!(matches!(
            hash_alg_for_digest(&[0; 32]),
            Err(AttestError::InvalidDigestSize { actual: 32 })
        ));
    }

    #[test]
    fn test_section_values_round_trip() {
        for value in 0..=u8::MAX {
            if let Some(section) = Section::from_value(value) {
                assert_eq!(section.value(), value);
            }
        }
        assert_eq!(Section::from_value(7), None);
    }

    #[test]
    fn test_device_state_record_has_exact_mask() {
        let record = section_record(Section::DeviceState, 5, &[0, 2, 0, 0, 2, 0, 0, 0])
            .unwrap()
            .unwrap();
        let info = record.value.masked_vendor_info.unwrap();
        assert_eq!(info.value, "0002000002000000");
        assert_eq!(info.mask, "FFFFFFFFFFFFFFFF");
        assert_eq!(record.key.index, 0);
        assert!(record.value.fwid.is_none());
    }

    #[test]
    fn test_pr_record_keeps_index() {
        let record = section_record(Section::Pr, 16777216, &[0xAB; 48])
            .unwrap()
            .unwrap();
        assert_eq!(record.key.index, 16777216);
        assert_eq!(
            record.key.measurement_type.as_deref(),
            Some("2.16.840.1.113741.1.15.4.6")
        );
        assert_eq!(record.value.fwid.unwrap().digest, "AB".repeat(48));
    }

    #[test]
    fn test_layer_sections_are_skipped() {
        assert!(section_record(Section::Layer1FwCmf, 0, &[0; 48])
            .unwrap()
            .is_none());
    }
}
