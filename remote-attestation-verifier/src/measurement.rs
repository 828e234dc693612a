//! Canonical measurement model shared by every evidence source and by the
//! reference manifest.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::normalize_hex;

/// Identifies what was measured.
///
/// `index` is always populated (`0` when the source does not carry one), so
/// records from sources that never set it still compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct MeasurementKey {
    pub vendor: String,
    pub model: Option<String>,
    pub layer: i64,
    pub index: i64,
    pub measurement_type: Option<String>,
}

impl MeasurementKey {
    /// True when the key carries nothing that identifies a measurement.
    pub fn is_empty(&self) -> bool {
        self.vendor.is_empty() && self.model.is_none() && self.measurement_type.is_none()
    }
}

impl std::fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vendor={} model={} layer={} index={} type={}",
            self.vendor,
            self.model.as_deref().unwrap_or("-"),
            self.layer,
            self.index,
            self.measurement_type.as_deref().unwrap_or("-"),
        )
    }
}

/// Firmware identifier: a digest and the OID of the hash that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fwid {
    pub hash_alg: String,
    /// Upper-case hex digest.
    pub digest: String,
}

impl Fwid {
    pub fn new(hash_alg: impl Into<String>, digest: &str) -> Self {
        Self {
            hash_alg: hash_alg.into(),
            digest: normalize_hex(digest),
        }
    }

    /// Digests are compared case-insensitively.
    pub fn matches(&self, actual: &Fwid) -> bool {
        self.hash_alg == actual.hash_alg && self.digest.eq_ignore_ascii_case(&actual.digest)
    }
}

/// Vendor info together with the mask of the bits that are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedVendorInfo {
    /// Upper-case hex value, already masked.
    pub value: String,
    /// Upper-case hex mask, as long as `value` when it was not given.
    pub mask: String,
}

impl MaskedVendorInfo {
    /// Builds masked vendor info. An absent mask selects every digit of
    /// `value`; a given mask is applied to `value` right away.
    pub fn new(value: &str, mask: Option<&str>) -> Self {
        let value = normalize_hex(value);
        match mask {
            Some(mask) => {
                let mask = normalize_hex(mask);
                let value = apply_mask(&value, &mask).unwrap_or(value);
                Self { value, mask }
            }
            None => Self {
                mask: "F".repeat(value.len()),
                value,
            },
        }
    }

    /// Masks `actual` with this (reference) mask and compares the result
    /// with the reference value. Values that are not valid hex never match.
    pub fn matches(&self, actual: &MaskedVendorInfo) -> bool {
        match apply_mask(&actual.value, &self.mask) {
            Ok(masked) => masked == self.value,
            Err(e) => {
                warn!(
                    expected = %self.value,
                    actual = %actual.value,
                    mask = %self.mask,
                    "Vendor info is not valid hex: {e}"
                );
                false
            }
        }
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// ANDs a hex `value` with a hex `mask`, digit by digit.
///
/// `value` is first aligned to the length of `mask`: extra trailing digits
/// are dropped and a shorter value is extended with trailing zeros. The
/// result is upper-case and always as long as `mask`. Odd lengths are
/// fine.
///
/// # Errors
///
/// Returns `hex::FromHexError::InvalidHexCharacter` for the first
/// compared digit of either input that is not hex.
pub fn apply_mask(value: &str, mask: &str) -> std::result::Result<String, hex::FromHexError> {
    let digits = value.chars().chain(std::iter::repeat('0'));
    mask.chars()
        .zip(digits)
        .enumerate()
        .map(|(index, (mask_digit, digit))| {
            let masked = nibble(digit, index)? & nibble(mask_digit, index)?;
            Ok(char::from(HEX_DIGITS[usize::from(masked)]))
        })
        .collect()
}

fn nibble(c: char, index: usize) -> std::result::Result<u8, hex::FromHexError> {
    c.to_digit(16)
        .and_then(|digit| u8::try_from(digit).ok())
        .ok_or(hex::FromHexError::InvalidHexCharacter { c, index })
}

/// The measured values. Absent fields are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MeasurementValue {
    pub version: Option<String>,
    pub svn: Option<i64>,
    pub fwid: Option<Fwid>,
    pub flags: Option<String>,
    pub masked_vendor_info: Option<MaskedVendorInfo>,
}

/// A single field that differs between a reference and a received value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl MeasurementValue {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.svn.is_none()
            && self.fwid.is_none()
            && self.flags.is_none()
            && self.masked_vendor_info.is_none()
    }

    /// Returns the first field set in `self` (the reference) that is absent
    /// from or different in `actual`.
    pub fn first_mismatch(&self, actual: &MeasurementValue) -> Option<FieldMismatch> {
        if let Some(expected) = &self.version {
            if actual.version.as_ref() != Some(expected) {
                return Some(mismatch("version", expected, actual.version.as_ref()));
            }
        }
        if let Some(expected) = self.svn {
            if actual.svn != Some(expected) {
                return Some(mismatch("svn", &expected, actual.svn.as_ref()));
            }
        }
        if let Some(expected) = &self.fwid {
            if !actual.fwid.as_ref().is_some_and(|fwid| expected.matches(fwid)) {
                let actual_digest = actual.fwid.as_ref().map(|fwid| &fwid.digest);
                return Some(mismatch("fwid", &expected.digest, actual_digest));
            }
        }
        if let Some(expected) = &self.flags {
            let same = actual
                .flags
                .as_ref()
                .is_some_and(|flags| flags.eq_ignore_ascii_case(expected));
            if !same {
                return Some(mismatch("flags", expected, actual.flags.as_ref()));
            }
        }
        if let Some(expected) = &self.masked_vendor_info {
            let same = actual
                .masked_vendor_info
                .as_ref()
                .is_some_and(|info| expected.matches(info));
            if !same {
                return Some(FieldMismatch {
                    field: "vendor_info",
                    expected: format!("{} (mask {})", expected.value, expected.mask),
                    actual: actual
                        .masked_vendor_info
                        .as_ref()
                        .map_or_else(|| "<absent>".to_string(), |info| info.value.clone()),
                });
            }
        }
        None
    }
}

fn mismatch<T: std::fmt::Display>(
    field: &'static str,
    expected: &T,
    actual: Option<&T>,
) -> FieldMismatch {
    FieldMismatch {
        field,
        expected: expected.to_string(),
        actual: actual.map_or_else(|| "<absent>".to_string(), ToString::to_string),
    }
}

/// A key and the values measured for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub key: MeasurementKey,
    pub value: MeasurementValue,
}

impl MeasurementRecord {
    pub fn new(key: MeasurementKey, value: MeasurementValue) -> Self {
        Self { key, value }
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const VENDOR_INFO: &str = "0011001100001111";
    const VENDOR_INFO_MASK: &str = "FFFFFFFF000000FF";

    #[test]
    fn test_masked_vendor_info_ignores_bits_outside_mask() {
        let reference = MaskedVendorInfo::new(VENDOR_INFO, Some(VENDOR_INFO_MASK));
        assert_eq!(reference.value, "0011001100000011");
        assert!(reference.matches(&MaskedVendorInfo::new("0011001111111111", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new("0011001111111100", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new("AAAA", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new(VENDOR_INFO_MASK, None)));
    }

    #[test]
    fn test_absent_mask_is_exact_match() {
        let reference = MaskedVendorInfo::new("00000000", None);
        assert_eq!(reference.mask, "FFFFFFFF");
        assert!(reference.matches(&MaskedVendorInfo::new("00000000", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new("00000001", None)));
    }

    #[test]
    fn test_apply_mask_aligns_value_to_mask_length() {
        let cases = [
            ("11112222", "FFFFFFFF", "11112222"),
            ("12222", "FFFFFFFF", "12222000"),
            ("112222", "FFFFFFFF", "11222200"),
            ("11112222333", "FFFFFFFF", "11112222"),
            ("1111222233", "FFFFFFFF", "11112222"),
            ("1234", "FFF", "123"),
            ("111", "FFFF", "1110"),
            ("111", "FFFFF", "11100"),
            ("111", "FFFF000", "1110000"),
            ("111", "000FFFF", "0000000"),
            ("000111", "FFFF", "0001"),
            ("123456", "F0F0FF", "103056"),
            ("1111", "FF00", "1100"),
            ("abcd", "ffff", "ABCD"),
            ("", "", ""),
        ];
        for (value, mask, expected) in cases {
            assert_eq!(apply_mask(value, mask).unwrap(), expected, "{value} & {mask}");
        }
    }

    #[test]
    fn test_apply_mask_rejects_invalid_hex() {
        assert!(matches!(
            apply_mask("12G4", "FFFF"),
            Err(hex::FromHexError::InvalidHexCharacter { c: 'G', index: 2 })
        ));
        assert!(apply_mask("1234", "FFXF").is_err());
        // Digits past the mask are never looked at.
        assert_eq!(apply_mask("12ZZ", "FF").unwrap(), "12");
    }

    #[test]
    fn test_all_ones_and_all_zeros_masks() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let len = rng.gen_range(0..40);
            let value: String = (0..len)
                .map(|_| char::from(b"0123456789abcdefABCDEF"[rng.gen_range(0..22)]))
                .collect();
            let ones = "F".repeat(len);
            let zeros = "0".repeat(len);
            assert_eq!(apply_mask(&value, &ones).unwrap(), value.to_ascii_uppercase());
            assert_eq!(apply_mask(&value, &zeros).unwrap(), zeros);

            let mask: String = (0..len)
                .map(|_| char::from(HEX_DIGITS[rng.gen_range(0..16)]))
                .collect();
            let masked = apply_mask(&value, &mask).unwrap();
            assert_eq!(masked.len(), len);
            assert_eq!(apply_mask(&masked, &mask).unwrap(), masked);
            assert!(MaskedVendorInfo::new(&value, Some(&mask))
                .matches(&MaskedVendorInfo::new(&value, None)));
        }
    }

    #[test]
    fn test_masked_vendor_info_uses_leading_digits() {
        let reference = MaskedVendorInfo::new("AABB", Some("FFFF"));
        assert!(reference.matches(&MaskedVendorInfo::new("AABBCCDD", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new("0000AABB", None)));

        let reference = MaskedVendorInfo::new("111", Some("FFF"));
        assert!(reference.matches(&MaskedVendorInfo::new("111", None)));
        assert!(reference.matches(&MaskedVendorInfo::new("1119", None)));
        assert!(!reference.matches(&MaskedVendorInfo::new("11", None)));
    }

    #[test]
    fn test_invalid_hex_never_matches() {
        let reference = MaskedVendorInfo::new("ZZ", None);
        assert!(!reference.matches(&MaskedVendorInfo::new("ZZ", None)));
        let reference = MaskedVendorInfo::new("00", Some("FF"));
        assert!(!reference.matches(&MaskedVendorInfo::new("0Z", None)));
    }

    #[test]
    fn test_first_mismatch_only_checks_reference_fields() {
        let reference = MeasurementValue {
            fwid: Some(Fwid::new("alg", "aa")),
            ..Default::default()
        };
        let actual = MeasurementValue {
            fwid: Some(Fwid::new("alg", "AA")),
            masked_vendor_info: Some(MaskedVendorInfo::new("01", None)),
            svn: Some(3),
            ..Default::default()
        };
        assert_eq!(reference.first_mismatch(&actual), None);

        let reference = MeasurementValue {
            svn: Some(4),
            ..Default::default()
        };
        assert_eq!(
            reference.first_mismatch(&actual),
            Some(FieldMismatch {
                field: "svn",
                expected: "4".to_string(),
                actual: "3".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_field_is_a_mismatch() {
        let reference = MeasurementValue {
            version: Some("1.0".to_string()),
            ..Default::default()
        };
        let mismatch = reference
            .first_mismatch(&MeasurementValue::default())
            .unwrap();
        assert_eq!(mismatch.actual, "<absent>");
    }
}
