//! Per-field byte order handling.
//!
//! Devices emit multi-byte fields in their native little-endian layout while
//! the service works with big-endian values. Each message declares a table of
//! `(Field, SwapRule)` pairs; the same table is used when parsing and when
//! building, so both directions always agree.

use crate::error::{CodecError, Result};

/// Which endpoint's native layout a buffer currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// Device-native layout, as sent over the wire by the firmware.
    Firmware,
    /// Service-internal layout. Conversion rules are not applied.
    Service,
}

/// How a single field is reordered when crossing the firmware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRule {
    /// Opaque span, e.g. keys, digests and MACs.
    None,
    /// Reverse bytes within every 4-byte window.
    Swap32,
    /// Reverse bytes within every 8-byte window.
    Swap64,
    /// Flip a single 2, 4 or 8 byte integer.
    Convert,
}

/// Every field that carries a byte order rule, across all message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PsgSignatureMagic,
    PsgSignatureSizeR,
    PsgSignatureSizeS,
    PsgSignatureCurveMagic,
    PsgSignatureR,
    PsgSignatureS,

    GetMeasurementMagic,
    GetMeasurementSdmSessionId,
    GetMeasurementDeviceUniqueId,
    GetMeasurementRomVersionNum,
    GetMeasurementSdmFwBuildId,
    GetMeasurementSdmFwSecurityVersionNum,
    GetMeasurementPublicEfuseValues,
    GetMeasurementDeviceDhPubKey,
    GetMeasurementVerifierDhPubKey,
    GetMeasurementCmfDescriptorHash,
    GetMeasurementRecordLen,
    GetMeasurementMac,

    SigmaM1Magic,
    SigmaM1BkpsDhPubKey,
    SigmaM1PufType,
    SigmaM1UserKeyChain,

    SigmaM2Magic,
    SigmaM2SdmSessionId,
    SigmaM2DeviceUniqueId,
    SigmaM2RomVersionNum,
    SigmaM2SdmFwBuildId,
    SigmaM2SdmFwSecurityVersionNum,
    SigmaM2PublicEfuseValues,
    SigmaM2DeviceDhPubKey,
    SigmaM2BkpsDhPubKey,
    SigmaM2Mac,

    SigmaM3Magic,
    SigmaM3SdmSessionId,
    SigmaM3BkpsDhPubKey,
    SigmaM3DeviceDhPubKey,
    SigmaM3Mac,

    SigmaEncMagic,
    SigmaEncSdmSessionId,
    SigmaEncMessageCounter,
    SigmaEncPayloadLen,
    SigmaEncInitialIv,
    SigmaEncPayload,
    SigmaEncMac,

    SpdmCertificateTotalLen,
    SpdmCertificateChainHash,
    SpdmCertificateChain,
}

/// A message's byte order table.
pub type RuleTable = &'static [(Field, SwapRule)];

/// Looks up `field` in `rules` and converts `bytes` for `actor`.
///
/// For [`Actor::Service`] the bytes pass through unchanged. Every rule is an
/// involution, so the same call converts wire to service layout and back.
pub fn convert(rules: RuleTable, field: Field, bytes: &[u8], actor: Actor) -> Result<Vec<u8>> {
    let rule = rule_for(rules, field)?;
    match actor {
        Actor::Service => Ok(bytes.to_vec()),
        Actor::Firmware => apply(rule, field, bytes),
    }
}

fn rule_for(rules: RuleTable, field: Field) -> Result<SwapRule> {
    rules
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, rule)| *rule)
        .ok_or(CodecError::MissingEndiannessRule { field })
}

fn apply(rule: SwapRule, field: Field, bytes: &[u8]) -> Result<Vec<u8>> {
    match rule {
        SwapRule::None => Ok(bytes.to_vec()),
        SwapRule::Swap32 => swap_windows(bytes, 4),
        SwapRule::Swap64 => swap_windows(bytes, 8),
        SwapRule::Convert => match bytes.len() {
            2 | 4 | 8 => Ok(bytes.iter().rev().copied().collect()),
            length => Err(CodecError::InvalidIntegerWidth { field, length }),
        },
    }
}

fn swap_windows(bytes: &[u8], window: usize) -> Result<Vec<u8>> {
    if bytes.len() % window != 0 {
        return Err(CodecError::InvalidSwapWindow {
            length: bytes.len(),
            window,
        });
    }
    Ok(bytes
        .chunks_exact(window)
        .flat_map(|chunk| chunk.iter().rev().copied())
        .collect())
}

/// Serializes fields in wire order, converting each through a rule table.
pub(crate) struct FieldWriter {
    rules: RuleTable,
    actor: Actor,
    out: Vec<u8>,
}

impl FieldWriter {
    pub(crate) fn new(rules: RuleTable, actor: Actor) -> Self {
        Self {
            rules,
            actor,
            out: Vec::new(),
        }
    }

    /// Appends a field that has a byte order rule.
    pub(crate) fn put(&mut self, field: Field, bytes: &[u8]) -> Result<&mut Self> {
        let converted = convert(self.rules, field, bytes, self.actor)?;
        self.out.extend_from_slice(&converted);
        Ok(self)
    }

    /// Appends bytes that are never reordered (reserved spans, single bytes).
    pub(crate) fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.out.extend_from_slice(bytes);
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.out
    }
}
