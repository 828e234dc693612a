//! Reference manifest parsing and locator resolution.
//!
//! A manifest is a JSON document, optionally wrapped in a COSE_Sign1
//! signature, listing the measurements a device is expected to report. It
//! may point to further manifests through `locators`; those are fetched
//! level by level and their measurements are appended after the ones of the
//! referencing document. A `revocation-locator` points to the list of
//! manifest ids that must no longer be used.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::{
    authenticator::ManifestAuthenticator,
    constants::{MAX_LOCATOR_FETCHES, MAX_NESTED_LOCATORS_DEPTH},
    errors::{AttestError, Result},
    fetcher::ManifestFetcher,
    measurement::{Fwid, MaskedVendorInfo, MeasurementKey, MeasurementRecord, MeasurementValue},
    utils::normalize_hex,
};

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(rename = "manifest-id")]
    manifest_id: Option<String>,
    #[serde(default)]
    locators: Vec<String>,
    #[serde(rename = "revocation-locator")]
    revocation_locator: Option<String>,
    #[serde(rename = "reference-triples", default)]
    reference_triples: Vec<ReferenceTriple>,
    #[serde(rename = "endorsed-triples", default)]
    endorsed_triples: Vec<ReferenceTriple>,
}

#[derive(Debug, Deserialize)]
struct ReferenceTriple {
    environment: Environment,
    #[serde(default)]
    measurement: ReferenceMeasurement,
}

#[derive(Debug, Deserialize)]
struct Environment {
    vendor: Option<String>,
    model: Option<String>,
    layer: Option<i64>,
    index: Option<i64>,
    #[serde(rename = "type")]
    measurement_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceMeasurement {
    version: Option<String>,
    svn: Option<i64>,
    #[serde(default)]
    digests: Vec<Digest>,
    #[serde(rename = "raw-value")]
    raw_value: Option<String>,
    #[serde(rename = "raw-value-mask")]
    raw_value_mask: Option<String>,
    flags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Digest {
    alg: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RevocationList {
    #[serde(rename = "denied-manifest-ids", default)]
    denied_manifest_ids: Vec<String>,
}

/// Expected measurements, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceManifest {
    pub manifest_id: Option<String>,
    pub records: Vec<MeasurementRecord>,
    /// Measurements the vendor endorses. They are reported, not compared.
    pub endorsed: Vec<MeasurementRecord>,
}

/// A parsed document and the locators it points to.
struct ParsedDocument {
    manifest: ReferenceManifest,
    locators: Vec<String>,
    revocation_locator: Option<String>,
}

impl ReferenceManifest {
    /// Parses a single unsigned document without following its locators.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if the document is not valid JSON, holds an
    /// empty string, a value that is not hex, or more than one digest for a
    /// measurement.
    pub fn parse(document: &[u8]) -> Result<Self> {
        Ok(Self::parse_document(document)?.manifest)
    }

    /// Authenticates and parses a document, then appends the measurements
    /// of every manifest reachable through its locators.
    ///
    /// Each document must pass `authenticator` and must not be listed by
    /// its revocation list. Nested manifests are resolved breadth first for
    /// at most [`MAX_NESTED_LOCATORS_DEPTH`] levels. A locator repeated
    /// within a level is followed once and no more than
    /// [`MAX_LOCATOR_FETCHES`] locators are followed overall. A nested
    /// manifest that cannot be fetched, authenticated or decoded is logged
    /// and not expanded further, as is anything beyond the limits.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if the top-level document is invalid, not
    /// authentic or revoked.
    #[instrument(level = "info", name = "resolve_manifest", skip_all)]
    pub fn resolve(
        document: &[u8],
        fetcher: &dyn ManifestFetcher,
        authenticator: &ManifestAuthenticator,
    ) -> Result<Self> {
        let ParsedDocument {
            mut manifest,
            locators: mut pending,
            ..
        } = open_document(document, fetcher, authenticator)?;
        let mut depth = 0;
        let mut fetches = 0;
        'levels: while !pending.is_empty() {
            if depth == MAX_NESTED_LOCATORS_DEPTH {
                warn!(
                    depth,
                    skipped = pending.len(),
                    "Maximum nested locator depth reached, not following remaining locators"
                );
                break;
            }
            depth += 1;
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for locator in pending {
                let url = match Url::parse(&locator) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(depth, locator = %locator, "Not following invalid locator: {e}");
                        continue;
                    }
                };
                if !seen.insert(url.clone()) {
                    debug!(depth, url = %url, "Locator already followed at this level");
                    continue;
                }
                if fetches == MAX_LOCATOR_FETCHES {
                    warn!(
                        depth,
                        fetches,
                        "Maximum number of locator fetches reached, not following remaining locators"
                    );
                    break 'levels;
                }
                fetches += 1;
                match fetch_nested(&url, fetcher, authenticator) {
                    Ok(nested) => {
                        debug!(
                            depth,
                            url = %url,
                            records = nested.manifest.records.len(),
                            "Resolved nested manifest"
                        );
                        manifest.records.extend(nested.manifest.records);
                        manifest.endorsed.extend(nested.manifest.endorsed);
                        next.extend(nested.locators);
                    }
                    Err(e) => {
                        warn!(depth, url = %url, "Not following locator: {e}");
                    }
                }
            }
            pending = next;
        }
        info!(
            manifest_id = ?manifest.manifest_id,
            records = manifest.records.len(),
            endorsed = manifest.endorsed.len(),
            depth,
            fetches,
            "Resolved reference manifest"
        );
        if !manifest.endorsed.is_empty() {
            debug!(endorsed = ?manifest.endorsed, "Endorsed measurements");
        }
        Ok(manifest)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parse_document(document: &[u8]) -> Result<ParsedDocument> {
        let document: ManifestDocument = serde_json::from_slice(document).map_err(|e| {
            error!("Failed to parse reference manifest: {e}");
            AttestError::JsonError(e)
        })?;
        let manifest_id = document
            .manifest_id
            .map(|id| non_empty("manifest-id", id))
            .transpose()?;
        let records = document
            .reference_triples
            .into_iter()
            .map(ReferenceTriple::into_record)
            .collect::<Result<Vec<_>>>()?;
        let endorsed = document
            .endorsed_triples
            .into_iter()
            .map(ReferenceTriple::into_record)
            .collect::<Result<Vec<_>>>()?;
        Ok(ParsedDocument {
            manifest: Self {
                manifest_id,
                records,
                endorsed,
            },
            locators: document.locators,
            revocation_locator: document.revocation_locator,
        })
    }
}

fn open_document(
    document: &[u8],
    fetcher: &dyn ManifestFetcher,
    authenticator: &ManifestAuthenticator,
) -> Result<ParsedDocument> {
    let opened = authenticator.open_manifest(document)?;
    let parsed = ReferenceManifest::parse_document(&opened.payload)?;
    check_revocation(&parsed, opened.signer_key.as_deref(), fetcher, authenticator)?;
    Ok(parsed)
}

fn fetch_nested(
    url: &Url,
    fetcher: &dyn ManifestFetcher,
    authenticator: &ManifestAuthenticator,
) -> Result<ParsedDocument> {
    let body = fetcher.fetch(url)?;
    open_document(&body, fetcher, authenticator)
}

/// Fails if the revocation list of `parsed` denies its manifest id.
///
/// A manifest without a revocation locator is only accepted when unsigned
/// documents are.
fn check_revocation(
    parsed: &ParsedDocument,
    signer_key: Option<&[u8]>,
    fetcher: &dyn ManifestFetcher,
    authenticator: &ManifestAuthenticator,
) -> Result<()> {
    let Some(locator) = &parsed.revocation_locator else {
        if authenticator.accepts_unsigned() {
            info!("Reference manifest has no revocation list locator, skipping revocation check");
            return Ok(());
        }
        error!("Reference manifest has no revocation list locator");
        return Err(AttestError::MissingRevocationLocator);
    };
    let url = Url::parse(locator)?;
    info!(url = %url, "Fetching revocation list");
    let document = fetcher.fetch(&url)?;
    let payload = authenticator.open_revocation_list(&document, signer_key)?;
    let list: RevocationList = serde_json::from_slice(&payload).map_err(|e| {
        error!(url = %url, "Failed to parse revocation list: {e}");
        AttestError::JsonError(e)
    })?;
    if let Some(manifest_id) = &parsed.manifest.manifest_id {
        if list.denied_manifest_ids.contains(manifest_id) {
            error!(manifest_id = %manifest_id, "Reference manifest is revoked");
            return Err(AttestError::ManifestRevoked {
                manifest_id: manifest_id.clone(),
            });
        }
    }
    info!(
        manifest_id = ?parsed.manifest.manifest_id,
        denied = list.denied_manifest_ids.len(),
        "Reference manifest is not revoked"
    );
    Ok(())
}

impl ReferenceTriple {
    fn into_record(self) -> Result<MeasurementRecord> {
        let Environment {
            vendor,
            model,
            layer,
            index,
            measurement_type,
        } = self.environment;
        let key = MeasurementKey {
            vendor: vendor
                .map(|vendor| non_empty("vendor", vendor))
                .transpose()?
                .unwrap_or_default(),
            model: model.map(|model| non_empty("model", model)).transpose()?,
            layer: layer.unwrap_or_default(),
            index: index.unwrap_or_default(),
            measurement_type: measurement_type
                .map(|oid| non_empty("type", oid))
                .transpose()?,
        };
        Ok(MeasurementRecord::new(key, self.measurement.into_value()?))
    }
}

impl ReferenceMeasurement {
    fn into_value(self) -> Result<MeasurementValue> {
        if self.digests.len() > 1 {
            error!(digests = self.digests.len(), "Reference measurement holds more than one digest");
            return Err(AttestError::InvalidManifest(format!(
                "expected at most one digest, got {}",
                self.digests.len()
            )));
        }
        let fwid = self
            .digests
            .into_iter()
            .next()
            .map(|digest| {
                let alg = non_empty("digests.alg", digest.alg)?;
                let value = hex_value("digests.value", digest.value)?;
                Ok::<_, AttestError>(Fwid::new(alg, &value))
            })
            .transpose()?;
        let masked_vendor_info = match (self.raw_value, self.raw_value_mask) {
            (Some(value), mask) => {
                let value = hex_digits("raw-value", value)?;
                let mask = mask.map(|mask| hex_digits("raw-value-mask", mask)).transpose()?;
                Some(MaskedVendorInfo::new(&value, mask.as_deref()))
            }
            (None, Some(_)) => {
                error!("Reference measurement holds a mask without a raw value");
                return Err(AttestError::InvalidManifest(
                    "raw-value-mask without raw-value".to_string(),
                ));
            }
            (None, None) => None,
        };
        Ok(MeasurementValue {
            version: self
                .version
                .map(|version| non_empty("version", version))
                .transpose()?,
            svn: self.svn,
            fwid,
            flags: self.flags.map(|flags| hex_value("flags", flags)).transpose()?,
            masked_vendor_info,
        })
    }
}

fn non_empty(field: &str, value: String) -> Result<String> {
    if value.is_empty() {
        error!(field, "Reference manifest holds an empty value");
        return Err(AttestError::InvalidManifest(format!("empty value for {field}")));
    }
    Ok(value)
}

fn hex_value(field: &str, value: String) -> Result<String> {
    let value = non_empty(field, value)?;
    hex::decode(&value).map_err(|e| {
        error!(field, value = %value, "Reference manifest holds an invalid hex value");
        AttestError::HexDecodeError(e)
    })?;
    Ok(normalize_hex(&value))
}

/// Like [`hex_value`], but any number of digits is fine.
fn hex_digits(field: &str, value: String) -> Result<String> {
    let value = non_empty(field, value)?;
    if let Some((index, c)) = value.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        error!(field, value = %value, "Reference manifest holds an invalid hex value");
        return Err(AttestError::HexDecodeError(
            hex::FromHexError::InvalidHexCharacter { c, index },
        ));
    }
    Ok(normalize_hex(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ChainTrustVerifier, SignatureVerifier};
    use std::{cell::RefCell, collections::HashMap};

    struct NoFetch;

    impl ManifestFetcher for NoFetch {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
            Err(AttestError::LocatorFetchFailed {
                message: "unreachable".to_string(),
                url: url.to_string(),
            })
        }
    }

    /// Serves fixed documents and records every fetched URL.
    #[derive(Default)]
    struct Documents {
        bodies: HashMap<String, String>,
        fetched: RefCell<Vec<String>>,
    }

    impl Documents {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), body.to_string());
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetched.borrow().len()
        }
    }

    impl ManifestFetcher for Documents {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(url.to_string());
            self.bodies
                .get(url.as_str())
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| AttestError::LocatorFetchFailed {
                    message: "not found".to_string(),
                    url: url.to_string(),
                })
        }
    }

    /// Every document points to two new ones.
    #[derive(Default)]
    struct Fanout {
        calls: RefCell<usize>,
    }

    impl ManifestFetcher for Fanout {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
            *self.calls.borrow_mut() += 1;
            let body = serde_json::json!({
                "locators": [format!("{url}/a"), format!("{url}/b")],
                "reference-triples": [{"environment": {"vendor": "V"}}]
            });
            Ok(serde_json::to_vec(&body)?)
        }
    }

    struct Untrusted;

    impl ChainTrustVerifier for Untrusted {
        fn is_trusted(&self, _chain: &[Vec<u8>]) -> bool {
            false
        }
    }

    struct NoSignature;

    impl SignatureVerifier for NoSignature {
        fn verify_signature(&self, _public_key: &[u8], _data: &[u8], _signature: &[u8]) -> Result<bool> {
            Ok(false)
        }
    }

    fn resolve(document: &str, fetcher: &dyn ManifestFetcher) -> Result<ReferenceManifest> {
        let authenticator = ManifestAuthenticator::new(&Untrusted, &NoSignature, true);
        ReferenceManifest::resolve(document.as_bytes(), fetcher, &authenticator)
    }

    fn resolve_signed_only(document: &str, fetcher: &dyn ManifestFetcher) -> Result<ReferenceManifest> {
        let authenticator = ManifestAuthenticator::new(&Untrusted, &NoSignature, false);
        ReferenceManifest::resolve(document.as_bytes(), fetcher, &authenticator)
    }

    const MANIFEST: &str = r#"{
        "manifest-id": "design-1",
        "reference-triples": [
            {
                "environment": {"vendor": "intel.com", "layer": 2, "type": "2.16.840.1.113741.1.15.4.2"},
                "measurement": {"digests": [{"alg": "2.16.840.1.101.3.4.2.2", "value": "ab01"}]}
            },
            {
                "environment": {"vendor": "intel.com", "layer": 2, "type": "2.16.840.1.113741.1.15.4.1"},
                "measurement": {"raw-value": "00000000", "raw-value-mask": "ffffffff", "unknown": 1}
            }
        ],
        "endorsed-triples": [
            {"environment": {"vendor": "intel.com", "layer": 0}, "measurement": {"svn": 3}}
        ],
        "signature": "ignored"
    }"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = ReferenceManifest::parse(MANIFEST.as_bytes()).unwrap();
        assert_eq!(manifest.manifest_id.as_deref(), Some("design-1"));
        assert_eq!(manifest.records.len(), 2);
        assert_eq!(manifest.records[0].value.fwid.as_ref().unwrap().digest, "AB01");
        let info = manifest.records[1].value.masked_vendor_info.as_ref().unwrap();
        assert_eq!(info.mask, "FFFFFFFF");
        assert_eq!(manifest.records[1].key.index, 0);
        assert_eq!(manifest.endorsed.len(), 1);
        assert_eq!(manifest.endorsed[0].value.svn, Some(3));
    }

    #[test]
    fn test_empty_document() {
        assert!(ReferenceManifest::parse(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_empty_string_is_rejected() {
        let document = r#"{"reference-triples": [{"environment": {"vendor": ""}}]}"#;
        assert!(matches!(
            ReferenceManifest::parse(document.as_bytes()),
            Err(AttestError::InvalidManifest(_))
        ));
        let document =
            r#"{"reference-triples": [{"environment": {"vendor": "V"}, "measurement": {"raw-value": ""}}]}"#;
        assert!(matches!(
            ReferenceManifest::parse(document.as_bytes()),
            Err(AttestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_multiple_digests_are_rejected() {
        let document = r#"{"reference-triples": [{"environment": {"vendor": "V"},
            "measurement": {"digests": [{"alg": "a", "value": "AA"}, {"alg": "b", "value": "BB"}]}}]}"#;
        assert!(matches!(
            ReferenceManifest::parse(document.as_bytes()),
            Err(AttestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_invalid_hex_is_rejected() {
        let document = r#"{"reference-triples": [{"environment": {"vendor": "V"},
            "measurement": {"raw-value": "XYZ0"}}]}"#;
        assert!(matches!(
            ReferenceManifest::parse(document.as_bytes()),
            Err(AttestError::HexDecodeError(_))
        ));
        let document = r#"{"reference-triples": [{"environment": {"vendor": "V"},
            "measurement": {"digests": [{"alg": "a", "value": "ABC"}]}}]}"#;
        assert!(matches!(
            ReferenceManifest::parse(document.as_bytes()),
            Err(AttestError::HexDecodeError(_))
        ));
    }

    #[test]
    fn test_odd_length_vendor_info_is_accepted() {
        let document = r#"{"reference-triples": [{"environment": {"vendor": "V"},
            "measurement": {"raw-value": "1234", "raw-value-mask": "fff"}}]}"#;
        let manifest = ReferenceManifest::parse(document.as_bytes()).unwrap();
        let info = manifest.records[0].value.masked_vendor_info.as_ref().unwrap();
        assert_eq!(info.value, "123");
        assert_eq!(info.mask, "FFF");
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            ReferenceManifest::parse(b"{\"reference-triples\": ["),
            Err(AttestError::JsonError(_))
        ));
    }

    #[test]
    fn test_nested_locator_records_are_appended() {
        let root = r#"{"locators": ["https://rim.example.com/child.json"],
            "reference-triples": [{"environment": {"vendor": "root"}}]}"#;
        let fetcher = Documents::default().with(
            "https://rim.example.com/child.json",
            r#"{"reference-triples": [{"environment": {"vendor": "child"}}],
                "endorsed-triples": [{"environment": {"vendor": "endorsed"}}]}"#,
        );
        let manifest = resolve(root, &fetcher).unwrap();
        let vendors: Vec<_> = manifest.records.iter().map(|r| r.key.vendor.as_str()).collect();
        assert_eq!(vendors, ["root", "child"]);
        assert_eq!(manifest.endorsed[0].key.vendor, "endorsed");
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn test_self_referencing_locator_stops_at_max_depth() {
        let document = r#"{"locators": ["https://rim.example.com/self.json"],
            "reference-triples": [{"environment": {"vendor": "V"}}]}"#;
        let fetcher = Documents::default().with("https://rim.example.com/self.json", document);
        let manifest = resolve(document, &fetcher).unwrap();
        assert_eq!(fetcher.fetch_count(), MAX_NESTED_LOCATORS_DEPTH);
        assert_eq!(manifest.records.len(), MAX_NESTED_LOCATORS_DEPTH + 1);
    }

    #[test]
    fn test_repeated_locators_are_fetched_once_per_level() {
        let document = r#"{"locators": ["https://rim.example.com/self.json",
                "https://rim.example.com/self.json", "https://rim.example.com/./self.json"],
            "reference-triples": [{"environment": {"vendor": "V"}}]}"#;
        let fetcher = Documents::default().with("https://rim.example.com/self.json", document);
        let manifest = resolve(document, &fetcher).unwrap();
        assert_eq!(fetcher.fetch_count(), MAX_NESTED_LOCATORS_DEPTH);
        assert_eq!(manifest.records.len(), MAX_NESTED_LOCATORS_DEPTH + 1);
    }

    #[test]
    fn test_locator_fetches_are_bounded() {
        let document = r#"{"locators": ["https://rim.example.com/root"],
            "reference-triples": [{"environment": {"vendor": "V"}}]}"#;
        let fetcher = Fanout::default();
        let manifest = resolve(document, &fetcher).unwrap();
        assert_eq!(*fetcher.calls.borrow(), MAX_LOCATOR_FETCHES);
        assert_eq!(manifest.records.len(), MAX_LOCATOR_FETCHES + 1);
    }

    #[test]
    fn test_failed_locator_is_skipped() {
        let document = r#"{"locators": ["https://rim.example.com/gone.json", "not a url"],
            "reference-triples": [{"environment": {"vendor": "V"}}]}"#;
        let manifest = resolve(document, &NoFetch).unwrap();
        assert_eq!(manifest.records.len(), 1);
    }

    #[test]
    fn test_unsigned_manifest_is_rejected_unless_accepted() {
        assert!(matches!(
            resolve_signed_only(MANIFEST, &NoFetch),
            Err(AttestError::UnsignedManifest(_))
        ));
        assert!(resolve(MANIFEST, &NoFetch).is_ok());
    }

    #[test]
    fn test_revoked_manifest_is_rejected() {
        let document = r#"{"manifest-id": "design-1",
            "revocation-locator": "https://rim.example.com/revoked.json",
            "reference-triples": [{"environment": {"vendor": "V"}}]}"#;
        let revoked = Documents::default().with(
            "https://rim.example.com/revoked.json",
            r#"{"denied-manifest-ids": ["design-0", "design-1"]}"#,
        );
        assert!(matches!(
            resolve(document, &revoked),
            Err(AttestError::ManifestRevoked { manifest_id }) if manifest_id == "design-1"
        ));

        let current = Documents::default().with(
            "https://rim.example.com/revoked.json",
            r#"{"denied-manifest-ids": ["design-0"]}"#,
        );
        assert_eq!(resolve(document, &current).unwrap().records.len(), 1);

        assert!(matches!(
            resolve(document, &NoFetch),
            Err(AttestError::LocatorFetchFailed { .. })
        ));
    }

    #[test]
    fn test_revoked_nested_manifest_is_skipped() {
        let root = r#"{"locators": ["https://rim.example.com/child.json"],
            "reference-triples": [{"environment": {"vendor": "root"}}]}"#;
        let fetcher = Documents::default()
            .with(
                "https://rim.example.com/child.json",
                r#"{"manifest-id": "child", "revocation-locator": "https://rim.example.com/x.json",
                    "reference-triples": [{"environment": {"vendor": "child"}}]}"#,
            )
            .with("https://rim.example.com/x.json", r#"{"denied-manifest-ids": ["child"]}"#);
        let manifest = resolve(root, &fetcher).unwrap();
        assert_eq!(manifest.records.len(), 1);
        assert_eq!(
            *fetcher.fetched.borrow(),
            ["https://rim.example.com/child.json", "https://rim.example.com/x.json"]
        );
    }

    #[test]
    fn test_missing_revocation_locator_needs_unsigned_opt_in() {
        let authenticator = ManifestAuthenticator::new(&Untrusted, &NoSignature, false);
        let parsed = ReferenceManifest::parse_document(MANIFEST.as_bytes()).unwrap();
        assert!(matches!(
            check_revocation(&parsed, Some(b"key".as_slice()), &NoFetch, &authenticator),
            Err(AttestError::MissingRevocationLocator)
        ));
    }
}
