use tracing::{debug, error, info, instrument, warn};

use crate::{
    aggregator::MeasurementAggregate,
    authenticator::ManifestAuthenticator,
    fetcher::ManifestFetcher,
    manifest::ReferenceManifest,
    measurement::{FieldMismatch, MeasurementKey},
    types::Verdict,
};

/// Why a verification did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The device reported nothing for an expected key.
    MissingMeasurement { key: MeasurementKey },
    /// The device reported a different value for an expected key.
    Mismatch {
        key: MeasurementKey,
        mismatch: FieldMismatch,
    },
    /// The reference manifest could not be processed.
    InvalidManifest { message: String },
}

/// Verdict of a verification together with the first failure found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub verdict: Verdict,
    pub failure: Option<VerificationFailure>,
}

impl VerificationOutcome {
    fn ok() -> Self {
        Self {
            verdict: Verdict::Ok,
            failure: None,
        }
    }

    fn fail(failure: VerificationFailure) -> Self {
        let verdict = match failure {
            VerificationFailure::InvalidManifest { .. } => Verdict::Error,
            _ => Verdict::Fail,
        };
        Self {
            verdict,
            failure: Some(failure),
        }
    }
}

/// Compares the received measurements against a reference manifest.
///
/// # Arguments
///
/// * `aggregate` - Measurements collected from the device
/// * `document` - The reference manifest
/// * `fetcher` - Used to resolve the manifest's locators and revocation lists
/// * `authenticator` - Checks the signature of every manifest
///
/// # Returns
///
/// * `Verdict::Ok` if every expected measurement was received with matching
///   values, or if the manifest expects nothing
/// * `Verdict::Fail` on the first missing or mismatching measurement
/// * `Verdict::Error` if the manifest cannot be parsed, is not authentic or
///   is revoked
pub fn verify(
    aggregate: &MeasurementAggregate,
    document: &[u8],
    fetcher: &dyn ManifestFetcher,
    authenticator: &ManifestAuthenticator,
) -> Verdict {
    verify_with_outcome(aggregate, document, fetcher, authenticator).verdict
}

/// Same as [`verify`], also reporting the first failure.
#[instrument(level = "info", name = "verify_evidence", skip_all, fields(received = aggregate.len()))]
pub fn verify_with_outcome(
    aggregate: &MeasurementAggregate,
    document: &[u8],
    fetcher: &dyn ManifestFetcher,
    authenticator: &ManifestAuthenticator,
) -> VerificationOutcome {
    let manifest = match ReferenceManifest::resolve(document, fetcher, authenticator) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Failed to process reference manifest: {e}");
            return VerificationOutcome::fail(VerificationFailure::InvalidManifest {
                message: e.to_string(),
            });
        }
    };
    compare(aggregate, &manifest)
}

/// Checks every record of `manifest` against `aggregate`, in manifest order.
pub fn compare(aggregate: &MeasurementAggregate, manifest: &ReferenceManifest) -> VerificationOutcome {
    if manifest.is_empty() {
        warn!("Reference manifest lists no expected measurements, accepting evidence");
        return VerificationOutcome::ok();
    }
    for expected in &manifest.records {
        info!(key = %expected.key, "Verifying measurement");
        debug!(expected = ?expected.value, "Expected value");
        let Some(actual) = aggregate.get(&expected.key) else {
            error!(
                key = %expected.key,
                received = %aggregate,
                "Evidence verification failed, expected measurement was not received"
            );
            return VerificationOutcome::fail(VerificationFailure::MissingMeasurement {
                key: expected.key.clone(),
            });
        };
        debug!(actual = ?actual, "Received value");
        if let Some(mismatch) = expected.value.first_mismatch(actual) {
            error!(
                key = %expected.key,
                field = mismatch.field,
                expected = %mismatch.expected,
                actual = %mismatch.actual,
                "Evidence verification failed, measurement does not match"
            );
            return VerificationOutcome::fail(VerificationFailure::Mismatch {
                key: expected.key.clone(),
                mismatch,
            });
        }
    }
    info!(verified = manifest.records.len(), "Evidence verification passed");
    VerificationOutcome::ok()
}
