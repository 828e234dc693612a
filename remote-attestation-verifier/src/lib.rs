//! Remote attestation verifier for FPGA devices
//!
//! This crate authenticates the evidence returned by an FPGA secure device
//! manager, turns its measurement record and DICE certificates into
//! canonical measurements, and compares them against a reference manifest
//! whose signature and revocation status have been checked.

pub mod aggregator;
pub mod authenticator;
pub mod collaborators;
pub mod constants;
pub mod errors;
pub mod evidence;
pub mod extractors;
pub mod fetcher;
pub mod manifest;
pub mod measurement;
pub mod types;
pub mod utils;
pub mod verifier;

pub use aggregator::MeasurementAggregate;
pub use authenticator::{AuthenticatedDocument, ManifestAuthenticator};
pub use collaborators::{ChainTrustVerifier, Decryptor, MacProvider, SignatureVerifier};
pub use errors::{AttestError, Result};
pub use evidence::{attest, EvidenceCollector};
pub use extractors::{CertificateExtractor, DeviceReportExtractor, SpdmMeasurementExtractor};
pub use fetcher::{FileFetcher, HttpFetcher, LocatorFetcher, ManifestFetcher};
pub use manifest::ReferenceManifest;
pub use measurement::{Fwid, MaskedVendorInfo, MeasurementKey, MeasurementRecord, MeasurementValue};
pub use types::{AttestOptions, DeviceEvidence, Verdict};
pub use verifier::{verify, verify_with_outcome, VerificationFailure, VerificationOutcome};
