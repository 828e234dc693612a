use fpga_attestation_codec::CodecError;
use thiserror::Error;

use crate::measurement::{MeasurementKey, MeasurementValue};

pub type Result<T> = std::result::Result<T, AttestError>;

#[derive(Debug, Error)]
pub enum AttestError {
    #[error("Failed to parse device message: {0}")]
    CodecError(#[from] CodecError),
    #[error("Failed to parse reference manifest")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to parse locator URL")]
    UrlParseError(#[from] url::ParseError),
    #[error("Failed to decode evidence")]
    EvidenceDecodeError(#[from] base64::DecodeError),
    #[error("Failed to decode hex value")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("Failed to fetch locator")]
    FetchError(#[from] reqwest::Error),
    #[error("Failed to read locator file")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse certificate")]
    CertificateParseError(
        #[from] x509_parser::asn1_rs::Err<x509_parser::prelude::error::X509Error>,
    ),
    #[error("Failed to read DER value")]
    DerError(#[from] x509_parser::asn1_rs::Err<x509_parser::asn1_rs::Error>),
    #[error("Invalid ASN.1 value: {0}")]
    Asn1Error(#[from] x509_parser::asn1_rs::Error),
    #[error("Locator fetch failed: {message}, url: {url}")]
    LocatorFetchFailed { message: String, url: String },
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),
    #[error("Invalid digest size: expected 48 or 64 bytes, got {actual} bytes")]
    InvalidDigestSize { actual: usize },
    #[error("Invalid measurement block size: expected at least {expected} bytes, got {actual} bytes")]
    InvalidBlockSize { expected: usize, actual: usize },
    #[error("Measurement record not fully consumed: {remaining} bytes left")]
    TrailingMeasurementData { remaining: usize },
    #[error("Invalid TCB info: {0}")]
    InvalidTcbInfo(String),
    #[error("Invalid reference manifest: {0}")]
    InvalidManifest(String),
    #[error("Conflicting measurement for key {key:?}: existing {existing:?}, new {new:?}")]
    AggregationConflict {
        key: MeasurementKey,
        existing: MeasurementValue,
        new: MeasurementValue,
    },
    #[error("Certificate chain is not trusted")]
    UntrustedCertificateChain,
    #[error("Certificate chain is empty")]
    EmptyCertificateChain,
    #[error("Device signature verification failed")]
    SignatureVerificationFailed,
    #[error("Device MAC verification failed")]
    MacVerificationFailed,
    #[error("Verifier DH public key mismatch: expected {expected}, got {actual}")]
    VerifierKeyMismatch { expected: String, actual: String },
    #[error("Unsigned {0} is not accepted")]
    UnsignedManifest(String),
    #[error("Signature verification failed for {0}")]
    ManifestSignatureInvalid(String),
    #[error("Reference manifest signer is not trusted")]
    UntrustedManifestSigner,
    #[error("Reference manifest {manifest_id} is revoked")]
    ManifestRevoked { manifest_id: String },
    #[error("Reference manifest has no revocation list locator")]
    MissingRevocationLocator,
    #[error("Collaborator failure: {0}")]
    CollaboratorError(String),
}
