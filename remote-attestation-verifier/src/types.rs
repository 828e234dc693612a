use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Represents attestation evidence collected from an FPGA device
///
/// This structure contains the signed GET_MEASUREMENT response and the
/// device certificate chain required to verify the authenticity and
/// integrity of the device. All fields are stored as base64 encoded strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEvidence {
    /// The GET_MEASUREMENT response exactly as returned by the device
    /// firmware, in base64 encoded format
    pub measurement_response: String,

    /// The DER certificates of the device, leaf first, each in base64
    /// encoded format
    pub certificate_chain: Vec<String>,
}

/// Outcome of comparing collected evidence against a reference manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Every reference measurement was matched.
    Ok,
    /// A reference measurement was missing or did not match.
    Fail,
    /// The reference manifest or the evidence could not be processed.
    Error,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        };
        write!(f, "{verdict}")
    }
}

/// Options for attestation
#[derive(Debug, Default, Clone)]
pub struct AttestOptions {
    /// Optional timeout for fetching nested manifests. If `None`, uses the default timeout
    pub fetch_timeout: Option<Duration>,
    /// Optional flag to follow `file://` locators. If `None`, uses the system default
    pub allow_file_locators: Option<bool>,
    /// Optional verifier DH public key the device must have echoed back
    pub expected_verifier_dh_pub_key: Option<Vec<u8>>,
    /// Optional flag to accept reference manifests and revocation lists
    /// that are not signed. If `None`, unsigned documents are rejected
    pub accept_unsigned_manifest: Option<bool>,
    /// Optional limit on the size of fetched documents, in bytes. If `None`,
    /// uses the default limit
    pub max_manifest_size: Option<u64>,
}
