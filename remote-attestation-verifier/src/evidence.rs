use base64::{engine::general_purpose::STANDARD, Engine};
use fpga_attestation_codec::{
    Actor, GetMeasurementResponse, SigmaEncMessage, SigmaEncResponse, WireMessage,
};
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, instrument};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{
    aggregator::MeasurementAggregate,
    authenticator::ManifestAuthenticator,
    collaborators::{ChainTrustVerifier, Decryptor, MacProvider, SignatureVerifier},
    errors::{AttestError, Result},
    extractors::{CertificateExtractor, DeviceReportExtractor},
    fetcher::ManifestFetcher,
    types::{AttestOptions, DeviceEvidence, Verdict},
    verifier::verify,
};

/// Authenticates device evidence and gathers its measurements.
pub struct EvidenceCollector {
    chain_verifier: Box<dyn ChainTrustVerifier>,
    signature_verifier: Box<dyn SignatureVerifier>,
    mac_provider: Option<Box<dyn MacProvider>>,
    decryptor: Option<Box<dyn Decryptor>>,
    options: AttestOptions,
}

impl EvidenceCollector {
    pub fn new(
        chain_verifier: Box<dyn ChainTrustVerifier>,
        signature_verifier: Box<dyn SignatureVerifier>,
        options: AttestOptions,
    ) -> Self {
        Self {
            chain_verifier,
            signature_verifier,
            mac_provider: None,
            decryptor: None,
            options,
        }
    }

    /// Checks the session MAC of collected responses.
    pub fn with_mac_provider(mut self, mac_provider: Box<dyn MacProvider>) -> Self {
        self.mac_provider = Some(mac_provider);
        self
    }

    /// Opens SIGMA_ENC responses.
    pub fn with_decryptor(mut self, decryptor: Box<dyn Decryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    pub fn options(&self) -> &AttestOptions {
        &self.options
    }

    /// Checks reference manifests with the same trust anchors and signature
    /// verifier as the device evidence.
    pub fn manifest_authenticator(&self) -> ManifestAuthenticator<'_> {
        ManifestAuthenticator::new(
            self.chain_verifier.as_ref(),
            self.signature_verifier.as_ref(),
            self.options.accept_unsigned_manifest.unwrap_or(false),
        )
    }

    /// Authenticates the evidence and returns the measurements it carries.
    ///
    /// The certificate chain must be trusted, the GET_MEASUREMENT response
    /// must carry a valid signature from the leaf certificate's key and,
    /// when a MAC provider is configured, a valid session MAC. The
    /// measurements of the device report and of the certificates' TCB info
    /// extensions are then merged into a fresh aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if:
    /// * The evidence is not valid base64 or the chain is empty
    /// * The chain is not trusted
    /// * The response cannot be parsed
    /// * The signature, MAC or verifier DH public key do not match
    /// * Measurements cannot be extracted or conflict with each other
    #[instrument(level = "info", name = "collect_evidence", skip_all)]
    pub fn collect(&self, evidence: &DeviceEvidence) -> Result<MeasurementAggregate> {
        let response_bytes = STANDARD.decode(&evidence.measurement_response)?;
        let chain = evidence
            .certificate_chain
            .iter()
            .map(|cert| STANDARD.decode(cert))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let Some(leaf) = chain.first() else {
            error!("Device evidence has no certificates");
            return Err(AttestError::EmptyCertificateChain);
        };
        if !self.chain_verifier.is_trusted(&chain) {
            error!(certificates = chain.len(), "Device certificate chain is not trusted");
            return Err(AttestError::UntrustedCertificateChain);
        }

        let response = GetMeasurementResponse::parse(&response_bytes, Actor::Firmware)?;
        self.verify_signature(leaf, &response)?;
        if let Some(mac_provider) = &self.mac_provider {
            verify_mac(mac_provider.as_ref(), &response.macable_bytes()?, &response.mac)?;
        }
        if let Some(expected) = &self.options.expected_verifier_dh_pub_key {
            if *expected != response.verifier_dh_pub_key {
                error!("Device echoed a different verifier DH public key");
                return Err(AttestError::VerifierKeyMismatch {
                    expected: hex::encode(expected),
                    actual: hex::encode(&response.verifier_dh_pub_key),
                });
            }
        }

        let mut aggregate = MeasurementAggregate::new();
        aggregate.add(DeviceReportExtractor::map(&response)?)?;
        for cert in &chain {
            aggregate.add(CertificateExtractor::map(cert)?)?;
        }
        info!(
            measurements = aggregate.len(),
            sdm_session_id = response.header.sdm_session_id,
            "Collected device measurements"
        );
        Ok(aggregate)
    }

    /// Authenticates a SIGMA_ENC response and returns its plaintext, without
    /// the padding. Returns `None` for a header-only response.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if no decryptor is configured, the MAC does not
    /// match, or the padding exceeds the decrypted payload.
    #[instrument(level = "debug", name = "open_sigma_enc", skip_all)]
    pub fn open(&self, response: &SigmaEncResponse) -> Result<Option<Vec<u8>>> {
        let SigmaEncResponse::WithEncryptedResponse(message) = response else {
            debug!(
                sdm_session_id = response.sdm_session_id(),
                "SIGMA_ENC response has no payload"
            );
            return Ok(None);
        };
        self.decrypt(message).map(Some)
    }

    fn decrypt(&self, message: &SigmaEncMessage) -> Result<Vec<u8>> {
        let decryptor = self.decryptor.as_ref().ok_or_else(|| {
            error!("No decryptor configured for SIGMA_ENC responses");
            AttestError::CollaboratorError("no decryptor configured".to_string())
        })?;
        if let Some(mac_provider) = &self.mac_provider {
            verify_mac(mac_provider.as_ref(), &message.macable_bytes()?, &message.mac)?;
        }
        let mut plaintext = decryptor.decrypt(&message.initial_iv, &message.encrypted_payload)?;
        let padding = usize::from(message.number_of_padding_bytes);
        let Some(len) = plaintext.len().checked_sub(padding) else {
            error!(
                padding,
                len = plaintext.len(),
                "SIGMA_ENC padding exceeds the decrypted payload"
            );
            return Err(AttestError::InvalidMeasurement(format!(
                "padding of {padding} bytes exceeds payload of {} bytes",
                plaintext.len()
            )));
        };
        plaintext.truncate(len);
        Ok(plaintext)
    }

    fn verify_signature(&self, leaf: &[u8], response: &GetMeasurementResponse) -> Result<()> {
        let (_, cert) = X509Certificate::from_der(leaf)?;
        let public_key = cert.public_key().raw;
        let valid = self.signature_verifier.verify_signature(
            public_key,
            &response.signable_bytes()?,
            &response.signature.raw_signature(),
        )?;
        if !valid {
            error!(subject = %cert.subject(), "Device signature verification failed");
            return Err(AttestError::SignatureVerificationFailed);
        }
        debug!(subject = %cert.subject(), "Device signature verified");
        Ok(())
    }
}

fn verify_mac(mac_provider: &dyn MacProvider, data: &[u8], mac: &[u8]) -> Result<()> {
    let computed = mac_provider.compute_mac(data)?;
    if !bool::from(computed.as_slice().ct_eq(mac)) {
        error!(
            expected = %hex::encode(mac),
            computed = %hex::encode(&computed),
            "Device MAC verification failed"
        );
        return Err(AttestError::MacVerificationFailed);
    }
    Ok(())
}

/// Collects the device's measurements and verifies them against a
/// reference manifest.
///
/// Evidence that cannot be authenticated or decoded yields
/// `Verdict::Error`; the error is logged. The manifest is checked by the
/// collector's [`EvidenceCollector::manifest_authenticator`].
///
/// # Example
///
/// ```rust,ignore
/// use remote_attestation_verifier::{attest, AttestOptions, EvidenceCollector, LocatorFetcher};
///
/// let options = AttestOptions::default();
/// let fetcher = LocatorFetcher::new(&options)?;
/// let collector = EvidenceCollector::new(chain_verifier, signature_verifier, options);
/// let verdict = attest(&evidence, manifest.as_bytes(), &collector, &fetcher)?;
/// ```
#[instrument(level = "info", name = "attest", skip_all)]
pub fn attest(
    evidence: &DeviceEvidence,
    reference_document: &[u8],
    collector: &EvidenceCollector,
    fetcher: &dyn ManifestFetcher,
) -> Result<Verdict> {
    let aggregate = match collector.collect(evidence) {
        Ok(aggregate) => aggregate,
        Err(e) => {
            error!("Failed to collect device evidence: {e}");
            return Ok(Verdict::Error);
        }
    };
    let authenticator = collector.manifest_authenticator();
    let verdict = verify(&aggregate, reference_document, fetcher, &authenticator);
    info!(verdict = %verdict, "Attestation finished");
    Ok(verdict)
}
