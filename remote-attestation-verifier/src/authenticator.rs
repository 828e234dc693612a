//! Origin checks for reference manifests and revocation lists.
//!
//! A signed document is a COSE_Sign1 structure whose payload is the JSON
//! document. The signer's certificate chain, leaf first, travels in the
//! `x5chain` header, either protected or unprotected. Bytes that do not
//! decode as COSE_Sign1 are an unsigned document.

use ciborium::value::Value;
use coset::{CborSerializable, CoseSign1, Label, TaggedCborSerializable};
use tracing::{debug, error, info};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{
    collaborators::{ChainTrustVerifier, SignatureVerifier},
    constants::X5CHAIN_HEADER_LABEL,
    errors::{AttestError, Result},
};

/// Checks who produced a reference manifest before it is parsed.
pub struct ManifestAuthenticator<'a> {
    chain_verifier: &'a dyn ChainTrustVerifier,
    signature_verifier: &'a dyn SignatureVerifier,
    accept_unsigned: bool,
}

/// Payload of a document that passed [`ManifestAuthenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedDocument {
    pub payload: Vec<u8>,
    /// DER public key of the signer, `None` for an accepted unsigned
    /// document.
    pub signer_key: Option<Vec<u8>>,
}

impl<'a> ManifestAuthenticator<'a> {
    pub fn new(
        chain_verifier: &'a dyn ChainTrustVerifier,
        signature_verifier: &'a dyn SignatureVerifier,
        accept_unsigned: bool,
    ) -> Self {
        Self {
            chain_verifier,
            signature_verifier,
            accept_unsigned,
        }
    }

    pub fn accepts_unsigned(&self) -> bool {
        self.accept_unsigned
    }

    /// Returns the payload of a reference manifest and the key that
    /// signed it.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if:
    /// * The manifest is unsigned and unsigned manifests are not accepted
    /// * The signer chain is missing, empty or not trusted
    /// * The signature is invalid or the payload is detached
    pub fn open_manifest(&self, document: &[u8]) -> Result<AuthenticatedDocument> {
        let Some(sign1) = decode_sign1(document) else {
            self.check_unsigned_allowed("reference manifest")?;
            return Ok(AuthenticatedDocument {
                payload: document.to_vec(),
                signer_key: None,
            });
        };
        let chain = signer_chain(&sign1)?;
        if !self.chain_verifier.is_trusted(&chain) {
            error!(certificates = chain.len(), "Reference manifest signer is not trusted");
            return Err(AttestError::UntrustedManifestSigner);
        }
        let (_, leaf) = X509Certificate::from_der(&chain[0])?;
        let signer_key = leaf.public_key().raw.to_vec();
        self.check_signature(&sign1, &signer_key, "reference manifest")?;
        info!(signer = %leaf.subject(), "Reference manifest signature verified");
        Ok(AuthenticatedDocument {
            payload: payload(sign1)?,
            signer_key: Some(signer_key),
        })
    }

    /// Returns the payload of a revocation list, which must be signed with
    /// the same key as the manifest it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if the list is unsigned and unsigned documents
    /// are not accepted, or if its signature does not verify with
    /// `signer_key`.
    pub fn open_revocation_list(&self, document: &[u8], signer_key: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(sign1) = decode_sign1(document) else {
            self.check_unsigned_allowed("revocation list")?;
            return Ok(document.to_vec());
        };
        let Some(signer_key) = signer_key else {
            error!("Signed revocation list belongs to an unsigned reference manifest");
            return Err(AttestError::ManifestSignatureInvalid(
                "revocation list".to_string(),
            ));
        };
        self.check_signature(&sign1, signer_key, "revocation list")?;
        payload(sign1)
    }

    fn check_unsigned_allowed(&self, document: &'static str) -> Result<()> {
        info!(
            document,
            accept_unsigned = self.accept_unsigned,
            "Document is not signed"
        );
        if !self.accept_unsigned {
            error!(document, "Unsigned documents are not accepted");
            return Err(AttestError::UnsignedManifest(document.to_string()));
        }
        Ok(())
    }

    fn check_signature(&self, sign1: &CoseSign1, key: &[u8], document: &'static str) -> Result<()> {
        if sign1.payload.is_none() {
            error!(document, "Signed document has a detached payload");
            return Err(AttestError::InvalidManifest(format!("{document} has no payload")));
        }
        let valid = self.signature_verifier.verify_signature(
            key,
            &sign1.tbs_data(b""),
            &sign1.signature,
        )?;
        if !valid {
            error!(document, "Signature verification failed");
            return Err(AttestError::ManifestSignatureInvalid(document.to_string()));
        }
        debug!(document, "Signature verified");
        Ok(())
    }
}

fn decode_sign1(document: &[u8]) -> Option<CoseSign1> {
    CoseSign1::from_tagged_slice(document)
        .or_else(|_| CoseSign1::from_slice(document))
        .ok()
}

/// DER certificates of the `x5chain` header, leaf first.
fn signer_chain(sign1: &CoseSign1) -> Result<Vec<Vec<u8>>> {
    let x5chain = Label::Int(X5CHAIN_HEADER_LABEL);
    let value = [&sign1.protected.header, &sign1.unprotected]
        .into_iter()
        .flat_map(|header| header.rest.iter())
        .find(|(label, _)| *label == x5chain)
        .map(|(_, value)| value);
    let chain = match value {
        Some(Value::Bytes(certificate)) => vec![certificate.clone()],
        Some(Value::Array(certificates)) => certificates
            .iter()
            .map(|certificate| match certificate {
                Value::Bytes(certificate) => Ok(certificate.clone()),
                _ => Err(AttestError::InvalidManifest(
                    "x5chain entry is not a byte string".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            error!("Signed document has a malformed x5chain header");
            return Err(AttestError::InvalidManifest(
                "malformed x5chain header".to_string(),
            ));
        }
        None => {
            error!("Signed document carries no signer certificate");
            return Err(AttestError::InvalidManifest(
                "missing x5chain header".to_string(),
            ));
        }
    };
    if chain.is_empty() {
        error!("Signed document has an empty x5chain header");
        return Err(AttestError::EmptyCertificateChain);
    }
    Ok(chain)
}

fn payload(sign1: CoseSign1) -> Result<Vec<u8>> {
    sign1
        .payload
        .ok_or_else(|| AttestError::InvalidManifest("signed document has no payload".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coset::{iana, CoseSign1Builder, HeaderBuilder};

    struct Trust(bool);

    impl ChainTrustVerifier for Trust {
        fn is_trusted(&self, _chain: &[Vec<u8>]) -> bool {
            self.0
        }
    }

    /// Accepts a signature that is the signed data reversed.
    struct Reversed;

    impl SignatureVerifier for Reversed {
        fn verify_signature(&self, _public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool> {
            Ok(data.iter().rev().eq(signature.iter()))
        }
    }

    fn signed(payload: &[u8], x5chain: Option<Value>) -> CoseSign1 {
        let mut unprotected = HeaderBuilder::new();
        if let Some(x5chain) = x5chain {
            unprotected = unprotected.value(X5CHAIN_HEADER_LABEL, x5chain);
        }
        CoseSign1Builder::new()
            .protected(HeaderBuilder::new().algorithm(iana::Algorithm::ES384).build())
            .unprotected(unprotected.build())
            .payload(payload.to_vec())
            .create_signature(b"", |data| data.iter().rev().copied().collect())
            .build()
    }

    #[test]
    fn test_unsigned_document_needs_opt_in() {
        let trust = Trust(true);
        let rejecting = ManifestAuthenticator::new(&trust, &Reversed, false);
        assert!(matches!(
            rejecting.open_manifest(b"{}"),
            Err(AttestError::UnsignedManifest(_))
        ));
        assert!(matches!(
            rejecting.open_revocation_list(b"{}", None),
            Err(AttestError::UnsignedManifest(_))
        ));

        let accepting = ManifestAuthenticator::new(&trust, &Reversed, true);
        let opened = accepting.open_manifest(b"{}").unwrap();
        assert_eq!(opened.payload, b"{}");
        assert_eq!(opened.signer_key, None);
    }

    #[test]
    fn test_signed_document_without_signer_is_rejected() {
        let trust = Trust(true);
        let authenticator = ManifestAuthenticator::new(&trust, &Reversed, true);
        let document = signed(b"{}", None).to_tagged_vec().unwrap();
        assert!(matches!(
            authenticator.open_manifest(&document),
            Err(AttestError::InvalidManifest(_))
        ));
        let document = signed(b"{}", Some(Value::Array(vec![])))
            .to_vec()
            .unwrap();
        assert!(matches!(
            authenticator.open_manifest(&document),
            Err(AttestError::EmptyCertificateChain)
        ));
        let document = signed(b"{}", Some(Value::Text("cert".to_string())))
            .to_vec()
            .unwrap();
        assert!(matches!(
            authenticator.open_manifest(&document),
            Err(AttestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_untrusted_signer_is_rejected() {
        let untrusted = Trust(false);
        let authenticator = ManifestAuthenticator::new(&untrusted, &Reversed, true);
        let document = signed(b"{}", Some(Value::Bytes(vec![0x30, 0x00])))
            .to_tagged_vec()
            .unwrap();
        assert!(matches!(
            authenticator.open_manifest(&document),
            Err(AttestError::UntrustedManifestSigner)
        ));
    }

    #[test]
    fn test_revocation_list_is_checked_with_manifest_key() {
        let trust = Trust(true);
        let authenticator = ManifestAuthenticator::new(&trust, &Reversed, false);
        let list = signed(br#"{"denied-manifest-ids": []}"#, None);
        let document = list.clone().to_tagged_vec().unwrap();
        assert_eq!(
            authenticator
                .open_revocation_list(&document, Some(&b"key"[..]))
                .unwrap(),
            br#"{"denied-manifest-ids": []}"#
        );
        assert!(matches!(
            authenticator.open_revocation_list(&document, None),
            Err(AttestError::ManifestSignatureInvalid(_))
        ));

        let mut tampered = list;
        tampered.payload = Some(br#"{"denied-manifest-ids": ["x"]}"#.to_vec());
        assert!(matches!(
            authenticator.open_revocation_list(&tampered.to_tagged_vec().unwrap(), Some(&b"key"[..])),
            Err(AttestError::ManifestSignatureInvalid(_))
        ));
    }
}
