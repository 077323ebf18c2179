// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! SSL pinning
//!
//! [`PinningValidator`] makes the trust decision for a leaf certificate.
//! [`PinnedCertVerifier`] plugs it into the rustls handshake so a mismatch
//! aborts the connection before any request bytes are written.

use std::sync::Arc;

use base64::Engine;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, OtherError, SignatureScheme};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Pinning;

/// ASN.1 SubjectPublicKeyInfo prefix for an RSA-2048 key
pub const RSA_2048_ASN1_HEADER: [u8; 24] = [
    0x30, 0x82, 0x01, 0x22, 0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01,
    0x01, 0x05, 0x00, 0x03, 0x82, 0x01, 0x0f, 0x00,
];

/// Outcome of a pin check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinDecision {
    Trust,
    Reject(String),
}

/// Error carried through rustls when a pin check fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("certificate pin mismatch for {host}: {reason}")]
pub struct PinMismatch {
    pub host: String,
    pub reason: String,
}

/// Base64 SHA-256 over the RSA-2048 header followed by the raw key bytes
pub fn public_key_hash(raw_key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(RSA_2048_ASN1_HEADER);
    hasher.update(raw_key);
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Raw subject public key bytes of a DER certificate
pub fn leaf_public_key(der: &[u8]) -> Result<Vec<u8>, String> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| format!("unparseable certificate: {}", e))?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Trust decision for a leaf certificate against the configured pin
#[derive(Debug, Clone)]
pub struct PinningValidator {
    pinning: Pinning,
}

impl PinningValidator {
    pub fn new(pinning: Pinning) -> Self {
        Self { pinning }
    }

    /// Evaluate the leaf certificate (DER)
    pub fn evaluate(&self, leaf_der: &[u8]) -> PinDecision {
        match &self.pinning {
            Pinning::PublicKeyHash(expected) => {
                let raw_key = match leaf_public_key(leaf_der) {
                    Ok(key) => key,
                    Err(reason) => return PinDecision::Reject(reason),
                };
                let actual = public_key_hash(&raw_key);
                if constant_time_eq(actual.as_bytes(), expected.trim().as_bytes()) {
                    PinDecision::Trust
                } else {
                    PinDecision::Reject(format!("public key hash {} does not match", actual))
                }
            }
            Pinning::Certificate(reference) => {
                if constant_time_eq(leaf_der, reference) {
                    PinDecision::Trust
                } else {
                    PinDecision::Reject("certificate does not match the bundled one".to_string())
                }
            }
        }
    }
}

/// rustls verifier that trusts exactly the pinned peer
#[derive(Debug)]
pub struct PinnedCertVerifier {
    validator: PinningValidator,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    pub fn new(validator: PinningValidator, provider: Arc<CryptoProvider>) -> Self {
        Self {
            validator,
            provider,
        }
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let host = server_name.to_str().into_owned();
        match self.validator.evaluate(end_entity.as_ref()) {
            PinDecision::Trust => {
                debug!(host = %host, "certificate pin matched");
                Ok(ServerCertVerified::assertion())
            }
            PinDecision::Reject(reason) => {
                warn!(host = %host, reason = %reason, "certificate pin rejected");
                Err(rustls::Error::Other(OtherError(Arc::new(PinMismatch {
                    host,
                    reason,
                }))))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
