//! use certforge::error::Error;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while resolving and signing a
/// certificate configuration.
///
/// Every variant is a deterministic configuration or signing failure; none
/// of them is transient and none is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The purpose tag is not one of the known presets.
    #[error("invalid purpose: {0}")]
    InvalidPurpose(String),

    /// A validity timestamp matched none of the accepted formats.
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// A key usage name is not in the vocabulary.
    #[error("invalid key usage: {0}")]
    InvalidKeyUsage(String),

    /// An extended key usage name is not in the vocabulary.
    #[error("invalid extended key usage: {0}")]
    InvalidExtKeyUsage(String),

    /// The explicit serial number did not parse as a hex integer.
    #[error("invalid serial number: {0}")]
    InvalidSerialNumber(String),

    /// An explicit subject or authority key identifier did not decode.
    #[error("invalid key identifier: {0}")]
    InvalidKeyIdentifier(String),

    /// The signature algorithm name is not in the vocabulary.
    #[error("invalid signature algorithm: {0}")]
    InvalidSignatureAlgorithm(String),

    /// Subject fields could not be encoded as a distinguished name.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// A subject-alternative-name IP address did not parse.
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// An RSA selector carried a bit length outside the accepted range.
    #[error("invalid RSA key size: {0}")]
    InvalidKeySize(String),

    /// The key algorithm selector names no supported family.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// A parent reference names no entry in the store.
    #[error("failed to find cert named {0}")]
    CertificateNotFound(String),

    /// The ancestor walk from an entry did not reach a root within the
    /// bounded number of hops.
    #[error("failed to find root cert for {0} (chain too long)")]
    ChainTooLong(String),

    /// The underlying signing primitive rejected the operation.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Error::SigningFailed(err.to_string())
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Self {
        Error::SigningFailed(err.to_string())
    }
}

impl From<x509_cert::spki::Error> for Error {
    fn from(err: x509_cert::spki::Error) -> Self {
        Error::SigningFailed(err.to_string())
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Self {
        Error::SigningFailed(err.to_string())
    }
}
