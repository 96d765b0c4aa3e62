pub mod extensions;
pub mod params;

use der::{Decode, Encode, EncodePem};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::RdnSequence;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, CertExtension, ExtendedKeyUsage, KeyUsage,
    SubjectAltName, SubjectKeyIdentifier,
};
use crate::error::{Error, Result};

/// The supported certificate signature algorithms.
///
/// Every name in the configuration vocabulary maps onto one of these; the
/// signing key family determines which of them are actually usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
    EcdsaWithSha224,
    EcdsaWithSha256,
    EcdsaWithSha384,
    EcdsaWithSha512,
    Ed25519,
}

impl SignatureAlgorithm {
    /// Resolves a case-insensitive vocabulary name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "sha256withrsa" => SignatureAlgorithm::Sha256WithRsa,
            "sha384withrsa" => SignatureAlgorithm::Sha384WithRsa,
            "sha512withrsa" => SignatureAlgorithm::Sha512WithRsa,
            "ecdsawithsha224" => SignatureAlgorithm::EcdsaWithSha224,
            "ecdsawithsha256" => SignatureAlgorithm::EcdsaWithSha256,
            "ecdsawithsha384" => SignatureAlgorithm::EcdsaWithSha384,
            "ecdsawithsha512" => SignatureAlgorithm::EcdsaWithSha512,
            "ed25519" => SignatureAlgorithm::Ed25519,
            _ => return None,
        })
    }

    /// The algorithm identifier placed in the TBS `signature` field and the
    /// outer `signatureAlgorithm` field.
    pub fn identifier(&self) -> AlgorithmIdentifierOwned {
        let oid = match self {
            SignatureAlgorithm::Sha256WithRsa => {
                const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
            }
            SignatureAlgorithm::Sha384WithRsa => {
                const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION
            }
            SignatureAlgorithm::Sha512WithRsa => {
                const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION
            }
            SignatureAlgorithm::EcdsaWithSha224 => const_oid::db::rfc5912::ECDSA_WITH_SHA_224,
            SignatureAlgorithm::EcdsaWithSha256 => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::EcdsaWithSha384 => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::EcdsaWithSha512 => const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        };
        AlgorithmIdentifierOwned {
            oid,
            parameters: None,
        }
    }
}

/// A signed X.509 certificate in parsed form.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a certificate from its DER encoding.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| Error::SigningFailed(format!("produced certificate did not parse: {e}")))?;
        Ok(Self { inner })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        Ok(self.inner.to_pem(pkcs8::LineEnding::LF)?)
    }

    pub fn subject(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.issuer
    }

    /// The serial number content bytes, big-endian.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// The decoded extension of type `E`, if present.
    pub fn extension<E: CertExtension>(&self) -> Result<Option<E>> {
        let Some(extensions) = &self.inner.tbs_certificate.extensions else {
            return Ok(None);
        };
        for ext in extensions {
            if ext.extn_id == E::OID {
                return Ok(Some(E::from_value(ext.extn_value.as_bytes())?));
            }
        }
        Ok(None)
    }

    /// The subject key identifier bytes, if the extension is present.
    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// The authority key identifier bytes, if the extension is present.
    pub fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .extension::<AuthorityKeyIdentifier>()?
            .map(|aki| aki.key_id))
    }

    /// The basic constraints, if the extension is present.
    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        self.extension::<BasicConstraints>()
    }

    /// Whether the certificate carries a CA basic constraint.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.basic_constraints(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }

    /// The key usage bit set; empty when the extension is absent.
    pub fn key_usage(&self) -> Result<extensions::FlagSet<extensions::KeyUsages>> {
        Ok(self
            .extension::<KeyUsage>()?
            .map(|ku| ku.0)
            .unwrap_or_default())
    }

    /// The extended key usages; empty when the extension is absent.
    pub fn ext_key_usage(&self) -> Result<Vec<extensions::ExtKeyUsageOption>> {
        Ok(self
            .extension::<ExtendedKeyUsage>()?
            .map(|eku| eku.usages)
            .unwrap_or_default())
    }

    /// The subject alternative names; empty when the extension is absent.
    pub fn subject_alt_name(&self) -> Result<SubjectAltName> {
        Ok(self.extension::<SubjectAltName>()?.unwrap_or_default())
    }
}
