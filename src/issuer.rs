//! The signing engine: turns a resolved template plus an issuer identity
//! into a signed certificate.
//!
//! The issuer is always passed explicitly, including the key identifier the
//! child's authority-key-identifier extension derives from. An explicit AKI
//! override in the template applies to that one signature only; the issuer
//! value handed in is never modified.

use der::Encode;
use der::asn1::{BitString, GeneralizedTime, UtcTime};
use time::OffsetDateTime;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner, Version};
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertExtension,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::SigningTemplate;
use crate::error::{Error, Result};
use crate::key::KeyPair;

/// The identity a certificate is signed under: the issuer's subject name,
/// signing key, and subject key identifier.
#[derive(Debug)]
pub struct IssuerIdentity<'a> {
    pub name: RdnSequence,
    pub key: &'a KeyPair,
    pub key_id: Vec<u8>,
}

/// Signs `template` with its own key; issuer and subject are identical.
pub fn self_sign(template: &SigningTemplate, key: &KeyPair) -> Result<Certificate> {
    let key_id = match &template.subject_key_id {
        Some(id) => id.clone(),
        None => key.key_id()?,
    };
    let issuer = IssuerIdentity {
        name: template.subject.to_x509_name()?,
        key,
        key_id,
    };
    issue(template, key, &issuer)
}

/// Produces a signed certificate for `template` over `subject_key`'s public
/// half, issued by `issuer`.
///
/// The result is parsed back from its DER encoding so that self-signed and
/// parent-issued certificates are handled uniformly downstream.
pub fn issue(
    template: &SigningTemplate,
    subject_key: &KeyPair,
    issuer: &IssuerIdentity<'_>,
) -> Result<Certificate> {
    let algorithm = template
        .signature_algorithm
        .unwrap_or_else(|| issuer.key.signature_algorithm());
    let algorithm_id = algorithm.identifier();

    let issuer_name = match &template.issuer {
        Some(issuer_override) => issuer_override.to_x509_name()?,
        None => issuer.name.clone(),
    };

    let serial_number: SerialNumber = SerialNumber::new(&template.serial_number)
        .map_err(|e| Error::SigningFailed(format!("serial number: {e}")))?;

    let tbs_certificate = TbsCertificateInner {
        version: Version::V3,
        serial_number,
        signature: algorithm_id.clone(),
        issuer: issuer_name,
        validity: Validity {
            not_before: to_x509_time(template.not_before)?,
            not_after: to_x509_time(template.not_after)?,
        },
        subject: template.subject.to_x509_name()?,
        subject_public_key_info: subject_key.spki()?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(build_extensions(template, subject_key, issuer)?),
    };

    let tbs_der = tbs_certificate.to_der()?;
    let signature = issuer.key.sign_with(algorithm, &tbs_der)?;

    let certificate = CertificateInner {
        tbs_certificate,
        signature_algorithm: algorithm_id,
        signature: BitString::from_bytes(&signature)?,
    };

    Certificate::from_der(&certificate.to_der()?)
}

fn build_extensions(
    template: &SigningTemplate,
    subject_key: &KeyPair,
    issuer: &IssuerIdentity<'_>,
) -> Result<Vec<x509_cert::ext::Extension>> {
    let mut extensions = Vec::new();

    if template.basic_constraints {
        let bc = BasicConstraints {
            is_ca: template.is_ca,
            path_len: template.max_path_len,
        };
        extensions.push(bc.to_extension(true)?);
    }

    if !template.key_usage.is_empty() {
        extensions.push(KeyUsage(template.key_usage).to_extension(true)?);
    }

    if !template.ext_key_usage.is_empty() {
        let eku = ExtendedKeyUsage {
            usages: template.ext_key_usage.clone(),
        };
        extensions.push(eku.to_extension(false)?);
    }

    let subject_key_id = match &template.subject_key_id {
        Some(id) => id.clone(),
        None => subject_key.key_id()?,
    };
    extensions.push(SubjectKeyIdentifier(subject_key_id).to_extension(false)?);

    // The override applies to this signature only; the issuer keeps its own
    // identifier for later signings.
    let authority_key_id = match &template.authority_key_id {
        Some(id) => id.clone(),
        None => issuer.key_id.clone(),
    };
    extensions.push(
        AuthorityKeyIdentifier {
            key_id: authority_key_id,
        }
        .to_extension(false)?,
    );

    let san = SubjectAltName {
        dns_names: template.dns_names.clone(),
        ip_addresses: template.ip_addresses.clone(),
        email_addresses: template.email_addresses.clone(),
    };
    if !san.is_empty() {
        extensions.push(san.to_extension(false)?);
    }

    if !template.ocsp_servers.is_empty() {
        let aia = AuthorityInfoAccess {
            ocsp_servers: template.ocsp_servers.clone(),
        };
        extensions.push(aia.to_extension(false)?);
    }

    if !template.crl_distribution_points.is_empty() {
        let crl = CrlDistributionPoints {
            uris: template.crl_distribution_points.clone(),
        };
        extensions.push(crl.to_extension(false)?);
    }

    Ok(extensions)
}

/// Encodes a timestamp as UTCTime within its 1950–2049 window, otherwise as
/// GeneralizedTime.
fn to_x509_time(timestamp: OffsetDateTime) -> Result<Time> {
    if (1950..=2049).contains(&timestamp.year()) {
        Ok(Time::UtcTime(UtcTime::from_system_time(timestamp.into())?))
    } else {
        let seconds = u64::try_from(timestamp.unix_timestamp()).map_err(|_| {
            Error::SigningFailed(format!("validity timestamp out of range: {timestamp}"))
        })?;
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            std::time::Duration::from_secs(seconds),
        )?))
    }
}
