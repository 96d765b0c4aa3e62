use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::{Error, Result};

pub use der::flagset::FlagSet;
pub use x509_cert::ext::pkix::KeyUsages;

// RFC 4945 extended key usages, absent from the const-oid database.
const ID_KP_IPSEC_END_SYSTEM: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.5");
const ID_KP_IPSEC_TUNNEL: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.6");
const ID_KP_IPSEC_USER: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.7");

/// An X.509 extension that can be encoded to and decoded from its DER value.
pub trait CertExtension {
    /// The object identifier of the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into its DER-encoded value.
    fn to_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from its DER-encoded value.
    fn from_value(value: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// Wraps the encoded value into a certificate extension.
    fn to_extension(&self, critical: bool) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: Self::OID,
            critical,
            extn_value: OctetString::new(self.to_value()?)?,
        })
    }
}

/// Basic constraints: CA flag and optional path length.
///
/// `path_len: Some(0)` encodes a present-and-zero path length, which chain
/// validators treat differently from an absent one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len: Option<u8>,
}

impl CertExtension for BasicConstraints {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::BasicConstraints as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.path_len,
        };
        Ok(bc.to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(value)?;
        Ok(Self {
            is_ca: bc.ca,
            path_len: bc.path_len_constraint,
        })
    }
}

/// Key usage bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl CertExtension for KeyUsage {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::KeyUsage as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        Ok(x509_cert::ext::pkix::KeyUsage(self.0).to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let ku = x509_cert::ext::pkix::KeyUsage::from_der(value)?;
        Ok(Self(ku.0))
    }
}

/// One name from the extended-key-usage vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtKeyUsageOption {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    IpsecEndSystem,
    IpsecTunnel,
    IpsecUser,
    TimeStamping,
    OcspSigning,
}

impl From<ExtKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtKeyUsageOption) -> Self {
        match value {
            ExtKeyUsageOption::Any => const_oid::db::rfc5912::ANY_EXTENDED_KEY_USAGE,
            ExtKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtKeyUsageOption::EmailProtection => const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION,
            ExtKeyUsageOption::IpsecEndSystem => ID_KP_IPSEC_END_SYSTEM,
            ExtKeyUsageOption::IpsecTunnel => ID_KP_IPSEC_TUNNEL,
            ExtKeyUsageOption::IpsecUser => ID_KP_IPSEC_USER,
            ExtKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
        }
    }
}

impl TryFrom<ObjectIdentifier> for ExtKeyUsageOption {
    type Error = Error;

    fn try_from(oid: ObjectIdentifier) -> Result<Self> {
        Ok(match oid {
            const_oid::db::rfc5912::ANY_EXTENDED_KEY_USAGE => ExtKeyUsageOption::Any,
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => ExtKeyUsageOption::ServerAuth,
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => ExtKeyUsageOption::ClientAuth,
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING => ExtKeyUsageOption::CodeSigning,
            const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => ExtKeyUsageOption::EmailProtection,
            ID_KP_IPSEC_END_SYSTEM => ExtKeyUsageOption::IpsecEndSystem,
            ID_KP_IPSEC_TUNNEL => ExtKeyUsageOption::IpsecTunnel,
            ID_KP_IPSEC_USER => ExtKeyUsageOption::IpsecUser,
            const_oid::db::rfc5912::ID_KP_TIME_STAMPING => ExtKeyUsageOption::TimeStamping,
            const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => ExtKeyUsageOption::OcspSigning,
            other => return Err(Error::InvalidExtKeyUsage(other.to_string())),
        })
    }
}

/// Extended key usage: an ordered list of usage OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usages: Vec<ExtKeyUsageOption>,
}

impl CertExtension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::ExtendedKeyUsage as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usages.iter().map(|u| (*u).into()).collect();
        Ok(x509_cert::ext::pkix::ExtendedKeyUsage(oids).to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(value)?;
        let usages = eku
            .0
            .into_iter()
            .map(ExtKeyUsageOption::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { usages })
    }
}

/// Subject alternative names: DNS names, IP addresses and email addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub email_addresses: Vec<String>,
}

impl SubjectAltName {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty() && self.email_addresses.is_empty()
    }
}

impl CertExtension for SubjectAltName {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::SubjectAltName as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let mut names = Vec::new();
        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(Ia5String::new(dns)?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(Ia5String::new(email)?));
        }
        Ok(x509_cert::ext::pkix::SubjectAltName(names).to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(value)?;
        let mut out = SubjectAltName::default();
        for name in san.0 {
            match name {
                GeneralName::DnsName(dns) => out.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => out.email_addresses.push(email.to_string()),
                GeneralName::IpAddress(octets) => {
                    let bytes = octets.as_bytes();
                    let ip = match bytes.len() {
                        4 => IpAddr::from(<[u8; 4]>::try_from(bytes).unwrap()),
                        16 => IpAddr::from(<[u8; 16]>::try_from(bytes).unwrap()),
                        n => {
                            return Err(Error::InvalidIpAddress(format!(
                                "{n}-byte address in subject alternative name"
                            )));
                        }
                    };
                    out.ip_addresses.push(ip);
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

/// Subject key identifier: an opaque octet string binding the certificate to
/// its public key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl CertExtension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::SubjectKeyIdentifier as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(value)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Authority key identifier, key-identifier form only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_id: Vec<u8>,
}

impl CertExtension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier =
        <x509_cert::ext::pkix::AuthorityKeyIdentifier as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_id.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        Ok(aki.to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(value)?;
        Ok(Self {
            key_id: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// Authority information access carrying OCSP responder URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityInfoAccess {
    pub ocsp_servers: Vec<String>,
}

impl CertExtension for AuthorityInfoAccess {
    const OID: ObjectIdentifier =
        <x509_cert::ext::pkix::AuthorityInfoAccessSyntax as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let descriptions = self
            .ocsp_servers
            .iter()
            .map(|url| {
                let location = Ia5String::new(url)?;
                Ok(x509_cert::ext::pkix::AccessDescription {
                    access_method: const_oid::db::rfc5912::ID_AD_OCSP,
                    access_location: GeneralName::UniformResourceIdentifier(location),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(x509_cert::ext::pkix::AuthorityInfoAccessSyntax(descriptions).to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let aia = x509_cert::ext::pkix::AuthorityInfoAccessSyntax::from_der(value)?;
        let ocsp_servers = aia
            .0
            .into_iter()
            .filter(|d| d.access_method == const_oid::db::rfc5912::ID_AD_OCSP)
            .filter_map(|d| match d.access_location {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { ocsp_servers })
    }
}

/// CRL distribution points, full-name URI form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrlDistributionPoints {
    pub uris: Vec<String>,
}

impl CertExtension for CrlDistributionPoints {
    const OID: ObjectIdentifier =
        <x509_cert::ext::pkix::CrlDistributionPoints as AssociatedOid>::OID;

    fn to_value(&self) -> Result<Vec<u8>> {
        let points = self
            .uris
            .iter()
            .map(|uri| {
                let location = Ia5String::new(uri)?;
                Ok(x509_cert::ext::pkix::crl::dp::DistributionPoint {
                    distribution_point: Some(
                        x509_cert::ext::pkix::name::DistributionPointName::FullName(vec![
                            GeneralName::UniformResourceIdentifier(location),
                        ]),
                    ),
                    reasons: None,
                    crl_issuer: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(x509_cert::ext::pkix::CrlDistributionPoints(points).to_der()?)
    }

    fn from_value(value: &[u8]) -> Result<Self> {
        let points = x509_cert::ext::pkix::CrlDistributionPoints::from_der(value)?;
        let uris = points
            .0
            .into_iter()
            .filter_map(|p| p.distribution_point)
            .flat_map(|name| match name {
                x509_cert::ext::pkix::name::DistributionPointName::FullName(names) => names,
                _ => Vec::new(),
            })
            .filter_map(|name| match name {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { uris })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_constraints_zero_path_len_is_distinct_from_absent() {
        let zero = BasicConstraints {
            is_ca: true,
            path_len: Some(0),
        };
        let absent = BasicConstraints {
            is_ca: true,
            path_len: None,
        };
        let zero_der = zero.to_value().unwrap();
        let absent_der = absent.to_value().unwrap();
        assert_ne!(zero_der, absent_der);
        assert_eq!(BasicConstraints::from_value(&zero_der).unwrap(), zero);
        assert_eq!(BasicConstraints::from_value(&absent_der).unwrap(), absent);
    }

    #[test]
    fn key_usage_bits_survive_encoding() {
        let original = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        let decoded = KeyUsage::from_value(&original.to_value().unwrap()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn subject_alt_name_carries_all_three_kinds() {
        let san = SubjectAltName {
            dns_names: vec!["a.test".to_string()],
            ip_addresses: vec!["10.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
            email_addresses: vec!["ops@a.test".to_string()],
        };
        let decoded = SubjectAltName::from_value(&san.to_value().unwrap()).unwrap();
        assert_eq!(san, decoded);
    }

    #[test]
    fn unknown_extended_key_usage_oid_is_rejected() {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(vec![ObjectIdentifier::new_unwrap(
            "1.2.3.4.5",
        )]);
        let value = eku.to_der().unwrap();
        assert!(matches!(
            ExtendedKeyUsage::from_value(&value),
            Err(Error::InvalidExtKeyUsage(_))
        ));
    }
}
