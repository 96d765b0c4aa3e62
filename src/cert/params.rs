use std::net::IpAddr;
use std::str::FromStr;

use bon::Builder;
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{ExtKeyUsageOption, FlagSet, KeyUsages};
use crate::error::{Error, Result};

/// Distinguished name fields for a certificate subject or issuer.
///
/// Only the fields that are set are encoded; an entirely empty name encodes
/// as an empty RDN sequence.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
#[builder(on(String, into))]
pub struct DistinguishedName {
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Encodes the name as an X.509 RDN sequence.
    pub fn to_x509_name(&self) -> Result<RdnSequence> {
        let mut parts = Vec::new();
        let mut push = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                parts.push(format!("{}={}", key, escape_rdn_value(value)));
            }
        };
        push("CN", &self.common_name);
        push("OU", &self.organization_unit);
        push("O", &self.organization);
        push("L", &self.locality);
        push("ST", &self.state);
        push("C", &self.country);

        if parts.is_empty() {
            return Ok(RdnSequence::default());
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| Error::InvalidSubject(format!("{}: {e}", parts.join(","))))
    }
}

/// Escapes the RFC 4514 special characters in an attribute value.
fn escape_rdn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && matches!(c, ' ' | '#'))
            || (i == last && c == ' ');
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The fully resolved parameters needed to produce one certificate.
///
/// Produced by [`crate::config::CertConfig::to_template`] and consumed exactly
/// once by the signing engine. The subject key identifier is filled in by the
/// store after key generation when the description does not override it.
#[derive(Clone, Debug)]
pub struct SigningTemplate {
    pub subject: DistinguishedName,
    /// Explicit issuer override; the issuer identity supplies the name
    /// otherwise.
    pub issuer: Option<DistinguishedName>,
    /// Big-endian unsigned serial, most significant bit clear.
    pub serial_number: Vec<u8>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub signature_algorithm: Option<SignatureAlgorithm>,
    pub key_usage: FlagSet<KeyUsages>,
    pub ext_key_usage: Vec<ExtKeyUsageOption>,
    /// Whether a basic-constraints extension is emitted at all.
    pub basic_constraints: bool,
    pub is_ca: bool,
    /// `Some(0)` is "present and zero"; `None` is "absent" (unconstrained).
    pub max_path_len: Option<u8>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub email_addresses: Vec<String>,
    pub ocsp_servers: Vec<String>,
    pub crl_distribution_points: Vec<String>,
    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_encodes_only_present_fields() {
        let dn = DistinguishedName::builder()
            .common_name("fixture.test")
            .organization("Fixtures Inc")
            .build();
        let name = dn.to_x509_name().unwrap();
        let rendered = name.to_string();
        assert!(rendered.contains("CN=fixture.test"));
        assert!(rendered.contains("O=Fixtures Inc"));
        assert!(!rendered.contains("C="));
    }

    #[test]
    fn empty_name_encodes_as_empty_sequence() {
        let dn = DistinguishedName::default();
        assert_eq!(dn.to_x509_name().unwrap(), RdnSequence::default());
    }

    #[test]
    fn special_characters_are_escaped() {
        assert_eq!(escape_rdn_value("a,b"), "a\\,b");
        assert_eq!(escape_rdn_value("#start"), "\\#start");
        assert_eq!(escape_rdn_value("plain"), "plain");
    }
}
