//! Declarative certificate descriptions and their resolution into concrete
//! signing templates.
//!
//! The types here mirror the shape a configuration collaborator supplies
//! (field names match the JSON wire names); [`CertConfig::to_template`] is
//! the pure resolution step from description to [`SigningTemplate`].

use bon::Builder;
use rand::Rng;
use rand_core::RngCore;
use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{ExtKeyUsageOption, KeyUsages};
use crate::cert::params::{DistinguishedName, SigningTemplate};
use crate::error::{Error, Result};

/// Key algorithm used when a description does not name one.
pub const DEFAULT_KEY_TYPE: &str = "RSA-2048";

/// One named certificate description.
///
/// Only `purpose` influences the defaults; everything else either overrides a
/// derived value or adds to the certificate. An empty `parent` means the
/// entry is a self-signed root.
#[derive(Debug, Clone, Default, Deserialize, Builder)]
#[serde(default, rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct CertConfig {
    pub key_type: Option<String>,
    pub purpose: Option<String>,
    pub subject: Option<SubjectConfig>,
    pub parent: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,

    // subject alternative names
    #[serde(rename = "hostnames")]
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[serde(rename = "ips")]
    #[builder(default)]
    pub ip_addresses: Vec<String>,
    #[serde(rename = "emails")]
    #[builder(default)]
    pub email_addresses: Vec<String>,

    // advanced options
    #[serde(rename = "ocspServer")]
    #[builder(default)]
    pub ocsp_servers: Vec<String>,
    #[serde(rename = "crls")]
    #[builder(default)]
    pub crl_distribution_points: Vec<String>,
    #[builder(default)]
    pub ca: bool,
    pub max_path_len: Option<u8>,
    pub signature_alg: Option<String>,
    pub key_usage: Option<String>,
    #[serde(rename = "extendedKeyUsage")]
    pub ext_key_usage: Option<String>,

    // options for when you want to break things
    #[serde(rename = "serial")]
    pub serial_number: Option<HexString>,
    #[serde(rename = "ski")]
    pub subject_key_id: Option<HexString>,
    pub issuer: Option<SubjectConfig>,
    #[serde(rename = "aki")]
    pub authority_key_id: Option<HexString>,
}

impl CertConfig {
    /// The key algorithm selector, falling back to [`DEFAULT_KEY_TYPE`].
    pub fn key_type(&self) -> &str {
        match self.key_type.as_deref().map(str::trim) {
            Some(kt) if !kt.is_empty() => kt,
            _ => DEFAULT_KEY_TYPE,
        }
    }

    /// The parent entry name; `None` for a self-signed root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }

    /// Resolves this description into the concrete signing parameters.
    ///
    /// Pure apart from reading the clock for defaulted fields and drawing
    /// randomness for defaulted serial numbers and subjects.
    pub fn to_template(&self) -> Result<SigningTemplate> {
        let purpose = match self.purpose.as_deref().map(str::trim) {
            None | Some("") => Purpose::default(),
            Some(name) => Purpose::from_name(name)
                .ok_or_else(|| Error::InvalidPurpose(name.to_string()))?,
        };
        let presets = purpose.presets();

        let subject = if let Some(subject) = &self.subject {
            subject.to_distinguished_name()
        } else if let Some(first) = self.dns_names.first() {
            DistinguishedName::builder().common_name(first.clone()).build()
        } else if let Some(first) = self.email_addresses.first() {
            DistinguishedName::builder().common_name(first.clone()).build()
        } else {
            random_subject()
        };

        let not_before = match self.not_before.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => parse_time(s)?,
            _ => OffsetDateTime::now_utc() - Duration::hours(1),
        };
        let not_after = match self.not_after.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => parse_time(s)?,
            _ => OffsetDateTime::now_utc() + Duration::days(375),
        };

        let mut basic_constraints = presets.basic_constraints;
        let mut is_ca = presets.is_ca;
        let mut max_path_len = presets.max_path_len;
        if self.ca || self.max_path_len.is_some() {
            basic_constraints = true;
            is_ca = true;
            if let Some(path_len) = self.max_path_len {
                max_path_len = Some(path_len);
            }
        }

        let signature_algorithm = match self.signature_alg.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(
                SignatureAlgorithm::from_name(name)
                    .ok_or_else(|| Error::InvalidSignatureAlgorithm(name.to_string()))?,
            ),
            _ => None,
        };

        let mut key_usage = presets.key_usage;
        if let Some(list) = &self.key_usage {
            for name in list.split(',') {
                key_usage |= parse_key_usage(name)?;
            }
        }

        let mut ext_key_usage = presets.ext_key_usage;
        if let Some(list) = &self.ext_key_usage {
            for name in list.split(',') {
                ext_key_usage.push(parse_ext_key_usage(name)?);
            }
        }

        let serial_number = match &self.serial_number {
            Some(serial) => {
                let bytes = serial
                    .to_uint_bytes()
                    .filter(|b| b.len() <= 20)
                    .ok_or_else(|| Error::InvalidSerialNumber(serial.as_str().to_string()))?;
                bytes
            }
            None => random_serial(),
        };

        let mut ip_addresses = Vec::with_capacity(self.ip_addresses.len());
        for raw in &self.ip_addresses {
            let ip = raw
                .trim()
                .parse()
                .map_err(|_| Error::InvalidIpAddress(raw.clone()))?;
            ip_addresses.push(ip);
        }

        let subject_key_id = match &self.subject_key_id {
            Some(ski) => Some(
                ski.to_bytes()
                    .ok_or_else(|| Error::InvalidKeyIdentifier(ski.as_str().to_string()))?,
            ),
            None => None,
        };
        let authority_key_id = match &self.authority_key_id {
            Some(aki) => Some(
                aki.to_bytes()
                    .ok_or_else(|| Error::InvalidKeyIdentifier(aki.as_str().to_string()))?,
            ),
            None => None,
        };

        Ok(SigningTemplate {
            subject,
            issuer: self.issuer.as_ref().map(SubjectConfig::to_distinguished_name),
            serial_number,
            not_before,
            not_after,
            signature_algorithm,
            key_usage,
            ext_key_usage,
            basic_constraints,
            is_ca,
            max_path_len,
            dns_names: self.dns_names.clone(),
            ip_addresses,
            email_addresses: self.email_addresses.clone(),
            ocsp_servers: self.ocsp_servers.clone(),
            crl_distribution_points: self.crl_distribution_points.clone(),
            subject_key_id,
            authority_key_id,
        })
    }
}

/// Subject fields as supplied by a description.
#[derive(Debug, Clone, Default, Deserialize, Builder)]
#[serde(default)]
#[builder(on(String, into))]
pub struct SubjectConfig {
    pub cn: Option<String>,
    pub o: Option<String>,
    pub ou: Option<String>,
    pub l: Option<String>,
    pub st: Option<String>,
    pub c: Option<String>,
}

impl SubjectConfig {
    pub fn to_distinguished_name(&self) -> DistinguishedName {
        DistinguishedName {
            common_name: self.cn.clone(),
            organization: self.o.clone(),
            organization_unit: self.ou.clone(),
            locality: self.l.clone(),
            state: self.st.clone(),
            country: self.c.clone(),
        }
    }
}

/// A hex string tolerant of colon and space separators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct HexString(String);

impl HexString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes to raw bytes; the digit count must be even.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        hex::decode(self.cleaned()).ok()
    }

    /// Decodes as a big-endian unsigned integer: odd digit counts are
    /// allowed and leading zero bytes are stripped down to one byte.
    pub fn to_uint_bytes(&self) -> Option<Vec<u8>> {
        let mut s = self.cleaned();
        if s.is_empty() {
            return None;
        }
        if s.len() % 2 == 1 {
            s.insert(0, '0');
        }
        let bytes = hex::decode(s).ok()?;
        let start = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len() - 1);
        Some(bytes[start..].to_vec())
    }

    fn cleaned(&self) -> String {
        self.0
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | ' '))
            .collect()
    }
}

impl From<&str> for HexString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HexString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One of the four fixed certificate purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Purpose {
    RootCa,
    IntermediateCa,
    #[default]
    Server,
    Client,
}

/// The preset template fields a purpose selects.
pub(crate) struct PurposePresets {
    pub key_usage: der::flagset::FlagSet<KeyUsages>,
    pub ext_key_usage: Vec<ExtKeyUsageOption>,
    pub basic_constraints: bool,
    pub is_ca: bool,
    pub max_path_len: Option<u8>,
}

impl Purpose {
    /// Resolves a case-insensitive purpose tag.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "root-ca" => Purpose::RootCa,
            "intermediate-ca" => Purpose::IntermediateCa,
            "server" => Purpose::Server,
            "client" => Purpose::Client,
            _ => return None,
        })
    }

    pub(crate) fn presets(self) -> PurposePresets {
        match self {
            Purpose::RootCa => PurposePresets {
                key_usage: KeyUsages::KeyCertSign | KeyUsages::CRLSign,
                ext_key_usage: Vec::new(),
                basic_constraints: true,
                is_ca: true,
                max_path_len: Some(1),
            },
            Purpose::IntermediateCa => PurposePresets {
                key_usage: KeyUsages::KeyCertSign | KeyUsages::CRLSign,
                ext_key_usage: Vec::new(),
                basic_constraints: true,
                is_ca: true,
                max_path_len: Some(0),
            },
            Purpose::Server => PurposePresets {
                key_usage: KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
                ext_key_usage: vec![ExtKeyUsageOption::ServerAuth],
                basic_constraints: false,
                is_ca: false,
                max_path_len: None,
            },
            Purpose::Client => PurposePresets {
                key_usage: KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
                ext_key_usage: vec![ExtKeyUsageOption::ClientAuth],
                basic_constraints: false,
                is_ca: false,
                max_path_len: None,
            },
        }
    }
}

/// Resolves one key usage name against the fixed vocabulary.
fn parse_key_usage(name: &str) -> Result<KeyUsages> {
    Ok(match name.trim().to_ascii_lowercase().as_str() {
        "digitalsignature" => KeyUsages::DigitalSignature,
        "contentcommitment" => KeyUsages::NonRepudiation,
        "keyencipherment" => KeyUsages::KeyEncipherment,
        "dataencipherment" => KeyUsages::DataEncipherment,
        "keyagreement" => KeyUsages::KeyAgreement,
        "certsign" => KeyUsages::KeyCertSign,
        "crlsign" => KeyUsages::CRLSign,
        "encipheronly" => KeyUsages::EncipherOnly,
        "decipheronly" => KeyUsages::DecipherOnly,
        _ => return Err(Error::InvalidKeyUsage(name.trim().to_string())),
    })
}

/// Resolves one extended key usage name against the fixed vocabulary.
fn parse_ext_key_usage(name: &str) -> Result<ExtKeyUsageOption> {
    Ok(match name.trim().to_ascii_lowercase().as_str() {
        "any" => ExtKeyUsageOption::Any,
        "serverauth" => ExtKeyUsageOption::ServerAuth,
        "clientauth" => ExtKeyUsageOption::ClientAuth,
        "codesigning" => ExtKeyUsageOption::CodeSigning,
        "emailprotection" => ExtKeyUsageOption::EmailProtection,
        "ipsecendsystem" => ExtKeyUsageOption::IpsecEndSystem,
        "ipsectunnel" => ExtKeyUsageOption::IpsecTunnel,
        "ipsecuser" => ExtKeyUsageOption::IpsecUser,
        "timestamping" => ExtKeyUsageOption::TimeStamping,
        "ocspsigning" => ExtKeyUsageOption::OcspSigning,
        _ => return Err(Error::InvalidExtKeyUsage(name.trim().to_string())),
    })
}

/// Parses a validity timestamp against the accepted formats, first match
/// wins: RFC 3339, date-time with seconds, date-time without seconds,
/// date only. The naive forms are taken as UTC.
fn parse_time(s: &str) -> Result<OffsetDateTime> {
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;

    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(t);
    }
    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(t) = PrimitiveDateTime::parse(s, &with_seconds) {
        return Ok(t.assume_utc());
    }
    let without_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(t) = PrimitiveDateTime::parse(s, &without_seconds) {
        return Ok(t.assume_utc());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(d) = Date::parse(s, &date_only) {
        return Ok(d.midnight().assume_utc());
    }
    Err(Error::InvalidTimeFormat(s.to_string()))
}

/// A plausible throwaway subject for descriptions that supply no identity.
fn random_subject() -> DistinguishedName {
    let mut rng = rand::rng();
    DistinguishedName {
        common_name: Some(random_name(&mut rng, 12)),
        organization: Some(random_name(&mut rng, 10)),
        organization_unit: None,
        locality: Some(random_name(&mut rng, 8)),
        state: Some(random_name(&mut rng, 8)),
        country: Some(random_country(&mut rng)),
    }
}

fn random_name(rng: &mut impl Rng, max_len: usize) -> String {
    let len = rng.random_range(1..=max_len);
    (0..len)
        .map(|_| rng.random_range(b'a'..=b'z') as char)
        .collect()
}

fn random_country(rng: &mut impl Rng) -> String {
    (0..2)
        .map(|_| rng.random_range(b'A'..=b'Z') as char)
        .collect()
}

/// A fresh random serial: 17 to 19 significant bytes, positive, never zero.
fn random_serial() -> Vec<u8> {
    let mut rng = rand_core::OsRng;
    loop {
        let mut bytes = [0u8; 19];
        rng.fill_bytes(&mut bytes);
        bytes[0] &= 0x7f;
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = bytes.len() - start;
        if significant < 17 || bytes[start] & 0x80 != 0 {
            continue;
        }
        return bytes[start..].to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_string_tolerates_separators() {
        let h = HexString::from("01:02 03");
        assert_eq!(h.to_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn hex_string_rejects_odd_length_for_identifiers() {
        assert!(HexString::from("abc").to_bytes().is_none());
        assert!(HexString::from("zz").to_bytes().is_none());
    }

    #[test]
    fn uint_bytes_allow_odd_digits_and_strip_leading_zeros() {
        assert_eq!(HexString::from("123").to_uint_bytes().unwrap(), vec![0x01, 0x23]);
        assert_eq!(HexString::from("00:00:7f").to_uint_bytes().unwrap(), vec![0x7f]);
        assert_eq!(HexString::from("00").to_uint_bytes().unwrap(), vec![0]);
        assert!(HexString::from("").to_uint_bytes().is_none());
        assert!(HexString::from("12g4").to_uint_bytes().is_none());
    }

    #[test]
    fn time_formats_are_tried_in_order() {
        assert_eq!(
            parse_time("2031-06-01T10:30:00Z").unwrap(),
            time::macros::datetime!(2031-06-01 10:30:00 UTC),
        );
        assert_eq!(
            parse_time("2031-06-01 10:30:45").unwrap(),
            time::macros::datetime!(2031-06-01 10:30:45 UTC),
        );
        assert_eq!(
            parse_time("2031-06-01 10:30").unwrap(),
            time::macros::datetime!(2031-06-01 10:30:00 UTC),
        );
        assert_eq!(
            parse_time("2031-06-01").unwrap(),
            time::macros::datetime!(2031-06-01 00:00:00 UTC),
        );
        assert_eq!(
            parse_time("junk").unwrap_err(),
            Error::InvalidTimeFormat("junk".to_string()),
        );
    }

    #[test]
    fn empty_purpose_behaves_as_server() {
        let template = CertConfig::default().to_template().unwrap();
        assert!(!template.is_ca);
        assert!(!template.basic_constraints);
        assert_eq!(template.ext_key_usage, vec![ExtKeyUsageOption::ServerAuth]);
        assert_eq!(
            template.key_usage,
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
        );
    }

    #[test]
    fn root_ca_presets() {
        let template = CertConfig::builder()
            .purpose("root-ca")
            .build()
            .to_template()
            .unwrap();
        assert!(template.is_ca);
        assert!(template.basic_constraints);
        assert_eq!(template.max_path_len, Some(1));
        assert_eq!(
            template.key_usage,
            KeyUsages::KeyCertSign | KeyUsages::CRLSign,
        );
        assert!(template.ext_key_usage.is_empty());
    }

    #[test]
    fn intermediate_ca_has_present_and_zero_path_len() {
        let template = CertConfig::builder()
            .purpose("Intermediate-CA")
            .build()
            .to_template()
            .unwrap();
        assert_eq!(template.max_path_len, Some(0));
        assert!(template.is_ca);
    }

    #[test]
    fn unknown_purpose_is_rejected() {
        let err = CertConfig::builder()
            .purpose("router")
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidPurpose("router".to_string()));
    }

    #[test]
    fn subject_falls_back_to_first_dns_name_then_email() {
        let template = CertConfig::builder()
            .dns_names(vec!["a.test".to_string(), "b.test".to_string()])
            .build()
            .to_template()
            .unwrap();
        assert_eq!(template.subject.common_name.as_deref(), Some("a.test"));

        let template = CertConfig::builder()
            .email_addresses(vec!["ops@a.test".to_string()])
            .build()
            .to_template()
            .unwrap();
        assert_eq!(template.subject.common_name.as_deref(), Some("ops@a.test"));
    }

    #[test]
    fn missing_subject_is_synthesized() {
        let template = CertConfig::default().to_template().unwrap();
        let subject = template.subject;
        assert!(subject.common_name.is_some_and(|cn| !cn.is_empty()));
        assert!(subject.organization.is_some_and(|o| !o.is_empty()));
        assert!(subject.country.is_some_and(|c| c.len() == 2));
    }

    #[test]
    fn usage_lists_are_parsed_and_combined() {
        let template = CertConfig::builder()
            .purpose("root-ca")
            .key_usage("DigitalSignature , KeyAgreement")
            .ext_key_usage("OcspSigning")
            .build()
            .to_template()
            .unwrap();
        assert_eq!(
            template.key_usage,
            KeyUsages::KeyCertSign
                | KeyUsages::CRLSign
                | KeyUsages::DigitalSignature
                | KeyUsages::KeyAgreement,
        );
        assert_eq!(template.ext_key_usage, vec![ExtKeyUsageOption::OcspSigning]);
    }

    #[test]
    fn bad_usage_names_are_rejected() {
        let err = CertConfig::builder()
            .key_usage("certsign,nonsense")
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidKeyUsage("nonsense".to_string()));

        let err = CertConfig::builder()
            .ext_key_usage("serverauth,nonsense")
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidExtKeyUsage("nonsense".to_string()));
    }

    #[test]
    fn explicit_ca_flag_without_path_len_leaves_it_absent() {
        let template = CertConfig::builder().ca(true).build().to_template().unwrap();
        assert!(template.is_ca);
        assert!(template.basic_constraints);
        assert_eq!(template.max_path_len, None);
    }

    #[test]
    fn explicit_path_len_implies_ca() {
        let template = CertConfig::builder()
            .max_path_len(0)
            .build()
            .to_template()
            .unwrap();
        assert!(template.is_ca);
        assert_eq!(template.max_path_len, Some(0));
    }

    #[test]
    fn random_serials_are_well_formed() {
        for _ in 0..64 {
            let serial = random_serial();
            assert!((17..=19).contains(&serial.len()));
            assert!(serial[0] & 0x80 == 0);
            assert!(serial.iter().any(|b| *b != 0));
        }
    }

    #[test]
    fn explicit_serial_is_canonicalized() {
        let template = CertConfig::builder()
            .serial_number(HexString::from("00:1a:2b:3c"))
            .build()
            .to_template()
            .unwrap();
        assert_eq!(template.serial_number, vec![0x1a, 0x2b, 0x3c]);
    }

    #[test]
    fn garbage_serial_is_rejected() {
        let err = CertConfig::builder()
            .serial_number(HexString::from("not hex"))
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidSerialNumber("not hex".to_string()));
    }

    #[test]
    fn bad_key_identifier_is_rejected() {
        let err = CertConfig::builder()
            .subject_key_id(HexString::from("abc"))
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidKeyIdentifier("abc".to_string()));
    }

    #[test]
    fn bad_ip_address_is_rejected() {
        let err = CertConfig::builder()
            .ip_addresses(vec!["10.0.0.256".to_string()])
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidIpAddress("10.0.0.256".to_string()));
    }

    #[test]
    fn bad_signature_algorithm_is_rejected() {
        let err = CertConfig::builder()
            .signature_alg("md5withrsa")
            .build()
            .to_template()
            .unwrap_err();
        assert_eq!(err, Error::InvalidSignatureAlgorithm("md5withrsa".to_string()));
    }

    #[test]
    fn key_type_defaults_and_trims() {
        assert_eq!(CertConfig::default().key_type(), DEFAULT_KEY_TYPE);
        let cfg = CertConfig::builder().key_type(" p256 ").build();
        assert_eq!(cfg.key_type(), "p256");
    }

    #[test]
    fn empty_parent_means_root() {
        assert_eq!(CertConfig::default().parent(), None);
        let cfg = CertConfig::builder().parent("").build();
        assert_eq!(cfg.parent(), None);
        let cfg = CertConfig::builder().parent("root").build();
        assert_eq!(cfg.parent(), Some("root"));
    }
}
