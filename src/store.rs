//! The in-memory collection of named key-and-certificate entries.
//!
//! [`Store::from_config`] drives the whole build: every description is
//! resolved and keyed eagerly, roots are self-signed on the spot, and
//! children are signed afterwards by walking up the parent graph. Entries
//! reference their parent by name only; the store owns every entry.

use std::collections::BTreeMap;

use crate::cert::Certificate;
use crate::cert::params::SigningTemplate;
use crate::config::CertConfig;
use crate::error::{Error, Result};
use crate::issuer::{self, IssuerIdentity};
use crate::key::KeyPair;
use crate::pem_utils::der_to_pem;

/// Maximum number of parent hops from any entry to its root.
///
/// The bound doubles as the cycle guard: a reference cycle never reaches a
/// root and so always exceeds it.
pub const MAX_CHAIN_DEPTH: usize = 5;

/// A named collection of signed entries, built atomically from a
/// configuration mapping.
#[derive(Debug, Default)]
pub struct Store {
    entries: BTreeMap<String, Entry>,
}

impl Store {
    /// Builds every entry of `certs`: resolves templates, generates keys,
    /// self-signs roots, then signs deferred children parent-first.
    ///
    /// Fails atomically: the first resolution, generation, or signing error
    /// aborts the whole build and no store is returned.
    pub fn from_config(certs: &BTreeMap<String, CertConfig>) -> Result<Self> {
        let mut store = Store::default();

        let mut need_signature = Vec::new();
        for (name, config) in certs {
            let mut template = config.to_template()?;
            let key = KeyPair::generate(config.key_type())?;
            if template.subject_key_id.is_none() {
                template.subject_key_id = Some(key.key_id()?);
            }
            let key_der = key.to_pkcs8_der()?;

            let mut entry = Entry {
                key,
                key_der,
                parent: config.parent().map(str::to_string),
                template: Some(template),
                certificate: None,
                cert_der: Vec::new(),
                chain_der: Vec::new(),
            };

            if entry.parent.is_none() {
                entry.self_sign()?;
            } else {
                need_signature.push(name.clone());
            }

            store.entries.insert(name.clone(), entry);
        }

        // Validate every deferred entry's ancestor path up front so that the
        // depth bound does not depend on the order the map is walked in.
        for name in &need_signature {
            store.check_ancestry(name)?;
        }
        for name in &need_signature {
            store.sign_entry(name)?;
        }

        Ok(store)
    }

    /// The entry named `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Iterates over all entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks the parent names from `name` towards a root, failing on a
    /// missing parent or on more than [`MAX_CHAIN_DEPTH`] hops.
    fn check_ancestry(&self, name: &str) -> Result<()> {
        let mut current = name;
        let mut hops = 0;
        loop {
            let entry = self
                .entries
                .get(current)
                .ok_or_else(|| Error::CertificateNotFound(current.to_string()))?;
            let Some(parent) = entry.parent.as_deref() else {
                return Ok(());
            };
            hops += 1;
            if hops > MAX_CHAIN_DEPTH {
                return Err(Error::ChainTooLong(name.to_string()));
            }
            current = parent;
        }
    }

    /// Signs `name`, recursively ensuring its parent is signed first.
    /// Already-signed entries return immediately, so a parent shared by many
    /// children is signed exactly once.
    fn sign_entry(&mut self, name: &str) -> Result<()> {
        let parent_name = {
            let entry = self
                .entries
                .get(name)
                .ok_or_else(|| Error::CertificateNotFound(name.to_string()))?;
            if entry.is_signed() {
                return Ok(());
            }
            entry.parent.clone()
        };

        let Some(parent_name) = parent_name else {
            // Roots are signed during construction; this only runs if a root
            // somehow ended up deferred.
            let mut entry = self.entries.remove(name).expect("entry looked up above");
            let signed = entry.self_sign();
            self.entries.insert(name.to_string(), entry);
            return signed;
        };

        self.sign_entry(&parent_name)?;

        let mut entry = self.entries.remove(name).expect("entry looked up above");
        let signed = (|| {
            let parent = self
                .entries
                .get(&parent_name)
                .ok_or_else(|| Error::CertificateNotFound(parent_name.clone()))?;
            let issuer = parent.issuer_identity()?;
            let mut chain = Vec::with_capacity(parent.chain_der.len() + 1);
            chain.push(parent.cert_der.clone());
            chain.extend(parent.chain_der.iter().cloned());
            entry.sign_with(&issuer, chain)
        })();
        self.entries.insert(name.to_string(), entry);
        signed
    }
}

/// One store record: a private key and, once signed, its certificate and
/// ancestor chain.
#[derive(Debug)]
pub struct Entry {
    key: KeyPair,
    key_der: Vec<u8>,
    parent: Option<String>,
    template: Option<SigningTemplate>,
    certificate: Option<Certificate>,
    cert_der: Vec<u8>,
    chain_der: Vec<Vec<u8>>,
}

impl Entry {
    /// The private signing key.
    pub fn private_key(&self) -> &KeyPair {
        &self.key
    }

    /// The private key, PKCS#8 DER encoded.
    pub fn key_der(&self) -> &[u8] {
        &self.key_der
    }

    /// The private key, PKCS#8 PEM encoded.
    pub fn key_pem(&self) -> String {
        der_to_pem(&self.key_der, "PRIVATE KEY")
    }

    /// The signed certificate in parsed form.
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// The signed certificate, DER encoded.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// The signed certificate, PEM encoded.
    pub fn cert_pem(&self) -> String {
        der_to_pem(&self.cert_der, "CERTIFICATE")
    }

    /// The parent entry name, `None` for roots.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The ancestor certificates in DER, nearest ancestor first; empty for
    /// roots.
    pub fn chain_der(&self) -> &[Vec<u8>] {
        &self.chain_der
    }

    /// The certificate followed by its ancestors, leaf first, ready for use
    /// as a TLS certificate chain.
    pub fn cert_chain_der(&self) -> Vec<Vec<u8>> {
        let mut chain = Vec::with_capacity(self.chain_der.len() + 1);
        chain.push(self.cert_der.clone());
        chain.extend(self.chain_der.iter().cloned());
        chain
    }

    /// The full chain as concatenated PEM blocks, leaf first.
    pub fn cert_chain_pem(&self) -> String {
        self.cert_chain_der()
            .iter()
            .map(|der| der_to_pem(der, "CERTIFICATE"))
            .collect()
    }

    /// Whether this entry is a self-signed certificate authority.
    pub fn is_root_ca(&self) -> bool {
        self.parent.is_none()
            && self
                .certificate
                .as_ref()
                .is_some_and(Certificate::is_ca)
    }

    fn is_signed(&self) -> bool {
        self.certificate.is_some()
    }

    /// The identity this entry signs children under. Requires the entry to
    /// be signed: the child's authority key identifier comes from the signed
    /// certificate, not from the template.
    fn issuer_identity(&self) -> Result<IssuerIdentity<'_>> {
        let certificate = self.certificate.as_ref().ok_or_else(|| {
            Error::SigningFailed("issuer certificate has not been signed".to_string())
        })?;
        let key_id = certificate.subject_key_id()?.ok_or_else(|| {
            Error::SigningFailed("issuer certificate has no subject key identifier".to_string())
        })?;
        Ok(IssuerIdentity {
            name: certificate.subject().clone(),
            key: &self.key,
            key_id,
        })
    }

    /// Consumes the template and stores the self-signed certificate.
    fn self_sign(&mut self) -> Result<()> {
        let template = self.take_template()?;
        let certificate = issuer::self_sign(&template, &self.key)?;
        self.install(certificate, Vec::new())
    }

    /// Consumes the template and stores the certificate signed by `issuer`,
    /// attaching the ancestor chain.
    fn sign_with(&mut self, issuer: &IssuerIdentity<'_>, chain_der: Vec<Vec<u8>>) -> Result<()> {
        let template = self.take_template()?;
        let certificate = issuer::issue(&template, &self.key, issuer)?;
        self.install(certificate, chain_der)
    }

    fn take_template(&mut self) -> Result<SigningTemplate> {
        self.template.take().ok_or_else(|| {
            Error::SigningFailed("certificate template already consumed".to_string())
        })
    }

    fn install(&mut self, certificate: Certificate, chain_der: Vec<Vec<u8>>) -> Result<()> {
        self.cert_der = certificate.to_der()?;
        self.certificate = Some(certificate);
        self.chain_der = chain_der;
        Ok(())
    }
}
