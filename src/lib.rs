//! # certforge - Declarative X.509 Test Fixtures
//!
//! certforge builds complete PKI test fixtures from a declarative mapping of
//! certificate names to descriptions. Each description states what the
//! certificate is for (a root authority, an intermediate, a server or client
//! endpoint) and, for non-roots, which other entry signs it; the store
//! resolves the whole graph, generates a key pair per entry, and signs every
//! certificate parent-first.
//!
//! It is built entirely on rustcrypto libraries, with no dependency on ring
//! or openssl.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any bit length from 4 to 16000 (`rsa-2048`, `rsa4096`, ...)
//! - **ECDSA**: NIST P-224, P-256, P-384 and P-521
//! - **Ed25519**
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use certforge::config::CertConfig;
//! use certforge::store::Store;
//!
//! # fn main() -> Result<(), certforge::error::Error> {
//! let mut certs = BTreeMap::new();
//! certs.insert(
//!     "root".to_string(),
//!     CertConfig::builder().purpose("root-ca").key_type("p256").build(),
//! );
//! certs.insert(
//!     "web".to_string(),
//!     CertConfig::builder()
//!         .purpose("server")
//!         .key_type("p256")
//!         .parent("root")
//!         .dns_names(vec!["localhost".to_string()])
//!         .build(),
//! );
//!
//! let store = Store::from_config(&certs)?;
//! let web = store.get("web").unwrap();
//! println!("{}", web.key_pem());
//! println!("{}", web.cert_chain_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ## Breaking Things on Purpose
//!
//! Descriptions can override the serial number, the subject and authority
//! key identifiers, the issuer name, and the signature algorithm, so that
//! fixtures with deliberately wrong linkage can be produced for negative
//! tests. An override only ever affects the certificate it is written on:
//! signing a child with a forged authority key identifier leaves the
//! parent's own identity untouched.
//!
//! ## Module Organization
//!
//! - [`config`]: declarative descriptions and template resolution
//! - [`key`]: key pair generation and signing
//! - [`issuer`]: the signing engine
//! - [`store`]: the built collection of keys, certificates and chains
//! - [`cert`]: parsed certificates, extensions and templates
//! - [`error`]: the error kinds reported by a build

pub mod cert;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod store;

pub use error::{Error, Result};
pub use store::Store;
