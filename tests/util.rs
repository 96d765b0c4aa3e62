use std::collections::BTreeMap;

use certforge::config::CertConfig;
use certforge::store::Store;
use time::OffsetDateTime;
use x509_cert::time::Time;

/// Builds a store from `(name, config)` pairs.
pub fn build(entries: Vec<(&str, CertConfig)>) -> certforge::Result<Store> {
    let certs: BTreeMap<String, CertConfig> = entries
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect();
    Store::from_config(&certs)
}

/// A root authority over a fast key type.
pub fn root_ca() -> CertConfig {
    CertConfig::builder()
        .purpose("root-ca")
        .key_type("ed25519")
        .build()
}

/// An intermediate authority chained to `parent`.
pub fn intermediate(parent: &str) -> CertConfig {
    CertConfig::builder()
        .purpose("intermediate-ca")
        .key_type("ed25519")
        .parent(parent)
        .build()
}

/// A server endpoint certificate chained to `parent`.
pub fn server(parent: &str, hostname: &str) -> CertConfig {
    CertConfig::builder()
        .purpose("server")
        .key_type("ed25519")
        .parent(parent)
        .dns_names(vec![hostname.to_string()])
        .build()
}

/// The instant a certificate validity bound represents.
pub fn time_of(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
