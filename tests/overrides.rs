mod util;

use certforge::Error;
use certforge::cert::extensions::{ExtKeyUsageOption, KeyUsages};
use certforge::config::{CertConfig, HexString, SubjectConfig};
use der::Encode;
use time::macros::datetime;

/// The four purposes produce their preset key usages, extended key usages
/// and basic constraints.
#[test]
fn purpose_presets_reach_the_certificate() {
    let store = util::build(vec![
        ("root", util::root_ca()),
        ("issuing", util::intermediate("root")),
        ("web", util::server("issuing", "web.test")),
        (
            "user",
            CertConfig::builder()
                .purpose("client")
                .key_type("ed25519")
                .parent("issuing")
                .email_addresses(vec!["user@web.test".to_string()])
                .build(),
        ),
    ])
    .unwrap();

    let root = store.get("root").unwrap().certificate().unwrap();
    let bc = root.basic_constraints().unwrap().unwrap();
    assert!(bc.is_ca);
    assert_eq!(bc.path_len, Some(1));
    assert_eq!(
        root.key_usage().unwrap(),
        KeyUsages::KeyCertSign | KeyUsages::CRLSign,
    );
    assert!(root.ext_key_usage().unwrap().is_empty());

    let issuing = store.get("issuing").unwrap().certificate().unwrap();
    let bc = issuing.basic_constraints().unwrap().unwrap();
    assert!(bc.is_ca);
    assert_eq!(bc.path_len, Some(0));

    let web = store.get("web").unwrap().certificate().unwrap();
    assert!(web.basic_constraints().unwrap().is_none());
    assert_eq!(
        web.key_usage().unwrap(),
        KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
    );
    assert_eq!(
        web.ext_key_usage().unwrap(),
        vec![ExtKeyUsageOption::ServerAuth],
    );

    let user = store.get("user").unwrap().certificate().unwrap();
    assert_eq!(
        user.ext_key_usage().unwrap(),
        vec![ExtKeyUsageOption::ClientAuth],
    );
}

/// An explicit serial number survives byte-for-byte; a generated one is a
/// positive 17-to-19-byte value.
#[test]
fn serial_numbers() {
    let mut explicit = util::root_ca();
    explicit.serial_number = Some(HexString::from("1a:2b:3c"));
    let store = util::build(vec![("root", explicit), ("other", util::root_ca())]).unwrap();

    let root = store.get("root").unwrap().certificate().unwrap();
    assert_eq!(root.serial_number(), &[0x1a, 0x2b, 0x3c]);

    let generated = store.get("other").unwrap().certificate().unwrap();
    let serial = generated.serial_number();
    assert!((17..=19).contains(&serial.len()), "{} bytes", serial.len());
    assert_eq!(serial[0] & 0x80, 0);
    assert!(serial.iter().any(|b| *b != 0));
}

/// An explicit authority key identifier applies to that one child only: the
/// parent's own identifier and a sibling's linkage are untouched.
#[test]
fn authority_key_id_override_is_scoped_to_one_signature() {
    let mut forged = util::server("root", "forged.test");
    forged.authority_key_id = Some(HexString::from("01:02:03:04:05"));
    let store = util::build(vec![
        ("root", util::root_ca()),
        ("forged", forged),
        ("honest", util::server("root", "honest.test")),
    ])
    .unwrap();

    let root = store.get("root").unwrap();
    let root_cert = root.certificate().unwrap();
    let root_ski = root_cert.subject_key_id().unwrap().unwrap();
    assert_eq!(root_ski, root.private_key().key_id().unwrap());

    let forged = store.get("forged").unwrap().certificate().unwrap();
    assert_eq!(
        forged.authority_key_id().unwrap().unwrap(),
        vec![1, 2, 3, 4, 5],
    );

    let honest = store.get("honest").unwrap().certificate().unwrap();
    assert_eq!(honest.authority_key_id().unwrap().unwrap(), root_ski);
}

/// An explicit subject key identifier replaces the derived one, and children
/// inherit it as their authority key identifier.
#[test]
fn subject_key_id_override_propagates_to_children() {
    let mut root = util::root_ca();
    root.subject_key_id = Some(HexString::from("aa:bb:cc:dd"));
    let store = util::build(vec![
        ("root", root),
        ("web", util::server("root", "web.test")),
    ])
    .unwrap();

    let root_cert = store.get("root").unwrap().certificate().unwrap();
    assert_eq!(
        root_cert.subject_key_id().unwrap().unwrap(),
        vec![0xaa, 0xbb, 0xcc, 0xdd],
    );

    let web = store.get("web").unwrap().certificate().unwrap();
    assert_eq!(
        web.authority_key_id().unwrap().unwrap(),
        vec![0xaa, 0xbb, 0xcc, 0xdd],
    );
}

/// An explicit issuer subject replaces the issuer name that would otherwise
/// be copied from the parent certificate.
#[test]
fn issuer_override_replaces_the_issuer_name() {
    let mut lying = util::server("root", "lying.test");
    lying.issuer = Some(SubjectConfig::builder().cn("Somebody Else").build());
    let store = util::build(vec![("root", util::root_ca()), ("lying", lying)]).unwrap();

    let root_cert = store.get("root").unwrap().certificate().unwrap();
    let lying_cert = store.get("lying").unwrap().certificate().unwrap();
    assert_ne!(
        lying_cert.issuer().to_der().unwrap(),
        root_cert.subject().to_der().unwrap(),
    );
    assert!(lying_cert.issuer().to_string().contains("Somebody Else"));
}

/// A signature algorithm override is honored when it matches the signing key
/// and rejected when it does not.
#[test]
fn signature_algorithm_override() {
    let matching = CertConfig::builder()
        .purpose("root-ca")
        .key_type("p256")
        .signature_alg("ecdsawithsha256")
        .build();
    let store = util::build(vec![("root", matching)]).unwrap();
    let cert = store.get("root").unwrap().certificate().unwrap();
    assert_eq!(
        cert.inner.signature_algorithm.oid,
        const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
    );
    assert_eq!(
        cert.inner.tbs_certificate.signature.oid,
        const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
    );

    let mismatched = CertConfig::builder()
        .purpose("root-ca")
        .key_type("ed25519")
        .signature_alg("ecdsawithsha256")
        .build();
    let err = util::build(vec![("root", mismatched)]).unwrap_err();
    assert!(matches!(err, Error::SigningFailed(_)));
}

/// Explicit validity bounds land in the certificate; missing bounds default
/// to an hour ago and 375 days out.
#[test]
fn validity_windows() {
    let explicit = CertConfig::builder()
        .purpose("server")
        .key_type("ed25519")
        .dns_names(vec!["dated.test".to_string()])
        .not_before("2030-01-01")
        .not_after("2031-06-01 12:30:00")
        .build();
    let store = util::build(vec![("dated", explicit), ("default", util::root_ca())]).unwrap();

    let dated = store.get("dated").unwrap().certificate().unwrap();
    let validity = &dated.inner.tbs_certificate.validity;
    assert_eq!(
        util::time_of(&validity.not_before),
        datetime!(2030-01-01 00:00:00 UTC),
    );
    assert_eq!(
        util::time_of(&validity.not_after),
        datetime!(2031-06-01 12:30:00 UTC),
    );

    let defaulted = store.get("default").unwrap().certificate().unwrap();
    let validity = &defaulted.inner.tbs_certificate.validity;
    let now = time::OffsetDateTime::now_utc();
    let not_before = util::time_of(&validity.not_before);
    let not_after = util::time_of(&validity.not_after);
    assert!((now - not_before - time::Duration::hours(1)).abs() < time::Duration::minutes(5));
    assert!((not_after - now - time::Duration::days(375)).abs() < time::Duration::minutes(5));
}

/// A malformed validity bound fails the build with `InvalidTimeFormat`.
#[test]
fn malformed_validity_fails() {
    let bad = CertConfig::builder()
        .purpose("server")
        .key_type("ed25519")
        .not_before("01/02/2030")
        .build();
    let err = util::build(vec![("bad", bad)]).unwrap_err();
    assert_eq!(err, Error::InvalidTimeFormat("01/02/2030".to_string()));
}

/// OCSP responder URLs and CRL distribution points are carried into their
/// extensions.
#[test]
fn revocation_pointers_are_emitted() {
    let cfg = CertConfig::builder()
        .purpose("server")
        .key_type("ed25519")
        .dns_names(vec!["rev.test".to_string()])
        .ocsp_servers(vec!["http://ocsp.rev.test".to_string()])
        .crl_distribution_points(vec!["http://crl.rev.test/root.crl".to_string()])
        .build();
    let store = util::build(vec![("rev", cfg)]).unwrap();
    let cert = store.get("rev").unwrap().certificate().unwrap();

    let aia = cert
        .extension::<certforge::cert::extensions::AuthorityInfoAccess>()
        .unwrap()
        .unwrap();
    assert_eq!(aia.ocsp_servers, vec!["http://ocsp.rev.test"]);

    let crl = cert
        .extension::<certforge::cert::extensions::CrlDistributionPoints>()
        .unwrap()
        .unwrap();
    assert_eq!(crl.uris, vec!["http://crl.rev.test/root.crl"]);
}
