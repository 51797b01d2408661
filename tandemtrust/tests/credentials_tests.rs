// Loading key material from disk.

use std::fs;
use std::path::Path;

use tandemtrust::cert::{CertificateBuilder, TrustAnchor};
use tandemtrust::credentials::{KeyMaterialConfig, LocalCredentials};
use tandemtrust::crypto::keys::IdentityKeyPair;
use tandemtrust::TandemTrustError;

const CA_NAME: &str = "Tandem CA";

/// Write a CA certificate plus one party's seed and certificate into `dir`
/// and return the JSON config path.
fn provision(dir: &Path, ca: &IdentityKeyPair, subject: &str) -> std::path::PathBuf {
    let identity = IdentityKeyPair::generate();
    let cert = CertificateBuilder::new(ca, CA_NAME)
        .subject(subject)
        .subject_key(identity.public_key_bytes())
        .build()
        .unwrap();
    let ca_cert = CertificateBuilder::self_signed(ca, CA_NAME).unwrap();

    fs::write(dir.join("party.seed"), identity.secret_key_bytes()).unwrap();
    fs::write(dir.join("party.cert"), cert.encode().unwrap()).unwrap();
    fs::write(dir.join("ca.cert"), ca_cert.encode().unwrap()).unwrap();

    let config = KeyMaterialConfig {
        identity_seed: "party.seed".into(),
        certificate: "party.cert".into(),
        trust_anchor: "ca.cert".into(),
    };
    let path = dir.join("keys.json");
    fs::write(&path, config.to_json().unwrap()).unwrap();
    path
}

#[test]
fn load_credentials_and_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let ca = IdentityKeyPair::generate();
    let path = provision(dir.path(), &ca, "server");

    let config = KeyMaterialConfig::from_file(&path).unwrap();
    let creds = LocalCredentials::load(&config).unwrap();
    let anchor = TrustAnchor::load(&config).unwrap();

    assert_eq!(creds.certificate().subject, "server");
    assert_eq!(anchor.name(), CA_NAME);
    assert_eq!(anchor.public_key(), &ca.public_key_bytes());
    tandemtrust::cert::verify(creds.encoded_certificate(), &anchor).unwrap();
}

#[test]
fn short_seed_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ca = IdentityKeyPair::generate();
    let path = provision(dir.path(), &ca, "server");
    fs::write(dir.path().join("party.seed"), [0u8; 31]).unwrap();

    let config = KeyMaterialConfig::from_file(&path).unwrap();
    assert!(matches!(
        LocalCredentials::load(&config),
        Err(TandemTrustError::KeyMaterial(_))
    ));
}

#[test]
fn seed_not_matching_certificate_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ca = IdentityKeyPair::generate();
    let path = provision(dir.path(), &ca, "server");
    fs::write(
        dir.path().join("party.seed"),
        IdentityKeyPair::generate().secret_key_bytes(),
    )
    .unwrap();

    let config = KeyMaterialConfig::from_file(&path).unwrap();
    assert!(matches!(
        LocalCredentials::load(&config),
        Err(TandemTrustError::KeyMaterial(_))
    ));
}

#[test]
fn anchor_must_be_self_signed() {
    let dir = tempfile::tempdir().unwrap();
    let ca = IdentityKeyPair::generate();
    let path = provision(dir.path(), &ca, "server");
    // Point the anchor at the party certificate instead.
    fs::copy(dir.path().join("party.cert"), dir.path().join("ca.cert")).unwrap();

    let config = KeyMaterialConfig::from_file(&path).unwrap();
    assert!(matches!(
        TrustAnchor::load(&config),
        Err(TandemTrustError::CertificateInvalid)
    ));
}

#[test]
fn missing_files_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        KeyMaterialConfig::from_file(dir.path().join("absent.json")),
        Err(TandemTrustError::KeyMaterial(_))
    ));

    let config = KeyMaterialConfig {
        identity_seed: dir.path().join("absent.seed"),
        certificate: dir.path().join("absent.cert"),
        trust_anchor: dir.path().join("absent.ca"),
    };
    assert!(LocalCredentials::load(&config).is_err());
    assert!(TrustAnchor::load(&config).is_err());
}
