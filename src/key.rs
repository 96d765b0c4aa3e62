use ecdsa::signature::{SignatureEncoding, Signer};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use pkcs8::EncodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::error::{Error, Result};

/// RSA bit lengths accepted by the `rsa-<bits>` selector.
const RSA_BITS_RANGE: std::ops::RangeInclusive<usize> = 4..=16000;

/// A generated signing key pair of one of the supported families.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP224 {
        signing_key: p224::ecdsa::SigningKey,
    },
    EcdsaP256 {
        signing_key: p256::ecdsa::SigningKey,
    },
    EcdsaP384 {
        signing_key: p384::ecdsa::SigningKey,
    },
    EcdsaP521 {
        signing_key: p521::ecdsa::SigningKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generates a key pair for a selector such as `rsa-2048`, `p256` or
    /// `ed25519`.
    ///
    /// The selector is case-insensitive and whitespace-trimmed. RSA bit
    /// lengths outside `[4, 16000]` fail with [`Error::InvalidKeySize`];
    /// unknown selectors fail with [`Error::UnsupportedKeyType`].
    pub fn generate(key_type: &str) -> Result<Self> {
        let kt = key_type.trim().to_ascii_lowercase();
        let mut rng = rand_core::OsRng;

        if kt.starts_with("rsa") {
            let digits = kt.replace('-', "");
            let digits = digits.trim_start_matches("rsa");
            let bits: usize = digits
                .parse()
                .map_err(|_| Error::InvalidKeySize(key_type.trim().to_string()))?;
            if !RSA_BITS_RANGE.contains(&bits) {
                return Err(Error::InvalidKeySize(key_type.trim().to_string()));
            }
            let private = RsaPrivateKey::new(&mut rng, bits)?;
            let public = RsaPublicKey::from(&private);
            return Ok(KeyPair::Rsa {
                private: Box::new(private),
                public,
            });
        }

        match kt.as_str() {
            "p224" | "p-224" | "secp224r1" => Ok(KeyPair::EcdsaP224 {
                signing_key: p224::ecdsa::SigningKey::random(&mut rng),
            }),
            "p256" | "p-256" | "prime256v1" => Ok(KeyPair::EcdsaP256 {
                signing_key: p256::ecdsa::SigningKey::random(&mut rng),
            }),
            "p384" | "p-384" | "secp384r1" => Ok(KeyPair::EcdsaP384 {
                signing_key: p384::ecdsa::SigningKey::random(&mut rng),
            }),
            "p512" | "p521" | "p-521" | "secp521r1" => Ok(KeyPair::EcdsaP521 {
                signing_key: p521::ecdsa::SigningKey::random(&mut rng),
            }),
            "ed25519" | "curve25519" => Ok(KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::generate(&mut rng),
            }),
            _ => Err(Error::UnsupportedKeyType(key_type.trim().to_string())),
        }
    }

    /// The subject-public-key-info encoding of the public half.
    pub fn spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            KeyPair::Rsa { public, .. } => SubjectPublicKeyInfoOwned::from_key(public.clone())?,
            KeyPair::EcdsaP224 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())?
            }
            KeyPair::EcdsaP256 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())?
            }
            KeyPair::EcdsaP384 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())?
            }
            KeyPair::EcdsaP521 { signing_key } => {
                // p521 0.13's ecdsa newtype does not expose `verifying_key`
                // or pkcs8 encodings (unlike the generic `ecdsa::SigningKey`
                // used by the other curves), so reconstruct the generic key
                // from the raw scalar to reach the same SPKI encoding.
                let signing_key = ecdsa::SigningKey::<p521::NistP521>::from_bytes(
                    &signing_key.to_bytes(),
                )
                .map_err(|e| Error::SigningFailed(format!("p521 key: {e}")))?;
                SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())?
            }
            KeyPair::Ed25519 { signing_key } => {
                SubjectPublicKeyInfoOwned::from_key(signing_key.verifying_key())?
            }
        };
        Ok(spki)
    }

    /// SHA-1 key identifier of the public key bit string, per RFC 5280
    /// method 1.
    pub fn key_id(&self) -> Result<Vec<u8>> {
        let spki = self.spki()?;
        let raw = spki.subject_public_key.raw_bytes();
        Ok(Sha1::digest(raw).to_vec())
    }

    /// PKCS#8 DER encoding of the private key.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der()?,
            KeyPair::EcdsaP224 { signing_key } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP256 { signing_key } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP384 { signing_key } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP521 { signing_key } => {
                // See `spki`: reconstruct the generic ecdsa key so the pkcs8
                // encoding is available for p521.
                let signing_key = ecdsa::SigningKey::<p521::NistP521>::from_bytes(
                    &signing_key.to_bytes(),
                )
                .map_err(|e| Error::SigningFailed(format!("p521 key: {e}")))?;
                signing_key.to_pkcs8_der()?
            }
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_der()?,
        };
        Ok(doc.as_bytes().to_vec())
    }

    /// The signature algorithm this key signs with when the template does
    /// not override it.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRsa,
            KeyPair::EcdsaP224 { .. } => SignatureAlgorithm::EcdsaWithSha224,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::EcdsaWithSha256,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::EcdsaWithSha384,
            KeyPair::EcdsaP521 { .. } => SignatureAlgorithm::EcdsaWithSha512,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// Signs `data` with the requested algorithm.
    ///
    /// ECDSA signatures are DER encoded; RSA uses PKCS#1 v1.5 padding. An
    /// algorithm from a different key family fails with
    /// [`Error::SigningFailed`].
    pub fn sign_with(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        match (self, algorithm) {
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha256WithRsa) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha384WithRsa) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha384>::new((**private).clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha512WithRsa) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha512>::new((**private).clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (KeyPair::EcdsaP224 { signing_key }, SignatureAlgorithm::EcdsaWithSha224) => {
                let signature: p224::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::EcdsaP256 { signing_key }, SignatureAlgorithm::EcdsaWithSha256) => {
                let signature: p256::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::EcdsaP384 { signing_key }, SignatureAlgorithm::EcdsaWithSha384) => {
                let signature: p384::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::EcdsaP521 { signing_key }, SignatureAlgorithm::EcdsaWithSha512) => {
                let signature: p521::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::Ed25519 { signing_key }, SignatureAlgorithm::Ed25519) => {
                let signature = signing_key.sign(data);
                Ok(signature.to_bytes().to_vec())
            }
            (_, algorithm) => Err(Error::SigningFailed(format!(
                "signature algorithm {algorithm:?} does not match the signing key"
            ))),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let family = match self {
            KeyPair::Rsa { .. } => "Rsa",
            KeyPair::EcdsaP224 { .. } => "EcdsaP224",
            KeyPair::EcdsaP256 { .. } => "EcdsaP256",
            KeyPair::EcdsaP384 { .. } => "EcdsaP384",
            KeyPair::EcdsaP521 { .. } => "EcdsaP521",
            KeyPair::Ed25519 { .. } => "Ed25519",
        };
        f.debug_struct("KeyPair").field("family", &family).finish()
    }
}
