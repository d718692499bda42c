use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OidcError;

/// JWS algorithms the provider can sign with.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// ECDSA on P-256 with SHA-256.
    ES256,
    /// ECDSA on P-384 with SHA-384.
    ES384,
    /// RSA-2048 PKCS#1 v1.5 with SHA-256.
    RS256,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::ES256 => "ES256",
            SigningAlgorithm::ES384 => "ES384",
            SigningAlgorithm::RS256 => "RS256",
        }
    }

    fn jwt_algorithm(&self) -> Algorithm {
        match self {
            SigningAlgorithm::ES256 => Algorithm::ES256,
            SigningAlgorithm::ES384 => Algorithm::ES384,
            SigningAlgorithm::RS256 => Algorithm::RS256,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ES256" => Ok(SigningAlgorithm::ES256),
            "ES384" => Ok(SigningAlgorithm::ES384),
            "RS256" => Ok(SigningAlgorithm::RS256),
            other => Err(OidcError::Config(format!(
                "unsupported signing algorithm '{other}', expected ES256, ES384 or RS256"
            ))),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public key parameters, base64url-encoded as they appear in the JWKS.
enum PublicKeyParams {
    Ec {
        crv: &'static str,
        x: String,
        y: String,
    },
    Rsa {
        n: String,
        e: String,
    },
}

/// Process-lifetime key pair for JWT signing and JWKS publication.
///
/// The private half never leaves this struct.
pub struct SigningKeys {
    algorithm: SigningAlgorithm,
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public: PublicKeyParams,
}

impl SigningKeys {
    /// Generate a fresh key pair for the given algorithm.
    pub fn generate(algorithm: SigningAlgorithm, kid: &str) -> Result<Self, OidcError> {
        let (encoding_key, decoding_key, public) = match algorithm {
            SigningAlgorithm::ES256 => generate_p256()?,
            SigningAlgorithm::ES384 => generate_p384()?,
            SigningAlgorithm::RS256 => generate_rsa()?,
        };
        debug!(%algorithm, kid, "Generated signing key pair");
        Ok(Self {
            algorithm,
            kid: kid.to_string(),
            encoding_key,
            decoding_key,
            public,
        })
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the JWKS representation of the public key.
    pub fn jwks(&self) -> Jwks {
        let mut jwk = Jwk {
            kty: String::new(),
            r#use: "sig".into(),
            kid: self.kid.clone(),
            alg: self.algorithm.as_str().into(),
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
        };
        match &self.public {
            PublicKeyParams::Ec { crv, x, y } => {
                jwk.kty = "EC".into();
                jwk.crv = Some((*crv).into());
                jwk.x = Some(x.clone());
                jwk.y = Some(y.clone());
            }
            PublicKeyParams::Rsa { n, e } => {
                jwk.kty = "RSA".into();
                jwk.n = Some(n.clone());
                jwk.e = Some(e.clone());
            }
        }
        Jwks { keys: vec![jwk] }
    }

    /// Sign the claims as a compact JWS with this key's algorithm and `kid`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, OidcError> {
        let mut header = Header::new(self.algorithm.jwt_algorithm());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| OidcError::SigningError(format!("failed to sign JWT: {e}")))
    }

    /// Check structure, algorithm, key ID, signature and issuer; return the claims.
    ///
    /// Expiry is left to the caller so that it can be evaluated against an
    /// explicit point in time.
    pub fn verify<T: DeserializeOwned>(&self, token: &str, issuer: &str) -> Result<T, OidcError> {
        let header = decode_header(token)
            .map_err(|e| OidcError::InvalidToken(format!("failed to decode header: {e}")))?;

        if header.alg != self.algorithm.jwt_algorithm() {
            return Err(OidcError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        if header.kid.as_deref() != Some(self.kid.as_str()) {
            return Err(OidcError::InvalidToken("unknown signing key".into()));
        }

        let mut validation = Validation::new(self.algorithm.jwt_algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[issuer]);

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| OidcError::InvalidToken(e.to_string()))
    }
}

fn key_error(e: impl fmt::Display) -> OidcError {
    OidcError::SigningError(format!("failed to generate signing key: {e}"))
}

type KeyMaterial = (EncodingKey, DecodingKey, PublicKeyParams);

fn ec_key_material(
    crv: &'static str,
    pkcs8_pem: &str,
    x: &[u8],
    y: &[u8],
) -> Result<KeyMaterial, OidcError> {
    let encoding_key = EncodingKey::from_ec_pem(pkcs8_pem.as_bytes()).map_err(key_error)?;
    let x = URL_SAFE_NO_PAD.encode(x);
    let y = URL_SAFE_NO_PAD.encode(y);
    let decoding_key = DecodingKey::from_ec_components(&x, &y).map_err(key_error)?;
    Ok((encoding_key, decoding_key, PublicKeyParams::Ec { crv, x, y }))
}

fn generate_p256() -> Result<KeyMaterial, OidcError> {
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::pkcs8::{EncodePrivateKey, LineEnding};

    let secret_key = p256::SecretKey::random(&mut OsRng);
    let pkcs8_pem = secret_key.to_pkcs8_pem(LineEnding::LF).map_err(key_error)?;
    let point = secret_key.public_key().to_encoded_point(false);
    let x = point.x().ok_or_else(|| key_error("missing x coordinate"))?;
    let y = point.y().ok_or_else(|| key_error("missing y coordinate"))?;
    ec_key_material("P-256", &pkcs8_pem, x, y)
}

fn generate_p384() -> Result<KeyMaterial, OidcError> {
    use p384::elliptic_curve::sec1::ToEncodedPoint;
    use p384::pkcs8::{EncodePrivateKey, LineEnding};

    let secret_key = p384::SecretKey::random(&mut OsRng);
    let pkcs8_pem = secret_key.to_pkcs8_pem(LineEnding::LF).map_err(key_error)?;
    let point = secret_key.public_key().to_encoded_point(false);
    let x = point.x().ok_or_else(|| key_error("missing x coordinate"))?;
    let y = point.y().ok_or_else(|| key_error("missing y coordinate"))?;
    ec_key_material("P-384", &pkcs8_pem, x, y)
}

fn generate_rsa() -> Result<KeyMaterial, OidcError> {
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::traits::PublicKeyParts;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).map_err(key_error)?;
    let public_key = RsaPublicKey::from(&private_key);

    let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(key_error)?;
    let encoding_key = EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes()).map_err(key_error)?;

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    let decoding_key = DecodingKey::from_rsa_components(&n, &e).map_err(key_error)?;

    Ok((encoding_key, decoding_key, PublicKeyParams::Rsa { n, e }))
}

/// JWKS document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A single public JWK. Only string-valued parameters, never private material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub r#use: String,
    pub kid: String,
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}
