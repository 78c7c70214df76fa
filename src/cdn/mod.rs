use std::path::PathBuf;

use base64::Engine;
use chrono::Utc;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::catalog::Video;
use crate::errors::Result;

#[derive(Clone, Deserialize)]
pub struct CdnConfig {
    domain: String,
    key_pair_id: String,
    private_key_file: PathBuf,
    cookie_domain: String,
    cookie_ttl_seconds: i64,
    #[serde(default)]
    sign_cookies: bool,
}

impl CdnConfig {
    pub fn new_gate(&self) -> Result<CdnGate> {
        let signer = if self.sign_cookies {
            let pem = std::fs::read_to_string(&self.private_key_file)?;
            Some(CookieSigner::new(
                self.key_pair_id.clone(),
                &pem,
                self.cookie_domain.clone(),
                self.cookie_ttl_seconds,
            )?)
        } else {
            None
        };
        Ok(CdnGate::new(self.domain.clone(), signer))
    }
}

/// Gate in front of CDN delivery. Computes delivery URLs and, when built
/// with a signer, issues the signed cookies the CDN checks; without one,
/// delivery is assumed unauthenticated and no cookies are produced.
#[derive(Clone)]
pub struct CdnGate {
    domain: String,
    signer: Option<CookieSigner>,
}

impl CdnGate {
    pub fn new(domain: String, signer: Option<CookieSigner>) -> Self {
        Self { domain, signer }
    }

    /// CDN URL of the video's HLS manifest; `None` until the transcoder has
    /// recorded one.
    pub fn hls_url(&self, video: &Video) -> Option<String> {
        video
            .hls_key
            .as_ref()
            .map(|hls_key| format!("{}/{}", self.domain, hls_key))
    }

    /// Cookie scope covering every listing thumbnail.
    pub fn thumbnails_resource(&self) -> String {
        format!("{}/thumbnails/*", self.domain)
    }

    /// Cookie scope covering everything next to an HLS manifest URL.
    pub fn hls_resource(&self, hls_url: &str) -> String {
        hls_url.replace("master.m3u8", "*")
    }

    pub fn cookies_for(&self, resource: &str) -> Result<Vec<SignedCookie>> {
        match &self.signer {
            Some(signer) => signer.cookies_for(resource),
            None => Ok(Vec::new()),
        }
    }
}

/// Signs CloudFront canned policies: RSA PKCS#1 v1.5 over SHA-1, the only
/// algorithm the CDN accepts for cookie credentials.
#[derive(Clone)]
pub struct CookieSigner {
    key_pair_id: String,
    signing_key: SigningKey<Sha1>,
    cookie_domain: String,
    ttl_seconds: i64,
}

impl CookieSigner {
    pub fn new(
        key_pair_id: String,
        private_key_pem: &str,
        cookie_domain: String,
        ttl_seconds: i64,
    ) -> Result<Self> {
        let private_key = if private_key_pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(private_key_pem)?
        } else {
            RsaPrivateKey::from_pkcs8_pem(private_key_pem)?
        };
        Ok(Self {
            key_pair_id,
            signing_key: SigningKey::new(private_key),
            cookie_domain,
            ttl_seconds,
        })
    }

    /// The three CloudFront cookies granting access to `resource` until
    /// `now + ttl`.
    pub fn cookies_for(&self, resource: &str) -> Result<Vec<SignedCookie>> {
        self.cookies_at(resource, Utc::now().timestamp() + self.ttl_seconds)
    }

    fn cookies_at(&self, resource: &str, expires: i64) -> Result<Vec<SignedCookie>> {
        let policy = serde_json::to_string(&Policy::new(resource, expires))?;
        let signature = self.signing_key.try_sign(policy.as_bytes())?;

        Ok(vec![
            SignedCookie {
                name: "CloudFront-Policy",
                value: cloudfront_b64(policy.as_bytes()),
                domain: self.cookie_domain.clone(),
            },
            SignedCookie {
                name: "CloudFront-Signature",
                value: cloudfront_b64(&signature.to_vec()),
                domain: self.cookie_domain.clone(),
            },
            SignedCookie {
                name: "CloudFront-Key-Pair-Id",
                value: self.key_pair_id.clone(),
                domain: self.cookie_domain.clone(),
            },
        ])
    }
}

// Field order is the wire layout CloudFront signs; serde emits struct
// fields in declaration order.
#[derive(Serialize)]
struct Policy {
    #[serde(rename = "Statement")]
    statement: Vec<Statement>,
}

#[derive(Serialize)]
struct Statement {
    #[serde(rename = "Resource")]
    resource: String,
    #[serde(rename = "Condition")]
    condition: Condition,
}

#[derive(Serialize)]
struct Condition {
    #[serde(rename = "DateLessThan")]
    date_less_than: DateLessThan,
}

#[derive(Serialize)]
struct DateLessThan {
    #[serde(rename = "AWS:EpochTime")]
    epoch_time: i64,
}

impl Policy {
    fn new(resource: &str, expires: i64) -> Self {
        Policy {
            statement: vec![Statement {
                resource: resource.to_string(),
                condition: Condition {
                    date_less_than: DateLessThan {
                        epoch_time: expires,
                    },
                },
            }],
        }
    }
}

/// CloudFront's cookie-safe base64: standard alphabet, then `+` `=` `/`
/// swapped for `-` `_` `~`.
fn cloudfront_b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD
        .encode(data)
        .replace('+', "-")
        .replace('=', "_")
        .replace('/', "~")
}

/// One issued cookie plus the domain scope it must be set under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookie {
    pub name: &'static str,
    pub value: String,
    pub domain: String,
}

impl SignedCookie {
    /// `Set-Cookie` rendering with the attributes CDN credentials require.
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Domain={}; Path=/; Secure; HttpOnly",
            self.name, self.value, self.domain
        )
    }
}
