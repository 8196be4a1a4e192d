// HTTP Digest authentication for PTS-2 controllers.
//
// The controller answers an unauthenticated POST with 401 and a
// `WWW-Authenticate: Digest ...` challenge. We parse the challenge with an
// explicit key/value parser (malformed input fails loudly instead of
// producing empty fields), derive the RFC 2617 response, and hand the
// transport a reusable credential whose nonce count advances per request.

use md5::Md5;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::error::Error;

/// Hash function mandated by the controller's Digest challenge.
///
/// PTS-2 firmware in the field speaks MD5; the algorithm is session
/// configuration so newer firmware can negotiate a stronger digest
/// without touching the handshake logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Lowercase hex digest of `input`.
    fn hash(self, input: &str) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(input.as_bytes())),
            Self::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }

    /// The `algorithm` token rendered into the Authorization header.
    fn token(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// Parsed `WWW-Authenticate: Digest` challenge parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    /// Defaults to `"auth"` when the controller omits it.
    pub qop: String,
    pub opaque: Option<String>,
}

/// Parse a `WWW-Authenticate` header value into a [`DigestChallenge`].
///
/// Accepts `key="value"` and bare `key=value` pairs separated by commas.
/// A challenge without the `Digest` scheme marker or without both `realm`
/// and `nonce` is rejected with [`Error::AuthChallengeMissing`].
pub fn parse_challenge(header: &str) -> Result<DigestChallenge, Error> {
    let rest = header
        .trim_start()
        .strip_prefix("Digest")
        .ok_or_else(|| Error::AuthChallengeMissing {
            message: format!("not a Digest challenge: {header:?}"),
        })?;

    let mut realm = None;
    let mut nonce = None;
    let mut qop = None;
    let mut opaque = None;

    for pair in split_pairs(rest) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "realm" => realm = Some(value.to_owned()),
            "nonce" => nonce = Some(value.to_owned()),
            // qop may list alternatives ("auth,auth-int"); we always use auth.
            "qop" => qop = Some(value.split(',').next().unwrap_or("auth").trim().to_owned()),
            "opaque" => opaque = Some(value.to_owned()),
            _ => {}
        }
    }

    let realm = realm.ok_or_else(|| Error::AuthChallengeMissing {
        message: "challenge has no realm".into(),
    })?;
    let nonce = nonce.ok_or_else(|| Error::AuthChallengeMissing {
        message: "challenge has no nonce".into(),
    })?;

    Ok(DigestChallenge {
        realm,
        nonce,
        qop: qop.unwrap_or_else(|| "auth".to_owned()),
        opaque,
    })
}

/// Split the challenge body on commas that are not inside quoted values.
fn split_pairs(body: &str) -> Vec<&str> {
    let mut pairs = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                pairs.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pairs.push(&body[start..]);
    pairs.retain(|p| !p.trim().is_empty());
    pairs
}

/// A computed Digest credential, valid for the lifetime of one challenge.
///
/// The response digest depends on the nonce count, so the credential
/// re-derives it for every request; `nonce_count` advances monotonically
/// until the controller issues a fresh challenge (which invalidates the
/// whole credential).
#[derive(Debug, Clone)]
pub struct DigestCredential {
    username: String,
    realm: String,
    nonce: String,
    uri: String,
    qop: String,
    opaque: Option<String>,
    cnonce: String,
    nonce_count: u32,
    ha1: String,
    ha2: String,
    algorithm: DigestAlgorithm,
}

impl DigestCredential {
    /// The response digest for the current nonce count.
    fn response(&self) -> String {
        let nc = format!("{:08x}", self.nonce_count);
        self.algorithm.hash(&format!(
            "{}:{}:{}:{}:{}:{}",
            self.ha1, self.nonce, nc, self.cnonce, self.qop, self.ha2
        ))
    }

    /// Render the `Authorization` header for the current nonce count,
    /// then advance the count for the next request.
    pub fn next_header(&mut self) -> String {
        let nc = format!("{:08x}", self.nonce_count);
        let response = self.response();
        self.nonce_count += 1;

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", \
             qop={}, nc={nc}, cnonce=\"{}\", response=\"{response}\", algorithm={}",
            self.username,
            self.realm,
            self.nonce,
            self.uri,
            self.qop,
            self.cnonce,
            self.algorithm.token(),
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }

    /// The nonce count that the next rendered header will carry.
    pub fn nonce_count(&self) -> u32 {
        self.nonce_count
    }
}

/// Performs the Digest challenge/response handshake against a controller
/// endpoint and produces a reusable [`DigestCredential`].
#[derive(Debug, Clone)]
pub struct DigestSession {
    username: String,
    password: SecretString,
    algorithm: DigestAlgorithm,
}

impl DigestSession {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            algorithm: DigestAlgorithm::default(),
        }
    }

    /// Override the digest algorithm (default MD5).
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Probe `url` unauthenticated and derive a credential from the 401
    /// challenge.
    ///
    /// Requires exactly HTTP 401 with a Digest `WWW-Authenticate` header;
    /// anything else means the peer is not doing Digest auth and we fail
    /// with [`Error::AuthChallengeMissing`] rather than guessing.
    pub async fn authenticate(
        &self,
        http: &reqwest::Client,
        url: &Url,
        method: &str,
        request_uri: &str,
    ) -> Result<DigestCredential, Error> {
        debug!("digest probe {method} {url}");

        let resp = http
            .post(url.clone())
            .send()
            .await
            .map_err(Error::AuthTransport)?;

        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::AuthChallengeMissing {
                message: format!("probe returned HTTP {} instead of 401", resp.status()),
            });
        }

        let header = resp
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::AuthChallengeMissing {
                message: "401 response carries no WWW-Authenticate header".into(),
            })?;

        let challenge = parse_challenge(header)?;
        debug!(realm = %challenge.realm, qop = %challenge.qop, "digest challenge received");

        Ok(self.credential(&challenge, method, request_uri))
    }

    /// Derive a credential from an already-parsed challenge.
    ///
    /// Split out from [`authenticate`](Self::authenticate) so the
    /// computation can be verified against fixture challenges without a
    /// live peer.
    pub fn credential(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        request_uri: &str,
    ) -> DigestCredential {
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        self.credential_with_cnonce(challenge, method, request_uri, cnonce)
    }

    /// Like [`credential`](Self::credential) with a caller-supplied client
    /// nonce, for deterministic verification.
    pub fn credential_with_cnonce(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        request_uri: &str,
        cnonce: String,
    ) -> DigestCredential {
        let ha1 = self.algorithm.hash(&format!(
            "{}:{}:{}",
            self.username,
            challenge.realm,
            self.password.expose_secret()
        ));
        let ha2 = self.algorithm.hash(&format!("{method}:{request_uri}"));

        DigestCredential {
            username: self.username.clone(),
            realm: challenge.realm.clone(),
            nonce: challenge.nonce.clone(),
            uri: request_uri.to_owned(),
            qop: challenge.qop.clone(),
            opaque: challenge.opaque.clone(),
            cnonce,
            nonce_count: 1,
            ha1,
            ha2,
            algorithm: self.algorithm,
        }
    }
}
