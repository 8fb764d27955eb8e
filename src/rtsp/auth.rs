//! Basic and Digest authentication, client side: parses a `WWW-Authenticate`
//! challenge from a 401 response and produces the matching `Authorization`
//! header. A client retries a request exactly once after a challenge; a
//! second 401 is a hard failure (`Error::WrongCredentials`), never a loop.

use md5::{Digest, Md5};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Challenge {
    Basic,
    Digest {
        realm: String,
        nonce: String,
        qop: Option<String>,
    },
}

/// Parses a `WWW-Authenticate` header value. Digest is preferred when a
/// server (unusually) offers both in separate headers; callers pass
/// whichever single header value they received.
pub fn parse_challenge(header: &str) -> Result<Challenge> {
    let header = header.trim();
    if let Some(rest) = header.strip_prefix("Digest ") {
        let params = parse_params(rest);
        let realm = params
            .get("realm")
            .ok_or_else(|| Error::MalformedMessage("digest challenge missing realm".into()))?
            .clone();
        let nonce = params
            .get("nonce")
            .ok_or_else(|| Error::MalformedMessage("digest challenge missing nonce".into()))?
            .clone();
        let qop = params.get("qop").cloned();
        Ok(Challenge::Digest { realm, nonce, qop })
    } else if header.starts_with("Basic") {
        Ok(Challenge::Basic)
    } else {
        Err(Error::MalformedMessage(format!(
            "unsupported auth scheme: {header}"
        )))
    }
}

fn parse_params(s: &str) -> std::collections::HashMap<String, String> {
    let mut out = std::collections::HashMap::new();
    for part in s.split(',') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            out.insert(
                key.trim().to_owned(),
                value.trim().trim_matches('"').to_owned(),
            );
        }
    }
    out
}

/// Builds the `Authorization` header value for one request, given the
/// credentials, challenge, and (for Digest) the request's method and URI.
pub fn authorize(
    challenge: &Challenge,
    user: &str,
    pass: &str,
    method: &str,
    uri: &str,
) -> String {
    match challenge {
        Challenge::Basic => {
            use base64::Engine;
            let raw = format!("{user}:{pass}");
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(raw)
            )
        }
        Challenge::Digest { realm, nonce, .. } => {
            let ha1 = md5_hex(&format!("{user}:{realm}:{pass}"));
            let ha2 = md5_hex(&format!("{method}:{uri}"));
            let response = md5_hex(&format!("{ha1}:{nonce}:{ha2}"));
            format!(
                "Digest username=\"{user}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", response=\"{response}\""
            )
        }
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Drives the one-retry auth flow: given the credentials needed to answer a
/// challenge (or their absence), decides whether a request should be
/// retried with an `Authorization` header.
pub fn credentials_required(user: Option<&str>, pass: Option<&str>) -> Result<(String, String)> {
    match (user, pass) {
        (Some(u), Some(p)) => Ok((u.to_owned(), p.to_owned())),
        _ => Err(Error::AuthNotProvided),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_challenge() {
        let challenge = parse_challenge("Basic realm=\"cam\"").unwrap();
        assert!(matches!(challenge, Challenge::Basic));
    }

    #[test]
    fn parses_digest_challenge() {
        let challenge =
            parse_challenge("Digest realm=\"cam\", nonce=\"abc123\", qop=\"auth\"").unwrap();
        match challenge {
            Challenge::Digest { realm, nonce, qop } => {
                assert_eq!(realm, "cam");
                assert_eq!(nonce, "abc123");
                assert_eq!(qop.as_deref(), Some("auth"));
            }
            _ => panic!("expected digest"),
        }
    }

    #[test]
    fn basic_authorize_is_base64_of_user_colon_pass() {
        let header = authorize(&Challenge::Basic, "admin", "secret", "GET", "/");
        assert!(header.starts_with("Basic "));
    }

    #[test]
    fn digest_authorize_is_deterministic() {
        let challenge = Challenge::Digest {
            realm: "cam".into(),
            nonce: "abc123".into(),
            qop: None,
        };
        let a = authorize(&challenge, "admin", "secret", "DESCRIBE", "rtsp://host/1");
        let b = authorize(&challenge, "admin", "secret", "DESCRIBE", "rtsp://host/1");
        assert_eq!(a, b);
        assert!(a.starts_with("Digest "));
    }

    #[test]
    fn missing_credentials_is_a_typed_error() {
        let err = credentials_required(None, None).unwrap_err();
        assert!(matches!(err, Error::AuthNotProvided));
    }
}
