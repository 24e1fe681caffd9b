//! RFC 2617 digest authentication: parsing a `WWW-Authenticate` /
//! `Proxy-Authenticate` challenge and computing the `Authorization`
//! response, with or without `qop=auth` (spec §4.A `RegisterLine`).

use md5::{Digest, Md5};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
}

/// Parse a `Digest realm="...", nonce="...", qop="auth", ...` header value.
pub fn parse_challenge(header_value: &str) -> Result<Challenge> {
    let rest = header_value
        .trim()
        .strip_prefix("Digest")
        .ok_or_else(|| Error::UnsupportedAuthScheme(header_value.to_string()))?
        .trim();

    let mut realm = None;
    let mut nonce = None;
    let mut qop = None;
    let mut opaque = None;

    for part in split_params(rest) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| Error::Malformed(format!("bad auth param: {part}")))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "realm" => realm = Some(value.to_string()),
            "nonce" => nonce = Some(value.to_string()),
            "qop" => qop = Some(value.to_string()),
            "opaque" => opaque = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(Challenge {
        realm: realm.ok_or(Error::MissingHeader("realm"))?,
        nonce: nonce.ok_or(Error::MissingHeader("nonce"))?,
        qop,
        opaque,
    })
}

/// Split a comma-separated auth-param list while respecting quoted commas.
fn split_params(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim());
    out
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Simple digest response (no `qop`): `MD5(HA1:nonce:HA2)`.
pub fn response_simple(username: &str, realm: &str, password: &str, nonce: &str, method: &str, uri: &str) -> String {
    let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
}

/// `qop=auth` digest response: `MD5(HA1:nonce:nc:cnonce:qop:HA2)`.
#[allow(clippy::too_many_arguments)]
pub fn response_with_qop(
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    method: &str,
    uri: &str,
    qop: &str,
    nc: &str,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"))
}

/// Build the full `Authorization` header value for a REGISTER retry.
#[allow(clippy::too_many_arguments)]
pub fn build_authorization_header(
    username: &str,
    password: &str,
    challenge: &Challenge,
    method: &str,
    uri: &str,
    nc: &str,
    cnonce: &str,
) -> String {
    let realm = &challenge.realm;
    let nonce = &challenge.nonce;

    if let Some(qop) = &challenge.qop {
        let response = response_with_qop(username, realm, password, nonce, method, uri, qop, nc, cnonce);
        format!(
            "Digest username=\"{username}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", \
             response=\"{response}\", qop={qop}, nc={nc}, cnonce=\"{cnonce}\", algorithm=MD5"
        )
    } else {
        let response = response_simple(username, realm, password, nonce, method, uri);
        format!(
            "Digest username=\"{username}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", \
             response=\"{response}\", algorithm=MD5"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2617_fixture_with_qop_matches_known_response() {
        // The canonical RFC 2617 §3.5 worked example.
        let response = response_with_qop(
            "Mufasa",
            "testrealm@host.com",
            "Circle Of Life",
            "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            "GET",
            "/dir/index.html",
            "auth",
            "00000001",
            "0a4f113b",
        );
        assert_eq!(response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn simple_response_without_qop_is_the_three_part_form() {
        let response = response_simple("1002", "pbx", "secret", "xyz", "REGISTER", "sip:pbx");
        let ha1 = md5_hex("1002:pbx:secret");
        let ha2 = md5_hex("REGISTER:sip:pbx");
        let expected = md5_hex(&format!("{ha1}:xyz:{ha2}"));
        assert_eq!(response, expected);
    }

    #[test]
    fn parses_challenge_without_qop() {
        let challenge = parse_challenge("Digest realm=\"pbx\", nonce=\"xyz\"").unwrap();
        assert_eq!(challenge.realm, "pbx");
        assert_eq!(challenge.nonce, "xyz");
        assert!(challenge.qop.is_none());
    }

    #[test]
    fn parses_challenge_with_qop_and_opaque() {
        let challenge = parse_challenge(
            "Digest realm=\"pbx\", qop=\"auth\", nonce=\"xyz\", opaque=\"5ccc069c\"",
        )
        .unwrap();
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.opaque.as_deref(), Some("5ccc069c"));
    }

    #[test]
    fn authorization_header_picks_form_based_on_qop_presence() {
        let no_qop = Challenge {
            realm: "pbx".into(),
            nonce: "xyz".into(),
            qop: None,
            opaque: None,
        };
        let header = build_authorization_header("1002", "secret", &no_qop, "REGISTER", "sip:pbx", "00000001", "c1");
        assert!(!header.contains("qop="));

        let with_qop = Challenge {
            qop: Some("auth".into()),
            ..no_qop
        };
        let header = build_authorization_header("1002", "secret", &with_qop, "REGISTER", "sip:pbx", "00000001", "c1");
        assert!(header.contains("qop=auth"));
    }
}
