//! SASL authentication framing.
//!
//! Only the PLAIN and EXTERNAL mechanisms are framed here; anything else a
//! server advertises is reported but not spoken.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single AUTHENTICATE payload chunk.
pub const SASL_CHUNK_SIZE: usize = 400;

/// A SASL mechanism name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SaslMechanism {
    /// PLAIN (RFC 4616): account and password.
    Plain,
    /// EXTERNAL: TLS client certificate.
    External,
    /// Anything the engine does not speak.
    Unknown(String),
}

impl SaslMechanism {
    /// Parse a mechanism name.
    pub fn parse(name: &str) -> SaslMechanism {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => SaslMechanism::Plain,
            "EXTERNAL" => SaslMechanism::External,
            _ => SaslMechanism::Unknown(name.to_owned()),
        }
    }

    /// The canonical name.
    pub fn as_str(&self) -> &str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::External => "EXTERNAL",
            SaslMechanism::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode PLAIN credentials: `base64(authzid NUL authcid NUL password)`
/// with an empty authzid.
pub fn encode_plain(account: &str, password: &str) -> String {
    let payload = format!("\0{}\0{}", account, password);
    BASE64.encode(payload.as_bytes())
}

/// Encode an EXTERNAL response: `+` for the default identity, otherwise
/// the base64 of the authzid.
pub fn encode_external(authzid: Option<&str>) -> String {
    match authzid {
        Some(id) if !id.is_empty() => BASE64.encode(id.as_bytes()),
        _ => "+".to_owned(),
    }
}

/// Split an encoded response into AUTHENTICATE-sized chunks.
///
/// A response whose final chunk is exactly full must be followed by a bare
/// `+`; the iterator yields that terminator.
pub fn chunk_response(encoded: &str) -> Vec<&str> {
    if encoded.is_empty() {
        return vec!["+"];
    }
    let mut chunks: Vec<&str> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        // base64 is always ASCII
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect();
    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+");
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain() {
        let encoded = encode_plain("testuser", "testpass");
        let decoded = BASE64.decode(&encoded).unwrap();
        assert_eq!(decoded, b"\0testuser\0testpass");
    }

    #[test]
    fn test_encode_external() {
        assert_eq!(encode_external(None), "+");
        let encoded = encode_external(Some("myuser"));
        assert_eq!(BASE64.decode(&encoded).unwrap(), b"myuser");
    }

    #[test]
    fn test_mechanism_parse() {
        assert_eq!(SaslMechanism::parse("plain"), SaslMechanism::Plain);
        assert_eq!(SaslMechanism::parse("EXTERNAL"), SaslMechanism::External);
        assert_eq!(
            SaslMechanism::parse("SCRAM-SHA-256"),
            SaslMechanism::Unknown("SCRAM-SHA-256".into())
        );
    }

    #[test]
    fn test_chunk_short_response() {
        assert_eq!(chunk_response("abc123"), vec!["abc123"]);
    }

    #[test]
    fn test_chunk_long_response() {
        let long = "a".repeat(500);
        let chunks = chunk_response(&long);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 400);
        assert_eq!(chunks[1].len(), 100);
    }

    #[test]
    fn test_chunk_exact_multiple_gets_terminator() {
        let exact = "a".repeat(800);
        let chunks = chunk_response(&exact);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], "+");
    }

    #[test]
    fn test_chunk_empty_is_plus() {
        assert_eq!(chunk_response(""), vec!["+"]);
    }
}
