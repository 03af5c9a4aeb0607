//! Line framing for the byte stream.
//!
//! Splits the inbound stream on `\n` (tolerating lone `\n` as well as
//! `\r\n`), decodes UTF-8 with a configurable single-byte fallback for the
//! legacy traffic still common on IRC, and appends `\r\n` on the way out.
//! Length limits are not enforced here: over-limit lines are delivered and
//! flagged during parsing instead.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::message::Message;

/// Frame codec: one IRC line per item.
#[derive(Debug)]
pub struct LineCodec {
    fallback: &'static encoding::Encoding,
}

impl LineCodec {
    /// `fallback` is an encoding label (e.g. `"cp1252"`, `"latin1"`) used
    /// when a line is not valid UTF-8. Unknown labels fall back to
    /// windows-1252.
    pub fn new(fallback: &str) -> LineCodec {
        LineCodec {
            fallback: encoding::Encoding::for_label(fallback.as_bytes())
                .unwrap_or(encoding::WINDOWS_1252),
        }
    }

    fn decode_bytes(&self, bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_owned(),
            Err(_) => {
                let (decoded, _, had_errors) = self.fallback.decode(bytes);
                if had_errors {
                    tracing::debug!(
                        encoding = self.fallback.name(),
                        "lossy decode of non-UTF-8 line"
                    );
                }
                decoded.into_owned()
            }
        }
    }
}

impl Default for LineCodec {
    fn default() -> LineCodec {
        LineCodec::new("utf-8")
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        let Some(newline) = src.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let mut line = src.split_to(newline + 1);
        while matches!(line.last(), Some(b'\r') | Some(b'\n')) {
            line.truncate(line.len() - 1);
        }
        Ok(Some(self.decode_bytes(&line)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), std::io::Error> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

impl Encoder<&Message> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<(), std::io::Error> {
        <LineCodec as Encoder<String>>::encode(self, msg.to_string(), dst)
    }
}
