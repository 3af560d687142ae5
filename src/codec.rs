//! Mailbox name encodings.
//!
//! Servers that do not advertise `UTF8=ACCEPT` (or `ALL`/`ONLY`) exchange mailbox names in the
//! modified UTF-7 encoding of [RFC 3501 section
//! 5.1.3](https://tools.ietf.org/html/rfc3501#section-5.1.3). The session only talks to the
//! encoding through [`TextCodec`], so callers can plug in something else.

use base64::alphabet;
use base64::engine::general_purpose::NO_PAD;
use base64::engine::GeneralPurpose;
use base64::Engine;

use crate::error::{Error, Result};

const MUTF7: GeneralPurpose = GeneralPurpose::new(&alphabet::IMAP_MUTF7, NO_PAD);

/// Conversion between the legacy wire encoding of mailbox names and Rust strings.
pub trait TextCodec {
    /// Convert a name as received from the server. This never fails: names that are not valid
    /// in the legacy encoding are passed through as (lossy) UTF-8.
    fn to_universal(&self, raw: &[u8]) -> String;

    /// Convert a name into the legacy wire encoding.
    fn to_legacy(&self, text: &str) -> Result<String>;
}

/// Modified UTF-7, as used for IMAP mailbox names.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModifiedUtf7;

impl TextCodec for ModifiedUtf7 {
    fn to_universal(&self, raw: &[u8]) -> String {
        decode_utf7(raw).unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned())
    }

    fn to_legacy(&self, text: &str) -> Result<String> {
        encode_utf7(text)
    }
}

fn flush_shifted(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    let octets: Vec<u8> = pending.iter().flat_map(|unit| unit.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(octets));
    out.push('-');
    pending.clear();
}

/// Encode `text` as modified UTF-7. Names cannot carry NUL, CR or LF.
pub fn encode_utf7(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut pending = Vec::new();
    for c in text.chars() {
        match c {
            '\0' | '\r' | '\n' => return Err(Error::Encoding(text.to_string())),
            '&' => {
                flush_shifted(&mut out, &mut pending);
                out.push_str("&-");
            }
            ' '..='~' => {
                flush_shifted(&mut out, &mut pending);
                out.push(c);
            }
            _ => {
                let mut units = [0u16; 2];
                pending.extend_from_slice(c.encode_utf16(&mut units));
            }
        }
    }
    flush_shifted(&mut out, &mut pending);
    Ok(out)
}

/// Decode modified UTF-7. Returns `None` if `input` is not valid modified UTF-7.
pub fn decode_utf7(input: &[u8]) -> Option<String> {
    let mut output = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'&' => {
                let start = i + 1;
                let end = start + input[start..].iter().position(|&b| b == b'-')?;
                if start == end {
                    output.push('&');
                } else {
                    let octets = MUTF7.decode(&input[start..end]).ok()?;
                    let text = encoding_rs::UTF_16BE
                        .decode_without_bom_handling_and_without_replacement(&octets)?;
                    output.push_str(&text);
                }
                i = end;
            }
            c @ 0x20..=0x7e => output.push(c as char),
            _ => return None,
        }
        i += 1;
    }
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        assert_eq!(decode_utf7(b"").unwrap(), "");
        assert_eq!(decode_utf7(b"INBOX.Sent").unwrap(), "INBOX.Sent");
        assert_eq!(decode_utf7(b"&-").unwrap(), "&");
        assert_eq!(
            decode_utf7(b"~peter/mail/&U,BTFw-/&ZeVnLIqe-").unwrap(),
            "~peter/mail/台北/日本語"
        );
        assert_eq!(decode_utf7(b"&Jjo-!").unwrap(), "☺!");
    }

    #[test]
    fn decode_invalid() {
        assert_eq!(decode_utf7(b"&Jjo!"), None);
        assert_eq!(decode_utf7("Entwürfe".as_bytes()), None);
    }

    #[test]
    fn encode() {
        assert_eq!(encode_utf7("INBOX").unwrap(), "INBOX");
        assert_eq!(encode_utf7("Tom & Jerry").unwrap(), "Tom &- Jerry");
        assert_eq!(
            encode_utf7("~peter/mail/台北/日本語").unwrap(),
            "~peter/mail/&U,BTFw-/&ZeVnLIqe-"
        );
        assert_eq!(encode_utf7("Entwürfe").unwrap(), "Entw&APw-rfe");
    }

    #[test]
    fn encode_rejects_line_breaks() {
        match encode_utf7("a\r\nb") {
            Err(Error::Encoding(_)) => {}
            r => panic!("expected encoding error: {:?}", r),
        }
    }

    #[test]
    fn codec_passes_through_utf8() {
        let codec = ModifiedUtf7;
        assert_eq!(codec.to_universal("Entwürfe".as_bytes()), "Entwürfe");
        assert_eq!(codec.to_universal(b"Entw&APw-rfe"), "Entwürfe");
    }
}
