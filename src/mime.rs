//! Decoding of [RFC 2047](https://tools.ietf.org/html/rfc2047) encoded words, as found in
//! envelope subjects and display names.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

// senders are sloppy with base64 padding in headers
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

lazy_static! {
    static ref ENCODED_WORD: Regex = Regex::new(r"=\?([^?\s]+)\?([BbQq])\?([^?\s]*)\?=").unwrap();
}

/// Decode every encoded word (`=?charset?encoding?text?=`) in `input`.
///
/// Input without encoded words is returned unchanged. Whitespace between two adjacent encoded
/// words is dropped. Words in a charset that is not recognized are decoded from their transfer
/// encoding and then passed through as (lossy) UTF-8; words that cannot be decoded at all are
/// left as they were.
pub fn decode_header(input: &str) -> String {
    if !ENCODED_WORD.is_match(input) {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut after_word = false;
    for cap in ENCODED_WORD.captures_iter(input) {
        let whole = match cap.get(0) {
            Some(m) => m,
            None => continue,
        };
        let gap = &input[last..whole.start()];
        if !(after_word && gap.chars().all(char::is_whitespace)) {
            out.push_str(gap);
        }
        match decode_word(&cap) {
            Some(text) => out.push_str(&text),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
        after_word = true;
    }
    out.push_str(&input[last..]);
    out
}

fn decode_word(cap: &Captures<'_>) -> Option<String> {
    let charset = &cap[1];
    let text = &cap[3];
    let octets = match &cap[2] {
        "B" | "b" => LENIENT.decode(text).ok()?,
        _ => decode_q(text),
    };

    // RFC 2231 allows a language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8") {
        return Some(String::from_utf8_lossy(&octets).into_owned());
    }
    Some(match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => encoding
            .decode_without_bom_handling(&octets)
            .0
            .into_owned(),
        None => {
            log::debug!("unknown charset {:?} in encoded word", charset);
            String::from_utf8_lossy(&octets).into_owned()
        }
    })
}

/// The `Q` encoding: quoted-printable with `_` standing in for space.
fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => match bytes.get(i + 1..i + 3).filter(|pair| is_hex_pair(pair)) {
                Some(pair) => {
                    out.push(hex_value(pair[0]) << 4 | hex_value(pair[1]));
                    i += 2;
                }
                None => out.push(b'='),
            },
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn is_hex_pair(pair: &[u8]) -> bool {
    pair.iter().all(u8::is_ascii_hexdigit)
}

fn hex_value(digit: u8) -> u8 {
    (digit as char).to_digit(16).unwrap_or(0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_word() {
        assert_eq!(decode_header("=?UTF-8?B?SGVsbG8=?="), "Hello");
        assert_eq!(decode_header("=?utf-8?b?SGVsbG8?="), "Hello");
    }

    #[test]
    fn q_word() {
        assert_eq!(decode_header("=?UTF-8?Q?Hello_World?="), "Hello World");
        assert_eq!(decode_header("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
    }

    #[test]
    fn unchanged_without_encoded_words() {
        assert_eq!(decode_header("Plain subject"), "Plain subject");
        assert_eq!(decode_header("=?broken"), "=?broken");
        assert_eq!(decode_header(""), "");
    }

    #[test]
    fn mixed_text_and_adjacent_words() {
        assert_eq!(
            decode_header("Re: =?UTF-8?Q?caf=C3=A9?= =?UTF-8?Q?_au_lait?= ok"),
            "Re: café au lait ok"
        );
    }

    #[test]
    fn legacy_charsets() {
        assert_eq!(decode_header("=?ISO-8859-1?Q?Gr=FC=DFe?="), "Grüße");
        assert_eq!(decode_header("=?windows-1252?B?gA==?="), "€");
    }

    #[test]
    fn unknown_charset_passes_bytes_through() {
        assert_eq!(decode_header("=?x-unknown?Q?abc?="), "abc");
    }

    #[test]
    fn language_suffix() {
        assert_eq!(decode_header("=?UTF-8*en?Q?hi?="), "hi");
    }

    #[test]
    fn undecodable_word_left_alone() {
        assert_eq!(decode_header("=?UTF-8?B?@@@?="), "=?UTF-8?B?@@@?=");
    }

    #[test]
    fn stray_equals_in_q() {
        assert_eq!(decode_header("=?UTF-8?Q?a=ZZb=4?="), "a=ZZb=4");
    }
}
