//! Builders that turn the data part of untagged responses into typed results.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;

use crate::codec::TextCodec;
use crate::error::ParseError;
use crate::tokens::{self, Token};
use crate::types::{Capabilities, Flag, MailboxStatus, Name, NameAttribute, StatusItem};

lazy_static! {
    static ref PAREN_LIST: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
    static ref TRAILING_PAREN_LIST: Regex = Regex::new(r"\(([^()]*)\)\s*$").unwrap();
    static ref STATUS_PAIR: Regex =
        Regex::new(r"(?i)\b(MESSAGES|RECENT|UIDNEXT|UIDVALIDITY|UNSEEN)\s+(\d+)").unwrap();
    static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();
}

/// `* CAPABILITY` data, e.g. `IMAP4rev1 AUTH=PLAIN AUTH=LOGIN UTF8=ACCEPT`.
pub fn parse_capabilities(data: &str) -> Capabilities {
    let mut caps = Capabilities::default();
    for token in data.split_whitespace() {
        caps.insert(token);
    }
    caps
}

/// `* LIST` / `* LSUB` data, e.g. `(\HasNoChildren) "/" "INBOX.Sent"`.
///
/// The name is converted out of the wire encoding with `codec`.
pub fn parse_name(data: &str, codec: &dyn TextCodec) -> Result<Name, ParseError> {
    let bad = || ParseError::Listing(data.to_string());
    let fields = tokens::decode(data).map_err(|_| bad())?;
    match fields.as_slice() {
        [Token::List(attrs), delimiter, name] => {
            let attributes = attrs
                .iter()
                .map(|a| a.as_str().map(NameAttribute::from))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(bad)?;
            let delimiter = match *delimiter {
                Token::Nil => None,
                ref d => Some(d.to_text().ok_or_else(bad)?),
            };
            let raw = name.to_text().ok_or_else(bad)?;
            Ok(Name {
                attributes,
                delimiter,
                name: codec.to_universal(raw.as_bytes()),
            })
        }
        _ => Err(bad()),
    }
}

/// `* STATUS` data, e.g. `"INBOX" (MESSAGES 12 UIDNEXT 45)`.
pub fn parse_status(data: &str) -> Result<MailboxStatus, ParseError> {
    let bad = || ParseError::Status(data.to_string());
    let counters = TRAILING_PAREN_LIST
        .captures(data)
        .and_then(|cap| cap.get(1))
        .ok_or_else(bad)?
        .as_str();

    let mut status = MailboxStatus::default();
    let mut found = false;
    for cap in STATUS_PAIR.captures_iter(counters) {
        let item = StatusItem::from_name(&cap[1]).ok_or_else(bad)?;
        let value = cap[2].parse::<u32>().map_err(|_| bad())?;
        status.set(item, value);
        found = true;
    }
    if !found {
        return Err(bad());
    }
    Ok(status)
}

/// `* SEARCH` data: every run of digits, in the order sent.
pub fn parse_ids(data: &str) -> Result<Vec<u32>, ParseError> {
    DIGITS
        .find_iter(data)
        .map(|m| {
            m.as_str()
                .parse::<u32>()
                .map_err(|_| ParseError::Search(data.to_string()))
        })
        .collect()
}

/// `* FLAGS` data, or the argument of a `PERMANENTFLAGS` response code.
pub fn parse_flags(data: &str) -> Result<Vec<Flag>, ParseError> {
    let items = paren_list(data).ok_or_else(|| ParseError::Flags(data.to_string()))?;
    Ok(Flag::from_strs(items).collect())
}

/// The words of the first parenthesized list in `data`.
pub(crate) fn paren_list(data: &str) -> Option<Vec<&str>> {
    PAREN_LIST
        .captures(data)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().split_whitespace().collect())
}

/// Decode the base64 challenge of an `AUTHENTICATE` continuation.
pub fn parse_challenge(text: &str) -> Result<Vec<u8>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    BASE64
        .decode(text)
        .map_err(|_| ParseError::Authentication(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ModifiedUtf7;
    use crate::types::CapabilityValue;

    #[test]
    fn parse_capability_test() {
        let caps = parse_capabilities("IMAP4rev1 AUTH=PLAIN AUTH=LOGIN UTF8=ACCEPT");
        assert_eq!(caps.len(), 3);
        assert_eq!(caps.0.get("IMAP4rev1"), Some(&CapabilityValue::Present));
        assert_eq!(caps.values("AUTH").unwrap(), ["PLAIN", "LOGIN"]);
        assert_eq!(caps.values("UTF8").unwrap(), ["ACCEPT"]);
        assert!(caps.has("IMAP4rev1"));
        assert!(caps.has("AUTH=LOGIN"));
        assert!(!caps.has("AUTH=XOAUTH2"));
        assert!(caps.has_auth("PLAIN"));
        assert!(!caps.has_auth("plain"));
        assert!(caps.accepts_utf8());

        assert!(parse_capabilities("").is_empty());
        assert!(!parse_capabilities("IMAP4rev1 UTF8=APPEND").accepts_utf8());
    }

    #[test]
    fn parse_names_test() {
        let name = parse_name(r#"(\HasNoChildren) "/" "INBOX.Sent""#, &ModifiedUtf7).unwrap();
        assert_eq!(
            name.attributes(),
            &[NameAttribute::Custom("\\HasNoChildren".to_string())]
        );
        assert_eq!(name.delimiter(), Some("/"));
        assert_eq!(name.name(), "INBOX.Sent");
        assert!(name.is_selectable());
    }

    #[test]
    fn parse_names_variants() {
        let name = parse_name(r#"(\Noselect \Marked) NIL Entw&APw-rfe"#, &ModifiedUtf7).unwrap();
        assert_eq!(
            name.attributes(),
            &[NameAttribute::NoSelect, NameAttribute::Marked]
        );
        assert_eq!(name.delimiter(), None);
        assert_eq!(name.name(), "Entwürfe");
        assert!(!name.is_selectable());

        let name = parse_name("() \".\" {10}with )( sp", &ModifiedUtf7).unwrap();
        assert_eq!(name.name(), "with )( sp");
    }

    #[test]
    fn parse_names_invalid() {
        for data in &["", "\\HasNoChildren \"/\" INBOX", "() \"/\"", "(\"a\" \"b\") \"/\" x y"] {
            match parse_name(data, &ModifiedUtf7) {
                Err(ParseError::Listing(_)) => {}
                r => panic!("{:?} parsed as {:?}", data, r),
            }
        }
    }

    #[test]
    fn parse_status_test() {
        let status = parse_status("(MESSAGES 12 UIDNEXT 45)").unwrap();
        assert_eq!(status.messages, Some(12));
        assert_eq!(status.uid_next, Some(45));
        assert_eq!(status.recent, None);

        let status = parse_status("\"a (b)\" (unseen 3)").unwrap();
        assert_eq!(status.unseen, Some(3));

        assert!(matches!(parse_status("INBOX ()"), Err(ParseError::Status(_))));
        assert!(matches!(
            parse_status("INBOX (HIGHESTMODSEQ 7)"),
            Err(ParseError::Status(_))
        ));
        assert!(matches!(parse_status("INBOX"), Err(ParseError::Status(_))));
    }

    #[test]
    fn parse_ids_test() {
        assert_eq!(parse_ids("1 2 3 40").unwrap(), vec![1, 2, 3, 40]);
        assert_eq!(parse_ids("40 3").unwrap(), vec![40, 3]);
        assert_eq!(parse_ids("").unwrap(), Vec::<u32>::new());
        assert!(matches!(
            parse_ids("99999999999"),
            Err(ParseError::Search(_))
        ));
    }

    #[test]
    fn parse_flags_test() {
        assert_eq!(
            parse_flags(r"(\Answered \Seen $Label1)").unwrap(),
            vec![
                Flag::Answered,
                Flag::Seen,
                Flag::Custom("$Label1".to_string())
            ]
        );
        assert_eq!(parse_flags("()").unwrap(), vec![]);
        assert!(matches!(parse_flags(r"\Seen"), Err(ParseError::Flags(_))));
    }

    #[test]
    fn parse_challenge_test() {
        assert_eq!(parse_challenge("VXNlcm5hbWU6").unwrap(), b"Username:");
        assert_eq!(parse_challenge("").unwrap(), b"");
        assert!(matches!(
            parse_challenge("not base64!"),
            Err(ParseError::Authentication(_))
        ));
    }
}
