use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use super::{BodyStructure, Envelope, Flag, Seq, Uid};
use crate::error::ParseError;
use crate::tokens::{self, Token};

/// An IMAP [`FETCH` response](https://tools.ietf.org/html/rfc3501#section-7.4.2) that contains
/// data about a particular message. This response occurs as the result of a `FETCH` or `STORE`
/// command, as well as by unilateral server decision (e.g., flag updates).
///
/// The item list is kept as the raw text the server sent, including any lines that continued it;
/// call [`Fetch::parse`] to interpret it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fetch {
    /// The ordinal number of this message in its containing mailbox.
    pub message: Seq,
    pub(crate) raw: String,
}

impl Fetch {
    pub(crate) fn new(message: Seq, data: &str) -> Fetch {
        Fetch {
            message,
            raw: data.to_string(),
        }
    }

    pub(crate) fn append(&mut self, line: &str) {
        if !self.raw.is_empty() {
            self.raw.push_str("\r\n");
        }
        self.raw.push_str(line);
    }

    /// The accumulated item list as sent.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decode the item list.
    pub fn parse(&self) -> Result<FetchItems, ParseError> {
        let (token, _) = tokens::decode_one(&self.raw)?;
        let items = token
            .as_list()
            .ok_or_else(|| ParseError::Fetch(format!("expected an item list, found {}", token)))?;
        FetchItems::from_tokens(items)
    }
}

/// The decoded data items of one [`Fetch`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct FetchItems {
    /// `FLAGS`.
    pub flags: Vec<Flag>,
    /// `UID`.
    pub uid: Option<Uid>,
    /// `RFC822.SIZE`.
    pub size: Option<u32>,
    /// `INTERNALDATE`, as sent.
    pub internal_date: Option<String>,
    /// `ENVELOPE`.
    pub envelope: Option<Envelope>,
    /// `BODYSTRUCTURE`, or `BODY` without a section.
    pub body_structure: Option<BodyStructure>,
    /// `BODY[section]`, `BINARY[section]` and `RFC822*` payloads, keyed by the upper-cased item
    /// name without any `<origin>` suffix. `NIL` payloads are `None`.
    pub sections: HashMap<String, Option<String>>,
    /// Items this crate does not interpret, in the order sent.
    pub other: Vec<(String, Token)>,
}

impl FetchItems {
    fn from_tokens(items: &[Token]) -> Result<FetchItems, ParseError> {
        if items.len() % 2 != 0 {
            return Err(ParseError::Fetch(format!(
                "item list has {} elements, expected name/value pairs",
                items.len()
            )));
        }

        let mut fetch = FetchItems::default();
        for pair in items.chunks(2) {
            let name = pair[0]
                .as_str()
                .ok_or_else(|| ParseError::Fetch(format!("bad item name {}", pair[0])))?
                .to_ascii_uppercase();
            let value = &pair[1];
            match name.as_str() {
                "FLAGS" => {
                    let flags = value
                        .as_list()
                        .ok_or_else(|| ParseError::Fetch(format!("bad FLAGS {}", value)))?;
                    fetch.flags = flags
                        .iter()
                        .filter_map(Token::as_str)
                        .map(Flag::from)
                        .collect();
                }
                "UID" => fetch.uid = Some(number(&name, value)?),
                "RFC822.SIZE" => fetch.size = Some(number(&name, value)?),
                "INTERNALDATE" => fetch.internal_date = value.to_text(),
                "ENVELOPE" => {
                    let fields = value
                        .as_list()
                        .ok_or_else(|| ParseError::Envelope(format!("not a list: {}", value)))?;
                    fetch.envelope = Some(Envelope::from_tokens(fields)?);
                }
                "BODY" | "BODYSTRUCTURE" => {
                    let fields = value.as_list().ok_or_else(|| {
                        ParseError::BodyStructure(format!("not a list: {}", value))
                    })?;
                    fetch.body_structure = Some(BodyStructure::from_tokens(fields)?);
                }
                _ if is_section(&name) => {
                    fetch.sections.insert(strip_origin(&name), value.to_text());
                }
                _ => fetch.other.push((name, value.clone())),
            }
        }
        Ok(fetch)
    }

    /// The payload of a section item, e.g. `section("BODY[HEADER]")`. Case-insensitive.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .get(&name.to_ascii_uppercase())
            .and_then(|payload| payload.as_deref())
    }

    /// The entire message, from `BODY[]` or `RFC822`.
    pub fn body(&self) -> Option<&str> {
        self.section("BODY[]").or_else(|| self.section("RFC822"))
    }

    /// The message header, from `BODY[HEADER]` or `RFC822.HEADER`.
    pub fn header(&self) -> Option<&str> {
        self.section("BODY[HEADER]")
            .or_else(|| self.section("RFC822.HEADER"))
    }

    /// The message text without its header, from `BODY[TEXT]` or `RFC822.TEXT`.
    pub fn text(&self) -> Option<&str> {
        self.section("BODY[TEXT]")
            .or_else(|| self.section("RFC822.TEXT"))
    }

    /// `INTERNALDATE` as a timestamp, e.g. `17-Jul-1996 02:44:25 -0700`.
    pub fn internal_date_parsed(&self) -> Option<DateTime<FixedOffset>> {
        let date = self.internal_date.as_deref()?.trim();
        DateTime::parse_from_str(date, "%d-%b-%Y %H:%M:%S %z").ok()
    }
}

fn number(name: &str, value: &Token) -> Result<u32, ParseError> {
    value
        .as_number()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ParseError::Fetch(format!("bad {} {}", name, value)))
}

fn is_section(name: &str) -> bool {
    name.starts_with("BODY[") || name.starts_with("BINARY[") || name.starts_with("RFC822")
}

fn strip_origin(name: &str) -> String {
    match (name.rfind(']'), name.rfind('<')) {
        (Some(close), Some(open)) if open > close => name[..open].to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_uid_size() {
        let fetch = Fetch::new(24, "(FLAGS (\\Seen $Junk) UID 4827943 RFC822.SIZE 44827)");
        let items = fetch.parse().unwrap();
        assert_eq!(items.flags, vec![Flag::Seen, Flag::Custom("$Junk".to_string())]);
        assert_eq!(items.uid, Some(4827943));
        assert_eq!(items.size, Some(44827));
        assert!(items.sections.is_empty());
    }

    #[test]
    fn sections_and_literals() {
        let fetch = Fetch::new(
            1,
            "(UID 7 BODY[HEADER] {13}Subject: hi\r\n BODY[TEXT]<0> {5}a (b) RFC822.TEXT NIL)",
        );
        let items = fetch.parse().unwrap();
        assert_eq!(items.header(), Some("Subject: hi\r\n"));
        assert_eq!(items.section("body[text]"), Some("a (b)"));
        assert_eq!(items.text(), Some("a (b)"));
        assert_eq!(items.sections.get("RFC822.TEXT"), Some(&None));
        assert_eq!(items.body(), None);
    }

    #[test]
    fn envelope_and_structure() {
        let fetch = Fetch::new(
            3,
            "(INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" \
             ENVELOPE (NIL \"hello\" NIL NIL NIL NIL NIL NIL NIL \"<id@x>\") \
             BODYSTRUCTURE (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 3 1) \
             X-GM-LABELS (\\Inbox))",
        );
        let items = fetch.parse().unwrap();
        let envelope = items.envelope.as_ref().unwrap();
        assert_eq!(envelope.subject.as_deref(), Some("hello"));
        assert_eq!(envelope.message_id.as_deref(), Some("<id@x>"));
        assert_eq!(
            items.body_structure.as_ref().unwrap().mime_type(),
            "text/plain"
        );
        assert_eq!(
            items.internal_date_parsed().unwrap().to_rfc3339(),
            "1996-07-17T02:44:25-07:00"
        );
        assert_eq!(items.other.len(), 1);
        assert_eq!(items.other[0].0, "X-GM-LABELS");
    }

    #[test]
    fn continuation_lines_accumulate() {
        let mut fetch = Fetch::new(2, "(UID 9");
        fetch.append("FLAGS ())");
        assert_eq!(fetch.raw(), "(UID 9\r\nFLAGS ())");
        let items = fetch.parse().unwrap();
        assert_eq!(items.uid, Some(9));
        assert!(items.flags.is_empty());
    }

    #[test]
    fn malformed_items() {
        assert!(matches!(
            Fetch::new(1, "(UID)").parse(),
            Err(ParseError::Fetch(_))
        ));
        assert!(matches!(
            Fetch::new(1, "(UID abc)").parse(),
            Err(ParseError::Fetch(_))
        ));
        assert!(matches!(
            Fetch::new(1, "UID 4").parse(),
            Err(ParseError::Fetch(_))
        ));
        assert!(matches!(
            Fetch::new(1, "(UID 4").parse(),
            Err(ParseError::Token { .. })
        ));
    }
}
