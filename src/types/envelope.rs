use chrono::{DateTime, FixedOffset};

use crate::error::ParseError;
use crate::mime;
use crate::tokens::Token;

/// An address structure describes an electronic mail address, as part of an [`Envelope`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Address {
    /// The personal name, with any encoded words decoded.
    pub name: Option<String>,
    /// At-domain-list (source route).
    pub adl: Option<String>,
    /// The mailbox name (local part).
    ///
    /// If the host name field is `None`, this is a group: a `None` mailbox ends the group, and
    /// any other value names the group.
    pub mailbox: Option<String>,
    /// The host name.
    pub host: Option<String>,
}

impl Address {
    /// `mailbox@host`, when both parts are present.
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(mailbox), Some(host)) => Some(format!("{}@{}", mailbox, host)),
            _ => None,
        }
    }
}

/// The [RFC-2822](https://tools.ietf.org/html/rfc2822) header of a message, as returned by the
/// `ENVELOPE` fetch item. See [RFC 3501 section 7.4.2](https://tools.ietf.org/html/rfc3501#section-7.4.2).
///
/// Address fields the server left out (`NIL`) are empty lists.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Envelope {
    /// The `Date` header, as sent.
    pub date: Option<String>,
    /// The `Subject` header, with any encoded words decoded.
    pub subject: Option<String>,
    /// The `From` addresses.
    pub from: Vec<Address>,
    /// The `Sender` addresses.
    pub sender: Vec<Address>,
    /// The `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// The `To` addresses.
    pub to: Vec<Address>,
    /// The `Cc` addresses.
    pub cc: Vec<Address>,
    /// The `Bcc` addresses.
    pub bcc: Vec<Address>,
    /// The `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// The `Message-Id` header.
    pub message_id: Option<String>,
}

impl Envelope {
    /// Build an envelope from the decoded items of an `ENVELOPE` list.
    pub fn from_tokens(fields: &[Token]) -> Result<Envelope, ParseError> {
        if fields.len() < 10 {
            return Err(ParseError::Envelope(format!(
                "expected 10 fields, found {}",
                fields.len()
            )));
        }
        Ok(Envelope {
            date: nstring(&fields[0]),
            subject: nstring(&fields[1]).map(|s| mime::decode_header(&s)),
            from: addresses(&fields[2])?,
            sender: addresses(&fields[3])?,
            reply_to: addresses(&fields[4])?,
            to: addresses(&fields[5])?,
            cc: addresses(&fields[6])?,
            bcc: addresses(&fields[7])?,
            in_reply_to: nstring(&fields[8]),
            message_id: nstring(&fields[9]),
        })
    }

    /// The `Date` header interpreted as an RFC 2822 date. `None` if it is missing or malformed.
    pub fn date_parsed(&self) -> Option<DateTime<FixedOffset>> {
        let mut date = self.date.as_deref()?.trim();
        // trailing zone comment, e.g. "-0700 (PDT)"
        if date.ends_with(')') {
            if let Some(open) = date.rfind('(') {
                date = date[..open].trim_end();
            }
        }
        DateTime::parse_from_rfc2822(date).ok()
    }
}

pub(crate) fn nstring(token: &Token) -> Option<String> {
    token.to_text()
}

fn addresses(token: &Token) -> Result<Vec<Address>, ParseError> {
    match *token {
        Token::Nil => Ok(Vec::new()),
        Token::List(ref items) => items.iter().map(address).collect(),
        ref other => Err(ParseError::Address(format!(
            "expected an address list, found {}",
            other
        ))),
    }
}

fn address(token: &Token) -> Result<Address, ParseError> {
    match token.as_list() {
        Some(parts) if parts.len() >= 4 => Ok(Address {
            name: nstring(&parts[0]).map(|s| mime::decode_header(&s)),
            adl: nstring(&parts[1]),
            mailbox: nstring(&parts[2]),
            host: nstring(&parts[3]),
        }),
        _ => Err(ParseError::Address(format!(
            "expected a 4-field address, found {}",
            token
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::decode_one;

    fn envelope(input: &str) -> Result<Envelope, ParseError> {
        let (token, _) = decode_one(input).unwrap();
        Envelope::from_tokens(token.as_list().unwrap())
    }

    #[test]
    fn full_envelope() {
        let env = envelope(
            "(\"Wed, 17 Jul 1996 02:23:25 -0700 (PDT)\" \
             \"=?UTF-8?Q?IMAP4rev1_WG_mtg_summary_and_minutes?=\" \
             ((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) \
             ((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) \
             NIL \
             ((NIL NIL \"imap\" \"cac.washington.edu\")) \
             ((NIL NIL \"minutes\" \"CNRI.Reston.VA.US\") \
             (\"John Klensin\" NIL \"KLENSIN\" \"MIT.EDU\")) NIL NIL \
             \"<B27397-0100000@cac.washington.edu>\")",
        )
        .unwrap();

        assert_eq!(env.subject.as_deref(), Some("IMAP4rev1 WG mtg summary and minutes"));
        assert_eq!(env.from.len(), 1);
        assert_eq!(env.from[0].name.as_deref(), Some("Terry Gray"));
        assert_eq!(env.from[0].email().as_deref(), Some("gray@cac.washington.edu"));
        assert!(env.reply_to.is_empty());
        assert_eq!(env.cc.len(), 2);
        assert_eq!(env.cc[1].mailbox.as_deref(), Some("KLENSIN"));
        assert!(env.bcc.is_empty());
        assert_eq!(env.in_reply_to, None);
        assert_eq!(
            env.message_id.as_deref(),
            Some("<B27397-0100000@cac.washington.edu>")
        );

        let date = env.date_parsed().unwrap();
        assert_eq!(date.to_rfc3339(), "1996-07-17T02:23:25-07:00");
    }

    #[test]
    fn scalar_address_list_is_an_error() {
        let err = envelope("(NIL NIL \"bogus\" NIL NIL NIL NIL NIL NIL NIL)").unwrap_err();
        assert!(matches!(err, ParseError::Address(_)));
    }

    #[test]
    fn short_address_is_an_error() {
        let err = envelope("(NIL NIL ((\"a\" NIL)) NIL NIL NIL NIL NIL NIL NIL)").unwrap_err();
        assert!(matches!(err, ParseError::Address(_)));
    }

    #[test]
    fn missing_fields() {
        let err = envelope("(NIL NIL)").unwrap_err();
        assert!(matches!(err, ParseError::Envelope(_)));
    }

    #[test]
    fn bad_date() {
        let env = envelope("(\"yesterday\" NIL NIL NIL NIL NIL NIL NIL NIL NIL)").unwrap();
        assert_eq!(env.date.as_deref(), Some("yesterday"));
        assert!(env.date_parsed().is_none());
    }
}
