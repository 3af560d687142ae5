//! Enable the test_helpers feature to expose helper methods to build
//! result structures from raw server output, for testing code that uses this crate
//! without a server.
//!
//! To use, add a dev-dependency on the crate with the feature "test_helpers"
//! e.g.
//!
//! ```toml
//! [dependencies]
//! imap-engine = { version = "0.1" }
//!
//! [dev-dependencies]
//! # mirror the same configuration your dependencies and add test_helpers
//! imap-engine = { version = "0.1", features = ["test_helpers"] }
//! ```
//!
//! Input is server output as it appears on the wire: CRLF-terminated lines, with `{n}` literals
//! followed by their payload on the next line. Malformed input panics.
#[cfg(doc)]
use crate::types::*;

use std::io::Cursor;

use crate::codec::ModifiedUtf7;
use crate::error::Error;
use crate::response::parse_response;
use crate::transport::{StreamTransport, Transport};
use crate::types::Responses;

/// Split raw server output into assembled response lines.
fn lines(input: Vec<u8>) -> Vec<String> {
    let mut transport = StreamTransport::new(Cursor::new(input));
    let mut lines = Vec::new();
    loop {
        match transport.read_line() {
            Ok(line) => lines.push(line),
            Err(Error::ConnectionLost) => return lines,
            Err(e) => panic!("unreadable test input: {}", e),
        }
    }
}

/// Methods to build a [`Responses`] object
pub mod responses {
    use super::*;

    /// Builds [`Responses`] the way a session collects them during one command.
    ///
    /// Example input.
    ///
    /// ```
    /// let input = "\
    /// * 172 EXISTS\r\n\
    /// * OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
    /// * FLAGS (\\Answered \\Seen)\r\n\
    /// ";
    /// let responses = imap_engine::testing::responses::parse(input);
    /// assert_eq!(responses.mailbox().exists, 172);
    /// ```
    pub fn parse(input: impl Into<Vec<u8>>) -> Responses {
        let mut responses = Responses::default();
        for line in lines(input.into()) {
            let response = parse_response(&line, &ModifiedUtf7).unwrap();
            responses.record(response);
        }
        responses
    }
}

/// Methods to build a [`Capabilities`] response object
pub mod capabilities {
    use super::*;
    use crate::response::Response;
    use crate::types::Capabilities;

    /// Builds an [`Capabilities`] based on the provided input
    ///
    /// Example input.
    ///
    /// ```
    /// let input = "* CAPABILITY IMAP4rev1 STARTTLS AUTH=GSSAPI LOGINDISABLED\r\n";
    /// let response = imap_engine::testing::capabilities::parse(input);
    /// assert!(response.has_auth("GSSAPI"));
    /// ```
    pub fn parse(input: impl Into<Vec<u8>>) -> Capabilities {
        let line = lines(input.into()).into_iter().next().unwrap();
        match parse_response(&line, &ModifiedUtf7).unwrap() {
            Response::Capabilities(caps) => caps,
            r => panic!("not a CAPABILITY response: {:?}", r),
        }
    }
}

/// Methods to build [`Fetch`] response objects
pub mod fetches {
    use crate::types::Fetch;

    /// Builds the [`Fetch`] entries based on the provided input
    ///
    /// Example input.
    ///
    /// ```
    /// let input = "\
    /// * 24 FETCH (FLAGS (\\Seen) UID 4827943)\r\n\
    /// * 25 FETCH (FLAGS (\\Seen))\r\n\
    /// ";
    /// let response = imap_engine::testing::fetches::parse(input);
    /// assert_eq!(response[0].parse().unwrap().uid, Some(4827943));
    /// ```
    pub fn parse(input: impl Into<Vec<u8>>) -> Vec<Fetch> {
        super::responses::parse(input).fetch
    }
}

/// Methods to build [`Name`] response objects
pub mod names {
    use crate::types::Name;

    /// Builds the `LIST` [`Name`]s based on the provided input
    ///
    /// Example input.
    ///
    /// ```
    /// let input = "\
    /// * LIST (\\HasNoChildren) \".\" \"INBOX\"\r\n\
    /// * LIST (\\Noselect) \".\" \"&ZeVnLIqe-\"\r\n\
    /// ";
    /// let names = imap_engine::testing::names::parse(input);
    /// assert_eq!(names[1].name(), "日本語");
    /// ```
    pub fn parse(input: impl Into<Vec<u8>>) -> Vec<Name> {
        super::responses::parse(input).list
    }
}

/// Methods to build a [`MailboxStatus`] response object
pub mod status {
    use crate::types::MailboxStatus;

    /// Builds a [`MailboxStatus`] based on the provided input
    ///
    /// Example input.
    ///
    /// ```
    /// let input = "* STATUS INBOX (MESSAGES 231 UIDNEXT 44292)\r\n";
    /// let status = imap_engine::testing::status::parse(input);
    /// assert_eq!(status.messages, Some(231));
    /// ```
    pub fn parse(input: impl Into<Vec<u8>>) -> MailboxStatus {
        super::responses::parse(input).status.unwrap()
    }
}

/// Methods to build a [`BodyStructure`] object
pub mod body_structure {
    use crate::tokens;
    use crate::types::BodyStructure;

    /// Builds a [`BodyStructure`] from the parenthesized value of a `BODYSTRUCTURE` item
    ///
    /// Example input.
    ///
    /// ```
    /// let input = r#"("TEXT" "PLAIN" ("CHARSET" "us-ascii") NIL NIL "7BIT" 3028 92)"#;
    /// let body = imap_engine::testing::body_structure::parse(input);
    /// assert_eq!(body.mime_type(), "text/plain");
    /// ```
    pub fn parse(input: &str) -> BodyStructure {
        let (token, _) = tokens::decode_one(input).unwrap();
        BodyStructure::from_tokens(token.as_list().unwrap()).unwrap()
    }
}

/// Methods to build an [`Envelope`] object
pub mod envelope {
    use crate::tokens;
    use crate::types::Envelope;

    /// Builds an [`Envelope`] from the parenthesized value of an `ENVELOPE` item
    ///
    /// Example input.
    ///
    /// ```
    /// let input = r#"("Wed, 17 Jul 1996 02:23:25 -0700" "Hello" NIL NIL NIL NIL NIL NIL NIL "<B27397-0100000@cac.washington.edu>")"#;
    /// let envelope = imap_engine::testing::envelope::parse(input);
    /// assert_eq!(envelope.subject.as_deref(), Some("Hello"));
    /// ```
    pub fn parse(input: &str) -> Envelope {
        let (token, _) = tokens::decode_one(input).unwrap();
        Envelope::from_tokens(token.as_list().unwrap()).unwrap()
    }
}
