//! Classification of complete server response lines.
//!
//! [`parse_response`] looks at the first two words of a line and decides what kind of response it
//! is. Data-carrying untagged responses are handed to the builders in [`parse`](crate::parse), so
//! the session only deals with typed values.

use std::fmt;
use std::str::FromStr;

use crate::codec::TextCodec;
use crate::error::ParseError;
use crate::parse::{
    paren_list, parse_capabilities, parse_flags, parse_ids, parse_name, parse_status,
};
use crate::types::{Capabilities, Flag, MailboxStatus, Name, Seq};

/// The status vocabulary of condition responses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Status {
    /// `OK`
    #[default]
    Ok,
    /// `NO`
    No,
    /// `BAD`
    Bad,
    /// `PREAUTH`, only in a greeting.
    PreAuth,
    /// `BYE`, the server is closing the connection.
    Bye,
}

impl Status {
    /// The status word on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::No => "NO",
            Status::Bad => "BAD",
            Status::PreAuth => "PREAUTH",
            Status::Bye => "BYE",
        }
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Status, ()> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bracketed response code, such as `[UIDVALIDITY 3857529045]`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ResponseCode {
    /// `CAPABILITY`, which replaces the session's capability set.
    Capability(Capabilities),
    /// `BADCHARSET`, with the charsets the server does support.
    BadCharset(Vec<String>),
    /// `PERMANENTFLAGS`.
    PermanentFlags(Vec<Flag>),
    /// `READ-ONLY`.
    ReadOnly,
    /// `READ-WRITE`.
    ReadWrite,
    /// `UIDNEXT`.
    UidNext(u32),
    /// `UIDVALIDITY`.
    UidValidity(u32),
    /// `UNSEEN`.
    Unseen(u32),
    /// Anything else (`ALERT`, `PARSE`, `TRYCREATE`, extensions), with its raw argument.
    Other {
        /// The upper-cased code.
        key: String,
        /// Whatever followed the code inside the brackets.
        value: String,
    },
}

/// One classified server line.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Response {
    /// `+ text`: the server wants more data for the current command.
    Continuation(String),
    /// `* n EXPUNGE`
    Expunge(Seq),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n FETCH (...)`, with the raw item list.
    Fetch {
        /// The message sequence number.
        message: Seq,
        /// The raw item list.
        data: String,
    },
    /// `* OK|NO|BAD|PREAUTH|BYE [code] text`
    Condition {
        /// The status word.
        status: Status,
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capabilities(Capabilities),
    /// `* LIST ...`
    List(Name),
    /// `* LSUB ...`
    Lsub(Name),
    /// `* STATUS ...`
    Status(MailboxStatus),
    /// `* SEARCH ...`
    Search(Vec<u32>),
    /// `* FLAGS (...)`
    Flags(Vec<Flag>),
    /// An untagged response this crate does not handle, kept as sent.
    Ignored(String),
    /// The tagged completion of a command.
    Tagged {
        /// The command tag.
        tag: String,
        /// `OK`, `NO` or `BAD`.
        status: Status,
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Any other line: the continuation of a preceding `FETCH`.
    Text(String),
}

/// Classify one complete line (without CRLF, with literals already inlined).
///
/// Mailbox names in `LIST`/`LSUB` data are converted with `codec`.
pub fn parse_response(line: &str, codec: &dyn TextCodec) -> Result<Response, ParseError> {
    let mut words = line.splitn(3, ' ');
    let tag = words.next().unwrap_or("");
    let second = words.next().unwrap_or("");
    let rest = words.next().unwrap_or("");

    match tag {
        "+" => Ok(Response::Continuation(
            line.get(2..).unwrap_or("").to_string(),
        )),
        "*" => untagged(second, rest, line, codec),
        _ => match second.parse::<Status>() {
            Ok(status @ (Status::Ok | Status::No | Status::Bad)) => {
                let (code, text) = parse_code(rest)?;
                Ok(Response::Tagged {
                    tag: tag.to_string(),
                    status,
                    code,
                    text,
                })
            }
            _ => Ok(Response::Text(line.to_string())),
        },
    }
}

fn untagged(
    second: &str,
    rest: &str,
    line: &str,
    codec: &dyn TextCodec,
) -> Result<Response, ParseError> {
    if !second.is_empty() && second.bytes().all(|b| b.is_ascii_digit()) {
        let number = second
            .parse::<u32>()
            .map_err(|_| ParseError::Number(second.to_string()))?;
        let (keyword, data) = rest.split_once(' ').unwrap_or((rest, ""));
        return Ok(match keyword.to_ascii_uppercase().as_str() {
            "EXPUNGE" => Response::Expunge(number),
            "EXISTS" => Response::Exists(number),
            "RECENT" => Response::Recent(number),
            "FETCH" => Response::Fetch {
                message: number,
                data: data.to_string(),
            },
            _ => Response::Ignored(line.to_string()),
        });
    }

    if let Ok(status) = second.parse::<Status>() {
        let (code, text) = parse_code(rest)?;
        return Ok(Response::Condition { status, code, text });
    }

    Ok(match second.to_ascii_uppercase().as_str() {
        "CAPABILITY" => Response::Capabilities(parse_capabilities(rest)),
        "LIST" => Response::List(parse_name(rest, codec)?),
        "LSUB" => Response::Lsub(parse_name(rest, codec)?),
        "STATUS" => Response::Status(parse_status(rest)?),
        "SEARCH" => Response::Search(parse_ids(rest)?),
        "FLAGS" => Response::Flags(parse_flags(rest)?),
        _ => Response::Ignored(line.to_string()),
    })
}

/// Split `[CODE args] text` into its response code and text.
fn parse_code(rest: &str) -> Result<(Option<ResponseCode>, String), ParseError> {
    let inner = match rest.strip_prefix('[') {
        Some(inner) => inner,
        None => return Ok((None, rest.to_string())),
    };
    let close = inner
        .find(']')
        .ok_or_else(|| ParseError::ResponseCode(rest.to_string()))?;
    let (key, value) = inner[..close]
        .split_once(' ')
        .unwrap_or((&inner[..close], ""));
    let key = key.to_ascii_uppercase();
    let number = || {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::ResponseCode(rest.to_string()))
    };

    let code = match key.as_str() {
        "CAPABILITY" => ResponseCode::Capability(parse_capabilities(value)),
        "BADCHARSET" => ResponseCode::BadCharset(
            paren_list(value)
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
        ),
        "PERMANENTFLAGS" => ResponseCode::PermanentFlags(parse_flags(value)?),
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "UIDNEXT" => ResponseCode::UidNext(number()?),
        "UIDVALIDITY" => ResponseCode::UidValidity(number()?),
        "UNSEEN" => ResponseCode::Unseen(number()?),
        _ => ResponseCode::Other {
            key,
            value: value.to_string(),
        },
    };
    Ok((Some(code), inner[close + 1..].trim_start().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ModifiedUtf7;

    fn parse(line: &str) -> Response {
        parse_response(line, &ModifiedUtf7).unwrap()
    }

    #[test]
    fn continuation() {
        assert_eq!(parse("+ Ready"), Response::Continuation("Ready".to_string()));
        assert_eq!(parse("+"), Response::Continuation(String::new()));
        assert_eq!(
            parse("+ VXNlcm5hbWU6"),
            Response::Continuation("VXNlcm5hbWU6".to_string())
        );
    }

    #[test]
    fn numeric_untagged() {
        assert_eq!(parse("* 22 EXPUNGE"), Response::Expunge(22));
        assert_eq!(parse("* 23 EXISTS"), Response::Exists(23));
        assert_eq!(parse("* 5 recent"), Response::Recent(5));
        assert_eq!(
            parse("* 12 FETCH (FLAGS (\\Seen) UID 4827943)"),
            Response::Fetch {
                message: 12,
                data: "(FLAGS (\\Seen) UID 4827943)".to_string()
            }
        );
        assert_eq!(parse("* 3 XFOO"), Response::Ignored("* 3 XFOO".to_string()));
        assert!(matches!(
            parse_response("* 99999999999 EXISTS", &ModifiedUtf7),
            Err(ParseError::Number(_))
        ));
    }

    #[test]
    fn conditions_with_codes() {
        assert_eq!(
            parse("* OK [UIDVALIDITY 3857529045] UIDs valid"),
            Response::Condition {
                status: Status::Ok,
                code: Some(ResponseCode::UidValidity(3857529045)),
                text: "UIDs valid".to_string(),
            }
        );
        assert_eq!(
            parse("* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited"),
            Response::Condition {
                status: Status::Ok,
                code: Some(ResponseCode::PermanentFlags(vec![
                    Flag::Deleted,
                    Flag::Seen,
                    Flag::MayCreate
                ])),
                text: "Limited".to_string(),
            }
        );
        assert_eq!(
            parse("* NO [ALERT] Disk almost full"),
            Response::Condition {
                status: Status::No,
                code: Some(ResponseCode::Other {
                    key: "ALERT".to_string(),
                    value: String::new()
                }),
                text: "Disk almost full".to_string(),
            }
        );
        assert_eq!(
            parse("* BYE Autologout; idle for too long"),
            Response::Condition {
                status: Status::Bye,
                code: None,
                text: "Autologout; idle for too long".to_string(),
            }
        );
        match parse("* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready") {
            Response::Condition {
                code: Some(ResponseCode::Capability(caps)),
                ..
            } => assert!(caps.has_auth("PLAIN")),
            r => panic!("unexpected {:?}", r),
        }
        assert!(matches!(
            parse("* OK [BADCHARSET (UTF-8 US-ASCII)] x"),
            Response::Condition {
                code: Some(ResponseCode::BadCharset(ref c)),
                ..
            } if c == &["UTF-8", "US-ASCII"]
        ));
        assert!(matches!(
            parse("* OK [READ-ONLY] done"),
            Response::Condition {
                code: Some(ResponseCode::ReadOnly),
                ..
            }
        ));
    }

    #[test]
    fn bad_codes() {
        assert!(matches!(
            parse_response("* OK [UNSEEN x] hm", &ModifiedUtf7),
            Err(ParseError::ResponseCode(_))
        ));
        assert!(matches!(
            parse_response("* OK [UNSEEN 3 hm", &ModifiedUtf7),
            Err(ParseError::ResponseCode(_))
        ));
    }

    #[test]
    fn keyword_untagged() {
        match parse("* CAPABILITY IMAP4rev1 IDLE") {
            Response::Capabilities(caps) => assert!(caps.has("IDLE")),
            r => panic!("unexpected {:?}", r),
        }
        match parse("* LIST (\\HasNoChildren) \"/\" \"INBOX.Sent\"") {
            Response::List(name) => assert_eq!(name.name(), "INBOX.Sent"),
            r => panic!("unexpected {:?}", r),
        }
        match parse("* LSUB () \".\" INBOX") {
            Response::Lsub(name) => assert_eq!(name.name(), "INBOX"),
            r => panic!("unexpected {:?}", r),
        }
        match parse("* STATUS INBOX (MESSAGES 231 UIDNEXT 44292)") {
            Response::Status(status) => assert_eq!(status.messages, Some(231)),
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(parse("* SEARCH 2 84 882"), Response::Search(vec![2, 84, 882]));
        assert_eq!(parse("* SEARCH"), Response::Search(vec![]));
        assert_eq!(
            parse("* FLAGS (\\Answered \\Draft)"),
            Response::Flags(vec![Flag::Answered, Flag::Draft])
        );
        assert_eq!(
            parse("* QUOTA \"\" (STORAGE 10 512)"),
            Response::Ignored("* QUOTA \"\" (STORAGE 10 512)".to_string())
        );
        assert!(matches!(
            parse_response("* LIST garbage", &ModifiedUtf7),
            Err(ParseError::Listing(_))
        ));
    }

    #[test]
    fn tagged_and_text() {
        assert_eq!(
            parse("a3 OK [READ-WRITE] SELECT completed"),
            Response::Tagged {
                tag: "a3".to_string(),
                status: Status::Ok,
                code: Some(ResponseCode::ReadWrite),
                text: "SELECT completed".to_string(),
            }
        );
        assert_eq!(
            parse("a4 NO Mailbox already exists"),
            Response::Tagged {
                tag: "a4".to_string(),
                status: Status::No,
                code: None,
                text: "Mailbox already exists".to_string(),
            }
        );
        assert_eq!(
            parse("Content-Type: text/plain"),
            Response::Text("Content-Type: text/plain".to_string())
        );
        assert_eq!(parse(")"), Response::Text(")".to_string()));
    }

    #[test]
    fn status_words() {
        assert_eq!("preauth".parse::<Status>(), Ok(Status::PreAuth));
        assert!("MAYBE".parse::<Status>().is_err());
        assert_eq!(Status::default(), Status::Ok);
        assert_eq!(Status::Bye.to_string(), "BYE");
    }
}
