//! IMAP error types.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result;

use bufstream::IntoInnerError as BufError;
#[cfg(feature = "native-tls")]
use native_tls::{Error as TlsError, HandshakeError as TlsHandshakeError};
#[cfg(feature = "native-tls")]
use std::net::TcpStream;

use crate::state::RequiredState;

/// A convenience wrapper around `Result` for `imap_engine::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur while driving an IMAP session.
///
/// Note that a `NO` or `BAD` completion from the server is *not* an error: those are routine
/// protocol outcomes and are reported through the `bool` returned by
/// [`Session::execute`](crate::Session::execute) together with
/// [`Session::last_status`](crate::Session::last_status) and
/// [`Session::error_text`](crate::Session::error_text).
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred while trying to read or write to a network stream.
    Io(IoError),
    /// An error from the `native_tls` library during the TLS handshake.
    #[cfg(feature = "native-tls")]
    TlsHandshake(TlsHandshakeError<TcpStream>),
    /// An error from the `native_tls` library while managing the socket.
    #[cfg(feature = "native-tls")]
    Tls(TlsError),
    /// The connection was terminated unexpectedly.
    ConnectionLost,
    /// The server refused the connection in its greeting (`* BYE`).
    Refused(String),
    /// Error parsing a server response.
    Parse(ParseError),
    /// Error validating input data.
    Validate(ValidateError),
    /// The command is not legal in the session's current state.
    IllegalCommand(IllegalCommandError),
    /// The requested authentication mechanism is not advertised by the server, or is not
    /// supported by this client.
    UnsupportedMechanism(String),
    /// A configuration value required by the requested operation is missing.
    MissingConfiguration(&'static str),
    /// A mailbox name could not be converted to its wire encoding.
    Encoding(String),
    /// A new command was issued while a continuation exchange was still pending.
    InProgress,
    /// Continuation data was offered, but the server is not waiting for any.
    NoContinuation,
    /// The session has logged out or been disconnected.
    Closed,
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl<T> From<BufError<T>> for Error {
    fn from(err: BufError<T>) -> Error {
        Error::Io(err.into())
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsHandshakeError<TcpStream>> for Error {
    fn from(err: TlsHandshakeError<TcpStream>) -> Error {
        Error::TlsHandshake(err)
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsError> for Error {
    fn from(err: TlsError) -> Error {
        Error::Tls(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<ValidateError> for Error {
    fn from(err: ValidateError) -> Error {
        Error::Validate(err)
    }
}

impl From<IllegalCommandError> for Error {
    fn from(err: IllegalCommandError) -> Error {
        Error::IllegalCommand(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => fmt::Display::fmt(e, f),
            Error::ConnectionLost => f.write_str("Connection Lost"),
            Error::Refused(ref text) => write!(f, "Connection refused by server: {}", text),
            Error::Parse(ref e) => fmt::Display::fmt(e, f),
            Error::Validate(ref e) => fmt::Display::fmt(e, f),
            Error::IllegalCommand(ref e) => fmt::Display::fmt(e, f),
            Error::UnsupportedMechanism(ref m) => {
                write!(f, "Unsupported authentication mechanism: {}", m)
            }
            Error::MissingConfiguration(key) => write!(f, "Missing configuration value: {}", key),
            Error::Encoding(ref name) => write!(f, "Unable to encode mailbox name: {:?}", name),
            Error::InProgress => f.write_str("A command continuation is still pending"),
            Error::NoContinuation => f.write_str("The server is not waiting for continuation data"),
            Error::Closed => f.write_str("The session is closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Why the token decoder gave up on its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenErrorKind {
    /// A `"` was opened but never closed.
    UnterminatedQuote,
    /// A `{n}` literal announced more octets than the input holds.
    UnterminatedLiteral,
    /// A `(` was opened but never closed.
    UnterminatedList,
    /// A `[` section was opened but never closed.
    UnterminatedSection,
    /// Anything else that is not a valid token (e.g. a stray `)`).
    Unexpected,
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            TokenErrorKind::UnterminatedQuote => "unterminated quoted string",
            TokenErrorKind::UnterminatedLiteral => "literal shorter than announced",
            TokenErrorKind::UnterminatedList => "unterminated parenthesized list",
            TokenErrorKind::UnterminatedSection => "unterminated bracketed section",
            TokenErrorKind::Unexpected => "unexpected input",
        })
    }
}

/// An error occured while trying to parse a server response.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// The response line could not be classified at all.
    Invalid(String),
    /// A `LIST` or `LSUB` response did not have the expected shape.
    Listing(String),
    /// A `STATUS` response held no recognized counters.
    Status(String),
    /// A `FLAGS` (or flag list response code) had no parenthesized list.
    Flags(String),
    /// A `SEARCH` response held something other than message numbers.
    Search(String),
    /// A numeric field did not hold a number.
    Number(String),
    /// A bracketed response code could not be interpreted.
    ResponseCode(String),
    /// The token decoder failed at the given byte offset.
    Token {
        /// Byte offset into the decoded input.
        offset: usize,
        /// What went wrong.
        kind: TokenErrorKind,
    },
    /// An `ENVELOPE` did not have the expected fields.
    Envelope(String),
    /// An address list held something other than address structures.
    Address(String),
    /// A `BODY`/`BODYSTRUCTURE` did not have the expected fields.
    BodyStructure(String),
    /// A `FETCH` item list could not be interpreted.
    Fetch(String),
    /// Authentication errors.
    Authentication(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::Invalid(ref line) => write!(f, "Unable to parse response: {:?}", line),
            ParseError::Listing(ref line) => write!(f, "Unable to parse listing: {:?}", line),
            ParseError::Status(ref line) => write!(f, "Unable to parse status: {:?}", line),
            ParseError::Flags(ref line) => write!(f, "Unable to parse flags: {:?}", line),
            ParseError::Search(ref line) => write!(f, "Unable to parse search: {:?}", line),
            ParseError::Number(ref v) => write!(f, "Expected a number, found {:?}", v),
            ParseError::ResponseCode(ref c) => write!(f, "Unable to parse response code: {:?}", c),
            ParseError::Token { offset, kind } => {
                write!(f, "Unable to decode tokens at offset {}: {}", offset, kind)
            }
            ParseError::Envelope(ref e) => write!(f, "Unable to parse envelope: {}", e),
            ParseError::Address(ref e) => write!(f, "Unable to parse address: {}", e),
            ParseError::BodyStructure(ref e) => write!(f, "Unable to parse body structure: {}", e),
            ParseError::Fetch(ref e) => write!(f, "Unable to parse fetch response: {}", e),
            ParseError::Authentication(ref line) => {
                write!(f, "Unable to parse authentication response: {:?}", line)
            }
        }
    }
}

impl StdError for ParseError {}

/// An [invalid character](https://tools.ietf.org/html/rfc3501#section-4.3) was found in an input
/// string.
#[derive(Debug, Eq, PartialEq)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(f, "Invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {}

/// A command was issued in a session state that does not permit it.
#[derive(Debug, Eq, PartialEq)]
pub struct IllegalCommandError {
    /// The offending command verb.
    pub verb: String,
    /// The minimum state the verb requires.
    pub required: RequiredState,
}

impl fmt::Display for IllegalCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command {} requires the {} state",
            self.verb, self.required
        )
    }
}

impl StdError for IllegalCommandError {}
