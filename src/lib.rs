//! A client-side IMAP4rev1 protocol engine.
//!
//! The crate turns a bidirectional byte stream into typed session state and structured results:
//! it classifies server responses, decodes IMAP's parenthesized-list grammar (quoted strings and
//! `{n}` literals included), builds typed values for capabilities, listings, status counters,
//! search results, flags, envelopes and MIME body structures, and refuses commands that are not
//! legal in the session's current state.
//!
//! # Usage
//!
//! Here is a basic example of using the client.
//! See `demos/basic.rs` for a runnable version.
//!
//! ```no_run
//! use imap_engine::{Session, StreamTransport};
//!
//! fn main() -> imap_engine::Result<()> {
//!     let transport = StreamTransport::connect_tls("imap.example.com", 993)?;
//!     let mut session = Session::new(transport)?;
//!
//!     if !session.login("username", "password")? {
//!         println!("login refused: {}", session.error_text());
//!         return Ok(());
//!     }
//!
//!     session.select("INBOX")?;
//!     println!("{}", session.responses().mailbox());
//!
//!     session.fetch("1", "(FLAGS BODY[TEXT])")?;
//!     for fetch in &session.responses().fetch {
//!         let items = fetch.parse()?;
//!         println!("{:?} {:?}", items.flags, items.text());
//!     }
//!
//!     session.logout()?;
//!     Ok(())
//! }
//! ```
//!
//! Commands that the server answers with `NO` or `BAD` are not errors: the operation returns
//! `Ok(false)` and [`Session::last_status`] and [`Session::error_text`] describe the outcome.
//! Errors are reserved for broken connections, malformed server output and misuse.

mod parse;
mod types;

pub mod authenticator;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod mime;
pub mod response;
pub mod state;
pub mod tokens;
pub mod transport;

pub use crate::authenticator::Authenticator;
pub use crate::client::Session;
pub use crate::codec::{ModifiedUtf7, TextCodec};
pub use crate::config::{AuthMechanism, Config};
pub use crate::error::{Error, Result};
pub use crate::parse::{
    parse_capabilities, parse_challenge, parse_flags, parse_ids, parse_name, parse_status,
};
pub use crate::response::{parse_response, Response, ResponseCode, Status};
pub use crate::state::{authorize, required_state, RequiredState, SessionState};
pub use crate::tokens::Token;
pub use crate::transport::{StreamTransport, Transport};
pub use types::*;

#[cfg(test)]
mod mock_stream;

#[cfg(feature = "test_helpers")]
pub mod testing;
