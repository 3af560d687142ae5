//! Command legality per [RFC 3501 section 3](https://tools.ietf.org/html/rfc3501#section-3).
//!
//! Every command verb requires the session to have reached some minimum state. The check here is
//! advisory: the server remains the authority and may still answer `NO` or `BAD`.

use std::fmt;

use crate::error::IllegalCommandError;

/// The state a session is in. States only ever progress upwards, until the connection is torn
/// down.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SessionState {
    /// Connected, but no credentials have been accepted yet.
    NotAuthenticated = 1,
    /// Credentials were accepted (or the server greeted with `PREAUTH`).
    Authenticated = 2,
    /// A mailbox has been selected with `SELECT` or `EXAMINE`.
    Selected = 4,
}

/// The minimum state a command verb requires. The numeric values are the wire-compatible state
/// bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RequiredState {
    /// Legal in every state.
    Any = 0,
    /// Legal once connected.
    NotAuthenticated = 1,
    /// Requires successful authentication.
    Authenticated = 2,
    /// Requires a selected mailbox.
    Selected = 4,
}

impl RequiredState {
    /// The state bit for this requirement.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Whether a session in `state` satisfies this requirement.
    pub fn allows(self, state: SessionState) -> bool {
        state as u8 >= self.bits()
    }
}

impl fmt::Display for RequiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            RequiredState::Any => "ANY",
            RequiredState::NotAuthenticated => "NOT_AUTHENTICATED",
            RequiredState::Authenticated => "AUTHENTICATED",
            RequiredState::Selected => "SELECTED",
        })
    }
}

/// Look up the state a command verb requires. Verbs that are not listed are permitted in any
/// state so that extensions not enumerated here are never blocked.
pub fn required_state(verb: &str) -> RequiredState {
    match verb.to_ascii_uppercase().as_str() {
        "CAPABILITY" | "NOOP" | "LOGOUT" => RequiredState::Any,
        "STARTTLS" | "AUTHENTICATE" | "LOGIN" => RequiredState::NotAuthenticated,
        "SELECT" | "EXAMINE" | "CREATE" | "DELETE" | "RENAME" | "SUBSCRIBE" | "UNSUBSCRIBE"
        | "LIST" | "LSUB" | "STATUS" | "APPEND" => RequiredState::Authenticated,
        "CHECK" | "CLOSE" | "EXPUNGE" | "SEARCH" | "FETCH" | "STORE" | "COPY" | "UID" => {
            RequiredState::Selected
        }
        _ => RequiredState::Any,
    }
}

/// Check whether `verb` may be issued by a session in `state`.
pub fn authorize(verb: &str, state: SessionState) -> Result<(), IllegalCommandError> {
    let required = required_state(verb);
    if required.allows(state) {
        Ok(())
    } else {
        Err(IllegalCommandError {
            verb: verb.to_ascii_uppercase(),
            required,
        })
    }
}
