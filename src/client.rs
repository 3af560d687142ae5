use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::authenticator::Authenticator;
use super::codec::{ModifiedUtf7, TextCodec};
use super::config::{AuthMechanism, Config};
use super::error::{Error, IllegalCommandError, ParseError, Result, ValidateError};
use super::parse::parse_challenge;
use super::response::{parse_response, Response, ResponseCode, Status};
use super::state::{self, SessionState};
use super::tokens;
use super::transport::Transport;
use super::types::*;

macro_rules! quote {
    ($x:expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

fn validate_str(value: &str) -> Result<String> {
    let quoted = quote!(value);
    if quoted.contains('\n') {
        return Err(Error::Validate(ValidateError('\n')));
    }
    if quoted.contains('\r') {
        return Err(Error::Validate(ValidateError('\r')));
    }
    Ok(quoted)
}

/// The command currently waiting for its tagged completion.
#[derive(Debug)]
struct Pending {
    tag: String,
    verb: String,
    folder: Option<String>,
}

// TODO: check against a real server whether the second LOGIN step should carry the password;
// for now every challenge is answered with the username.
struct LoginAuthenticator<'a> {
    username: &'a str,
}

impl<'a> Authenticator for LoginAuthenticator<'a> {
    type Response = &'a str;

    fn process(&self, _challenge: &[u8]) -> &'a str {
        self.username
    }
}

/// An IMAP session over some [`Transport`].
///
/// A session runs one command at a time: [`Session::execute`] sends a command and reads server
/// lines until the command's tagged completion arrives. Everything the server sent along the way
/// is collected in [`Session::responses`]. A `NO` or `BAD` completion is not an error; it makes
/// `execute` return `Ok(false)` and is described by [`Session::last_status`] and
/// [`Session::error_text`].
///
/// Dropping a session tears it down with a best-effort `CLOSE` (if a mailbox is selected) and
/// `LOGOUT`; call [`Session::disconnect`] to do that at a point of your choosing.
pub struct Session<T: Transport> {
    transport: T,
    config: Config,
    codec: Box<dyn TextCodec>,
    capabilities: Capabilities,
    state: SessionState,
    selected: Option<String>,
    responses: Responses,
    status: Status,
    error_text: String,
    continuation: Option<String>,
    pending: Option<Pending>,
    closed: bool,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .field("selected", &self.selected)
            .field("status", &self.status)
            .field("error_text", &self.error_text)
            .field("continuation", &self.continuation)
            .field("pending", &self.pending)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<T: Transport> Session<T> {
    /// Start a session on a freshly opened transport by reading the server greeting.
    ///
    /// `* OK` leaves the session not authenticated, `* PREAUTH` authenticated, and `* BYE`
    /// fails with [`Error::Refused`].
    pub fn new(transport: T) -> Result<Session<T>> {
        Session::with_config(transport, Config::new())
    }

    /// Like [`Session::new`], with an authentication configuration.
    pub fn with_config(transport: T, config: Config) -> Result<Session<T>> {
        let mut session = Session {
            transport,
            config,
            codec: Box::new(ModifiedUtf7),
            capabilities: Capabilities::default(),
            state: SessionState::NotAuthenticated,
            selected: None,
            responses: Responses::default(),
            status: Status::Ok,
            error_text: String::new(),
            continuation: None,
            pending: None,
            // nothing to tear down until the greeting has been accepted
            closed: true,
        };
        session.read_greeting()?;
        session.closed = false;
        Ok(session)
    }

    fn read_greeting(&mut self) -> Result<()> {
        let line = self.transport.read_line()?;
        match parse_response(&line, &*self.codec)? {
            Response::Condition { status, code, text } => {
                if let Some(code) = code {
                    self.apply_code(code);
                }
                self.status = status;
                self.error_text = text;
                match status {
                    Status::Ok => Ok(()),
                    Status::PreAuth => {
                        self.set_state(SessionState::Authenticated);
                        Ok(())
                    }
                    Status::Bye => Err(Error::Refused(self.error_text.clone())),
                    _ => Err(Error::Parse(ParseError::Invalid(line))),
                }
            }
            _ => Err(Error::Parse(ParseError::Invalid(line))),
        }
    }

    /// Replace the codec used for mailbox names on servers without UTF-8 support.
    pub fn set_codec<C: TextCodec + 'static>(&mut self, codec: C) {
        self.codec = Box::new(codec);
    }

    /// Check whether `verb` may be issued in the session's current state.
    pub fn authorize(&self, verb: &str) -> ::std::result::Result<(), IllegalCommandError> {
        state::authorize(verb, self.state)
    }

    /// Runs a command and reads responses until its tagged completion.
    ///
    /// Returns `Ok(true)` on `OK` and `Ok(false)` on `NO` or `BAD`. If the server asks for more
    /// data with a `+` continuation, this returns `Ok(true)` early with
    /// [`Session::continuation_pending`] set; answer with [`Session::continue_with`].
    ///
    /// Commands must not include the tag or the trailing CRLF. Mailbox names are sent as given:
    /// use the dedicated methods to get quoting and the UTF-8 policy applied.
    pub fn execute(&mut self, command: &str) -> Result<bool> {
        self.run(command, None)
    }

    /// Send one line of continuation data and resume the command that asked for it.
    pub fn continue_with(&mut self, data: &str) -> Result<bool> {
        if self.pending.is_none() || self.continuation.is_none() {
            return Err(Error::NoContinuation);
        }
        if let Some(c) = data.chars().find(|&c| c == '\r' || c == '\n') {
            return Err(Error::Validate(ValidateError(c)));
        }
        self.continuation = None;
        if let Err(e) = self.transport.send_line(data) {
            self.pending = None;
            return Err(e);
        }
        self.read_until_done()
    }

    fn run(&mut self, command: &str, folder: Option<&str>) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed);
        }
        if self.pending.is_some() {
            return Err(Error::InProgress);
        }
        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        self.authorize(&verb)?;

        let folder = match folder {
            Some(folder) => Some(folder.to_string()),
            None if verb == "SELECT" || verb == "EXAMINE" => self.folder_argument(command),
            None => None,
        };
        self.responses = Responses::default();
        self.continuation = None;
        let tag = self.transport.send_command(command)?;
        self.pending = Some(Pending { tag, verb, folder });
        self.read_until_done()
    }

    /// The mailbox named by a raw `SELECT`/`EXAMINE` command line.
    fn folder_argument(&self, command: &str) -> Option<String> {
        let (_, arg) = command.split_once(' ')?;
        let (token, _) = tokens::decode_one(arg).ok()?;
        let raw = token.to_text()?;
        if self.capabilities.accepts_utf8() {
            Some(raw)
        } else {
            Some(self.codec.to_universal(raw.as_bytes()))
        }
    }

    fn read_until_done(&mut self) -> Result<bool> {
        // a line we could not parse fails the command, but only once it has completed
        let mut failure: Option<Error> = None;
        loop {
            let line = match self.transport.read_line() {
                Ok(line) => line,
                Err(e) => {
                    self.pending = None;
                    return Err(e);
                }
            };
            self.continuation = None;

            let response = match parse_response(&line, &*self.codec) {
                Ok(response) => response,
                Err(e) => {
                    if let Some((status, text)) = self.fallback_completion(&line) {
                        log::warn!("unable to parse {:?}: {}", line, e);
                        return self.finish(status, text, Some(failure.unwrap_or(e.into())));
                    }
                    if !line.starts_with("* ") && !line.starts_with('+') {
                        // raw payload that happens to look like a completion
                        self.apply(Response::Text(line));
                        continue;
                    }
                    log::warn!("unable to parse {:?}: {}", line, e);
                    failure.get_or_insert(e.into());
                    continue;
                }
            };

            match response {
                Response::Continuation(text) => {
                    self.continuation = Some(text);
                    return match failure {
                        Some(e) => Err(e),
                        None => Ok(true),
                    };
                }
                Response::Tagged { ref tag, .. } if !self.is_pending(tag) => {
                    // only the outstanding tag completes the command
                    self.apply(Response::Text(line));
                }
                Response::Tagged {
                    status, code, text, ..
                } => {
                    if let Some(code) = code {
                        self.apply_code(code);
                    }
                    return self.finish(status, text, failure);
                }
                other => self.apply(other),
            }
        }
    }

    fn is_pending(&self, tag: &str) -> bool {
        self.pending.as_ref().map_or(false, |p| p.tag == tag)
    }

    /// The status of a completion line for the outstanding command that failed to parse as a
    /// whole, e.g. because of a malformed response code.
    fn fallback_completion(&self, line: &str) -> Option<(Status, String)> {
        let pending = self.pending.as_ref()?;
        let rest = line.strip_prefix(pending.tag.as_str())?.strip_prefix(' ')?;
        let (word, text) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = word.parse::<Status>().ok()?;
        Some((status, text.to_string()))
    }

    fn finish(&mut self, status: Status, text: String, failure: Option<Error>) -> Result<bool> {
        self.status = status;
        self.error_text = text;
        let ok = status == Status::Ok;
        if let Some(pending) = self.pending.take() {
            self.complete(&pending, ok);
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(ok),
        }
    }

    fn apply(&mut self, response: Response) {
        if let Response::Condition { status, ref text, .. } = response {
            if status == Status::Bye {
                log::debug!("server is closing the connection: {}", text);
            }
            self.status = status;
            self.error_text = text.clone();
        }
        if let Some(caps) = self.responses.record(response) {
            self.replace_capabilities(caps);
        }
    }

    fn apply_code(&mut self, code: ResponseCode) {
        if let Some(caps) = self.responses.record_code(code) {
            self.replace_capabilities(caps);
        }
    }

    fn replace_capabilities(&mut self, caps: Capabilities) {
        log::debug!("server capabilities: {} names", caps.len());
        self.capabilities = caps;
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!("session state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn complete(&mut self, pending: &Pending, ok: bool) {
        match pending.verb.as_str() {
            "LOGIN" | "AUTHENTICATE" if ok => {
                if self.state == SessionState::NotAuthenticated {
                    self.set_state(SessionState::Authenticated);
                }
            }
            "SELECT" | "EXAMINE" => {
                if ok {
                    self.selected = pending.folder.clone();
                    self.set_state(SessionState::Selected);
                } else if self.state == SessionState::Selected {
                    self.selected = None;
                    self.set_state(SessionState::Authenticated);
                }
            }
            "CLOSE" if ok => {
                self.selected = None;
                self.set_state(SessionState::Authenticated);
            }
            "LOGOUT" if ok => {
                self.selected = None;
                self.set_state(SessionState::NotAuthenticated);
                self.closed = true;
            }
            _ => {}
        }
    }

    /// Convert a mailbox name to its quoted wire form, honouring the server's UTF-8 support.
    fn wire_mailbox(&self, name: &str) -> Result<String> {
        if self.capabilities.accepts_utf8() {
            validate_str(name)
        } else {
            validate_str(&self.codec.to_legacy(name)?)
        }
    }

    /// Log in to the IMAP server.
    ///
    /// Without a configured mechanism this sends the plaintext `LOGIN` command. Otherwise the
    /// mechanism must be one of `PLAIN`, `LOGIN` or `XOAUTH2` and must be advertised by the
    /// server (the capabilities are requested first if none are known yet), or the call fails
    /// with [`Error::UnsupportedMechanism`]. `XOAUTH2` uses the configured access token in place
    /// of `password`.
    pub fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        let mechanism = match self.config.auth_mechanism().cloned() {
            None => {
                return self.run(
                    &format!(
                        "LOGIN {} {}",
                        validate_str(username)?,
                        validate_str(password)?
                    ),
                    None,
                )
            }
            Some(mechanism) => mechanism,
        };

        let token = match mechanism {
            AuthMechanism::Plain | AuthMechanism::Login => None,
            AuthMechanism::XOAuth2 => Some(
                self.config
                    .token()
                    .ok_or(Error::MissingConfiguration("access_token"))?
                    .to_string(),
            ),
            _ => return Err(Error::UnsupportedMechanism(mechanism.to_string())),
        };

        if self.capabilities.is_empty() {
            self.capability()?;
        }
        if !self.capabilities.has_auth(mechanism.as_str()) {
            return Err(Error::UnsupportedMechanism(mechanism.to_string()));
        }

        match token {
            Some(token) => self.authenticate_initial(
                "XOAUTH2",
                format!("user={}\x01auth=Bearer {}\x01\x01", username, token).as_bytes(),
            ),
            None if mechanism == AuthMechanism::Plain => self.authenticate_initial(
                "PLAIN",
                format!("\0{}\0{}", username, password).as_bytes(),
            ),
            None => self.authenticate("LOGIN", &LoginAuthenticator { username }),
        }
    }

    /// Authenticate with the server using the given SASL mechanism, answering each challenge
    /// with `authenticator`.
    pub fn authenticate<A: Authenticator + ?Sized>(
        &mut self,
        mechanism: &str,
        authenticator: &A,
    ) -> Result<bool> {
        let mut ok = self.run(&format!("AUTHENTICATE {}", mechanism), None)?;
        while let Some(text) = self.continuation.clone() {
            let challenge = match parse_challenge(&text) {
                Ok(challenge) => challenge,
                Err(e) => {
                    // cancel the exchange
                    if let Err(cancel) = self.continue_with("*") {
                        log::warn!("unable to cancel authentication: {}", cancel);
                    }
                    return Err(e.into());
                }
            };
            let response = authenticator.process(&challenge);
            ok = self.continue_with(&BASE64.encode(response))?;
        }
        Ok(ok)
    }

    /// `AUTHENTICATE <mechanism> <initial response>` for single-step mechanisms.
    fn authenticate_initial(&mut self, mechanism: &str, initial: &[u8]) -> Result<bool> {
        let encoded = BASE64.encode(initial);
        let mut ok = self.run(&format!("AUTHENTICATE {} {}", mechanism, encoded), None)?;
        while let Some(text) = self.continuation.clone() {
            // an empty challenge asks for the initial response (no SASL-IR); anything else is
            // an error report that is acknowledged with an empty line
            let reply = if text.trim().is_empty() { encoded.as_str() } else { "" };
            ok = self.continue_with(reply)?;
        }
        Ok(ok)
    }

    /// Selects a mailbox.
    ///
    /// On success the session is in the selected state and [`Session::selected_folder`] is
    /// `mailbox`; [`Responses::mailbox`] summarises what the server reported about it.
    pub fn select(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("SELECT {}", wire), Some(mailbox))
    }

    /// Like [`Session::select`], but the mailbox is opened read-only.
    pub fn examine(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("EXAMINE {}", wire), Some(mailbox))
    }

    /// Create a mailbox.
    pub fn create(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("CREATE {}", wire), None)
    }

    /// Delete a mailbox.
    pub fn delete(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("DELETE {}", wire), None)
    }

    /// Rename a mailbox.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<bool> {
        let from = self.wire_mailbox(from)?;
        let to = self.wire_mailbox(to)?;
        self.run(&format!("RENAME {} {}", from, to), None)
    }

    /// Add a mailbox to the set of subscribed mailboxes.
    pub fn subscribe(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("SUBSCRIBE {}", wire), None)
    }

    /// Remove a mailbox from the set of subscribed mailboxes.
    pub fn unsubscribe(&mut self, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("UNSUBSCRIBE {}", wire), None)
    }

    /// List the names matching `pattern` relative to `reference`, into [`Responses::list`].
    pub fn list(&mut self, reference: &str, pattern: &str) -> Result<bool> {
        let reference = self.wire_mailbox(reference)?;
        let pattern = self.wire_mailbox(pattern)?;
        self.run(&format!("LIST {} {}", reference, pattern), None)
    }

    /// Like [`Session::list`] for subscribed names, into [`Responses::lsub`].
    pub fn lsub(&mut self, reference: &str, pattern: &str) -> Result<bool> {
        let reference = self.wire_mailbox(reference)?;
        let pattern = self.wire_mailbox(pattern)?;
        self.run(&format!("LSUB {} {}", reference, pattern), None)
    }

    /// Request counters for a mailbox, into [`Responses::status`]. An empty set requests all
    /// of them.
    pub fn status(&mut self, mailbox: &str, items: EnumSet<StatusItem>) -> Result<bool> {
        let items = if items.is_empty() {
            EnumSet::all()
        } else {
            items
        };
        let wire = self.wire_mailbox(mailbox)?;
        self.run(
            &format!("STATUS {} ({})", wire, status_items_arg(items)),
            None,
        )
    }

    /// `NOOP`: poll for updates.
    pub fn noop(&mut self) -> Result<bool> {
        self.run("NOOP", None)
    }

    /// Ask the server for its capabilities, replacing [`Session::capabilities`].
    pub fn capability(&mut self) -> Result<bool> {
        self.run("CAPABILITY", None)
    }

    /// Request a checkpoint of the selected mailbox.
    pub fn check(&mut self) -> Result<bool> {
        self.run("CHECK", None)
    }

    /// Permanently remove `\Deleted` messages and leave the selected state.
    pub fn close(&mut self) -> Result<bool> {
        self.run("CLOSE", None)
    }

    /// Permanently remove `\Deleted` messages; the removed sequence numbers end up in
    /// [`Responses::expunge`].
    pub fn expunge(&mut self) -> Result<bool> {
        self.run("EXPUNGE", None)
    }

    /// Search the selected mailbox, into [`Responses::search`].
    pub fn search(&mut self, criteria: &str) -> Result<bool> {
        self.run(&format!("SEARCH {}", criteria), None)
    }

    /// Like [`Session::search`], returning UIDs.
    pub fn uid_search(&mut self, criteria: &str) -> Result<bool> {
        self.run(&format!("UID SEARCH {}", criteria), None)
    }

    /// Fetch data items for a set of messages, into [`Responses::fetch`].
    pub fn fetch(&mut self, sequence_set: &str, query: &str) -> Result<bool> {
        self.run(&format!("FETCH {} {}", sequence_set, query), None)
    }

    /// Like [`Session::fetch`], addressing messages by UID.
    pub fn uid_fetch(&mut self, uid_set: &str, query: &str) -> Result<bool> {
        self.run(&format!("UID FETCH {} {}", uid_set, query), None)
    }

    /// Alter message flags, e.g. `store("2:4", "+FLAGS (\\Deleted)")`.
    pub fn store(&mut self, sequence_set: &str, query: &str) -> Result<bool> {
        self.run(&format!("STORE {} {}", sequence_set, query), None)
    }

    /// Like [`Session::store`], addressing messages by UID.
    pub fn uid_store(&mut self, uid_set: &str, query: &str) -> Result<bool> {
        self.run(&format!("UID STORE {} {}", uid_set, query), None)
    }

    /// Copy messages to the end of another mailbox.
    pub fn copy(&mut self, sequence_set: &str, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("COPY {} {}", sequence_set, wire), None)
    }

    /// Like [`Session::copy`], addressing messages by UID.
    pub fn uid_copy(&mut self, uid_set: &str, mailbox: &str) -> Result<bool> {
        let wire = self.wire_mailbox(mailbox)?;
        self.run(&format!("UID COPY {} {}", uid_set, wire), None)
    }

    /// End the session. No further commands can be issued afterwards.
    pub fn logout(&mut self) -> Result<bool> {
        self.run("LOGOUT", None)
    }

    /// Tear the session down: `CLOSE` if a mailbox is selected, then `LOGOUT`. Failures are
    /// logged and otherwise ignored, and the session is closed afterwards either way.
    pub fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        if self.pending.is_some() {
            log::warn!("tearing down with a command still in progress");
            self.closed = true;
            return;
        }
        if self.state == SessionState::Selected {
            if let Err(e) = self.run("CLOSE", None) {
                log::warn!("CLOSE during teardown failed: {}", e);
            }
        }
        if !self.closed {
            if let Err(e) = self.run("LOGOUT", None) {
                log::warn!("LOGOUT during teardown failed: {}", e);
            }
        }
        self.closed = true;
    }

    /// The server's capabilities, as last reported.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The session's state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether credentials have been accepted.
    pub fn is_authenticated(&self) -> bool {
        self.state >= SessionState::Authenticated
    }

    /// Whether a mailbox is selected.
    pub fn is_selected(&self) -> bool {
        self.state == SessionState::Selected
    }

    /// The name of the selected mailbox, as it was passed to `SELECT`/`EXAMINE`.
    pub fn selected_folder(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// What the server sent during the last command.
    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    /// The status of the last condition response, `OK` by default.
    pub fn last_status(&self) -> Status {
        self.status
    }

    /// The text of the last condition response.
    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    /// Whether the server is waiting for continuation data.
    pub fn continuation_pending(&self) -> bool {
        self.continuation.is_some()
    }

    /// The text of the pending continuation request.
    pub fn continuation_text(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Whether the session has logged out or been torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably. Writing to it directly desynchronises the session.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
