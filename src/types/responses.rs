use std::collections::HashMap;

use super::{Capabilities, Fetch, Flag, Mailbox, MailboxStatus, Name, Seq};
use crate::response::{Response, ResponseCode};

/// Everything the server sent in response to one command, keyed by response type.
///
/// A session clears this at the start of every command cycle, so after
/// [`Session::execute`](crate::Session::execute) returns it holds exactly what the server said
/// while that command was outstanding, including unsolicited updates.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Responses {
    /// The last `* n EXISTS`.
    pub exists: Option<u32>,
    /// The last `* n RECENT`.
    pub recent: Option<u32>,
    /// Every `* n EXPUNGE`, in order.
    pub expunge: Vec<Seq>,
    /// `* n FETCH` responses, in the order their sequence numbers first appeared.
    pub fetch: Vec<Fetch>,
    /// `* LIST` entries, in order.
    pub list: Vec<Name>,
    /// `* LSUB` entries, in order.
    pub lsub: Vec<Name>,
    /// The last `* STATUS`.
    pub status: Option<MailboxStatus>,
    /// The last `* SEARCH`.
    pub search: Option<Vec<u32>>,
    /// The last `* FLAGS`.
    pub flags: Option<Vec<Flag>>,
    /// The last `[PERMANENTFLAGS (...)]` response code.
    pub permanent_flags: Option<Vec<Flag>>,
    /// The last `[BADCHARSET (...)]` response code.
    pub bad_charset: Option<Vec<String>>,
    /// `[READ-ONLY]` sets `true`, `[READ-WRITE]` sets `false`.
    pub read_only: Option<bool>,
    /// The last `[UIDNEXT n]` response code.
    pub uid_next: Option<u32>,
    /// The last `[UIDVALIDITY n]` response code.
    pub uid_validity: Option<u32>,
    /// The last `[UNSEEN n]` response code.
    pub unseen: Option<u32>,
    /// Other response codes (`ALERT`, `TRYCREATE`, ...) with their raw argument text.
    pub codes: HashMap<String, String>,
}

impl Responses {
    /// Store the data carried by one untagged response. Capability data is handed back, since
    /// it belongs to the session rather than to one command.
    pub(crate) fn record(&mut self, response: Response) -> Option<Capabilities> {
        match response {
            Response::Expunge(n) => self.expunge.push(n),
            Response::Exists(n) => self.exists = Some(n),
            Response::Recent(n) => self.recent = Some(n),
            Response::Fetch { message, data } => self.fetch_entry(message, &data),
            Response::Condition {
                code: Some(code), ..
            } => return self.record_code(code),
            Response::Capabilities(caps) => return Some(caps),
            Response::List(name) => self.list.push(name),
            Response::Lsub(name) => self.lsub.push(name),
            Response::Status(status) => self.status = Some(status),
            Response::Search(ids) => self.search = Some(ids),
            Response::Flags(flags) => self.flags = Some(flags),
            Response::Text(line) => {
                if !self.continue_fetch(&line) {
                    log::warn!("ignoring unexpected line {:?}", line);
                }
            }
            Response::Ignored(line) => log::warn!("ignoring unhandled response {:?}", line),
            Response::Condition { .. }
            | Response::Continuation(_)
            | Response::Tagged { .. } => {}
        }
        None
    }

    pub(crate) fn record_code(&mut self, code: ResponseCode) -> Option<Capabilities> {
        match code {
            ResponseCode::Capability(caps) => return Some(caps),
            ResponseCode::BadCharset(charsets) => self.bad_charset = Some(charsets),
            ResponseCode::PermanentFlags(flags) => self.permanent_flags = Some(flags),
            ResponseCode::ReadOnly => self.read_only = Some(true),
            ResponseCode::ReadWrite => self.read_only = Some(false),
            ResponseCode::UidNext(n) => self.uid_next = Some(n),
            ResponseCode::UidValidity(n) => self.uid_validity = Some(n),
            ResponseCode::Unseen(n) => self.unseen = Some(n),
            ResponseCode::Other { key, value } => {
                self.codes.insert(key, value);
            }
        }
        None
    }

    pub(crate) fn fetch_entry(&mut self, message: Seq, data: &str) {
        match self.fetch.iter_mut().find(|f| f.message == message) {
            Some(fetch) => fetch.append(data),
            None => self.fetch.push(Fetch::new(message, data)),
        }
    }

    /// Append a continuation line to the most recently added fetch. Returns `false` if there is
    /// none.
    pub(crate) fn continue_fetch(&mut self, line: &str) -> bool {
        match self.fetch.last_mut() {
            Some(fetch) => {
                fetch.append(line);
                true
            }
            None => false,
        }
    }

    /// The `FETCH` response for sequence number `message`.
    pub fn fetch_for(&self, message: Seq) -> Option<&Fetch> {
        self.fetch.iter().find(|f| f.message == message)
    }

    /// Summarise a `SELECT` or `EXAMINE`.
    pub fn mailbox(&self) -> Mailbox {
        Mailbox {
            flags: self.flags.clone().unwrap_or_default(),
            exists: self.exists.unwrap_or(0),
            recent: self.recent.unwrap_or(0),
            unseen: self.unseen,
            permanent_flags: self.permanent_flags.clone().unwrap_or_default(),
            uid_next: self.uid_next,
            uid_validity: self.uid_validity,
            read_only: self.read_only.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_entries_accumulate_per_message() {
        let mut responses = Responses::default();
        responses.fetch_entry(3, "(UID 30");
        responses.fetch_entry(1, "(UID 10)");
        responses.fetch_entry(3, "FLAGS ())");
        assert_eq!(responses.fetch.len(), 2);
        assert_eq!(responses.fetch_for(3).unwrap().raw(), "(UID 30\r\nFLAGS ())");

        // continuation goes to the last inserted entry, not the highest number
        assert!(responses.continue_fetch("tail"));
        assert_eq!(responses.fetch_for(1).unwrap().raw(), "(UID 10)\r\ntail");

        let mut empty = Responses::default();
        assert!(!empty.continue_fetch("tail"));
    }

    #[test]
    fn record_untagged_data() {
        let mut responses = Responses::default();
        assert_eq!(responses.record(Response::Exists(4)), None);
        responses.record(Response::Expunge(2));
        responses.record(Response::Expunge(2));
        responses.record(Response::Search(vec![1, 3]));
        responses.record(Response::Condition {
            status: crate::response::Status::No,
            code: Some(ResponseCode::Other {
                key: "TRYCREATE".to_string(),
                value: String::new(),
            }),
            text: "no such mailbox".to_string(),
        });
        responses.record(Response::Text("stray".to_string()));
        assert_eq!(responses.exists, Some(4));
        assert_eq!(responses.expunge, vec![2, 2]);
        assert_eq!(responses.search, Some(vec![1, 3]));
        assert!(responses.codes.contains_key("TRYCREATE"));
        assert!(responses.fetch.is_empty());

        let caps = responses.record_code(ResponseCode::Capability(Capabilities::default()));
        assert_eq!(caps, Some(Capabilities::default()));
        responses.record_code(ResponseCode::ReadOnly);
        assert_eq!(responses.read_only, Some(true));
    }

    #[test]
    fn mailbox_summary() {
        let responses = Responses {
            exists: Some(172),
            recent: Some(1),
            flags: Some(vec![Flag::Seen, Flag::Deleted]),
            permanent_flags: Some(vec![Flag::Deleted, Flag::MayCreate]),
            uid_validity: Some(3857529045),
            uid_next: Some(4392),
            unseen: Some(12),
            read_only: Some(true),
            ..Responses::default()
        };
        let mailbox = responses.mailbox();
        assert_eq!(mailbox.exists, 172);
        assert_eq!(mailbox.recent, 1);
        assert_eq!(mailbox.flags, vec![Flag::Seen, Flag::Deleted]);
        assert_eq!(mailbox.permanent_flags, vec![Flag::Deleted, Flag::MayCreate]);
        assert_eq!(mailbox.uid_validity, Some(3857529045));
        assert_eq!(mailbox.uid_next, Some(4392));
        assert_eq!(mailbox.unseen, Some(12));
        assert!(mailbox.read_only);

        assert_eq!(Responses::default().mailbox(), Mailbox::default());
    }
}
