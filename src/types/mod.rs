//! This module contains types used throughout the IMAP protocol.

pub use enumset::EnumSet;

/// From section [2.3.1.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.1).
///
/// A 32-bit value assigned to each message, which when used with the unique identifier validity
/// value forms a 64-bit value that will not refer to any other message in the mailbox or any
/// subsequent mailbox with the same name forever.  Unique identifiers are assigned in a strictly
/// ascending fashion in the mailbox; as each message is added to the mailbox it is assigned a
/// higher UID than the message(s) which were added previously.  Unlike message sequence numbers,
/// unique identifiers are not necessarily contiguous.
///
/// The unique identifier validity value is sent in a `UIDVALIDITY` response code in an `OK`
/// untagged response at mailbox selection time. If unique identifiers from an earlier session fail
/// to persist in this session, the unique identifier validity value will be greater than the one
/// used in the earlier session.
pub type Uid = u32;

/// From section [2.3.1.2 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.2).
///
/// A relative position from 1 to the number of messages in the mailbox.
/// This position is ordered by ascending unique identifier.  As each new message is added, it is
/// assigned a message sequence number that is 1 higher than the number of messages in the mailbox
/// before that new message was added.
///
/// Message sequence numbers can be reassigned during the session.  For example, when a message is
/// permanently removed (expunged) from the mailbox, the message sequence number for all subsequent
/// messages is decremented.  The number of messages in the mailbox is also decremented.
pub type Seq = u32;

mod body;
pub use self::body::{
    BodyStructure, Disposition, EncapsulatedMessage, Extension, MultiPart, SinglePart,
};

mod capabilities;
pub use self::capabilities::{Capabilities, CapabilityValue};

mod envelope;
pub use self::envelope::{Address, Envelope};

mod fetch;
pub use self::fetch::{Fetch, FetchItems};

mod flag;
pub use self::flag::Flag;

mod mailbox;
pub use self::mailbox::Mailbox;

mod name;
pub use self::name::{Name, NameAttribute};

mod responses;
pub use self::responses::Responses;

mod status;
pub(crate) use self::status::status_items_arg;
pub use self::status::{MailboxStatus, StatusItem};
