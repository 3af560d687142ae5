use enumset::{EnumSet, EnumSetType};

/// A counter that can be requested with the `STATUS` command, as defined in
/// [RFC 3501 section 6.3.10](https://tools.ietf.org/html/rfc3501#section-6.3.10).
///
/// Sets of items are passed around as [`EnumSet<StatusItem>`]; their bit values are
/// `MESSAGES=1 RECENT=2 UIDNEXT=4 UIDVALIDITY=8 UNSEEN=16`, so that `EnumSet::all()` is 31.
#[derive(EnumSetType, Debug, Hash)]
pub enum StatusItem {
    /// The number of messages in the mailbox.
    Messages,
    /// The number of messages with the `\Recent` flag set.
    Recent,
    /// The next unique identifier value of the mailbox.
    UidNext,
    /// The unique identifier validity value of the mailbox.
    UidValidity,
    /// The number of messages which do not have the `\Seen` flag set.
    Unseen,
}

impl StatusItem {
    /// The item's name on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        }
    }

    /// The item's bit in a status query mask.
    pub fn bit(self) -> u8 {
        match self {
            StatusItem::Messages => 1,
            StatusItem::Recent => 2,
            StatusItem::UidNext => 4,
            StatusItem::UidValidity => 8,
            StatusItem::Unseen => 16,
        }
    }

    /// Look up an item by its wire name. Case-insensitive.
    pub fn from_name(name: &str) -> Option<StatusItem> {
        EnumSet::<StatusItem>::all()
            .iter()
            .find(|item| item.as_str().eq_ignore_ascii_case(name))
    }

    /// The set of items whose bits are set in `mask`. Unknown bits are ignored.
    pub fn from_mask(mask: u8) -> EnumSet<StatusItem> {
        EnumSet::<StatusItem>::all()
            .iter()
            .filter(|item| mask & item.bit() != 0)
            .collect()
    }

    /// The mask for a set of items.
    pub fn mask(items: EnumSet<StatusItem>) -> u8 {
        items.iter().fold(0, |mask, item| mask | item.bit())
    }
}

/// Render a set of items as the space separated list that goes inside `STATUS`'s parentheses.
pub(crate) fn status_items_arg(items: EnumSet<StatusItem>) -> String {
    items
        .iter()
        .map(StatusItem::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The counters returned for a mailbox by a `STATUS` command. Only counters the server reported
/// are set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub messages: Option<u32>,
    /// Number of messages with the `\Recent` flag set.
    pub recent: Option<u32>,
    /// The next unique identifier value of the mailbox.
    pub uid_next: Option<u32>,
    /// The unique identifier validity value of the mailbox.
    pub uid_validity: Option<u32>,
    /// Number of messages which do not have the `\Seen` flag set.
    pub unseen: Option<u32>,
}

impl MailboxStatus {
    /// The value reported for `item`, if any.
    pub fn get(&self, item: StatusItem) -> Option<u32> {
        match item {
            StatusItem::Messages => self.messages,
            StatusItem::Recent => self.recent,
            StatusItem::UidNext => self.uid_next,
            StatusItem::UidValidity => self.uid_validity,
            StatusItem::Unseen => self.unseen,
        }
    }

    pub(crate) fn set(&mut self, item: StatusItem, value: u32) {
        let slot = match item {
            StatusItem::Messages => &mut self.messages,
            StatusItem::Recent => &mut self.recent,
            StatusItem::UidNext => &mut self.uid_next,
            StatusItem::UidValidity => &mut self.uid_validity,
            StatusItem::Unseen => &mut self.unseen,
        };
        *slot = Some(value);
    }

    /// The items the server reported.
    pub fn items(&self) -> EnumSet<StatusItem> {
        EnumSet::<StatusItem>::all()
            .iter()
            .filter(|item| self.get(*item).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        assert_eq!(StatusItem::mask(EnumSet::all()), 31);
        assert_eq!(
            StatusItem::mask(StatusItem::Messages | StatusItem::UidNext),
            5
        );
        assert_eq!(
            StatusItem::from_mask(2 | 16),
            StatusItem::Recent | StatusItem::Unseen
        );
        assert_eq!(StatusItem::from_mask(0), EnumSet::empty());
    }

    #[test]
    fn items_arg_in_wire_order() {
        assert_eq!(
            status_items_arg(StatusItem::Unseen | StatusItem::Messages),
            "MESSAGES UNSEEN"
        );
        assert_eq!(
            status_items_arg(EnumSet::all()),
            "MESSAGES RECENT UIDNEXT UIDVALIDITY UNSEEN"
        );
    }

    #[test]
    fn names() {
        assert_eq!(StatusItem::from_name("uidnext"), Some(StatusItem::UidNext));
        assert_eq!(StatusItem::from_name("HIGHESTMODSEQ"), None);
    }

    #[test]
    fn reported_items() {
        let mut status = MailboxStatus::default();
        status.set(StatusItem::Messages, 12);
        status.set(StatusItem::UidNext, 45);
        assert_eq!(status.get(StatusItem::Messages), Some(12));
        assert_eq!(status.get(StatusItem::Recent), None);
        assert_eq!(status.items(), StatusItem::Messages | StatusItem::UidNext);
    }
}
