/// A name that matches a `LIST` or `LSUB` command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Name {
    pub(crate) attributes: Vec<NameAttribute>,
    pub(crate) delimiter: Option<String>,
    pub(crate) name: String,
}

/// An attribute set for an IMAP name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameAttribute {
    /// It is not possible for any child levels of hierarchy to exist
    /// under this name; no child levels exist now and none can be
    /// created in the future.
    NoInferiors,

    /// It is not possible to use this name as a selectable mailbox.
    NoSelect,

    /// The mailbox has been marked "interesting" by the server; the
    /// mailbox probably contains messages that have been added since
    /// the last time the mailbox was selected.
    Marked,

    /// The mailbox does not contain any additional messages since the
    /// last time the mailbox was selected.
    Unmarked,

    /// A non-standard user- or server-defined name attribute, such as `\HasNoChildren`.
    Custom(String),
}

impl NameAttribute {
    fn system(s: &str) -> Option<Self> {
        match s {
            "\\Noinferiors" => Some(NameAttribute::NoInferiors),
            "\\Noselect" => Some(NameAttribute::NoSelect),
            "\\Marked" => Some(NameAttribute::Marked),
            "\\Unmarked" => Some(NameAttribute::Unmarked),
            _ => None,
        }
    }
}

impl From<String> for NameAttribute {
    fn from(s: String) -> Self {
        NameAttribute::system(&s).unwrap_or(NameAttribute::Custom(s))
    }
}

impl<'a> From<&'a str> for NameAttribute {
    fn from(s: &'a str) -> Self {
        NameAttribute::system(s).unwrap_or_else(|| NameAttribute::Custom(s.to_string()))
    }
}

impl Name {
    /// Attributes of this name.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes[..]
    }

    /// The hierarchy delimiter is a character used to delimit levels of hierarchy in a mailbox
    /// name.  A client can use it to create child mailboxes, and to search higher or lower levels
    /// of naming hierarchy.  All children of a top-level hierarchy node use the same
    /// separator character.  `None` means that no hierarchy exists; the name is a "flat" name.
    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    /// The mailbox name, already converted out of the wire encoding. Unless
    /// [`NameAttribute::NoSelect`] is indicated, the name is valid as an argument for commands,
    /// such as `SELECT`, that accept mailbox names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the name can be selected.
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&NameAttribute::NoSelect)
    }
}
