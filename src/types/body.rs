use crate::error::ParseError;
use crate::tokens::Token;

use super::envelope::{nstring, Envelope};

/// The MIME structure of a message, as returned by the `BODYSTRUCTURE` and `BODY` fetch items.
/// See [RFC 3501 section 7.4.2](https://tools.ietf.org/html/rfc3501#section-7.4.2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BodyStructure {
    /// A leaf part, such as `text/plain` or `image/png`.
    Single(SinglePart),
    /// A `multipart/*` node.
    Multi(MultiPart),
}

/// A leaf body part.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SinglePart {
    /// Media type, lower-cased (`text`).
    pub media_type: String,
    /// Media subtype, lower-cased (`plain`).
    pub subtype: String,
    /// Content-Type parameters as attribute/value pairs, in the order sent.
    pub params: Vec<(String, String)>,
    /// Content-ID, without surrounding angle brackets.
    pub id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding, lower-cased (`7bit`, `base64`, ...).
    pub encoding: String,
    /// Size of the body in octets, in its transfer encoding.
    pub size: u64,
    /// Size of the body in text lines, for `text/*` and `message/rfc822` parts.
    pub lines: Option<u64>,
    /// The encapsulated message of a `message/rfc822` part.
    pub message: Option<Box<EncapsulatedMessage>>,
    /// Extension data.
    pub extension: Extension,
}

/// The envelope and structure of a message carried by a `message/rfc822` part.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncapsulatedMessage {
    /// Envelope of the inner message.
    pub envelope: Envelope,
    /// Body structure of the inner message.
    pub body: BodyStructure,
}

/// A multipart node. It never carries content fields of its own.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultiPart {
    /// The child parts, in order.
    pub parts: Vec<BodyStructure>,
    /// Multipart subtype, lower-cased (`mixed`, `alternative`, ...).
    pub subtype: String,
    /// Content-Type parameters as attribute/value pairs.
    pub params: Vec<(String, String)>,
    /// Extension data. `md5` is always `None` for multipart nodes.
    pub extension: Extension,
}

/// Optional extension fields that follow the basic fields of a body part.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extension {
    /// Content-MD5 (single parts only).
    pub md5: Option<String>,
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Content-Language tags.
    pub language: Vec<String>,
    /// Content-Location.
    pub location: Option<String>,
    /// Anything the server sent after the known extension fields.
    pub extra: Vec<Token>,
}

/// A Content-Disposition, such as `attachment; filename="a.pdf"`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Disposition {
    /// Disposition type, lower-cased (`inline`, `attachment`).
    pub kind: String,
    /// Disposition parameters as attribute/value pairs.
    pub params: Vec<(String, String)>,
}

impl BodyStructure {
    /// Build a body structure from the decoded items of a `BODYSTRUCTURE` list.
    ///
    /// The shape of the first item decides between the two variants: a list starts a multipart
    /// node, anything else is the media type of a single part.
    pub fn from_tokens(items: &[Token]) -> Result<BodyStructure, ParseError> {
        match items.first() {
            Some(Token::List(_)) => multi_part(items).map(BodyStructure::Multi),
            Some(_) => single_part(items).map(BodyStructure::Single),
            None => Err(ParseError::BodyStructure("empty body structure".to_string())),
        }
    }

    /// Lower-cased `type/subtype`.
    pub fn mime_type(&self) -> String {
        match *self {
            BodyStructure::Single(ref part) => format!("{}/{}", part.media_type, part.subtype),
            BodyStructure::Multi(ref part) => format!("multipart/{}", part.subtype),
        }
    }

    /// The child parts of a multipart node; empty for single parts.
    pub fn parts(&self) -> &[BodyStructure] {
        match *self {
            BodyStructure::Single(_) => &[],
            BodyStructure::Multi(ref part) => &part.parts,
        }
    }

    /// Extension data of this node.
    pub fn extension(&self) -> &Extension {
        match *self {
            BodyStructure::Single(ref part) => &part.extension,
            BodyStructure::Multi(ref part) => &part.extension,
        }
    }
}

fn structure_error(what: &str, found: Option<&Token>) -> ParseError {
    match found {
        Some(token) => ParseError::BodyStructure(format!("bad {}: {}", what, token)),
        None => ParseError::BodyStructure(format!("missing {}", what)),
    }
}

fn lowercase(what: &str, token: Option<&Token>) -> Result<String, ParseError> {
    token
        .and_then(Token::as_str)
        .map(str::to_lowercase)
        .ok_or_else(|| structure_error(what, token))
}

fn pairs(what: &str, token: Option<&Token>) -> Result<Vec<(String, String)>, ParseError> {
    match token {
        None | Some(Token::Nil) => Ok(Vec::new()),
        Some(Token::List(items)) if items.len() % 2 == 0 => items
            .chunks(2)
            .map(|pair| match (pair[0].to_text(), pair[1].to_text()) {
                (Some(attr), Some(value)) => Ok((attr, value)),
                _ => Err(structure_error(what, token)),
            })
            .collect(),
        Some(_) => Err(structure_error(what, token)),
    }
}

fn single_part(items: &[Token]) -> Result<SinglePart, ParseError> {
    let mut fields = items.iter();
    let mut part = SinglePart {
        media_type: lowercase("media type", fields.next())?,
        subtype: lowercase("subtype", fields.next())?,
        params: pairs("parameters", fields.next())?,
        id: fields.next().and_then(nstring).map(|id| unwrap_angles(&id)),
        description: fields.next().and_then(nstring),
        encoding: lowercase("encoding", fields.next())?,
        ..SinglePart::default()
    };
    let size = fields.next();
    part.size = size
        .and_then(Token::as_number)
        .ok_or_else(|| structure_error("size", size))?;

    let mut rest = fields.as_slice();
    if part.media_type == "message" && part.subtype == "rfc822" {
        if let [Token::List(envelope), Token::List(body), tail @ ..] = rest {
            part.message = Some(Box::new(EncapsulatedMessage {
                envelope: Envelope::from_tokens(envelope)?,
                body: BodyStructure::from_tokens(body)?,
            }));
            rest = tail;
        }
    }
    if part.media_type == "text" || part.message.is_some() {
        if let [Token::Number(lines), tail @ ..] = rest {
            part.lines = Some(*lines);
            rest = tail;
        }
    }

    let mut rest = rest.iter();
    part.extension.md5 = rest.next().and_then(nstring);
    extension(&mut part.extension, rest)?;
    if part.extension.disposition.is_none() && part.id.is_some() {
        // senders often omit the disposition of inline images
        part.extension.disposition = Some(Disposition {
            kind: "inline".to_string(),
            params: Vec::new(),
        });
    }
    Ok(part)
}

fn multi_part(items: &[Token]) -> Result<MultiPart, ParseError> {
    let split = items
        .iter()
        .position(|item| item.as_list().is_none())
        .unwrap_or(items.len());
    let parts = items[..split]
        .iter()
        .filter_map(Token::as_list)
        .map(BodyStructure::from_tokens)
        .collect::<Result<Vec<_>, _>>()?;

    let mut fields = items[split..].iter();
    let mut node = MultiPart {
        parts,
        subtype: lowercase("multipart subtype", fields.next())?,
        params: pairs("parameters", fields.next())?,
        ..MultiPart::default()
    };
    extension(&mut node.extension, fields)?;
    Ok(node)
}

/// Disposition, language, location and whatever follows.
fn extension<'a>(
    ext: &mut Extension,
    mut fields: impl Iterator<Item = &'a Token>,
) -> Result<(), ParseError> {
    ext.disposition = match fields.next() {
        None | Some(Token::Nil) => None,
        Some(Token::List(items)) => Some(Disposition {
            kind: lowercase("disposition", items.first())?,
            params: pairs("disposition parameters", items.get(1))?,
        }),
        Some(other) => return Err(structure_error("disposition", Some(other))),
    };
    ext.language = match fields.next() {
        None | Some(Token::Nil) => Vec::new(),
        Some(Token::List(tags)) => tags.iter().filter_map(Token::to_text).collect(),
        Some(tag) => tag.to_text().into_iter().collect(),
    };
    ext.location = fields.next().and_then(nstring);
    ext.extra = fields.cloned().collect();
    Ok(())
}

fn unwrap_angles(id: &str) -> String {
    id.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::decode_one;

    fn structure(input: &str) -> Result<BodyStructure, ParseError> {
        let (token, _) = decode_one(input).unwrap();
        BodyStructure::from_tokens(token.as_list().unwrap())
    }

    #[test]
    fn single_text_part() {
        let body =
            structure("(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"UTF-8\") NIL NIL \"7BIT\" 1152 23)")
                .unwrap();
        let part = match body {
            BodyStructure::Single(part) => part,
            other => panic!("expected a single part, got {:?}", other),
        };
        assert_eq!(part.media_type, "text");
        assert_eq!(part.subtype, "plain");
        assert_eq!(
            part.params,
            vec![("CHARSET".to_string(), "UTF-8".to_string())]
        );
        assert_eq!(part.encoding, "7bit");
        assert_eq!(part.size, 1152);
        assert_eq!(part.lines, Some(23));
        assert_eq!(part.id, None);
        assert_eq!(part.extension, Extension::default());
    }

    #[test]
    fn multipart_with_extensions() {
        let body = structure(
            "((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 1152 23)\
             (\"IMAGE\" \"PNG\" (\"NAME\" \"a.png\") \"<img1@host>\" NIL \"BASE64\" 4554 NIL NIL NIL NIL)\
             (\"APPLICATION\" \"PDF\" NIL NIL NIL \"BASE64\" 1000 NIL \
             (\"ATTACHMENT\" (\"FILENAME\" \"x.pdf\")) \"en\" NIL)\
             \"MIXED\" (\"BOUNDARY\" \"xyz\") NIL (\"en\" \"de\") NIL \"future\")",
        )
        .unwrap();

        assert_eq!(body.mime_type(), "multipart/mixed");
        let node = match &body {
            BodyStructure::Multi(node) => node,
            other => panic!("expected multipart, got {:?}", other),
        };
        assert_eq!(node.parts.len(), 3);
        assert_eq!(node.params, vec![("BOUNDARY".to_string(), "xyz".to_string())]);
        assert_eq!(node.extension.md5, None);
        assert_eq!(node.extension.language, vec!["en", "de"]);
        assert_eq!(node.extension.extra, vec![Token::String("future".to_string())]);

        // content-id without a disposition defaults to inline
        match &node.parts[1] {
            BodyStructure::Single(image) => {
                assert_eq!(image.id.as_deref(), Some("img1@host"));
                assert_eq!(image.lines, None);
                let disposition = image.extension.disposition.as_ref().unwrap();
                assert_eq!(disposition.kind, "inline");
                assert!(disposition.params.is_empty());
            }
            other => panic!("expected a single part, got {:?}", other),
        }

        let pdf = node.parts[2].extension();
        let disposition = pdf.disposition.as_ref().unwrap();
        assert_eq!(disposition.kind, "attachment");
        assert_eq!(
            disposition.params,
            vec![("FILENAME".to_string(), "x.pdf".to_string())]
        );
        assert_eq!(pdf.language, vec!["en"]);
        assert_eq!(node.parts[2].mime_type(), "application/pdf");
    }

    #[test]
    fn encapsulated_message() {
        let body = structure(
            "(\"MESSAGE\" \"RFC822\" NIL NIL NIL \"7BIT\" 342 \
             (NIL \"inner\" NIL NIL NIL NIL NIL NIL NIL NIL) \
             (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 20 1) 12)",
        )
        .unwrap();
        let part = match body {
            BodyStructure::Single(part) => part,
            other => panic!("expected a single part, got {:?}", other),
        };
        assert_eq!(part.lines, Some(12));
        let message = part.message.unwrap();
        assert_eq!(message.envelope.subject.as_deref(), Some("inner"));
        assert_eq!(message.body.mime_type(), "text/plain");
    }

    #[test]
    fn malformed_structures() {
        assert!(matches!(
            structure("(\"TEXT\" \"PLAIN\" (\"CHARSET\") NIL NIL \"7BIT\" 10 1)"),
            Err(ParseError::BodyStructure(_))
        ));
        assert!(matches!(
            structure("(\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" NIL 1)"),
            Err(ParseError::BodyStructure(_))
        ));
        assert!(matches!(
            structure("((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 1 1))"),
            Err(ParseError::BodyStructure(_))
        ));
        assert!(matches!(structure("()"), Err(ParseError::BodyStructure(_))));
    }
}
