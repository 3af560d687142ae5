//! Decoder for the data segment of IMAP responses.
//!
//! IMAP data is a sequence of atoms, numbers, `NIL`, quoted strings, `{n}` literals and
//! parenthesized lists of the same. This module turns such text into a tree of [`Token`]s. The
//! decoder threads the unconsumed remainder of the input through every recursive call, so nested
//! lists consume from the same stream as their parent.
//!
//! Literals are expected to be inlined: the `n` octets of a `{n}` literal follow the closing brace
//! immediately, as produced by [`StreamTransport`](crate::StreamTransport).

use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{map, map_res, recognize};
use nom::error::{ErrorKind, FromExternalError, ParseError as NomParseError};
use nom::multi::{many0, many1};
use nom::sequence::{preceded, tuple};
use nom::{IResult, Parser};

use crate::error::{ParseError, TokenErrorKind};

/// One decoded value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// An unquoted atom, e.g. `FLAGS`, `\Seen` or `BODY[HEADER.FIELDS (FROM)]`.
    Atom(String),
    /// A quoted string or literal, with quoting undone.
    String(String),
    /// An unquoted run of digits.
    Number(u64),
    /// `NIL`.
    Nil,
    /// A parenthesized list.
    List(Vec<Token>),
}

impl Token {
    /// The textual value of an atom or string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Token::Atom(ref s) | Token::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// Like [`Token::as_str`], but numbers are rendered as text too.
    pub fn to_text(&self) -> Option<String> {
        match *self {
            Token::Atom(ref s) | Token::String(ref s) => Some(s.clone()),
            Token::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The value of a number, or of an atom or string that holds only digits.
    pub fn as_number(&self) -> Option<u64> {
        match *self {
            Token::Number(n) => Some(n),
            Token::Atom(ref s) | Token::String(ref s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The items of a list.
    pub fn as_list(&self) -> Option<&[Token]> {
        match *self {
            Token::List(ref items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is `NIL`.
    pub fn is_nil(&self) -> bool {
        *self == Token::Nil
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Token::Atom(ref s) => f.write_str(s),
            Token::String(ref s) => write!(f, "{:?}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Nil => f.write_str("NIL"),
            Token::List(ref items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, PartialEq)]
struct DecodeError<'a> {
    input: &'a str,
    kind: TokenErrorKind,
}

impl<'a> NomParseError<&'a str> for DecodeError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        DecodeError {
            input,
            kind: TokenErrorKind::Unexpected,
        }
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DecodeError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, _e: E) -> Self {
        DecodeError {
            input,
            kind: TokenErrorKind::Unexpected,
        }
    }
}

type Res<'a, T> = IResult<&'a str, T, DecodeError<'a>>;

/// Once an opening delimiter has been seen, failing to find the rest is fatal for the whole
/// decode rather than a cue to try another alternative.
fn closing<'a, O, F>(
    kind: TokenErrorKind,
    at: &'a str,
    mut parser: F,
) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: Parser<&'a str, O, DecodeError<'a>>,
{
    move |input| {
        parser
            .parse(input)
            .map_err(|_| nom::Err::Failure(DecodeError { input: at, kind }))
    }
}

fn quoted(input: &str) -> Res<'_, String> {
    let (mut rest, _) = char::<_, DecodeError<'_>>('"')(input)?;
    let mut value = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), value)),
            Some('\\') => match chars.next() {
                Some(c) => value.push(c),
                None => break,
            },
            Some(c) => value.push(c),
            None => break,
        }
        rest = chars.as_str();
    }
    Err(nom::Err::Failure(DecodeError {
        input,
        kind: TokenErrorKind::UnterminatedQuote,
    }))
}

fn literal(input: &str) -> Res<'_, String> {
    let (rest, _) = char::<_, DecodeError<'_>>('{')(input)?;
    let (rest, len) = closing(
        TokenErrorKind::UnterminatedLiteral,
        input,
        tuple((map_res(digit1, str::parse::<usize>), char('}'))),
    )(rest)
    .map(|(rest, (len, _))| (rest, len))?;
    if rest.len() < len || !rest.is_char_boundary(len) {
        return Err(nom::Err::Failure(DecodeError {
            input,
            kind: TokenErrorKind::UnterminatedLiteral,
        }));
    }
    let (payload, rest) = rest.split_at(len);
    Ok((rest, payload.to_string()))
}

fn section(input: &str) -> Res<'_, &str> {
    let (rest, _) = char::<_, DecodeError<'_>>('[')(input)?;
    let (rest, _) = take_while::<_, _, DecodeError<'_>>(|c: char| c != ']')(rest)?;
    let (rest, _) = closing(TokenErrorKind::UnterminatedSection, input, char(']'))(rest)?;
    Ok((rest, &input[..input.len() - rest.len()]))
}

fn atom(input: &str) -> Res<'_, &str> {
    recognize(many1(alt((section, is_not(" \t\r\n()\"[")))))(input)
}

fn list(input: &str) -> Res<'_, Vec<Token>> {
    let (rest, _) = char::<_, DecodeError<'_>>('(')(input)?;
    let (rest, items) = many0(preceded(multispace0, token))(rest)?;
    let (rest, _) = closing(
        TokenErrorKind::UnterminatedList,
        input,
        preceded(multispace0, char(')')),
    )(rest)?;
    Ok((rest, items))
}

fn classify_atom(atom: &str) -> Token {
    if atom.eq_ignore_ascii_case("NIL") {
        return Token::Nil;
    }
    if atom.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = atom.parse() {
            return Token::Number(n);
        }
    }
    Token::Atom(atom.to_string())
}

fn token(input: &str) -> Res<'_, Token> {
    alt((
        map(list, Token::List),
        map(quoted, Token::String),
        map(literal, Token::String),
        map(atom, classify_atom),
    ))(input)
}

fn to_parse_error(origin: &str, err: nom::Err<DecodeError<'_>>) -> ParseError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => ParseError::Token {
            offset: origin.len() - e.input.len(),
            kind: e.kind,
        },
        nom::Err::Incomplete(_) => ParseError::Token {
            offset: origin.len(),
            kind: TokenErrorKind::Unexpected,
        },
    }
}

/// Decode a single value from the front of `input`, returning it together with the unconsumed
/// remainder. Leading whitespace is skipped.
pub fn decode_one(input: &str) -> Result<(Token, &str), ParseError> {
    token(input.trim_start())
        .map(|(rest, tok)| (tok, rest))
        .map_err(|e| to_parse_error(input, e))
}

/// Decode every value in `input`.
pub fn decode(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(tokens);
        }
        match token(rest) {
            Ok((r, tok)) => {
                tokens.push(tok);
                rest = r;
            }
            Err(e) => return Err(to_parse_error(input, e)),
        }
    }
}
