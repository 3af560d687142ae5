//! The byte-stream side of a session.
//!
//! A [`Transport`] hands the session complete response lines. Any `{n}` literal announced at the
//! end of a line has already been read (exactly `n` octets) and spliced in directly after its
//! announcement, so that the session never has to go back to the wire mid-parse.

use std::io::{BufRead, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bufstream::BufStream;
use lazy_static::lazy_static;
use regex::Regex;

#[cfg(feature = "native-tls")]
use native_tls::{TlsConnector, TlsStream};

use crate::error::{Error, Result};

static TAG_PREFIX: &str = "a";
const INITIAL_TAG: u32 = 0;
const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

lazy_static! {
    static ref LITERAL_RE: Regex = Regex::new(r"\{(\d+)\}$").unwrap();
}

/// The transport collaborator of a [`Session`](crate::Session).
///
/// Tag generation belongs to the transport: `send_command` returns the tag the command went out
/// under, and the session waits for the completion line carrying that tag.
pub trait Transport {
    /// Send one command line, prefixed with a fresh tag. Returns the tag.
    fn send_command(&mut self, command: &str) -> Result<String>;

    /// Send one untagged line, such as the client's side of a continuation exchange.
    fn send_line(&mut self, data: &str) -> Result<()>;

    /// Read one fully assembled response line, without its trailing CRLF.
    ///
    /// End of stream is reported as [`Error::ConnectionLost`], distinct from I/O failures.
    fn read_line(&mut self) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_command(&mut self, command: &str) -> Result<String> {
        (**self).send_command(command)
    }

    fn send_line(&mut self, data: &str) -> Result<()> {
        (**self).send_line(data)
    }

    fn read_line(&mut self) -> Result<String> {
        (**self).read_line()
    }
}

/// A [`Transport`] over any buffered `Read + Write` stream.
#[derive(Debug)]
pub struct StreamTransport<T: Read + Write> {
    stream: BufStream<T>,
    tag: u32,

    /// Echo the raw conversation to stderr.
    pub debug: bool,
}

impl StreamTransport<TcpStream> {
    /// Open a plaintext connection to the given address.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<StreamTransport<TcpStream>> {
        Ok(StreamTransport::new(TcpStream::connect(addr)?))
    }
}

#[cfg(feature = "native-tls")]
impl StreamTransport<TlsStream<TcpStream>> {
    /// Open a TLS connection to `domain` on `port`, verifying the certificate against `domain`.
    pub fn connect_tls(domain: &str, port: u16) -> Result<StreamTransport<TlsStream<TcpStream>>> {
        let tcp = TcpStream::connect((domain, port))?;
        let ssl_conn = TlsConnector::builder().build()?;
        let tls = TlsConnector::connect(&ssl_conn, domain, tcp)?;
        Ok(StreamTransport::new(tls))
    }
}

impl<T: Read + Write> StreamTransport<T> {
    /// Wrap the given stream.
    pub fn new(stream: T) -> StreamTransport<T> {
        StreamTransport {
            stream: BufStream::new(stream),
            tag: INITIAL_TAG,
            debug: false,
        }
    }

    /// A reference to the underlying stream.
    pub fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }

    /// Flush and return the underlying stream.
    pub fn into_inner(self) -> Result<T> {
        Ok(self.stream.into_inner()?)
    }

    fn next_tag(&mut self) -> String {
        self.tag += 1;
        format!("{}{}", TAG_PREFIX, self.tag)
    }

    fn write_line(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf)?;
        self.stream.write_all(&[CR, LF])?;
        self.stream.flush()?;
        Ok(())
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = self.stream.read_until(LF, into)?;
        if read == 0 {
            return Err(Error::ConnectionLost);
        }
        if self.debug {
            eprint!("S: {}", String::from_utf8_lossy(into));
        }
        Ok(read)
    }

    fn read_literal(&mut self, len: u64) -> Result<String> {
        let mut payload = Vec::new();
        (&mut self.stream).take(len).read_to_end(&mut payload)?;
        if (payload.len() as u64) < len {
            return Err(Error::ConnectionLost);
        }
        if self.debug {
            eprintln!("S: <{} octet literal>", len);
        }
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }
}

impl<T: Read + Write> Transport for StreamTransport<T> {
    fn send_command(&mut self, command: &str) -> Result<String> {
        let tag = self.next_tag();
        let line = format!("{} {}", tag, command);
        self.write_line(line.as_bytes())?;
        log::trace!("C: {} {}", tag, redact(command));
        if self.debug {
            eprintln!("C: {} {}", tag, redact(command));
        }
        Ok(tag)
    }

    fn send_line(&mut self, data: &str) -> Result<()> {
        self.write_line(data.as_bytes())?;
        log::trace!("C: <{} octets of continuation data>", data.len());
        if self.debug {
            eprintln!("C: <{} octets of continuation data>", data.len());
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        loop {
            let mut raw = Vec::new();
            self.readline(&mut raw)?;
            if raw.last() == Some(&LF) {
                raw.pop();
            }
            if raw.last() == Some(&CR) {
                raw.pop();
            }
            // 8-bit text from legacy servers is replaced, like literal payloads
            let segment = String::from_utf8_lossy(&raw);

            let literal = LITERAL_RE.captures(&segment).and_then(|cap| {
                let start = cap.get(0)?.start();
                let len = cap[1].parse::<u64>().ok()?;
                Some((start, len))
            });
            match literal {
                Some((start, len)) => {
                    // re-announce with the octet count of what we actually splice in, since
                    // invalid UTF-8 in the payload is replaced
                    let payload = self.read_literal(len)?;
                    line.push_str(&segment[..start]);
                    line.push_str(&format!("{{{}}}", payload.len()));
                    line.push_str(&payload);
                }
                None => {
                    line.push_str(&segment);
                    log::trace!("S: {}", line);
                    return Ok(line);
                }
            }
        }
    }
}

/// Hide credentials when a command line is logged.
fn redact(command: &str) -> String {
    let mut words = command.splitn(3, ' ');
    let verb = words.next().unwrap_or("");
    match verb.to_ascii_uppercase().as_str() {
        "LOGIN" => format!("{} <redacted>", verb),
        "AUTHENTICATE" => match words.next() {
            Some(mechanism) if words.next().is_some() => {
                format!("{} {} <redacted>", verb, mechanism)
            }
            _ => command.to_string(),
        },
        _ => command.to_string(),
    }
}
