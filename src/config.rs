//! Authentication configuration for a [`Session`](crate::Session).

use std::fmt;
use std::str::FromStr;

/// A SASL mechanism name, as advertised in `AUTH=` capabilities.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN` ([RFC 4616](https://tools.ietf.org/html/rfc4616)).
    Plain,
    /// `LOGIN`.
    Login,
    /// `XOAUTH2`, Google's and Microsoft's OAuth 2.0 bearer token mechanism.
    XOAuth2,
    /// `XOAUTHBEARER`. Recognised but not supported.
    XOAuthBearer,
    /// `PLAIN-CLIENTTOKEN`. Recognised but not supported.
    PlainClientToken,
    /// `CRAM-MD5`. Recognised but not supported.
    CramMd5,
    /// Any other mechanism name, upper-cased.
    Other(String),
}

impl AuthMechanism {
    /// The mechanism name as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match *self {
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::Login => "LOGIN",
            AuthMechanism::XOAuth2 => "XOAUTH2",
            AuthMechanism::XOAuthBearer => "XOAUTHBEARER",
            AuthMechanism::PlainClientToken => "PLAIN-CLIENTTOKEN",
            AuthMechanism::CramMd5 => "CRAM-MD5",
            AuthMechanism::Other(ref name) => name,
        }
    }
}

impl FromStr for AuthMechanism {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<AuthMechanism, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        Ok(match name.as_str() {
            "PLAIN" => AuthMechanism::Plain,
            "LOGIN" => AuthMechanism::Login,
            "XOAUTH2" => AuthMechanism::XOAuth2,
            "XOAUTHBEARER" => AuthMechanism::XOAuthBearer,
            "PLAIN-CLIENTTOKEN" => AuthMechanism::PlainClientToken,
            "CRAM-MD5" => AuthMechanism::CramMd5,
            _ => AuthMechanism::Other(name),
        })
    }
}

impl<'a> From<&'a str> for AuthMechanism {
    fn from(s: &'a str) -> AuthMechanism {
        match s.parse() {
            Ok(mechanism) => mechanism,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session authenticates.
///
/// Without a mechanism, [`Session::login`](crate::Session::login) falls back to the plaintext
/// `LOGIN` command.
///
/// ```
/// use imap_engine::{AuthMechanism, Config};
///
/// let config = Config::new()
///     .mechanism(AuthMechanism::XOAuth2)
///     .access_token("ya29.token");
/// assert_eq!(config.auth_mechanism(), Some(&AuthMechanism::XOAuth2));
/// ```
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Config {
    auth_mechanism: Option<AuthMechanism>,
    access_token: Option<String>,
}

impl Config {
    /// An empty configuration: plaintext `LOGIN`.
    pub fn new() -> Config {
        Config::default()
    }

    /// Authenticate with the given SASL mechanism.
    pub fn mechanism<M: Into<AuthMechanism>>(mut self, mechanism: M) -> Config {
        self.auth_mechanism = Some(mechanism.into());
        self
    }

    /// The OAuth 2.0 access token used by `XOAUTH2`.
    pub fn access_token<S: Into<String>>(mut self, token: S) -> Config {
        self.access_token = Some(token.into());
        self
    }

    /// The configured mechanism, if any.
    pub fn auth_mechanism(&self) -> Option<&AuthMechanism> {
        self.auth_mechanism.as_ref()
    }

    /// The configured access token, if any.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

// keep secrets out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_mechanism", &self.auth_mechanism)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::from("plain"), AuthMechanism::Plain);
        assert_eq!(AuthMechanism::from("XOAuth2"), AuthMechanism::XOAuth2);
        assert_eq!(
            AuthMechanism::from("plain-clienttoken"),
            AuthMechanism::PlainClientToken
        );
        assert_eq!(
            AuthMechanism::from("gssapi"),
            AuthMechanism::Other("GSSAPI".to_string())
        );
        assert_eq!(AuthMechanism::CramMd5.to_string(), "CRAM-MD5");
    }

    #[test]
    fn builder() {
        let config = Config::new().mechanism("login").access_token("t0k");
        assert_eq!(config.auth_mechanism(), Some(&AuthMechanism::Login));
        assert_eq!(config.token(), Some("t0k"));
        assert!(!format!("{:?}", config).contains("t0k"));
        assert_eq!(Config::new().auth_mechanism(), None);
    }
}
