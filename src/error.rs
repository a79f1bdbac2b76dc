//! Unified error type.

use std::fmt;
use std::net::AddrParseError;

/// The error type returned by strand's fallible operations.
///
/// Failures inside a request are expressed as HTTP responses written through
/// the chain, not as `Error`s. This type surfaces infrastructure failures:
/// parsing the listen address, binding to a port or accepting a connection.
///
/// Misusing the [`ContextStore`](crate::ContextStore) protocol is not an
/// `Error` either. An unbalanced push/pop is a programming bug and panics.
#[derive(Debug)]
pub struct Error(Kind);

#[derive(Debug)]
enum Kind {
    Io(std::io::Error),
    Addr(AddrParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Io(e) => write!(f, "io: {e}"),
            Kind::Addr(e) => write!(f, "invalid address: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            Kind::Io(e) => Some(e),
            Kind::Addr(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(Kind::Io(e))
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self(Kind::Addr(e))
    }
}
