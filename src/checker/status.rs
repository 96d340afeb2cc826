// src/checker/status.rs
// =============================================================================
// Turns a fetch outcome into a verdict: is this link alive or broken?
//
// HTTP status codes (after redirects have been followed):
// - 200-299: Success
// - 300-399: Success too (a redirect we were not allowed to follow further)
// - 404:     Broken, "not found"
// - 500:     Broken, "server error"
// - anything else: Broken, with the raw code kept
//
// When no response came back at all (timeout, DNS, refused connection, ...)
// the link is Broken as "unreachable".
// =============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Why a request never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    Dns,
    Connect,
    Tls,
    TooManyRedirects,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportErrorKind::Timeout => "request timed out",
            TransportErrorKind::Dns => "could not resolve hostname",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Tls => "TLS error",
            TransportErrorKind::TooManyRedirects => "too many redirects",
            TransportErrorKind::Other => "request failed",
        };
        f.write_str(text)
    }
}

/// The ways a link can be broken.
///
/// Serializes as the bare status code, or as the string `"unreachable"` when
/// the target never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokenStatus {
    /// 404
    NotFound,
    /// 500
    ServerError,
    /// Any other non-2xx/3xx status
    Http(u16),
    /// No response at all
    Unreachable(TransportErrorKind),
}

impl BrokenStatus {
    /// The numeric code, `None` for unreachable targets.
    pub fn code(&self) -> Option<u16> {
        match self {
            BrokenStatus::NotFound => Some(404),
            BrokenStatus::ServerError => Some(500),
            BrokenStatus::Http(code) => Some(*code),
            BrokenStatus::Unreachable(_) => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, BrokenStatus::Unreachable(_))
    }
}

impl fmt::Display for BrokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenStatus::Unreachable(_) => f.write_str("unreachable"),
            other => write!(f, "{}", other.code().unwrap_or_default()),
        }
    }
}

impl Serialize for BrokenStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.code() {
            Some(code) => serializer.serialize_u16(code),
            None => serializer.serialize_str("unreachable"),
        }
    }
}

impl<'de> Deserialize<'de> for BrokenStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(classify_status(code)
                .broken()
                .unwrap_or(BrokenStatus::Http(code))),
            Raw::Text(text) if text == "unreachable" => {
                Ok(BrokenStatus::Unreachable(TransportErrorKind::Other))
            }
            Raw::Text(text) => Err(serde::de::Error::custom(format!(
                "unknown link status '{}'",
                text
            ))),
        }
    }
}

/// Verdict for one fetched target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Link is working; holds the final status code
    Ok(u16),
    /// Link is broken
    Broken(BrokenStatus),
}

impl LinkStatus {
    pub fn broken(self) -> Option<BrokenStatus> {
        match self {
            LinkStatus::Ok(_) => None,
            LinkStatus::Broken(status) => Some(status),
        }
    }
}

/// Classifies a final HTTP status code.
pub fn classify_status(code: u16) -> LinkStatus {
    match code {
        200..=399 => LinkStatus::Ok(code),
        404 => LinkStatus::Broken(BrokenStatus::NotFound),
        500 => LinkStatus::Broken(BrokenStatus::ServerError),
        other => LinkStatus::Broken(BrokenStatus::Http(other)),
    }
}
