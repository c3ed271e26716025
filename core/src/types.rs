//! Fault envelope and request outcomes.
//!
//! # Design
//! The server reports recognised errors as a SOAP-style fault envelope:
//!
//! ```json
//! {"Fault":{"Code":{"Value":"Sender","Subcode":{"Value":"Expired"}},
//!           "Reason":{"Text":"The token has expired"}}}
//! ```
//!
//! Every submitted request resolves to exactly one `Outcome`. Callers never
//! see transport errors directly; those become `Outcome::Fatal`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::ClockSkew;
use crate::error::GatewayError;
use crate::http::HttpResponse;

/// Fault subcodes that signal missing or stale credentials.
pub const SUBCODE_NO_CREDENTIALS: &str = "NoCredentials";
pub const SUBCODE_EXPIRED: &str = "Expired";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultEnvelope {
    pub fault: Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fault {
    pub code: FaultCode,
    #[serde(default)]
    pub reason: FaultReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultCode {
    pub value: String,
    #[serde(default)]
    pub subcode: FaultSubcode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultSubcode {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultReason {
    #[serde(default)]
    pub text: String,
}

impl Fault {
    /// Parse a response body as a fault envelope. Anything else, including
    /// an empty body or non-JSON text, is treated as unstructured.
    pub fn parse(body: &str) -> Option<Fault> {
        serde_json::from_str::<FaultEnvelope>(body)
            .ok()
            .map(|envelope| envelope.fault)
    }

    pub fn code(&self) -> &str {
        &self.code.value
    }

    pub fn subcode(&self) -> &str {
        &self.code.subcode.value
    }

    pub fn reason(&self) -> &str {
        &self.reason.text
    }

    /// True when the subcode asks the client to (re-)authenticate.
    pub fn is_auth_challenge(&self) -> bool {
        matches!(self.subcode(), SUBCODE_NO_CREDENTIALS | SUBCODE_EXPIRED)
    }
}

/// Why a request ended in a user-visible fatal notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    /// No HTTP status was obtained.
    Unreachable { url: String },
    /// A non-2xx status without a fault envelope and no handler for it.
    UnhandledStatus { url: String, status: u16, body: String },
    /// The request hit the authentication challenge again after a replay.
    RepeatedChallenge { url: String },
    /// The response body could not be read.
    UnreadableBody {
        url: String,
        status: u16,
        reason: String,
    },
}

/// Final result of a submitted request. Delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx response.
    Success(HttpResponse),
    /// Structured server fault that is not an authentication challenge.
    Fault {
        code: String,
        subcode: String,
        reason: String,
    },
    /// Bare 404 without a fault envelope.
    NotFound,
    /// Any other non-2xx status, for callers that handle unknown errors.
    Unknown(HttpResponse),
    /// Surfaced to the notice surface; the request will not be retried.
    Fatal(FatalReason),
    /// The challenge path was aborted because the client clock is wrong.
    ClockSkew(ClockSkew),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// `(code, subcode, reason)` for error outcomes reported to an error
    /// handler. A bare 404 maps to `("Sender", "NotFound", "")`.
    pub fn error_parts(&self) -> Option<(&str, &str, &str)> {
        match self {
            Outcome::Fault {
                code,
                subcode,
                reason,
            } => Some((code.as_str(), subcode.as_str(), reason.as_str())),
            Outcome::NotFound => Some(("Sender", "NotFound", "")),
            _ => None,
        }
    }

    /// Decode the body of a successful response.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        match self {
            Outcome::Success(response) => serde_json::from_str(&response.body)
                .map_err(|e| GatewayError::Deserialization(e.to_string())),
            other => Err(GatewayError::Deserialization(format!(
                "no response body to decode: {other:?}"
            ))),
        }
    }
}
