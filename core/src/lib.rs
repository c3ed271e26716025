//! Authenticated request gateway for JSON REST APIs.
//!
//! # Overview
//! Callers build `RequestDescriptor`s (usually through `RestClient`) and hand
//! them to a `Gateway`. The gateway attaches the bearer token, sends the
//! request through a `Transport` and resolves the response into an
//! `Outcome`. When the server asks for credentials the gateway queues
//! requests, triggers the host's login flow once, and replays the queue in
//! order when `Gateway::resume` delivers a new token.
//!
//! # Design
//! - Session credentials live in the gateway, not in global state.
//! - One `Transport` trait covers both closures and the `ureq` client.
//! - Outcomes replace per-request callbacks and arrive through a one-shot
//!   `ResponseHandle`.
//! - Fatal conditions and clock problems go to a host `NoticeSurface`.
//! - Single-threaded: all state changes happen inside `&mut self` calls.

pub mod client;
pub mod clock;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod gateway;
pub mod http;
pub mod login;
pub mod notice;
pub mod session;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use clock::{Clock, ClockSkew, FixedClock, SkewDirection, SystemClock};
pub use config::GatewayConfig;
pub use descriptor::RequestDescriptor;
pub use error::{GatewayError, TransportError};
pub use gateway::{AuthState, Gateway, ResponseHandle};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use login::LoginTrigger;
pub use notice::{ClockSkewNotice, LogNotices, NoticeSurface};
pub use session::{Credentials, Session};
pub use transport::{Transport, UreqTransport};
pub use types::{FatalReason, Fault, Outcome};
