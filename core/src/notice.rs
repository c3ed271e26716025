//! User-facing notices raised by the gateway.
//!
//! # Design
//! The gateway never renders anything itself. Fatal conditions and clock
//! problems go to a `NoticeSurface` supplied by the host; `LogNotices`
//! writes them through `tracing` for hosts without a UI.

use std::time::Duration;

use chrono::DateTime;
use tracing::{error, warn};

use crate::clock::{ClockSkew, SkewDirection};

/// Delay before a clock notice should be shown, so that a page still
/// loading does not hide it.
pub const DEFAULT_SKEW_NOTICE_DELAY: Duration = Duration::from_millis(3000);

/// Where fatal and clock notices are displayed.
pub trait NoticeSurface {
    fn show_fatal(&mut self, message: &str);

    fn show_clock_skew(&mut self, notice: &ClockSkewNotice);
}

/// A persistent "your clock is wrong" notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSkewNotice {
    pub skew: ClockSkew,
    /// Display delay, not a request timeout.
    pub display_after: Duration,
}

impl ClockSkewNotice {
    pub fn heading(&self) -> &'static str {
        match self.skew.direction {
            SkewDirection::Ahead => "Your clock is ahead",
            SkewDirection::Behind => "Your clock is behind",
        }
    }

    pub fn detail(&self) -> String {
        format!(
            "Your computer's date and time ({}) are incorrect. Update your date and time to use the application.",
            format_millis(self.skew.client_millis)
        )
    }
}

/// Notice surface that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotices;

impl NoticeSurface for LogNotices {
    fn show_fatal(&mut self, message: &str) {
        error!(%message, "fatal request error");
    }

    fn show_clock_skew(&mut self, notice: &ClockSkewNotice) {
        warn!(
            heading = notice.heading(),
            client_millis = notice.skew.client_millis,
            server_millis = notice.skew.server_millis,
            "{}",
            notice.detail()
        );
    }
}

pub fn unreachable_message(url: &str) -> String {
    format!("Unable to contact server at {url}")
}

pub fn not_found_message(url: &str) -> String {
    format!(
        "There was a general error accessing the resource {url}. The server responded that the resource wasn't found."
    )
}

pub fn fatal_request_message(url: &str, status: u16, body: &str) -> String {
    format!(
        "There was an error calling the URL ({url}). The server returned the status code {status} with the following data which was not parsable JSON data: {body}"
    )
}

pub fn unreadable_body_message(url: &str, status: u16, reason: &str) -> String {
    format!(
        "There was an error calling the URL ({url}). The server returned the status code {status} but the response could not be read: {reason}"
    )
}

/// The general error notice shows only the reason, never code or subcode.
pub fn general_error_message(reason: &str) -> String {
    if reason.is_empty() {
        " ".to_string()
    } else {
        reason.to_string()
    }
}

pub fn repeated_challenge_message(url: &str) -> String {
    format!("The server rejected the credentials again for {url}. Sign in again and retry.")
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
