//! Authenticated request gateway.
//!
//! # Design
//! The gateway attaches the session's bearer token to each request, sends it
//! through the `Transport` and resolves the response into an `Outcome`.
//! When the server answers 401 (bare, or with a `NoCredentials`/`Expired`
//! fault) it clears the session, queues the request and asks the host to
//! log in. While that challenge is open every new request is queued too.
//! `resume` installs the new credentials and replays the queue in arrival
//! order.
//!
//! Everything runs on the caller's thread through `&mut self`; the queue
//! needs no locking. Outcomes travel through a one-shot channel per request,
//! so each request completes at most once and queued requests complete
//! whenever their replay finishes.

use std::collections::VecDeque;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{check_clock, parse_server_time, Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::descriptor::RequestDescriptor;
use crate::error::{GatewayError, TransportError};
use crate::http::HttpResponse;
use crate::login::LoginTrigger;
use crate::notice::{
    fatal_request_message, general_error_message, not_found_message, repeated_challenge_message,
    unreachable_message, unreadable_body_message, ClockSkewNotice, LogNotices, NoticeSurface,
};
use crate::session::{Credentials, Session};
use crate::transport::Transport;
use crate::types::{FatalReason, Fault, Outcome};

/// Authentication state of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Queue empty; requests are dispatched immediately.
    Idle,
    /// A login was triggered; requests are queued until `resume`.
    Challenging,
}

/// Receives the outcome of one submitted request.
///
/// The receiver is released as soon as `try_take` sees the outcome or a
/// closed channel, so a later `wait` reports an error instead of polling a
/// spent channel.
#[derive(Debug)]
pub struct ResponseHandle {
    id: Uuid,
    rx: Option<oneshot::Receiver<Outcome>>,
    abandoned: bool,
}

impl ResponseHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The outcome if the request has completed. Yields it only once.
    pub fn try_take(&mut self) -> Option<Outcome> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.rx = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.rx = None;
                self.abandoned = true;
                None
            }
        }
    }

    /// Wait for the outcome. Fails if the gateway is dropped while the
    /// request is still queued, or if `try_take` already yielded it.
    pub async fn wait(self) -> Result<Outcome, GatewayError> {
        let id = self.id;
        match self.rx {
            Some(rx) => rx.await.map_err(|_| GatewayError::Abandoned(id)),
            None if self.abandoned => Err(GatewayError::Abandoned(id)),
            None => Err(GatewayError::AlreadyTaken(id)),
        }
    }
}

struct Pending {
    descriptor: RequestDescriptor,
    /// Times this request has been queued behind a challenge.
    challenges: u32,
    tx: oneshot::Sender<Outcome>,
}

pub struct Gateway<T, L, N = LogNotices> {
    transport: T,
    login: L,
    notices: N,
    clock: Box<dyn Clock>,
    config: GatewayConfig,
    session: Session,
    queue: VecDeque<Pending>,
    server_time: Option<i64>,
}

impl<T, L, N> Gateway<T, L, N>
where
    T: Transport,
    L: LoginTrigger,
    N: NoticeSurface,
{
    pub fn new(transport: T, login: L, notices: N) -> Self {
        Self {
            transport,
            login,
            notices,
            clock: Box::new(SystemClock),
            config: GatewayConfig::default(),
            session: Session::new(),
            queue: VecDeque::new(),
            server_time: None,
        }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Start with credentials restored from a previous login.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.session = Session::with_credentials(credentials);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn login_trigger(&self) -> &L {
        &self.login
    }

    pub fn notices(&self) -> &N {
        &self.notices
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Last server time seen in a response, in epoch milliseconds.
    pub fn server_time(&self) -> Option<i64> {
        self.server_time
    }

    pub fn state(&self) -> AuthState {
        if self.queue.is_empty() {
            AuthState::Idle
        } else {
            AuthState::Challenging
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Ids of the queued requests in replay order.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.queue.iter().map(|p| p.descriptor.id).collect()
    }

    /// Dispatch `descriptor` now, or queue it if a challenge is open.
    pub fn submit(&mut self, descriptor: RequestDescriptor) -> ResponseHandle {
        let (tx, rx) = oneshot::channel();
        let handle = ResponseHandle {
            id: descriptor.id,
            rx: Some(rx),
            abandoned: false,
        };
        let pending = Pending {
            descriptor,
            challenges: 0,
            tx,
        };

        if self.queue.is_empty() {
            self.dispatch(pending);
        } else {
            debug!(id = %pending.descriptor.id, url = %pending.descriptor.url, "login in progress, queueing request");
            self.queue.push_back(pending);
        }
        handle
    }

    /// Install credentials from a completed login and replay the queue.
    ///
    /// Returns how many requests were taken from the queue. If a replayed
    /// request opens a new challenge, the requests behind it are queued
    /// again instead of being sent without credentials.
    pub fn resume(&mut self, credentials: Credentials) -> usize {
        let replay: Vec<Pending> = self.queue.drain(..).collect();
        info!(pending = replay.len(), "login completed, replaying queued requests");
        self.session.set(credentials);

        let count = replay.len();
        for pending in replay {
            if self.queue.is_empty() {
                self.dispatch(pending);
            } else {
                self.queue.push_back(pending);
            }
        }
        count
    }

    fn dispatch(&mut self, mut pending: Pending) {
        if let Some(authorization) = self.session.authorization() {
            pending.descriptor.set_header("Authorization", authorization);
        }
        if pending.descriptor.is_background {
            pending
                .descriptor
                .set_header(&self.config.background_header, "true");
        }

        let request = pending.descriptor.to_request();
        debug!(
            id = %pending.descriptor.id,
            method = request.method.as_str(),
            url = %request.url,
            "dispatching request"
        );

        match self.transport.execute(&request) {
            Ok(response) => {
                self.observe_server_time(&response);
                self.classify(pending, response);
            }
            Err(TransportError::Unreachable(reason)) => {
                debug!(id = %pending.descriptor.id, %reason, "transport failed");
                let url = pending.descriptor.url.clone();
                self.fail(pending, FatalReason::Unreachable { url });
            }
            Err(TransportError::UnreadableBody { status, reason }) => {
                debug!(id = %pending.descriptor.id, status, %reason, "response body unreadable");
                let url = pending.descriptor.url.clone();
                self.fail(pending, FatalReason::UnreadableBody { url, status, reason });
            }
        }
    }

    fn observe_server_time(&mut self, response: &HttpResponse) {
        if let Some(time) = response
            .cookie(&self.config.time_cookie)
            .and_then(parse_server_time)
        {
            self.server_time = Some(time);
        }
    }

    fn classify(&mut self, pending: Pending, response: HttpResponse) {
        if response.is_success() {
            self.complete(pending, Outcome::Success(response));
            return;
        }

        if let Some(fault) = Fault::parse(&response.body) {
            if response.status == 401 && fault.is_auth_challenge() {
                self.challenge(pending);
            } else {
                if !pending.descriptor.handles_errors {
                    self.generic_error(&pending.descriptor.url, fault.code(), fault.subcode(), fault.reason());
                }
                let outcome = Outcome::Fault {
                    code: fault.code().to_string(),
                    subcode: fault.subcode().to_string(),
                    reason: fault.reason().to_string(),
                };
                self.complete(pending, outcome);
            }
            return;
        }

        match response.status {
            404 => {
                if !pending.descriptor.handles_errors {
                    self.generic_error(&pending.descriptor.url, "Sender", "NotFound", "");
                }
                self.complete(pending, Outcome::NotFound);
            }
            401 => self.challenge(pending),
            _ if pending.descriptor.handles_unknown_errors => {
                self.complete(pending, Outcome::Unknown(response));
            }
            status => {
                let url = pending.descriptor.url.clone();
                self.fail(
                    pending,
                    FatalReason::UnhandledStatus {
                        url,
                        status,
                        body: response.body,
                    },
                );
            }
        }
    }

    fn challenge(&mut self, mut pending: Pending) {
        let now = self.clock.now_millis();
        if let Some(skew) = check_clock(now, self.server_time, self.config.max_clock_skew_ms) {
            warn!(
                id = %pending.descriptor.id,
                client_millis = skew.client_millis,
                server_millis = skew.server_millis,
                "client clock is off, not starting login"
            );
            self.notices.show_clock_skew(&ClockSkewNotice {
                skew,
                display_after: self.config.skew_notice_delay(),
            });
            self.complete(pending, Outcome::ClockSkew(skew));
            return;
        }

        if pending.challenges >= self.config.max_auth_retries {
            let url = pending.descriptor.url.clone();
            self.fail(pending, FatalReason::RepeatedChallenge { url });
            return;
        }

        pending.challenges += 1;
        self.session.clear();
        self.queue.push_back(pending);
        if self.queue.len() == 1 {
            info!(url = %self.queue[0].descriptor.url, "authentication required, starting login");
            self.login.begin_login(&self.queue[0].descriptor);
        } else {
            debug!(pending = self.queue.len(), "authentication required, login already started");
        }
    }

    /// Fallback for callers that do not handle errors themselves.
    fn generic_error(&mut self, url: &str, code: &str, subcode: &str, reason: &str) {
        warn!(%url, %code, %subcode, %reason, "unhandled request error");
        if subcode == "NotFound" {
            self.notices.show_fatal(&not_found_message(url));
        } else {
            self.notices.show_fatal(&general_error_message(reason));
        }
    }

    fn fail(&mut self, pending: Pending, reason: FatalReason) {
        let message = match &reason {
            FatalReason::Unreachable { url } => unreachable_message(url),
            FatalReason::UnhandledStatus { url, status, body } => {
                fatal_request_message(url, *status, body)
            }
            FatalReason::RepeatedChallenge { url } => repeated_challenge_message(url),
            FatalReason::UnreadableBody {
                url,
                status,
                reason,
            } => unreadable_body_message(url, *status, reason),
        };
        warn!(id = %pending.descriptor.id, url = %pending.descriptor.url, "request failed");
        self.notices.show_fatal(&message);
        self.complete(pending, Outcome::Fatal(reason));
    }

    fn complete(&mut self, pending: Pending, outcome: Outcome) {
        if pending.tx.send(outcome).is_err() {
            debug!(id = %pending.descriptor.id, "response handle dropped before completion");
        }
    }
}
