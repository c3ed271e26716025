//! Hook into the host's login flow.

use crate::descriptor::RequestDescriptor;

/// Starts an external login flow when the gateway enters a challenge.
///
/// Called once per unauthenticated episode with the first queued request.
/// The flow finishes by calling `Gateway::resume` with fresh credentials;
/// until then every request stays queued.
pub trait LoginTrigger {
    fn begin_login(&mut self, first: &RequestDescriptor);
}

impl<F> LoginTrigger for F
where
    F: FnMut(&RequestDescriptor),
{
    fn begin_login(&mut self, first: &RequestDescriptor) {
        self(first)
    }
}
