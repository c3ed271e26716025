//! Verify response classification against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each case feeds one simulated response to a fresh gateway through a
//! closure transport and checks the resulting outcome, the authentication
//! state and how many fatal notices were shown.

mod common;

use common::{Logins, Notices};
use gromit_core::{
    AuthState, FixedClock, Gateway, HttpRequest, HttpResponse, Outcome, RestClient, TransportError,
};

const NOW: i64 = 1_700_000_000_000;

fn simulated_response(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

#[test]
fn dispatch_test_vectors() {
    let raw = include_str!("../../test-vectors/dispatch.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let rest = RestClient::new("http://localhost:3000");

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = simulated_response(case);
        let transport =
            move |_: &HttpRequest| -> Result<HttpResponse, TransportError> { Ok(response.clone()) };
        let mut gw = Gateway::new(transport, Logins::default(), Notices::default())
            .with_clock(FixedClock::new(NOW));

        let mut desc = rest.get("/items");
        desc.handles_errors = case["handles_errors"].as_bool().unwrap_or(false);
        desc.handles_unknown_errors = case["handles_unknown_errors"].as_bool().unwrap_or(false);
        let mut handle = gw.submit(desc);

        let expected = &case["expected"];
        let kind = expected["kind"].as_str().unwrap();
        match (kind, handle.try_take()) {
            ("success", Some(Outcome::Success(resp))) => {
                assert_eq!(resp.status, case["response"]["status"], "{name}: status");
            }
            ("fault", Some(outcome @ Outcome::Fault { .. })) => {
                assert_eq!(
                    outcome.error_parts(),
                    Some((
                        expected["code"].as_str().unwrap(),
                        expected["subcode"].as_str().unwrap(),
                        expected["reason"].as_str().unwrap(),
                    )),
                    "{name}: fault parts"
                );
            }
            ("not_found", Some(Outcome::NotFound)) => {}
            ("unknown", Some(Outcome::Unknown(resp))) => {
                assert_eq!(resp.body, case["response"]["body"], "{name}: body");
            }
            ("fatal", Some(Outcome::Fatal(_))) => {}
            ("challenge", None) => {
                assert_eq!(gw.state(), AuthState::Challenging, "{name}: state");
                assert_eq!(gw.login_trigger().urls.len(), 1, "{name}: logins");
            }
            (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
        }

        if kind != "challenge" {
            assert_eq!(gw.state(), AuthState::Idle, "{name}: state");
            assert!(gw.login_trigger().urls.is_empty(), "{name}: logins");
        }
        assert_eq!(
            gw.notices().fatal.len() as u64,
            case["fatal_notices"].as_u64().unwrap(),
            "{name}: fatal notices"
        );
    }
}
