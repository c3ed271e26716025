//! Helpers shared by the gateway integration tests.

#![allow(dead_code)]

use gromit_core::{
    ClockSkewNotice, Credentials, HttpMethod, HttpRequest, LoginTrigger, NoticeSurface,
    RequestDescriptor, Transport, UreqTransport,
};
use mock_server::{AppState, LoginResponse, MockConfig};

/// Records every login the gateway asks for.
#[derive(Debug, Default)]
pub struct Logins {
    pub urls: Vec<String>,
}

impl LoginTrigger for Logins {
    fn begin_login(&mut self, first: &RequestDescriptor) {
        self.urls.push(first.url.clone());
    }
}

/// Records notices instead of displaying them.
#[derive(Debug, Default)]
pub struct Notices {
    pub fatal: Vec<String>,
    pub skews: Vec<ClockSkewNotice>,
}

impl NoticeSurface for Notices {
    fn show_fatal(&mut self, message: &str) {
        self.fatal.push(message.to_string());
    }

    fn show_clock_skew(&mut self, notice: &ClockSkewNotice) {
        self.skews.push(notice.clone());
    }
}

/// Start the mock server on a random port and return its base URL.
pub fn start_server(config: MockConfig) -> (String, AppState) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = AppState::new(config);
    let server_state = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, server_state).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), state)
}

/// The host's login flow: exchange user name and password for a token.
pub fn log_in(base_url: &str) -> Credentials {
    let request = HttpRequest {
        method: HttpMethod::Post,
        url: format!("{base_url}/login"),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: Some(r#"{"username":"admin","password":"secret"}"#.to_string()),
    };
    let response = UreqTransport::new().execute(&request).expect("login request failed");
    assert_eq!(response.status, 200, "login rejected: {}", response.body);
    let login: LoginResponse = serde_json::from_str(&response.body).unwrap();
    Credentials::new(login.access_token, login.token_type)
}
