//! Skips mock-server tests where the sandbox forbids binding a loopback port.
//!
//! Set `FILMFETCH_REQUIRE_SOCKET_TESTS=1` (or `true`/`yes`) to turn a skip
//! into a failure, e.g. in CI.

use std::net::{Ipv4Addr, TcpListener};
use std::thread;

use wiremock::MockServer;

const REQUIRE_SOCKET_TESTS: &str = "FILMFETCH_REQUIRE_SOCKET_TESTS";

fn loopback_available() -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).is_ok()
}

fn skipping_is_an_error() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS)
        .is_ok_and(|value| ["1", "true", "yes"].iter().any(|on| value.eq_ignore_ascii_case(on)))
}

/// Starts a mock server, or returns `None` after logging why the test is skipped.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if loopback_available() {
        return Some(MockServer::start().await);
    }

    let current = thread::current();
    let test = current.name().unwrap_or("unnamed test");
    assert!(
        !skipping_is_an_error(),
        "{test}: cannot bind a loopback socket and {REQUIRE_SOCKET_TESTS} is set"
    );
    eprintln!("skipping {test}: cannot bind a loopback socket (set {REQUIRE_SOCKET_TESTS}=1 to fail instead)");
    None
}

/// Value a skipped test returns in place of running.
pub trait Skipped {
    fn skipped() -> Self;
}

impl Skipped for () {
    fn skipped() -> Self {}
}

impl Skipped for Result<(), Box<dyn std::error::Error>> {
    fn skipped() -> Self {
        Ok(())
    }
}

pub fn socket_skip_return<T: Skipped>() -> T {
    T::skipped()
}
