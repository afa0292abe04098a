//! Shared HTTP client construction for both gateways.

use std::time::Duration;

/// Connect and request timeouts applied to every gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            request: Duration::from_secs(120),
        }
    }
}

/// Build an HTTP client with rustls TLS, `codeqa/{version}` user-agent and
/// the given timeouts.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .user_agent(concat!("codeqa/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let t = HttpTimeouts::default();
        assert_eq!(t.connect, Duration::from_secs(30));
        assert_eq!(t.request, Duration::from_secs(120));
    }

    #[test]
    fn build_client_succeeds() {
        assert!(build_client(HttpTimeouts::default()).is_ok());
    }
}
