//! Docker Hub user/organization lookup

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use discovery::{Verdict, Verify};
use tracing::{debug, warn};

/// Checks candidate names with `HEAD <base>/v2/users/<name>`.
#[derive(Debug, Clone)]
pub struct DockerHubVerifier {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DockerHubVerifier {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn user_url(&self, name: &str) -> String {
        format!("{}/v2/users/{name}", self.base_url.trim_end_matches('/'))
    }

    /// 200 → present, 404 → absent; anything else, including timeouts, is inconclusive.
    pub async fn lookup(&self, name: &str) -> Verdict {
        let response = self
            .http
            .head(self.user_url(name))
            .header(reqwest::header::USER_AGENT, gemini_api::USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(response) => match response.status().as_u16() {
                200 => Verdict::Present,
                404 => Verdict::Absent,
                status => {
                    debug!(name, status, "registry lookup inconclusive");
                    Verdict::Inconclusive
                }
            },
            Err(e) => {
                warn!(name, error = %e, "registry lookup failed");
                Verdict::Inconclusive
            }
        }
    }
}

impl Verify for DockerHubVerifier {
    fn verify<'a>(&'a self, name: &'a str) -> Pin<Box<dyn Future<Output = Verdict> + Send + 'a>> {
        Box::pin(self.lookup(name))
    }
}
