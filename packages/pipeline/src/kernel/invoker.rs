//! Internal invocation client used by the scheduler to reach the control
//! endpoints.

use anyhow::{anyhow, Result};
use std::time::Duration;

pub struct Invoker {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl Invoker {
    pub fn new(base_url: String, bearer_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    /// POST an empty body to an internal target endpoint.
    pub async fn invoke(&self, target: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, target);
        let mut request = self.client.post(&url).json(&serde_json::json!({}));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("invocation of {} failed ({}): {}", target, status, body));
        }

        tracing::debug!(target, "internal invocation succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let invoker = Invoker::new("http://127.0.0.1:8080/".into(), None);
        assert_eq!(invoker.base_url, "http://127.0.0.1:8080");
    }
}
