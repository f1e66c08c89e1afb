use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// Plain reqwest-backed [`HttpClient`].
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Client whose every call resolves or times out, so a fan-in over many
    /// of these cannot hang.
    pub fn with_timeouts(request: Duration, connect: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request)
            .connect_timeout(connect)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
