mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{FleetError, Result};

/// GETs `url` through `client` and decodes the JSON body.
///
/// Transport errors and non-success statuses are `UpstreamUnavailable`; a body
/// that does not decode into `T` is `UpstreamMalformed`.
pub async fn fetch_json<C, T>(client: &C, url: &str) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let parsed: reqwest::Url = url
        .parse()
        .map_err(|e| FleetError::UpstreamUnavailable(format!("invalid url {url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FleetError::UpstreamUnavailable(format!(
            "status {status} from {}",
            resp.url().path()
        )));
    }

    let bytes = resp.bytes().await?;
    debug!(bytes = bytes.len(), "Response body received");
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::HttpClient;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with the status and body chosen by `respond`,
    /// recording the requested URLs.
    pub struct CannedClient<F> {
        respond: F,
        pub seen: Mutex<Vec<String>>,
    }

    impl<F> CannedClient<F>
    where
        F: Fn(&str) -> (u16, String) + Send + Sync,
    {
        pub fn new(respond: F) -> Self {
            Self {
                respond,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl<F> HttpClient for CannedClient<F>
    where
        F: Fn(&str) -> (u16, String) + Send + Sync,
    {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let url = req.url().to_string();
            self.seen.lock().unwrap().push(url.clone());
            let (status, body) = (self.respond)(&url);
            let resp = http::Response::builder()
                .status(status)
                .body(body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }
}
