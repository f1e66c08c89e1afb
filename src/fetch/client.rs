use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes one outbound request. Wrappers layer on top of this to inject
/// credentials; tests substitute canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
