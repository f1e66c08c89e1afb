use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::models::{Agency, AgencyCoverage, CODE_OK, EntryResponse, ListResponse, VehicleRecord};
use crate::services::transit_api::TransitApi;

const KEY_PARAM: &str = "key";

/// [`TransitApi`] backed by the OneBusAway REST API.
///
/// Without a configured key every call fails with `ConfigMissing` before
/// anything goes over the wire.
pub struct OneBusAwayClient<C = BasicClient> {
    base_url: String,
    http: Option<UrlParam<C>>,
}

impl OneBusAwayClient<BasicClient> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = BasicClient::with_timeouts(config.request_timeout, config.connect_timeout)?;
        Ok(Self::with_client(config, http))
    }
}

impl<C: HttpClient> OneBusAwayClient<C> {
    pub fn with_client(config: &Config, http: C) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: config
                .api_key
                .as_ref()
                .map(|key| UrlParam::new(http, KEY_PARAM, key.clone())),
        }
    }

    fn http(&self) -> Result<&UrlParam<C>> {
        self.http
            .as_ref()
            .ok_or(FleetError::ConfigMissing(crate::config::API_KEY_VAR))
    }

    /// `{base}/api/where/{method}[/{id}].json`. The id is pushed as a single
    /// percent-encoded path segment, so it can never leave the method path.
    fn url(&self, method: &str, id: Option<&str>) -> Result<String> {
        let mut url: reqwest::Url = self.base_url.parse().map_err(|e| {
            FleetError::UpstreamUnavailable(format!("invalid base url {}: {e}", self.base_url))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FleetError::UpstreamUnavailable(format!("base url {} has no path", self.base_url))
            })?;
            segments.pop_if_empty().extend(["api", "where"]);
            match id {
                Some(id) => segments.push(method).push(&format!("{id}.json")),
                None => segments.push(&format!("{method}.json")),
            };
        }
        Ok(url.into())
    }

    async fn get_list<T>(&self, method: &str, id: Option<&str>) -> Result<ListResponse<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let http = self.http()?;
        let url = self.url(method, id)?;
        debug!(method, "Requesting list");
        let resp: ListResponse<T> = fetch_json(http, &url).await?;
        ensure_ok(resp.code, &resp.text)?;
        Ok(resp)
    }
}

fn ensure_ok(code: i64, text: &str) -> Result<()> {
    if code == CODE_OK {
        Ok(())
    } else {
        Err(FleetError::UpstreamUnavailable(format!(
            "envelope code {code}: {text}"
        )))
    }
}

#[async_trait]
impl<C: HttpClient> TransitApi for OneBusAwayClient<C> {
    async fn agencies_with_coverage(&self) -> Result<ListResponse<AgencyCoverage>> {
        self.get_list("agencies-with-coverage", None).await
    }

    async fn vehicles_for_agency(&self, agency_id: &str) -> Result<ListResponse<VehicleRecord>> {
        self.get_list("vehicles-for-agency", Some(agency_id)).await
    }

    /// The envelope is returned as-is, including a non-200 `code`, so the
    /// caller can report the provider's own message.
    async fn agency(&self, agency_id: &str) -> Result<EntryResponse<Agency>> {
        let http = self.http()?;
        fetch_json(http, &self.url("agency", Some(agency_id))?).await
    }
}
