//! Resolution of the operator set that sits behind the upstream provider.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Agency, AgencyCoverage};
use crate::services::transit_api::TransitApi;

/// Operators known for one feed cycle.
///
/// `coverage` drives the fan-out and `agencies` holds the descriptive
/// records; both keep upstream order. The id lookup is read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    coverage: Vec<AgencyCoverage>,
    agencies: Vec<Agency>,
    by_id: HashMap<String, usize>,
}

impl Directory {
    pub fn new(coverage: Vec<AgencyCoverage>, agencies: Vec<Agency>) -> Self {
        let mut by_id = HashMap::with_capacity(agencies.len());
        for (idx, agency) in agencies.iter().enumerate() {
            by_id.entry(agency.id.clone()).or_insert(idx);
        }
        Self {
            coverage,
            agencies,
            by_id,
        }
    }

    /// Builds a directory where every agency also has a coverage entry.
    #[cfg(test)]
    pub(crate) fn from_agencies(agencies: Vec<Agency>) -> Self {
        let coverage = agencies
            .iter()
            .map(|a| AgencyCoverage {
                agency_id: a.id.clone(),
                lat: 0.0,
                lon: 0.0,
                lat_span: 0.0,
                lon_span: 0.0,
            })
            .collect();
        Self::new(coverage, agencies)
    }

    /// Operator ids to request rosters for, in upstream order.
    pub fn agency_ids(&self) -> impl Iterator<Item = &str> {
        self.coverage.iter().map(|c| c.agency_id.as_str())
    }

    pub fn coverage(&self) -> &[AgencyCoverage] {
        &self.coverage
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn lookup(&self, agency_id: &str) -> Option<&Agency> {
        self.by_id.get(agency_id).map(|&idx| &self.agencies[idx])
    }

    pub fn len(&self) -> usize {
        self.coverage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty()
    }
}

/// Fetches a fresh [`Directory`] from the provider on every call.
#[derive(Clone)]
pub struct AgencyDirectory {
    api: Arc<dyn TransitApi>,
}

impl AgencyDirectory {
    pub fn new(api: Arc<dyn TransitApi>) -> Self {
        Self { api }
    }

    /// Resolves coverage and reference records in one upstream call.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self) -> Result<Directory> {
        let resp = self.api.agencies_with_coverage().await?;
        let agencies = resp.data.references.unwrap_or_default().agencies;
        let directory = Directory::new(resp.data.list, agencies);
        info!(
            operators = directory.len(),
            described = directory.agencies().len(),
            "Agency directory resolved"
        );
        Ok(directory)
    }

    /// Descriptive records for every known operator, in upstream order.
    pub async fn list_agencies(&self) -> Result<Vec<Agency>> {
        let directory = self.resolve().await?;
        debug!(count = directory.agencies().len(), "Listing agencies");
        Ok(directory.agencies)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn agency(id: &str, name: &str) -> Agency {
        Agency {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
            email: None,
            url: None,
            fare_url: None,
            timezone: "America/Los_Angeles".to_string(),
            disclaimer: None,
            lang: "EN".to_string(),
            private_service: None,
        }
    }
}
