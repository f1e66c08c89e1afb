//! Trait for the upstream transit provider that sits in front of every operator.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Agency, AgencyCoverage, EntryResponse, ListResponse, VehicleRecord};

/// Abstraction over the upstream provider (e.g. a OneBusAway deployment).
///
/// Every call is independent and may fail on its own; callers decide whether
/// a failure is fatal or isolated.
#[async_trait]
pub trait TransitApi: Send + Sync {
    /// Operators with coverage, plus their descriptive records as references.
    async fn agencies_with_coverage(&self) -> Result<ListResponse<AgencyCoverage>>;

    /// The live roster of one operator.
    async fn vehicles_for_agency(&self, agency_id: &str) -> Result<ListResponse<VehicleRecord>>;

    /// A single operator's descriptive record.
    async fn agency(&self, agency_id: &str) -> Result<EntryResponse<Agency>>;
}
