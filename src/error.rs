//! Error taxonomy shared by every stage of the pipeline.

use std::fmt;

/// Convenience alias used throughout the library.
pub type Result<T, E = FleetError> = std::result::Result<T, E>;

/// Failure kinds, without payload, for matching and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigMissing,
    UpstreamUnavailable,
    UpstreamMalformed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigMissing => "config_missing",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::UpstreamMalformed => "upstream_malformed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// A required setting (the upstream credential) is not configured.
    #[error("missing configuration: {0} is not set")]
    ConfigMissing(&'static str),

    /// Network failure, timeout, or a non-success status from one source.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The source answered but the payload does not have the expected shape.
    #[error("upstream payload malformed: {0}")]
    UpstreamMalformed(String),

    /// The agency directory could not be resolved, so nothing was fanned out.
    #[error("aggregation failed: {source}")]
    AggregateFailure {
        #[source]
        source: Box<FleetError>,
    },
}

impl FleetError {
    pub fn aggregate(source: FleetError) -> Self {
        FleetError::AggregateFailure {
            source: Box::new(source),
        }
    }

    /// Root kind of the error; an aggregate failure reports the kind of the
    /// directory error it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::ConfigMissing(_) => ErrorKind::ConfigMissing,
            FleetError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            FleetError::UpstreamMalformed(_) => ErrorKind::UpstreamMalformed,
            FleetError::AggregateFailure { source } => source.kind(),
        }
    }

    /// HTTP status used when the error is surfaced at the service boundary.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::ConfigMissing => 500,
            ErrorKind::UpstreamUnavailable | ErrorKind::UpstreamMalformed => 502,
        }
    }
}

impl From<reqwest::Error> for FleetError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FleetError::UpstreamMalformed(e.to_string())
        } else {
            FleetError::UpstreamUnavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(e: serde_json::Error) -> Self {
        FleetError::UpstreamMalformed(e.to_string())
    }
}
