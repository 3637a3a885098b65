//! Version-banded capability adapters and their registry.
//!
//! A REDCap server's behavior drifts across major versions: endpoints
//! appear, parameter quirks come and go, features ship. Each
//! [`VersionAdapter`] bundles the behavior for one half-open version band;
//! the trait's default method bodies are the base adapter (pass-through
//! parameter transforms, always-available endpoint checks, all features
//! on), and per-band adapters override only what differs.
//!
//! [`AdapterRegistry::select`] scans its bands oldest to newest and returns
//! the first whose range contains the resolved version. The registry trusts
//! its ranges to partition version-space contiguously; it performs no
//! overlap validation.

use std::sync::Arc;

use crate::errors::UnsupportedVersionError;
use crate::params::ParameterMap;
use crate::version::{Version, VersionRange};

// ---------------------------------------------------------------------------
// Feature flags
// ---------------------------------------------------------------------------

/// Static feature availability for one version band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    /// Repeating instruments and events.
    pub repeating_instruments: bool,
    /// Data access groups.
    pub data_access_groups: bool,
    /// The project file repository.
    pub file_repository: bool,
    /// The mobile companion app endpoints.
    pub mobile_app: bool,
    /// The survey queue.
    pub survey_queue: bool,
    /// Alerts and notifications.
    pub alerts: bool,
}

impl FeatureSet {
    /// Every feature available.
    pub const fn all() -> Self {
        Self {
            repeating_instruments: true,
            data_access_groups: true,
            file_repository: true,
            mobile_app: true,
            survey_queue: true,
            alerts: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter trait — default bodies are the base adapter
// ---------------------------------------------------------------------------

/// Pure, stateless behavior bundle bound to one version band.
///
/// Adapters never perform I/O; they reshape parameter maps and answer
/// capability questions. Many coexist in a registry; exactly one is
/// expected to match any supported version.
pub trait VersionAdapter: Send + Sync {
    /// The half-open version band this adapter covers.
    fn range(&self) -> VersionRange;

    /// Adjusts export parameters for this band. Pass-through by default.
    fn transform_export_params(&self, _params: &mut ParameterMap) {}

    /// Adjusts import parameters for this band. Pass-through by default.
    fn transform_import_params(&self, _params: &mut ParameterMap) {}

    /// Whether a content-type/action pair exists in this band.
    ///
    /// The default reports everything available; banded adapters restrict.
    fn supports_endpoint(&self, _content: &str, _action: Option<&str>) -> bool {
        true
    }

    /// Static feature flags for this band.
    fn features(&self) -> FeatureSet {
        FeatureSet::all()
    }
}

// ---------------------------------------------------------------------------
// Concrete bands
// ---------------------------------------------------------------------------

// Content types every supported band exposes.
const BASE_CONTENT: &[&str] = &[
    "version",
    "project",
    "instrument",
    "metadata",
    "exportFieldNames",
    "record",
    "surveyLink",
    "surveyQueueLink",
    "pdf",
    "file",
    "user",
    "event",
    "arm",
    "repeatingFormsEvents",
    "dag",
    "userDagMapping",
    "log",
];

// Added in the 15.x line.
const V15_CONTENT: &[&str] = &["fileRepository"];

// Added in the 16.x line.
const V16_CONTENT: &[&str] = &["randomization"];

fn content_known(content: &str, extra: &[&[&str]]) -> bool {
    BASE_CONTENT.contains(&content) || extra.iter().any(|set| set.contains(&content))
}

/// Adapter for REDCap `[14.0.0, 15.0.0)`.
///
/// 14.x defaults its error bodies to XML unless `returnFormat` is spelled
/// out, so both transforms pin it to `json`.
#[derive(Debug, Default)]
pub struct V14Adapter;

impl V14Adapter {
    fn pin_return_format(params: &mut ParameterMap) {
        if !params.contains_key("returnFormat") {
            params.set("returnFormat", "json");
        }
    }
}

impl VersionAdapter for V14Adapter {
    fn range(&self) -> VersionRange {
        VersionRange::new(Version::new(14, 0, 0), Version::new(15, 0, 0))
    }

    fn transform_export_params(&self, params: &mut ParameterMap) {
        Self::pin_return_format(params);
    }

    fn transform_import_params(&self, params: &mut ParameterMap) {
        Self::pin_return_format(params);
    }

    fn supports_endpoint(&self, content: &str, action: Option<&str>) -> bool {
        // DAG switching arrived in 15.0.
        if content == "dag" && action == Some("switch") {
            return false;
        }
        content_known(content, &[])
    }

    fn features(&self) -> FeatureSet {
        FeatureSet {
            file_repository: false,
            ..FeatureSet::all()
        }
    }
}

/// Adapter for REDCap `[15.0.0, 16.0.0)`.
#[derive(Debug, Default)]
pub struct V15Adapter;

impl VersionAdapter for V15Adapter {
    fn range(&self) -> VersionRange {
        VersionRange::new(Version::new(15, 0, 0), Version::new(16, 0, 0))
    }

    fn supports_endpoint(&self, content: &str, _action: Option<&str>) -> bool {
        content_known(content, &[V15_CONTENT])
    }
}

/// Adapter for REDCap `[16.0.0, 17.0.0)`.
#[derive(Debug, Default)]
pub struct V16Adapter;

impl VersionAdapter for V16Adapter {
    fn range(&self) -> VersionRange {
        VersionRange::new(Version::new(16, 0, 0), Version::new(17, 0, 0))
    }

    fn supports_endpoint(&self, content: &str, _action: Option<&str>) -> bool {
        content_known(content, &[V15_CONTENT, V16_CONTENT])
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The ordered set of version bands, scanned oldest to newest.
///
/// Static process-start configuration; immutable and freely shareable
/// across concurrent callers. Adapters are held behind [`Arc`] so a
/// resolved adapter can outlive the registry that selected it.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn VersionAdapter>>,
}

impl AdapterRegistry {
    /// Builds a registry from bands already in ascending range order.
    pub fn new(adapters: Vec<Arc<dyn VersionAdapter>>) -> Self {
        Self { adapters }
    }

    /// The built-in bands: 14.x, 15.x, 16.x.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(V14Adapter),
            Arc::new(V15Adapter),
            Arc::new(V16Adapter),
        ])
    }

    /// Returns the first adapter whose range contains `version`.
    ///
    /// On a miss the error carries the nearest supported bounds, so the
    /// caller can report "too old" or "too new" precisely.
    pub fn select(
        &self,
        version: Version,
    ) -> Result<Arc<dyn VersionAdapter>, UnsupportedVersionError> {
        for adapter in &self.adapters {
            if adapter.range().contains(version) {
                return Ok(Arc::clone(adapter));
            }
        }
        Err(UnsupportedVersionError {
            version,
            nearest_min: self.adapters.first().map(|a| a.range().min),
            nearest_max: self.adapters.last().and_then(|a| a.range().max),
        })
    }

    /// The bands in registry order.
    pub fn adapters(&self) -> impl Iterator<Item = &dyn VersionAdapter> {
        self.adapters.iter().map(Arc::as_ref)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ranges: Vec<String> = self
            .adapters
            .iter()
            .map(|a| a.range().to_string())
            .collect();
        f.debug_struct("AdapterRegistry")
            .field("ranges", &ranges)
            .finish()
    }
}
