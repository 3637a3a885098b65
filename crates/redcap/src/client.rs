//! The client orchestrator: one request/response round-trip per operation.
//!
//! Each operation follows the same pipeline:
//!
//! 1. Inputs arrive as branded identifiers, so format violations were
//!    rejected at construction, before any network access.
//! 2. The active adapter was resolved at client construction (from an
//!    explicit version, or self-probed via the version endpoint — the
//!    caller's choice).
//! 3. A pure builder constructs the base parameters; the adapter's
//!    transform hook adjusts them for the server's version band.
//! 4. The map is form-urlencoded — the token travels as the `token` body
//!    parameter, REDCap's own convention, never an auth header — and one
//!    POST goes out through the injected transport.
//! 5. The outcome classifies into exactly one of: success payload,
//!    [`RedcapError::Network`], [`RedcapError::Http`], or
//!    [`RedcapError::Api`]. A 200 status is not proof of success; every
//!    JSON payload is checked for REDCap's embedded `error` key.
//!
//! The client holds no mutable state, applies no timeout, and never
//! retries; it is safe to share across concurrent callers.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::adapters::{AdapterRegistry, FeatureSet, VersionAdapter};
use crate::errors::{RedcapError, UnsupportedVersionError};
use crate::identifiers::{Email, FieldName, InstrumentName, RecordId, Token, UserId};
use crate::params::{
    build_export_params, build_import_params, escape_filter_value, ExportOptions, ImportOptions,
    ParameterMap, ReturnContent,
};
use crate::responses::{ExportFieldName, FieldMetadata, ImportReceipt, Instrument, ProjectInfo};
use crate::transport::{Transport, WireRequest, WireResponse};
use crate::version::Version;

/// Failure while constructing a client, before any operation ran.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The version probe itself failed.
    #[error(transparent)]
    Probe(#[from] RedcapError),
    /// No registered adapter covers the resolved version.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedVersionError),
}

/// A typed client for one REDCap project: one endpoint URL, one token,
/// one resolved capability adapter.
pub struct RedcapClient {
    base_url: Url,
    token: Token,
    transport: Arc<dyn Transport>,
    adapter: Arc<dyn VersionAdapter>,
    version: Version,
}

impl RedcapClient {
    /// Builds a client for a server whose version is already known,
    /// resolving the adapter from the built-in registry.
    pub fn with_version(
        base_url: Url,
        token: Token,
        transport: Arc<dyn Transport>,
        version: Version,
    ) -> Result<Self, UnsupportedVersionError> {
        Self::with_registry(
            base_url,
            token,
            transport,
            version,
            &AdapterRegistry::with_defaults(),
        )
    }

    /// Like [`with_version`](Self::with_version), with a caller-supplied
    /// registry.
    pub fn with_registry(
        base_url: Url,
        token: Token,
        transport: Arc<dyn Transport>,
        version: Version,
        registry: &AdapterRegistry,
    ) -> Result<Self, UnsupportedVersionError> {
        let adapter = registry.select(version)?;
        Ok(Self {
            base_url,
            token,
            transport,
            adapter,
            version,
        })
    }

    /// Builds a client by probing the server's version first.
    pub async fn probe(
        base_url: Url,
        token: Token,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientBuildError> {
        let version = probe_version(&base_url, &token, transport.as_ref()).await?;
        Ok(Self::with_version(base_url, token, transport, version)?)
    }

    /// The server version this client was resolved against.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The endpoint URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Feature flags of the active version band.
    pub fn features(&self) -> FeatureSet {
        self.adapter.features()
    }

    /// Whether a content-type/action pair exists in the active band.
    pub fn supports(&self, content: &str, action: Option<&str>) -> bool {
        self.adapter.supports_endpoint(content, action)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Asks the server for its own version (plain-text response).
    pub async fn get_version(&self) -> Result<Version, RedcapError> {
        let response = self.call(version_params()).await?;
        parse_version_body(&response)
    }

    /// Exports the project settings.
    pub async fn get_project_info(&self) -> Result<ProjectInfo, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "project");
        params.set("format", "json");
        let response = self.call(params).await?;
        decode_json("project", &response)
    }

    /// Lists the project's instruments.
    pub async fn get_instruments(&self) -> Result<Vec<Instrument>, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "instrument");
        params.set("format", "json");
        let response = self.call(params).await?;
        decode_json("instrument", &response)
    }

    /// Exports the project's data dictionary.
    pub async fn get_fields(&self) -> Result<Vec<FieldMetadata>, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "metadata");
        params.set("format", "json");
        let response = self.call(params).await?;
        decode_json("metadata", &response)
    }

    /// Lists the export column names for every field.
    pub async fn get_export_field_names(&self) -> Result<Vec<ExportFieldName>, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "exportFieldNames");
        params.set("format", "json");
        let response = self.call(params).await?;
        decode_json("exportFieldNames", &response)
    }

    /// Exports records. Rows stay as raw JSON values: their shape is
    /// project-defined and differs between flat and EAV exports.
    pub async fn export_records(
        &self,
        options: &ExportOptions,
    ) -> Result<Vec<serde_json::Value>, RedcapError> {
        let mut params = build_export_params(options);
        self.adapter.transform_export_params(&mut params);
        let response = self.call(params).await?;
        decode_json("record export", &response)
    }

    /// Imports records, returning what the server reported back.
    pub async fn import_records(
        &self,
        records: &[serde_json::Value],
        options: &ImportOptions,
    ) -> Result<ImportReceipt, RedcapError> {
        let mut params = build_import_params(records, options);
        self.adapter.transform_import_params(&mut params);
        let response = self.call(params).await?;
        match options.return_content {
            ReturnContent::Count => {
                #[derive(Deserialize)]
                struct CountBody {
                    count: u64,
                }
                let body: CountBody = decode_json("record import", &response)?;
                Ok(ImportReceipt::Count(body.count))
            }
            ReturnContent::Ids | ReturnContent::AutoIds => {
                let ids: Vec<String> = decode_json("record import", &response)?;
                Ok(ImportReceipt::Ids(ids))
            }
        }
    }

    /// Fetches the survey link for one record/instrument pair
    /// (plain-text URL response).
    pub async fn get_survey_link(
        &self,
        record: &RecordId,
        instrument: &InstrumentName,
    ) -> Result<String, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "surveyLink");
        params.set("record", record.as_str());
        params.set("instrument", instrument.as_str());
        let response = self.call(params).await?;
        decode_text("surveyLink", &response)
    }

    /// Downloads the instrument's PDF for one record (binary response).
    pub async fn download_pdf(
        &self,
        record: &RecordId,
        instrument: &InstrumentName,
    ) -> Result<Vec<u8>, RedcapError> {
        let mut params = ParameterMap::new();
        params.set("content", "pdf");
        params.set("record", record.as_str());
        params.set("instrument", instrument.as_str());
        let response = self.call(params).await?;
        // Failures still arrive as JSON through a success status.
        if let Some(err) = embedded_api_error(response.status, response.body_bytes()) {
            return Err(err);
        }
        Ok(response.body_bytes().unwrap_or_default().to_vec())
    }

    /// Looks up a user id by email in the project's user directory
    /// records. Not-found is a value, never an error.
    pub async fn find_user_id_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserId>, RedcapError> {
        let options = ExportOptions {
            fields: vec![FieldName::new_unchecked("user_id")],
            filter_logic: Some(format!(
                "[email] = \"{}\"",
                escape_filter_value(email.as_str())
            )),
            ..Default::default()
        };
        let rows = self.export_records(&options).await?;
        for row in &rows {
            if let Some(raw) = row.get("user_id").and_then(serde_json::Value::as_str) {
                if let Ok(user) = UserId::new(raw) {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    async fn call(&self, params: ParameterMap) -> Result<WireResponse, RedcapError> {
        dispatch(self.transport.as_ref(), &self.base_url, &self.token, params).await
    }
}

impl std::fmt::Debug for RedcapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedcapClient")
            .field("base_url", &self.base_url.as_str())
            .field("version", &self.version)
            .field("range", &self.adapter.range().to_string())
            .finish_non_exhaustive()
    }
}

/// Probes a server's version without a constructed client.
///
/// Used by [`RedcapClient::probe`], and directly by embedders that resolve
/// the version once and construct many clients from it.
pub async fn probe_version(
    base_url: &Url,
    token: &Token,
    transport: &dyn Transport,
) -> Result<Version, RedcapError> {
    let response = dispatch(transport, base_url, token, version_params()).await?;
    parse_version_body(&response)
}

fn version_params() -> ParameterMap {
    let mut params = ParameterMap::new();
    params.set("content", "version");
    params
}

async fn dispatch(
    transport: &dyn Transport,
    base_url: &Url,
    token: &Token,
    mut params: ParameterMap,
) -> Result<WireResponse, RedcapError> {
    let content = params.get("content").unwrap_or("?").to_string();
    params.set("token", token.as_str());
    let request = WireRequest::post_form(base_url.as_str(), params.to_form_body());

    tracing::debug!(content = %content, url = %base_url, "redcap request");
    let response = transport
        .execute(request)
        .await
        .map_err(|failure| RedcapError::Network {
            cause: failure.cause,
            url: failure.url,
        })?;
    tracing::debug!(content = %content, status = response.status, "redcap response");

    if !response.is_ok() {
        return Err(RedcapError::Http {
            status: response.status,
            status_text: response.status_text.clone(),
            body: response.body_text(),
            url: response.url.clone(),
        });
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// Classification of 2xx payloads
// ---------------------------------------------------------------------------

/// Detects REDCap's application-level failure smuggled through a success
/// status: a JSON object carrying an `error` key.
fn embedded_api_error(status: u16, body: Option<&[u8]>) -> Option<RedcapError> {
    let value: serde_json::Value = serde_json::from_slice(body?).ok()?;
    let object = value.as_object()?;
    let message = object.get("error")?;
    Some(RedcapError::Api {
        message: message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string()),
        code: object.get("code").and_then(serde_json::Value::as_i64),
        status: Some(status),
    })
}

/// An undecodable success payload. The payload itself is wrong, so this
/// classifies on the API channel, never as success.
fn decode_failure(operation: &str, detail: impl std::fmt::Display, status: u16) -> RedcapError {
    RedcapError::Api {
        message: format!("malformed {operation} response: {detail}"),
        code: None,
        status: Some(status),
    }
}

fn decode_json<T: DeserializeOwned>(
    operation: &str,
    response: &WireResponse,
) -> Result<T, RedcapError> {
    if let Some(err) = embedded_api_error(response.status, response.body_bytes()) {
        return Err(err);
    }
    let bytes = response.body_bytes().unwrap_or_default();
    serde_json::from_slice(bytes).map_err(|err| decode_failure(operation, err, response.status))
}

fn decode_text(operation: &str, response: &WireResponse) -> Result<String, RedcapError> {
    if let Some(err) = embedded_api_error(response.status, response.body_bytes()) {
        return Err(err);
    }
    response
        .body_text()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| decode_failure(operation, "empty body", response.status))
}

fn parse_version_body(response: &WireResponse) -> Result<Version, RedcapError> {
    let text = decode_text("version", response)?;
    text.parse()
        .map_err(|err| decode_failure("version", err, response.status))
}
