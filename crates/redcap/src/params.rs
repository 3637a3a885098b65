//! Wire-parameter construction for REDCap's form-encoded endpoint.
//!
//! REDCap's encoding has three rules that generic form serialisers get
//! wrong, so [`ParameterMap`]'s insert helpers enforce them directly:
//!
//! 1. An omitted optional key must be *absent* — not present with an empty
//!    string. The backend treats key-presence itself as meaningful.
//! 2. Booleans render as the literal string `"true"`, or the key is absent
//!    when false. Never `"1"`/`"0"` or other truthy encodings.
//! 3. List-valued fields use indexed keys (`fields[0]`, `fields[1]`, …) in
//!    array order. Comma-joined values and repeated bare keys are rejected
//!    by the server.
//!
//! The builders in this module are pure: typed options in, parameter map
//! out, REDCap defaults filled for omitted fields. The `token` parameter is
//! added by the client orchestrator, not here.

use crate::identifiers::{FieldName, InstrumentName, RecordId};

// ---------------------------------------------------------------------------
// ParameterMap
// ---------------------------------------------------------------------------

/// The eventual `application/x-www-form-urlencoded` body, as key/value
/// pairs in insertion order.
///
/// Order matters on the wire: PHP rebuilds indexed lists in body order,
/// not index order, so `fields[10]` arriving before `fields[2]` would
/// reorder the export columns. Entries are kept in a plain vector;
/// setting an existing key updates it in place without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap(Vec<(String, String)>);

impl ParameterMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a required key, updating in place when it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.into(),
            None => self.0.push((key.to_string(), value.into())),
        }
    }

    /// Inserts an optional key; `None` leaves the key absent entirely.
    pub fn set_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Inserts a boolean flag: literal `"true"` when set, absent when not.
    pub fn set_flag(&mut self, key: &str, value: bool) {
        if value {
            self.set(key, "true");
        }
    }

    /// Inserts a list as indexed keys (`key[0]`, `key[1]`, …) in order.
    ///
    /// An empty list inserts nothing, matching the absence rule for
    /// optional keys.
    pub fn set_indexed<S: AsRef<str>>(&mut self, key: &str, values: &[S]) {
        for (index, value) in values.iter().enumerate() {
            self.set(&format!("{key}[{index}]"), value.as_ref());
        }
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Percent-encodes the map as a form-urlencoded body string,
    /// preserving insertion order.
    pub fn to_form_body(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

// ---------------------------------------------------------------------------
// Option enums — wire spellings of REDCap's enumerated parameters
// ---------------------------------------------------------------------------

/// Export shape: one row per record (`flat`) or one row per
/// (record, field, value) triple (`eav`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportType {
    /// One row per record, fields as columns. REDCap's default.
    #[default]
    Flat,
    /// One row per (record, field, value) triple.
    Eav,
}

impl ExportType {
    fn as_wire(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Eav => "eav",
        }
    }
}

/// Whether exported values (or headers) use raw codes or display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawOrLabel {
    /// Raw coded values. REDCap's default.
    #[default]
    Raw,
    /// Human-readable display labels.
    Label,
}

impl RawOrLabel {
    fn as_wire(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Label => "label",
        }
    }
}

/// How an import treats fields already holding data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Blank incoming values leave existing data untouched. REDCap's default.
    #[default]
    Normal,
    /// Blank incoming values erase existing data.
    Overwrite,
}

impl OverwriteBehavior {
    fn as_wire(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Overwrite => "overwrite",
        }
    }
}

/// What an import reports back on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnContent {
    /// The number of records imported. REDCap's default.
    #[default]
    Count,
    /// The list of affected record ids.
    Ids,
    /// The list of auto-assigned record ids.
    AutoIds,
}

impl ReturnContent {
    fn as_wire(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Ids => "ids",
            Self::AutoIds => "auto_ids",
        }
    }
}

/// Date component order expected in imported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Year-month-day. REDCap's default.
    #[default]
    Ymd,
    /// Month-day-year.
    Mdy,
    /// Day-month-year.
    Dmy,
}

impl DateFormat {
    fn as_wire(self) -> &'static str {
        match self {
            Self::Ymd => "YMD",
            Self::Mdy => "MDY",
            Self::Dmy => "DMY",
        }
    }
}

// ---------------------------------------------------------------------------
// Caller options
// ---------------------------------------------------------------------------

/// Options for a record export. Every field is optional; defaults below
/// match what the REDCap backend assumes when the key is absent.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Restrict to these records. Empty exports all records.
    pub records: Vec<RecordId>,
    /// Restrict to these fields. Empty exports all fields.
    pub fields: Vec<FieldName>,
    /// Restrict to these instruments. Empty exports all instruments.
    pub forms: Vec<InstrumentName>,
    /// Restrict to these unique event names. Empty exports all events.
    pub events: Vec<String>,
    /// Export shape. Default [`ExportType::Flat`].
    pub export_type: ExportType,
    /// Raw codes or labels for values. Default [`RawOrLabel::Raw`].
    pub raw_or_label: RawOrLabel,
    /// Raw codes or labels for headers. Default [`RawOrLabel::Raw`].
    pub raw_or_label_headers: RawOrLabel,
    /// Export checkbox labels instead of Checked/Unchecked. Default off.
    pub export_checkbox_label: bool,
    /// Include survey identifier and timestamp fields. Default off.
    pub export_survey_fields: bool,
    /// Include each record's data-access-group assignment. Default off.
    pub export_data_access_groups: bool,
    /// Filter-logic expression evaluated server-side. Values interpolated
    /// from untrusted input must pass through [`escape_filter_value`].
    pub filter_logic: Option<String>,
    /// Only records created or modified after this datetime.
    pub date_range_begin: Option<String>,
    /// Only records created or modified before this datetime.
    pub date_range_end: Option<String>,
}

/// Options for a record import. Every field is optional; defaults match
/// the REDCap backend's assumptions.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Treatment of blank incoming values. Default
    /// [`OverwriteBehavior::Normal`].
    pub overwrite_behavior: OverwriteBehavior,
    /// Let the server assign record ids. Default off.
    pub force_auto_number: bool,
    /// What the server reports back. Default [`ReturnContent::Count`].
    pub return_content: ReturnContent,
    /// Date component order in incoming values. Default [`DateFormat::Ymd`].
    pub date_format: DateFormat,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Builds the base parameter map for a record export.
pub fn build_export_params(options: &ExportOptions) -> ParameterMap {
    let mut params = ParameterMap::new();
    params.set("content", "record");
    params.set("format", "json");
    params.set("type", options.export_type.as_wire());
    params.set("rawOrLabel", options.raw_or_label.as_wire());
    params.set("rawOrLabelHeaders", options.raw_or_label_headers.as_wire());
    params.set_flag("exportCheckboxLabel", options.export_checkbox_label);
    params.set_flag("exportSurveyFields", options.export_survey_fields);
    params.set_flag(
        "exportDataAccessGroups",
        options.export_data_access_groups,
    );
    params.set_opt("filterLogic", options.filter_logic.as_deref());
    params.set_opt("dateRangeBegin", options.date_range_begin.as_deref());
    params.set_opt("dateRangeEnd", options.date_range_end.as_deref());

    let records: Vec<&str> = options.records.iter().map(RecordId::as_str).collect();
    params.set_indexed("records", &records);
    let fields: Vec<&str> = options.fields.iter().map(FieldName::as_str).collect();
    params.set_indexed("fields", &fields);
    let forms: Vec<&str> = options.forms.iter().map(InstrumentName::as_str).collect();
    params.set_indexed("forms", &forms);
    params.set_indexed("events", &options.events);

    params
}

/// Builds the base parameter map for a record import.
///
/// `records` is serialised into the single `data` value as a JSON array.
pub fn build_import_params(
    records: &[serde_json::Value],
    options: &ImportOptions,
) -> ParameterMap {
    let mut params = ParameterMap::new();
    params.set("content", "record");
    params.set("format", "json");
    params.set(
        "data",
        serde_json::Value::Array(records.to_vec()).to_string(),
    );
    params.set(
        "overwriteBehavior",
        options.overwrite_behavior.as_wire(),
    );
    params.set_flag("forceAutoNumber", options.force_auto_number);
    params.set("returnContent", options.return_content.as_wire());
    params.set("dateFormat", options.date_format.as_wire());
    params
}

/// Escapes a value for interpolation into a filter-logic expression.
///
/// Embedded `\` and `"` become `\\` and `\"`, so an attacker-supplied value
/// cannot terminate the string literal and widen the filter's match.
pub fn escape_filter_value(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    escaped
}
