//! Typed response payloads for the metadata-shaped operations.
//!
//! Field names mirror REDCap's JSON spelling. Record exports are
//! shape-polymorphic (flat vs. EAV, project-defined columns) and stay as
//! raw `serde_json::Value` rows; only the fixed-shape payloads get structs.

use serde::{Deserialize, Serialize};

use crate::identifiers::{FieldName, InstrumentName};

/// Project settings as returned by `content=project`.
///
/// REDCap encodes its booleans as the integers `0`/`1` here (a different
/// convention from the request side's `"true"`/absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Server-assigned project id.
    pub project_id: i64,
    /// Human-readable project title.
    pub project_title: String,
    /// 1 when the project is in production, 0 in development.
    #[serde(default)]
    pub in_production: u8,
    /// 1 when the project is longitudinal.
    #[serde(default)]
    pub is_longitudinal: u8,
    /// 1 when surveys are enabled.
    #[serde(default)]
    pub surveys_enabled: u8,
    /// 1 when the project auto-numbers new records.
    #[serde(default)]
    pub record_autonumbering_enabled: u8,
    /// 1 when repeating instruments or events are defined.
    #[serde(default)]
    pub has_repeating_instruments_or_events: u8,
}

/// One data-collection instrument, from `content=instrument`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Machine name; deserialisation re-checks the format.
    pub instrument_name: InstrumentName,
    /// Display label.
    pub instrument_label: String,
}

/// One field's data dictionary entry, from `content=metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Machine name; deserialisation re-checks the format.
    pub field_name: FieldName,
    /// Owning instrument.
    pub form_name: InstrumentName,
    /// REDCap field type (`text`, `radio`, `checkbox`, …).
    pub field_type: String,
    /// Display label.
    #[serde(default)]
    pub field_label: String,
    /// Choice list or calculation, for choice/calc fields.
    #[serde(default)]
    pub select_choices_or_calculations: String,
    /// Validation type for text fields, when configured.
    #[serde(default)]
    pub text_validation_type_or_show_slider_number: String,
    /// `"y"` when the field is required.
    #[serde(default)]
    pub required_field: String,
    /// `"y"` when the field is a PHI identifier.
    #[serde(default)]
    pub identifier: String,
}

/// One entry from `content=exportFieldNames`: the mapping from a data
/// dictionary field to the column name(s) it exports under (checkbox
/// fields fan out per choice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFieldName {
    /// Field name as defined in the data dictionary.
    pub original_field_name: String,
    /// Choice code for checkbox fields; empty otherwise.
    #[serde(default)]
    pub choice_value: String,
    /// Column name used in exports.
    pub export_field_name: String,
}

/// What an import reported back, shaped by the requested `returnContent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportReceipt {
    /// Number of records imported (`returnContent=count`).
    Count(u64),
    /// Affected record ids (`returnContent=ids` or `auto_ids`).
    Ids(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_info_decodes_redcap_spelling() {
        let json = r#"{
            "project_id": 1234,
            "project_title": "Ward Admission Audit",
            "in_production": 1,
            "is_longitudinal": 0,
            "surveys_enabled": 1,
            "record_autonumbering_enabled": 1,
            "has_repeating_instruments_or_events": 0
        }"#;
        let info: ProjectInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.project_id, 1234);
        assert_eq!(info.in_production, 1);
        assert_eq!(info.is_longitudinal, 0);
    }

    #[test]
    fn project_info_tolerates_missing_flags() {
        let info: ProjectInfo =
            serde_json::from_str(r#"{"project_id": 1, "project_title": "x"}"#).unwrap();
        assert_eq!(info.surveys_enabled, 0);
    }

    #[test]
    fn instrument_deserialisation_revalidates_names() {
        let ok: Instrument = serde_json::from_str(
            r#"{"instrument_name": "baseline_visit", "instrument_label": "Baseline Visit"}"#,
        )
        .unwrap();
        assert_eq!(ok.instrument_name.as_str(), "baseline_visit");

        let bad = serde_json::from_str::<Instrument>(
            r#"{"instrument_name": "Baseline Visit", "instrument_label": "x"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn metadata_defaults_optional_columns_to_empty() {
        let field: FieldMetadata = serde_json::from_str(
            r#"{"field_name": "age", "form_name": "demographics", "field_type": "text"}"#,
        )
        .unwrap();
        assert_eq!(field.required_field, "");
        assert_eq!(field.select_choices_or_calculations, "");
    }
}
