//! Protocol-compatibility core for REDCap's form-encoded HTTP API.
//!
//! REDCap exposes one quirky endpoint whose behavior differs across server
//! versions and whose failures surface through three different channels.
//! This crate is the typed layer that absorbs those quirks: branded input
//! primitives, a version model, version-banded capability adapters, wire
//! parameter builders matching REDCap's idiosyncratic encoding, and the
//! error-classification pipeline.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O
//! dependencies. HTTP is performed by an injected [`Transport`]; the
//! `redcap-transport` crate supplies the reqwest-backed implementation,
//! and tests supply scripted doubles.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Branded input primitives (`Token`, `RecordId`, etc.) |
//! | [`version`] | Three-part versions and half-open version ranges |
//! | [`errors`] | The three-channel error taxonomy and retry predicates |
//! | [`params`] | Wire-parameter maps and the pure export/import builders |
//! | [`adapters`] | Version-banded capability adapters and their registry |
//! | [`transport`] | The injected transport port |
//! | [`responses`] | Typed payloads for the metadata-shaped operations |
//! | [`client`] | The per-operation orchestrator |

pub mod adapters;
pub mod client;
pub mod errors;
pub mod identifiers;
pub mod params;
pub mod responses;
pub mod transport;
pub mod version;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use adapters::{
    AdapterRegistry, FeatureSet, V14Adapter, V15Adapter, V16Adapter, VersionAdapter,
};
pub use client::{probe_version, ClientBuildError, RedcapClient};
pub use errors::{FormatError, RedcapError, UnsupportedVersionError, VersionParseError};
pub use identifiers::{Email, FieldName, InstrumentName, RecordId, Token, UserId};
pub use params::{
    build_export_params, build_import_params, escape_filter_value, DateFormat, ExportOptions,
    ExportType, ImportOptions, OverwriteBehavior, ParameterMap, RawOrLabel, ReturnContent,
};
pub use responses::{ExportFieldName, FieldMetadata, ImportReceipt, Instrument, ProjectInfo};
pub use transport::{
    Transport, TransportFailure, WireRequest, WireResponse, FORM_CONTENT_TYPE,
};
pub use version::{Version, VersionRange};
