//! Branded domain identifiers.
//!
//! Every externally supplied identifier is represented as a distinct newtype
//! wrapping a `String`, paired with a construction-time format check. Once a
//! value has been constructed it is always valid; the only way to hold an
//! invalid one is the deliberate [`new_unchecked`](Token::new_unchecked)
//! bypass, reserved for code that has already proven the invariant (most
//! commonly test fixtures).
//!
//! Each identifier exposes:
//!
//! - `new` — the checked constructor, returning [`FormatError`] on violation
//!   (this doubles as the non-throwing parse: failure is a value, never a
//!   panic);
//! - `is_valid` — the boolean guard predicate over raw strings;
//! - `new_unchecked` — the trusted bypass;
//! - `as_str` / `Display` / serde support (serde routes through the checked
//!   constructor, so deserialised values carry the same guarantee).

use serde::{Deserialize, Serialize};

use crate::errors::FormatError;

// ---------------------------------------------------------------------------
// Macro for format-checked String newtypes.
// Generates: struct, new() -> Result, is_valid(), new_unchecked(), as_str(),
// Display, TryFrom<String>/From<Self> for String (drives serde validation).
// ---------------------------------------------------------------------------
macro_rules! branded_string {
    (
        $(#[$attr:meta])*
        $name:ident, kind: $kind:literal, pattern: $pattern:literal, check: $check:ident
    ) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Checks `value` against the format and brands it on success.
            pub fn new(value: impl Into<String>) -> Result<Self, FormatError> {
                let v = value.into();
                if $check(&v) {
                    Ok(Self(v))
                } else {
                    Err(FormatError {
                        kind: $kind,
                        pattern: $pattern,
                        value: v,
                    })
                }
            }

            /// Returns `true` if `value` satisfies the format.
            pub fn is_valid(value: &str) -> bool {
                $check(value)
            }

            /// Brands `value` without checking it.
            ///
            /// Reserved for callers that have already established the format
            /// holds (e.g. compile-time literals, test fixtures).
            pub fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = FormatError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Format predicates
// ---------------------------------------------------------------------------

fn is_token(value: &str) -> bool {
    value.len() == 32
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

fn is_record_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn is_redcap_name(value: &str) -> bool {
    let mut bytes = value.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn is_user_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

branded_string! {
    /// A REDCap API token: exactly 32 uppercase hexadecimal characters.
    ///
    /// Sent as the `token` body parameter of every request. Never logged;
    /// the `Debug` impl below redacts the value.
    Token,
    kind: "API token",
    pattern: "32 uppercase hexadecimal characters",
    check: is_token
}

branded_string! {
    /// Identifies one record within a REDCap project.
    ///
    /// Non-empty; alphanumerics, underscores, and hyphens.
    RecordId,
    kind: "record id",
    pattern: "one or more alphanumerics, underscores, or hyphens",
    check: is_record_id
}

branded_string! {
    /// The machine name of a data-collection instrument (form).
    ///
    /// A lowercase letter followed by lowercase alphanumerics or underscores,
    /// REDCap's own naming rule for instruments.
    InstrumentName,
    kind: "instrument name",
    pattern: "a lowercase letter followed by lowercase alphanumerics or underscores",
    check: is_redcap_name
}

branded_string! {
    /// The machine name of a field within an instrument.
    ///
    /// Same character rule as [`InstrumentName`]; the two are distinct types
    /// so a field can never be passed where a form is expected.
    FieldName,
    kind: "field name",
    pattern: "a lowercase letter followed by lowercase alphanumerics or underscores",
    check: is_redcap_name
}

branded_string! {
    /// An email address: `local@domain` with a dotted domain and no
    /// whitespace anywhere.
    Email,
    kind: "email address",
    pattern: "local-part@domain with at least two dot-separated domain labels",
    check: is_email
}

branded_string! {
    /// A REDCap user id: one or more word characters.
    UserId,
    kind: "user id",
    pattern: "one or more word characters",
    check: is_user_id
}

// Tokens are credentials; keep them out of logs and panic messages.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

impl std::fmt::Debug for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordId({:?})", self.0)
    }
}

impl std::fmt::Debug for InstrumentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstrumentName({:?})", self.0)
    }
}

impl std::fmt::Debug for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldName({:?})", self.0)
    }
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Email({:?})", self.0)
    }
}

impl std::fmt::Debug for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserId({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_32_uppercase_hex_chars() {
        assert!(Token::new("A1B2C3D4E5F67890A1B2C3D4E5F67890").is_ok());
    }

    #[test]
    fn token_rejects_lowercase_and_wrong_lengths() {
        assert!(Token::new("a1b2c3d4e5f67890a1b2c3d4e5f67890").is_err());
        // 31 chars
        assert!(Token::new("A1B2C3D4E5F67890A1B2C3D4E5F6789").is_err());
        // 33 chars
        assert!(Token::new("A1B2C3D4E5F67890A1B2C3D4E5F678900").is_err());
        // Non-hex letter
        assert!(Token::new("G1B2C3D4E5F67890A1B2C3D4E5F67890").is_err());
    }

    #[test]
    fn format_error_names_the_violated_pattern() {
        let err = Token::new("nope").unwrap_err();
        assert_eq!(err.kind, "API token");
        assert_eq!(err.value, "nope");
        assert!(err.to_string().contains("32 uppercase hexadecimal"));
    }

    #[test]
    fn record_id_allows_word_chars_and_hyphens() {
        assert!(RecordId::new("1001").is_ok());
        assert!(RecordId::new("ABC-001_x").is_ok());
        assert!(RecordId::new("").is_err());
        assert!(RecordId::new("no spaces").is_err());
    }

    #[test]
    fn instrument_name_requires_leading_lowercase_letter() {
        assert!(InstrumentName::new("baseline_visit").is_ok());
        assert!(InstrumentName::new("visit2").is_ok());
        assert!(InstrumentName::new("Baseline").is_err());
        assert!(InstrumentName::new("2visit").is_err());
        assert!(InstrumentName::new("_visit").is_err());
        assert!(InstrumentName::new("").is_err());
    }

    #[test]
    fn field_name_follows_the_same_rule() {
        assert!(FieldName::new("record_id").is_ok());
        assert!(FieldName::new("dob_y").is_ok());
        assert!(FieldName::new("DOB").is_err());
    }

    #[test]
    fn email_requires_dotted_domain_and_no_whitespace() {
        assert!(Email::new("nurse@clinic.example.org").is_ok());
        assert!(Email::new("a@b.c").is_ok());
        assert!(Email::new("nodomain@").is_err());
        assert!(Email::new("@clinic.org").is_err());
        assert!(Email::new("nurse@localhost").is_err());
        assert!(Email::new("nurse@clinic.").is_err());
        assert!(Email::new("nurse @clinic.org").is_err());
        assert!(Email::new("nurse@cli nic.org").is_err());
    }

    #[test]
    fn user_id_is_one_or_more_word_chars() {
        assert!(UserId::new("jdoe_2").is_ok());
        assert!(UserId::new("").is_err());
        assert!(UserId::new("j doe").is_err());
    }

    #[test]
    fn unchecked_construction_bypasses_the_format() {
        let id = RecordId::new_unchecked("anything goes");
        assert_eq!(id.as_str(), "anything goes");
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = Token::new_unchecked("A1B2C3D4E5F67890A1B2C3D4E5F67890");
        assert_eq!(format!("{token:?}"), "Token(<redacted>)");
    }

    #[test]
    fn serde_round_trip_revalidates() {
        let id: RecordId = serde_json::from_str("\"1001\"").unwrap();
        assert_eq!(id.as_str(), "1001");
        assert!(serde_json::from_str::<RecordId>("\"has space\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1001\"");
    }
}
