// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job ticket: the declarative description of a single print job, read from a
// JSON file produced by the job producer.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Page orientation override carried in the ticket's PDL overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// IPP `orientation-requested` enum value (RFC 8011 section 5.2.10).
    pub fn ipp_enum_value(self) -> i32 {
        match self {
            Self::Portrait => 3,
            Self::Landscape => 4,
        }
    }
}

/// PDL overrides the producer wants applied at print time.  Only names which
/// overrides apply; the values come from the rest of the ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdlOverrides {
    #[serde(
        rename = "Orientation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub orientation: Option<Orientation>,
}

/// IPP credentials supplied by the ticket.  Both fields must be non-empty
/// for the pair to be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "Username", default)]
    pub username: String,
    #[serde(rename = "Password", default)]
    pub password: String,
}

impl Credentials {
    /// Whether this pair is usable (both parts present).
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// A validated print job ticket.
///
/// Field names mirror the on-disk JSON document emitted by the job producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTicket {
    #[serde(rename = "Copies")]
    pub copies: i32,
    #[serde(rename = "PrintColorMode")]
    pub print_color_mode: String,
    #[serde(rename = "Sides")]
    pub sides: String,
    #[serde(rename = "DocumentFormat")]
    pub document_format: String,
    #[serde(rename = "PaperName")]
    pub paper_name: String,
    #[serde(rename = "PaperWidthMM")]
    pub paper_width_mm: u32,
    #[serde(rename = "PaperHeightMM")]
    pub paper_height_mm: u32,
    #[serde(rename = "OptionalPDLOverrides")]
    pub pdl_overrides: PdlOverrides,
    #[serde(rename = "Credentials")]
    pub credentials: Credentials,
    #[serde(rename = "Finishings")]
    pub finishings: Vec<String>,
    /// Printer-specific alternate document formats, ordered by preference.
    #[serde(rename = "AltDocumentFormat")]
    pub alt_document_formats: Vec<String>,
}

/// Failure loading or validating a job ticket.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("failed to read job ticket file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse job ticket: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid job ticket: {0}")]
    Invalid(&'static str),
}

impl JobTicket {
    /// Read and validate a ticket from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TicketError> {
        let data = std::fs::read(path)?;
        let ticket: JobTicket = serde_json::from_slice(&data)?;
        ticket.validate()?;
        Ok(ticket)
    }

    /// Check the invariants the rest of the pipeline relies on.
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.print_color_mode.is_empty() {
            return Err(TicketError::Invalid("invalid color mode"));
        }
        if self.sides.is_empty() {
            return Err(TicketError::Invalid("invalid value for sides"));
        }
        if self.copies < 1 {
            return Err(TicketError::Invalid("invalid number of copies"));
        }
        if self.paper_name.is_empty() || self.paper_height_mm == 0 || self.paper_width_mm == 0 {
            return Err(TicketError::Invalid(
                "invalid paper name, height or width values",
            ));
        }
        if self.document_format.is_empty() {
            return Err(TicketError::Invalid("invalid document format"));
        }
        Ok(())
    }
}

/// Producers emit `"Orientation": ""` when no override is requested; treat
/// the empty string the same as an absent field.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<Orientation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("portrait") => Ok(Some(Orientation::Portrait)),
        Some("landscape") => Ok(Some(Orientation::Landscape)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unknown orientation {other:?}"
        ))),
    }
}
