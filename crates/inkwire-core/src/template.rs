// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job template: the IPP job-template attribute group derived from a ticket
// and the target printer's capabilities.

use tracing::{debug, warn};

use crate::attributes::PrinterAttributes;
use crate::finishings::{remap_for_landscape, FinishingsCatalog};
use crate::media::MediaCatalog;
use crate::ticket::{JobTicket, Orientation};

/// `multiple-document-handling` value attached to every job.
pub const MULTI_DOCUMENT_HANDLING: &str = "separate-documents-collated-copies";

/// Media requested for the job, in whichever form the printer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSelection {
    /// Plain `media` keyword.
    Keyword(String),
    /// `media-col` media-size collection, dimensions in 1/100 mm.
    Collection { x_dimension: i32, y_dimension: i32 },
}

/// The job-template attributes sent with Create-Job or Print-Job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTemplate {
    pub copies: i32,
    pub color_mode: String,
    pub sides: String,
    /// Finishings enum values already filtered to what the printer supports.
    pub finishings: Vec<i32>,
    pub media: MediaSelection,
    pub orientation: Option<Orientation>,
}

impl JobTemplate {
    /// Build the template from a ticket and the printer's attributes.
    ///
    /// Media is expressed as a media-col collection when the printer
    /// advertises media-col support, otherwise as a media keyword.
    pub fn build(
        ticket: &JobTicket,
        printer: &PrinterAttributes,
        media: &MediaCatalog,
        finishings: &FinishingsCatalog,
    ) -> Self {
        let size = media.resolve(&ticket.paper_name);
        let media = if printer.media_col_supported.is_empty() {
            MediaSelection::Keyword(size.keyword.to_string())
        } else {
            MediaSelection::Collection {
                x_dimension: size.width,
                y_dimension: size.height,
            }
        };

        Self {
            copies: ticket.copies,
            color_mode: ticket.print_color_mode.clone(),
            sides: ticket.sides.clone(),
            finishings: map_finishings(ticket, printer, finishings),
            media,
            orientation: ticket.pdl_overrides.orientation,
        }
    }
}

/// Map the ticket's finishing keywords onto enum values the printer accepts.
///
/// Positioned staples are rotated for landscape documents before the
/// capability check.  A finishing the printer lacks falls back to its
/// generic variant when that is supported, and is dropped otherwise.
pub fn map_finishings(
    ticket: &JobTicket,
    printer: &PrinterAttributes,
    catalog: &FinishingsCatalog,
) -> Vec<i32> {
    let mut mapped = Vec::new();

    for keyword in &ticket.finishings {
        let Some(mut requested) = catalog.from_keyword(keyword) else {
            warn!(%keyword, "requested finishing is not in the catalog, skipping");
            continue;
        };

        // Position of some finishing options changes with document orientation.
        if ticket.pdl_overrides.orientation == Some(Orientation::Landscape) {
            requested = remap_for_landscape(requested);
        }

        if printer.finishings_supported.contains(&requested.value()) {
            mapped.push(requested.value());
            continue;
        }

        match catalog.generic_fallback(requested) {
            Some(generic) if printer.finishings_supported.contains(&generic.value()) => {
                debug!(
                    requested = requested.value(),
                    fallback = generic.value(),
                    "falling back to generic finishing"
                );
                mapped.push(generic.value());
            }
            _ => {
                debug!(
                    requested = requested.value(),
                    "finishing not supported by printer, ignoring"
                );
            }
        }
    }

    mapped
}
