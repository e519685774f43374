// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media size catalog: ticket paper names to PWG media keywords and
// dimensions.  Dimensions are in hundredths of a millimetre, the unit
// media-col x/y-dimension values use on the wire.

use std::collections::HashMap;

/// One catalog entry: the self-describing PWG keyword plus dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSize {
    pub keyword: &'static str,
    /// Width in 1/100 mm.
    pub width: i32,
    /// Height in 1/100 mm.
    pub height: i32,
}

const DEFAULT_MEDIA: MediaSize = MediaSize {
    keyword: "iso_a4_210x297mm",
    width: 21000,
    height: 29700,
};

/// Ticket paper-name to media-size lookup with an ISO A4 fallback for
/// unknown names.
#[derive(Debug, Clone)]
pub struct MediaCatalog {
    sizes: HashMap<&'static str, MediaSize>,
}

impl Default for MediaCatalog {
    fn default() -> Self {
        let entries: &[(&str, &str, i32, i32)] = &[
            ("5x7", "na_5x7_5x7in", 12700, 17780),
            ("8x10", "na_govt-letter_8x10in", 20320, 25400),
            ("Legal", "na_legal_8.5x14in", 21590, 35560),
            ("Letter", "na_letter_8.5x11in", 21590, 27940),
            ("Invoice", "na_invoice_5.5x8.5in", 13970, 21590),
            ("Executive", "na_executive_7.25x10.5in", 18415, 26670),
            ("Foolscap", "na_foolscap_8.5x13in", 21590, 33020),
            ("Ledger", "na_ledger_11x17in", 27940, 43180),
            ("A0", "iso_a0_841x1189mm", 84100, 118900),
            ("A1", "iso_a1_594x841mm", 59400, 84100),
            ("A2", "iso_a2_420x594mm", 42000, 59400),
            ("A3", "iso_a3_297x420mm", 29700, 42000),
            ("A4", "iso_a4_210x297mm", 21000, 29700),
            ("A5", "iso_a5_148x210mm", 14800, 21000),
            ("A6", "iso_a6_105x148mm", 10500, 14800),
            ("A7", "iso_a7_74x105mm", 7400, 10500),
            ("A8", "iso_a8_52x74mm", 5200, 7400),
            ("A9", "iso_a9_37x52mm", 3700, 5200),
            ("A10", "iso_a10_26x37mm", 2600, 3700),
            ("ISO B0", "iso_b0_1000x1414mm", 100000, 141400),
            ("ISO B1", "iso_b1_707x1000mm", 70700, 100000),
            ("ISO B2", "iso_b2_500x707mm", 50000, 70700),
            ("ISO B3", "iso_b3_353x500mm", 35300, 50000),
            ("ISO B4", "iso_b4_250x353mm", 25000, 35300),
            ("ISO B5", "iso_b5_176x250mm", 17600, 25000),
            ("ISO B6", "iso_b6_125x176mm", 12500, 17600),
            ("ISO B7", "iso_b7_88x125mm", 8800, 12500),
            ("ISO B8", "iso_b8_62x88mm", 6200, 8800),
            ("ISO B9", "iso_b9_44x62mm", 4400, 6200),
            ("ISO B10", "iso_b10_31x44mm", 3100, 4400),
            // Bare "B" sizes are JIS, matching what Japanese drivers emit.
            ("B0", "jis_b0_1030x1456mm", 103000, 145600),
            ("B1", "jis_b1_728x1030mm", 72800, 103000),
            ("B2", "jis_b2_515x728mm", 51500, 72800),
            ("B3", "jis_b3_364x515mm", 36400, 51500),
            ("B4", "jis_b4_257x364mm", 25700, 36400),
            ("B5", "jis_b5_182x257mm", 18200, 25700),
            ("B6", "jis_b6_128x182mm", 12800, 18200),
            ("B7", "jis_b7_91x128mm", 9100, 12800),
            ("B8", "jis_b8_64x91mm", 6400, 9100),
            ("B9", "jis_b9_45x64mm", 4500, 6400),
            ("B10", "jis_b10_32x45mm", 3200, 4500),
        ];

        let sizes = entries
            .iter()
            .map(|(name, keyword, width, height)| {
                (
                    *name,
                    MediaSize {
                        keyword,
                        width: *width,
                        height: *height,
                    },
                )
            })
            .collect();
        Self { sizes }
    }
}

impl MediaCatalog {
    /// Look up a ticket paper name, defaulting to ISO A4.
    pub fn resolve(&self, paper_name: &str) -> MediaSize {
        self.sizes.get(paper_name).copied().unwrap_or(DEFAULT_MEDIA)
    }
}
