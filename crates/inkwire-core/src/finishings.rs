// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Finishings: IPP enum values (RFC 8011 / PWG 5100.1), the ticket keyword
// catalog, and the generic fallbacks used when a printer lacks a positioned
// variant.

use std::collections::HashMap;

/// IPP `finishings` enumeration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Finishing {
    None = 3,
    Staple = 4,
    Punch = 5,
    Cover = 6,
    Bind = 7,
    SaddleStitch = 8,
    EdgeStitch = 9,
    Fold = 10,
    Trim = 11,
    Bale = 12,
    BookletMaker = 13,
    JogOffset = 14,
    StapleTopLeft = 20,
    StapleBottomLeft = 21,
    StapleTopRight = 22,
    StapleBottomRight = 23,
    EdgeStitchLeft = 24,
    EdgeStitchTop = 25,
    EdgeStitchRight = 26,
    EdgeStitchBottom = 27,
    StapleDualLeft = 28,
    StapleDualTop = 29,
    StapleDualRight = 30,
    StapleDualBottom = 31,
    PunchTopLeft = 70,
    PunchBottomLeft = 71,
    PunchTopRight = 72,
    PunchBottomRight = 73,
    PunchDualLeft = 74,
    PunchDualTop = 75,
    PunchDualRight = 76,
    PunchDualBottom = 77,
    FoldAccordion = 90,
    FoldDoubleGate = 91,
    FoldGate = 92,
    FoldHalf = 93,
    FoldHalfZ = 94,
    FoldLeftGate = 95,
    FoldLetter = 96,
    FoldParallel = 97,
    FoldPoster = 98,
    FoldRightGate = 99,
    FoldZ = 100,
}

impl Finishing {
    pub fn value(self) -> i32 {
        self as i32
    }
}

/// Maps ticket finishing keywords to enum values and positioned variants to
/// their generic fallback.
#[derive(Debug, Clone)]
pub struct FinishingsCatalog {
    by_keyword: HashMap<&'static str, Finishing>,
    generic: HashMap<Finishing, Finishing>,
}

impl Default for FinishingsCatalog {
    fn default() -> Self {
        use Finishing::*;

        let by_keyword = HashMap::from([
            ("none", None),
            ("staple", Staple),
            ("punch", Punch),
            ("cover", Cover),
            ("bind", Bind),
            ("saddle-stitch", SaddleStitch),
            ("edge-stitch", EdgeStitch),
            ("fold", Fold),
            ("trim", Trim),
            ("bale", Bale),
            ("booklet-maker", BookletMaker),
            ("jog-offset", JogOffset),
            ("staple-top-left", StapleTopLeft),
            ("staple-bottom-left", StapleBottomLeft),
            ("staple-top-right", StapleTopRight),
            ("staple-bottom-right", StapleBottomRight),
            ("edge-stitch-left", EdgeStitchLeft),
            ("edge-stitch-top", EdgeStitchTop),
            ("edge-stitch-right", EdgeStitchRight),
            ("edge-stitch-bottom", EdgeStitchBottom),
            ("staple-dual-left", StapleDualLeft),
            ("staple-dual-top", StapleDualTop),
            ("staple-dual-right", StapleDualRight),
            ("staple-dual-bottom", StapleDualBottom),
            ("punch-top-left", PunchTopLeft),
            ("punch-bottom-left", PunchBottomLeft),
            ("punch-top-right", PunchTopRight),
            ("punch-bottom-right", PunchBottomRight),
            ("punch-dual-left", PunchDualLeft),
            ("punch-dual-top", PunchDualTop),
            ("punch-dual-right", PunchDualRight),
            ("punch-dual-bottom", PunchDualBottom),
            ("fold-accordion", FoldAccordion),
            ("fold-double-gate", FoldDoubleGate),
            ("fold-gate", FoldGate),
            ("fold-half", FoldHalf),
            ("fold-half-z", FoldHalfZ),
            ("fold-left-gate", FoldLeftGate),
            ("fold-letter", FoldLetter),
            ("fold-parallel", FoldParallel),
            ("fold-poster", FoldPoster),
            ("fold-right-gate", FoldRightGate),
            ("fold-z", FoldZ),
        ]);

        let generic = HashMap::from([
            (StapleTopLeft, Staple),
            (StapleBottomLeft, Staple),
            (StapleTopRight, Staple),
            (StapleBottomRight, Staple),
            (StapleDualLeft, Staple),
            (StapleDualTop, Staple),
            (StapleDualRight, Staple),
            (StapleDualBottom, Staple),
            (EdgeStitchLeft, EdgeStitch),
            (EdgeStitchTop, EdgeStitch),
            (EdgeStitchRight, EdgeStitch),
            (EdgeStitchBottom, EdgeStitch),
            (PunchTopLeft, Punch),
            (PunchBottomLeft, Punch),
            (PunchTopRight, Punch),
            (PunchBottomRight, Punch),
            (PunchDualLeft, Punch),
            (PunchDualTop, Punch),
            (PunchDualRight, Punch),
            (PunchDualBottom, Punch),
            (FoldAccordion, Fold),
            (FoldDoubleGate, Fold),
            (FoldGate, Fold),
            (FoldHalf, Fold),
            (FoldHalfZ, Fold),
            (FoldLeftGate, Fold),
            (FoldLetter, Fold),
            (FoldParallel, Fold),
            (FoldPoster, Fold),
            (FoldRightGate, Fold),
            (FoldZ, Fold),
        ]);

        Self {
            by_keyword,
            generic,
        }
    }
}

impl FinishingsCatalog {
    /// Enum value for a ticket keyword, if the keyword is known.
    pub fn from_keyword(&self, keyword: &str) -> Option<Finishing> {
        self.by_keyword.get(keyword).copied()
    }

    /// The generic (unpositioned) fallback for a finishing, if one exists.
    pub fn generic_fallback(&self, finishing: Finishing) -> Option<Finishing> {
        self.generic.get(&finishing).copied()
    }
}

/// Rotate a positioned staple 90 degrees counter-clockwise for landscape
/// documents.  Finishings without a position are unaffected.
pub fn remap_for_landscape(finishing: Finishing) -> Finishing {
    match finishing {
        Finishing::StapleTopLeft => Finishing::StapleBottomLeft,
        Finishing::StapleBottomLeft => Finishing::StapleBottomRight,
        Finishing::StapleTopRight => Finishing::StapleTopLeft,
        Finishing::StapleBottomRight => Finishing::StapleTopRight,
        other => other,
    }
}
