//! layout.rs — the static track graph.
//!
//! The track is a directed graph keyed by (src, dst); each physical stretch
//! of rail contributes two directed edges with independent switch
//! requirements and color patterns (the marks read in opposite order, and a
//! different ladder of switches guards each entry). Patterns are placed near
//! the destination: `approach` is read while closing in on it, `at_city`
//! on arrival.
//!
//! The leader plans over this graph; the hub simulator lays virtual color
//! tape from it. Hubs on real hardware never see it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{Color, SwitchId, SwitchPosition};

// ── Cities ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum City {
    LA,
    LasVegas,
    Calgary,
    KansasCity,
    Nyc,
    Atlanta,
}

impl City {
    pub const ALL: [City; 6] = [
        Self::LA,
        Self::LasVegas,
        Self::Calgary,
        Self::KansasCity,
        Self::Nyc,
        Self::Atlanta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LA => "LA",
            Self::LasVegas => "LAS_VEGAS",
            Self::Calgary => "CALGARY",
            Self::KansasCity => "KANSAS_CITY",
            Self::Nyc => "NYC",
            Self::Atlanta => "ATLANTA",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for City {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == upper)
            .ok_or(())
    }
}

// ── Segments ──────────────────────────────────────────────────────────────────

/// One directed edge of the track graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub src: City,
    pub dst: City,
    /// Switch positions required before a train may enter this edge.
    pub switches: Vec<(SwitchId, SwitchPosition)>,
    /// Colors read while traversing toward `dst`.
    pub approach: Vec<Color>,
    /// Colors read on arrival at `dst`.
    pub at_city: Vec<Color>,
    pub distance: u32,
    /// Onward destinations that force a reversal after arriving via this
    /// edge: if the next segment out of `dst` leads to one of these, the
    /// train must flip facing before departing.
    pub reverse_for: Vec<City>,
}

impl Segment {
    pub fn requires_reversal_toward(&self, next_dest: City) -> bool {
        self.reverse_for.contains(&next_dest)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("segment {src}->{dst} is missing its {which} pattern")]
    MissingPattern {
        src: City,
        dst: City,
        which: &'static str,
    },
    #[error("segment {src}->{dst} has zero distance")]
    ZeroDistance { src: City, dst: City },
}

// ── Layout ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Layout {
    segments: Vec<Segment>,
}

impl Layout {
    pub fn segment(&self, src: City, dst: City) -> Option<&Segment> {
        self.segments.iter().find(|s| s.src == src && s.dst == dst)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// All directed edges leaving `city`.
    pub fn segments_from(&self, city: City) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.src == city)
    }

    /// Every switch referenced anywhere in the layout, in stable order.
    pub fn all_switches(&self) -> BTreeSet<SwitchId> {
        self.segments
            .iter()
            .flat_map(|s| s.switches.iter().map(|(sw, _)| *sw))
            .collect()
    }

    /// Boot-time check: a segment without both patterns cannot be driven, so
    /// absence is fatal before any planning happens.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for seg in &self.segments {
            if seg.approach.is_empty() {
                return Err(LayoutError::MissingPattern {
                    src: seg.src,
                    dst: seg.dst,
                    which: "approach",
                });
            }
            if seg.at_city.is_empty() {
                return Err(LayoutError::MissingPattern {
                    src: seg.src,
                    dst: seg.dst,
                    which: "at_city",
                });
            }
            if seg.distance == 0 {
                return Err(LayoutError::ZeroDistance {
                    src: seg.src,
                    dst: seg.dst,
                });
            }
        }
        Ok(())
    }

    /// The physical layout: six cities, nine stretches of rail, ten switches.
    pub fn standard() -> Self {
        use City::*;
        use Color::*;
        use SwitchId as Sw;
        use SwitchPosition::{Diverging as Div, Straight as Str};

        let seg = |src,
                   dst,
                   switches: Vec<(Sw, SwitchPosition)>,
                   approach: Vec<Color>,
                   at_city: Vec<Color>,
                   distance,
                   reverse_for: Vec<City>| Segment {
            src,
            dst,
            switches,
            approach,
            at_city,
            distance,
            reverse_for,
        };

        Self {
            segments: vec![
                seg(
                    LA,
                    LasVegas,
                    vec![(Sw::A, Str), (Sw::B, Div)],
                    vec![Red, Yellow, Green],
                    vec![Blue, Red],
                    100,
                    vec![LA],
                ),
                seg(
                    LasVegas,
                    LA,
                    vec![],
                    vec![Green, Yellow, Red],
                    vec![Yellow, Red],
                    100,
                    vec![Calgary, LasVegas, KansasCity],
                ),
                seg(
                    LA,
                    Calgary,
                    vec![(Sw::A, Div)],
                    vec![Red, Blue, Yellow],
                    vec![Yellow, Blue],
                    224,
                    vec![Nyc, KansasCity, LA],
                ),
                seg(
                    Calgary,
                    LA,
                    vec![(Sw::C, Div)],
                    vec![Blue, Yellow, Red],
                    vec![Yellow, Red],
                    224,
                    vec![Calgary, LasVegas, KansasCity],
                ),
                seg(
                    Calgary,
                    KansasCity,
                    vec![(Sw::C, Str), (Sw::D, Str)],
                    vec![Yellow, Green, Blue],
                    vec![Green, Red],
                    212,
                    vec![LasVegas, LA],
                ),
                seg(
                    KansasCity,
                    Calgary,
                    vec![(Sw::F, Div)],
                    vec![Green, Blue, Yellow],
                    vec![Yellow, Blue],
                    212,
                    vec![Nyc, KansasCity, LA],
                ),
                seg(
                    LA,
                    KansasCity,
                    vec![(Sw::A, Str), (Sw::B, Str)],
                    vec![Red, Blue, Green],
                    vec![Green, Red],
                    200,
                    vec![LasVegas, LA],
                ),
                seg(
                    KansasCity,
                    LA,
                    vec![(Sw::F, Str), (Sw::E, Str)],
                    vec![Green, Blue, Red],
                    vec![Yellow, Red],
                    200,
                    vec![Calgary, LasVegas, KansasCity],
                ),
                seg(
                    LasVegas,
                    KansasCity,
                    vec![],
                    vec![Red, Green, Yellow],
                    vec![Green, Red],
                    108,
                    vec![LasVegas, LA],
                ),
                seg(
                    KansasCity,
                    LasVegas,
                    vec![(Sw::F, Str), (Sw::E, Div)],
                    vec![Yellow, Green, Red],
                    vec![Red, Blue],
                    108,
                    vec![LA],
                ),
                seg(
                    Calgary,
                    Nyc,
                    vec![(Sw::C, Str), (Sw::D, Div)],
                    vec![Red, Yellow, Blue, Green],
                    vec![Blue, Green],
                    328,
                    vec![KansasCity, Atlanta, Calgary],
                ),
                seg(
                    Nyc,
                    Calgary,
                    vec![(Sw::H, Str), (Sw::I, Div)],
                    vec![Blue, Green, Yellow, Red],
                    vec![Yellow, Blue],
                    328,
                    vec![Nyc, KansasCity, LA],
                ),
                seg(
                    KansasCity,
                    Nyc,
                    vec![(Sw::G, Str)],
                    vec![Red, Green, Blue],
                    vec![Blue, Green],
                    128,
                    vec![KansasCity, Atlanta, Calgary],
                ),
                seg(
                    Nyc,
                    KansasCity,
                    vec![(Sw::H, Str), (Sw::I, Str)],
                    vec![Blue, Green, Red],
                    vec![Red, Green],
                    128,
                    vec![Nyc, Atlanta],
                ),
                seg(
                    KansasCity,
                    Atlanta,
                    vec![(Sw::G, Div)],
                    vec![Red, Green, Blue, Yellow],
                    vec![Yellow, Green],
                    192,
                    vec![KansasCity, Atlanta],
                ),
                seg(
                    Atlanta,
                    KansasCity,
                    vec![(Sw::J, Div)],
                    vec![Blue, Yellow, Green, Red],
                    vec![Red, Green],
                    192,
                    vec![Nyc, Atlanta],
                ),
                seg(
                    Nyc,
                    Atlanta,
                    vec![(Sw::H, Div)],
                    vec![Red, Blue, Green, Yellow],
                    vec![Yellow, Green],
                    188,
                    vec![KansasCity, Atlanta],
                ),
                seg(
                    Atlanta,
                    Nyc,
                    vec![(Sw::J, Str)],
                    vec![Green, Yellow, Blue, Red],
                    vec![Blue, Green],
                    188,
                    vec![KansasCity, Atlanta, Calgary],
                ),
            ],
        }
    }
}
