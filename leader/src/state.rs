//! state.rs — value types for the planner's search space.
//!
//! A `TrackState` is one element of the space the multi-train planner
//! explores: where every train is, which way it faces, and how the switches
//! sit. Equality and hashing are structural (BTreeMap keeps the maps in
//! canonical order), so the visited set needs no ad-hoc key building.

use std::collections::BTreeMap;
use std::fmt;

use rail_types::{City, Direction, SwitchId, SwitchPosition, TrainId};

// ── Location ──────────────────────────────────────────────────────────────────

/// A train occupies exactly one of these at any time. `OnSegment` keeps the
/// direction of travel (src, dst) as planned; occupancy checks treat the
/// segment as undirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrainLocation {
    AtCity(City),
    OnSegment(City, City),
}

impl TrainLocation {
    pub fn touches(&self, city: City) -> bool {
        match self {
            Self::AtCity(c) => *c == city,
            Self::OnSegment(a, b) => *a == city || *b == city,
        }
    }

    /// Same physical stretch of rail, regardless of travel direction.
    pub fn same_segment(&self, other: &TrainLocation) -> bool {
        match (self, other) {
            (Self::OnSegment(a, b), Self::OnSegment(c, d)) => {
                (a == c && b == d) || (a == d && b == c)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TrainLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtCity(c) => write!(f, "{c}"),
            Self::OnSegment(a, b) => write!(f, "{a},{b}"),
        }
    }
}

// ── Pose and full state ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrainPose {
    pub location: TrainLocation,
    pub orientation: Direction,
}

impl TrainPose {
    pub fn at_city(city: City) -> Self {
        Self {
            location: TrainLocation::AtCity(city),
            orientation: Direction::Forward,
        }
    }

    pub fn on_segment(src: City, dst: City) -> Self {
        Self {
            location: TrainLocation::OnSegment(src, dst),
            orientation: Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackState {
    pub trains: BTreeMap<TrainId, TrainPose>,
    pub switches: BTreeMap<SwitchId, SwitchPosition>,
}

impl TrackState {
    pub fn new(
        trains: BTreeMap<TrainId, TrainPose>,
        switches: BTreeMap<SwitchId, SwitchPosition>,
    ) -> Self {
        Self { trains, switches }
    }

    pub fn pose(&self, train: TrainId) -> Option<&TrainPose> {
        self.trains.get(&train)
    }

    /// The exclusion invariant every planner-reachable state must satisfy:
    /// no shared city, no shared segment, and no train on a segment incident
    /// to a city occupied by another train.
    pub fn exclusion_holds(&self) -> bool {
        let poses: Vec<&TrainPose> = self.trains.values().collect();
        for (i, a) in poses.iter().enumerate() {
            for b in poses.iter().skip(i + 1) {
                match (a.location, b.location) {
                    (TrainLocation::AtCity(ca), TrainLocation::AtCity(cb)) => {
                        if ca == cb {
                            return false;
                        }
                    }
                    (TrainLocation::AtCity(c), seg @ TrainLocation::OnSegment(..))
                    | (seg @ TrainLocation::OnSegment(..), TrainLocation::AtCity(c)) => {
                        if seg.touches(c) {
                            return false;
                        }
                    }
                    (sa @ TrainLocation::OnSegment(..), sb @ TrainLocation::OnSegment(..)) => {
                        if sa.same_segment(&sb) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(poses: Vec<(TrainId, TrainPose)>) -> TrackState {
        TrackState::new(poses.into_iter().collect(), BTreeMap::new())
    }

    #[test]
    fn shared_city_violates_exclusion() {
        let state = state_of(vec![
            (TrainId::Csx, TrainPose::at_city(City::LA)),
            (TrainId::Up, TrainPose::at_city(City::LA)),
        ]);
        assert!(!state.exclusion_holds());
    }

    #[test]
    fn shared_segment_is_undirected() {
        let state = state_of(vec![
            (TrainId::Csx, TrainPose::on_segment(City::LA, City::KansasCity)),
            (TrainId::Up, TrainPose::on_segment(City::KansasCity, City::LA)),
        ]);
        assert!(!state.exclusion_holds());
    }

    #[test]
    fn segment_incident_to_occupied_city_violates() {
        let state = state_of(vec![
            (TrainId::Csx, TrainPose::on_segment(City::LA, City::KansasCity)),
            (TrainId::Up, TrainPose::at_city(City::KansasCity)),
        ]);
        assert!(!state.exclusion_holds());
    }

    #[test]
    fn disjoint_occupancy_is_fine() {
        let state = state_of(vec![
            (TrainId::Csx, TrainPose::at_city(City::LA)),
            (TrainId::Up, TrainPose::on_segment(City::Nyc, City::Atlanta)),
        ]);
        assert!(state.exclusion_holds());
    }
}
