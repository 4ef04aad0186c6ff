//! planner.rs — multi-train A* over full track states.
//!
//! One search step moves one train either from a city onto an adjacent
//! segment or from its segment into an endpoint city. Moves are generated
//! only when they are safe with respect to every other train, so every state
//! the search can reach satisfies the exclusion invariant by construction.
//!
//! Costs are in track units / 100: entering a segment pays its distance,
//! arriving at a city is free (paid on entry), and each switch that has to
//! change position adds 0.1. The heuristic sums precomputed minimum
//! distances to each goal on the same scale, which keeps it consistent —
//! the search never needs to reopen a visited state.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use thiserror::Error;
use tracing::debug;

use rail_types::{City, Layout, TrainId};

use crate::distances::DistanceTable;
use crate::state::{TrackState, TrainLocation, TrainPose};

/// Expansion cap: on exhaustion the search reports failure instead of
/// wandering the state space forever.
pub const DEFAULT_NODE_BUDGET: usize = 100;

pub type Goals = BTreeMap<TrainId, City>;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("no valid path to the requested goals")]
    NoPath,
    #[error("search budget exhausted after exploring {0} states")]
    BudgetExhausted(usize),
}

// ── Safety predicate ──────────────────────────────────────────────────────────

/// Entering segment (a, b) is safe only if no other train is at either
/// endpoint, on the segment itself, or on any segment incident to an
/// endpoint. `TrainLocation::touches` covers all three cases at once.
fn segment_entry_is_safe(state: &TrackState, train: TrainId, a: City, b: City) -> bool {
    state
        .trains
        .iter()
        .filter(|(id, _)| **id != train)
        .all(|(_, pose)| !pose.location.touches(a) && !pose.location.touches(b))
}

/// Entering city `c` is safe only if no other train is at `c` or on a
/// segment incident to `c`.
fn city_entry_is_safe(state: &TrackState, train: TrainId, c: City) -> bool {
    state
        .trains
        .iter()
        .filter(|(id, _)| **id != train)
        .all(|(_, pose)| !pose.location.touches(c))
}

// ── Successor generation ──────────────────────────────────────────────────────

pub(crate) struct Successor {
    pub state: TrackState,
    pub step_cost: f64,
}

pub(crate) fn successors(layout: &Layout, state: &TrackState, train: TrainId) -> Vec<Successor> {
    let Some(pose) = state.pose(train).copied() else {
        return Vec::new();
    };
    let mut out = Vec::new();

    match pose.location {
        TrainLocation::AtCity(city) => {
            for seg in layout.segments_from(city) {
                if !segment_entry_is_safe(state, train, seg.src, seg.dst) {
                    continue;
                }
                let mut switches = state.switches.clone();
                let mut changes = 0u32;
                for (sw, pos) in &seg.switches {
                    if switches.get(sw) != Some(pos) {
                        changes += 1;
                    }
                    switches.insert(*sw, *pos);
                }
                let mut trains = state.trains.clone();
                trains.insert(
                    train,
                    TrainPose {
                        location: TrainLocation::OnSegment(seg.src, seg.dst),
                        orientation: pose.orientation,
                    },
                );
                out.push(Successor {
                    state: TrackState::new(trains, switches),
                    step_cost: seg.distance as f64 / 100.0 + 0.1 * changes as f64,
                });
            }
        }
        TrainLocation::OnSegment(a, b) => {
            for end in [a, b] {
                if !city_entry_is_safe(state, train, end) {
                    continue;
                }
                let mut trains = state.trains.clone();
                trains.insert(
                    train,
                    TrainPose {
                        location: TrainLocation::AtCity(end),
                        orientation: pose.orientation,
                    },
                );
                out.push(Successor {
                    state: TrackState::new(trains, state.switches.clone()),
                    step_cost: 0.0,
                });
            }
        }
    }

    out
}

// ── Heuristic and goal test ───────────────────────────────────────────────────

fn heuristic(state: &TrackState, goals: &Goals, distances: &DistanceTable) -> f64 {
    goals
        .iter()
        .map(|(train, goal)| {
            let anchor = match state.pose(*train).map(|p| p.location) {
                Some(TrainLocation::AtCity(c)) => c,
                // On a segment, measure from the far endpoint.
                Some(TrainLocation::OnSegment(_, dst)) => dst,
                None => *goal,
            };
            distances.between(anchor, *goal) as f64 / 100.0
        })
        .sum()
}

fn goals_met(state: &TrackState, goals: &Goals) -> bool {
    goals.iter().all(|(train, goal)| {
        state.pose(*train).map(|p| p.location) == Some(TrainLocation::AtCity(*goal))
    })
}

// ── A* search ─────────────────────────────────────────────────────────────────

struct OpenEntry {
    f: f64,
    order: u64,
    g: f64,
    state: TrackState,
    path: Vec<TrackState>,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest f; insertion order breaks
        // ties (FIFO among equal f).
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plan a schedule that brings every goal train to its goal city. The result
/// is the full state sequence from `initial` (inclusive) to the goal state;
/// command synthesis lowers it to wire commands.
pub fn find_paths(
    layout: &Layout,
    distances: &DistanceTable,
    initial: TrackState,
    goals: &Goals,
    budget: usize,
) -> Result<Vec<TrackState>, PlanError> {
    let mut open = BinaryHeap::new();
    let mut visited: HashSet<TrackState> = HashSet::new();
    let mut order = 0u64;

    let h0 = heuristic(&initial, goals, distances);
    visited.insert(initial.clone());
    open.push(OpenEntry {
        f: h0,
        order,
        g: 0.0,
        state: initial,
        path: Vec::new(),
    });

    let mut explored = 0usize;
    while let Some(entry) = open.pop() {
        if explored >= budget {
            return Err(PlanError::BudgetExhausted(explored));
        }
        explored += 1;
        debug!(explored, g = entry.g, "expanding state");

        if goals_met(&entry.state, goals) {
            debug!(explored, "solution found");
            let mut path = entry.path;
            path.push(entry.state);
            return Ok(path);
        }

        for (&train, &goal) in goals {
            if entry.state.pose(train).map(|p| p.location) == Some(TrainLocation::AtCity(goal)) {
                continue;
            }
            for succ in successors(layout, &entry.state, train) {
                debug_assert!(succ.state.exclusion_holds());
                if visited.insert(succ.state.clone()) {
                    let g = entry.g + succ.step_cost;
                    let h = heuristic(&succ.state, goals, distances);
                    order += 1;
                    let mut path = entry.path.clone();
                    path.push(entry.state.clone());
                    open.push(OpenEntry {
                        f: g + h,
                        order,
                        g,
                        state: succ.state,
                        path,
                    });
                }
            }
        }
    }

    Err(PlanError::NoPath)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planning_inputs() -> (Layout, DistanceTable) {
        let layout = Layout::standard();
        let distances = DistanceTable::compute(&layout);
        (layout, distances)
    }

    fn single_train_state(train: TrainId, city: City) -> TrackState {
        TrackState::new(
            [(train, TrainPose::at_city(city))].into_iter().collect(),
            BTreeMap::new(),
        )
    }

    #[test]
    fn single_train_takes_the_short_way() {
        let (layout, distances) = planning_inputs();
        let goals: Goals = [(TrainId::Csx, City::Nyc)].into_iter().collect();
        let path = find_paths(
            &layout,
            &distances,
            single_train_state(TrainId::Csx, City::LA),
            &goals,
            DEFAULT_NODE_BUDGET,
        )
        .unwrap();

        // LA -> (LA,KC) -> KC -> (KC,NYC) -> NYC, never via Calgary.
        let locations: Vec<TrainLocation> = path
            .iter()
            .map(|s| s.pose(TrainId::Csx).unwrap().location)
            .collect();
        assert_eq!(locations.len(), 5);
        assert_eq!(locations[0], TrainLocation::AtCity(City::LA));
        assert_eq!(
            locations[1],
            TrainLocation::OnSegment(City::LA, City::KansasCity)
        );
        assert_eq!(locations[4], TrainLocation::AtCity(City::Nyc));
        assert!(!locations.iter().any(|l| l.touches(City::Calgary)));
    }

    #[test]
    fn entering_a_segment_applies_its_switches() {
        let (layout, distances) = planning_inputs();
        let goals: Goals = [(TrainId::Csx, City::KansasCity)].into_iter().collect();
        let path = find_paths(
            &layout,
            &distances,
            single_train_state(TrainId::Csx, City::LA),
            &goals,
            DEFAULT_NODE_BUDGET,
        )
        .unwrap();

        let on_segment = &path[1];
        use rail_types::{SwitchId, SwitchPosition};
        assert_eq!(
            on_segment.switches.get(&SwitchId::A),
            Some(&SwitchPosition::Straight)
        );
        assert_eq!(
            on_segment.switches.get(&SwitchId::B),
            Some(&SwitchPosition::Straight)
        );
    }

    #[test]
    fn successors_respect_exclusion() {
        let (layout, _) = planning_inputs();
        // UP sits at Kansas City; CSX at LA must not enter any segment
        // touching it.
        let state = TrackState::new(
            [
                (TrainId::Csx, TrainPose::at_city(City::LA)),
                (TrainId::Up, TrainPose::at_city(City::KansasCity)),
            ]
            .into_iter()
            .collect(),
            BTreeMap::new(),
        );
        let succs = successors(&layout, &state, TrainId::Csx);
        assert!(!succs.is_empty());
        for s in &succs {
            assert!(s.state.exclusion_holds());
            let loc = s.state.pose(TrainId::Csx).unwrap().location;
            assert!(!loc.touches(City::KansasCity), "unsafe move onto {loc}");
        }
    }

    #[test]
    fn occupied_segment_blocks_city_entry() {
        let (layout, _) = planning_inputs();
        let state = TrackState::new(
            [
                (
                    TrainId::Csx,
                    TrainPose::on_segment(City::LA, City::KansasCity),
                ),
                (
                    TrainId::Up,
                    TrainPose::on_segment(City::KansasCity, City::Nyc),
                ),
            ]
            .into_iter()
            .collect(),
            BTreeMap::new(),
        );
        // CSX may leave toward LA but not into Kansas City, whose other
        // incident segment is occupied.
        let succs = successors(&layout, &state, TrainId::Csx);
        let cities: Vec<TrainLocation> = succs
            .iter()
            .map(|s| s.state.pose(TrainId::Csx).unwrap().location)
            .collect();
        assert_eq!(cities, vec![TrainLocation::AtCity(City::LA)]);
    }

    #[test]
    fn two_trains_swap_without_conflicts() {
        let (layout, distances) = planning_inputs();
        let initial = TrackState::new(
            [
                (TrainId::Csx, TrainPose::at_city(City::LA)),
                (TrainId::Up, TrainPose::at_city(City::Nyc)),
            ]
            .into_iter()
            .collect(),
            BTreeMap::new(),
        );
        let goals: Goals = [(TrainId::Csx, City::Atlanta), (TrainId::Up, City::LA)]
            .into_iter()
            .collect();

        // Two-train searches legitimately need more expansions than the
        // single-train default.
        let path = find_paths(&layout, &distances, initial, &goals, 5000).unwrap();

        let last = path.last().unwrap();
        assert_eq!(
            last.pose(TrainId::Csx).unwrap().location,
            TrainLocation::AtCity(City::Atlanta)
        );
        assert_eq!(
            last.pose(TrainId::Up).unwrap().location,
            TrainLocation::AtCity(City::LA)
        );

        for state in &path {
            assert!(state.exclusion_holds());
            // Both trains crowding Kansas City's throat at once would risk a
            // head-on; the safety predicate must keep them apart.
            let on_kc_segments = state
                .trains
                .values()
                .filter(|p| {
                    matches!(p.location, TrainLocation::OnSegment(..))
                        && p.location.touches(City::KansasCity)
                })
                .count();
            assert!(on_kc_segments <= 1);
        }
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let (layout, distances) = planning_inputs();
        let goals: Goals = [(TrainId::Csx, City::Nyc)].into_iter().collect();
        let result = find_paths(
            &layout,
            &distances,
            single_train_state(TrainId::Csx, City::LA),
            &goals,
            1,
        );
        assert_eq!(result, Err(PlanError::BudgetExhausted(1)));
    }

    #[test]
    fn already_at_goal_returns_initial_state_only() {
        let (layout, distances) = planning_inputs();
        let goals: Goals = [(TrainId::Csx, City::LA)].into_iter().collect();
        let path = find_paths(
            &layout,
            &distances,
            single_train_state(TrainId::Csx, City::LA),
            &goals,
            DEFAULT_NODE_BUDGET,
        )
        .unwrap();
        assert_eq!(path.len(), 1);
    }
}
