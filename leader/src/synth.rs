//! synth.rs — lowering planned paths to ordered command streams.
//!
//! Two lowerings share one command vocabulary:
//!
//! - `route_commands` takes a single-train BFS route (edge list) and emits
//!   one pursuit per hop using the hop's arrival pattern, preceded by the
//!   switch settings it needs. It starts with the set-everything-straight
//!   safety preamble.
//! - `plan_commands` takes a multi-train A* state sequence and emits, per
//!   train, an approach pursuit on segment entry and an arrival pursuit on
//!   reaching a city, with switch deltas computed against the evolving
//!   switch map. The per-train streams are then merged on path-step order.
//!
//! Reversals never cross the wire: a `Reverse` flips the tracked facing, and
//! the following movement carries the opposite opcode. Whenever the
//! dispatched direction is BACKWARD the pattern is sent reversed, because
//! that is the order the sensor will see it in.

use std::collections::{BTreeMap, VecDeque};

use rail_types::ids::pattern_string;
use rail_types::{City, Color, Direction, Layout, SwitchId, SwitchPosition, TrainId};

use crate::planner::Goals;
use crate::state::{TrackState, TrainLocation};

// ── Command vocabulary ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedCommand {
    Switch {
        switch: SwitchId,
        position: SwitchPosition,
    },
    Move {
        train: TrainId,
        direction: Direction,
        pattern: Vec<Color>,
    },
    /// Leader-side orientation flip; no frame is emitted for it.
    Reverse { train: TrainId },
}

impl PlannedCommand {
    pub fn describe(&self) -> String {
        match self {
            Self::Switch { switch, position } => format!("Set {switch} to {position}"),
            Self::Move {
                train,
                direction,
                pattern,
            } => format!(
                "{train}: Move {} until pattern {}",
                direction.name().to_lowercase(),
                pattern_string(pattern)
            ),
            Self::Reverse { train } => format!("{train}: Reverse orientation"),
        }
    }
}

/// The pattern as the sensor will read it for the given travel direction.
fn oriented(pattern: &[Color], direction: Direction) -> Vec<Color> {
    match direction {
        Direction::Forward => pattern.to_vec(),
        Direction::Backward => pattern.iter().rev().copied().collect(),
    }
}

// ── Single-train lowering (BFS route) ─────────────────────────────────────────

pub fn route_commands(
    layout: &Layout,
    train: TrainId,
    path: &[(City, City)],
    initial_facing: Direction,
) -> Vec<PlannedCommand> {
    let mut commands = Vec::new();

    // Safety preamble: a known switch baseline before the run starts.
    for switch in layout.all_switches() {
        commands.push(PlannedCommand::Switch {
            switch,
            position: SwitchPosition::Straight,
        });
    }

    let mut facing = initial_facing;
    for (i, &(src, dst)) in path.iter().enumerate() {
        let Some(seg) = layout.segment(src, dst) else {
            continue;
        };

        for &(switch, position) in &seg.switches {
            commands.push(PlannedCommand::Switch { switch, position });
        }

        let must_reverse = i > 0
            && layout
                .segment(path[i - 1].0, path[i - 1].1)
                .is_some_and(|prev| prev.requires_reversal_toward(dst));
        if must_reverse {
            commands.push(PlannedCommand::Reverse { train });
            facing = facing.flip();
        }

        commands.push(PlannedCommand::Move {
            train,
            direction: facing,
            pattern: oriented(&seg.at_city, facing),
        });
    }

    commands
}

// ── Multi-train lowering (A* path) ────────────────────────────────────────────

/// One train's commands, each tagged with its path-step index. The step
/// advances on every segment-entry movement and drives the merge order.
pub fn train_commands(
    layout: &Layout,
    path: &[TrackState],
    train: TrainId,
) -> Vec<(usize, PlannedCommand)> {
    let mut commands = Vec::new();
    let Some(first) = path.first().and_then(|s| s.pose(train)) else {
        return commands;
    };
    let mut orientation = first.orientation;
    let mut step = 0usize;

    for i in 0..path.len().saturating_sub(1) {
        let (Some(curr), Some(next)) = (path[i].pose(train), path[i + 1].pose(train)) else {
            continue;
        };
        if curr.location == next.location {
            continue;
        }

        match next.location {
            TrainLocation::OnSegment(src, dst) => {
                let Some(seg) = layout.segment(src, dst) else {
                    continue;
                };
                // Switch deltas against the state we depart from.
                for &(switch, position) in &seg.switches {
                    if path[i].switches.get(&switch) != Some(&position) {
                        commands.push((step, PlannedCommand::Switch { switch, position }));
                    }
                }
                commands.push((
                    step,
                    PlannedCommand::Move {
                        train,
                        direction: orientation,
                        pattern: oriented(&seg.approach, orientation),
                    },
                ));
                step += 1;
            }
            TrainLocation::AtCity(city) => {
                let TrainLocation::OnSegment(a, b) = curr.location else {
                    continue;
                };
                let Some(arrival_seg) = layout.segment(a, b) else {
                    continue;
                };
                commands.push((
                    step,
                    PlannedCommand::Move {
                        train,
                        direction: orientation,
                        pattern: oriented(&arrival_seg.at_city, orientation),
                    },
                ));

                // Look ahead for this train's next segment to decide whether
                // departure needs the opposite facing.
                for scan in &path[i + 2..] {
                    let Some(TrainLocation::OnSegment(ns, nd)) =
                        scan.pose(train).map(|p| p.location)
                    else {
                        continue;
                    };
                    let next_dest = if ns == city { nd } else { ns };
                    let needs_reversal = arrival_seg.requires_reversal_toward(next_dest);
                    if needs_reversal != (orientation == Direction::Backward) {
                        commands.push((step, PlannedCommand::Reverse { train }));
                        orientation = if needs_reversal {
                            Direction::Backward
                        } else {
                            Direction::Forward
                        };
                    }
                    break;
                }
            }
        }
    }

    commands
}

/// Merge per-train streams into one totally ordered sequence: always take
/// the train whose next command has the lowest path step, ties broken by
/// train order. Relative order within a train is preserved.
pub fn merge_commands(
    per_train: BTreeMap<TrainId, Vec<(usize, PlannedCommand)>>,
) -> Vec<PlannedCommand> {
    let mut queues: BTreeMap<TrainId, VecDeque<(usize, PlannedCommand)>> = per_train
        .into_iter()
        .map(|(train, cmds)| (train, cmds.into()))
        .collect();

    let mut merged = Vec::new();
    loop {
        let mut best: Option<(TrainId, usize)> = None;
        for (train, queue) in &queues {
            if let Some(&(step, _)) = queue.front() {
                if best.map_or(true, |(_, best_step)| step < best_step) {
                    best = Some((*train, step));
                }
            }
        }
        let Some((train, _)) = best else {
            break;
        };
        if let Some(queue) = queues.get_mut(&train) {
            if let Some((_, command)) = queue.pop_front() {
                merged.push(command);
            }
        }
    }
    merged
}

/// Full multi-train lowering: per-train command synthesis plus merge.
pub fn plan_commands(layout: &Layout, path: &[TrackState], goals: &Goals) -> Vec<PlannedCommand> {
    let per_train: BTreeMap<TrainId, Vec<(usize, PlannedCommand)>> = goals
        .keys()
        .map(|&train| (train, train_commands(layout, path, train)))
        .filter(|(_, cmds)| !cmds.is_empty())
        .collect();
    merge_commands(per_train)
}
