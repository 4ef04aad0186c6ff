//! repl.rs — the operator's line-oriented command surface.
//!
//! Device names and colors exist as strings only here; everything below the
//! parse is typed. Planner and executor failures come back to this prompt —
//! no operator mistake takes the process down.

use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use rail_types::ids::pattern_string;
use rail_types::{City, Color, Direction, Layout, SwitchId, SwitchPosition, TrainId};

use crate::coordinator::Coordinator;
use crate::distances::DistanceTable;
use crate::executor::{ExecOutcome, Executor};
use crate::pathfind::find_route;
use crate::planner::{find_paths, Goals, PlanError};
use crate::state::{TrackState, TrainLocation, TrainPose};
use crate::synth::{plan_commands, route_commands, PlannedCommand};

pub type InputLines = Lines<BufReader<Stdin>>;

pub struct Repl {
    coordinator: Coordinator,
    layout: Layout,
    distances: DistanceTable,
    assume_yes: bool,
    node_budget: usize,
}

impl Repl {
    pub fn new(
        coordinator: Coordinator,
        layout: Layout,
        distances: DistanceTable,
        assume_yes: bool,
        node_budget: usize,
    ) -> Self {
        Self {
            coordinator,
            layout,
            distances,
            assume_yes,
            node_budget,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        print_menu();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt("Enter command: ");
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim().to_lowercase();
            let parts: Vec<&str> = input.split_whitespace().collect();

            match parts.as_slice() {
                [] => {}
                ["q"] => {
                    println!("Quitting...");
                    break;
                }
                ["st"] | ["status"] => self.show_status().await,
                ["s", switch, position] => self.single_switch(switch, position).await,
                ["t", rest @ ..] => self.single_train(rest).await,
                ["p", train, start, end] => {
                    self.planned_run(train, start, end, Direction::Forward, &mut lines)
                        .await?
                }
                ["p", train, start, end, "b"] => {
                    self.planned_run(train, start, end, Direction::Backward, &mut lines)
                        .await?
                }
                ["m"] => self.multi_train(&mut lines).await?,
                _ => println!("Invalid command"),
            }
        }
        Ok(())
    }

    // ── Direct device commands ────────────────────────────────────────────────

    async fn single_switch(&mut self, switch: &str, position: &str) {
        let Ok(switch) = SwitchId::from_str(switch) else {
            println!("Invalid switch name. Use a letter A-J");
            return;
        };
        let position = match position {
            "0" => SwitchPosition::Straight,
            "1" => SwitchPosition::Diverging,
            _ => {
                println!("Invalid switch position");
                return;
            }
        };
        self.coordinator.send_switch_command(switch, position).await;
    }

    async fn single_train(&mut self, parts: &[&str]) {
        let Some(train) = parts.first().and_then(|s| TrainId::from_str(s).ok()) else {
            println!("Invalid train name. Use: CSX, UP, CN, BNSF, or NS");
            return;
        };
        match parts {
            [_, "s"] => {
                self.coordinator.send_stop_command(train).await;
            }
            [_, dir @ ("f" | "b"), pattern] => {
                let Some(mut pattern) = parse_pattern(pattern) else {
                    println!("Invalid color pattern");
                    println!("Valid colors are: RED, YELLOW, GREEN, BLUE");
                    return;
                };
                let direction = if *dir == "f" {
                    Direction::Forward
                } else {
                    // Backward runs read the strip in the opposite order.
                    pattern.reverse();
                    Direction::Backward
                };
                self.coordinator
                    .send_pursue_command(train, direction, pattern)
                    .await;
            }
            _ => println!("Invalid train command"),
        }
    }

    // ── Status display ────────────────────────────────────────────────────────

    async fn show_status(&mut self) {
        // Give the heartbeats a moment to land before printing.
        for _ in 0..10 {
            self.coordinator.check_status_updates();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        println!("\nSwitch positions:");
        if self.coordinator.switch_states.is_empty() {
            println!("No switches reporting");
        } else {
            let sorted: BTreeMap<_, _> = self.coordinator.switch_states.iter().collect();
            for (switch, position) in sorted {
                println!("{switch}: {position}");
            }
        }

        println!("\nTrain status:");
        if self.coordinator.train_states.is_empty() {
            println!("No trains reporting");
        } else {
            let sorted: BTreeMap<_, _> = self.coordinator.train_states.iter().collect();
            for (train, snap) in sorted {
                let mut status = format!("{train}: {}, sees {}", snap.movement, snap.seeing);
                if !snap.target_pattern.is_empty() {
                    status += &format!(", seeking {}", pattern_string(&snap.target_pattern));
                }
                println!("{status}");
            }
        }
    }

    // ── Single-train planned run ──────────────────────────────────────────────

    async fn planned_run(
        &mut self,
        train: &str,
        start: &str,
        end: &str,
        initial_facing: Direction,
        lines: &mut InputLines,
    ) -> anyhow::Result<()> {
        let (Ok(train), Ok(start), Ok(end)) = (
            TrainId::from_str(train),
            City::from_str(start),
            City::from_str(end),
        ) else {
            println!("Invalid train or city name");
            return Ok(());
        };

        println!("Planning route for {train} from {start} to {end} (initially facing {initial_facing})...");
        let Some(path) = find_route(&self.layout, start, end, initial_facing) else {
            println!("No path found!");
            return Ok(());
        };
        if path.is_empty() {
            println!("{train} is already at {end}");
            return Ok(());
        }

        let route: Vec<String> = std::iter::once(start.to_string())
            .chain(path.iter().map(|(_, dst)| dst.to_string()))
            .collect();
        println!("\nPlanned route: {}", route.join(" -> "));

        let commands = route_commands(&self.layout, train, &path, initial_facing);
        print_schedule(&commands);

        if !self.confirm_execution(lines).await? {
            return Ok(());
        }
        let mut executor = Executor::new(&mut self.coordinator, lines, self.assume_yes);
        match executor.execute(&commands).await? {
            ExecOutcome::Completed => info!("route complete: {train} at {end}"),
            ExecOutcome::Aborted => println!("Route aborted."),
        }
        Ok(())
    }

    // ── Multi-train planned run ───────────────────────────────────────────────

    async fn multi_train(&mut self, lines: &mut InputLines) -> anyhow::Result<()> {
        println!("\nStarting multi-train movement planning");
        println!("For each train, enter current position and goal");
        println!("Positions can be cities or segments, e.g.:");
        println!("  NYC");
        println!("  CALGARY,LA (segment)");
        println!("Enter blank train name when done");

        let mut trains: BTreeMap<TrainId, TrainPose> = BTreeMap::new();
        let mut goals: Goals = BTreeMap::new();

        loop {
            prompt("\nTrain name (CSX/UP/CN/BNSF/NS or blank to finish): ");
            let Some(name) = lines.next_line().await? else {
                break;
            };
            let name = name.trim().to_string();
            if name.is_empty() {
                break;
            }
            let Ok(train) = TrainId::from_str(&name) else {
                println!("Invalid train name. Use: CSX, UP, CN, BNSF, or NS");
                continue;
            };

            prompt("Current position: ");
            let position = lines.next_line().await?.unwrap_or_default();
            let Some(location) = parse_location(&position) else {
                println!("Invalid position");
                continue;
            };

            prompt("Goal city: ");
            let goal = lines.next_line().await?.unwrap_or_default();
            let Ok(goal) = City::from_str(goal.trim()) else {
                println!("Invalid goal city");
                continue;
            };

            trains.insert(
                train,
                TrainPose {
                    location,
                    orientation: Direction::Forward,
                },
            );
            goals.insert(train, goal);
        }

        if goals.is_empty() {
            println!("No trains specified!");
            return Ok(());
        }

        println!("Planning routes for {} trains...", goals.len());
        for (train, goal) in &goals {
            let location = trains
                .get(train)
                .map(|p| p.location.to_string())
                .unwrap_or_else(|| "unknown position".into());
            println!("- {train}: {location} -> {goal}");
        }

        // The planner starts from the switch positions currently reported.
        self.coordinator.check_status_updates();
        let switches: BTreeMap<SwitchId, SwitchPosition> = self
            .coordinator
            .switch_states
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect();
        let initial = TrackState::new(trains, switches);

        let path = match find_paths(
            &self.layout,
            &self.distances,
            initial,
            &goals,
            self.node_budget,
        ) {
            Ok(path) => path,
            Err(PlanError::NoPath) => {
                println!("No valid path found!");
                return Ok(());
            }
            Err(PlanError::BudgetExhausted(n)) => {
                println!("No valid path found (search stopped after {n} states)");
                return Ok(());
            }
        };

        println!("\nGenerating commands...");
        let commands = plan_commands(&self.layout, &path, &goals);
        println!("\nComplete sequence of moves:");
        print_schedule(&commands);

        if !self.confirm_execution(lines).await? {
            return Ok(());
        }
        let mut executor = Executor::new(&mut self.coordinator, lines, self.assume_yes);
        match executor.execute(&commands).await? {
            ExecOutcome::Completed => info!("multi-train schedule complete"),
            ExecOutcome::Aborted => println!("Schedule aborted."),
        }
        Ok(())
    }

    async fn confirm_execution(&mut self, lines: &mut InputLines) -> anyhow::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        prompt("\nExecute route? (y/n): ");
        let answer = lines.next_line().await?.unwrap_or_default();
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn prompt(text: &str) {
    print!("{text}");
    std::io::stdout().flush().ok();
}

fn print_schedule(commands: &[PlannedCommand]) {
    for (i, command) in commands.iter().enumerate() {
        println!("{}. {}", i + 1, command.describe());
    }
}

/// `red-yellow-green` → typed colors; only the four pattern colors pass.
fn parse_pattern(s: &str) -> Option<Vec<Color>> {
    s.split('-')
        .map(|name| {
            Color::from_str(name)
                .ok()
                .filter(|c| c.is_pattern_color())
        })
        .collect()
}

/// A city name, or `city1,city2` for a train sitting on a segment.
fn parse_location(s: &str) -> Option<TrainLocation> {
    let s = s.trim();
    if let Some((a, b)) = s.split_once(',') {
        let src = City::from_str(a.trim()).ok()?;
        let dst = City::from_str(b.trim()).ok()?;
        Some(TrainLocation::OnSegment(src, dst))
    } else {
        City::from_str(s).ok().map(TrainLocation::AtCity)
    }
}

fn print_menu() {
    println!("\nLeader ready!");
    println!("Commands:");
    println!("Multi-train pathfinding:");
    println!("  m - Start multi-train movement");
    println!("Single-train pathfinding:");
    println!("  p csx la nyc   - Plan and run CSX from LA to NYC");
    println!("  p csx la nyc b - Same, starting with the train facing backward");
    println!("Switches:");
    println!("  s a 0 - Set switch A to straight");
    println!("  s a 1 - Set switch A to diverging");
    println!("  (same for switches B-J)");
    println!("Single train commands:");
    println!("  t csx f red-yellow   - Move CSX forward until RED-YELLOW pattern");
    println!("  t csx b yellow-green - Move CSX backward until YELLOW-GREEN pattern");
    println!("  t csx s              - Stop CSX");
    println!("  (same for up, cn, bnsf, ns)");
    println!("Status:");
    println!("  st - Show all device status");
    println!("  q  - Quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_parse_and_reject() {
        assert_eq!(
            parse_pattern("red-yellow"),
            Some(vec![Color::Red, Color::Yellow])
        );
        assert_eq!(parse_pattern("RED-BLUE"), Some(vec![Color::Red, Color::Blue]));
        // GRAY is a real color but not a pattern color.
        assert_eq!(parse_pattern("red-gray"), None);
        assert_eq!(parse_pattern("mauve"), None);
    }

    #[test]
    fn locations_parse_both_forms() {
        assert_eq!(
            parse_location("NYC"),
            Some(TrainLocation::AtCity(City::Nyc))
        );
        assert_eq!(
            parse_location("calgary , la"),
            Some(TrainLocation::OnSegment(City::Calgary, City::LA))
        );
        assert_eq!(parse_location("NOWHERE"), None);
    }
}
