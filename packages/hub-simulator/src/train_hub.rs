//! train_hub.rs — follower hub driving one train.
//!
//! Two states: idle, or pursuing a color pattern in a fixed direction. While
//! pursuing, the hub samples its color sensor, keeps a short ring of
//! plausible readings, and consolidates them into a stable sequence — a
//! color only counts once it has been seen `MIN_REPEATS` times in a row,
//! which is what absorbs sensor noise. When the stable tail equals the
//! target pattern the hub brakes and reports STOPPED with the completed
//! pattern. A heartbeat status goes out every couple of seconds so the
//! leader survives lost frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use rail_types::ids::pattern_string;
use rail_types::{
    Color, Command, DedupLedger, Direction, Freshness, Movement, Status, TrainId, WireValue,
    COMMAND_CHANNEL,
};

use crate::radio::HubRadio;

pub const MOTOR_SPEED: i8 = 40;
pub const CHECK_INTERVAL_MS: u64 = 35;
pub const IDLE_POLL_MS: u64 = 50;
pub const BROADCAST_INTERVAL_MS: u64 = 2000;
/// Readings farther from the surface than this are the gap between cars or
/// a lifted sensor; they carry no pattern information.
pub const SURFACE_DISTANCE_LIMIT: u32 = 15;
pub const MIN_REPEATS: usize = 2;

// ── Device seams ──────────────────────────────────────────────────────────────

pub struct SensorReading {
    pub color: Color,
    pub distance: u32,
}

pub trait TrainMotor: Send {
    fn dc(&mut self, power: i8);
    fn brake(&mut self);
}

pub trait ColorSensor: Send {
    fn read(&mut self) -> SensorReading;
}

// ── Pattern consolidation ─────────────────────────────────────────────────────

/// Collapse a raw reading history into the stable sequence: group
/// consecutive equal colors, keep runs of at least `min_repeats`, and merge
/// adjacent duplicates of the survivors.
pub fn consolidate_colors(history: &[Color], min_repeats: usize) -> Vec<Color> {
    let mut groups: Vec<(Color, usize)> = Vec::new();
    for &color in history {
        match groups.last_mut() {
            Some((current, count)) if *current == color => *count += 1,
            _ => groups.push((color, 1)),
        }
    }

    let mut stable = Vec::new();
    for (color, count) in groups {
        if count >= min_repeats && stable.last() != Some(&color) {
            stable.push(color);
        }
    }
    stable
}

/// The pursuit is done when the stable tail equals the target.
pub fn pattern_complete(stable: &[Color], pattern: &[Color]) -> bool {
    stable.len() >= pattern.len() && stable[stable.len() - pattern.len()..] == *pattern
}

// ── Hub ───────────────────────────────────────────────────────────────────────

struct ActivePursuit {
    direction: Direction,
    pattern: Vec<Color>,
    seen: VecDeque<Color>,
}

pub struct TrainHub {
    train: TrainId,
    motor: Box<dyn TrainMotor>,
    sensor: Box<dyn ColorSensor>,
    radio: Arc<HubRadio>,
    ledger: DedupLedger,
    status_seq: i64,
    pursuit: Option<ActivePursuit>,
    last_broadcast: Instant,
}

impl TrainHub {
    pub fn new(
        train: TrainId,
        motor: Box<dyn TrainMotor>,
        sensor: Box<dyn ColorSensor>,
        radio: Arc<HubRadio>,
    ) -> Self {
        Self {
            train,
            motor,
            sensor,
            radio,
            ledger: DedupLedger::new(),
            status_seq: 0,
            pursuit: None,
            last_broadcast: Instant::now(),
        }
    }

    pub async fn run(mut self, stop: Arc<AtomicBool>) {
        info!("{}: ready, listening for commands", self.train);
        loop {
            if stop.load(Ordering::Relaxed) {
                self.motor.brake();
                info!("{}: stop pressed", self.train);
                break;
            }

            if let Some(data) = self.radio.observe(COMMAND_CHANNEL).await {
                self.handle_command(&data).await;
            }

            if self.pursuit.is_some() {
                self.pursue_tick().await;
                sleep(Duration::from_millis(CHECK_INTERVAL_MS)).await;
            } else {
                sleep(Duration::from_millis(IDLE_POLL_MS)).await;
            }
        }
    }

    pub async fn handle_command(&mut self, data: &[WireValue]) {
        let Some(command) = Command::decode(data) else {
            return;
        };
        match command {
            Command::Switch { .. } => {}
            Command::Stop { seq, train } => {
                if train != self.train || self.ledger.observe(seq) == Freshness::Duplicate {
                    return;
                }
                info!("{}: command #{seq}: STOP", self.train);
                self.motor.brake();
                self.pursuit = None;
                self.broadcast_status(Movement::Stopped, &[]).await;
            }
            Command::Pursue {
                seq,
                train,
                direction,
                pattern,
            } => {
                if train != self.train || self.ledger.observe(seq) == Freshness::Duplicate {
                    return;
                }
                // Preempting an active pursuit: brake before the new drive.
                if self.pursuit.is_some() {
                    self.motor.brake();
                }
                info!(
                    "{}: command #{seq}: moving {} until pattern {}",
                    self.train,
                    direction.name().to_lowercase(),
                    pattern_string(&pattern)
                );
                let power = match direction {
                    Direction::Forward => MOTOR_SPEED,
                    Direction::Backward => -MOTOR_SPEED,
                };
                self.motor.dc(power);
                let capacity = pattern.len() * 4;
                self.pursuit = Some(ActivePursuit {
                    direction,
                    pattern: pattern.clone(),
                    seen: VecDeque::with_capacity(capacity),
                });
                self.broadcast_status(direction.movement(), &pattern).await;
            }
        }
    }

    pub async fn pursue_tick(&mut self) {
        let reading = self.sensor.read();
        let Some(pursuit) = self.pursuit.as_mut() else {
            return;
        };

        let mut completed = false;
        if reading.distance < SURFACE_DISTANCE_LIMIT && reading.color.is_pattern_color() {
            pursuit.seen.push_back(reading.color);
            let capacity = pursuit.pattern.len() * 4;
            while pursuit.seen.len() > capacity {
                pursuit.seen.pop_front();
            }
            let history: Vec<Color> = pursuit.seen.iter().copied().collect();
            let stable = consolidate_colors(&history, MIN_REPEATS);
            debug!("{}: stable sequence {}", self.train, pattern_string(&stable));
            completed = pattern_complete(&stable, &pursuit.pattern);
        }

        let direction = pursuit.direction;
        let pattern = pursuit.pattern.clone();

        if completed {
            info!("{}: found pattern {}!", self.train, pattern_string(&pattern));
            self.motor.brake();
            self.pursuit = None;
            self.broadcast_status(Movement::Stopped, &pattern).await;
        } else if self.last_broadcast.elapsed() >= Duration::from_millis(BROADCAST_INTERVAL_MS) {
            self.broadcast_status(direction.movement(), &pattern).await;
        }
    }

    async fn broadcast_status(&mut self, movement: Movement, pattern: &[Color]) {
        self.status_seq += 1;
        let seeing = self.sensor.read().color;
        let status = Status::Train {
            seq: self.status_seq,
            train: self.train,
            seeing,
            movement,
            pattern: pattern.to_vec(),
        };
        self.radio
            .broadcast(self.train.status_channel(), status.encode())
            .await;
        self.last_broadcast = Instant::now();
    }

    #[cfg(test)]
    fn is_pursuing(&self) -> bool {
        self.pursuit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::RadioConfig;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use Color::{Blue, Gray, Green, Red, Yellow};

    #[test]
    fn consolidation_drops_short_runs() {
        let history = [Red, Red, Yellow, Green, Green, Red, Red, Yellow, Yellow];
        assert_eq!(
            consolidate_colors(&history, 2),
            vec![Red, Green, Red, Yellow]
        );
    }

    #[test]
    fn consolidation_merges_adjacent_survivors() {
        // GREEN interrupts a long RED run too briefly to count, so the two
        // RED runs merge into one entry.
        let history = [Red, Red, Green, Red, Red];
        assert_eq!(consolidate_colors(&history, 2), vec![Red]);
    }

    #[test]
    fn consolidation_properties_hold() {
        let history = [
            Red, Red, Red, Blue, Yellow, Yellow, Green, Green, Green, Blue, Blue, Yellow,
        ];
        let stable = consolidate_colors(&history, 2);
        // No adjacent duplicates.
        for pair in stable.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        // Every survivor had a run of at least MIN_REPEATS in the input.
        for color in &stable {
            let max_run = history
                .split(|c| c != color)
                .map(|run| run.len())
                .max()
                .unwrap_or(0);
            assert!(max_run >= 2, "{color:?} never ran twice");
        }
    }

    #[test]
    fn consolidation_of_nothing_is_nothing() {
        assert_eq!(consolidate_colors(&[], 2), Vec::<Color>::new());
        assert_eq!(consolidate_colors(&[Red, Yellow, Red], 2), Vec::<Color>::new());
    }

    #[test]
    fn pattern_completes_on_stable_tail() {
        // The documented detection example: noisy stream, target RED-YELLOW.
        let history = [Red, Red, Yellow, Green, Green, Red, Red, Yellow, Yellow];
        let stable = consolidate_colors(&history, 2);
        assert!(pattern_complete(&stable, &[Red, Yellow]));
        assert!(!pattern_complete(&stable, &[Yellow, Red]));
        assert!(!pattern_complete(&[Red], &[Red, Yellow]));
    }

    // ── Scripted hardware for state-machine tests ────────────────────────────

    struct ScriptedSensor {
        readings: Mutex<VecDeque<SensorReading>>,
    }

    impl ScriptedSensor {
        fn new(colors: &[(Color, u32)]) -> Self {
            Self {
                readings: Mutex::new(
                    colors
                        .iter()
                        .map(|&(color, distance)| SensorReading { color, distance })
                        .collect(),
                ),
            }
        }
    }

    impl ColorSensor for ScriptedSensor {
        fn read(&mut self) -> SensorReading {
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(SensorReading {
                    color: Color::None,
                    distance: 100,
                })
        }
    }

    struct CountingMotor {
        drives: Arc<AtomicU32>,
        brakes: Arc<AtomicU32>,
    }

    impl TrainMotor for CountingMotor {
        fn dc(&mut self, _power: i8) {
            self.drives.fetch_add(1, Ordering::Relaxed);
        }
        fn brake(&mut self) {
            self.brakes.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn test_radio() -> Arc<HubRadio> {
        HubRadio::bind(RadioConfig {
            bind_port: 0,
            leader_addr: "127.0.0.1:9".into(),
            multicast_addr: None,
            drop_rate: 0.0,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn pursuit_brakes_on_pattern() {
        // Sensor script: status reads interleave with detection reads, so
        // pad generously with the pattern tail.
        let mut script = vec![(Gray, 5); 3];
        script.extend([(Red, 5); 4]);
        script.extend([(Yellow, 5); 4]);
        script.extend([(Yellow, 5); 8]);

        let drives = Arc::new(AtomicU32::new(0));
        let brakes = Arc::new(AtomicU32::new(0));
        let mut hub = TrainHub::new(
            TrainId::Cn,
            Box::new(CountingMotor {
                drives: drives.clone(),
                brakes: brakes.clone(),
            }),
            Box::new(ScriptedSensor::new(&script)),
            test_radio().await,
        );

        hub.handle_command(
            &Command::Pursue {
                seq: 1,
                train: TrainId::Cn,
                direction: Direction::Forward,
                pattern: vec![Red, Yellow],
            }
            .encode(),
        )
        .await;
        assert!(hub.is_pursuing());
        assert_eq!(drives.load(Ordering::Relaxed), 1);

        for _ in 0..script.len() {
            hub.pursue_tick().await;
            if !hub.is_pursuing() {
                break;
            }
        }

        assert!(!hub.is_pursuing(), "pattern never detected");
        assert_eq!(brakes.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn duplicate_pursue_does_not_restart() {
        let drives = Arc::new(AtomicU32::new(0));
        let brakes = Arc::new(AtomicU32::new(0));
        let mut hub = TrainHub::new(
            TrainId::Up,
            Box::new(CountingMotor {
                drives: drives.clone(),
                brakes: brakes.clone(),
            }),
            Box::new(ScriptedSensor::new(&[(Gray, 5); 64])),
            test_radio().await,
        );

        let frame = Command::Pursue {
            seq: 3,
            train: TrainId::Up,
            direction: Direction::Backward,
            pattern: vec![Blue, Green],
        }
        .encode();
        hub.handle_command(&frame).await;
        hub.handle_command(&frame).await;
        assert_eq!(drives.load(Ordering::Relaxed), 1);

        // A fresh pursue preempts: brake, then drive again.
        hub.handle_command(
            &Command::Pursue {
                seq: 4,
                train: TrainId::Up,
                direction: Direction::Forward,
                pattern: vec![Red, Green],
            }
            .encode(),
        )
        .await;
        assert_eq!(brakes.load(Ordering::Relaxed), 1);
        assert_eq!(drives.load(Ordering::Relaxed), 2);

        // STOP lands in idle state.
        hub.handle_command(
            &Command::Stop {
                seq: 5,
                train: TrainId::Up,
            }
            .encode(),
        )
        .await;
        assert!(!hub.is_pursuing());
        assert_eq!(brakes.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn other_trains_commands_are_ignored() {
        let drives = Arc::new(AtomicU32::new(0));
        let brakes = Arc::new(AtomicU32::new(0));
        let mut hub = TrainHub::new(
            TrainId::Csx,
            Box::new(CountingMotor {
                drives: drives.clone(),
                brakes: brakes.clone(),
            }),
            Box::new(ScriptedSensor::new(&[])),
            test_radio().await,
        );

        hub.handle_command(
            &Command::Pursue {
                seq: 1,
                train: TrainId::Ns,
                direction: Direction::Forward,
                pattern: vec![Red],
            }
            .encode(),
        )
        .await;
        assert!(!hub.is_pursuing());
        assert_eq!(drives.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn far_readings_are_discarded() {
        let drives = Arc::new(AtomicU32::new(0));
        let brakes = Arc::new(AtomicU32::new(0));
        // Perfect pattern colors, but all too far from the surface.
        let script = vec![(Red, 40), (Red, 40), (Yellow, 40), (Yellow, 40)];
        let mut hub = TrainHub::new(
            TrainId::Bnsf,
            Box::new(CountingMotor {
                drives: drives.clone(),
                brakes: brakes.clone(),
            }),
            Box::new(ScriptedSensor::new(&script)),
            test_radio().await,
        );

        hub.handle_command(
            &Command::Pursue {
                seq: 1,
                train: TrainId::Bnsf,
                direction: Direction::Forward,
                pattern: vec![Red, Yellow],
            }
            .encode(),
        )
        .await;
        for _ in 0..script.len() {
            hub.pursue_tick().await;
        }
        assert!(hub.is_pursuing(), "far readings must not complete a pattern");
    }
}
