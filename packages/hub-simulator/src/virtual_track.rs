//! virtual_track.rs — the simulated physical layer.
//!
//! A train's world is a strip of colored marks laid out from the track
//! graph: gray gap, the approach colors of a hop, gray gap, its arrival
//! colors, and so on along a configured journey. The virtual motor advances
//! a head position along the strip; the virtual sensor reads the mark under
//! the head with Gaussian distance noise and an occasional misread — the
//! noise the hub's consolidation is there to absorb.
//!
//! Switch motors have no strip; a switch throw is pure timing, so the
//! virtual switch motor just counts drives.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::time::Instant;

use rail_types::{City, Color, Layout};

use crate::switch_hub::SwitchMotor;
use crate::train_hub::{ColorSensor, SensorReading, TrainMotor};

/// Length of one painted mark. At 40% power the head crosses a mark in
/// ~0.4 s, comfortably above the hub's two-reads-per-color threshold.
pub const MARK_LENGTH_CM: f64 = 8.0;
pub const GAP_MARKS: usize = 3;
/// Head speed at 100% motor power.
pub const FULL_SPEED_CM_PER_S: f64 = 50.0;

// ── Noise model ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NoiseModel {
    pub distance_mean: f64,
    pub distance_sd: f64,
    /// Probability a read reports a random wrong color.
    pub misread_prob: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            distance_mean: 8.0,
            distance_sd: 3.0,
            misread_prob: 0.02,
        }
    }
}

// ── Tape state shared by motor and sensor ─────────────────────────────────────

struct TapeState {
    marks: Vec<Color>,
    position_cm: f64,
    power: i8,
    last_tick: Instant,
}

impl TapeState {
    /// Integrate motion since the last observation. Negative power runs the
    /// head backward; the strip ends are hard stops.
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        let speed = FULL_SPEED_CM_PER_S * (self.power as f64 / 100.0);
        let length = self.marks.len() as f64 * MARK_LENGTH_CM;
        self.position_cm = (self.position_cm + speed * dt).clamp(0.0, length - 0.01);
    }

    fn mark_under_head(&self) -> Color {
        let idx = (self.position_cm / MARK_LENGTH_CM) as usize;
        self.marks.get(idx).copied().unwrap_or(Color::None)
    }
}

pub struct TrainWorld {
    inner: Arc<Mutex<TapeState>>,
    noise: NoiseModel,
}

impl TrainWorld {
    pub fn new(marks: Vec<Color>, noise: NoiseModel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TapeState {
                marks,
                position_cm: 0.0,
                power: 0,
                last_tick: Instant::now(),
            })),
            noise,
        }
    }

    pub fn motor(&self) -> VirtualTrainMotor {
        VirtualTrainMotor {
            inner: self.inner.clone(),
        }
    }

    pub fn sensor(&self) -> VirtualColorSensor {
        VirtualColorSensor {
            inner: self.inner.clone(),
            noise: self.noise.clone(),
        }
    }
}

// ── Virtual devices ───────────────────────────────────────────────────────────

pub struct VirtualTrainMotor {
    inner: Arc<Mutex<TapeState>>,
}

impl TrainMotor for VirtualTrainMotor {
    fn dc(&mut self, power: i8) {
        let mut state = self.inner.lock().expect("tape lock poisoned");
        state.advance();
        state.power = power;
    }

    fn brake(&mut self) {
        let mut state = self.inner.lock().expect("tape lock poisoned");
        state.advance();
        state.power = 0;
    }
}

pub struct VirtualColorSensor {
    inner: Arc<Mutex<TapeState>>,
    noise: NoiseModel,
}

impl ColorSensor for VirtualColorSensor {
    fn read(&mut self) -> SensorReading {
        let color = {
            let mut state = self.inner.lock().expect("tape lock poisoned");
            state.advance();
            state.mark_under_head()
        };

        let mut rng = rand::thread_rng();
        let distance = Normal::new(self.noise.distance_mean, self.noise.distance_sd)
            .map(|d| d.sample(&mut rng))
            .unwrap_or(self.noise.distance_mean)
            .max(0.0) as u32;

        let color = if rng.gen::<f64>() < self.noise.misread_prob {
            // A confused sensor most often reports the track bed.
            Color::Gray
        } else {
            color
        };

        SensorReading { color, distance }
    }
}

pub struct VirtualSwitchMotor {
    drives: Arc<AtomicU32>,
}

impl VirtualSwitchMotor {
    pub fn new(drives: Arc<AtomicU32>) -> Self {
        Self { drives }
    }
}

impl SwitchMotor for VirtualSwitchMotor {
    fn dc(&mut self, _power: i8) {
        self.drives.fetch_add(1, Ordering::Relaxed);
    }

    fn brake(&mut self) {}
}

// ── Tape construction ─────────────────────────────────────────────────────────

/// Lay the strip for one train's journey: for each hop, a gap, the approach
/// colors, a gap, then the arrival colors.
pub fn build_tape(layout: &Layout, journey: &[(City, City)]) -> Vec<Color> {
    let mut marks = vec![Color::Gray; GAP_MARKS];
    for &(src, dst) in journey {
        let Some(seg) = layout.segment(src, dst) else {
            continue;
        };
        marks.extend(seg.approach.iter().copied());
        marks.extend(std::iter::repeat(Color::Gray).take(GAP_MARKS));
        marks.extend(seg.at_city.iter().copied());
        marks.extend(std::iter::repeat(Color::Gray).take(GAP_MARKS));
    }
    marks
}
