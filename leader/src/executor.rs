//! executor.rs — walking a command list against the real layout.
//!
//! One command at a time: broadcast, wait for the confirming status, retry
//! where that is safe. Switch settings are idempotent, so a lost frame is
//! retried automatically; restarting a train movement mid-track is not safe,
//! so a movement timeout goes straight to the operator. `Reverse` never
//! touches the wire — the following movement already carries the flipped
//! opcode from synthesis.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use rail_types::ids::pattern_string;
use rail_types::{Color, Direction, Movement, SwitchId, SwitchPosition, TrainId};

use crate::coordinator::Coordinator;
use crate::repl::InputLines;
use crate::synth::PlannedCommand;

// ── Policy ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExecPolicy {
    pub switch_timeout: Duration,
    pub switch_attempts: u32,
    pub retry_pause: Duration,
    /// Time to let a just-sent frame land before polling for its effect.
    pub send_grace: Duration,
    pub poll_interval: Duration,
    pub train_timeout: Duration,
    pub train_start_grace: Duration,
    /// Extra wait after a reported stop so the train is physically settled.
    pub settle: Duration,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        Self {
            switch_timeout: Duration::from_secs(5),
            switch_attempts: 3,
            retry_pause: Duration::from_secs(1),
            send_grace: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            train_timeout: Duration::from_secs(30),
            train_start_grace: Duration::from_secs(1),
            settle: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    Completed,
    Aborted,
}

// ── Executor ──────────────────────────────────────────────────────────────────

pub struct Executor<'a> {
    pub coordinator: &'a mut Coordinator,
    pub input: &'a mut InputLines,
    /// `--yes`: answer every failure prompt with "continue".
    pub assume_yes: bool,
    pub policy: ExecPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(
        coordinator: &'a mut Coordinator,
        input: &'a mut InputLines,
        assume_yes: bool,
    ) -> Self {
        Self {
            coordinator,
            input,
            assume_yes,
            policy: ExecPolicy::default(),
        }
    }

    pub async fn execute(&mut self, commands: &[PlannedCommand]) -> anyhow::Result<ExecOutcome> {
        for (i, command) in commands.iter().enumerate() {
            println!("\nExecuting command {}/{}", i + 1, commands.len());

            match command {
                PlannedCommand::Switch { switch, position } => {
                    if !self.execute_switch(*switch, *position).await {
                        println!("Failed to set {switch} after all retries!");
                        if !self.confirm("Continue anyway? (y/n): ").await? {
                            return Ok(ExecOutcome::Aborted);
                        }
                    }
                }
                PlannedCommand::Move {
                    train,
                    direction,
                    pattern,
                } => {
                    if !self.execute_move(*train, *direction, pattern).await {
                        println!("Warning: Movement timed out after 30 seconds!");
                        if !self.confirm("Continue anyway? (y/n): ").await? {
                            return Ok(ExecOutcome::Aborted);
                        }
                    }
                }
                PlannedCommand::Reverse { train } => {
                    // Bookkeeping only; the next movement opcode reflects it.
                    info!("{train}: orientation reversed (no frame emitted)");
                }
            }
        }
        Ok(ExecOutcome::Completed)
    }

    // ── Switch commands: confirm, retry ───────────────────────────────────────

    async fn execute_switch(&mut self, switch: SwitchId, position: SwitchPosition) -> bool {
        for attempt in 0..self.policy.switch_attempts {
            if attempt > 0 {
                println!(
                    "Retry attempt {attempt}/{}...",
                    self.policy.switch_attempts - 1
                );
                sleep(self.policy.retry_pause).await;
            }
            self.coordinator
                .send_switch_command(switch, position)
                .await;
            sleep(self.policy.send_grace).await;
            if self.wait_for_switch(switch, position).await {
                return true;
            }
        }
        false
    }

    /// A confirmation is a *fresh* status frame whose snapshot shows the
    /// target position; the pre-send map alone proves nothing.
    async fn wait_for_switch(&mut self, switch: SwitchId, position: SwitchPosition) -> bool {
        println!("Waiting for {switch} to reach {position} position...");
        let before = self.coordinator.processed_statuses();
        let deadline = Instant::now() + self.policy.switch_timeout;

        while Instant::now() < deadline {
            self.coordinator.check_status_updates();
            if self.coordinator.processed_statuses() > before
                && self.coordinator.switch_states.get(&switch) == Some(&position)
            {
                println!("{switch} reached desired position!");
                return true;
            }
            sleep(self.policy.poll_interval).await;
        }

        warn!("timed out waiting for {switch} status update");
        false
    }

    // ── Train movements: no automatic retry ───────────────────────────────────

    async fn execute_move(
        &mut self,
        train: TrainId,
        direction: Direction,
        pattern: &[Color],
    ) -> bool {
        println!("Looking for pattern: {}", pattern_string(pattern));
        self.coordinator
            .send_pursue_command(train, direction, pattern.to_vec())
            .await;

        println!("Waiting for train to complete movement...");
        sleep(self.policy.train_start_grace).await;

        let deadline = Instant::now() + self.policy.train_timeout;
        while Instant::now() < deadline {
            self.coordinator.check_status_updates();
            let stopped = self
                .coordinator
                .train_states
                .get(&train)
                .is_some_and(|snap| snap.movement == Movement::Stopped);
            if stopped {
                println!("Movement completed!");
                sleep(self.policy.settle).await;
                return true;
            }
            sleep(self.policy.poll_interval).await;
        }
        false
    }

    // ── Operator prompt ───────────────────────────────────────────────────────

    async fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        if self.assume_yes {
            info!("auto-continuing (--yes)");
            return Ok(true);
        }
        print!("{prompt}");
        use std::io::Write;
        std::io::stdout().flush().ok();
        let answer = self.input.next_line().await?.unwrap_or_default();
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}
