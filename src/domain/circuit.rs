use serde::{Deserialize, Serialize};

/// Per-PSP circuit state (spec §3 `CircuitState`, §4.5). Held in a shared
/// store (`infra::postgres::circuit_repo`) so multiple orchestrator
/// instances observe the same state; transitions use compare-and-swap so
/// a lost update never silently reopens a tripped circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitState {
    pub phase: CircuitPhase,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub half_open_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            phase: CircuitPhase::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            half_open_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub cooldown: chrono::Duration,
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: chrono::Duration::seconds(30),
            success_threshold: 3,
        }
    }
}

impl CircuitState {
    /// Whether a call against this target may proceed right now. Callers
    /// must invoke `maybe_transition_half_open` first on every attempt so
    /// an elapsed cooldown is observed before this check runs.
    pub fn allows_call(&self) -> bool {
        matches!(self.phase, CircuitPhase::Closed | CircuitPhase::HalfOpen)
    }

    /// Advances `Open` to `HalfOpen` once the cooldown has elapsed. Call
    /// this before `allows_call` on every attempt.
    pub fn maybe_transition_half_open(&mut self, now: chrono::DateTime<chrono::Utc>, cfg: &CircuitConfig) {
        if self.phase == CircuitPhase::Open {
            if let Some(at) = self.half_open_at {
                if now >= at {
                    self.phase = CircuitPhase::HalfOpen;
                    self.consecutive_successes = 0;
                }
            }
        }
        let _ = cfg;
    }

    pub fn record_success(&mut self, cfg: &CircuitConfig) {
        match self.phase {
            CircuitPhase::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitPhase::HalfOpen => {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= cfg.success_threshold {
                    self.phase = CircuitPhase::Closed;
                    self.consecutive_failures = 0;
                    self.consecutive_successes = 0;
                    self.half_open_at = None;
                }
            }
            CircuitPhase::Open => {}
        }
    }

    pub fn record_failure(&mut self, now: chrono::DateTime<chrono::Utc>, cfg: &CircuitConfig) {
        match self.phase {
            CircuitPhase::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= cfg.failure_threshold {
                    self.phase = CircuitPhase::Open;
                    self.half_open_at = Some(now + cfg.cooldown);
                }
            }
            CircuitPhase::HalfOpen => {
                self.phase = CircuitPhase::Open;
                self.consecutive_successes = 0;
                self.half_open_at = Some(now + cfg.cooldown);
            }
            CircuitPhase::Open => {}
        }
    }
}
