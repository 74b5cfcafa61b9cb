use chrono::Utc;

use crate::domain::circuit::{CircuitConfig, CircuitPhase, CircuitState};
use crate::domain::error::GatewayError;
use crate::infra::postgres::circuit_repo;

/// Per-PSP circuit breaker state, persisted in Postgres so every
/// orchestrator instance observes the same breaker (spec §4.5, §5:
/// "state is held in a shared store... updates use compare-and-swap
/// semantics"). Each call loads the current row, applies the pure
/// transition in [`domain::circuit`], and writes it back with
/// `circuit_repo::compare_and_swap`, retrying the whole load-mutate-swap
/// cycle whenever it loses the race to a concurrent writer.
pub struct CircuitRegistry {
    pool: sqlx::PgPool,
    config: CircuitConfig,
}

impl CircuitRegistry {
    pub fn new(pool: sqlx::PgPool, config: CircuitConfig) -> Self {
        Self { pool, config }
    }

    /// Whether a call to `psp_name` is currently allowed. Transitions
    /// Open -> HalfOpen first if the cooldown has elapsed (spec §4.5
    /// "half-open probe after cooldown"); this transition is persisted
    /// so the next caller (on this instance or another) sees it too.
    pub async fn allows_call(&self, psp_name: &str) -> Result<bool, GatewayError> {
        let (state, allows) = self
            .update(psp_name, |state, _cfg| state.allows_call())
            .await?;
        let _ = state;
        Ok(allows)
    }

    pub async fn record_success(&self, psp_name: &str) -> Result<(), GatewayError> {
        self.update(psp_name, |state, cfg| {
            state.record_success(cfg);
        })
        .await
        .map(|_| ())
    }

    pub async fn record_failure(&self, psp_name: &str) -> Result<(), GatewayError> {
        let now = Utc::now();
        self.update(psp_name, move |state, cfg| {
            state.record_failure(now, cfg);
        })
        .await
        .map(|_| ())
    }

    pub async fn phase(&self, psp_name: &str) -> Result<CircuitPhase, GatewayError> {
        let (state, _) = self.update(psp_name, |_state, _cfg| ()).await?;
        Ok(state.phase)
    }

    /// Loads the current row, lets `mutate` observe/advance it, and
    /// writes the result back with a CAS loop: a lost race means another
    /// caller just updated the same PSP, so reload and try again rather
    /// than silently dropping this caller's transition (spec §4.5 "a
    /// lost update never silently reopens a tripped circuit").
    async fn update<T>(
        &self,
        psp_name: &str,
        mutate: impl Fn(&mut CircuitState, &CircuitConfig) -> T,
    ) -> Result<(CircuitState, T), GatewayError> {
        loop {
            let (mut state, version) = circuit_repo::load(&self.pool, psp_name).await?;
            state.maybe_transition_half_open(Utc::now(), &self.config);
            let result = mutate(&mut state, &self.config);
            if circuit_repo::compare_and_swap(&self.pool, psp_name, &state, version).await? {
                return Ok((state, result));
            }
        }
    }
}
