use crate::domain::circuit::{CircuitPhase, CircuitState};
use crate::domain::error::GatewayError;

fn phase_from_str(s: &str) -> CircuitPhase {
    match s {
        "open" => CircuitPhase::Open,
        "half_open" => CircuitPhase::HalfOpen,
        _ => CircuitPhase::Closed,
    }
}

fn phase_as_str(phase: CircuitPhase) -> &'static str {
    match phase {
        CircuitPhase::Closed => "closed",
        CircuitPhase::Open => "open",
        CircuitPhase::HalfOpen => "half_open",
    }
}

struct CircuitRow {
    phase: String,
    consecutive_failures: i32,
    consecutive_successes: i32,
    half_open_at: Option<chrono::DateTime<chrono::Utc>>,
    version: i64,
}

/// Multi-instance circuit state, persisted so every orchestrator
/// instance observes the same breaker (spec §4.5, §5). Updates use a
/// `version` column compare-and-swap rather than `SELECT ... FOR
/// UPDATE`, since the circuit breaker is read far more often than
/// written and optimistic concurrency avoids serializing every
/// authorization attempt behind a row lock.
pub async fn load(pool: &sqlx::PgPool, psp_name: &str) -> Result<(CircuitState, i64), GatewayError> {
    let row = sqlx::query_as!(
        CircuitRow,
        r#"
        INSERT INTO circuit_states (psp_name, phase, consecutive_failures, consecutive_successes, version)
        VALUES ($1, 'closed', 0, 0, 0)
        ON CONFLICT (psp_name) DO UPDATE SET psp_name = EXCLUDED.psp_name
        RETURNING phase, consecutive_failures, consecutive_successes, half_open_at, version
        "#,
        psp_name,
    )
    .fetch_one(pool)
    .await?;

    Ok((
        CircuitState {
            phase: phase_from_str(&row.phase),
            consecutive_failures: row.consecutive_failures as u32,
            consecutive_successes: row.consecutive_successes as u32,
            half_open_at: row.half_open_at,
        },
        row.version,
    ))
}

/// Writes back `state` only if `expected_version` still matches
/// (compare-and-swap). Returns `false` on a lost race, in which case
/// the caller should reload and retry — the same approach the spec
/// requires to guarantee "a lost update never silently reopens a
/// tripped circuit" (spec §4.5).
pub async fn compare_and_swap(
    pool: &sqlx::PgPool,
    psp_name: &str,
    state: &CircuitState,
    expected_version: i64,
) -> Result<bool, GatewayError> {
    let result = sqlx::query!(
        r#"
        UPDATE circuit_states
        SET phase = $1, consecutive_failures = $2, consecutive_successes = $3,
            half_open_at = $4, version = version + 1
        WHERE psp_name = $5 AND version = $6
        "#,
        phase_as_str(state.phase),
        state.consecutive_failures as i32,
        state.consecutive_successes as i32,
        state.half_open_at,
        psp_name,
        expected_version,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
