//! Reusable orchestration subsystems (spec §4.3–§4.7): idempotency
//! store, retry engine, circuit breaker, PSP router, saga coordinator,
//! event bus adapter. These sit between `domain` (pure decision logic)
//! and `services` (the orchestrators that wire them together against
//! Postgres and the collaborators).

pub mod circuit_breaker;
pub mod event_bus;
pub mod idempotency;
pub mod psp_router;
pub mod retry;
pub mod saga;
