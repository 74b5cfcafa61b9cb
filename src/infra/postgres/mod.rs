pub mod audit_repo;
pub mod circuit_repo;
pub mod dispute_repo;
pub mod idempotency_repo;
pub mod job_repo;
pub mod payment_repo;
pub mod refund_repo;
pub mod settlement_repo;
