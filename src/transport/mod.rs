//! Merchant-facing transport (spec §6). The wire protocol itself —
//! REST controllers, specific framework choice — is an external
//! concern (spec §1 Non-goals); this module is the one concrete
//! binding, grounded in the teacher's axum/`AppState` style.

pub mod http;
