//! External collaborators (spec §6): tokenization, the HSM/key service,
//! fraud scoring, 3-D Secure, the PSP, the raw event bus transport, and
//! the cache. Each is a trait boundary plus one in-memory reference
//! implementation — the wire formats, ML models, and HSM internals
//! themselves are explicitly out of scope (spec §1 Non-goals).

pub mod acquirer;
pub mod bus;
pub mod cache;
pub mod fraud;
pub mod hsm;
pub mod psp;
pub mod three_ds;
pub mod tokenization;
pub mod webhook_transport;
