//! HTTP transport adapter: translates `axum` requests/responses into
//! the transport-neutral `Task`/`TaskResult` envelope pair and lets an
//! [`taskwire_core::app::Application`]'s registry do the routing
//! (spec §6).

pub mod adapter;
pub mod router;
pub mod server;

pub use router::build_router;
pub use server::serve;
