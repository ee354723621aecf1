//! Client-side chart persistence and session-synchronization core.
//!
//! Everything a chart-displaying surface needs to stay consistent with
//! persisted state lives here: the durable key-value stores (birth draft,
//! saved charts, activity history, preferences), the typed event bus that
//! propagates mutations between independently-mounted surfaces, the
//! save-with-retry-and-conflict-resolution protocol against the remote
//! chart collection, and the precedence logic that picks the active birth
//! profile on page load.
//!
//! The session provider and the HTTP transport are consumed through
//! traits; browser-backed implementations are compiled for wasm32 targets
//! only, so the whole crate (and its test suite) also builds natively.

pub mod events;
pub mod services;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
