//! # Storage
//!
//! Durable per-origin persistence for the client core: a fail-soft typed
//! key-value wrapper over an injectable [`StorageMedium`], and the domain
//! stores built on top of it. Every store owns its own key; cross-store
//! effects go through explicit store functions, never through another
//! module's key.

pub mod birth_draft;
#[cfg(target_arch = "wasm32")]
pub mod browser;
pub mod charts;
pub mod history;
pub mod kv;
pub mod memory;
pub mod prefs;
pub mod traits;

pub use birth_draft::BirthDraftStore;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserMedium;
pub use charts::SavedChartStore;
pub use history::HistoryLog;
pub use kv::Kv;
pub use memory::MemoryMedium;
pub use prefs::PrefsStore;
pub use traits::{NullMedium, StorageMedium};
