//! rentbook Sync - Fetch and Write Coordination
//!
//! Keeps month-to-month navigation instant by serving bills from the
//! [`rentbook_storage::BillCache`] first, refreshing them in the background,
//! and committing edits to the cache before the store confirms them.
//!
//! [`BillSession`] is the entry point; the coordinators it wires together are
//! public for callers that need finer control.

pub mod fetch;
pub mod save_state;
pub mod session;
pub mod tasks;
pub mod token;
pub mod view;
pub mod write;

pub use fetch::{CacheDecision, CacheFill, FetchCoordinator, Navigation, ReloadMode};
pub use save_state::{SaveLedger, SaveState};
pub use session::BillSession;
pub use tasks::BackgroundTasks;
pub use token::{RequestGeneration, RequestTicket};
pub use view::{
    ApplyOutcome, NoticeAction, NoticeKind, SnapshotSource, ViewNotice, ViewSnapshot, ViewState,
};
pub use write::{SaveOutcome, WriteCoordinator};
