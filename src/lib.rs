//! Wallboard: scheduled content publication for the intranet portal.
//!
//! Portal cards can carry time-windowed schedule entries (a start/end window
//! bound to an image). This crate hosts the background service that makes
//! those schedules real: it activates the right image when a window opens,
//! prunes entries whose window has closed, catches up on transitions missed
//! while the service was down, and pushes change events to connected
//! clients.
//!
//! # Architecture
//!
//! Two independent timer loops over shared collaborators:
//! - **Store**: SQLite persistence for cards, tasks, categories and contacts
//! - **Engine**: per-cycle schedule evaluation and image application
//! - **Cache**: rendered-page invalidation after card mutations
//! - **Notifier**: broadcast change events consumed by the web push layer
//! - **Exporter**: periodic flat-text snapshot of the whole dataset

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod notify;
pub mod runner;
pub mod store;

pub use cache::PageCache;
pub use config::PortalConfig;
pub use engine::{ApplyWindow, CycleReport, ScheduleEngine};
pub use error::{PortalError, Result};
pub use export::SnapshotExporter;
pub use notify::{ChangeEvent, ChangeNotifier};
pub use runner::SchedulerHandle;
pub use store::{PortalStore, SqliteStore};
