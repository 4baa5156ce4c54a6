//! Notification engine: reconciles fetched streams against posted messages.

pub mod chat;
pub mod config;
pub mod reconcile;
pub mod render;
pub mod schedule;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod watcher;

pub use chat::{ChatClient, ChatError, DryRunChat, HistoryMessage};
pub use config::WatchConfig;
pub use reconcile::{reconcile, ReconciliationPlan};
pub use scheduler::Scheduler;
pub use source::StreamSource;
pub use store::NotificationStore;
pub use watcher::{LiveWatcher, UpcomingWatcher, WatchCycle};

pub const CRATE_NAME: &str = "vtwatch-notify";
