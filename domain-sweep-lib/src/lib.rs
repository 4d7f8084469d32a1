//! # Domain Sweep Library
//!
//! Bulk availability checks of short names under registrar-operated
//! suffixes, with a bounded number of lookups in flight and a crash-safe
//! result store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_sweep_lib::{CsvStore, RegistrarClient, Scheduler, SweepConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SweepConfig::default().with_concurrency(5);
//!     let tasks = domain_sweep_lib::tasks_for_config(&config)?;
//!
//!     let checker = Arc::new(RegistrarClient::new()?);
//!     let store = Box::new(CsvStore::new(&config.store_path));
//!     let scheduler = Scheduler::with_config(checker, store, &config)?;
//!
//!     let summary = scheduler.run(tasks).await?;
//!     println!("{} available", summary.available);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Semaphore admission**: never more than the budget of lookups in flight
//! - **Task isolation**: failures and panics become failed records
//! - **Durable results**: every completion rewrites the store atomically
//! - **Routing**: suffixes resolved to registrar endpoints by prefix

pub use checker::Checker;
pub use config::{load_env_config, ConfigManager, EnvConfig, FileConfig};
pub use error::SweepError;
pub use protocols::{classify_response, RegistrarClient, RouteTable};
pub use scheduler::{ProgressFn, Scheduler};
pub use store::{CsvStore, DurableStore, Ledger, MemoryStore, RecordMap};
pub use types::{Outcome, Progress, Record, RunSummary, Status, SweepConfig, Task};

pub mod config;
pub mod generate;
pub mod protocols;
pub mod store;

pub use generate::{build_tasks, candidate_names, load_word_list, tasks_for_config};

mod checker;
mod error;
mod scheduler;
mod types;

pub type Result<T> = std::result::Result<T, SweepError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Built-in defaults, as exposed to frontends.
pub mod defaults {
    pub use crate::types::{DEFAULT_STORE_PATH, DEFAULT_SUFFIXES, DEFAULT_WORDS_PATH};
}
