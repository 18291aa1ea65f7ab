//! # Campus Ledger Runtime
//!
//! Runtime implementation of the campus event ledger.
//!
//! ## Core Components
//!
//! - **`EventLedger`**: the service every caller goes through; applies the
//!   identity gate, stamps times and delegates atomic writes to the store
//! - **`InMemoryLedgerStore`**: process-local store with one mutex per event
//! - **Retry**: exponential backoff for reads against a flaky store
//! - **Metrics**: Prometheus counters and histograms for ledger operations
//!
//! ## Example
//!
//! ```
//! use campus_ledger_core::environment::SystemClock;
//! use campus_ledger_core::{EventType, Principal};
//! use campus_ledger_runtime::{EventDraft, EventLedger, InMemoryLedgerStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> campus_ledger_core::Result<()> {
//! let ledger = EventLedger::new(Arc::new(InMemoryLedgerStore::new()), Arc::new(SystemClock));
//! let admin = Principal::admin();
//!
//! let college = ledger.create_college(&admin, "Main Campus").await?;
//! let student = ledger.create_student(&admin, "Asha", college.id).await?;
//! let event = ledger
//!     .create_event(&admin, EventDraft {
//!         title: "Rust Workshop".into(),
//!         event_type: EventType::Workshop,
//!         capacity: None,
//!         college_id: Some(college.id),
//!     })
//!     .await?;
//!
//! ledger.register(&Principal::student(student.id), event.id, None).await?;
//! # Ok(())
//! # }
//! ```

/// The ledger service
pub mod ledger;

/// In-memory store with per-event locking
pub mod memory;

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

pub use ledger::{EventDraft, EventLedger};
pub use memory::InMemoryLedgerStore;
pub use retry::RetryPolicy;
