#![forbid(unsafe_code)]

//! Artifact Sweeper (asw): filesystem hygiene engine for transient editor and
//! tool artifacts.
//!
//! One run:
//! 1. **Discovery**: an external `find` enumeration and a native parallel
//!    walker, merged through a canonical-path dedup step
//! 2. **Validation**: size, age and name-drift policy per candidate
//! 3. **Backup and delete**: SHA-256 verified backups, then bulkhead-batched
//!    deletion (or a dry-run simulation)
//! 4. **Analysis**: pattern classification, 0–100 risk scoring and cross-run
//!    trends from an injected collector
//! 5. **Final validation**: a fresh re-scan must find nothing left
//!
//! Every event lands in an append-only JSONL audit trail.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use artifact_sweeper::prelude::*;
//!
//! let config = SweepConfig::load(None)?.with_overrides(&ConfigOverrides {
//!     dry_run: Some(true),
//!     ..ConfigOverrides::default()
//! })?;
//! let outcome = SweepEngine::new(config).run();
//! println!("{}", outcome.report());
//! # Ok::<(), artifact_sweeper::core::errors::SweepError>(())
//! ```

pub mod prelude;

pub mod backup;
pub mod core;
pub mod engine;
pub mod logger;
pub mod scanner;
pub mod trends;
