//! # cfgcheck-engine — Validation Runs & Reports
//!
//! Ties the passes together. A [`ValidationRun`] is a pure function of
//! (document, [`ValidationOptions`], filesystem state): the options carry
//! every optional pass as a capability flag, and the resulting [`Report`]
//! is ordered deterministically.
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | no errors or warnings |
//! | 1 | at least one error |
//! | 2 | warnings but no errors |
//! | 64 | usage error: bad flags or unreadable configuration |
//!
//! ## Crate Policy
//!
//! - Passes never see each other's findings; only the run aggregates.
//! - The only `Err` a run returns is [`EngineError`].

pub mod error;
pub mod options;
pub mod report;
pub mod run;

pub use error::EngineError;
pub use options::ValidationOptions;
pub use report::{Report, Stats, Status, EXIT_ERRORS, EXIT_USAGE, EXIT_VALID, EXIT_WARNINGS};
pub use run::ValidationRun;
