//! Resume capability for album downloads
//!
//! Completed filenames are persisted per album with atomic whole-file
//! rewrites and advisory file locking.

pub mod ledger;

pub use ledger::{ProgressLedger, ResumeError, LEDGER_FILENAME, MAX_LEDGER_FILE_SIZE};
