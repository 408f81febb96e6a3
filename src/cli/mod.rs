//! CLI arguments, prompts and the interactive session

pub mod args;
pub mod error;
pub mod prompt;
pub mod session;
pub mod validate;

pub use args::Cli;
pub use error::CliError;
pub use prompt::Prompter;
pub use session::{Session, SessionConfig, TROUBLESHOOTING_HINTS};
pub use validate::verify_ledger;
