//! ContentCheck web shell
//!
//! The interaction layer over the classification pipeline: the
//! [`shell::on_submit`] handler, the axum server hosting the form and JSON
//! API, and the command-line interface.

pub mod cli;
pub mod server;
pub mod shell;
pub mod state;

pub use cli::{Cli, Commands};
pub use server::{build_app, run_server};
pub use shell::{on_submit, SubmissionOutcome, EMPTY_INPUT_WARNING};
pub use state::AppState;
