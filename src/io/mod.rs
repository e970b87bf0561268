//! Output handling for the CLI: formats, JSON envelopes and exit codes.

pub mod exit_code;
pub mod format;

pub use exit_code::ExitCode;
pub use format::{JsonResponse, OutputFormat, ResponseMeta};
