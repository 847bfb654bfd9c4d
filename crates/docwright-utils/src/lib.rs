pub mod atomic_write;
pub mod eol;
pub mod exit_codes;
pub mod logging;
pub mod paths;

pub use atomic_write::write_file_atomic;
pub use eol::{Eol, read_text, render};
pub use paths::{SandboxError, SandboxPath, SandboxRoot};

/// Content hash used to identify a file's pre-image across the pipeline
/// (patch plan provenance, idempotence checks).
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
