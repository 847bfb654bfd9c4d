//! Process exit codes shared by the CLI boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok,
    ConfigError,
    ApplyRejected,
    Other,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::ConfigError => 2,
            ExitCode::ApplyRejected => 3,
            ExitCode::Other => 1,
        }
    }
}
