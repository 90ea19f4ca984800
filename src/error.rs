use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShipError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conflicting flags, or a value that must be given in non-interactive mode.
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Mount path '{input}' is ambiguous, it matches: {}", candidates.join(", "))]
    AmbiguousMount {
        input: String,
        candidates: Vec<String>,
    },

    #[error("Invalid mount definition for '{path}': {reason}")]
    InvalidMount { path: String, reason: String },

    /// The external sync tool exited unsuccessfully. `code` is `None` when
    /// the child was terminated by a signal.
    #[error("Transfer for mount '{mount}' failed ({})", describe_exit(*code))]
    Transfer { mount: String, code: Option<i32> },

    #[error("Sync tool error: {0}")]
    Tool(String),

    #[error("{failed} of {total} transfer(s) failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("Cancelled.")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dialog error: {0}")]
    Dialog(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ShipError>;
