use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("State not found: {name}")]
    StateNotFound { name: &'static str },
    #[error("Compute not found: {name}")]
    ComputeNotFound { name: &'static str },
    #[error("Command not recorded: {name}")]
    CommandNotFound { name: &'static str },
    #[error("No tokio runtime available to run {name}")]
    NoRuntime { name: &'static str },
    #[error("State context is closed, refusing to run {name}")]
    Closed { name: &'static str },
    #[error("Invalid dependency graph: {0}")]
    Topology(String),
}

impl Error {
    pub fn state_not_found(name: &'static str) -> Self {
        Self::StateNotFound { name }
    }

    pub fn command_not_found(name: &'static str) -> Self {
        Self::CommandNotFound { name }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
