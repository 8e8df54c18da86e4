//! # Errors
//!
//! Only resource acquisition and collaborator failures surface as errors.
//! Data-shape problems in the circuit or in firmware source degrade by
//! omission and never reach this type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfgcError {
    #[error("Script runtime failed to load: {0}")]
    RuntimeLoad(String),

    #[error("Script execution failed: {0}")]
    Execution(String),

    #[error("Firmware compilation failed: {0}")]
    Compilation(String),

    #[error("Emulator error: {0}")]
    Emulator(String),

    #[error("Invalid graph description: {0}")]
    Graph(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CfgcError>;
