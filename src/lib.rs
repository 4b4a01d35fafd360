//! Lists the secrets of an Azure Key Vault, with their current values,
//! by shelling out to the Azure CLI (`az`).
//!
//! Authentication is whatever session the `az` CLI already has; this crate
//! never handles credentials itself.

mod client;
pub mod config;
mod lister;
mod secret;

pub use client::{KeyVaultClient, SecretSource, DEFAULT_AZ_PROGRAM};
pub use lister::{list_vault, Reporter};
pub use secret::{secret_name_from_id, KeyVaultSecret, KeyVaultSecretBaseIdentifier, SecretListing};

use thiserror::Error;

/// Exit code used for failures that do not come with one from `az`.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Error, Debug)]
pub enum KeyVaultError {
    #[error("Failed to launch the Azure CLI ({program})")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{operation} failed with exit code {}: {message}", describe_code(.code))]
    CommandFailed {
        operation: &'static str,
        code: Option<i32>,
        message: String,
    },
    #[error("Unexpected response from {operation}")]
    MalformedResponse {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} produced output that is not valid UTF-8")]
    NonUtf8Output { operation: &'static str },
    #[error("Failed to write the report")]
    Output(#[from] std::io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_owned(), |c| c.to_string())
}

impl KeyVaultError {
    /// The process exit code this error should end the program with.
    ///
    /// A failed `az` call hands its own exit code through; everything else
    /// maps to [`GENERIC_FAILURE_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            KeyVaultError::CommandFailed { code: Some(code), .. } if *code != 0 => *code,
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}
