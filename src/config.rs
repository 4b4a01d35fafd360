use clap::Parser;
use std::path::PathBuf;

use crate::{KeyVaultClient, DEFAULT_AZ_PROGRAM};

/// Lists every secret in an Azure Key Vault with its current value.
///
/// Uses the Azure CLI's existing login; run `az login` first.
#[derive(Parser, Debug)]
#[command(name = "az-list-secrets", version)]
pub struct Args {
    /// Name of the Key Vault to list
    pub vault_name: String,

    /// Azure CLI executable (or set AZ_CLI_PATH env var)
    #[arg(long, env = "AZ_CLI_PATH", default_value = DEFAULT_AZ_PROGRAM)]
    pub az_path: PathBuf,
}

impl Args {
    pub fn client(&self) -> KeyVaultClient {
        KeyVaultClient::new_with_program(&self.vault_name, &self.az_path)
    }
}
