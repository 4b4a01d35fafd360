use crate::client::SecretSource;
use crate::KeyVaultError;
use std::io::Write;

/// Writes the human-readable vault report.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn connecting(&mut self, vault_name: &str) -> std::io::Result<()> {
        writeln!(self.out, "Connecting to Azure Key Vault: {}\n", vault_name)?;
        self.out.flush()
    }

    pub fn listing(&mut self, raw: &str) -> std::io::Result<()> {
        writeln!(self.out, "Listing:\n{}", raw.trim_end())?;
        self.out.flush()
    }

    pub fn secrets_header(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "Secrets:\n")?;
        self.out.flush()
    }

    pub fn secret(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        writeln!(self.out, "Name  | {}\nValue | {}\n", name, value)?;
        self.out.flush()
    }
}

/// Lists every secret of `vault_name` with its current value.
///
/// Runs strictly in order: one listing call, then one fetch per secret, each
/// awaited before the next starts. The first failure ends the run; whatever
/// was already reported stays written.
pub async fn list_vault<S, W>(source: &S, vault_name: &str, reporter: &mut Reporter<W>) -> Result<(), KeyVaultError>
where
    S: SecretSource,
    W: Write,
{
    reporter.connecting(vault_name)?;

    let listing = source.list_secrets().await?;
    reporter.listing(listing.raw())?;
    reporter.secrets_header()?;

    for entry in listing.secrets() {
        let secret = source.get_secret(entry.id()).await?;
        reporter.secret(entry.name(), secret.value())?;
    }

    Ok(())
}
