use crate::secret::{KeyVaultSecret, SecretListing};
use crate::KeyVaultError;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Program name used when no explicit path to the Azure CLI is configured.
pub const DEFAULT_AZ_PROGRAM: &str = "az";

/// The two things the lister needs from a vault.
///
/// [`KeyVaultClient`] implements it over the Azure CLI; tests swap in fakes.
pub trait SecretSource {
    /// Lists the identifiers of every secret in the vault.
    fn list_secrets(&self) -> impl Future<Output = Result<SecretListing, KeyVaultError>>;

    /// Fetches the current value of one secret by identifier.
    fn get_secret(&self, secret_id: &str) -> impl Future<Output = Result<KeyVaultSecret, KeyVaultError>>;
}

/// Client for Key Vault operations, backed by the Azure CLI.
///
/// Authentication is whatever session `az login` left behind.
///
/// # Examples
///
/// ```
/// use az_list_secrets::KeyVaultClient;
/// let client = KeyVaultClient::new("test-keyvault");
/// assert_eq!(client.keyvault_name(), "test-keyvault");
/// ```
#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    pub(crate) keyvault_name: String,
    pub(crate) az_program: PathBuf,
}

impl KeyVaultClient {
    /// Creates a new `KeyVaultClient` that runs a specific Azure CLI executable.
    /// For the `az` found on `PATH`, use `KeyVaultClient::new`.
    ///
    /// # Examples
    ///
    /// ```
    /// use az_list_secrets::KeyVaultClient;
    /// let client = KeyVaultClient::new_with_program("test-keyvault", "/opt/az/bin/az");
    /// assert_eq!(client.az_program(), std::path::Path::new("/opt/az/bin/az"));
    /// ```
    pub fn new_with_program(keyvault_name: impl Into<String>, az_program: impl Into<PathBuf>) -> Self {
        Self {
            keyvault_name: keyvault_name.into(),
            az_program: az_program.into(),
        }
    }

    pub fn new(keyvault_name: impl Into<String>) -> Self {
        KeyVaultClient::new_with_program(keyvault_name, DEFAULT_AZ_PROGRAM)
    }

    pub fn keyvault_name(&self) -> &str {
        &self.keyvault_name
    }

    pub fn az_program(&self) -> &std::path::Path {
        &self.az_program
    }

    /// Runs the Azure CLI with `args` and returns its stdout.
    pub(crate) async fn run(&self, operation: &'static str, args: &[&str]) -> Result<String, KeyVaultError> {
        tracing::debug!(program = %self.az_program.display(), ?args, "running Azure CLI");

        let output = Command::new(&self.az_program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| KeyVaultError::ToolUnavailable {
                program: self.az_program.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(KeyVaultError::CommandFailed {
                operation,
                code: output.status.code(),
                message: diagnostic_from_stderr(&stderr),
            });
        }
        // Preview and deprecation notices from a successful call.
        for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
            tracing::warn!(operation, "{}", line);
        }

        String::from_utf8(output.stdout).map_err(|_| KeyVaultError::NonUtf8Output { operation })
    }
}

/// Picks the line that explains why `az` failed: the first `ERROR:` line,
/// since warnings often come before it, else the first non-empty line.
fn diagnostic_from_stderr(stderr: &str) -> String {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next();
    lines
        .find(|l| l.starts_with("ERROR:"))
        .or(first)
        .unwrap_or("unknown error")
        .to_owned()
}

impl SecretSource for KeyVaultClient {
    async fn list_secrets(&self) -> Result<SecretListing, KeyVaultError> {
        KeyVaultClient::list_secrets(self).await
    }

    async fn get_secret(&self, secret_id: &str) -> Result<KeyVaultSecret, KeyVaultError> {
        KeyVaultClient::get_secret(self, secret_id).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Writes an executable `az` stand-in whose body is `script`.
    fn fake_az(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("az");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn passes_vault_and_output_format_to_list() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args.log");
        let az = fake_az(
            dir.path(),
            &format!(
                "echo \"$@\" > '{}'\necho '[{{\"id\": \"https://kv.vault.azure.net/secrets/one\"}}]'",
                log.display()
            ),
        );

        let client = KeyVaultClient::new_with_program("kv", &az);
        let listing = client.list_secrets().await.unwrap();

        assert_eq!(listing.secrets().len(), 1);
        assert_eq!(listing.secrets()[0].name(), "one");
        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(args.trim(), "keyvault secret list --vault-name kv --output json");
    }

    #[tokio::test]
    async fn passes_secret_id_and_vault_to_show() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args.log");
        let az = fake_az(
            dir.path(),
            &format!("echo \"$@\" > '{}'\necho '{{\"value\": \"hunter2\"}}'", log.display()),
        );

        let client = KeyVaultClient::new_with_program("kv", &az);
        let secret = client.get_secret("https://kv.vault.azure.net/secrets/pw").await.unwrap();

        assert_eq!(secret.value(), "hunter2");
        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(
            args.trim(),
            "keyvault secret show --id https://kv.vault.azure.net/secrets/pw --vault-name kv --output json"
        );
    }

    #[tokio::test]
    async fn non_zero_exit_surfaces_first_stderr_line() {
        let dir = TempDir::new().unwrap();
        let az = fake_az(
            dir.path(),
            "echo '' >&2\necho \"ERROR: The Vault 'kv' not found within subscription.\" >&2\necho 'more detail' >&2\nexit 3",
        );

        let client = KeyVaultClient::new_with_program("kv", &az);
        let err = client.list_secrets().await.unwrap_err();

        match &err {
            KeyVaultError::CommandFailed { operation, code, message } => {
                assert_eq!(*operation, "az keyvault secret list");
                assert_eq!(*code, Some(3));
                assert_eq!(message, "ERROR: The Vault 'kv' not found within subscription.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn error_line_wins_over_leading_warnings() {
        let dir = TempDir::new().unwrap();
        let az = fake_az(
            dir.path(),
            "echo 'WARNING: Command group keyvault is in preview.' >&2\n\
             echo \"ERROR: (VaultNotFound) The Vault 'kv' not found.\" >&2\n\
             exit 3",
        );

        let client = KeyVaultClient::new_with_program("kv", &az);
        let err = client.list_secrets().await.unwrap_err();

        match &err {
            KeyVaultError::CommandFailed { code, message, .. } => {
                assert_eq!(*code, Some(3));
                assert_eq!(message, "ERROR: (VaultNotFound) The Vault 'kv' not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn warnings_on_success_do_not_fail_the_call() {
        let dir = TempDir::new().unwrap();
        let az = fake_az(
            dir.path(),
            "echo 'WARNING: This command has been deprecated.' >&2\necho '{\"value\": \"v\"}'",
        );

        let client = KeyVaultClient::new_with_program("kv", &az);
        let secret = client.get_secret("a/b").await.unwrap();

        assert_eq!(secret.value(), "v");
    }

    #[test]
    fn diagnostic_prefers_error_line() {
        assert_eq!(
            diagnostic_from_stderr("\nWARNING: preview\nERROR: bad vault\nERROR: second\n"),
            "ERROR: bad vault"
        );
        assert_eq!(diagnostic_from_stderr("  \nWARNING: only a warning\nmore\n"), "WARNING: only a warning");
        assert_eq!(diagnostic_from_stderr(""), "unknown error");
    }

    #[tokio::test]
    async fn silent_failure_has_placeholder_message() {
        let dir = TempDir::new().unwrap();
        let az = fake_az(dir.path(), "exit 1");

        let client = KeyVaultClient::new_with_program("kv", &az);
        let err = client.get_secret("a/b").await.unwrap_err();

        assert!(matches!(
            err,
            KeyVaultError::CommandFailed { ref message, code: Some(1), .. } if message == "unknown error"
        ));
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let dir = TempDir::new().unwrap();
        let client = KeyVaultClient::new_with_program("kv", dir.path().join("does-not-exist"));

        let err = client.list_secrets().await.unwrap_err();

        assert!(matches!(err, KeyVaultError::ToolUnavailable { .. }));
        assert_eq!(err.exit_code(), crate::GENERIC_FAILURE_EXIT_CODE);
    }
}
