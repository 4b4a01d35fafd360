use crate::KeyVaultClient;
use crate::KeyVaultError;
use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Deserializer};

pub(crate) const LIST_OPERATION: &str = "az keyvault secret list";
pub(crate) const SHOW_OPERATION: &str = "az keyvault secret show";

/// A secret as it appears in a vault listing: its identifier and the display
/// name derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct KeyVaultSecretBaseIdentifier {
    id: String,
    name: String,
}

impl KeyVaultSecretBaseIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = secret_name_from_id(&id).to_owned();
        Self { id, name }
    }
}

/// Output of `az keyvault secret list`: the text exactly as the CLI printed
/// it, plus the identifiers parsed out of it in response order.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct SecretListing {
    raw: String,
    secrets: Vec<KeyVaultSecretBaseIdentifier>,
}

impl SecretListing {
    /// Parses the JSON array printed by `az keyvault secret list`.
    ///
    /// Every element needs an `id`; anything else in it is ignored.
    pub fn from_json(raw: impl Into<String>) -> Result<Self, KeyVaultError> {
        let raw = raw.into();
        let entries = serde_json::from_str::<Vec<KeyVaultSecretBaseIdentifierRaw>>(&raw).map_err(|source| {
            KeyVaultError::MalformedResponse {
                operation: LIST_OPERATION,
                source,
            }
        })?;
        let secrets = entries
            .into_iter()
            .map(|s| KeyVaultSecretBaseIdentifier::new(s.id))
            .collect();
        Ok(Self { raw, secrets })
    }
}

#[derive(Deserialize, Debug)]
struct KeyVaultSecretBaseIdentifierRaw {
    id: String,
}

/// A secret value as returned by `az keyvault secret show`.
///
/// The attributes are only present when the CLI reports them.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct KeyVaultSecret {
    id: String,
    value: String,
    enabled: Option<bool>,
    time_created: Option<DateTime<Utc>>,
    time_updated: Option<DateTime<Utc>>,
}

impl KeyVaultSecret {
    /// Parses the JSON object printed by `az keyvault secret show`.
    ///
    /// `requested_id` fills in the identifier when the response leaves it out.
    pub fn from_json(raw: &str, requested_id: &str) -> Result<Self, KeyVaultError> {
        let response = serde_json::from_str::<KeyVaultGetSecretResponse>(raw).map_err(|source| {
            KeyVaultError::MalformedResponse {
                operation: SHOW_OPERATION,
                source,
            }
        })?;
        let attributes = response.attributes.unwrap_or_default();
        Ok(KeyVaultSecret {
            id: response.id.unwrap_or_else(|| requested_id.to_owned()),
            value: response.value,
            enabled: attributes.enabled,
            time_created: attributes.created,
            time_updated: attributes.updated,
        })
    }
}

#[derive(Deserialize, Debug)]
struct KeyVaultGetSecretResponse {
    value: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<KeyVaultGetSecretResponseAttributes>,
}

#[derive(Deserialize, Debug, Default)]
struct KeyVaultGetSecretResponseAttributes {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    updated: Option<DateTime<Utc>>,
}

/// Timestamps are informational only; anything that is not RFC 3339 reads as `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// Returns the display name of a secret: everything after the final `/` of
/// its identifier, or the whole identifier if it has none.
///
/// # Examples
///
/// ```
/// use az_list_secrets::secret_name_from_id;
/// assert_eq!(secret_name_from_id("https://test.vault.azure.net/secrets/db-password"), "db-password");
/// assert_eq!(secret_name_from_id("plain"), "plain");
/// ```
pub fn secret_name_from_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

impl KeyVaultClient {
    /// Lists the secrets in the Key Vault.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn demo() -> Result<(), az_list_secrets::KeyVaultError> {
    /// use az_list_secrets::KeyVaultClient;
    /// let client = KeyVaultClient::new("test-keyvault");
    /// let listing = client.list_secrets().await?;
    /// for secret in listing.secrets() {
    ///     println!("{}", secret.name());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_secrets(&self) -> Result<SecretListing, KeyVaultError> {
        let raw = self
            .run(
                LIST_OPERATION,
                &["keyvault", "secret", "list", "--vault-name", &self.keyvault_name, "--output", "json"],
            )
            .await?;
        let listing = SecretListing::from_json(raw)?;
        tracing::info!(vault = %self.keyvault_name, count = listing.secrets.len(), "listed secrets");
        Ok(listing)
    }

    /// Gets the current value of a secret, addressed by its full identifier.
    /// The returned id may carry the version segment the CLI resolved to.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn demo() -> Result<(), az_list_secrets::KeyVaultError> {
    /// use az_list_secrets::KeyVaultClient;
    /// let client = KeyVaultClient::new("test-keyvault");
    /// let secret = client.get_secret("https://test-keyvault.vault.azure.net/secrets/api-key").await?;
    /// println!("{}", secret.value());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_secret(&self, secret_id: &str) -> Result<KeyVaultSecret, KeyVaultError> {
        let raw = self
            .run(
                SHOW_OPERATION,
                &[
                    "keyvault",
                    "secret",
                    "show",
                    "--id",
                    secret_id,
                    "--vault-name",
                    &self.keyvault_name,
                    "--output",
                    "json",
                ],
            )
            .await?;
        let secret = KeyVaultSecret::from_json(&raw, secret_id)?;
        let name = secret_name_from_id(secret_id);
        tracing::debug!(
            name,
            enabled = ?secret.enabled,
            updated = ?secret.time_updated,
            "fetched secret"
        );
        if secret.enabled == Some(false) {
            tracing::warn!(name, "secret is disabled");
        }
        Ok(secret)
    }
}
