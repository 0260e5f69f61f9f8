//! CLI headless commands for CI/CD and scripting
//!
//! Provides non-interactive commands for automation:
//! - `init --passphrase <PASS>` - Initialize a new vault
//! - `add/get/list/remove` - Manage tokens
//! - `import`/`export` - Move tokens in and out as .env or JSON
//! - `scan` - Report credentials found in free text
//! - `test` - Probe a token against its provider's API

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{self, BufRead, Read};

use crate::core::classifier::classify;
use crate::core::config::Config;
use crate::core::init::Vault;
use crate::core::probe::{ProbeOutcome, Prober};
use crate::core::store::TokenStore;

/// Environment variable for passphrase (more secure than CLI argument)
pub const PASSPHRASE_ENV_VAR: &str = "TOKEN_LOCKER_PASSPHRASE";

/// Gets passphrase from argument, environment variable, or interactive prompt.
/// Priority: argument > environment variable > prompt
pub fn get_passphrase(arg_passphrase: Option<&str>) -> Result<String> {
    if let Some(pass) = arg_passphrase {
        return Ok(pass.to_string());
    }

    if let Ok(pass) = std::env::var(PASSPHRASE_ENV_VAR) {
        return Ok(pass);
    }

    rpassword::prompt_password("Passphrase: ").context(format!(
        "Passphrase required. Use --passphrase <PASS> or set {} environment variable",
        PASSPHRASE_ENV_VAR
    ))
}

/// Output format for list/get commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
    Env,
}

impl OutputFormat {
    pub fn from_args(json: bool, env: bool) -> Self {
        if json {
            OutputFormat::Json
        } else if env {
            OutputFormat::Env
        } else {
            OutputFormat::Human
        }
    }
}

// ============================================================================
// INIT COMMAND
// ============================================================================

/// Initialize a new vault with the given passphrase
pub fn cmd_init(passphrase: &str, force: bool) -> Result<()> {
    let vault_dir = Vault::vault_dir()?;
    let salt_path = vault_dir.join("salt");

    if salt_path.exists() && !force {
        anyhow::bail!(
            "Vault already exists at {:?}. Use --force to overwrite.",
            vault_dir
        );
    }

    if force && salt_path.exists() {
        // Remove existing vault files
        std::fs::remove_file(vault_dir.join("salt")).ok();
        std::fs::remove_file(vault_dir.join("hash")).ok();
        std::fs::remove_file(vault_dir.join("tokens.json")).ok();
    }

    let vault = Vault::init_or_load_with_passphrase(passphrase)?;
    Config::load(vault.base_dir())?;

    println!("✅ Vault initialized at {:?}", vault_dir);
    Ok(())
}

// ============================================================================
// TOKEN COMMANDS
// ============================================================================

/// Add a new token
pub fn cmd_add(
    name: &str,
    value: Option<&str>,
    stdin: bool,
    expires_days: Option<u32>,
    passphrase: &str,
) -> Result<()> {
    let token_value = if stdin {
        read_value_from_stdin()?
    } else if let Some(v) = value {
        v.to_string()
    } else {
        anyhow::bail!("Value required. Provide as argument or use --stdin");
    };

    let vault = Vault::init_or_load_with_passphrase(passphrase)?;
    let key = vault.master_key().context("Failed to get master key")?;

    let mut store = TokenStore::load(vault.base_dir())?;
    store.add_token(name.to_string(), &token_value, expires_days, key)?;

    println!("✅ Token '{}' added", name);
    if let Some(token) = store.get_token(name) {
        if let (Some(provider), Some(category)) = (&token.provider, &token.category) {
            println!("   Classified as {} ({})", provider, category);
        }
    }
    if let Some(days) = expires_days {
        println!("   Expires in {} days", days);
    }

    Ok(())
}

/// Get a token value
pub fn cmd_get(name: &str, format: OutputFormat, passphrase: &str) -> Result<()> {
    let vault = Vault::init_or_load_with_passphrase(passphrase)?;
    let key = vault.master_key().context("Failed to get master key")?;

    let store = TokenStore::load(vault.base_dir())?;
    let token = store
        .get_token(name)
        .context(format!("Token '{}' not found", name))?;

    if token.is_expired() {
        anyhow::bail!("Token '{}' has expired", name);
    }

    let value = store.reveal(name, key)?;

    match format {
        OutputFormat::Human => println!("{}", value),
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "name": name,
                "value": value,
                "provider": token.provider,
                "category": token.category,
                "expires_at": token.expires_at,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
        OutputFormat::Env => println!("{}={}", name, value),
    }

    Ok(())
}

/// List all tokens
pub fn cmd_list(format: OutputFormat, passphrase: &str) -> Result<()> {
    let vault = Vault::init_or_load_with_passphrase(passphrase)?;
    let key = vault.master_key().context("Failed to get master key")?;

    let store = TokenStore::load(vault.base_dir())?;
    let tokens = store.list_tokens();

    match format {
        OutputFormat::Human => {
            if tokens.is_empty() {
                println!("No tokens found.");
                return Ok(());
            }

            println!(
                "{:<25} {:<15} {:<20} STATUS",
                "NAME", "PROVIDER", "EXPIRES"
            );
            println!("{:-<70}", "");

            for token in tokens {
                let status = if token.is_expired() {
                    "⚠️ EXPIRED"
                } else {
                    "✓"
                };
                println!(
                    "{:<25} {:<15} {:<20} {}",
                    token.name,
                    token.provider.as_deref().unwrap_or("-"),
                    token.expiration_display(),
                    status
                );
            }
        }
        OutputFormat::Json => {
            let list: Vec<_> = tokens
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "provider": t.provider,
                        "category": t.category,
                        "expires_at": t.expires_at,
                        "is_expired": t.is_expired(),
                        "days_remaining": t.days_until_expiration(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Env => {
            // For env format, decrypt and output all non-expired values
            for token in tokens {
                if !token.is_expired() {
                    let value = store.reveal(&token.name, key)?;
                    println!("{}={}", token.name, value);
                }
            }
        }
    }

    Ok(())
}

/// Remove a token
pub fn cmd_remove(name: &str, passphrase: &str) -> Result<()> {
    let vault = Vault::init_or_load_with_passphrase(passphrase)?;

    let mut store = TokenStore::load(vault.base_dir())?;

    if store.get_token(name).is_none() {
        anyhow::bail!("Token '{}' not found", name);
    }

    store.delete_token(name)?;
    println!("✅ Token '{}' removed", name);

    Ok(())
}

// ============================================================================
// IMPORT / EXPORT COMMANDS
// ============================================================================

/// Import tokens from a .env file, JSON file, or stdin
pub fn cmd_import(
    file: Option<&str>,
    stdin: bool,
    format: &str,
    expires_days: Option<u32>,
    passphrase: &str,
) -> Result<()> {
    let content = if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else if let Some(path) = file {
        std::fs::read_to_string(path).context(format!("Failed to read file: {}", path))?
    } else {
        anyhow::bail!("Provide a file path or use --stdin");
    };

    let entries = match format {
        "env" => parse_env_format(&content)?,
        "json" => parse_json_format(&content)?,
        _ => anyhow::bail!("Unknown format: {}. Supported: env, json", format),
    };

    if entries.is_empty() {
        println!("⚠️  No tokens found in input");
        return Ok(());
    }

    let vault = Vault::init_or_load_with_passphrase(passphrase)?;
    let key = vault.master_key().context("Failed to get master key")?;

    let mut store = TokenStore::load(vault.base_dir())?;
    let mut count = 0;

    for (name, value) in entries {
        store.add_token(name, &value, expires_days, key)?;
        count += 1;
    }

    println!("✅ Imported {} tokens", count);
    if let Some(days) = expires_days {
        println!("   All tokens expire in {} days", days);
    }

    Ok(())
}

/// Export all tokens to stdout
pub fn cmd_export(format: OutputFormat, passphrase: &str) -> Result<()> {
    // Reuse token list with env format for export
    cmd_list(format, passphrase)
}

// ============================================================================
// SCAN COMMAND
// ============================================================================

/// Scan free text for credentials and report what was found.
/// Requires no vault or passphrase.
pub fn cmd_scan(file: Option<&str>, stdin: bool, json: bool) -> Result<()> {
    let content = if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else if let Some(path) = file {
        std::fs::read_to_string(path).context(format!("Failed to read file: {}", path))?
    } else {
        anyhow::bail!("Provide a file path or use --stdin");
    };

    let config = Config::load_or_default(&Vault::vault_dir()?);
    let candidates = config.classifier.apply(classify(&content));

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("No credentials found.");
        return Ok(());
    }

    println!("Found {} candidate credential(s):", candidates.len());
    println!();
    println!(
        "{:<6} {:<16} {:<22} {:<24} DESCRIPTION",
        "CONF", "PROVIDER", "CATEGORY", "MATCH"
    );
    println!("{:-<100}", "");
    for candidate in &candidates {
        println!(
            "{:<6.2} {:<16} {:<22} {:<24} {}",
            candidate.confidence,
            candidate.provider,
            candidate.category.to_string(),
            mask(&candidate.matched_text),
            candidate.description
        );
    }

    Ok(())
}

/// Masks a credential for display: keeps the first and last 4 characters.
fn mask(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 8 {
        return "••••••••".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

// ============================================================================
// TEST COMMAND
// ============================================================================

/// Probe a token against its provider's API.
/// Either a stored token by name, or an ad-hoc value with --value.
pub fn cmd_test(
    name: Option<&str>,
    value: Option<&str>,
    provider: Option<&str>,
    passphrase: Option<&str>,
) -> Result<()> {
    let (token_value, provider_name) = if let Some(name) = name {
        let passphrase = get_passphrase(passphrase)?;
        let vault = Vault::init_or_load_with_passphrase(&passphrase)?;
        let key = vault.master_key().context("Failed to get master key")?;

        let store = TokenStore::load(vault.base_dir())?;
        let token = store
            .get_token(name)
            .context(format!("Token '{}' not found", name))?;
        if token.is_expired() {
            anyhow::bail!("Token '{}' has expired", name);
        }

        let provider_name = provider
            .map(str::to_string)
            .or_else(|| token.provider.clone())
            .context("Token has no recorded provider. Pass --provider explicitly")?;
        (store.reveal(name, key)?, provider_name)
    } else if let Some(value) = value {
        let provider_name = provider
            .map(str::to_string)
            .or_else(|| classify(value).into_iter().next().map(|c| c.provider))
            .context("Could not identify a provider. Pass --provider explicitly")?;
        (value.to_string(), provider_name)
    } else {
        anyhow::bail!("Provide a token name or --value <TOKEN>");
    };

    let prober = Prober::new()?;
    match prober.probe(&provider_name, &token_value)? {
        ProbeOutcome::Valid => println!("✅ {} accepted the token", provider_name),
        ProbeOutcome::Invalid => println!("❌ {} rejected the token", provider_name),
        ProbeOutcome::Indeterminate(status) => {
            println!("⚠️  Probe inconclusive (HTTP {})", status);
            println!("   The provider may be down or rate limiting; try again later.");
        }
    }

    Ok(())
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn read_value_from_stdin() -> Result<String> {
    let stdin = io::stdin();
    let mut value = String::new();

    // Read first line only (trim newline)
    stdin.lock().read_line(&mut value)?;

    if value.ends_with('\n') {
        value.pop();
    }
    if value.ends_with('\r') {
        value.pop();
    }

    if value.is_empty() {
        anyhow::bail!("No value provided on stdin");
    }

    Ok(value)
}

fn parse_env_format(content: &str) -> Result<HashMap<String, String>> {
    let mut entries = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse KEY=VALUE or KEY="VALUE" or KEY='VALUE'
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim().to_string();
            let mut value = line[eq_pos + 1..].trim().to_string();

            // Remove surrounding quotes
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }

            if !key.is_empty() {
                entries.insert(key, value);
            }
        }
    }

    Ok(entries)
}

fn parse_json_format(content: &str) -> Result<HashMap<String, String>> {
    // Support both object format and array format
    let json: serde_json::Value = serde_json::from_str(content)?;
    let mut entries = HashMap::new();

    match json {
        serde_json::Value::Object(obj) => {
            for (key, value) in obj {
                match value.as_str() {
                    Some(v) => {
                        entries.insert(key, v.to_string());
                    }
                    None => anyhow::bail!("Value for '{}' must be a string", key),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr {
                let name = item
                    .get("name")
                    .and_then(|v| v.as_str())
                    .context("Array entries must have a string 'name' field")?;
                let value = item
                    .get("value")
                    .and_then(|v| v.as_str())
                    .context("Array entries must have a string 'value' field")?;
                entries.insert(name.to_string(), value.to_string());
            }
        }
        _ => anyhow::bail!("JSON must be an object or array"),
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_format() {
        let content = r#"
# Comment
DATABASE_URL=postgres://localhost/db
API_KEY="sk-123456"
SECRET='my_secret'
EMPTY=

SPACES = value with spaces
"#;

        let entries = parse_env_format(content).unwrap();

        assert_eq!(
            entries.get("DATABASE_URL"),
            Some(&"postgres://localhost/db".to_string())
        );
        assert_eq!(entries.get("API_KEY"), Some(&"sk-123456".to_string()));
        assert_eq!(entries.get("SECRET"), Some(&"my_secret".to_string()));
        assert_eq!(entries.get("EMPTY"), Some(&"".to_string()));
        assert_eq!(
            entries.get("SPACES"),
            Some(&"value with spaces".to_string())
        );
    }

    #[test]
    fn test_parse_json_object_format() {
        let content = r#"{"API_KEY": "sk-123", "DB_URL": "postgres://localhost"}"#;

        let entries = parse_json_format(content).unwrap();

        assert_eq!(entries.get("API_KEY"), Some(&"sk-123".to_string()));
        assert_eq!(
            entries.get("DB_URL"),
            Some(&"postgres://localhost".to_string())
        );
    }

    #[test]
    fn test_parse_json_array_format() {
        let content = r#"[
            {"name": "API_KEY", "value": "sk-123"},
            {"name": "DB_URL", "value": "postgres://localhost"}
        ]"#;

        let entries = parse_json_format(content).unwrap();

        assert_eq!(entries.get("API_KEY"), Some(&"sk-123".to_string()));
        assert_eq!(
            entries.get("DB_URL"),
            Some(&"postgres://localhost".to_string())
        );
    }

    #[test]
    fn test_parse_json_rejects_non_string_values() {
        assert!(parse_json_format(r#"{"API_KEY": 42}"#).is_err());
        assert!(parse_json_format(r#"[{"name": "x"}]"#).is_err());
        assert!(parse_json_format(r#""just a string""#).is_err());
    }

    #[test]
    fn test_output_format_from_args() {
        assert_eq!(OutputFormat::from_args(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_args(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_args(false, true), OutputFormat::Env);
        // JSON takes priority if both are set
        assert_eq!(OutputFormat::from_args(true, true), OutputFormat::Json);
    }

    #[test]
    fn test_mask_keeps_only_edges() {
        assert_eq!(mask("sk-abcdEFGH12345678901234"), "sk-a…1234");
        assert_eq!(mask("short"), "••••••••");
    }
}
