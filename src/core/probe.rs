//! Live token testing against provider APIs.
//!
//! Each supported provider has one probe recipe: a cheap, read-only
//! endpoint and the header scheme its API expects. Testing a token
//! issues exactly one request and maps the status code to an outcome.
//! Only 401/403 map to an invalid token; any other non-success status
//! maps to an indeterminate outcome.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};

/// How a provider expects the token to be presented.
#[derive(Debug, Clone, Copy)]
pub enum AuthStyle {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// Token in a provider-specific header
    Header(&'static str),
    /// HTTP basic auth with the token as username and no password
    Basic,
}

/// A per-provider probe: endpoint plus auth scheme.
pub struct ProbeRecipe {
    pub provider: &'static str,
    pub base: &'static str,
    pub path: &'static str,
    pub auth: AuthStyle,
    /// Extra header some APIs require before they will even evaluate auth.
    pub extra_header: Option<(&'static str, &'static str)>,
}

/// Provider names match the classifier's rule table.
pub static PROBE_RECIPES: &[ProbeRecipe] = &[
    ProbeRecipe {
        provider: "OpenAI",
        base: "https://api.openai.com",
        path: "/v1/models",
        auth: AuthStyle::Bearer,
        extra_header: None,
    },
    ProbeRecipe {
        provider: "Anthropic",
        base: "https://api.anthropic.com",
        path: "/v1/models",
        auth: AuthStyle::Header("x-api-key"),
        extra_header: Some(("anthropic-version", "2023-06-01")),
    },
    ProbeRecipe {
        provider: "GitHub",
        base: "https://api.github.com",
        path: "/user",
        auth: AuthStyle::Bearer,
        extra_header: None,
    },
    ProbeRecipe {
        provider: "GitLab",
        base: "https://gitlab.com",
        path: "/api/v4/user",
        auth: AuthStyle::Header("PRIVATE-TOKEN"),
        extra_header: None,
    },
    ProbeRecipe {
        provider: "Stripe",
        base: "https://api.stripe.com",
        path: "/v1/account",
        auth: AuthStyle::Basic,
        extra_header: None,
    },
    ProbeRecipe {
        provider: "SendGrid",
        base: "https://api.sendgrid.com",
        path: "/v3/user/profile",
        auth: AuthStyle::Bearer,
        extra_header: None,
    },
    ProbeRecipe {
        provider: "Hugging Face",
        base: "https://huggingface.co",
        path: "/api/whoami-v2",
        auth: AuthStyle::Bearer,
        extra_header: None,
    },
    ProbeRecipe {
        provider: "DigitalOcean",
        base: "https://api.digitalocean.com",
        path: "/v2/account",
        auth: AuthStyle::Bearer,
        extra_header: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The API accepted the token.
    Valid,
    /// The API explicitly rejected the token (401 or 403).
    Invalid,
    /// Anything else: outage, rate limit, unexpected redirect.
    Indeterminate(u16),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Valid => write!(f, "valid"),
            ProbeOutcome::Invalid => write!(f, "invalid"),
            ProbeOutcome::Indeterminate(status) => {
                write!(f, "indeterminate (HTTP {})", status)
            }
        }
    }
}

pub struct Prober {
    client: Client,
    base_override: Option<String>,
}

impl Prober {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("token-locker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_override: None,
        })
    }

    /// Points every recipe at `base` instead of the provider's real host.
    /// Used by tests against a local mock server.
    pub fn with_base_override(base: impl Into<String>) -> Result<Self> {
        let mut prober = Self::new()?;
        prober.base_override = Some(base.into());
        Ok(prober)
    }

    /// Looks up the recipe for a provider name (case-insensitive).
    pub fn recipe_for(provider: &str) -> Option<&'static ProbeRecipe> {
        PROBE_RECIPES
            .iter()
            .find(|r| r.provider.eq_ignore_ascii_case(provider))
    }

    /// Tests `token` against the provider's API. Exactly one request.
    pub fn probe(&self, provider: &str, token: &str) -> Result<ProbeOutcome> {
        let recipe = Self::recipe_for(provider)
            .with_context(|| format!("No probe recipe for provider '{}'", provider))?;

        let base = self.base_override.as_deref().unwrap_or(recipe.base);
        let url = format!("{}{}", base, recipe.path);

        let mut request = self.authenticated_get(&url, recipe.auth, token);
        if let Some((name, value)) = recipe.extra_header {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .with_context(|| format!("Probe request to {} failed", url))?;
        let status = response.status();

        Ok(if status.is_success() {
            ProbeOutcome::Valid
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            ProbeOutcome::Invalid
        } else {
            ProbeOutcome::Indeterminate(status.as_u16())
        })
    }

    fn authenticated_get(&self, url: &str, auth: AuthStyle, token: &str) -> RequestBuilder {
        match auth {
            AuthStyle::Bearer => self.client.get(url).bearer_auth(token),
            AuthStyle::Header(name) => self.client.get(url).header(name, token),
            AuthStyle::Basic => self.client.get(url).basic_auth(token, None::<&str>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_valid_on_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v1/models")
            .match_header("authorization", "Bearer sk-test-token")
            .with_status(200)
            .create();

        let prober = Prober::with_base_override(server.url()).unwrap();
        let outcome = prober.probe("OpenAI", "sk-test-token").unwrap();

        mock.assert();
        assert_eq!(outcome, ProbeOutcome::Valid);
    }

    #[test]
    fn test_probe_invalid_on_unauthorized() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/v1/models").with_status(401).create();

        let prober = Prober::with_base_override(server.url()).unwrap();
        let outcome = prober.probe("OpenAI", "sk-revoked").unwrap();

        assert_eq!(outcome, ProbeOutcome::Invalid);
    }

    #[test]
    fn test_probe_indeterminate_on_server_error() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/v1/models").with_status(503).create();

        let prober = Prober::with_base_override(server.url()).unwrap();
        let outcome = prober.probe("OpenAI", "sk-whatever").unwrap();

        assert_eq!(outcome, ProbeOutcome::Indeterminate(503));
    }

    #[test]
    fn test_probe_sends_provider_specific_header() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/v4/user")
            .match_header("PRIVATE-TOKEN", "glpat-abc123")
            .with_status(200)
            .create();

        let prober = Prober::with_base_override(server.url()).unwrap();
        let outcome = prober.probe("GitLab", "glpat-abc123").unwrap();

        mock.assert();
        assert_eq!(outcome, ProbeOutcome::Valid);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let prober = Prober::new().unwrap();
        let result = prober.probe("NoSuchService", "token");

        assert!(result.is_err());
    }

    #[test]
    fn test_recipe_lookup_is_case_insensitive() {
        assert!(Prober::recipe_for("openai").is_some());
        assert!(Prober::recipe_for("OPENAI").is_some());
        assert!(Prober::recipe_for("Hugging Face").is_some());
        assert!(Prober::recipe_for("unknown").is_none());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ProbeOutcome::Valid.to_string(), "valid");
        assert_eq!(ProbeOutcome::Invalid.to_string(), "invalid");
        assert_eq!(
            ProbeOutcome::Indeterminate(503).to_string(),
            "indeterminate (HTTP 503)"
        );
    }
}
