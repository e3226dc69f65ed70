//! Harness configuration
//!
//! Layered: built-in defaults, then an optional config file, then
//! `SHOPFLOW_*` environment variables (`__` separates nesting levels, e.g.
//! `SHOPFLOW_CREDENTIALS__USERNAME`). Credentials normally arrive via the
//! environment so they stay out of files checked into version control.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Account credentials.
///
/// The password is never logged and never serialized: `Debug` redacts it
/// and the struct deliberately has no `Serialize` implementation.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Storefront entry point.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sign-in page.
    #[serde(default = "default_signin_url")]
    pub signin_url: String,

    /// Account profile page, used by the email validation flow.
    #[serde(default = "default_profile_url")]
    pub profile_url: String,

    /// Email the profile flow expects to find; defaults to the username.
    #[serde(default)]
    pub expected_email: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Query used by the search and add-to-cart flows.
    #[serde(default = "default_search_term")]
    pub search_term: String,

    /// Price ceiling. When set, the search flow filters results to this
    /// maximum and the cart flow asserts the cart total stays under it.
    #[serde(default)]
    pub max_price: Option<f64>,

    /// Shopping cart page, used by the cart-total check.
    #[serde(default = "default_cart_url")]
    pub cart_url: String,

    /// Where failure screenshots and run reports land.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Per-step post-condition budget, in seconds.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Whole-flow budget, in seconds.
    #[serde(default = "default_flow_timeout_secs")]
    pub flow_timeout_secs: u64,

    #[serde(default)]
    pub credentials: Credentials,
}

fn default_base_url() -> String {
    "https://www.ebay.com".to_string()
}

fn default_signin_url() -> String {
    "https://signin.ebay.com/ws/eBayISAPI.dll?SignIn".to_string()
}

fn default_profile_url() -> String {
    "https://accountsettings.ebay.com/profile".to_string()
}

fn default_true() -> bool {
    true
}

fn default_search_term() -> String {
    "chair".to_string()
}

fn default_cart_url() -> String {
    "https://cart.ebay.com".to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_step_timeout_secs() -> u64 {
    10
}

fn default_flow_timeout_secs() -> u64 {
    120
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            signin_url: default_signin_url(),
            profile_url: default_profile_url(),
            expected_email: None,
            headless: true,
            search_term: default_search_term(),
            max_price: None,
            cart_url: default_cart_url(),
            artifacts_dir: default_artifacts_dir(),
            step_timeout_secs: default_step_timeout_secs(),
            flow_timeout_secs: default_flow_timeout_secs(),
            credentials: Credentials::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match file {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                builder = builder.add_source(File::with_name("config/shopflow").required(false));
            }
        }
        builder
            .add_source(
                Environment::with_prefix("SHOPFLOW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Email the profile validation flow should find.
    pub fn expected_email(&self) -> Option<&str> {
        self.expected_email
            .as_deref()
            .or_else(|| {
                (!self.credentials.username.is_empty())
                    .then_some(self.credentials.username.as_str())
            })
            .filter(|email| email.contains('@'))
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn flow_timeout(&self) -> Duration {
        Duration::from_secs(self.flow_timeout_secs)
    }
}
