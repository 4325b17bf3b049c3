pub mod assign;
pub mod digest;

use crate::output::{CliError, fail};
use std::path::Path;
use taskdesk_core::config::{AppConfig, ConfigError, Credentials, load_app_config};
use taskdesk_core::gateway::odoo::{OdooClient, OdooSession};

/// Load the JSON config; a missing file yields defaults.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    load_app_config(path).or_else(|err| fail(config_error(&err)))
}

/// Resolve credentials from the environment, then the dotenv file.
pub fn load_credentials(dotenv: &Path) -> anyhow::Result<Credentials> {
    Credentials::from_env_and_dotenv(dotenv).or_else(|err| fail(config_error(&err)))
}

/// Authenticate once for the whole run.
pub fn login(credentials: &Credentials) -> anyhow::Result<OdooSession> {
    OdooClient::new(&credentials.url)
        .login(credentials)
        .or_else(|err| fail(CliError::coded(err.code(), format!("Login failed: {err}"))))
}

fn config_error(err: &ConfigError) -> CliError {
    CliError::coded(err.code(), err.to_string())
}
