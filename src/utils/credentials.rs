//! Basic-auth credentials: flags → config file → optional secure prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

use crate::types::Credentials;

/// Build credentials for PUT requests.
///
/// Returns `None` without a user. With `ask` set and no password from flags or config,
/// the password is read from the terminal.
pub fn resolve_credentials(
    user: Option<String>,
    pass: Option<String>,
    ask: bool,
) -> Result<Option<Credentials>> {
    let Some(user) = user.filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let pass = match pass.filter(|p| !p.is_empty()) {
        Some(p) => p,
        None if ask => prompt_password(&user)?,
        None => {
            info!("No password for user {user}; requests are sent without basic auth");
            String::new()
        }
    };
    Ok(Some(Credentials { user, pass }))
}

fn prompt_password(user: &str) -> Result<String> {
    let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
    let pass = rpassword::prompt_password(format!("{} Password for {}: ", label, user))
        .context("read password")?;
    Ok(pass.trim_end_matches(['\r', '\n']).to_string())
}
