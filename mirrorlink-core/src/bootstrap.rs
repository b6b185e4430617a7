//! Configuration loading and resolver construction

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mirrorlink_providers::netmirror::{
    build_http_client, CookieSource, CookieSupplier, MirrorTransport, NetMirrorClient, Resolver,
    StreamAssembler,
};
use tracing::info;

use crate::config::{Config, CredentialConfig, MirrorProfile};

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. Explicit `path` argument
/// 2. `MIRRORLINK_CONFIG_PATH` environment variable
/// 3. ./mirrorlink.yaml (current working directory)
/// 4. Fall back to environment variables only
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let config_path = path
        .map(str::to_string)
        .or_else(|| {
            std::env::var("MIRRORLINK_CONFIG_PATH")
                .ok()
                .filter(|p| Path::new(p).exists())
        })
        .or_else(|| {
            let cwd = "mirrorlink.yaml";
            Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = match config_path {
        Some(path) => {
            if !Path::new(&path).exists() {
                anyhow::bail!("Config file not found: {path}");
            }
            Config::from_file(&path).with_context(|| format!("Failed to load {path}"))?
        }
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    // Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}

fn cookie_source(credential: &CredentialConfig) -> Result<CookieSource> {
    if let Some(cookie) = credential.static_cookie.as_ref().filter(|c| !c.is_empty()) {
        return Ok(CookieSource::Static(cookie.clone()));
    }
    let url = credential
        .source_url
        .clone()
        .context("credential.source_url is required without static_cookie")?;
    Ok(CookieSource::Remote {
        url,
        pointer: credential.field_pointer.clone(),
    })
}

/// Build a [`Resolver`] for one mirror profile.
///
/// The credential supplier and the endpoint client share one connection pool.
pub fn build_resolver(config: &Config, profile: &MirrorProfile) -> Result<Resolver> {
    let http = build_http_client(&config.http.to_options())?;

    let client = NetMirrorClient::with_user_agent(
        profile.base_url.as_str(),
        http.clone(),
        config.http.user_agent.as_str(),
    )?;

    let cookies = CookieSupplier::new(cookie_source(&config.credential)?, http).with_extra_cookies(
        config
            .credential
            .extra_cookies
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    // Same normalized base as the endpoint client
    let assembler = StreamAssembler::new(client.base_url(), profile.relay.clone())?;

    info!(profile = %profile.name, base_url = client.base_url(), "Mirror profile ready");
    Ok(Resolver::new(Arc::new(client), Arc::new(cookies), assembler))
}

/// Build a resolver for the named profile, or the default one.
pub fn resolver_for(config: &Config, profile_name: Option<&str>) -> Result<Resolver> {
    let profile = config.profile(profile_name).with_context(|| {
        format!(
            "Unknown mirror profile: {}",
            profile_name.unwrap_or(&config.default_profile)
        )
    })?;
    build_resolver(config, profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_source_prefers_static() {
        let mut credential = CredentialConfig::default();
        assert!(matches!(cookie_source(&credential).unwrap(), CookieSource::Remote { .. }));

        credential.static_cookie = Some("t_hash_t=abc".to_string());
        assert_eq!(
            cookie_source(&credential).unwrap(),
            CookieSource::Static("t_hash_t=abc".to_string())
        );

        credential.static_cookie = None;
        credential.source_url = None;
        assert!(cookie_source(&credential).is_err());
    }

    #[test]
    fn test_resolver_for_unknown_profile() {
        let config = Config::default();
        assert!(resolver_for(&config, None).is_ok());
        let err = resolver_for(&config, Some("elsewhere")).err().unwrap();
        assert!(err.to_string().contains("elsewhere"));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        assert!(load_config(Some("/nonexistent/mirrorlink.yaml")).is_err());
    }
}
