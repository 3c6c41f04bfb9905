//! CLI auth command handlers for grant, status, revoke and refresh.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::{ConnectionStatus, Credential, CredentialService, FileCredentialStore, Scope};
use crate::cli::GrantArgs;
use crate::config::PlanxConfig;
use crate::types::UserIdentity;

fn service(config: &PlanxConfig) -> CredentialService {
    CredentialService::new(Arc::new(FileCredentialStore::new(&config.data_dir)))
}

fn parse_scope(raw: &str) -> Scope {
    match raw {
        "mail" | "gmail" => Scope::mail(),
        "calendar" => Scope::calendar(),
        other => Scope::new(other),
    }
}

/// Handle `planx auth grant`.
pub async fn handle_grant(
    config: &PlanxConfig,
    args: GrantArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserIdentity::new(args.user)?;
    let mut credential = Credential::new(user.clone(), args.access_token)
        .with_scopes(args.scopes.iter().map(|s| parse_scope(s)));
    if let Some(token) = args.refresh_token {
        credential = credential.with_refresh_token(token);
    }
    if let Some(secs) = args.expires_in {
        credential = credential.with_expiry(Utc::now() + Duration::seconds(secs));
    }

    service(config).grant(&user, credential).await?;
    println!("Stored credential for {user}");
    Ok(())
}

/// Handle `planx auth status`.
pub async fn handle_status(
    config: &PlanxConfig,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserIdentity::new(user)?;
    match service(config).status(&user).await? {
        ConnectionStatus::Connected { scopes, expires_at } => {
            println!("{user}: connected");
            for scope in scopes {
                println!("  scope: {scope}");
            }
            match expires_at {
                Some(at) => println!("  expires: {}", at.to_rfc3339()),
                None => println!("  expires: never"),
            }
        }
        ConnectionStatus::Expired { refreshable } => {
            let hint = if refreshable { "refreshable" } else { "re-authorization needed" };
            println!("{user}: expired ({hint})");
        }
        ConnectionStatus::NotConnected => println!("{user}: not connected"),
    }
    Ok(())
}

/// Handle `planx auth revoke`.
pub async fn handle_revoke(
    config: &PlanxConfig,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserIdentity::new(user)?;
    service(config).revoke(&user).await?;
    println!("Removed credential for {user}");
    Ok(())
}

/// Handle `planx auth refresh`.
#[cfg(feature = "oauth")]
pub async fn handle_refresh(
    config: &PlanxConfig,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use crate::auth::oauth::OAuthRefresher;
    use crate::auth::CredentialRefresher;

    let user = UserIdentity::new(user)?;
    let service = service(config);
    let current = service.require(&user).await?;
    let refresher = OAuthRefresher::from_settings(&config.oauth)?;
    let renewed = refresher.refresh(&current).await?;
    service.grant(&user, renewed.clone()).await?;

    match renewed.expires_at {
        Some(at) => println!("Refreshed credential for {user} (expires {})", at.to_rfc3339()),
        None => println!("Refreshed credential for {user}"),
    }
    Ok(())
}
