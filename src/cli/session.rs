//! CLI session command handlers.

use crate::cli::ShowArgs;
use crate::config::PlanxConfig;
use crate::session::{ConversationSession, FileSessionStore, SessionStore};
use crate::types::{Role, UserIdentity};

/// Handle `planx session show`.
pub async fn handle_show(
    config: &PlanxConfig,
    args: ShowArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserIdentity::new(args.user)?;
    let store = FileSessionStore::new(&config.data_dir);
    let session = ConversationSession::restore(user.clone(), store.load(&user).await?);
    if session.is_empty() {
        println!("{user}: no session");
        return Ok(());
    }

    let messages = match args.last {
        Some(n) => session.last_n(n),
        None => session.messages(),
    };
    for message in messages {
        if args.json {
            println!("{}", serde_json::to_string(message)?);
            continue;
        }
        let label = match message.role {
            Role::Tool => format!("tool[{}]", message.tool_call_id.as_deref().unwrap_or("?")),
            role => role.to_string(),
        };
        println!("{label}: {}", message.text());
        for call in &message.tool_calls {
            println!("  -> {}({}) [{}]", call.name, call.arguments, call.id);
        }
    }
    Ok(())
}

/// Handle `planx session reset`.
pub async fn handle_reset(
    config: &PlanxConfig,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = UserIdentity::new(user)?;
    FileSessionStore::new(&config.data_dir).clear(&user).await?;
    println!("Cleared session for {user}");
    Ok(())
}
