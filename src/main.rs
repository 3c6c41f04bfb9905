//! planx CLI binary entry point.

use clap::Parser;
use planx::cli::{AuthCommands, Cli, Commands, SessionCommands};
use planx::config::PlanxConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match PlanxConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Grant(args) => planx::cli::auth::handle_grant(&config, args).await,
            AuthCommands::Status(args) => planx::cli::auth::handle_status(&config, &args.user).await,
            AuthCommands::Revoke(args) => planx::cli::auth::handle_revoke(&config, &args.user).await,
            #[cfg(feature = "oauth")]
            AuthCommands::Refresh(args) => {
                planx::cli::auth::handle_refresh(&config, &args.user).await
            }
        },
        Commands::Session(session_args) => match session_args.command {
            SessionCommands::Show(args) => planx::cli::session::handle_show(&config, args).await,
            SessionCommands::Reset(args) => {
                planx::cli::session::handle_reset(&config, &args.user).await
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
