use anyhow::Result;
use clap::{Parser, Subcommand};
use forum_backend::api;
use forum_backend::bootstrap;
use forum_backend::config::ForumConfig;
use forum_backend::telemetry;
use forum_backend::users::UserService;
use forum_backend::utils::APP_NAME;

#[derive(Parser)]
#[command(author, version, about = "Forum topic/comment REST backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    /// Register a user and print their API token
    AddUser {
        /// Letters, digits and underscores only
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = ForumConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;
    tracing::info!(
        app = APP_NAME,
        base = %config.paths.base.display(),
        "bootstrap complete"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, resources.database).await,
        Command::AddUser { username } => {
            let issued = UserService::new(resources.database).register(&username)?;
            println!("user:  {} (id {})", issued.username, issued.user_id);
            println!("token: {}", issued.token);
            println!("Keep the token safe; it cannot be shown again.");
            Ok(())
        }
    }
}
