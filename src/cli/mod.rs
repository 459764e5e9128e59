pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub use client::{FunctionResponse, FunctionsClient};

#[derive(Parser)]
#[command(name = "playground")]
#[command(about = "Playground CLI - invoke the edge functions from the command line")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "PLAYGROUND_URL", default_value = "http://127.0.0.1:3000", help = "Server base URL")]
    pub url: String,

    #[arg(long, global = true, env = "PLAYGROUND_TOKEN", hide_env_values = true, help = "Bearer token sent with requests")]
    pub token: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generic CRUD operations through the db-ops function")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Mint a signed access token for local testing")]
    Token(commands::token::TokenArgs),

    #[command(about = "Show the claims the server sees in your token")]
    Claims,

    #[command(about = "Upload a file through a signed upload URL")]
    Upload(commands::upload::UploadArgs),

    #[command(about = "Exercise the CORS scenarios and print the headers received")]
    Cors(commands::cors::CorsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = FunctionsClient::new(&cli.url, cli.token.clone());

    match cli.command {
        Commands::Db { cmd } => commands::db::handle(cmd, &client, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Claims => commands::claims::handle(&client, output_format).await,
        Commands::Upload(args) => commands::upload::handle(args, &client, output_format).await,
        Commands::Cors(args) => commands::cors::handle(args, &client, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommands() {
        let cli = Cli::try_parse_from(["playground", "claims", "--json", "--url", "http://localhost:9999"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.url, "http://localhost:9999");
        assert!(matches!(cli.command, Commands::Claims));
    }

    #[test]
    fn db_commands_take_typed_tables() {
        let cli = Cli::try_parse_from(["playground", "db", "read", "todos", "--filter", r#"{"user_id":"u1"}"#]).unwrap();
        assert!(matches!(cli.command, Commands::Db { .. }));

        assert!(Cli::try_parse_from(["playground", "db", "read", "users"]).is_err());
    }
}
