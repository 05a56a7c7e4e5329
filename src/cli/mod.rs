pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog CLI - operator tooling for the category hierarchy service")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a bearer token signed with the configured JWT secret")]
    Token {
        #[arg(long, help = "User id placed in the token claims")]
        id: String,
        #[arg(long, default_value = crate::auth::ADMIN_ROLE, help = "Role claim")]
        role: String,
        #[arg(long, help = "Lifetime in hours (defaults to JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Print the active category tree")]
    Tree {
        #[arg(long, help = "Include active product counts per node")]
        include_products: bool,
    },

    #[command(about = "Recompute children, level and path from parent pointers")]
    Repair {
        #[arg(long, help = "Report drift without writing fixes")]
        dry_run: bool,
    },

    #[command(about = "Show the slug derived from a category name")]
    Slug {
        #[arg(help = "Category name")]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Token { id, role, hours } => commands::token::handle(id, role, hours, output_format),
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Tree { include_products } => commands::categories::tree(include_products, output_format).await,
        Commands::Repair { dry_run } => commands::categories::repair(dry_run, output_format).await,
        Commands::Slug { name } => commands::categories::slug(&name, output_format),
    }
}
