use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "libsweep")]
#[command(about = "Remove installed sample libraries and everything they leave behind", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List removable libraries")]
    List {
        #[arg(short = 's', long, help = "Compute size on disk (slower)")]
        sizes: bool,
        #[arg(short = 'F', long, default_value = "human")]
        format: OutputFormat,
    },
    #[command(about = "Remove one or more libraries")]
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long, help = "Also delete the content directory")]
        delete_content: bool,
        #[arg(long, help = "Keep the content directory (overrides config)", conflicts_with = "delete_content")]
        keep_content: bool,
        #[arg(long, help = "Skip the registry backup (overrides config)")]
        no_backup: bool,
        #[arg(long)]
        yes: bool,
        #[arg(short = 'F', long, default_value = "human")]
        format: OutputFormat,
    },
    #[command(about = "Move a library's content directory and update the registry")]
    Relocate {
        name: String,
        #[arg(short, long, help = "New parent directory")]
        to: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
    #[command(about = "View action history")]
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum ConfigActions {
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Set a configuration value")]
    Set {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        value: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
