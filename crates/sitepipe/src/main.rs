//! sitepipe CLI - static site asset pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use sitepipe_build::Mode;

mod commands;

#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Static site asset pipeline with live reload")]
#[command(version)]
pub struct Cli {
    /// Without a subcommand, build for the mode in SITEPIPE_ENV and start the
    /// dev server unless that mode is production
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to sitepipe.toml config file
    #[arg(short, long, default_value = "sitepipe.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site once
    Build {
        /// Build for production (minified, into the dist folder)
        #[arg(short, long)]
        production: bool,

        /// Output directory (defaults to the folder for the build mode)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build for development, then serve with watching and live reload
    Dev {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Print the page manifest handed to templates
    Pages {
        /// Sort entries instead of keeping scan order
        #[arg(long)]
        sort: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Some(Commands::Build { production, output }) => {
            commands::build::run(&cli.config, Mode::detect(production), output).await?;
        }
        Some(Commands::Dev { port, no_open }) => {
            commands::dev::run(&cli.config, port, !no_open).await?;
        }
        Some(Commands::Pages { sort }) => {
            commands::pages::run(&cli.config, sort)?;
        }
        None => {
            let mode = Mode::detect(false);
            if mode.is_production() {
                commands::build::run(&cli.config, mode, None).await?;
            } else {
                commands::dev::run(&cli.config, 3000, true).await?;
            }
        }
    }

    Ok(())
}
