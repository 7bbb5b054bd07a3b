//! Main entry point for duo-translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duo_translator::cli::commands::{self, Commands, TranslateArgs};

/// duo-translator - batch translation through Google or Microsoft
#[derive(Parser, Debug)]
#[command(name = "duo-translator", version, about, long_about = None)]
struct Args {
    /// API key for the chosen engine (defaults to GOOGLE_TRANSLATE_API_KEY / MICROSOFT_TRANSLATOR_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr; stdout carries results and the worker protocol
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("duo_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Some(Commands::Translate {
            engine,
            to,
            from,
            strategy,
            workers,
            file,
            paragraphs,
            texts,
        }) => {
            commands::handle_translate(TranslateArgs {
                engine,
                to,
                from,
                strategy,
                workers,
                file,
                paragraphs,
                texts,
                api_key: args.api_key,
            })
            .await?;
        }
        Some(Commands::Languages { engine }) => {
            commands::handle_languages(engine)?;
        }
        Some(Commands::Worker) => {
            commands::handle_worker().await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
