//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::client::Translator;
use crate::core::models::{missing_count, ConcurrencyStrategy, Engine, SourceText, DEFAULT_SOURCE_LANG};
use crate::languages;

/// Commands for duo-translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate text with one engine
    Translate {
        /// Engine to use: google or microsoft
        #[arg(short, long, default_value = "google")]
        engine: String,

        /// Target language code or name
        #[arg(short, long)]
        to: String,

        /// Source language code or name
        #[arg(long, default_value = DEFAULT_SOURCE_LANG)]
        from: String,

        /// sequential, local-parallel or distributed
        #[arg(short, long, default_value_t = ConcurrencyStrategy::Sequential)]
        strategy: ConcurrencyStrategy,

        /// Parallel tasks or worker processes (overrides MAX_WORKERS)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Read items from a file instead of arguments (one per line)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Treat blank-line separated paragraphs as single multi-line items
        #[arg(long)]
        paragraphs: bool,

        /// Texts to translate; read from stdin when empty and no file is given
        texts: Vec<String>,
    },

    /// List the language codes an engine accepts
    Languages {
        /// Engine to list
        #[arg(short, long)]
        engine: Engine,
    },

    /// Run as a distributed worker on stdin/stdout
    #[command(hide = true)]
    Worker,
}

/// Arguments of the translate command
#[derive(Debug)]
pub struct TranslateArgs {
    pub engine: String,
    pub to: String,
    pub from: String,
    pub strategy: ConcurrencyStrategy,
    pub workers: Option<usize>,
    pub file: Option<PathBuf>,
    pub paragraphs: bool,
    pub texts: Vec<String>,
    pub api_key: Option<String>,
}

/// Handle translate command
pub async fn handle_translate(args: TranslateArgs) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let start_time = Instant::now();

    let raw = if !args.texts.is_empty() {
        args.texts.join("\n")
    } else if let Some(file) = &args.file {
        tokio::fs::read_to_string(file).await?
    } else {
        use tokio::io::AsyncReadExt;
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        input
    };

    let items = if args.paragraphs {
        split_paragraphs(&raw)
    } else {
        split_lines(&raw)
    };

    if items.is_empty() {
        anyhow::bail!("Nothing to translate");
    }

    let engine: Engine = args.engine.parse()?;
    let (to, from) = resolve_languages(engine, &args.to, &args.from)?;

    let mut config = crate::core::config::TranslatorConfig::load()?;
    if let Some(workers) = args.workers {
        config.execution.max_workers = workers;
    }
    let translator = Translator::new(config)?;

    info!("Engine: {}", args.engine);
    info!("Languages: {} -> {}", from, to);
    info!("Strategy: {}", args.strategy);
    info!("Items: {}", items.len());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Translating {} items with {}", items.len(), args.engine));
    pb.enable_steady_tick(Duration::from_millis(100));

    let results = translator
        .translate(
            items,
            &to,
            Some(from.as_str()),
            args.api_key.as_deref(),
            args.strategy,
            &args.engine,
        )
        .await;

    pb.finish_and_clear();
    let results = results?;

    for result in &results {
        println!("{}", result.as_deref().unwrap_or_default());
    }

    let missing = missing_count(&results);
    let duration = start_time.elapsed();
    info!(
        "Completed: {} translated, {} missing in {:?}",
        results.len() - missing,
        missing,
        duration
    );

    if missing > 0 {
        eprintln!("⚠️  {} of {} items could not be translated", missing, results.len());
    }

    Ok(())
}

/// Handle languages command
pub fn handle_languages(engine: Engine) -> anyhow::Result<()> {
    let table = languages::languages(engine);
    let width = table.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    for (name, code) in table {
        println!("{:width$}  {}", name, code, width = width);
    }

    Ok(())
}

/// Handle worker command
pub async fn handle_worker() -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .build()?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    crate::core::worker::run_worker(stdin, tokio::io::stdout(), client).await?;
    Ok(())
}

/// Resolve `--to`/`--from` into codes the engine accepts
fn resolve_languages(engine: Engine, to: &str, from: &str) -> anyhow::Result<(String, String)> {
    let to = resolve_language(engine, to);
    let from = resolve_language(engine, from);

    languages::ensure_supported(engine, &[&to, &from]).map_err(|e| {
        anyhow::anyhow!("{}; run `duo-translator languages --engine {}` for the list", e, engine)
    })?;

    Ok((to, from))
}

/// Accept a language name ("Spanish") where a code is expected
fn resolve_language(engine: Engine, value: &str) -> String {
    languages::code_for(engine, value)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// One item per non-empty line
fn split_lines(raw: &str) -> Vec<SourceText> {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(SourceText::from)
        .collect()
}

/// One multi-line item per blank-line separated paragraph
fn split_paragraphs(raw: &str) -> Vec<SourceText> {
    let mut items = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                items.push(SourceText::Lines(std::mem::take(&mut current)));
            }
        } else {
            current.push(line.trim_end().to_string());
        }
    }
    if !current.is_empty() {
        items.push(SourceText::Lines(current));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_language_names() {
        assert_eq!(resolve_language(Engine::Google, "Chinese (Simplified)"), "zh-CN");
        assert_eq!(resolve_language(Engine::Microsoft, "chinese simplified"), "zh-CHS");
        assert_eq!(resolve_language(Engine::Google, "es"), "es");
    }

    #[test]
    fn test_resolve_languages_rejects_unknown_values() {
        let (to, from) = resolve_languages(Engine::Google, "Spanish", "en").unwrap();
        assert_eq!((to.as_str(), from.as_str()), ("es", "en"));

        let err = resolve_languages(Engine::Google, "Spanis", "en").unwrap_err();
        assert!(err.to_string().contains("'Spanis'"));

        // Codes are per engine
        let err = resolve_languages(Engine::Microsoft, "es", "zh-CN").unwrap_err();
        assert!(err.to_string().contains("'zh-CN'"));
    }

    #[test]
    fn test_split_lines_skips_blanks() {
        let items = split_lines("Hello\n\n  \nGoodbye  \n");
        assert_eq!(items, vec![SourceText::from("Hello"), SourceText::from("Goodbye")]);
    }

    #[test]
    fn test_split_paragraphs() {
        let items = split_paragraphs("Dear Ana,\nThanks!\n\n\nBye\n");
        assert_eq!(
            items,
            vec![
                SourceText::from(vec!["Dear Ana,", "Thanks!"]),
                SourceText::from(vec!["Bye"]),
            ]
        );
    }
}
