use std::io::{self, BufRead};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use bilinote::config::{Config, Settings};
use bilinote::output::{format_timestamp, render_json};
use bilinote::pipeline::{ProcessingOutcome, Request};
use bilinote::transcribe::{provider_for, transcribe};
use cli::{Cli, Command, NoteArgs, OutputFormat};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("bilinote.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bilinote")
        .join("logs")
}

fn build_after_help() -> String {
    let config_path = bilinote::config::config_path();
    let config_line = if config_path.exists() {
        format!("  \x1b[32m✅\x1b[0m {}", config_path.display())
    } else {
        format!("  \x1b[33m–\x1b[0m  {} (not found, using defaults)", config_path.display())
    };

    let key_line = if std::env::var(bilinote::config::ACCESS_KEY_ENV).is_ok() {
        format!("  \x1b[32m✅\x1b[0m {}", bilinote::config::ACCESS_KEY_ENV)
    } else {
        format!(
            "  \x1b[31m❌\x1b[0m {} (not set; AI rewrite and transcription need --key)",
            bilinote::config::ACCESS_KEY_ENV
        )
    };

    let log_path = log_dir().join("bilinote.log");

    format!(
        "\nCONFIG:\n{config_line}\n\nCREDENTIAL:\n{key_line}\n\nLogs are written to: {}",
        log_path.display()
    )
}

fn require_credential(credential: Option<String>, what: &str) -> Result<String> {
    match credential {
        Some(key) => Ok(key),
        None => bail!(
            "{what} needs a credential\n\nPass --key <KEY> or set {}",
            bilinote::config::ACCESS_KEY_ENV
        ),
    }
}

fn emit(rendered: &str, output: Option<&PathBuf>, verbose: bool) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        if verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }
    Ok(())
}

fn check_urls(urls: &[&str], output: Option<&PathBuf>) -> Result<()> {
    if urls.is_empty() {
        bail!("no URL or BV id provided\n\nUsage: bilinote note <URL>\n       echo <URL> | bilinote note");
    }
    if let (Some(path), true) = (output, urls.len() > 1) {
        bail!(
            "--output {} would be overwritten by each of the {} URLs; pass one URL or drop --output",
            path.display(),
            urls.len()
        );
    }
    Ok(())
}

async fn run_note(
    client: &reqwest::Client,
    settings: &Settings,
    config: &Config,
    credential: Option<String>,
    args: NoteArgs,
    verbose: bool,
) -> Result<()> {
    let NoteArgs {
        url,
        page,
        prefer,
        no_rewrite,
        auto_transcribe,
        lang,
        format,
        output,
    } = args;

    // Collect URLs: from arg or stdin
    let urls = if let Some(url) = url {
        vec![url]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    let urls: Vec<&str> = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();
    check_urls(&urls, output.as_ref())?;

    let prefer = prefer.or(config.default_prefer).unwrap_or_default();

    for url in urls {
        let request = Request {
            url: url.to_string(),
            credential: credential.clone(),
            page,
            prefer,
            rewrite: !no_rewrite,
        };

        if verbose && request.credential.is_none() && !no_rewrite {
            eprintln!("No credential available; skipping AI rewrite");
        }

        let mut outcome = bilinote::pipeline::process(client, settings, &request).await?;

        if auto_transcribe && matches!(outcome, ProcessingOutcome::NeedsTranscription { .. }) {
            let key = require_credential(request.credential.clone(), "--auto-transcribe")?;
            let provider = provider_for(client, settings, &key);
            if verbose {
                eprintln!("No subtitles found; transcribing via {}", provider.name());
            }
            outcome = bilinote::pipeline::recover(client, settings, provider.as_ref(), &request, &lang).await?;
        }

        let rendered = match (&outcome, format) {
            (_, OutputFormat::Json) => render_json(&outcome)?,
            (ProcessingOutcome::Success { markdown, .. }, OutputFormat::Markdown) => markdown.clone(),
            (ProcessingOutcome::NeedsTranscription { guidance, .. }, OutputFormat::Markdown) => {
                eprintln!("{guidance}");
                continue;
            }
        };

        if let (true, ProcessingOutcome::Success { title, video_url, .. }) = (verbose, &outcome) {
            eprintln!("Video: {title}\nSource: {video_url}");
        }

        emit(&rendered, output.as_ref(), verbose)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();
    let settings = config.settings();
    let credential = config.credential(cli.key.as_deref());

    if cli.verbose {
        let config_path = bilinote::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }
    debug!("Settings: api_base={} rewrite_model={}", settings.api_base, settings.rewrite_model);

    let client = reqwest::Client::new();

    match cli.command {
        Command::Note(args) => run_note(&client, &settings, &config, credential, args, cli.verbose).await?,
        Command::Media { url } => {
            let media = bilinote::media::resolve_media_url(&client, &settings, &url).await?;
            if cli.verbose {
                eprintln!("Source: {}", media.source);
            }
            println!("{}", media.video_url);
        }
        Command::Transcribe { media_url, lang, json } => {
            let key = require_credential(credential, "transcription")?;
            let provider = provider_for(&client, &settings, &key);
            let result = transcribe(provider.as_ref(), &media_url, &lang, settings.transcribe_wait).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if cli.verbose {
                    eprintln!("Task: {} ({})", result.task_id, result.provider);
                }
                println!("{}\n", result.text);
                for seg in &result.segments {
                    println!("[{}-{}] {}", format_timestamp(seg.start), format_timestamp(seg.end), seg.text);
                }
            }
        }
    }

    Ok(())
}
