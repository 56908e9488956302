use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use tubesum_core::{
    Browser, Config, InjectOutcome, Tab, TabId,
    browser::{BrowserError, cdp::CdpBrowser},
    events::BusConfig,
};

use crate::{
    pipeline::start_pipeline,
    workers::{
        cli_completion_sink::RunStage,
        events::{PromptSubmitted, VideoTabRequested},
    },
};

mod pipeline;
mod workers;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

#[derive(Parser)]
#[command(name = "tubesum")]
#[command(
    about = "Reload a YouTube video tab, grab its transcript, and ask ChatGPT for a bullet-point summary"
)]
#[command(version)]
struct Cli {
    /// DevTools target id of the video tab. Defaults to the active tab.
    #[arg(short, long)]
    tab: Option<String>,

    /// Chrome remote-debugging endpoint (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Chat page to open (overrides the config file)
    #[arg(long)]
    chat_url: Option<String>,

    /// Config file. Defaults to <config dir>/tubesum/config.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// The tab named by `--tab`, or the focused one.
async fn resolve_tab(browser: &dyn Browser, id: Option<String>) -> Result<Tab, BrowserError> {
    match id {
        Some(id) => browser.tab(&TabId(id)).await,
        None => browser.active_tab().await,
    }
}

fn report_success(spinner: &ProgressBar, submitted: &PromptSubmitted, elapsed: Duration) {
    match &submitted.outcome {
        InjectOutcome::Skipped => spinner.finish_with_message(format!(
            "{} Transcript was empty, nothing submitted {}",
            style("!").yellow().bold(),
            style(format!("[{}]", format_duration(elapsed))).dim()
        )),
        InjectOutcome::Submitted {
            bullet_count,
            submit,
            ..
        } => {
            spinner.finish_with_message(format!(
                "{} Prompt submitted: {} bullet points {}",
                style("✓").green().bold(),
                bullet_count,
                style(format!("[{}]", format_duration(elapsed))).dim()
            ));
            if submit.button.is_none() {
                println!(
                    "{} {}",
                    style("!").yellow().bold(),
                    style("No send button matched; check the chat tab.").dim()
                );
            }
            println!(
                "\n{} {}\n",
                style("Chat tab:").dim(),
                style(&submitted.tab_id).cyan()
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.cdp_endpoint = endpoint;
    }
    if let Some(chat_url) = cli.chat_url {
        config.chat_url = chat_url;
    }

    println!(
        "\n{}  {}\n",
        style("tubesum").cyan().bold(),
        style("Video Summariser").dim()
    );

    let spinner = create_spinner("Connecting to Chrome...");
    let browser: Arc<dyn Browser> = match CdpBrowser::connect(&config.cdp_endpoint).await {
        Ok(browser) => Arc::new(browser),
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let tab = match resolve_tab(browser.as_ref(), cli.tab).await {
        Ok(tab) => tab,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    spinner.finish_with_message(format!(
        "{} Connected: {}",
        style("✓").green().bold(),
        style(&tab.url).dim()
    ));

    println!("{}", style("─".repeat(60)).dim());

    let start = Instant::now();
    let mut handle = start_pipeline(BusConfig::default(), browser, &config).await?;
    handle.bus.publish(Arc::new(VideoTabRequested::new(tab)));

    let spinner = create_spinner(RunStage::Reloading.message());
    let run = loop {
        tokio::select! {
            Some(stage) = handle.stages_rx.recv() => spinner.set_message(stage.message()),
            done = &mut handle.done_rx => break done?,
        }
    };
    let _ = handle.shutdown_tx.send(());

    match run {
        Ok(submitted) => {
            report_success(&spinner, &submitted, start.elapsed());
            Ok(())
        }
        Err(failed) => {
            spinner.finish_and_clear();
            match &failed.alert {
                Some(alert) => eprintln!("{} {}", style("Alert:").yellow().bold(), alert),
                None => eprintln!("{} {}", style("Error:").red().bold(), failed.message),
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use tubesum_core::browser::fake::FakeBrowser;

    use super::*;

    #[tokio::test]
    async fn explicit_tab_wins_over_focused_one() {
        let browser = FakeBrowser::new()
            .with_tab("focused", "https://example.com/")
            .with_tab("video", "https://www.youtube.com/watch?v=x");

        let tab = resolve_tab(&browser, Some("video".into())).await.unwrap();
        assert_eq!(tab.id, TabId::from("video"));

        let tab = resolve_tab(&browser, None).await.unwrap();
        assert_eq!(tab.id, TabId::from("focused"));
    }

    #[tokio::test]
    async fn tab_lookup_failures_are_returned() {
        let browser = FakeBrowser::new();

        assert!(matches!(
            resolve_tab(&browser, Some("gone".into())).await,
            Err(BrowserError::TabNotFound(_))
        ));
        assert!(matches!(
            resolve_tab(&browser, None).await,
            Err(BrowserError::NoActiveTab)
        ));
    }

    #[test]
    fn durations_switch_to_minutes() {
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(119)), "1m 59s");
    }
}
