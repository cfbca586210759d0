use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use uniondump::cli::{Cli, Commands};
use uniondump::{
    CancelFlag, ConsoleReporter, HttpMethod, JsonExporter, ScanConfig, ScanReport, ScanResult,
    Tamper, scan_with_http,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            url,
            param,
            method,
            timeout,
            tamper,
            proxy,
            cookie,
            user_agent,
            headers,
            rate,
            max_columns,
            marker,
            output,
            verbose,
        } => {
            init_tracing(verbose);

            let method = HttpMethod::parse(&method).ok_or_else(|| {
                anyhow!("Invalid HTTP method: '{}'. Supported: GET, POST", method)
            })?;
            url::Url::parse(&url).with_context(|| format!("Invalid target URL: {}", url))?;

            let unknown: Vec<&String> = tamper
                .iter()
                .filter(|t| Tamper::from_name(t).is_none())
                .collect();
            if !unknown.is_empty() {
                eprintln!(
                    "{} ignoring unknown tamper(s): {}",
                    "warning:".yellow().bold(),
                    unknown.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
                );
            }

            let config = ScanConfig::new(url, param)
                .with_method(method)
                .with_timeout(timeout)
                .with_tampers(tamper)
                .with_proxy(proxy)
                .with_cookies(cookie)
                .with_user_agent(user_agent)
                .with_headers(headers.into_iter().collect::<HashMap<_, _>>())
                .with_rate(rate)
                .with_max_columns(max_columns)
                .with_marker(marker);

            let result = run_scan(config.clone()).await?;
            print_result(&result);

            if let Some(path) = output {
                JsonExporter::export(&ScanReport::new(config, result), &path)?;
                println!("Report written to {}", path.cyan());
            }
        }

        Commands::Report { input } => {
            let report = JsonExporter::load(&input)?;
            println!(
                "{} {} (param '{}', {})",
                "Target:".bold(),
                report.config.url,
                report.config.param,
                report.scan_time
            );
            print_result(&report.result);
        }

        Commands::Tampers => {
            println!("{}", "Available tamper transforms".bold().underline());
            for tamper in Tamper::all() {
                println!("  {:<15} {}", tamper.name().cyan(), tamper.description());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "uniondump=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the blocking scan on a worker thread and streams its progress to the
/// terminal until the worker drops its end of the channel.
async fn run_scan(config: ScanConfig) -> Result<ScanResult> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancelFlag::new();

    let worker_cancel = cancel.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let mut sink = tx;
        scan_with_http(config, worker_cancel, &mut sink)
    });

    let pb = create_spinner();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    pb.println(ConsoleReporter::format_event(&event));
                    pb.set_message(event.message);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if cancel.interrupt() {
                    pb.abandon_with_message("Aborted");
                    std::process::exit(130);
                }
                pb.println(
                    "Interrupted, stopping after the current probe (Ctrl-C again to abort)..."
                        .yellow()
                        .to_string(),
                );
            }
        }
    }

    pb.finish_and_clear();
    worker.await.context("Scan worker failed")
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_result(result: &ScanResult) {
    let reporter = ConsoleReporter::new();
    reporter.print_summary(result);
    reporter.print_schema(result);
    reporter.print_data(result);
}
