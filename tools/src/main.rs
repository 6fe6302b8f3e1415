use crate::args::*;
use crate::fancy::{Fancy, Host};
use clap::Parser;
use colored::*;
use env_logger::Env;
use nodelog::fetch::{BuildSource, JenkinsSource};
use nodelog::jobs::{self, TrackOutcome};
use nodelog::refresh::{Coordinator, RefreshOptions, RefreshReport};
use nodelog::Store;
use nodelog_common::api::Client;
use nodelog_common::config::ConfigFile;
use nodelog_common::errors::*;
use nodelog_common::utils;
use nodelog_common::{Build, JobFilter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::io::prelude::*;

pub mod args;
pub mod fancy;

fn print_json<S: Serialize>(x: &S) -> Result<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &x)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn open_store(config: &ConfigFile) -> Result<Store> {
    let path = config.store.path();
    Store::open(&path).with_context(|| anyhow!("Failed to open store at {:?}", path))
}

fn print_build<W: Write>(w: &mut W, build: &Build) -> io::Result<()> {
    let started_at = build
        .started_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let mut line = format!(
        "{} {:>5} {:>11} {:19} {} {}",
        build.job.bold(),
        format!("#{}", build.number),
        utils::ms_to_human(build.duration).green(),
        started_at.bright_black(),
        build.fancy_result(),
        Host(build).fancy(),
    );
    if let (Some(failed), Some(total)) = (build.failed, build.total) {
        line.push_str(&format!(" ({}/{} tests failed)", failed, total));
    }
    writeln!(w, "{}", line)
}

fn print_report(report: &RefreshReport) {
    println!(
        "Refreshed {} jobs: {} builds added, {} updated",
        report.jobs.to_string().bold(),
        report.inserted.to_string().green(),
        report.updated.to_string().yellow(),
    );
    for skipped in &report.skipped {
        println!("{} {}: {}", "skipped".red(), skipped.job.bold(), skipped.reason);
    }
    for degraded in &report.degraded {
        println!(
            "{} {} #{}: {}",
            "no host".yellow(),
            degraded.job.bold(),
            degraded.number,
            degraded.host
        );
    }
    for failed in &report.failed_writes {
        println!(
            "{} {} #{}: {}",
            "write failed".red(),
            failed.job.bold(),
            failed.number,
            failed.reason
        );
    }
    if report.cancelled {
        println!("{}", "Refresh was interrupted".yellow());
    }
}

async fn list_jobs(client: &Client, config: &ConfigFile, ls: JobsList) -> Result<()> {
    let filter = ls.filter.to_filter()?;
    let mut remote = client
        .list_jobs(&filter)
        .await
        .context("Failed to list jobs")?;

    let tracked = jobs::tracked_names(&config.store.path())?;
    if ls.tracked {
        remote.retain(|job| tracked.contains(&job.name));
    }

    if ls.json {
        print_json(&remote)?;
    } else {
        let mut stdout = io::stdout();
        for job in remote {
            let marker = if tracked.contains(&job.name) {
                "*".green()
            } else {
                " ".normal()
            };
            if writeln!(stdout, "{} {:-50} {}", marker, job.name.bold(), job.url).is_err() {
                break;
            }
        }
    }
    Ok(())
}

async fn show_job_config(client: &Client, args: JobsConfig) -> Result<()> {
    let filter = args.filter.to_filter()?;
    let remote = client
        .list_jobs(&filter)
        .await
        .context("Failed to list jobs")?;

    let mut stdout = io::stdout();
    for job in remote {
        let config = match client.fetch_job_config(&job.name).await {
            Ok(config) => config,
            Err(err) => {
                let err = Error::from(err);
                warn!("Could not fetch config of {:?}: {:#}", job.name, err);
                continue;
            }
        };
        for field in &args.fields {
            let value = config.get(field).map(String::as_str).unwrap_or_default();
            if writeln!(stdout, "{}\t{}\t{}", job.name, field, value).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn track_jobs(client: &Client, config: &ConfigFile, track: JobsTrack) -> Result<()> {
    let remote = client
        .list_jobs(&JobFilter::All)
        .await
        .context("Failed to list jobs")?;
    let mut store = open_store(config)?;

    let outcomes = jobs::track_jobs(&mut store, &remote, &track.names);
    let mut failed = 0;
    for (name, outcome) in &outcomes {
        println!("{:-50} => {}", name.bold(), outcome.fancy());
        if matches!(outcome, TrackOutcome::NotFound | TrackOutcome::Failed(_)) {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("Failed to track {} of {} jobs", failed, outcomes.len());
    }
    Ok(())
}

async fn show_builds(client: Client, config: &ConfigFile, builds: Builds) -> Result<()> {
    let remote = client
        .list_jobs(&JobFilter::All)
        .await
        .context("Failed to list jobs")?;
    let source = JenkinsSource::new(client, config.refresh.host_concurrency());

    let mut all = Vec::new();
    for name in &builds.jobs {
        let job = remote
            .iter()
            .find(|job| &job.name == name)
            .ok_or_else(|| format_err!("Job not found on server: {:?}", name))?;
        let fetched = source
            .fetch_builds(job)
            .await
            .with_context(|| anyhow!("Failed to fetch builds of {:?}", name))?;
        all.extend(fetched);
    }

    if builds.json {
        print_json(&all)?;
    } else {
        let mut stdout = io::stdout();
        for build in &all {
            if print_build(&mut stdout, build).is_err() {
                break;
            }
        }
    }
    Ok(())
}

async fn refresh(client: Client, config: &ConfigFile, args: Refresh) -> Result<()> {
    let source = JenkinsSource::new(client, config.refresh.host_concurrency());
    let coordinator = Coordinator::new(
        config.store.path(),
        source,
        RefreshOptions::from(&config.refresh),
    );
    let update_existing = args.update || config.refresh.update_existing();

    let report = coordinator
        .refresh_until(update_existing, nodelog::shutdown_signal())
        .await
        .context("Refresh failed")?;
    print_report(&report);

    if let Some(err) = report.commit_error {
        bail!("Failed to commit refresh: {}", err);
    }
    Ok(())
}

fn export(config: &ConfigFile, args: Export) -> Result<()> {
    let filter = args.filter.to_filter()?;
    let mut store = open_store(config)?;

    let rows = if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| anyhow!("Failed to create output file {:?}", path))?;
        nodelog::export::export_csv(&mut store, &filter, io::BufWriter::new(file))?
    } else {
        nodelog::export::export_csv(&mut store, &filter, io::stdout().lock())?
    };
    info!("Exported {} builds", rows);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    if args.color {
        debug!("Bypass tty detection and always use colors");
        colored::control::set_override(true);
    }

    let mut config =
        nodelog_common::config::load(args.config).context("Failed to load config file")?;
    if let Some(path) = args.store {
        config.store.path = Some(path);
    }

    // completions don't need a jenkins url
    if let SubCommand::Completions(completions) = &args.subcommand {
        return args::gen_completions(completions);
    }
    let client = Client::new(&config, args.endpoint)?;

    match args.subcommand {
        SubCommand::Jobs(Jobs::Ls(ls)) => list_jobs(&client, &config, ls).await?,
        SubCommand::Jobs(Jobs::Track(track)) => track_jobs(&client, &config, track).await?,
        SubCommand::Jobs(Jobs::Config(args)) => show_job_config(&client, args).await?,
        SubCommand::Builds(builds) => show_builds(client, &config, builds).await?,
        SubCommand::Refresh(args) => refresh(client, &config, args).await?,
        SubCommand::Export(args) => export(&config, args)?,
        SubCommand::Executors(args) => {
            let executors = client
                .list_executors()
                .await?
                .into_iter()
                .filter(|e| node_matches(&e.node, &args.patterns))
                .collect::<Vec<_>>();

            if args.json {
                print_json(&executors)?;
            } else {
                let mut stdout = io::stdout();
                for executor in executors {
                    let status = if let Some(build) = &executor.build {
                        build.bold()
                    } else {
                        "idle".blue()
                    };
                    if writeln!(stdout, "{:-40} => {}", executor.node.green(), status).is_err() {
                        break;
                    }
                }
            }
        }
        SubCommand::NodeIp(args) => {
            let nodes = client
                .list_executors()
                .await?
                .into_iter()
                .map(|e| e.node)
                .filter(|node| node_matches(node, &args.patterns))
                .collect::<BTreeSet<_>>();

            for node in nodes {
                match client.fetch_node_ip(&node).await {
                    Ok(ip) => println!("{:-40} => {}", node.green(), ip.bold()),
                    Err(err) => {
                        let err = Error::from(err);
                        println!("{:-40} => {}", node.green(), format!("{:#}", err).red());
                    }
                }
            }
        }
        SubCommand::Completions(_) => (),
    }

    Ok(())
}
