use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use nodelog_common::errors::*;
use nodelog_common::JobFilter;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Verbose logging
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    /// Jenkins url to talk to
    #[arg(short = 'H', long, global = true, env = "NODELOG_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Path to the sqlite database
    #[arg(long, global = true, env = "NODELOG_STORE")]
    pub store: Option<PathBuf>,
    /// Bypass tty detection and always use colors
    #[arg(short = 'C', long, global = true)]
    pub color: bool,
    #[command(subcommand)]
    pub subcommand: SubCommand,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Job related subcommands
    #[command(subcommand)]
    Jobs(Jobs),
    /// Fetch and print builds without touching the store
    Builds(Builds),
    /// Fetch new builds of all tracked jobs into the store
    Refresh(Refresh),
    /// Write stored builds as csv
    Export(Export),
    /// Show what every node is currently building
    Executors(Executors),
    /// Find the ip address of nodes from their agent log
    NodeIp(NodeIp),
    /// Generate shell completions
    Completions(Completions),
}

#[derive(Debug, Parser)]
pub enum Jobs {
    /// List jobs known to jenkins
    Ls(JobsList),
    /// Start tracking jobs
    Track(JobsTrack),
    /// Print top-level fields of each job's config.xml
    Config(JobsConfig),
}

#[derive(Debug, Default, Parser)]
pub struct FilterArgs {
    /// Only jobs containing this string
    #[arg(long, group = "filter")]
    pub contains: Option<String>,
    /// Only jobs starting with this prefix
    #[arg(long, group = "filter")]
    pub prefix: Option<String>,
    /// Only jobs matching this regex
    #[arg(long, group = "filter")]
    pub regex: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<JobFilter> {
        if let Some(needle) = &self.contains {
            Ok(JobFilter::Contains(needle.clone()))
        } else if let Some(prefix) = &self.prefix {
            Ok(JobFilter::Prefix(prefix.clone()))
        } else if let Some(re) = &self.regex {
            JobFilter::regex(re)
        } else {
            Ok(JobFilter::All)
        }
    }
}

#[derive(Debug, Parser)]
pub struct JobsList {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Only list jobs that are already tracked
    #[arg(long)]
    pub tracked: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct JobsTrack {
    /// Names of the jobs to track
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct JobsConfig {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Top-level config.xml elements to print, e.g. assignedNode
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct Builds {
    #[arg(required = true)]
    pub jobs: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct Refresh {
    /// Also overwrite builds that are already stored
    #[arg(long)]
    pub update: bool,
}

#[derive(Debug, Parser)]
pub struct Export {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct Executors {
    /// Only nodes whose name contains all of these
    pub patterns: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct NodeIp {
    /// Only nodes whose name contains all of these
    pub patterns: Vec<String>,
}

pub fn node_matches(node: &str, patterns: &[String]) -> bool {
    patterns.iter().all(|p| node.contains(p.as_str()))
}

#[derive(Debug, Parser)]
pub struct Completions {
    pub shell: Shell,
}

pub fn gen_completions(args: &Completions) -> Result<()> {
    clap_complete::generate(
        args.shell,
        &mut Args::command(),
        "nodelogctl",
        &mut io::stdout(),
    );
    Ok(())
}
