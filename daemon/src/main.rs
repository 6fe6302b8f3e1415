mod args;

use crate::args::Args;
use clap::Parser;
use env_logger::Env;
use nodelog_common::api::Client;
use nodelog_common::config;
use nodelog_common::errors::*;

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before clap reads env overrides
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "info",
        1 => "nodelog=debug,nodelog_common=debug,info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    let mut config = config::load(args.config.as_deref())?;
    if let Some(path) = args.store {
        config.store.path = Some(path);
    }
    if args.update {
        config.refresh.force_update();
    }

    if args.check_config {
        println!("{:#?}", config);
        return Ok(());
    }

    let client = Client::new(&config, args.endpoint)?;
    nodelog::run_daemon(config, client, args.once).await
}
