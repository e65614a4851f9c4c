use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use zonewright::config::Config;
use zonewright::db::PostgresBackend;
use zonewright::exec::ShellCommander;
use zonewright::net::{AddressLister, SystemAddresses};
use zonewright::resolver::CachingResolver;
use zonewright::updater::ZoneUpdater;
use zonewright::Result;

#[derive(Parser)]
#[command(name = "zonewright", about = "Generate, version and sign NSD zones from a database")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "zonewright.toml")]
    config: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config)?;
    let addresses = SystemAddresses.local_addresses()?;
    let commander = ShellCommander;
    let resolver = CachingResolver::from_system_conf()?;

    let updater = ZoneUpdater::new(&config, &commander, &resolver, &addresses)?;
    let mut backend = PostgresBackend::connect(
        &config.db_host,
        config.db_port,
        &config.db_user,
        &config.db_password,
        &config.db_name,
    )?;
    updater.run(&mut backend)
}
