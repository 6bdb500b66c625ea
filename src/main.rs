use clap::Parser;

use creo_discovery::config::Config;

/// Entry point of the Creo Discovery tool.
///
/// Prints a JSON report of how the raw factory treats every given cgroup name.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug creo-discovery --docker-only --raw-cgroup-prefix-whitelist /docker/ / /docker/abc
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = Config::parse();
    let report = creo_discovery::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
