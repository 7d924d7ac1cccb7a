//! auralize - real-time binaural auralization console
//!
//! Run with: cargo run -- --config auralize.toml

use std::path::PathBuf;

use auralize::{
    config::SystemConfig,
    runtime::{ExitStatus, System, TerminalInput},
};
use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};

#[derive(Parser, Debug)]
#[command(version, about = "Real-time binaural auralization with an FDN late tail")]
struct Args {
    /// TOML configuration; defaults are used when the file does not exist.
    #[arg(short, long, default_value = "auralize.toml")]
    config: PathBuf,

    /// Print the effective configuration and exit.
    #[arg(long)]
    show_config: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = SystemConfig::load_or_default(&args.config)
        .wrap_err_with(|| format!("failed to load {}", args.config.display()))?;

    if args.show_config {
        let text = config
            .to_toml()
            .map_err(|err| eyre!("cannot print configuration: {err}"))?;
        println!("{text}");
        return Ok(());
    }

    let system = System::new(config).wrap_err("invalid configuration")?;
    system
        .install_signal_handler()
        .wrap_err("failed to install signal handler")?;

    let status = system
        .run(TerminalInput::new())
        .wrap_err("auralization session failed")?;
    println!("Quit");

    if status != ExitStatus::Normal {
        std::process::exit(status.code());
    }
    Ok(())
}
