use std::io;

use clap::Parser;

use data_maker::cli::Cli;
use data_maker::runner;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Coordinates own stdout; logs share stderr with the run diagnostics.
    simplelog::TermLogger::init(
        cli.log_level(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let config = cli.into_config().unwrap_or_else(|e| e.exit());
    log::debug!("config = {:?}", config);

    // The runner buffers coordinates itself.
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut diag = stderr.lock();

    runner::run(&config, &mut out, &mut diag)?;

    Ok(())
}
