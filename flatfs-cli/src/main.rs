mod command;
mod logger;

use std::env;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use command::Command;
use flatfs::DEFAULT_IMAGE;

const IMAGE_VAR: &str = "FLATFS_IMAGE";

fn main() {
    logger::init();
    if let Err(error) = run() {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cmd = match Command::parse(env::args().skip(1)) {
        Some(cmd) => cmd,
        None => return Ok(()),
    };
    let halt = cmd == Command::Crash;

    let image = env::var_os(IMAGE_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE));
    log::debug!("Using image {}.", image.display());

    let output = command::execute(&image, cmd)?;
    println!("{}", output);

    if halt {
        // Go down without any further cleanup, as a real crash would.
        std::io::stdout().flush()?;
        std::process::exit(0);
    }
    Ok(())
}
