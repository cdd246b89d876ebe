use crate::config::Config;
use crate::source::HexLineSource;
use std::fs::File;
use std::io::{BufReader, BufWriter};

fn main() {
    let config = Config::from_file().unwrap_or_else(|err| {
        let mut message = format!("Config initialization failed. Error: {err}.");
        if let Some(additional_info) = err.additional_info() {
            message.push_str(&format!(" Additional_info: {additional_info}"));
        }
        eprintln!("{}", message);
        std::process::exit(1);
    });

    logging::setup(&config).unwrap_or_else(|err| {
        let mut message = format!("Logger initialization failed. Error: {err}.");
        if let Some(additional_info) = err.additional_info() {
            message.push_str(&format!(" Additional_info: {additional_info}"));
        }
        eprintln!("{}", message);
        std::process::exit(1);
    });

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    // Frames come from the file given as the first argument, or stdin
    let result = match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).unwrap_or_else(|err| {
                log::error!("Failed to open {}. {}", path, err);
                std::process::exit(1);
            });
            let mut source = HexLineSource::new(BufReader::new(file), config.snapshot_length);
            core::start(&mut source, &mut out, &config)
        },
        None => {
            let stdin = std::io::stdin();
            let mut source = HexLineSource::new(stdin.lock(), config.snapshot_length);
            core::start(&mut source, &mut out, &config)
        },
    };

    match result {
        Ok(statistics) => log::info!(
            "Frames read: {}, dissected: {}, dropped: {}, rejected lines: {}.",
            statistics.read,
            statistics.dissected,
            statistics.dropped,
            statistics.rejected
        ),
        Err(err) => {
            let mut message = format!("Dissection failed. Error: {err}.");
            if let Some(additional_info) = err.additional_info() {
                message.push_str(&format!(" Additional_info: {additional_info}"));
            }
            log::error!("{}", message);
            std::process::exit(1);
        },
    }
}

mod config;
mod core;
mod logging;
mod source;
