//! lum - live Markdown preview server.

mod cli;
mod config;
mod control;
mod core;
mod embed;
mod hub;
mod logger;
mod registry;
mod render;
mod serve;
mod utils;
mod watch;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{} {:#}", logger::error_label(), e);
        std::process::exit(1);
    }
}
