//! Standalone variant of `mailprobe` with the long-form report.

use clap::{CommandFactory, Parser};
use std::process::ExitCode;

use mailprobe::cli::{Args, ReportStyle, Runner, Selection};
use mailprobe::{logging, MemoryStore, NetworkConnector, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let selection = args.selection();
    if selection == Selection::Nothing {
        return match Args::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("test-connections: {e}");
            return ExitCode::FAILURE;
        }
    };
    let options = settings.options();
    let store = MemoryStore::from(settings);
    let runner = Runner::new(&store, NetworkConnector, options, ReportStyle::Script);

    let mut out = std::io::stdout().lock();
    match runner.run(selection, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("writing report failed: {e}");
            ExitCode::FAILURE
        }
    }
}
