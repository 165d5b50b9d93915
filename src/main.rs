use clap::Parser;
use std::process::ExitCode;

use mailprobe::cli::{Args, ReportStyle, Runner, Selection, NOTHING_SELECTED};
use mailprobe::{logging, MemoryStore, NetworkConnector, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let selection = args.selection();
    if selection == Selection::Nothing {
        println!("{NOTHING_SELECTED}");
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            eprintln!("mailprobe: {e}");
            return ExitCode::FAILURE;
        }
    };
    let options = settings.options();
    let store = MemoryStore::from(settings);
    let runner = Runner::new(&store, NetworkConnector, options, ReportStyle::Command);

    let mut out = std::io::stdout().lock();
    match runner.run(selection, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("writing report failed: {e}");
            ExitCode::FAILURE
        }
    }
}
