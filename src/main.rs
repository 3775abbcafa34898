mod browse;
mod cli;
mod compare;
mod error;
mod files;
mod fingerprint;
mod loader;
mod session;
mod triage;
mod ui;
mod zoom;

use clap::Parser;
use std::process::ExitCode;
use winit::event_loop::EventLoop;

use crate::cli::Cli;
use crate::session::Session;
use crate::ui::App;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let budget = cli.memory_budget();
    log::debug!("Decode cache budget: {} bytes", budget);

    let mut session = match Session::open(&cli.path, cli.name_filter(), cli.views as usize, budget) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    session.show_fingerprint = cli.fingerprint;

    for dir in &cli.compare {
        if let Err(e) = session.add_folder(dir) {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let event_loop = match EventLoop::new() {
        Ok(l) => l,
        Err(e) => {
            log::error!("Could not create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(session);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
