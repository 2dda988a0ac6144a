// GUI-subsystem binary: no console window is ever allocated by Windows.
// CLI mode (--input/-i flag present) runs headless and prints to the
// launching terminal via the attached console.
#![windows_subsystem = "windows"]

mod app;
mod cli;
mod clipboard;
mod context;
mod events;
mod geometry;
mod io;
pub mod logger;
mod project;
mod session;
mod surface;
mod tools;

use app::InkmarkApp;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Inkmark"),
        ..Default::default()
    };

    eframe::run_native(
        "Inkmark",
        options,
        Box::new(|cc| Box::new(InkmarkApp::new(cc))),
    )
}
