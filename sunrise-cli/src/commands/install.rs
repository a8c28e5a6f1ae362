//! Install command - download a runtime or application.

use crate::commands::session::{run_session, SessionKind};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the install command.
pub struct InstallArgs {
    pub id: String,
    pub runtime: Option<String>,
    pub full_verify: bool,
}

/// Run the install command.
pub fn run(options: &GlobalOptions, args: InstallArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("install");

    let catalog = runner.load_catalog()?;
    let containers = runner.resolve(&catalog, &args.id, args.runtime)?;

    println!("Installing {}", args.id);
    for container in &containers {
        println!(
            "  {:<24} {} file(s) -> {}",
            container.name(),
            container.files.len(),
            container.destination.display()
        );
    }
    println!("Press Ctrl+C to pause");
    println!();

    let mut engine = runner.config().downloader_config();
    if args.full_verify {
        engine = engine.with_full_verify(true);
    }

    run_session(&runner, &catalog, containers, SessionKind::Download, engine)
}
