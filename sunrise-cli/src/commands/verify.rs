//! Verify command - check an existing install without downloading.

use crate::commands::session::{run_session, SessionKind};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the verify command.
pub struct VerifyArgs {
    pub id: String,
    pub full: bool,
    pub fast: bool,
}

/// Run the verify command.
pub fn run(options: &GlobalOptions, args: VerifyArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("verify");

    let catalog = runner.load_catalog()?;
    let containers = runner.resolve(&catalog, &args.id, None)?;

    let mode = match (args.full, args.fast) {
        (true, _) => "full",
        (false, true) => "size only",
        (false, false) => "changed files",
    };
    println!("Verifying {} ({})", args.id, mode);

    let mut engine = runner.config().downloader_config();
    if args.fast {
        engine = engine.with_fast_check(true);
    }

    run_session(
        &runner,
        &catalog,
        containers,
        SessionKind::Verify { full: args.full },
        engine,
    )
}
