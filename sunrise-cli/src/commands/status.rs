//! Status command - list containers and their install state.

use console::style;
use sunrise::content_map::ContainerChecks;
use sunrise::manifest::Container;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

fn describe(checks: &ContainerChecks, container: &Container) -> String {
    if !checks.is_installed(&container.id) {
        style("not installed").dim().to_string()
    } else if checks.update_available(&container.id) {
        style("update available").yellow().to_string()
    } else {
        style("up to date").green().to_string()
    }
}

/// Run the status command.
pub fn run(options: &GlobalOptions) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    let catalog = runner.load_catalog()?;
    let cache = runner.load_cache()?;
    let mut checks = cache.container_checks;
    checks.refresh_remote(&catalog);

    println!("Install root: {}", runner.config().install_root().display());
    println!();

    println!("{}", style("Runtimes").bold());
    for runtime in catalog.runtimes() {
        println!(
            "  {:<20} {:<28} {:>5} files  {}",
            runtime.id,
            runtime.display_name(),
            runtime.files.len(),
            describe(&checks, runtime)
        );
    }

    println!();
    println!("{}", style("Applications").bold());
    for app in catalog.applications() {
        let runtime = app.runtime.as_deref().unwrap_or("-");
        println!(
            "  {:<20} {:<28} {:>5} files  runtime {:<12} {}",
            app.id,
            app.display_name(),
            app.files.len(),
            runtime,
            describe(&checks, app)
        );
    }

    let servers = catalog.servers();
    if !servers.is_empty() {
        println!();
        println!("{}", style("Servers").bold());
        for server in servers {
            println!(
                "  {:<20} {:<28} -> {}",
                server.id,
                server.display_name(),
                server.application.as_deref().unwrap_or("-")
            );
        }
    }

    // Persist the refreshed remote checks.
    runner.store().save(&cache.file_map, &checks)?;
    Ok(())
}
