//! Process compatibility status command.

use console::style;

use crate::cli::icons::{dim_arrow, error, success, warn};
use lios::config::Settings;
use lios::{CompatibilityStatus, RuntimeVersion};

pub fn cmd_status(settings: &Settings, force: bool, json: bool) -> anyhow::Result<()> {
    let controller = settings.compatibility_controller();
    let outcome = controller.initialize(force);
    let status = controller.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        outcome?;
        return Ok(());
    }

    if let Err(ref e) = outcome {
        eprintln!("{} {}", error(), e);
    }
    print_status(&status, settings.isolation);
    outcome?;
    Ok(())
}

fn print_status(status: &CompatibilityStatus, isolation: bool) {
    println!("\n{}", style("Process Compatibility").bold());
    println!("{}", "-".repeat(40));
    println!("  {:<20} {}", "Runtime version", status.version);
    println!(
        "  {:<20} {}",
        "Workaround needed",
        if status.needs_workaround { "yes" } else { "no" }
    );
    println!(
        "  {:<20} {}",
        "Start method",
        status
            .active_method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unset".to_string())
    );
    println!(
        "  {:<20} {}",
        "Initialized",
        if status.initialized { "yes" } else { "no" }
    );
    println!();

    if !status.compatible {
        println!(
            "{} Worker processes are unsafe here; recognition runs in-process",
            warn()
        );
    } else if !isolation {
        println!(
            "{} Compatible, but isolation is disabled in config",
            success()
        );
    } else {
        println!("{} Recognition can run in worker processes", success());
    }
    if status.version == RuntimeVersion::default() {
        println!(
            "  {} Set LIOS_RUNTIME_VERSION or runtime_version to describe the host runtime",
            dim_arrow()
        );
    }
}
