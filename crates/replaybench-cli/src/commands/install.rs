// Config scaffolding command

use crate::output::{print_field, OutputFormat};
use anyhow::Result;
use replaybench_core::{InstallAction, Installer};
use std::path::Path;

pub fn run(app_root: Option<&Path>, dry_run: bool, output: OutputFormat) -> Result<()> {
    let installer = Installer::for_app_root(app_root)?.dry_run(dry_run);
    let actions = installer.install()?;

    if !output.is_text() {
        return output.print_value(&actions);
    }

    if dry_run {
        println!("Dry run, nothing written");
    }
    for action in &actions {
        match action {
            InstallAction::Created { path } => print_field("created", &path.display().to_string()),
            InstallAction::Skipped { path } => print_field("exists", &path.display().to_string()),
            InstallAction::AppendedEnvironment { path, environment } => print_field(
                "appended",
                &format!("{} ({})", path.display(), environment),
            ),
        }
    }
    Ok(())
}
