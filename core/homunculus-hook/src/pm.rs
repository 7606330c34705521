//! `homunculus pm …`: package manager detection and preferences.

use crate::Context;
use clap::Subcommand;
use homunculus_core::package_manager::{self, ResolvedPackageManager};
use homunculus_core::{process, PackageManager, ResolveOptions};

#[derive(Subcommand)]
pub enum PmCommand {
    /// Show the resolved package manager and where it came from
    Detect,

    /// Store a preference (global unless --project)
    Set {
        name: String,

        #[arg(long)]
        project: bool,
    },

    /// Print the command for install/test/build/dev or a package script
    Run { script: String },

    /// Print the command that executes a package binary
    Exec {
        binary: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print a regex matching the action under any package manager
    Pattern { action: String },
}

fn resolve(ctx: &Context) -> ResolvedPackageManager {
    package_manager::resolve_package_manager(
        &ResolveOptions::new(&ctx.storage, &ctx.env),
        process::command_exists,
    )
}

pub fn run(ctx: &Context, command: PmCommand) -> Result<(), String> {
    match command {
        PmCommand::Detect => {
            let resolved = resolve(ctx);
            let profile = resolved.manager.profile();
            println!("Package manager: {} ({})", resolved.manager, resolved.source);
            println!("  install: {}", profile.install_cmd);
            println!("  run:     {} <script>", profile.run_cmd);
            println!("  exec:    {} <binary>", profile.exec_cmd);
            if resolved.source.is_guess() {
                let available = package_manager::available_package_managers(process::command_exists);
                print!(
                    "\n{}",
                    package_manager::selection_prompt(&available, resolved.manager)
                );
            }
        }
        PmCommand::Set { name, project } => {
            let manager: PackageManager = name.parse().map_err(String::from)?;
            if project {
                package_manager::set_project(ctx.storage.project_root(), manager)
                    .map_err(String::from)?;
                println!(
                    "Project package manager set to {} ({})",
                    manager,
                    ctx.storage.project_package_manager_file().display()
                );
            } else {
                package_manager::set_preferred(&ctx.storage.global_package_manager_file(), manager)
                    .map_err(String::from)?;
                println!("Global package manager set to {}", manager);
            }
        }
        PmCommand::Run { script } => println!("{}", resolve(ctx).run_command(&script)),
        PmCommand::Exec { binary, args } => println!("{}", resolve(ctx).exec_command(&binary, &args)),
        PmCommand::Pattern { action } => println!("{}", package_manager::command_pattern(&action)),
    }
    Ok(())
}
