//! `homunculus alias …`

use crate::sessions::print_json;
use crate::Context;
use clap::Subcommand;
use homunculus_core::aliases::validate_alias_name;
use homunculus_core::{AliasStore, SessionStore};
use std::path::Path;

#[derive(Subcommand)]
pub enum AliasCommand {
    /// Bind a name to a session (short id, file name, or path)
    Set {
        name: String,
        session: String,

        #[arg(long)]
        title: Option<String>,
    },

    /// Print the session path an alias points at
    Resolve { name: String },

    /// List aliases, most recently updated first
    List {
        /// Case-insensitive match on name or title
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    Delete { name: String },

    Rename { old_name: String, new_name: String },

    /// Set a title, or clear it when omitted
    Title { name: String, title: Option<String> },

    /// Remove aliases whose session file no longer exists
    Cleanup,
}

pub fn run(ctx: &Context, command: AliasCommand) -> Result<(), String> {
    let store = AliasStore::new(ctx.storage.aliases_file());

    match command {
        AliasCommand::Set {
            name,
            session,
            title,
        } => {
            validate_alias_name(&name).map_err(|e| e.to_string())?;
            let session_path = resolve_session_path(ctx, &session)?;
            let outcome = store
                .set(&name, &session_path, title.as_deref())
                .map_err(|e| e.to_string())?;
            let verb = if outcome.is_new { "Created" } else { "Updated" };
            println!("{} alias '{}' -> {}", verb, outcome.alias, outcome.session_path);
        }
        AliasCommand::Resolve { name } => {
            let resolved = store
                .resolve(&name)
                .ok_or_else(|| format!("Alias '{}' not found", name))?;
            println!("{}", resolved.session_path);
        }
        AliasCommand::List {
            search,
            limit,
            json,
        } => {
            let entries = store.list(search.as_deref(), limit);
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No aliases defined");
            }
            for entry in entries {
                match entry.title {
                    Some(title) => println!("{:<20} {}  ({})", entry.name, entry.session_path, title),
                    None => println!("{:<20} {}", entry.name, entry.session_path),
                }
            }
        }
        AliasCommand::Delete { name } => {
            let removed = store.delete(&name).map_err(|e| e.to_string())?;
            println!("Deleted alias '{}' (was {})", removed.name, removed.session_path);
        }
        AliasCommand::Rename { old_name, new_name } => {
            let outcome = store
                .rename(&old_name, &new_name)
                .map_err(|e| e.to_string())?;
            println!("Renamed '{}' to '{}'", outcome.old_alias, outcome.new_alias);
        }
        AliasCommand::Title { name, title } => {
            store
                .update_title(&name, title.as_deref())
                .map_err(|e| e.to_string())?;
            match title.filter(|t| !t.is_empty()) {
                Some(title) => println!("Set title of '{}' to \"{}\"", name, title),
                None => println!("Cleared title of '{}'", name),
            }
        }
        AliasCommand::Cleanup => {
            let report = store
                .cleanup(|path| Path::new(path).exists())
                .map_err(|e| e.to_string())?;
            for removed in &report.removed_aliases {
                println!("Removed '{}' ({})", removed.name, removed.session_path);
            }
            println!(
                "Checked {} alias(es), removed {}",
                report.total_checked, report.removed
            );
        }
    }
    Ok(())
}

/// Session argument to the absolute path stored in the alias.
fn resolve_session_path(ctx: &Context, session: &str) -> Result<String, String> {
    let store = SessionStore::new(ctx.storage.sessions_dir());
    if let Some(detail) = store.get_by_id(session, false) {
        return Ok(detail.summary.session_path.to_string_lossy().into_owned());
    }
    let path = Path::new(session);
    if path.is_file() {
        let absolute = fs_err::canonicalize(path).map_err(|e| e.to_string())?;
        return Ok(absolute.to_string_lossy().into_owned());
    }
    Err(format!("Session not found: {}", session))
}
