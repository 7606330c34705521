//! `homunculus sessions …`

use crate::Context;
use clap::Subcommand;
use homunculus_core::sessions::{format_size, DEFAULT_LIST_LIMIT};
use homunculus_core::{AliasStore, SessionDetail, SessionListOptions, SessionStore};
use std::path::Path;

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List session records, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only sessions from this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Substring of the short id
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show one session by short id, file name, or alias
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete a session file by short id, file name, or alias
    Delete { id: String },
}

pub fn run(ctx: &Context, command: SessionsCommand) -> Result<(), String> {
    let store = SessionStore::new(ctx.storage.sessions_dir());
    let aliases = AliasStore::new(ctx.storage.aliases_file());

    match command {
        SessionsCommand::List {
            limit,
            offset,
            date,
            search,
            json,
        } => {
            let list = store.list(&SessionListOptions {
                limit,
                offset,
                date,
                search,
            });
            if json {
                return print_json(&list);
            }
            if list.sessions.is_empty() {
                println!("No sessions found");
                return Ok(());
            }
            for session in &list.sessions {
                let alias_names: Vec<String> = aliases
                    .aliases_for_session(&session.session_path.to_string_lossy())
                    .into_iter()
                    .map(|a| a.name)
                    .collect();
                let alias_suffix = if alias_names.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", alias_names.join(", "))
                };
                println!(
                    "{}  {:<10}  {:>9}  {}{}",
                    session.name.date,
                    session.name.short_id,
                    format_size(session.size),
                    store.title(&session.session_path),
                    alias_suffix
                );
            }
            if list.has_more {
                println!(
                    "... {} more (use --offset {})",
                    list.total - list.offset - list.sessions.len(),
                    list.offset + list.sessions.len()
                );
            }
            Ok(())
        }
        SessionsCommand::Show { id, json } => {
            let detail = find(&store, &aliases, &id, true)?;
            if json {
                return print_json(&detail);
            }
            print_detail(&store, &detail);
            Ok(())
        }
        SessionsCommand::Delete { id } => {
            let detail = find(&store, &aliases, &id, false)?;
            let path = &detail.summary.session_path;
            if !store.delete(path) {
                return Err(format!("Failed to delete {}", path.display()));
            }
            println!("Deleted {}", path.display());
            Ok(())
        }
    }
}

/// Looks up by id first, then treats the argument as an alias.
fn find(
    store: &SessionStore,
    aliases: &AliasStore,
    id: &str,
    include_content: bool,
) -> Result<SessionDetail, String> {
    if let Some(detail) = store.get_by_id(id, include_content) {
        return Ok(detail);
    }
    let resolved = aliases
        .resolve(id)
        .ok_or_else(|| format!("Session not found: {}", id))?;
    let filename = Path::new(&resolved.session_path)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Alias '{}' points at an invalid path", id))?;
    store
        .get_by_id(filename, include_content)
        .ok_or_else(|| format!("Session for alias '{}' no longer exists", id))
}

fn print_detail(store: &SessionStore, detail: &SessionDetail) {
    let summary = &detail.summary;
    println!("Session: {}", summary.name.filename);
    println!("Path:    {}", summary.session_path.display());
    println!("Title:   {}", store.title(&summary.session_path));
    println!("Size:    {}", store.size_display(&summary.session_path));

    if let Some(metadata) = &detail.metadata {
        if let Some(date) = &metadata.date {
            println!("Date:    {}", date);
        }
        if let Some(started) = &metadata.started {
            println!("Started: {}", started);
        }
        if let Some(updated) = &metadata.last_updated {
            println!("Updated: {}", updated);
        }
        print_items("Completed", &metadata.completed, "x");
        print_items("In Progress", &metadata.in_progress, " ");
        if !metadata.notes.is_empty() {
            println!("\nNotes for Next Session:\n{}", metadata.notes);
        }
        if !metadata.context.is_empty() {
            println!("\nContext to Load:\n{}", metadata.context);
        }
    }

    if let Some(stats) = &detail.stats {
        println!(
            "\n{}/{} items completed, {} lines",
            stats.completed_items, stats.total_items, stats.line_count
        );
    }
}

fn print_items(heading: &str, items: &[String], mark: &str) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", heading);
    for item in items {
        println!("  - [{}] {}", mark, item);
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode JSON: {}", e))?;
    println!("{}", text);
    Ok(())
}
