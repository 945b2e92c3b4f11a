//! Plain-text rendering of published snapshots.

use std::io::{self, Write};

use staffdir_engine::{AssetState, DirectoryState, LoginState};

pub const INVALID_EMAIL: &str = "Please enter a valid email address";
pub const INVALID_PASSWORD: &str = "Password must be 6-10 alphanumeric characters";

pub fn directory(state: &DirectoryState, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Staff Directory")?;
    if state.is_empty_directory() {
        writeln!(out, "No staff found")?;
        return Ok(());
    }

    let names: Vec<String> = state.entries.iter().map(|e| e.record.full_name()).collect();
    let name_width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let email_width = state
        .entries
        .iter()
        .map(|e| e.record.email.chars().count())
        .max()
        .unwrap_or(0);

    for (entry, name) in state.entries.iter().zip(&names) {
        writeln!(
            out,
            "{:>4}  {name:<name_width$}  {:<email_width$}  {}",
            entry.id(),
            entry.record.email,
            avatar_label(&entry.asset),
        )?;
    }

    let failed = state
        .entries
        .iter()
        .filter(|e| e.asset.asset_error().is_some())
        .count();
    let pending = state.pending_assets();
    let loaded = state.entries.len() - failed - pending;
    writeln!(
        out,
        "{} staff, {loaded} avatars loaded, {failed} failed, {pending} pending",
        state.entries.len()
    )
}

fn avatar_label(asset: &AssetState) -> String {
    match asset {
        AssetState::Pending => "avatar pending".to_string(),
        AssetState::Loaded(handle) => format!("avatar {}x{}", handle.width(), handle.height()),
        AssetState::Failed(message) => format!("avatar failed: {message}"),
    }
}

pub fn login(state: &LoginState, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Logged in as {}", state.email)
}

/// Field messages for a form that did not validate, one per invalid field.
pub fn form_problems(state: &LoginState) -> String {
    let mut problems = Vec::new();
    if !state.is_email_valid() {
        problems.push(INVALID_EMAIL);
    }
    if !state.is_password_valid() {
        problems.push(INVALID_PASSWORD);
    }
    problems.join("\n")
}
