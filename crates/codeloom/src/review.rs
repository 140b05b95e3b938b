//! Interactive review of a proposed file change.
//!
//! A proposal starts in `Proposed`: the diff against the current file is
//! shown and the user picks an action. Accept and Decline are terminal.
//! Edit hands the proposed content to `$EDITOR` and loops back to
//! `Proposed` with the edited content re-diffed. Regenerate is not a state
//! here — it exits the machine and the calling command loops around it
//! with a fresh generation.
//!
//! Backups are taken at accept time, immediately before the overwrite, so a
//! declined proposal has nothing to clean up.

use std::path::Path;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use crate::config::Config;
use crate::files;
use crate::prelude::{eprintln, println, *};
use codeloom_core::diff::{diff_lines, stats, DiffKind, DiffOp};

/// Unchanged lines kept on each side of an elided equal run.
const ELISION_CONTEXT: usize = 3;

/// Terminal outcome of reviewing one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Accepted,
    Declined,
    /// The caller should discard this proposal and generate a new one.
    Regenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewAction {
    Accept,
    Decline,
    Edit,
    Regenerate,
}

/// Drive one proposal through the review loop until a terminal outcome.
pub fn review_proposal(
    config: &Config,
    path: &Path,
    original: Option<&str>,
    mut proposed: String,
) -> Result<ReviewOutcome> {
    loop {
        let ops = diff_lines(original.unwrap_or(""), &proposed);
        println!("{}", render_diff(&path.display().to_string(), &ops));

        match prompt_action()? {
            ReviewAction::Accept => {
                apply_accept(config, path, &proposed)?;
                println!("{} Changes applied to {}", "✓".green(), path.display());
                return Ok(ReviewOutcome::Accepted);
            }
            ReviewAction::Decline => {
                println!("{} Changes declined, file untouched.", "✗".yellow());
                return Ok(ReviewOutcome::Declined);
            }
            ReviewAction::Edit => {
                // Editing -> Proposed: the edited content gets a fresh diff.
                proposed = edit_in_editor(&proposed)?;
            }
            ReviewAction::Regenerate => return Ok(ReviewOutcome::Regenerate),
        }
    }
}

/// Write the accepted content, backing up any pre-existing file first.
///
/// The backup is best effort: a reviewed, explicitly approved change is not
/// blocked by a failed backup, only warned about.
pub fn apply_accept(config: &Config, path: &Path, content: &str) -> Result<()> {
    if config.auto_backup && path.exists() {
        let backup = files::backup_path(&config.backup_dir, path);
        match files::create_backup(path, &backup) {
            Ok(()) => println!("{} Backup created: {}", "ℹ".cyan(), backup.display()),
            Err(err) => eprintln!(
                "{} Backup failed ({err}); applying the change anyway",
                "⚠".yellow()
            ),
        }
    }

    files::write_with_parents(path, content)
}

fn prompt_action() -> Result<ReviewAction> {
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What would you like to do?")
        .items(&[
            "Accept changes",
            "Decline changes",
            "Edit manually",
            "Regenerate",
        ])
        .default(0)
        .interact()
        .map_err(|err| eyre!("Prompt failed: {err}"))?;

    Ok(match choice {
        0 => ReviewAction::Accept,
        1 => ReviewAction::Decline,
        2 => ReviewAction::Edit,
        _ => ReviewAction::Regenerate,
    })
}

/// Open the proposed content in the user's editor and return the edited
/// text. The temp file is removed on every exit path when the guard drops.
fn edit_in_editor(content: &str) -> Result<String> {
    use std::io::Write;

    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(content.as_bytes())
        .context("Failed to write temp file")?;
    tmp.flush().context("Failed to flush temp file")?;

    let editor = resolve_editor();
    let status = std::process::Command::new(&editor)
        .arg(tmp.path())
        .status()
        .map_err(|err| eyre!("Failed to launch editor {editor}: {err}"))?;

    if !status.success() {
        return Err(eyre!("Editor {editor} exited with {status}"));
    }

    std::fs::read_to_string(tmp.path()).context("Failed to read edited file")
}

fn resolve_editor() -> String {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return editor;
        }
    }

    for candidate in ["nano", "vim", "vi"] {
        if which::which(candidate).is_ok() {
            return candidate.to_string();
        }
    }

    "vi".to_string()
}

/// Render a diff with per-side line numbers and +/- gutters.
///
/// Long equal runs are collapsed to a marker with [`ELISION_CONTEXT`] lines
/// kept on each side. Purely presentational; the op sequence is read, never
/// changed.
pub fn render_diff(file_name: &str, ops: &[DiffOp]) -> String {
    let mut out = String::new();
    let totals = stats(ops);

    out.push_str(&format!(
        "\n{} {} ({} {})\n",
        "Diff for:".bright_white().bold(),
        file_name.bright_cyan(),
        format!("+{}", totals.insertions).green(),
        format!("-{}", totals.deletions).red(),
    ));

    for op in ops {
        match op.kind {
            DiffKind::Delete => {
                for (offset, line) in op.lines.iter().enumerate() {
                    out.push_str(
                        &format!("-{:4} | {}\n", op.old_start + offset, display_line(line))
                            .red()
                            .to_string(),
                    );
                }
            }
            DiffKind::Insert => {
                for (offset, line) in op.lines.iter().enumerate() {
                    out.push_str(
                        &format!("+{:4} | {}\n", op.new_start + offset, display_line(line))
                            .green()
                            .to_string(),
                    );
                }
            }
            DiffKind::Equal => render_equal(&mut out, op),
        }
    }

    out
}

fn render_equal(out: &mut String, op: &DiffOp) {
    let count = op.lines.len();

    if count <= 2 * ELISION_CONTEXT + 1 {
        for (offset, line) in op.lines.iter().enumerate() {
            out.push_str(&format!(
                " {:4} | {}\n",
                op.old_start + offset,
                display_line(line)
            ));
        }
        return;
    }

    for (offset, line) in op.lines.iter().take(ELISION_CONTEXT).enumerate() {
        out.push_str(&format!(
            " {:4} | {}\n",
            op.old_start + offset,
            display_line(line)
        ));
    }

    let hidden = count - 2 * ELISION_CONTEXT;
    out.push_str(&format!(
        "      | {}\n",
        format!("... {hidden} unchanged lines ...").bright_black()
    ));

    for (offset, line) in op.lines.iter().enumerate().skip(count - ELISION_CONTEXT) {
        out.push_str(&format!(
            " {:4} | {}\n",
            op.old_start + offset,
            display_line(line)
        ));
    }
}

fn display_line(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}
