// src/explorer/repl.rs
// =============================================================================
// The `browse` loop: read a line, apply it to the Session, render.
//
// Each command issues its requests one after the other and waits for them
// before the next line is read. Errors never end the loop, they show up in
// the banner on the next render.
// =============================================================================

use anyhow::{bail, Context, Result};
use log::debug;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::command::{Command, HELP};
use super::session::Session;
use crate::github::ContentsApi;

// What the loop should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Redraw the whole session
    Render,
    /// Print this instead of redrawing
    Print(String),
    Quit,
}

pub async fn run<A: ContentsApi>(session: &mut Session<A>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", session.render());
    println!("Type `help` for commands.");

    loop {
        print!("{}> ", session.branch());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            // stdin closed (Ctrl-D)
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = match line.parse::<Command>() {
            Ok(command) => {
                debug!("command: {:?}", command);
                apply(session, command).await
            }
            Err(e) => {
                session.set_error(format!("❌ {}", e));
                Outcome::Render
            }
        };

        match outcome {
            Outcome::Render => println!("{}", session.render()),
            Outcome::Print(text) => print!("{}", text),
            Outcome::Quit => break,
        }
    }

    if session.has_unsaved_changes() {
        println!("⚠️  Leaving with unsaved changes: {}", session.status_line());
    }
    Ok(())
}

pub async fn apply<A: ContentsApi>(session: &mut Session<A>, command: Command) -> Outcome {
    match command {
        Command::Help => return Outcome::Print(HELP.to_string()),
        Command::Branches => {
            if session.reload_branches().await {
                return Outcome::Print(session.render_branches());
            }
        }
        Command::Branch(name) => {
            session.switch_branch(&name).await;
        }
        Command::Ls => {}
        Command::Expand(path) => {
            session.expand(&path).await;
        }
        Command::Collapse(path) => session.collapse(&path),
        Command::Toggle(path) => {
            session.toggle(&path).await;
        }
        Command::Open(path) => {
            session.select(&path).await;
        }
        Command::Cat => return Outcome::Print(session.render_selected()),
        Command::Edit => edit_in_editor(session).await,
        Command::Load(file) => load_local(session, &file).await,
        Command::Set(text) => {
            session.set_buffer(text);
        }
        Command::Append(text) => {
            session.append_line(&text);
        }
        Command::New(path) => {
            session.new_file(&path);
        }
        Command::Status => return Outcome::Print(format!("{}\n", session.status_line())),
        Command::Discard => session.discard_edit(),
        Command::Save(message) => {
            session.save(message.as_deref()).await;
        }
        Command::Refresh => {
            session.refresh().await;
        }
        Command::Quit => return Outcome::Quit,
    }
    Outcome::Render
}

// Replaces the buffer with the content of a local file
async fn load_local<A: ContentsApi>(session: &mut Session<A>, file: &Path) {
    match tokio::fs::read_to_string(file).await {
        Ok(text) => {
            if session.set_buffer(text) {
                session.set_info(format!("Loaded {} into the buffer", file.display()));
            }
        }
        Err(e) => session.set_error(format!("❌ could not read {}: {}", file.display(), e)),
    }
}

// Round-trips the buffer through the user's editor
async fn edit_in_editor<A: ContentsApi>(session: &mut Session<A>) {
    if !session.begin_edit() {
        return;
    }
    let Some(buffer) = session.buffer() else {
        return;
    };

    let editor = editor_command();
    let file_name = buffer.path.rsplit('/').next().unwrap_or("buffer").to_string();
    let text = buffer.text.clone();

    // The scratch file lives until the end of this match arm, then is removed
    let result = match scratch_file(&file_name, &text) {
        Ok(scratch) => run_editor(&editor, scratch.path()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(edited) if edited == text => session.set_info("Editor closed without changes"),
        Ok(edited) => {
            session.set_buffer(edited);
        }
        Err(e) => session.set_error(format!("❌ {:#}", e)),
    }
}

// Random name in the temp dir, keeping the file name last so editors
// still pick the right syntax highlighting
fn scratch_file(file_name: &str, text: &str) -> Result<NamedTempFile> {
    let mut scratch = tempfile::Builder::new()
        .prefix("repo-explorer-")
        .suffix(&format!("-{}", file_name))
        .tempfile()
        .context("could not create a scratch file")?;
    let written = scratch.write_all(text.as_bytes()).and_then(|()| scratch.flush());
    written.with_context(|| format!("could not write {}", scratch.path().display()))?;
    debug!("editing through {}", scratch.path().display());
    Ok(scratch)
}

async fn run_editor(editor: &str, scratch: &Path) -> Result<String> {
    // $EDITOR may carry flags, e.g. "code --wait"
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(scratch)
        .status()
        .await
        .with_context(|| format!("could not launch editor '{}'", editor))?;
    if !status.success() {
        bail!("editor '{}' exited with {}", editor, status);
    }

    // Read by path: many editors save by writing a new file and renaming it
    tokio::fs::read_to_string(scratch)
        .await
        .with_context(|| format!("could not read {}", scratch.display()))
}

fn editor_command() -> String {
    std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string())
}
