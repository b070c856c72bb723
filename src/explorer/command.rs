// src/explorer/command.rs
// =============================================================================
// Parses one line typed into the `browse` session into a Command.
//
// The first word picks the command, the rest of the line is its argument.
// For `set` and `append` the argument is taken verbatim, with `\n` turned
// into a real newline so a multi-line buffer can be typed on one line.
// =============================================================================

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Branches,
    Branch(String),
    Ls,
    Expand(String),
    Collapse(String),
    Toggle(String),
    Open(String),
    Cat,
    Edit,
    Load(PathBuf),
    Set(String),
    Append(String),
    New(String),
    Status,
    Discard,
    Save(Option<String>),
    Refresh,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (type `help`)")]
    Unknown(String),

    #[error("`{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),
}

pub const HELP: &str = "\
Navigation
  ls                     show the tree again
  expand <dir>           open a directory (parents are opened too)
  collapse <dir>         close a directory
  toggle <dir>           expand or collapse
  open <path>            show a file, or expand a directory
  cat                    print the selected file
  branches               list branches
  branch <name>          switch branch (drops caches and unsaved edits)
  refresh                reload everything from GitHub

Editing
  edit                   edit the selected file in $VISUAL / $EDITOR
  load <local-file>      replace the buffer with a local file
  set <text>             replace the buffer (\\n for newlines)
  append <text>          add a line to the buffer
  new <path>             start a new file
  status                 what is being edited
  discard                throw the buffer away
  save [message]         commit the buffer

  help                   this text
  quit                   leave
";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim_start()),
            None => (line.trim_end(), ""),
        };
        let arg = rest.trim_end();

        let required = |name: &'static str, what: &'static str| -> Result<String, ParseError> {
            if arg.is_empty() {
                Err(ParseError::MissingArgument(name, what))
            } else {
                Ok(arg.to_string())
            }
        };

        let command = match verb {
            "help" | "?" => Command::Help,
            "branches" => Command::Branches,
            "branch" | "checkout" => Command::Branch(required("branch", "a branch name")?),
            "ls" | "tree" => Command::Ls,
            "expand" => Command::Expand(required("expand", "a directory")?),
            "collapse" => Command::Collapse(required("collapse", "a directory")?),
            "toggle" => Command::Toggle(required("toggle", "a directory")?),
            "open" | "o" => Command::Open(required("open", "a path")?),
            "cat" | "show" => Command::Cat,
            "edit" => Command::Edit,
            "load" => Command::Load(PathBuf::from(required("load", "a local file")?)),
            "set" => Command::Set(unescape(rest)),
            "append" => Command::Append(unescape(rest)),
            "new" => Command::New(required("new", "a file path")?),
            "status" => Command::Status,
            "discard" => Command::Discard,
            "save" => Command::Save((!arg.is_empty()).then(|| arg.to_string())),
            "refresh" => Command::Refresh,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}
