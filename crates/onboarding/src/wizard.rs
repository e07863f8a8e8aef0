//! Terminal front end for the setup wizard, driving a [`WizardController`].

use std::io::{BufRead, Write};

use {ragkit_config::Patch, serde_json::Value};

use crate::{
    error::{Error, Result},
    service::WizardController,
};

const HELP: &str = "Enter = next, back = previous step, set <branch> <json> = patch a branch, \
                    done = finish setup, quit = leave (progress is kept)";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Back,
    Set { branch: String, patch: Patch },
    Done,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match head.to_ascii_lowercase().as_str() {
            "" | "next" => Ok(Self::Next),
            "back" => Ok(Self::Back),
            "done" => Ok(Self::Done),
            "quit" | "exit" => Ok(Self::Quit),
            "help" | "?" => Ok(Self::Help),
            "set" => {
                let (branch, json) = rest
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::message("usage: set <branch> <json object>"))?;
                Ok(Self::Set {
                    branch: branch.to_string(),
                    patch: parse_patch(json)?,
                })
            },
            other => Err(Error::message(format!("unknown command: {other} ({HELP})"))),
        }
    }
}

/// Parse a JSON object into a [`Patch`].
pub fn parse_patch(raw: &str) -> Result<Patch> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::message("patch must be a JSON object")),
        Err(e) => Err(Error::message(format!("invalid patch: {e}"))),
    }
}

/// Run the wizard on stdin/stdout until the user finishes or quits.
pub async fn run_onboarding(wizard: &mut WizardController) -> Result<bool> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_interactive(wizard, stdin.lock(), stdout.lock()).await
}

/// Drive the wizard from `input`, echoing prompts to `out`.
///
/// Returns `true` once the config was finalized and `false` when the user
/// quit or input ended first. Invalid commands and failed saves are reported
/// and the loop continues on the same step.
pub async fn run_interactive<R: BufRead, W: Write>(
    wizard: &mut WizardController,
    mut input: R,
    mut out: W,
) -> Result<bool> {
    writeln!(out, "{HELP}")?;
    loop {
        let step = wizard.current_step();
        writeln!(out, "[{}] {}", step.position(), step.title())?;
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }

        let outcome = match Command::parse(&line) {
            Ok(Command::Next) => wizard.advance().await.map(|_| ()),
            Ok(Command::Back) => wizard.retreat().await.map(|_| ()),
            Ok(Command::Set { branch, patch }) => wizard.update_config(&branch, &patch).await,
            Ok(Command::Help) => {
                writeln!(out, "{HELP}")?;
                Ok(())
            },
            Ok(Command::Quit) => return Ok(false),
            Ok(Command::Done) => match wizard.complete().await {
                Ok(_) => {
                    writeln!(out, "Setup complete!")?;
                    return Ok(true);
                },
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            writeln!(out, "error: {e}")?;
        }
    }
}
