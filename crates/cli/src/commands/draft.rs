// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use ob_core::Draft;

use crate::cli::{DraftCommand, OutputFormat};
use crate::error::{Error, Result};

use super::{open_outbox, print_json, read_json};

pub fn run(dir: &Path, command: DraftCommand) -> Result<()> {
    let outbox = open_outbox(dir, false)?;
    match command {
        DraftCommand::Save { key, body } => {
            let body = read_json(&body, "draft body")?;
            outbox.save_draft(&key, &body)?;
            println!("Saved draft {key}");
        }
        DraftCommand::Show { key } => {
            let draft = outbox
                .load_draft(&key)?
                .ok_or_else(|| Error::DraftNotFound(key.clone()))?;
            print_json(&draft.body)?;
        }
        DraftCommand::Rm { key } => {
            if !outbox.delete_draft(&key)? {
                return Err(Error::DraftNotFound(key));
            }
            println!("Deleted draft {key}");
        }
        DraftCommand::List { output } => {
            let drafts = outbox.list_drafts()?;
            match output {
                OutputFormat::Json => print_json(&drafts)?,
                OutputFormat::Text => {
                    for draft in &drafts {
                        println!("{}", format_draft_line(draft));
                    }
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn format_draft_line(draft: &Draft) -> String {
    format!(
        "{}  {}",
        draft.updated_at.format("%Y-%m-%d %H:%M"),
        draft.key
    )
}

#[cfg(test)]
#[path = "draft_tests.rs"]
mod tests;
