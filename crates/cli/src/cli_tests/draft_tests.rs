// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use clap::Parser;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn draft_save() {
    match parse(&["outbox", "draft", "save", "intake", r#"{"a":1}"#])
        .unwrap()
        .command
    {
        Command::Draft(DraftCommand::Save { key, body }) => {
            assert_eq!(key, "intake");
            assert_eq!(body, r#"{"a":1}"#);
        }
        _ => panic!("Expected draft save"),
    }
}

#[test]
fn draft_rm_and_show() {
    assert!(matches!(
        parse(&["outbox", "draft", "rm", "k"]).unwrap().command,
        Command::Draft(DraftCommand::Rm { .. })
    ));
    assert!(matches!(
        parse(&["outbox", "draft", "show", "k"]).unwrap().command,
        Command::Draft(DraftCommand::Show { .. })
    ));
}

#[test]
fn draft_requires_subcommand() {
    assert!(parse(&["outbox", "draft"]).is_err());
}
