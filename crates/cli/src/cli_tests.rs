// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use clap::CommandFactory;
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("outbound").chain(args.iter().copied())).unwrap()
}

#[test]
fn definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = parse(&["status", "--offline", "--state-dir", "/tmp/x", "--debug"]);
    assert!(cli.offline);
    assert!(cli.debug);
    assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/x")));
    assert_eq!(cli.command, Command::Status { json: false });
}

#[test]
fn group_takes_two_positionals() {
    let cli = parse(&["group", "g1", "u1", "--group-attrs", "{}"]);
    assert_eq!(
        cli.command,
        Command::Group {
            group_id: "g1".into(),
            user_id: "u1".into(),
            group_attrs: Some("{}".into()),
            attrs: None,
        }
    );
}

#[test]
fn flush_timeout_defaults_to_thirty_seconds() {
    assert_eq!(parse(&["flush"]).command, Command::Flush { timeout_secs: 30 });
}

#[parameterized(
    track_without_event = { &["track"] },
    unknown_command = { &["send"] },
    alias_without_id = { &["alias"] },
    bad_timeout = { &["flush", "--timeout-secs", "soon"] },
)]
fn rejects(args: &[&str]) {
    let result = Cli::try_parse_from(std::iter::once("outbound").chain(args.iter().copied()));
    assert!(result.is_err());
}
