// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn qsub_output_parses_id() {
    assert_eq!(
        parse_qsub_output("4217.headnode.cluster.example\n"),
        Some("4217".to_string())
    );
}

#[test]
fn qsub_error_output_has_no_id() {
    assert_eq!(parse_qsub_output("qsub: submit error\n"), None);
    assert_eq!(parse_qsub_output(""), None);
}

#[test]
fn qstat_output_parses_user_jobs() {
    let output = "\
headnode.cluster.example:
                                                            Req'd  Req'd   Elap
Job ID          Username Queue    Jobname    SessID NDS TSK Memory Time  S Time
--------------- -------- -------- ---------- ------ --- --- ------ ----- - -----
4217.headnode   qcuser   batch    qc_abc123  12345   1   1    --  01:00 R 00:10
4218.headnode   qcuser   batch    qc_def456    --    1   1    --  01:00 Q   --
";
    let entries = parse_qstat_output(output);
    assert_eq!(
        entries,
        vec![("4217".to_string(), 'R'), ("4218".to_string(), 'Q')]
    );
}

#[test]
fn qstat_garbage_is_ignored() {
    assert!(parse_qstat_output("no jobs\n").is_empty());
}

#[parameterized(
    queued  = { 'Q', RemoteStatus::Queued },
    running = { 'R', RemoteStatus::Running },
    exiting = { 'E', RemoteStatus::Running },
    done    = { 'C', RemoteStatus::Done },
    held    = { 'H', RemoteStatus::Unknown },
)]
fn remote_states(letter: char, expected: RemoteStatus) {
    assert_eq!(map_remote_state(letter), expected);
}
