use assert_cmd::prelude::*;
use predicates::prelude::*;

fn bin_under_test() -> escargot::CargoRun {
    escargot::CargoBuild::new()
        .bin("retsnoop")
        .current_release()
        .current_target()
        .run()
        .unwrap_or_else(|err| {
            let formatted_err =
                err.to_string().lines().map(|line| format!("│\t{line}")).collect::<Vec<_>>().join("\n");
            panic!(
                "\n\
                Failed to build `retsnoop`.\n\
                Original cargo error:\n\
                ┌──────────────────────────────────────────────────\n\
                {formatted_err}\n\
                └──────────────────────────────────────────────────\n\
                To reproduce this failure manually, run:\n\
                $ cargo build -p retsnoop\n\n"
            );
        })
}

#[test]
fn help_lists_entry_and_dry_run_flags() {
    let mut cmd = bin_under_test().command();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--entry"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn version_prints_the_crate_version() {
    let mut cmd = bin_under_test().command();
    cmd.arg("-V");

    cmd.assert().success().stdout(predicate::str::contains("retsnoop"));
}

#[test]
fn dry_run_with_no_entry_glob_fails_with_empty_entry_set() {
    let mut cmd = bin_under_test().command();
    cmd.arg("--dry-run");

    cmd.assert().failure().stderr(predicate::str::contains("entry"));
}

#[test]
fn unknown_allow_errno_name_fails_with_a_diagnostic() {
    let mut cmd = bin_under_test().command();
    cmd.arg("-e").arg("sys_bpf").arg("-x").arg("ENOTANERRNO").arg("--dry-run");

    cmd.assert().failure().stderr(predicate::str::contains("unknown error name"));
}

#[test]
fn conflicting_attach_flags_are_rejected_by_clap() {
    let mut cmd = bin_under_test().command();
    cmd.arg("-e").arg("sys_bpf").arg("-K").arg("-F").arg("--dry-run");

    cmd.assert().failure().stderr(predicate::str::contains("cannot be used with"));
}
