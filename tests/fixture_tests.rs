//! The sample programs in `test_support`, driven through the runner.

use std::fs;

use clirunner::{CliRunner, InvokeOptions};
use rstest::rstest;
use serial_test::serial;
use tempfile::TempDir;
use test_support::{
    cat::cat,
    hello::hello,
    services::services,
};

#[rstest]
#[case::default_name("", "Hello World!\n")]
#[case::short_flag("-n Ada", "Hello Ada!\n")]
#[case::quoted("--name 'Grace Hopper'", "Hello Grace Hopper!\n")]
#[serial]
fn hello_greets(#[case] args: &str, #[case] expected: &str) {
    let result = CliRunner::new()
        .invoke_with(hello, InvokeOptions::new().args(args))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), expected);
}

#[rstest]
#[serial]
fn usage_errors_use_stderr_and_clap_status() {
    let result = CliRunner::new()
        .invoke_with(hello, InvokeOptions::new().args("--bogus"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 2);
    assert!(result.stdout().is_empty());
    assert!(result.stderr().contains("--bogus"));
    assert!(result.stderr().contains("Usage: hello"));
}

#[rstest]
#[serial]
fn help_goes_to_stdout_with_success() {
    let result = CliRunner::new()
        .invoke_with(hello, InvokeOptions::new().args("--help"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert!(result.stdout().contains("Who to greet"));
    assert!(result.exception().is_none());
}

#[rstest]
#[serial]
fn cat_copies_file_contents() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.txt");
    fs::write(&path, "line one\nline two\n").expect("write file");
    let result = CliRunner::new()
        .invoke_with(cat, InvokeOptions::new().args(vec![path.to_string_lossy().into_owned()]))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "line one\nline two\n");
}

#[rstest]
#[serial]
fn cat_reports_missing_file() {
    let result = CliRunner::new()
        .invoke_with(cat, InvokeOptions::new().args("no-such-file.txt"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 2);
    assert!(result.stdout().is_empty());
    assert!(
        result
            .stderr()
            .starts_with("Error: Could not open file 'no-such-file.txt': ")
    );
}

#[rstest]
#[case::create(
    "new --name foo --dims '2048, 512'",
    "Creating service: foo\nDimensions: [2048, 512]\n"
)]
#[case::create_plain("new --name foo", "Creating service: foo\n")]
#[case::remove("remove --name foo", "Removing service: foo\n")]
#[serial]
fn services_subcommands(#[case] args: &str, #[case] expected: &str) {
    let result = CliRunner::new()
        .invoke_with(services, InvokeOptions::new().args(args))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), expected);
    assert_eq!(result.return_value(), Some(&0));
}

#[rstest]
#[serial]
fn services_without_subcommand_prints_help() {
    let result = CliRunner::new()
        .invoke_with(services, InvokeOptions::new().prog_name("services"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.return_value(), Some(&1));
    assert!(result.stdout().contains("Usage: services"));
    assert!(result.stdout().contains("Create a service"));
}

#[rstest]
#[serial]
fn bad_dimensions_are_usage_errors() {
    let result = CliRunner::new()
        .invoke_with(services, InvokeOptions::new().args("new --name foo --dims 2048,x"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 2);
    assert!(result.stderr().contains("invalid dimension"));
}
