//! Environment overrides applied for the duration of an invocation.

use std::io::Write;

use clirunner::{CliRunner, EnvOverrides, InvokeOptions, RunnerError, stdio};
use rstest::rstest;
use serial_test::serial;
use test_support::hello::hello_env;

fn print_var(name: &'static str) -> impl FnOnce() -> std::io::Result<()> {
    move || {
        let value = std::env::var(name).unwrap_or_else(|_| "<unset>".to_owned());
        writeln!(stdio::stdout(), "{value}")
    }
}

#[rstest]
#[serial]
fn override_is_visible_then_removed() {
    // SAFETY: serialised by `#[serial]`.
    unsafe { std::env::remove_var("TEST_VAR") };
    let result = CliRunner::new()
        .invoke_with(print_var("TEST_VAR"), InvokeOptions::new().env("TEST_VAR", "x"))
        .expect("invoke");
    assert_eq!(result.output(), "x\n");
    assert!(std::env::var_os("TEST_VAR").is_none());
}

#[rstest]
#[serial]
fn removal_hides_and_restores_existing_value() {
    // SAFETY: serialised by `#[serial]`.
    unsafe { std::env::set_var("CLIRUNNER_KEEP", "original") };
    let result = CliRunner::new()
        .invoke_with(print_var("CLIRUNNER_KEEP"), InvokeOptions::new().env_remove("CLIRUNNER_KEEP"))
        .expect("invoke");
    assert_eq!(result.output(), "<unset>\n");
    assert_eq!(std::env::var("CLIRUNNER_KEEP").as_deref(), Ok("original"));
    // SAFETY: serialised by `#[serial]`.
    unsafe { std::env::remove_var("CLIRUNNER_KEEP") };
}

#[rstest]
#[case::baseline(CliRunner::new().with_env("SHOUT", "1"), InvokeOptions::new(), "HELLO WORLD!\n")]
#[case::call(CliRunner::new(), InvokeOptions::new().env("SHOUT", "1"), "HELLO WORLD!\n")]
#[case::call_wins(CliRunner::new().with_env("SHOUT", "1"), InvokeOptions::new().env_remove("SHOUT"), "Hello World!\n")]
#[serial]
fn baseline_and_call_overrides_merge(
    #[case] runner: CliRunner,
    #[case] options: InvokeOptions,
    #[case] expected: &str,
) {
    let result = runner.invoke_with(hello_env, options).expect("invoke");
    assert_eq!(result.output(), expected);
    assert!(std::env::var_os("SHOUT").is_none());
}

#[rstest]
#[case("")]
#[case("A=B")]
#[case("NUL\0")]
#[serial]
fn invalid_names_are_rejected_up_front(#[case] key: &str) {
    let mut overrides = EnvOverrides::new();
    overrides.insert(key.to_owned(), Some("1".to_owned()));
    let err = CliRunner::new()
        .invoke_with(|| (), InvokeOptions::new().envs(overrides))
        .expect_err("invalid key");
    assert!(matches!(err, RunnerError::InvalidEnvKey { .. }));
    assert!(!stdio::is_captured());
}
