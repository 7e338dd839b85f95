//! Standard input substitution and echo.

use std::io::{self, Read, Write};

use clirunner::{Charset, CliRunner, Input, InvokeOptions, RunnerError, stdio};
use rstest::rstest;
use serial_test::serial;
use test_support::prompt::{echo_lines, prompt_foo, prompt_then_getchar};

fn copy_stdin() -> io::Result<()> {
    let mut text = String::new();
    stdio::stdin().read_to_string(&mut text)?;
    stdio::stdout().write_str(&text)
}

#[rstest]
#[case::echo(true, "Hello World!\nHello World!\n")]
#[case::plain(false, "Hello World!\n")]
#[serial]
fn copied_input_is_echoed_once(#[case] echo: bool, #[case] expected: &str) {
    let result = CliRunner::new()
        .with_echo_stdin(echo)
        .invoke_with(copy_stdin, InvokeOptions::new().input("Hello World!\n"))
        .expect("invoke");
    assert_eq!(result.output(), expected);
}

#[rstest]
#[case::echo(true, "Foo: bar\nfoo = bar\n")]
#[case::plain(false, "Foo: foo = bar\n")]
#[serial]
fn prompt_interleaves_with_echo(#[case] echo: bool, #[case] expected: &str) {
    let result = CliRunner::new()
        .with_echo_stdin(echo)
        .invoke_with(prompt_foo, InvokeOptions::new().input("bar\n"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), expected);
}

#[rstest]
#[serial]
fn single_characters_follow_prompts() {
    let result = CliRunner::new()
        .with_echo_stdin(true)
        .invoke_with(prompt_then_getchar, InvokeOptions::new().input("abc\nx"))
        .expect("invoke");
    assert_eq!(result.output(), "Line: abc\nxline = abc, char = x\n");
}

#[rstest]
#[serial]
fn lines_echo_before_each_reply() {
    let result = CliRunner::new()
        .with_echo_stdin(true)
        .invoke_with(echo_lines, InvokeOptions::new().input("one\ntwo\n"))
        .expect("invoke");
    assert_eq!(result.output(), "one\ngot: one\ntwo\ngot: two\n");
}

#[rstest]
#[serial]
fn exhausted_input_fails_the_prompt() {
    let result = CliRunner::new().invoke(prompt_foo).expect("invoke");
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.output(), "Foo: ");
    let failure = result.exception().expect("eof recorded");
    assert_eq!(
        failure.downcast_ref::<io::Error>().map(io::Error::kind),
        Some(io::ErrorKind::UnexpectedEof)
    );
}

#[rstest]
#[case::bytes(Input::from(&b"raw\n"[..]))]
#[case::owned(Input::from(b"raw\n".to_vec()))]
#[case::reader(Input::from_reader(io::Cursor::new(b"raw\n".to_vec())))]
#[case::stream(Input::stream(io::Cursor::new(b"raw\n".to_vec())))]
#[serial]
fn every_input_form_reaches_stdin(#[case] input: Input) {
    let result = CliRunner::new()
        .invoke_with(copy_stdin, InvokeOptions::new().input(input))
        .expect("invoke");
    assert_eq!(result.output(), "raw\n");
}

#[rstest]
#[serial]
fn stdin_reports_stable_identity() {
    let result = CliRunner::new()
        .invoke(|| {
            let input = stdio::stdin();
            let output = stdio::stdout();
            writeln!(stdio::stdout(), "{} {} {} {}", input.name(), input.mode(), output.name(), output.mode())
        })
        .expect("invoke");
    assert_eq!(result.output(), "<stdin> r <stdout> w\n");
}

#[rstest]
#[serial]
fn text_input_uses_runner_charset() {
    let result = CliRunner::new()
        .with_charset(Charset::Latin1)
        .invoke_with(
            || -> io::Result<()> {
                let mut raw = Vec::new();
                stdio::stdin().read_to_end(&mut raw)?;
                writeln!(stdio::stdout(), "{raw:?}")
            },
            InvokeOptions::new().input("é"),
        )
        .expect("invoke");
    assert_eq!(result.output(), "[233]\n");
}

#[rstest]
#[serial]
fn unencodable_input_is_a_configuration_error() {
    let err = CliRunner::new()
        .with_charset(Charset::Ascii)
        .invoke_with(|| (), InvokeOptions::new().input("é"))
        .expect_err("not ascii");
    assert!(matches!(err, RunnerError::EncodeInput { .. }));
    assert!(!stdio::is_captured());
}

#[rstest]
#[serial]
fn stderr_escapes_unencodable_text() {
    let result = CliRunner::new()
        .with_charset(Charset::Ascii)
        .invoke(|| stdio::stderr().write_str("café"))
        .expect("invoke");
    assert_eq!(result.stderr(), "caf\\xe9");
}

#[rstest]
#[serial]
fn stdout_rejects_unencodable_text() {
    let result = CliRunner::new()
        .with_charset(Charset::Ascii)
        .invoke(|| stdio::stdout().write_str("café"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.exception().map(|f| f.kind()), Some(clirunner::FailureKind::Error));
}

fn read_secret_then_name() -> io::Result<()> {
    let mut input = stdio::stdin();
    let mut secret = String::new();
    let paused = input.set_echo_paused(true);
    input.read_line(&mut secret)?;
    input.set_echo_paused(false);
    let mut name = String::new();
    input.read_line(&mut name)?;
    writeln!(
        stdio::stdout(),
        "paused={paused} secret={} name={}",
        secret.trim_end(),
        name.trim_end()
    )
}

#[rstest]
#[case::echo(true, "visible\npaused=true secret=hunter2 name=visible\n")]
#[case::plain(false, "paused=false secret=hunter2 name=visible\n")]
#[serial]
fn paused_echo_hides_only_paused_reads(#[case] echo: bool, #[case] expected: &str) {
    let result = CliRunner::new()
        .with_echo_stdin(echo)
        .invoke_with(read_secret_then_name, InvokeOptions::new().input("hunter2\nvisible\n"))
        .expect("invoke");
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), expected);
}

#[rstest]
#[serial]
fn carriage_returns_arrive_as_newlines() {
    let result = CliRunner::new()
        .invoke_with(echo_lines, InvokeOptions::new().input("one\r\ntwo\rthree"))
        .expect("invoke");
    assert_eq!(result.output(), "got: one\ngot: two\ngot: three\n");
}
