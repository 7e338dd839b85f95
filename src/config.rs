//! Deserialisable runner configuration.
//!
//! Lets test suites keep runner settings in a fixture file:
//!
//! ```
//! use clirunner::{CliRunner, config::RunnerConfig};
//!
//! let config: RunnerConfig = serde_json::from_str(
//!     r#"{ "charset": "latin-1", "env": { "SHOUT": "1", "HOME": null }, "echo_stdin": true }"#,
//! )?;
//! let runner = CliRunner::from_config(config);
//! assert!(runner.echo_stdin());
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::Deserialize;

use crate::{charset::Charset, isolation::EnvOverrides};

/// Settings shared by every invocation of one runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Charset label such as `"utf-8"`, `"latin-1"` or `"ascii"`.
    pub charset: Charset,
    /// Baseline overrides; `null` removes a variable.
    pub env: EnvOverrides,
    /// Echo standard input into standard output.
    pub echo_stdin: bool,
}

#[cfg(test)]
mod tests {
    use super::RunnerConfig;
    use crate::charset::Charset;

    #[test]
    fn empty_config_uses_defaults() {
        let config: RunnerConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.charset, Charset::Utf8);
    }

    #[test]
    fn env_preserves_order_and_removals() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "env": { "B": "2", "A": null } }"#).expect("parse");
        let keys: Vec<_> = config.env.keys().map(String::as_str).collect();
        assert_eq!(keys, ["B", "A"]);
        assert_eq!(config.env.get("A"), Some(&None));
    }

    #[test]
    fn unknown_charset_is_a_parse_error() {
        let err = serde_json::from_str::<RunnerConfig>(r#"{ "charset": "klingon" }"#)
            .expect_err("unknown charset");
        assert!(err.to_string().contains("unknown charset 'klingon'"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<RunnerConfig>(r#"{ "colour": true }"#).is_err());
    }
}
