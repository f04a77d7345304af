//! Command-line and environment settings for the `sigmac` binary.

use std::path::PathBuf;

use snafu::Snafu;
use tracing::Level;

pub const USAGE: &str = "usage: sigmac <input.sig> [-o <output.asm>] [--build] [--no-comments] [-v...]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub input: PathBuf,
  pub output: PathBuf,
  /// Assemble and link after writing the assembly.
  pub build: bool,
  pub annotate: bool,
  pub log_level: Level,
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum UsageError {
  #[snafu(display("missing input file"))]
  MissingInput,

  #[snafu(display("option '{option}' expects a value"))]
  MissingValue { option: String },

  #[snafu(display("unknown option '{option}'"))]
  UnknownOption { option: String },

  #[snafu(display("unexpected argument '{argument}'"))]
  ExtraArgument { argument: String },
}

impl Config {
  /// Build the configuration from arguments (without the program name) and
  /// an environment lookup.
  pub fn from_args<I, E>(args: I, env: E) -> Result<Self, UsageError>
  where
    I: IntoIterator<Item = String>,
    E: Fn(&str) -> Option<String>,
  {
    let mut input = None;
    let mut output = None;
    let mut build = env("SIGMAC_BUILD").map(|v| is_truthy(&v)).unwrap_or(false);
    let mut annotate = true;
    let mut verbosity = 0usize;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
      match arg.as_str() {
        "-o" | "--output" => {
          let value = args.next().ok_or_else(|| UsageError::MissingValue {
            option: arg.clone(),
          })?;
          output = Some(PathBuf::from(value));
        }
        "--build" => build = true,
        "--no-comments" => annotate = false,
        "--verbose" => verbosity += 1,
        _ if is_verbosity_flag(&arg) => verbosity += arg.len() - 1,
        _ if arg.starts_with('-') && arg.len() > 1 => {
          return UnknownOptionSnafu { option: arg }.fail();
        }
        _ if input.is_none() => input = Some(PathBuf::from(arg)),
        _ => return ExtraArgumentSnafu { argument: arg }.fail(),
      }
    }

    let input = input.ok_or(UsageError::MissingInput)?;
    let output = output.unwrap_or_else(|| input.with_extension("asm"));
    let log_level = match verbosity {
      0 => env("SIGMAC_LOG")
        .and_then(|v| parse_level(&v))
        .unwrap_or(Level::WARN),
      1 => Level::INFO,
      2 => Level::DEBUG,
      _ => Level::TRACE,
    };

    Ok(Self {
      input,
      output,
      build,
      annotate,
      log_level,
    })
  }

  /// Executable path used by `--build`: the input's file stem, next to the output.
  pub fn executable(&self) -> PathBuf {
    let stem = self
      .input
      .file_stem()
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from("a.out"));
    match self.output.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir.join(stem),
      _ => stem,
    }
  }
}

/// `-v`, `-vv`, `-vvv` and so on.
fn is_verbosity_flag(arg: &str) -> bool {
  arg
    .strip_prefix('-')
    .is_some_and(|flags| !flags.is_empty() && flags.bytes().all(|b| b == b'v'))
}

fn is_truthy(value: &str) -> bool {
  matches!(
    value.trim().to_ascii_lowercase().as_str(),
    "1" | "true" | "yes" | "on"
  )
}

fn parse_level(value: &str) -> Option<Level> {
  match value.trim().to_ascii_lowercase().as_str() {
    "error" => Some(Level::ERROR),
    "warn" => Some(Level::WARN),
    "info" => Some(Level::INFO),
    "debug" => Some(Level::DEBUG),
    "trace" => Some(Level::TRACE),
    _ => None,
  }
}
