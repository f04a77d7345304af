mod config;
mod toolchain;

use std::path::PathBuf;
use std::process::{self, ExitStatus};
use std::{env, fs, io};

use sigmac::{CompileError, Compiler};
use snafu::{ResultExt, Snafu};
use tracing::{error, info};

use config::{Config, UsageError, USAGE};

#[derive(Debug, Snafu)]
pub enum DriverError {
  #[snafu(display("{source}\n{USAGE}"))]
  Usage { source: UsageError },

  #[snafu(display("failed to read {}: {source}", path.display()))]
  ReadSource { path: PathBuf, source: io::Error },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  WriteAssembly { path: PathBuf, source: io::Error },

  #[snafu(display("{source}"))]
  Compile { source: CompileError },

  #[snafu(display("{tool} not found on PATH: {source}"))]
  ToolMissing { tool: String, source: which::Error },

  #[snafu(display("failed to start {tool}: {source}"))]
  Spawn { tool: String, source: io::Error },

  #[snafu(display("{tool} failed with {status}"))]
  ToolFailed { tool: String, status: ExitStatus },
}

fn run(config: &Config) -> Result<(), DriverError> {
  let source = fs::read_to_string(&config.input).context(ReadSourceSnafu {
    path: config.input.clone(),
  })?;
  info!(input = %config.input.display(), "compiling");

  let asm = Compiler::new()
    .annotate(config.annotate)
    .compile(&source)
    .context(CompileSnafu)?;

  fs::write(&config.output, asm).context(WriteAssemblySnafu {
    path: config.output.clone(),
  })?;
  info!(output = %config.output.display(), "assembly written");

  if config.build {
    toolchain::build_executable(&config.output, &config.executable())?;
  }
  Ok(())
}

fn main() {
  let config = match Config::from_args(env::args().skip(1), |key| env::var(key).ok())
    .context(UsageSnafu)
  {
    Ok(config) => config,
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  };

  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_target(false)
    .with_level(true)
    .with_max_level(config.log_level)
    .init();

  if let Err(err) = run(&config) {
    error!("compilation failed");
    eprintln!("{err}");
    process::exit(1);
  }
}
