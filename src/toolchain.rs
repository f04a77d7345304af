//! Assemble and link the generated assembly with external tools.
//!
//! `nasm` produces an ELF64 object and `gcc` links it against libc, which
//! provides `printf` and `scanf`. Both are looked up on `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;

use snafu::{ensure, ResultExt};
use tracing::info;

use crate::{DriverError, SpawnSnafu, ToolFailedSnafu, ToolMissingSnafu};

pub fn build_executable(asm: &Path, exe: &Path) -> Result<(), DriverError> {
  let obj = asm.with_extension("o");

  let nasm = locate("nasm")?;
  let mut assemble = Command::new(nasm);
  assemble.args(["-f", "elf64"]).arg(asm).arg("-o").arg(&obj);
  run("nasm", &mut assemble)?;

  let gcc = locate("gcc")?;
  let mut link = Command::new(gcc);
  link.arg(&obj).arg("-o").arg(exe).arg("-no-pie");
  run("gcc", &mut link)?;

  info!(executable = %exe.display(), "linked");
  Ok(())
}

fn locate(tool: &str) -> Result<PathBuf, DriverError> {
  which::which(tool).context(ToolMissingSnafu { tool })
}

fn run(tool: &str, command: &mut Command) -> Result<(), DriverError> {
  info!(tool, ?command, "running");
  let status = command.status().context(SpawnSnafu { tool })?;
  ensure!(status.success(), ToolFailedSnafu { tool, status });
  Ok(())
}
