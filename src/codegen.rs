//! Code generation: lower the statement list into NASM x86-64 assembly.
//!
//! There is no register allocation. Assignments run through `rax` as a
//! single accumulator, and division moves its divisor into `rcx` so that
//! `cqo`/`idiv` can use `rdx:rax`. Variables live in the data section as
//! 8-byte slots and are always addressed by label. Float literals become
//! `__float64__` bit patterns; the arithmetic on them is still integer.
//!
//! The generator trusts its input. Run the checker first; anything the
//! checker would reject may produce assembly that does not assemble.

use std::collections::HashSet;

use tracing::debug;

use crate::parser::{BinaryOp, Literal, Operand, Operation, PrintArg, Statement};

/// Column where annotations start.
const COMMENT_COLUMN: usize = 40;
const FRAME_SCRATCH: usize = 32;

/// Emit annotated assembly for a checked statement list.
pub fn generate(statements: &[Statement]) -> String {
  Codegen::new().generate(statements)
}

#[derive(Debug, Clone, Copy)]
pub struct Codegen {
  annotate: bool,
}

impl Default for Codegen {
  fn default() -> Self {
    Self::new()
  }
}

impl Codegen {
  pub fn new() -> Self {
    Self { annotate: true }
  }

  /// Turn trailing `; ...` comments on or off.
  pub fn with_annotations(annotate: bool) -> Self {
    Self { annotate }
  }

  pub fn generate(&self, statements: &[Statement]) -> String {
    let mut data = Section::new(self.annotate);
    let mut text = Section::new(self.annotate);
    let mut declared = HashSet::new();
    let mut messages = Vec::new();

    for statement in statements {
      match statement {
        Statement::VarDecl { name, init } => {
          if declared.insert(name.as_str()) {
            data.commented(
              format!("    {name:<20} dq {}", init.text()),
              format!("variable {name}"),
            );
          }
        }
        Statement::Print(PrintArg::Text(message)) => {
          let label = format!("msg_{}", messages.len());
          messages.push((label.clone(), message.as_str()));
          text.commented(format!("    lea rdi, [{label}]"), "string address");
          emit_printf(&mut text);
        }
        Statement::Print(PrintArg::Variable(name)) => {
          text.commented("    lea rdi, [fmt_out_num]", "numeric output format");
          text.commented(format!("    mov rsi, [{name}]"), format!("value of {name}"));
          emit_printf(&mut text);
        }
        Statement::Input { name } => {
          text.commented("    lea rdi, [fmt_in]", "numeric input format");
          text.commented(format!("    lea rsi, [{name}]"), format!("address of {name}"));
          text.plain("    xor eax, eax");
          text.plain("    call scanf");
        }
        Statement::Assignment {
          dest,
          first,
          operations,
        } => emit_assignment(&mut text, dest, first, operations),
      }
    }

    for (label, message) in &messages {
      data.commented(
        format!("    {label:<20} db {}, 10, 0", quote(message)),
        "string constant",
      );
    }

    debug!(
      variables = declared.len(),
      strings = messages.len(),
      "assembly generated"
    );

    let mut asm = Section::new(self.annotate);
    asm.commented("section .data", "data");
    asm.commented("    fmt_in               db ' %ld', 0", "numeric input format");
    asm.commented("    fmt_out_num          db '%ld', 10, 0", "numeric output format");
    asm.extend(data);
    asm.blank();
    asm.commented("section .text", "code");
    asm.plain("extern printf, scanf");
    asm.plain("global main");
    asm.blank();
    asm.plain("main:");
    asm.commented("    push rbp", "prologue");
    asm.plain("    mov rbp, rsp");
    asm.commented(format!("    sub rsp, {FRAME_SCRATCH}"), "scratch space, keeps rsp aligned");
    asm.blank();
    asm.extend(text);
    asm.blank();
    asm.commented(format!("    add rsp, {FRAME_SCRATCH}"), "epilogue");
    asm.plain("    pop rbp");
    asm.commented("    mov rax, 0", "exit status");
    asm.plain("    ret");
    asm.finish()
  }
}

fn emit_printf(text: &mut Section) {
  text.commented("    xor eax, eax", "no vector arguments");
  text.plain("    call printf");
}

fn emit_assignment(text: &mut Section, dest: &str, first: &Operand, operations: &[Operation]) {
  let source = operand(first);
  text.commented(format!("    mov rax, {source}"), format!("load {}", first.text()));

  for Operation { op, operand: rhs } in operations {
    let mut value = operand(rhs);
    // add/sub/imul have no 64-bit immediate form.
    if *op != BinaryOp::Div && matches!(rhs, Operand::Literal(Literal::Float(_))) {
      text.commented(format!("    mov rcx, {value}"), format!("load {}", rhs.text()));
      value = "rcx".to_string();
    }
    match op {
      BinaryOp::Add => text.commented(format!("    add rax, {value}"), "add"),
      BinaryOp::Sub => text.commented(format!("    sub rax, {value}"), "subtract"),
      BinaryOp::Mul => text.commented(format!("    imul rax, {value}"), "multiply"),
      BinaryOp::Div => {
        text.commented(format!("    mov rcx, {value}"), "divisor");
        text.commented("    cqo", "sign-extend rax into rdx");
        text.commented("    idiv rcx", "quotient in rax");
      }
    }
  }

  text.commented(format!("    mov [{dest}], rax"), format!("store {dest}"));
}

/// Literals are immediates; variables are read from memory.
fn operand(operand: &Operand) -> String {
  match operand {
    Operand::Literal(Literal::Int(text)) => text.clone(),
    Operand::Literal(Literal::Float(text)) => format!("__float64__({text})"),
    Operand::Variable(name) => format!("[{name}]"),
  }
}

/// NASM string literal used as a `printf` format. `%` is doubled so the text
/// prints as written. Falls back to double quotes when the text holds a
/// single quote.
fn quote(message: &str) -> String {
  let message = message.replace('%', "%%");
  if message.contains('\'') {
    format!("\"{message}\"")
  } else {
    format!("'{message}'")
  }
}

/// Line buffer that knows whether to keep annotations.
struct Section {
  lines: Vec<String>,
  annotate: bool,
}

impl Section {
  fn new(annotate: bool) -> Self {
    Self {
      lines: Vec::new(),
      annotate,
    }
  }

  fn plain(&mut self, line: impl Into<String>) {
    self.lines.push(line.into());
  }

  fn commented(&mut self, line: impl Into<String>, comment: impl AsRef<str>) {
    let line = line.into();
    if self.annotate {
      self
        .lines
        .push(format!("{line:<COMMENT_COLUMN$}; {}", comment.as_ref()));
    } else {
      self.lines.push(line);
    }
  }

  fn blank(&mut self) {
    self.lines.push(String::new());
  }

  fn extend(&mut self, other: Section) {
    self.lines.extend(other.lines);
  }

  fn finish(self) -> String {
    let mut out = self.lines.join("\n");
    out.push('\n');
    out
  }
}
