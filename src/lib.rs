//! Crate root: wires together the compilation pipeline.
//!
//! Each stage fully consumes its input before the next one starts:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` turns the tokens into a flat list of statements.
//! - `checker` infers types and collects every semantic diagnostic.
//! - `codegen` lowers the checked statements into NASM x86-64 assembly.
//! - `error` holds the error types shared by the stages.
//!
//! No stage keeps global state, so independent compilations can run on
//! separate threads without coordination.

pub mod checker;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod tokenizer;

use tracing::{debug, info};

pub use checker::{analyze, check, Analysis, SemanticError, SymbolTable, Type};
pub use codegen::{generate, Codegen};
pub use error::{CompileError, CompileResult};
pub use parser::{parse, Statement, SyntaxError};
pub use tokenizer::{tokenize, Token, TokenKind};

/// Pipeline settings.
#[derive(Debug, Clone, Copy)]
pub struct Compiler {
  annotate: bool,
}

impl Default for Compiler {
  fn default() -> Self {
    Self::new()
  }
}

impl Compiler {
  pub fn new() -> Self {
    Self { annotate: true }
  }

  /// Keep or drop the `; ...` comments in the generated assembly.
  pub fn annotate(mut self, annotate: bool) -> Self {
    self.annotate = annotate;
    self
  }

  /// Compile a source string into assembly text.
  pub fn compile(&self, source: &str) -> CompileResult<String> {
    let tokens = tokenize(source);
    debug!(tokens = tokens.len(), "lexical analysis done");

    let statements = parse(&tokens).map_err(|err| CompileError::syntax(source, err))?;
    debug!(statements = statements.len(), "syntax analysis done");

    let errors = check(&statements);
    if !errors.is_empty() {
      return Err(CompileError::Semantic { errors });
    }
    debug!("semantic analysis done");

    let asm = Codegen::with_annotations(self.annotate).generate(&statements);
    info!(bytes = asm.len(), "compilation finished");
    Ok(asm)
  }
}

/// Compile a source string into annotated assembly.
pub fn compile(source: &str) -> CompileResult<String> {
  Compiler::new().compile(source)
}
