//! Shared error types for the compilation pipeline.
//!
//! Syntax errors point at the offending token with a caret under the source
//! line, in the spirit of chibicc. Semantic errors are collected by the
//! checker and reported as one batch.

use snafu::Snafu;

use crate::checker::SemanticError;
use crate::parser::SyntaxError;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{line}:{column}: {source}\n{excerpt}\n{marker}"))]
  Syntax {
    source: SyntaxError,
    line: usize,
    column: usize,
    excerpt: String,
    marker: String,
  },

  #[snafu(display("{}", list_errors(errors)))]
  Semantic { errors: Vec<SemanticError> },
}

impl CompileError {
  /// Anchor a syntax error at its token's location in `text`.
  pub fn syntax(text: &str, error: SyntaxError) -> Self {
    let mut loc = error.token().loc.min(text.len());
    while !text.is_char_boundary(loc) {
      loc -= 1;
    }

    let line_start = text[..loc].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[loc..]
      .find('\n')
      .map(|i| loc + i)
      .unwrap_or(text.len());
    let line = text[..line_start].matches('\n').count() + 1;
    let column = text[line_start..loc].chars().count() + 1;
    let excerpt = text[line_start..line_end].trim_end_matches('\r').to_string();
    let marker = format!("{}^", " ".repeat(column - 1));

    Self::Syntax {
      source: error,
      line,
      column,
      excerpt,
      marker,
    }
  }

  /// Every semantic diagnostic, or an empty slice for a syntax error.
  pub fn semantic_errors(&self) -> &[SemanticError] {
    match self {
      CompileError::Semantic { errors } => errors,
      CompileError::Syntax { .. } => &[],
    }
  }
}

fn list_errors(errors: &[SemanticError]) -> String {
  let mut out = format!("{} semantic error(s):", errors.len());
  for error in errors {
    out.push_str("\n  >> ");
    out.push_str(&error.to_string());
  }
  out
}
