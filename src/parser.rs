//! Recursive-descent parser producing a flat statement list.
//!
//! The language has no nesting, so the AST is a `Vec<Statement>` rather than a
//! tree. Each statement starts with a distinct token (`var`, `print`, `input`,
//! or an identifier followed by `=`) and there is no terminator: a statement
//! ends wherever the next token cannot continue it.
//!
//! Arithmetic is a chain evaluated strictly left to right. `a + b * c` is
//! `((a + b) * c)`; there is no precedence and the code generator depends on it.

use snafu::Snafu;
use tracing::trace;

use crate::tokenizer::{describe_token, Token, TokenKind};

/// A numeric literal, kept as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
  Int(String),
  Float(String),
}

impl Literal {
  pub fn text(&self) -> &str {
    match self {
      Literal::Int(text) | Literal::Float(text) => text,
    }
  }
}

/// One term of an arithmetic chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Literal(Literal),
  Variable(String),
}

impl Operand {
  pub fn int(text: impl Into<String>) -> Self {
    Self::Literal(Literal::Int(text.into()))
  }

  pub fn float(text: impl Into<String>) -> Self {
    Self::Literal(Literal::Float(text.into()))
  }

  pub fn variable(name: impl Into<String>) -> Self {
    Self::Variable(name.into())
  }

  pub fn is_variable(&self) -> bool {
    matches!(self, Operand::Variable(_))
  }

  pub fn text(&self) -> &str {
    match self {
      Operand::Literal(literal) => literal.text(),
      Operand::Variable(name) => name,
    }
  }
}

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  fn from_token(kind: TokenKind) -> Option<Self> {
    match kind {
      TokenKind::Plus => Some(BinaryOp::Add),
      TokenKind::Minus => Some(BinaryOp::Sub),
      TokenKind::Mul => Some(BinaryOp::Mul),
      TokenKind::Div => Some(BinaryOp::Div),
      _ => None,
    }
  }
}

/// An operator applied to the running accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
  pub op: BinaryOp,
  pub operand: Operand,
}

impl Operation {
  pub fn new(op: BinaryOp, operand: Operand) -> Self {
    Self { op, operand }
  }

  pub fn is_variable(&self) -> bool {
    self.operand.is_variable()
  }
}

/// What a `print` statement writes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintArg {
  Text(String),
  Variable(String),
}

impl PrintArg {
  pub fn is_string_literal(&self) -> bool {
    matches!(self, PrintArg::Text(_))
  }

  pub fn value(&self) -> &str {
    match self {
      PrintArg::Text(value) | PrintArg::Variable(value) => value,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  /// `var <name> = <literal>`
  VarDecl { name: String, init: Literal },
  /// `print "<text>"` or `print <name>`
  Print(PrintArg),
  /// `input <name>`
  Input { name: String },
  /// `<dest> = <first> (<op> <operand>)*`
  Assignment {
    dest: String,
    first: Operand,
    operations: Vec<Operation>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SyntaxError {
  #[snafu(display(
    "identifier out of context: '{}' at token {position}",
    token.literal
  ))]
  OutOfContext { token: Token, position: usize },

  #[snafu(display(
    "unexpected token '{}' ({}) at token {position}",
    describe_token(token),
    token.kind
  ))]
  UnexpectedToken { token: Token, position: usize },
}

impl SyntaxError {
  pub fn token(&self) -> &Token {
    match self {
      SyntaxError::OutOfContext { token, .. } | SyntaxError::UnexpectedToken { token, .. } => token,
    }
  }

  /// Index of the offending token in the token sequence.
  pub fn position(&self) -> usize {
    match self {
      SyntaxError::OutOfContext { position, .. }
      | SyntaxError::UnexpectedToken { position, .. } => *position,
    }
  }
}

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Parse a whole compilation unit. Nothing is returned unless every
/// statement parses.
pub fn parse(tokens: &[Token]) -> ParseResult<Vec<Statement>> {
  let mut stream = TokenStream::new(tokens);
  let mut statements = Vec::new();

  while !stream.is_eof() {
    let statement = parse_statement(&mut stream)?;
    trace!(index = statements.len(), ?statement, "statement");
    statements.push(statement);
  }

  Ok(statements)
}

fn parse_statement(stream: &mut TokenStream) -> ParseResult<Statement> {
  match stream.peek_kind() {
    TokenKind::Var => parse_var_decl(stream),
    TokenKind::Print => parse_print(stream),
    TokenKind::Input => parse_input(stream),
    TokenKind::Ident => {
      if stream.peek_kind_at(1) == TokenKind::Assign {
        parse_assignment(stream)
      } else {
        Err(stream.out_of_context())
      }
    }
    _ => Err(stream.unexpected()),
  }
}

fn parse_var_decl(stream: &mut TokenStream) -> ParseResult<Statement> {
  stream.expect(TokenKind::Var)?;
  let name = stream.expect(TokenKind::Ident)?.literal;
  stream.expect(TokenKind::Assign)?;
  let init = match stream.peek_kind() {
    TokenKind::IntLit => Literal::Int(stream.advance().literal),
    TokenKind::FloatLit => Literal::Float(stream.advance().literal),
    _ => return Err(stream.unexpected()),
  };
  Ok(Statement::VarDecl { name, init })
}

fn parse_print(stream: &mut TokenStream) -> ParseResult<Statement> {
  stream.expect(TokenKind::Print)?;
  let arg = match stream.peek_kind() {
    TokenKind::StringLit => PrintArg::Text(stream.advance().literal),
    TokenKind::Ident => PrintArg::Variable(stream.advance().literal),
    _ => return Err(stream.unexpected()),
  };
  Ok(Statement::Print(arg))
}

fn parse_input(stream: &mut TokenStream) -> ParseResult<Statement> {
  stream.expect(TokenKind::Input)?;
  let name = stream.expect(TokenKind::Ident)?.literal;
  Ok(Statement::Input { name })
}

fn parse_assignment(stream: &mut TokenStream) -> ParseResult<Statement> {
  let dest = stream.expect(TokenKind::Ident)?.literal;
  stream.expect(TokenKind::Assign)?;
  let first = parse_operand(stream)?;

  let mut operations = Vec::new();
  while let Some(op) = BinaryOp::from_token(stream.peek_kind()) {
    stream.advance();
    let operand = parse_operand(stream)?;
    operations.push(Operation::new(op, operand));
  }

  Ok(Statement::Assignment {
    dest,
    first,
    operations,
  })
}

fn parse_operand(stream: &mut TokenStream) -> ParseResult<Operand> {
  match stream.peek_kind() {
    TokenKind::Ident => Ok(Operand::Variable(stream.advance().literal)),
    TokenKind::IntLit => Ok(Operand::int(stream.advance().literal)),
    TokenKind::FloatLit => Ok(Operand::float(stream.advance().literal)),
    _ => Err(stream.unexpected()),
  }
}

/// Lightweight cursor over the token slice. It never moves past the final
/// token, so a stream that lost its `Eof` still terminates.
struct TokenStream<'t> {
  tokens: &'t [Token],
  pos: usize,
}

impl<'t> TokenStream<'t> {
  fn new(tokens: &'t [Token]) -> Self {
    Self { tokens, pos: 0 }
  }

  fn current(&self) -> Token {
    self.tokens.get(self.pos).cloned().unwrap_or_else(|| {
      let loc = self
        .tokens
        .last()
        .map(|t| t.loc + t.literal.len())
        .unwrap_or(0);
      Token::new(TokenKind::Eof, "", loc)
    })
  }

  fn peek_kind(&self) -> TokenKind {
    self.peek_kind_at(0)
  }

  fn peek_kind_at(&self, offset: usize) -> TokenKind {
    self
      .tokens
      .get(self.pos + offset)
      .map(|t| t.kind)
      .unwrap_or(TokenKind::Eof)
  }

  fn is_eof(&self) -> bool {
    self.peek_kind() == TokenKind::Eof
  }

  /// Consume the current token. `Eof` is never consumed.
  fn advance(&mut self) -> Token {
    let token = self.current();
    if token.kind != TokenKind::Eof {
      self.pos += 1;
    }
    token
  }

  fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
    if self.peek_kind() == kind {
      Ok(self.advance())
    } else {
      Err(self.unexpected())
    }
  }

  fn unexpected(&self) -> SyntaxError {
    SyntaxError::UnexpectedToken {
      token: self.current(),
      position: self.pos,
    }
  }

  fn out_of_context(&self) -> SyntaxError {
    SyntaxError::OutOfContext {
      token: self.current(),
      position: self.pos,
    }
  }
}
