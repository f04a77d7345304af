//! Lexical analysis: turns the raw source text into a flat token stream.
//!
//! The scanner never fails. Anything it cannot classify becomes an `Illegal`
//! token and is left for the parser to report, so every pass over the input
//! ends in exactly one `Eof` token.

use std::fmt;

use tracing::trace;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Var,
  Print,
  Input,
  Ident,
  IntLit,
  FloatLit,
  StringLit,
  Assign,
  Plus,
  Minus,
  Mul,
  Div,
  Eof,
  Illegal,
}

impl TokenKind {
  /// Tag used in diagnostics and trace output.
  pub fn name(self) -> &'static str {
    match self {
      TokenKind::Var => "VAR",
      TokenKind::Print => "PRINT",
      TokenKind::Input => "INPUT",
      TokenKind::Ident => "IDENT",
      TokenKind::IntLit => "INT_LIT",
      TokenKind::FloatLit => "FLOAT_LIT",
      TokenKind::StringLit => "STRING_LIT",
      TokenKind::Assign => "ASSIGN",
      TokenKind::Plus => "PLUS",
      TokenKind::Minus => "MINUS",
      TokenKind::Mul => "MUL",
      TokenKind::Div => "DIV",
      TokenKind::Eof => "EOF",
      TokenKind::Illegal => "ILLEGAL",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A classified slice of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub literal: String,
  /// Byte offset of the first character in the source.
  pub loc: usize,
}

impl Token {
  pub fn new(kind: TokenKind, literal: impl Into<String>, loc: usize) -> Self {
    Self {
      kind,
      literal: literal.into(),
      loc,
    }
  }
}

/// Forward-only cursor over the source text.
pub struct Scanner<'a> {
  source: &'a str,
  pos: usize,
  finished: bool,
}

impl<'a> Scanner<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      finished: false,
    }
  }

  /// Produce the next token. Once the input is exhausted this keeps
  /// returning `Eof`.
  pub fn next_token(&mut self) -> Token {
    self.skip_trivia();

    let bytes = self.source.as_bytes();
    let start = self.pos;
    let Some(&c) = bytes.get(start) else {
      return Token::new(TokenKind::Eof, "", self.source.len());
    };

    if c.is_ascii_alphabetic() || c == b'_' {
      self.pos = self.scan_while(start, |b| b.is_ascii_alphanumeric() || b == b'_');
      let text = &self.source[start..self.pos];
      return Token::new(lookup_keyword(text), text, start);
    }

    if c.is_ascii_digit() {
      return self.scan_number(start);
    }

    if c == b'"' {
      return self.scan_string(start);
    }

    let kind = match c {
      b'=' => Some(TokenKind::Assign),
      b'+' => Some(TokenKind::Plus),
      b'-' => Some(TokenKind::Minus),
      b'*' => Some(TokenKind::Mul),
      b'/' => Some(TokenKind::Div),
      _ => None,
    };
    if let Some(kind) = kind {
      self.pos += 1;
      return Token::new(kind, &self.source[start..self.pos], start);
    }

    // Step over a whole character so multi-byte input stays on boundaries.
    let width = self.source[start..]
      .chars()
      .next()
      .map(char::len_utf8)
      .unwrap_or(1);
    self.pos += width;
    Token::new(TokenKind::Illegal, &self.source[start..self.pos], start)
  }

  /// Skip whitespace and `//` comments, in any interleaving.
  fn skip_trivia(&mut self) {
    let bytes = self.source.as_bytes();
    loop {
      self.pos = self.scan_while(self.pos, |b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
      if bytes[self.pos..].starts_with(b"//") {
        self.pos = self.scan_while(self.pos, |b| b != b'\n');
        continue;
      }
      break;
    }
  }

  /// Digits with at most one decimal point. A second point ends the literal
  /// without being consumed.
  fn scan_number(&mut self, start: usize) -> Token {
    let bytes = self.source.as_bytes();
    let mut end = start;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
      if b.is_ascii_digit() {
        end += 1;
      } else if b == b'.' && !seen_dot {
        seen_dot = true;
        end += 1;
      } else {
        break;
      }
    }
    self.pos = end;

    let kind = if seen_dot {
      TokenKind::FloatLit
    } else {
      TokenKind::IntLit
    };
    Token::new(kind, &self.source[start..end], start)
  }

  /// Text between quotes, no escapes. An unterminated string runs to the end
  /// of input.
  fn scan_string(&mut self, start: usize) -> Token {
    let body = start + 1;
    let close = self.scan_while(body, |b| b != b'"');
    let text = &self.source[body..close];
    // Consume the closing quote when there is one.
    self.pos = (close + 1).min(self.source.len());
    Token::new(TokenKind::StringLit, text, start)
  }

  fn scan_while(&self, from: usize, pred: impl Fn(u8) -> bool) -> usize {
    let bytes = self.source.as_bytes();
    let mut i = from;
    while i < bytes.len() && pred(bytes[i]) {
      i += 1;
    }
    i
  }
}

impl Iterator for Scanner<'_> {
  type Item = Token;

  /// Yields every token up to and including a single `Eof`, then stops.
  fn next(&mut self) -> Option<Token> {
    if self.finished {
      return None;
    }
    let token = self.next_token();
    if token.kind == TokenKind::Eof {
      self.finished = true;
    }
    Some(token)
  }
}

fn lookup_keyword(text: &str) -> TokenKind {
  match text {
    "var" => TokenKind::Var,
    "print" => TokenKind::Print,
    "input" => TokenKind::Input,
    _ => TokenKind::Ident,
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(source: &str) -> Vec<Token> {
  let tokens: Vec<Token> = Scanner::new(source).collect();
  for (index, token) in tokens.iter().enumerate() {
    trace!(index, kind = %token.kind, literal = %token.literal, "token");
  }
  tokens
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    TokenKind::StringLit => format!("\"{}\"", token.literal),
    _ => token.literal.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).into_iter().map(|t| t.kind).collect()
  }

  fn pairs(source: &str) -> Vec<(TokenKind, String)> {
    tokenize(source)
      .into_iter()
      .map(|t| (t.kind, t.literal))
      .collect()
  }

  #[test]
  fn keywords_and_identifiers() {
    assert_eq!(
      kinds("var print input variable Print _tmp1"),
      vec![
        TokenKind::Var,
        TokenKind::Print,
        TokenKind::Input,
        TokenKind::Ident,
        TokenKind::Ident,
        TokenKind::Ident,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn second_decimal_point_ends_the_literal() {
    assert_eq!(
      pairs("10.5.2"),
      vec![
        (TokenKind::FloatLit, "10.5".to_string()),
        (TokenKind::Illegal, ".".to_string()),
        (TokenKind::IntLit, "2".to_string()),
        (TokenKind::Eof, String::new()),
      ]
    );
  }

  #[test]
  fn trailing_point_is_still_a_float() {
    assert_eq!(pairs("7.")[0], (TokenKind::FloatLit, "7.".to_string()));
  }

  #[test]
  fn comments_are_discarded() {
    assert_eq!(
      kinds("// header\nvar x = 1 // trailing\n// last line without newline"),
      vec![
        TokenKind::Var,
        TokenKind::Ident,
        TokenKind::Assign,
        TokenKind::IntLit,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn tabs_and_crlf_are_whitespace() {
    let tokens = tokenize("var\tx = 1\r\nprint x // done\r\n\tinput x\r\n");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
      kinds,
      vec![
        TokenKind::Var,
        TokenKind::Ident,
        TokenKind::Assign,
        TokenKind::IntLit,
        TokenKind::Print,
        TokenKind::Ident,
        TokenKind::Input,
        TokenKind::Ident,
        TokenKind::Eof,
      ]
    );
    assert_eq!(tokens[4].loc, 11);
    assert_eq!(tokens[6].loc, 29);
  }

  #[test]
  fn lone_slash_is_division() {
    assert_eq!(
      kinds("a / b"),
      vec![TokenKind::Ident, TokenKind::Div, TokenKind::Ident, TokenKind::Eof]
    );
  }

  #[test]
  fn string_literal_strips_quotes_without_escapes() {
    let tokens = tokenize(r#"print "a\nb" x"#);
    assert_eq!(tokens[1].kind, TokenKind::StringLit);
    assert_eq!(tokens[1].literal, r"a\nb");
    assert_eq!(tokens[2].kind, TokenKind::Ident);
  }

  #[test]
  fn unterminated_string_runs_to_end_of_input() {
    assert_eq!(
      pairs("print \"never closed"),
      vec![
        (TokenKind::Print, "print".to_string()),
        (TokenKind::StringLit, "never closed".to_string()),
        (TokenKind::Eof, String::new()),
      ]
    );
  }

  #[test]
  fn unknown_characters_are_illegal() {
    assert_eq!(
      pairs("(é)"),
      vec![
        (TokenKind::Illegal, "(".to_string()),
        (TokenKind::Illegal, "é".to_string()),
        (TokenKind::Illegal, ")".to_string()),
        (TokenKind::Eof, String::new()),
      ]
    );
  }

  #[test]
  fn locations_are_byte_offsets() {
    let tokens = tokenize("x = 10\ny");
    let locs: Vec<usize> = tokens.iter().map(|t| t.loc).collect();
    assert_eq!(locs, vec![0, 2, 4, 7, 8]);
  }

  #[test]
  fn scanner_keeps_returning_eof() {
    let mut scanner = Scanner::new("x");
    assert_eq!(scanner.next_token().kind, TokenKind::Ident);
    assert_eq!(scanner.next_token().kind, TokenKind::Eof);
    assert_eq!(scanner.next_token().kind, TokenKind::Eof);
  }

  #[test]
  fn iterator_yields_exactly_one_eof() {
    let eofs = Scanner::new("")
      .filter(|t| t.kind == TokenKind::Eof)
      .count();
    assert_eq!(eofs, 1);
  }
}
