//! Type checking over the statement list.
//!
//! The checker infers a type for every declaration and operand, then
//! validates assignments. It never stops at the first problem: every
//! statement is visited and all diagnostics are returned together.

use std::collections::HashMap;
use std::fmt;

use snafu::Snafu;
use tracing::{debug, trace};

use crate::parser::{BinaryOp, Literal, Operand, Operation, PrintArg, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
  Float,
  Unknown,
}

impl Type {
  /// `Unknown` is compatible with nothing, itself included.
  pub fn is_compatible_with(self, other: Type) -> bool {
    self == other && self != Type::Unknown
  }

  /// Type of a chain once an operand of type `other` has been folded in.
  fn widen(self, other: Type) -> Type {
    match (self, other) {
      (Type::Unknown, _) | (_, Type::Unknown) => Type::Unknown,
      (Type::Float, _) | (_, Type::Float) => Type::Float,
      (Type::Int, Type::Int) => Type::Int,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Type::Int => "INT",
      Type::Float => "FLOAT",
      Type::Unknown => "UNKNOWN",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub ty: Type,
}

/// Symbols in first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
  symbols: Vec<Symbol>,
  index: HashMap<String, usize>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a new symbol. Returns `false` and leaves the table untouched
  /// when the name is already taken.
  pub fn declare(&mut self, name: &str, ty: Type) -> bool {
    if self.index.contains_key(name) {
      return false;
    }
    self.index.insert(name.to_string(), self.symbols.len());
    self.symbols.push(Symbol {
      name: name.to_string(),
      ty,
    });
    true
  }

  pub fn get(&self, name: &str) -> Option<&Symbol> {
    self.index.get(name).map(|&i| &self.symbols[i])
  }

  pub fn type_of(&self, name: &str) -> Option<Type> {
    self.get(name).map(|symbol| symbol.ty)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.symbols.iter()
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SemanticError {
  #[snafu(display("duplicate declaration of '{name}'"))]
  DuplicateDeclaration { name: String },

  #[snafu(display("undeclared variable '{name}'"))]
  UndeclaredVariable { name: String },

  #[snafu(display("type incompatible: cannot operate {expected} with {found}"))]
  TypeIncompatible { expected: Type, found: Type },

  #[snafu(display("illegal division: '{dividend}' is {dividend_ty} but '{divisor}' is {divisor_ty}"))]
  IllegalDivision {
    dividend: String,
    dividend_ty: Type,
    divisor: String,
    divisor_ty: Type,
  },

  #[snafu(display("conflicting assignment: '{name}' is {declared} but the expression is {found}"))]
  ConflictingAssignment {
    name: String,
    declared: Type,
    found: Type,
  },
}

/// Infer the type of a piece of literal or identifier text.
///
/// Only text that starts like a number is tried as a float, so identifiers
/// such as `inf` or `nan` resolve through the symbol table instead.
pub fn infer_type(text: &str, symbols: &SymbolTable) -> Type {
  if text.parse::<i64>().is_ok() {
    return Type::Int;
  }
  let numeric_start = text
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_digit() || c == '.');
  if numeric_start && text.parse::<f64>().is_ok() {
    return Type::Float;
  }
  symbols.type_of(text).unwrap_or(Type::Unknown)
}

/// Result of one full checking pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
  pub symbols: SymbolTable,
  pub errors: Vec<SemanticError>,
}

impl Analysis {
  pub fn is_ok(&self) -> bool {
    self.errors.is_empty()
  }
}

/// State for a single checking pass. Build a fresh one per compilation unit.
#[derive(Debug, Default)]
pub struct TypeChecker {
  symbols: SymbolTable,
  errors: Vec<SemanticError>,
}

impl TypeChecker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn run(mut self, statements: &[Statement]) -> Analysis {
    for statement in statements {
      self.visit(statement);
    }
    debug!(
      symbols = self.symbols.len(),
      errors = self.errors.len(),
      "type check finished"
    );
    Analysis {
      symbols: self.symbols,
      errors: self.errors,
    }
  }

  fn visit(&mut self, statement: &Statement) {
    match statement {
      Statement::VarDecl { name, init } => self.declare(name, init),
      Statement::Print(PrintArg::Text(_)) => {}
      Statement::Print(PrintArg::Variable(name)) | Statement::Input { name } => {
        self.require_declared(name);
      }
      Statement::Assignment {
        dest,
        first,
        operations,
      } => self.check_assignment(dest, first, operations),
    }
  }

  fn declare(&mut self, name: &str, init: &Literal) {
    let ty = infer_type(init.text(), &self.symbols);
    if self.symbols.declare(name, ty) {
      trace!(name, %ty, "declared");
    } else {
      self.errors.push(SemanticError::DuplicateDeclaration {
        name: name.to_string(),
      });
    }
  }

  fn require_declared(&mut self, name: &str) -> Option<Type> {
    let ty = self.symbols.type_of(name);
    if ty.is_none() {
      self.errors.push(SemanticError::UndeclaredVariable {
        name: name.to_string(),
      });
    }
    ty
  }

  fn check_assignment(&mut self, dest: &str, first: &Operand, operations: &[Operation]) {
    let declared = self.require_declared(dest);

    let first_ty = self.operand_type(first);
    let mut expr_ty = first_ty;
    for operation in operations {
      let operand_ty = self.operand_type(&operation.operand);

      if operation.op == BinaryOp::Div && !first_ty.is_compatible_with(operand_ty) {
        self.errors.push(SemanticError::IllegalDivision {
          dividend: first.text().to_string(),
          dividend_ty: first_ty,
          divisor: operation.operand.text().to_string(),
          divisor_ty: operand_ty,
        });
      }
      if !first_ty.is_compatible_with(operand_ty) {
        self.errors.push(SemanticError::TypeIncompatible {
          expected: first_ty,
          found: operand_ty,
        });
      }
      expr_ty = expr_ty.widen(operand_ty);
    }

    if let Some(declared) = declared {
      if declared != expr_ty {
        self.errors.push(SemanticError::ConflictingAssignment {
          name: dest.to_string(),
          declared,
          found: expr_ty,
        });
      }
    }
  }

  fn operand_type(&self, operand: &Operand) -> Type {
    match operand {
      Operand::Literal(literal) => infer_type(literal.text(), &self.symbols),
      Operand::Variable(name) => self.symbols.type_of(name).unwrap_or(Type::Unknown),
    }
  }
}

/// Run a full pass and return its symbol table together with every diagnostic.
pub fn analyze(statements: &[Statement]) -> Analysis {
  TypeChecker::new().run(statements)
}

/// Run a full pass and return every diagnostic. Empty means success.
pub fn check(statements: &[Statement]) -> Vec<SemanticError> {
  analyze(statements).errors
}
