use sigmac::checker::SemanticError;
use sigmac::parser::{Literal, PrintArg};
use sigmac::{
  analyze, check, compile, generate, parse, tokenize, CompileError, Compiler, Statement,
  TokenKind, Type,
};

fn statements(source: &str) -> Vec<Statement> {
  parse(&tokenize(source)).expect("source should parse")
}

/// Lines between the prologue and the epilogue.
fn body(asm: &str) -> Vec<&str> {
  let lines: Vec<&str> = asm.lines().collect();
  let start = lines
    .iter()
    .position(|line| line.starts_with("    sub rsp, 32"))
    .unwrap();
  let end = lines
    .iter()
    .position(|line| line.starts_with("    add rsp, 32"))
    .unwrap();
  lines[start + 1..end]
    .iter()
    .copied()
    .filter(|line| !line.is_empty())
    .collect()
}

fn data(asm: &str) -> &str {
  let end = asm.find("section .text").unwrap();
  &asm[..end]
}

#[test]
fn declare_and_print() {
  let ast = statements("var x = 10\nprint x");
  assert_eq!(
    ast,
    vec![
      Statement::VarDecl {
        name: "x".into(),
        init: Literal::Int("10".into()),
      },
      Statement::Print(PrintArg::Variable("x".into())),
    ]
  );
  assert!(check(&ast).is_empty());

  let asm = Compiler::new().annotate(false).compile("var x = 10\nprint x").unwrap();
  insta::assert_snapshot!(asm.trim_end(), @r#"
    section .data
        fmt_in               db ' %ld', 0
        fmt_out_num          db '%ld', 10, 0
        x                    dq 10

    section .text
    extern printf, scanf
    global main

    main:
        push rbp
        mov rbp, rsp
        sub rsp, 32

        lea rdi, [fmt_out_num]
        mov rsi, [x]
        xor eax, eax
        call printf

        add rsp, 32
        pop rbp
        mov rax, 0
        ret
    "#);
}

#[test]
fn mixed_division_is_rejected() {
  let errors = check(&statements("var x = 10\nvar y = 20\ny = x / 2.5"));
  assert!(errors.iter().any(|e| matches!(
    e,
    SemanticError::TypeIncompatible {
      expected: Type::Int,
      found: Type::Float,
    }
  )));
  assert!(errors.iter().any(|e| matches!(
    e,
    SemanticError::IllegalDivision {
      dividend_ty: Type::Int,
      divisor_ty: Type::Float,
      ..
    }
  )));
  assert!(errors.iter().any(|e| matches!(
    e,
    SemanticError::ConflictingAssignment {
      declared: Type::Int,
      ..
    }
  )));

  let err = compile("var x = 10\nvar y = 20\ny = x / 2.5").unwrap_err();
  assert_eq!(err.semantic_errors(), errors.as_slice());
}

#[test]
fn undeclared_names() {
  let errors = check(&statements("res = a + b"));
  assert!(errors.contains(&SemanticError::UndeclaredVariable { name: "res".into() }));
  assert!(errors.contains(&SemanticError::TypeIncompatible {
    expected: Type::Unknown,
    found: Type::Unknown,
  }));
}

#[test]
fn print_string_only() {
  let asm = Compiler::new().annotate(false).compile("print \"Hello\"").unwrap();
  assert_eq!(data(&asm).matches("msg_").count(), 1);
  assert!(data(&asm).contains("    msg_0                db 'Hello', 10, 0\n"));
  let code = body(&asm);
  assert_eq!(
    code,
    vec!["    lea rdi, [msg_0]", "    xor eax, eax", "    call printf"]
  );
  assert!(code.iter().all(|line| !line.contains("fmt_")));
}

#[test]
fn unterminated_string_at_end_of_input() {
  let tokens = tokenize("print \"no end");
  let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
  assert_eq!(
    kinds,
    vec![TokenKind::Print, TokenKind::StringLit, TokenKind::Eof]
  );
  assert_eq!(tokens[1].literal, "no end");
}

#[test]
fn double_decimal_point() {
  let tokens: Vec<(TokenKind, String)> = tokenize("10.5.2")
    .into_iter()
    .map(|t| (t.kind, t.literal))
    .collect();
  assert_eq!(
    &tokens[..3],
    &[
      (TokenKind::FloatLit, "10.5".to_string()),
      (TokenKind::Illegal, ".".to_string()),
      (TokenKind::IntLit, "2".to_string()),
    ]
  );
}

#[test]
fn no_operator_precedence() {
  let asm = Compiler::new()
    .annotate(false)
    .compile("var a = 2 var b = 3 var c = 4 var r = 0\nr = a + b * c\nprint r")
    .unwrap();
  assert_eq!(
    &body(&asm)[..4],
    &[
      "    mov rax, [a]",
      "    add rax, [b]",
      "    imul rax, [c]",
      "    mov [r], rax",
    ]
  );
}

#[test]
fn every_declaration_lands_in_the_symbol_table_once() {
  let ast = statements("var a = 1 var b = 2.5 var c = 3 c = a * c print b input a");
  let analysis = analyze(&ast);
  assert!(analysis.is_ok());
  for statement in &ast {
    if let Statement::VarDecl { name, .. } = statement {
      assert_eq!(analysis.symbols.iter().filter(|s| &s.name == name).count(), 1);
    }
  }
  assert_eq!(analysis.symbols.type_of("b"), Some(Type::Float));
}

#[test]
fn passes_are_repeatable() {
  let source = "var n = 0 input n n = n * 2 + 1 print n print \"done\"";
  assert_eq!(statements(source), statements(source));

  let ast = statements(source);
  let snapshot = ast.clone();
  assert_eq!(check(&ast), check(&ast));
  assert_eq!(generate(&ast), generate(&ast));
  assert_eq!(ast, snapshot);
}

#[test]
fn syntax_errors_stop_the_pipeline() {
  let err = compile("var x = 1\nprint x\nx\n").unwrap_err();
  match err {
    CompileError::Syntax { line, column, .. } => assert_eq!((line, column), (3, 1)),
    other => panic!("expected syntax error, got {other:?}"),
  }
  assert!(compile("var x = (1)").is_err());
}

#[test]
fn independent_compilations_on_threads() {
  let sources: Vec<String> = (0..8)
    .map(|i| format!("var v{i} = {i}\nv{i} = v{i} + {i}\nprint v{i}"))
    .collect();
  let outputs: Vec<String> = std::thread::scope(|scope| {
    let handles: Vec<_> = sources
      .iter()
      .map(|source| scope.spawn(move || compile(source).unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });
  for (i, asm) in outputs.iter().enumerate() {
    assert_eq!(asm, &compile(&sources[i]).unwrap());
    assert!(asm.contains(&format!("mov [v{i}], rax")));
  }
}
