use jslox::ast::{Expr, Stmt};
use jslox::ast_printer::AstPrinter;
use jslox::parser::{Parser, Program, MAX_NESTING};
use jslox::scanner::scan;
use pretty_assertions::assert_eq;

fn parse(source: &str) -> Program {
    Parser::new(scan(source).expect("source should scan")).parse()
}

fn printed(source: &str) -> Vec<String> {
    let program = parse(source);
    assert!(
        program.errors.is_empty(),
        "unexpected parse errors: {:?}",
        program.errors
    );
    program.statements.iter().map(AstPrinter::print_stmt).collect()
}

fn errors(source: &str) -> Vec<String> {
    parse(source).errors.iter().map(|e| e.to_string()).collect()
}

#[test]
fn precedence_climbs_from_assignment_to_primary() {
    assert_eq!(
        printed("a = 1 + 2 * 3 - -4 / 2 < 5 == !true or x and y;"),
        vec!["(; (= a (or (== (< (- (+ 1 (* 2 3)) (/ (- 4) 2)) 5) (! true)) (and x y))))"]
    );
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(printed("1 - 2 - 3;"), vec!["(; (- (- 1 2) 3))"]);
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(printed("a = b = 3;"), vec!["(; (= a (= b 3)))"]);
}

#[test]
fn grouping_is_preserved_in_tree() {
    let program = parse("(2 + 3) * 4;");

    let Stmt::Expression(Expr::Binary { left, .. }) = &program.statements[0] else {
        panic!("expected binary expression statement");
    };
    assert!(matches!(**left, Expr::Grouping(_)));
    assert_eq!(
        AstPrinter::print_stmt(&program.statements[0]),
        "(; (* (group (+ 2 3)) 4))"
    );
}

#[test]
fn chained_calls() {
    assert_eq!(
        printed("f()(1, \"a\")(g(2));"),
        vec!["(; (call (call (call f) 1 \"a\") (call g 2)))"]
    );
}

#[test]
fn statement_forms() {
    let source = r#"
        var a;
        var b = null;
        function add(x, y) { return x + y; }
        { print a; }
        if (a) print 1; else print 2;
        if (b) print 3;
        while (false) a = a;
        for (var i = 0; i < 3; i = i + 1) print i;
        for (;;) return;
    "#;

    assert_eq!(
        printed(source),
        vec![
            "(var a)",
            "(var b null)",
            "(fun add (x y) (return (+ x y)))",
            "(block (print a))",
            "(if a (print 1) (print 2))",
            "(if b (print 3))",
            "(while false (; (= a a)))",
            "(for (var i 0) (< i 3) (= i (+ i 1)) (print i))",
            "(for _ _ _ (return))",
        ]
    );
}

#[test]
fn for_with_expression_initializer() {
    assert_eq!(
        printed("for (i = 0; i < 2;) print i;"),
        vec!["(for (; (= i 0)) (< i 2) _ (print i))"]
    );
}

#[test]
fn error_messages_name_the_offending_token() {
    assert_eq!(errors("var = 1;"), vec!["Error at '=': Expect variable name."]);
    assert_eq!(errors("print 1"), vec!["Error at end: Expect ';' after value."]);
    assert_eq!(errors("1 +;"), vec!["Error at ';': Expect expression."]);
}

#[test]
fn invalid_assignment_target_keeps_statement() {
    let program = parse("1 + 2 = 3; print 4;");

    let messages: Vec<String> = program.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages, vec!["Error at '=': Invalid assignment target."]);

    let printed: Vec<String> = program.statements.iter().map(AstPrinter::print_stmt).collect();
    assert_eq!(printed, vec!["(; (+ 1 2))", "(print 4)"]);
}

#[test]
fn synchronize_resumes_at_next_statement() {
    let program = parse("var a = ;\nprint 1;\nvar b = 2 3;\nprint b;");

    let messages: Vec<String> = program.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "Error at ';': Expect expression.",
            "Error at '3': Expect ';' after variable declaration.",
        ]
    );

    let printed: Vec<String> = program.statements.iter().map(AstPrinter::print_stmt).collect();
    assert_eq!(printed, vec!["(print 1)", "(print b)"]);
    assert_eq!(program.errors[1].line(), Some(3));
}

#[test]
fn synchronize_stops_before_statement_keywords() {
    let program = parse("var x = 1 + ) while (true) print 1;");

    assert_eq!(program.errors.len(), 1);
    let printed: Vec<String> = program.statements.iter().map(AstPrinter::print_stmt).collect();
    assert_eq!(printed, vec!["(while true (print 1))"]);
}

#[test]
fn errors_inside_blocks_do_not_lose_the_block() {
    let program = parse("{ var = 1; print 2; }");

    assert_eq!(program.errors.len(), 1);
    let printed: Vec<String> = program.statements.iter().map(AstPrinter::print_stmt).collect();
    assert_eq!(printed, vec!["(block (print 2))"]);
}

fn many(count: usize, prefix: &str) -> String {
    (0..count)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[test]
fn too_many_parameters_is_reported_without_abandoning() {
    let source = format!("function f({}) {{}} print 1;", many(256, "p"));
    let program = parse(&source);

    let messages: Vec<String> = program.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        messages,
        vec!["Error at 'p255': Can't have more than 255 parameters."]
    );
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn too_many_arguments_is_reported_without_abandoning() {
    let source = format!("f({});", many(256, ""));
    let program = parse(&source);

    let messages: Vec<String> = program.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        messages,
        vec!["Error at '255': Can't have more than 255 arguments."]
    );
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn exactly_255_arguments_is_fine() {
    let source = format!("f({});", many(255, ""));

    assert!(parse(&source).errors.is_empty());
}

#[test]
fn empty_input_parses_to_nothing() {
    let program = parse("  // only a comment\n");

    assert!(program.statements.is_empty());
    assert!(!program.has_errors());
}

#[test]
fn missing_eof_is_supplied() {
    let mut tokens = scan("print 1;").unwrap();
    tokens.pop();

    let program = Parser::new(tokens).parse();
    assert_eq!(program.statements.len(), 1);
    assert!(program.errors.is_empty());
}

#[test]
fn nesting_past_the_limit_is_reported_once() {
    let grouped = format!("{}1{};", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    let negated = format!("{}true;", "!".repeat(MAX_NESTING));

    for source in [grouped, negated] {
        let program = parse(&source);
        let at = &source[..1];

        let messages: Vec<String> = program.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, vec![format!("Error at '{}': Too much nesting.", at)]);
        assert!(program.statements.is_empty());
    }
}

#[test]
fn nesting_below_the_limit_parses() {
    let blocks = format!("{}print 1;{}", "{".repeat(100), "}".repeat(100));

    assert!(parse(&blocks).errors.is_empty());
}
