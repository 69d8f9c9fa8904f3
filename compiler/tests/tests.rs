use code::{Instruction, Segment};
use compiler::{analyze, compile};
use lexer::LexicalError;
use parser::Production;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use token::{MAX_INT_CONST, Position};

fn compile_ok(input: &str) -> String {
    let compilation = compile(input).unwrap();
    assert!(
        compilation.is_ok(),
        "unexpected errors: {:?}",
        compilation.errors
    );
    compilation.output()
}

#[test]
fn test_hello() {
    let input = r#"
class Main {
    function void main() {
        do Output.printString("Hi");
        return;
    }
}
"#;

    assert_eq!(
        compile_ok(input),
        "function Main.main 0
push constant 2
call String.new 1
push constant 72
call String.appendChar 2
push constant 105
call String.appendChar 2
call Output.printString 1
pop temp 0
push constant 0
return
"
    );
}

#[test]
fn test_method_call_on_variable() {
    let input = "class Main {
        function void main() {
            var Point obj;
            do obj.move(1, 2);
            return;
        }
    }";

    assert_eq!(
        compile_ok(input),
        "function Main.main 1
push local 0
push constant 1
push constant 2
call Point.move 3
pop temp 0
push constant 0
return
"
    );
}

#[test]
fn test_static_call_on_class_name() {
    let input = "class Main {
        function void main() {
            var int x;
            let x = Math.abs(x);
            return;
        }
    }";

    assert_eq!(
        compile_ok(input),
        "function Main.main 1
push local 0
call Math.abs 1
pop local 0
push constant 0
return
"
    );
}

#[test]
fn test_local_shadows_field() {
    let input = "class Cell {
        field int x;
        method void set() {
            var int x;
            let x = 1;
            return;
        }
        method void reset() {
            let x = 2;
            return;
        }
    }";

    assert_eq!(
        compile_ok(input),
        "function Cell.set 1
push argument 0
pop pointer 0
push constant 1
pop local 0
push constant 0
return
function Cell.reset 0
push argument 0
pop pointer 0
push constant 2
pop this 0
push constant 0
return
"
    );
}

#[test]
fn test_integer_range() {
    let wrap = |value: &str| {
        format!("class Main {{ function int f() {{ return {value}; }} }}")
    };

    assert!(compile(&wrap("32767")).unwrap().is_ok());
    assert!(compile(&wrap("0")).unwrap().is_ok());

    let err = compile(&wrap("32768")).unwrap_err();
    assert_eq!(
        err,
        LexicalError::IntegerOutOfRange {
            text: "32768".into(),
            position: Position::new(1, 40),
        }
    );
}

#[test]
fn test_labels_are_unique() {
    let input = "class Loops {
        function void run(int n) {
            var int i;
            while (i < n) {
                if (i = 3) { let i = i + 1; } else { let i = i + 2; }
                while (false) { }
            }
            if (n) { }
            while (true) {
                if (i) { if (n) { return; } }
            }
            return;
        }
    }";

    let compilation = compile(input).unwrap();
    assert!(compilation.is_ok(), "{:?}", compilation.errors);

    let mut defined = HashSet::new();
    let mut targets = HashSet::new();
    for instruction in &compilation.instructions {
        match instruction {
            Instruction::Label(label) => {
                assert!(defined.insert(label.clone()), "duplicate label {label}");
            }
            Instruction::Goto(label) | Instruction::IfGoto(label) => {
                targets.insert(label.clone());
            }
            _ => {}
        }
    }

    // three loops and one if-else define two labels each, plain ifs one
    assert_eq!(defined.len(), 3 * 2 + 2 + 3);
    assert!(targets.is_subset(&defined));
}

#[test]
fn test_array_assignment_is_stack_balanced() {
    let input = "class Main {
        function void main() {
            var Array a, b, c;
            var int i, j;
            let a[i] = b[c[j] + a[i]];
            return;
        }
    }";

    let compilation = compile(input).unwrap();
    assert!(compilation.is_ok(), "{:?}", compilation.errors);

    let instructions = &compilation.instructions;
    // between the function header and the trailing `push constant 0; return`
    let statement = &instructions[1..instructions.len() - 2];

    let mut depth = 0;
    for instruction in statement {
        depth += instruction.stack_effect();
        assert!(depth >= 0, "stack underflow at {instruction}");
    }
    assert_eq!(depth, 0);

    // the target address is parked before the right-hand side is evaluated
    assert_eq!(
        statement
            .iter()
            .rev()
            .take(4)
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec!["pop that 0", "push temp 0", "pop pointer 1", "pop temp 0"]
    );
}

#[test]
fn test_compilation_is_idempotent() {
    let game = "class Game {
        field Ball ball;
        static int score;
        constructor Game new() {
            let ball = Ball.new(0, 0);
            return this;
        }
        method void run() {
            while (~(score > 10)) {
                if (ball.hit()) { let score = score + 1; }
                do tick();
            }
            return;
        }
    }";
    let other = "class Other {
        static int a, b, c;
        function void f() { if (a) { while (b) { let c = 1; } } return; }
    }";

    let first = compile_ok(game);
    compile_ok(other);
    let second = compile_ok(game);

    assert_eq!(first, second);
}

#[test]
fn test_error_recovery_reports_every_error() {
    let input = "class Main {
    function void main() {
        var int x;
        let x = ;
        let y = 2;
        do Output.printInt(x);
        return;
    }
    function int broken( {
        return 1;
    }
    function int ok() { return 3; }
}";

    let compilation = compile(input).unwrap();

    let summary: Vec<(Production, Position, &str)> = compilation
        .errors
        .iter()
        .map(|err| (err.production, err.position, err.expected.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Production::Term, Position::new(4, 17), "a term"),
            (
                Production::LetStatement,
                Position::new(5, 13),
                "a declared variable"
            ),
            (Production::ParameterList, Position::new(9, 26), "a type"),
        ]
    );

    // code generation continued around the failures
    let output = compilation.output();
    assert!(output.contains("call Output.printInt 1\n"));
    assert!(output.ends_with(
        "function Main.ok 0
push constant 3
return
"
    ));
    assert!(!output.contains("Main.broken"));
}

#[test]
fn test_error_messages() {
    let compilation = compile("class Main { function void main() { do 5; } }").unwrap();

    assert_eq!(compilation.errors.len(), 1);
    assert_eq!(
        compilation.errors[0].to_string(),
        "syntax error: invalid subroutine call: expected a subroutine name, found '5'"
    );
}

#[test]
fn test_trailing_tokens_after_class() {
    let compilation = compile("class A { } class B { }").unwrap();

    assert_eq!(compilation.class_name, "A");
    assert_eq!(compilation.errors.len(), 1);
    assert_eq!(compilation.errors[0].expected, "end of file");
}

#[test]
fn test_missing_class_header() {
    let compilation = compile("function void main() { return; }").unwrap();

    assert_eq!(compilation.errors.len(), 1);
    assert_eq!(compilation.errors[0].production, Production::Class);
    assert!(compilation.instructions.is_empty());
}

#[test]
fn test_string_constants_stay_in_range() {
    let err = compile(
        "class A { function void f() { do Output.printString(\"\u{1F600}\"); return; } }",
    )
    .unwrap_err();
    assert_eq!(
        err,
        LexicalError::InvalidCharacter {
            position: Position::new(1, 54)
        }
    );

    let printable: String = (b' '..=b'~')
        .filter(|byte| *byte != b'"')
        .map(char::from)
        .collect();
    let input = format!(
        "class A {{ function void f() {{ do Output.printString(\"{printable}\"); return; }} }}"
    );
    let compilation = compile(&input).unwrap();
    assert!(compilation.is_ok());

    let constants: Vec<usize> = compilation
        .instructions
        .iter()
        .filter_map(|instruction| match instruction {
            Instruction::Push(Segment::Constant, value) => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(constants[0], printable.len());
    assert_eq!(constants.iter().max(), Some(&usize::from(b'~')));
    assert!(constants.iter().all(|value| *value <= usize::from(MAX_INT_CONST)));
}

#[test]
fn test_parse_tree() {
    let input = r#"
class Main {
    field int x;

    method int get(int y) {
        var Array a;
        let a[0] = Point.sum(x, -y);
        if (x < 1) {
            return this;
        } else {
            do draw();
        }
        while (true) { }
        return "a&b";
    }
}
"#;

    let compilation = analyze(input).unwrap();
    assert!(
        compilation.is_ok(),
        "unexpected errors: {:?}",
        compilation.errors
    );

    assert_eq!(
        compilation.tree.as_deref(),
        Some(
            "<class>
<keyword> class </keyword>
<identifier> Main </identifier>
<symbol> { </symbol>
<classVarDec>
<keyword> field </keyword>
<keyword> int </keyword>
<identifier> x </identifier>
<symbol> ; </symbol>
</classVarDec>
<subroutineDec>
<keyword> method </keyword>
<keyword> int </keyword>
<identifier> get </identifier>
<symbol> ( </symbol>
<parameterList>
<keyword> int </keyword>
<identifier> y </identifier>
</parameterList>
<symbol> ) </symbol>
<subroutineBody>
<symbol> { </symbol>
<varDec>
<keyword> var </keyword>
<identifier> Array </identifier>
<identifier> a </identifier>
<symbol> ; </symbol>
</varDec>
<statements>
<letStatement>
<keyword> let </keyword>
<identifier> a </identifier>
<symbol> [ </symbol>
<expression>
<term>
<integerConstant> 0 </integerConstant>
</term>
</expression>
<symbol> ] </symbol>
<symbol> = </symbol>
<expression>
<term>
<identifier> Point </identifier>
<symbol> . </symbol>
<identifier> sum </identifier>
<symbol> ( </symbol>
<expressionList>
<expression>
<term>
<identifier> x </identifier>
</term>
</expression>
<symbol> , </symbol>
<expression>
<term>
<symbol> - </symbol>
<term>
<identifier> y </identifier>
</term>
</term>
</expression>
</expressionList>
<symbol> ) </symbol>
</term>
</expression>
<symbol> ; </symbol>
</letStatement>
<ifStatement>
<keyword> if </keyword>
<symbol> ( </symbol>
<expression>
<term>
<identifier> x </identifier>
</term>
<symbol> &lt; </symbol>
<term>
<integerConstant> 1 </integerConstant>
</term>
</expression>
<symbol> ) </symbol>
<symbol> { </symbol>
<statements>
<returnStatement>
<keyword> return </keyword>
<expression>
<term>
<keyword> this </keyword>
</term>
</expression>
<symbol> ; </symbol>
</returnStatement>
</statements>
<symbol> } </symbol>
<keyword> else </keyword>
<symbol> { </symbol>
<statements>
<doStatement>
<keyword> do </keyword>
<identifier> draw </identifier>
<symbol> ( </symbol>
<expressionList>
</expressionList>
<symbol> ) </symbol>
<symbol> ; </symbol>
</doStatement>
</statements>
<symbol> } </symbol>
</ifStatement>
<whileStatement>
<keyword> while </keyword>
<symbol> ( </symbol>
<expression>
<term>
<keyword> true </keyword>
</term>
</expression>
<symbol> ) </symbol>
<symbol> { </symbol>
<statements>
</statements>
<symbol> } </symbol>
</whileStatement>
<returnStatement>
<keyword> return </keyword>
<expression>
<term>
<stringConstant> a&amp;b </stringConstant>
</term>
</expression>
<symbol> ; </symbol>
</returnStatement>
</statements>
<symbol> } </symbol>
</subroutineBody>
</subroutineDec>
<symbol> } </symbol>
</class>
"
        )
    );

    // the code is the same as a plain compilation
    assert_eq!(
        compilation.instructions,
        compile(input).unwrap().instructions
    );
    assert_eq!(compile(input).unwrap().tree, None);
}
