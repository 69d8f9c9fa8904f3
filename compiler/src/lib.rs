pub mod labels;
pub mod symbol_table;

use code::{Command, Instruction, Instructions, Segment};
use labels::{LabelAllocator, LabelPair, Role};
use lexer::LexicalError;
use parser::{Element, Parser, Production, SyntaxError};
use std::mem;
use symbol_table::{Kind, Symbol, SymbolTable};
use token::{Located, Token, TokenLiteral};

/// The result of compiling one class. Syntax errors do not stop compilation,
/// so `instructions` may be incomplete when `errors` is not empty.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub class_name: String,
    pub instructions: Instructions,
    pub errors: Vec<SyntaxError>,
    /// The parse tree XML, recorded only by [`analyze`].
    pub tree: Option<String>,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn output(&self) -> String {
        code::instructions_to_string(&self.instructions)
    }
}

/// Compiles the source of a single class. Only a lexical error is fatal;
/// syntax errors are collected in the returned [`Compilation`].
pub fn compile(source: &str) -> Result<Compilation, LexicalError> {
    let tokens = lexer::tokenize(source)?;

    let mut compiler = Compiler::new(tokens);
    compiler.compile_class();

    Ok(compiler.finish())
}

/// Compiles like [`compile`] and also records the parse tree of the class.
/// The tree is only meaningful when the compilation has no errors.
pub fn analyze(source: &str) -> Result<Compilation, LexicalError> {
    let tokens = lexer::tokenize(source)?;

    let mut compiler = Compiler::with_tree(tokens);
    compiler.compile_class();

    Ok(compiler.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Per-file compilation context: the token cursor, the active scopes, the
/// label counters and the emitted code all live here and nowhere else.
pub struct Compiler {
    parser: Parser,
    pub symbol_table: SymbolTable,
    labels: LabelAllocator,
    class_name: String,
    instructions: Instructions,
    pub errors: Vec<SyntaxError>,
}

impl Compiler {
    pub fn new(tokens: Vec<Located>) -> Self {
        Self::with_parser(Parser::new(tokens))
    }

    pub fn with_tree(tokens: Vec<Located>) -> Self {
        Self::with_parser(Parser::with_tree(tokens))
    }

    fn with_parser(parser: Parser) -> Self {
        Self {
            parser,
            symbol_table: SymbolTable::new(),
            labels: LabelAllocator::default(),
            class_name: String::new(),
            instructions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn finish(mut self) -> Compilation {
        Compilation {
            tree: self.parser.take_tree(),
            class_name: self.class_name,
            instructions: self.instructions,
            errors: self.errors,
        }
    }

    /// 'class' className '{' classVarDec* subroutineDec* '}'
    pub fn compile_class(&mut self) {
        if let Err(err) = self.compile_class_header() {
            self.report(err);
            return;
        }

        self.declare_class_variables();

        loop {
            let start = self.parser.offset();
            let result = match self.parser.cur_token() {
                Token::Static | Token::Field => self.compile_class_var_dec(),
                Token::Constructor | Token::Function | Token::Method => self.compile_subroutine(),
                Token::Rbrace | Token::Eof => break,
                _ => Err(self.parser.error(Production::Class, "a class member")),
            };

            if let Err(err) = result {
                self.report(err);
                self.synchronize(start, is_member_start);
            }
        }

        if let Err(err) = self.parser.expect(&Token::Rbrace, Production::Class) {
            self.report(err);
            return;
        }
        self.parser.close(Element::Class);

        if !self.parser.is_eof() {
            let err = self.parser.error(Production::Class, "end of file");
            self.report(err);
        }
    }

    fn compile_class_header(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::Class);
        self.parser.expect(&Token::Class, Production::Class)?;
        self.class_name = self.parser.expect_ident(Production::Class)?;
        self.labels = LabelAllocator::new(&self.class_name);
        self.parser.expect(&Token::Lbrace, Production::Class)?;

        Ok(())
    }

    /// Declares every well-formed static and field of the class body before
    /// any subroutine is compiled, so members are visible to all subroutines
    /// wherever they are declared. Malformed declarations are left for the
    /// main pass to report.
    fn declare_class_variables(&mut self) {
        let tokens: Vec<Token> = self.parser.remaining().map(|l| l.token.clone()).collect();
        let mut depth = 0usize;
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Lbrace => depth += 1,
                Token::Rbrace if depth == 0 => break,
                Token::Rbrace => depth -= 1,
                Token::Static | Token::Field if depth == 0 => {
                    let kind = if tokens[i] == Token::Static {
                        Kind::Static
                    } else {
                        Kind::Field
                    };

                    i += 1;
                    let Some(type_name) = tokens.get(i).filter(|t| t.is_type()) else {
                        continue;
                    };
                    let type_name = type_name.token_literal();

                    i += 1;
                    while let Some(Token::Ident(name)) = tokens.get(i) {
                        self.symbol_table.define(name, &type_name, kind);
                        i += 1;
                        if tokens.get(i) != Some(&Token::Comma) {
                            break;
                        }
                        i += 1;
                    }
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        log::trace!(
            "class {} declares {} statics and {} fields",
            self.class_name,
            self.symbol_table.var_count(Kind::Static),
            self.symbol_table.var_count(Kind::Field)
        );
    }

    /// ('static' | 'field') type varName (',' varName)* ';'
    fn compile_class_var_dec(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::ClassVarDec);
        let kind = match self.parser.cur_token() {
            Token::Static => Kind::Static,
            _ => Kind::Field,
        };
        self.parser.next_token();

        let type_name = self.parser.expect_type(Production::ClassVarDec)?;

        loop {
            let name = self.parser.expect_ident(Production::ClassVarDec)?;
            self.symbol_table.define(&name, &type_name, kind);

            if !self.parser.cur_token_is(&Token::Comma) {
                break;
            }
            self.parser.next_token();
        }

        self.parser.expect(&Token::Semicolon, Production::ClassVarDec)?;
        self.parser.close(Element::ClassVarDec);

        Ok(())
    }

    /// ('constructor' | 'function' | 'method') ('void' | type) subroutineName
    /// '(' parameterList ')' subroutineBody
    fn compile_subroutine(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::SubroutineDec);
        let kind = match self.parser.cur_token() {
            Token::Constructor => SubroutineKind::Constructor,
            Token::Method => SubroutineKind::Method,
            _ => SubroutineKind::Function,
        };
        self.parser.next_token();

        if self.parser.cur_token_is(&Token::Void) {
            self.parser.next_token();
        } else {
            self.parser.expect_type(Production::SubroutineDec)?;
        }

        let name = self.parser.expect_ident(Production::SubroutineDec)?;

        self.enter_scope();
        let result = self.compile_subroutine_rest(kind, &name);
        self.leave_scope();
        result?;

        self.parser.close(Element::SubroutineDec);

        Ok(())
    }

    fn compile_subroutine_rest(
        &mut self,
        kind: SubroutineKind,
        name: &str,
    ) -> Result<(), SyntaxError> {
        if kind == SubroutineKind::Method {
            let class_name = self.class_name.clone();
            self.symbol_table.define("this", &class_name, Kind::Argument);
        }

        self.parser.expect(&Token::Lparen, Production::SubroutineDec)?;
        self.parser.open(Element::ParameterList);
        self.compile_parameter_list()?;
        self.parser.close(Element::ParameterList);
        self.parser.expect(&Token::Rparen, Production::SubroutineDec)?;

        self.parser.open(Element::SubroutineBody);
        self.parser.expect(&Token::Lbrace, Production::SubroutineDec)?;

        while self.parser.cur_token_is(&Token::Var) {
            let start = self.parser.offset();
            if let Err(err) = self.compile_var_dec() {
                self.report(err);
                self.synchronize(start, is_body_start);
            }
        }

        let n_locals = self.symbol_table.var_count(Kind::Local);
        self.emit(Instruction::Function(
            format!("{}.{}", self.class_name, name),
            n_locals,
        ));

        match kind {
            SubroutineKind::Constructor => {
                let n_fields = self.symbol_table.var_count(Kind::Field);
                self.push(Segment::Constant, n_fields);
                self.call("Memory.alloc", 1);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.push(Segment::Argument, 0);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements();

        self.parser.expect(&Token::Rbrace, Production::SubroutineDec)?;
        self.parser.close(Element::SubroutineBody);

        log::debug!(
            "compiled {:?} {}.{} with {} locals",
            kind,
            self.class_name,
            name,
            n_locals
        );

        Ok(())
    }

    /// ((type varName) (',' type varName)*)?
    fn compile_parameter_list(&mut self) -> Result<(), SyntaxError> {
        if self.parser.cur_token_is(&Token::Rparen) {
            return Ok(());
        }

        loop {
            let type_name = self.parser.expect_type(Production::ParameterList)?;
            let name = self.parser.expect_ident(Production::ParameterList)?;
            self.symbol_table.define(&name, &type_name, Kind::Argument);

            if !self.parser.cur_token_is(&Token::Comma) {
                return Ok(());
            }
            self.parser.next_token();
        }
    }

    /// 'var' type varName (',' varName)* ';'
    fn compile_var_dec(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::VarDec);
        self.parser.next_token();

        let type_name = self.parser.expect_type(Production::VarDec)?;

        loop {
            let name = self.parser.expect_ident(Production::VarDec)?;
            self.symbol_table.define(&name, &type_name, Kind::Local);

            if !self.parser.cur_token_is(&Token::Comma) {
                break;
            }
            self.parser.next_token();
        }

        self.parser.expect(&Token::Semicolon, Production::VarDec)?;
        self.parser.close(Element::VarDec);

        Ok(())
    }

    /// statement*
    ///
    /// Each statement is a recovery point: a failed statement is reported and
    /// skipped, and the next one is still compiled.
    fn compile_statements(&mut self) {
        self.parser.open(Element::Statements);
        loop {
            let start = self.parser.offset();
            let result = match self.parser.cur_token() {
                Token::Let => self.compile_let(),
                Token::If => self.compile_if(),
                Token::While => self.compile_while(),
                Token::Do => self.compile_do(),
                Token::Return => self.compile_return(),
                Token::Rbrace | Token::Eof => break,
                token if is_member_start(token) => break,
                _ => Err(self.parser.error(Production::Statement, "a statement")),
            };

            if let Err(err) = result {
                self.report(err);
                self.synchronize(start, is_body_start);
            }
        }
        self.parser.close(Element::Statements);
    }

    /// 'let' varName ('[' expression ']')? '=' expression ';'
    fn compile_let(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::LetStatement);
        self.parser.next_token();

        let symbol = self.expect_variable(Production::LetStatement)?;

        if self.parser.cur_token_is(&Token::Lbracket) {
            self.parser.next_token();

            // the target address is computed before the right-hand side, and
            // parked on the stack while the right-hand side runs
            self.push_variable(&symbol);
            self.compile_expression()?;
            self.parser.expect(&Token::Rbracket, Production::LetStatement)?;
            self.arithmetic(Command::Add);

            self.parser.expect(&Token::Equals, Production::LetStatement)?;
            self.compile_expression()?;
            self.parser.expect(&Token::Semicolon, Production::LetStatement)?;

            self.pop(Segment::Temp, 0);
            self.pop(Segment::Pointer, 1);
            self.push(Segment::Temp, 0);
            self.pop(Segment::That, 0);
        } else {
            self.parser.expect(&Token::Equals, Production::LetStatement)?;
            self.compile_expression()?;
            self.parser.expect(&Token::Semicolon, Production::LetStatement)?;

            self.pop(symbol.kind.segment(), symbol.index);
        }
        self.parser.close(Element::LetStatement);

        Ok(())
    }

    /// 'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?
    fn compile_if(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::IfStatement);
        self.parser.next_token();

        let labels = self.labels.enter();
        let result = self.compile_if_rest(&labels);
        self.labels.leave();
        result?;

        self.parser.close(Element::IfStatement);

        Ok(())
    }

    fn compile_if_rest(&mut self, labels: &LabelPair) -> Result<(), SyntaxError> {
        self.parser.expect(&Token::Lparen, Production::IfStatement)?;
        self.compile_expression()?;
        self.parser.expect(&Token::Rparen, Production::IfStatement)?;

        self.arithmetic(Command::Not);
        self.emit(Instruction::IfGoto(labels.label(Role::First)));

        self.parser.expect(&Token::Lbrace, Production::IfStatement)?;
        self.compile_statements();
        self.parser.expect(&Token::Rbrace, Production::IfStatement)?;

        if !self.parser.cur_token_is(&Token::Else) {
            self.emit(Instruction::Label(labels.label(Role::First)));
            return Ok(());
        }
        self.parser.next_token();

        self.emit(Instruction::Goto(labels.label(Role::Second)));
        self.emit(Instruction::Label(labels.label(Role::First)));

        self.parser.expect(&Token::Lbrace, Production::IfStatement)?;
        self.compile_statements();
        self.parser.expect(&Token::Rbrace, Production::IfStatement)?;

        self.emit(Instruction::Label(labels.label(Role::Second)));

        Ok(())
    }

    /// 'while' '(' expression ')' '{' statements '}'
    fn compile_while(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::WhileStatement);
        self.parser.next_token();

        let labels = self.labels.enter();
        let result = self.compile_while_rest(&labels);
        self.labels.leave();
        result?;

        self.parser.close(Element::WhileStatement);

        Ok(())
    }

    fn compile_while_rest(&mut self, labels: &LabelPair) -> Result<(), SyntaxError> {
        self.emit(Instruction::Label(labels.label(Role::First)));

        self.parser.expect(&Token::Lparen, Production::WhileStatement)?;
        self.compile_expression()?;
        self.parser.expect(&Token::Rparen, Production::WhileStatement)?;

        self.arithmetic(Command::Not);
        self.emit(Instruction::IfGoto(labels.label(Role::Second)));

        self.parser.expect(&Token::Lbrace, Production::WhileStatement)?;
        self.compile_statements();
        self.parser.expect(&Token::Rbrace, Production::WhileStatement)?;

        self.emit(Instruction::Goto(labels.label(Role::First)));
        self.emit(Instruction::Label(labels.label(Role::Second)));

        Ok(())
    }

    /// 'do' subroutineCall ';'
    fn compile_do(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::DoStatement);
        self.parser.next_token();

        self.compile_subroutine_call()?;
        self.parser.expect(&Token::Semicolon, Production::DoStatement)?;
        self.parser.close(Element::DoStatement);

        // discard the returned value
        self.pop(Segment::Temp, 0);

        Ok(())
    }

    /// 'return' expression? ';'
    fn compile_return(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::ReturnStatement);
        self.parser.next_token();

        if self.parser.cur_token_is(&Token::Semicolon) {
            self.parser.next_token();
            self.push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
            self.parser.expect(&Token::Semicolon, Production::ReturnStatement)?;
        }

        self.parser.close(Element::ReturnStatement);
        self.emit(Instruction::Return);

        Ok(())
    }

    /// term (op term)*
    ///
    /// Operators have no precedence and associate strictly left to right.
    fn compile_expression(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::Expression);
        self.compile_term()?;

        while self.parser.cur_token().is_binary_op() {
            let operator = self.parser.cur_token().clone();
            self.parser.next_token();

            self.compile_term()?;

            match operator {
                Token::Plus => self.arithmetic(Command::Add),
                Token::Minus => self.arithmetic(Command::Sub),
                Token::Asterisk => self.call("Math.multiply", 2),
                Token::Slash => self.call("Math.divide", 2),
                Token::Ampersand => self.arithmetic(Command::And),
                Token::Pipe => self.arithmetic(Command::Or),
                Token::Lt => self.arithmetic(Command::Lt),
                Token::Gt => self.arithmetic(Command::Gt),
                Token::Equals => self.arithmetic(Command::Eq),
                _ => unreachable!("only binary operators pass is_binary_op"),
            }
        }
        self.parser.close(Element::Expression);

        Ok(())
    }

    /// integerConstant | stringConstant | keywordConstant | varName |
    /// varName '[' expression ']' | subroutineCall | '(' expression ')' |
    /// unaryOp term
    fn compile_term(&mut self) -> Result<(), SyntaxError> {
        self.parser.open(Element::Term);
        match self.parser.cur_token().clone() {
            Token::IntConst(value) => {
                self.parser.next_token();
                self.push(Segment::Constant, value.into());
            }
            Token::StringConst(value) => {
                self.parser.next_token();
                self.push(Segment::Constant, value.len());
                self.call("String.new", 1);
                // the lexer only admits ASCII, so each byte is one character
                for byte in value.bytes() {
                    self.push(Segment::Constant, byte.into());
                    self.call("String.appendChar", 2);
                }
            }
            Token::True => {
                self.parser.next_token();
                self.push(Segment::Constant, 1);
                self.arithmetic(Command::Neg);
            }
            Token::False | Token::Null => {
                self.parser.next_token();
                self.push(Segment::Constant, 0);
            }
            Token::This => {
                self.parser.next_token();
                self.push(Segment::Pointer, 0);
            }
            Token::Ident(_)
                if self.parser.peek_token_is(&Token::Lparen)
                    || self.parser.peek_token_is(&Token::Dot) =>
            {
                self.compile_subroutine_call()?
            }
            Token::Ident(_) if self.parser.peek_token_is(&Token::Lbracket) => {
                let symbol = self.expect_variable(Production::Term)?;
                self.parser.next_token();

                self.push_variable(&symbol);
                self.compile_expression()?;
                self.parser.expect(&Token::Rbracket, Production::Term)?;
                self.arithmetic(Command::Add);

                self.pop(Segment::Pointer, 1);
                self.push(Segment::That, 0);
            }
            Token::Ident(_) => {
                let symbol = self.expect_variable(Production::Term)?;
                self.push_variable(&symbol);
            }
            Token::Lparen => {
                self.parser.next_token();
                self.compile_expression()?;
                self.parser.expect(&Token::Rparen, Production::Expression)?;
            }
            Token::Minus => {
                self.parser.next_token();
                self.compile_term()?;
                self.arithmetic(Command::Neg);
            }
            Token::Tilde => {
                self.parser.next_token();
                self.compile_term()?;
                self.arithmetic(Command::Not);
            }
            _ => return Err(self.parser.error(Production::Term, "a term")),
        }
        self.parser.close(Element::Term);

        Ok(())
    }

    /// subroutineName '(' expressionList ')' |
    /// (className | varName) '.' subroutineName '(' expressionList ')'
    fn compile_subroutine_call(&mut self) -> Result<(), SyntaxError> {
        let Token::Ident(first) = self.parser.cur_token().clone() else {
            return Err(self
                .parser
                .error(Production::SubroutineCall, "a subroutine name"));
        };
        self.parser.next_token();

        let (name, receivers) = if self.parser.cur_token_is(&Token::Dot) {
            self.parser.next_token();
            let subroutine = self.parser.expect_ident(Production::SubroutineCall)?;

            match self.symbol_table.resolve(&first).cloned() {
                // method call on an object held in a variable
                Some(symbol) => {
                    self.push_variable(&symbol);
                    (format!("{}.{}", symbol.type_name, subroutine), 1)
                }
                // anything else is taken as a class name
                None => (format!("{first}.{subroutine}"), 0),
            }
        } else {
            // method call on the current object
            self.push(Segment::Pointer, 0);
            (format!("{}.{}", self.class_name, first), 1)
        };

        self.parser.expect(&Token::Lparen, Production::SubroutineCall)?;
        let n_args = self.compile_expression_list()?;
        self.parser.expect(&Token::Rparen, Production::ExpressionList)?;

        self.call(&name, n_args + receivers);

        Ok(())
    }

    /// (expression (',' expression)*)?
    fn compile_expression_list(&mut self) -> Result<usize, SyntaxError> {
        self.parser.open(Element::ExpressionList);
        let mut n_args = 0;

        if !self.parser.cur_token_is(&Token::Rparen) {
            self.compile_expression()?;
            n_args += 1;

            while self.parser.cur_token_is(&Token::Comma) {
                self.parser.next_token();
                self.compile_expression()?;
                n_args += 1;
            }
        }
        self.parser.close(Element::ExpressionList);

        Ok(n_args)
    }

    /// Resolves the current identifier as a declared variable and consumes
    /// it. An undeclared name is reported at its own position.
    fn expect_variable(&mut self, production: Production) -> Result<Symbol, SyntaxError> {
        let symbol = match self.parser.cur_token() {
            Token::Ident(name) => self.symbol_table.resolve(name).cloned(),
            _ => return Err(self.parser.error(production, "an identifier")),
        };

        let symbol = symbol.ok_or_else(|| self.parser.error(production, "a declared variable"))?;
        self.parser.next_token();

        Ok(symbol)
    }

    /// Skips past a construct that failed to compile, so its siblings can
    /// still be attempted. Stops just after a `;` or a balanced `{ ... }`
    /// block (and its `else` block) at the starting nesting level, or just
    /// before a `}` closing the enclosing block or a token accepted by `stop`.
    /// Always consumes at least one token.
    fn synchronize(&mut self, start: usize, stop: fn(&Token) -> bool) {
        if self.parser.offset() == start {
            self.parser.next_token();
        }

        let mut depth = 0usize;
        while !self.parser.is_eof() {
            match self.parser.cur_token() {
                Token::Lbrace => depth += 1,
                Token::Rbrace if depth == 0 => return,
                Token::Rbrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.parser.next_token();
                        if self.parser.cur_token_is(&Token::Else) {
                            self.parser.next_token();
                            continue;
                        }
                        return;
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.parser.next_token();
                    return;
                }
                token if depth == 0 && stop(token) => return,
                _ => {}
            }
            self.parser.next_token();
        }
    }

    fn report(&mut self, err: SyntaxError) {
        log::trace!("recovering from {err}");
        self.errors.push(err);
    }

    fn enter_scope(&mut self) {
        let outer = mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(Box::new(outer));
    }

    fn leave_scope(&mut self) {
        self.symbol_table = if let Some(outer) = self.symbol_table.outer.take() {
            *outer
        } else {
            unreachable!("there should always be an outer when leaving a scope")
        };
    }

    fn push_variable(&mut self, symbol: &Symbol) {
        self.push(symbol.kind.segment(), symbol.index);
    }

    fn push(&mut self, segment: Segment, index: usize) {
        self.emit(Instruction::Push(segment, index));
    }

    fn pop(&mut self, segment: Segment, index: usize) {
        self.emit(Instruction::Pop(segment, index));
    }

    fn arithmetic(&mut self, command: Command) {
        self.emit(Instruction::Arithmetic(command));
    }

    fn call(&mut self, name: &str, n_args: usize) {
        self.emit(Instruction::Call(name.to_string(), n_args));
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }
}

fn is_member_start(token: &Token) -> bool {
    matches!(
        token,
        Token::Static | Token::Field | Token::Constructor | Token::Function | Token::Method
    )
}

fn is_body_start(token: &Token) -> bool {
    token.starts_statement() || token == &Token::Var || is_member_start(token)
}
