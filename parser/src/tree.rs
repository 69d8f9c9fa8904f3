use token::Token;

/// Non-terminal elements of the analyzer's parse tree XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Class,
    ClassVarDec,
    SubroutineDec,
    ParameterList,
    SubroutineBody,
    VarDec,
    Statements,
    LetStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    Expression,
    Term,
    ExpressionList,
}

impl Element {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::ClassVarDec => "classVarDec",
            Self::SubroutineDec => "subroutineDec",
            Self::ParameterList => "parameterList",
            Self::SubroutineBody => "subroutineBody",
            Self::VarDec => "varDec",
            Self::Statements => "statements",
            Self::LetStatement => "letStatement",
            Self::IfStatement => "ifStatement",
            Self::WhileStatement => "whileStatement",
            Self::DoStatement => "doStatement",
            Self::ReturnStatement => "returnStatement",
            Self::Expression => "expression",
            Self::Term => "term",
            Self::ExpressionList => "expressionList",
        }
    }
}

/// Accumulates the parse tree as XML text, one tag or terminal per line,
/// in the order the productions open, consume and close.
#[derive(Debug, Default)]
pub struct TreeWriter {
    out: String,
}

impl TreeWriter {
    pub fn open(&mut self, element: Element) {
        self.out.push_str(&format!("<{}>\n", element.tag()));
    }

    pub fn close(&mut self, element: Element) {
        self.out.push_str(&format!("</{}>\n", element.tag()));
    }

    pub fn terminal(&mut self, token: &Token) {
        self.out.push_str(&token.to_xml());
        self.out.push('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }
}
