use std::fmt::Display;

/// Named storage regions of the target machine.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::Argument => write!(f, "argument"),
            Self::Local => write!(f, "local"),
            Self::Static => write!(f, "static"),
            Self::This => write!(f, "this"),
            Self::That => write!(f, "that"),
            Self::Pointer => write!(f, "pointer"),
            Self::Temp => write!(f, "temp"),
        }
    }
}

/// Stack arithmetic and logic commands.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Neg => write!(f, "neg"),
            Self::Eq => write!(f, "eq"),
            Self::Gt => write!(f, "gt"),
            Self::Lt => write!(f, "lt"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
        }
    }
}

impl Command {
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::Neg | Self::Not)
    }
}
