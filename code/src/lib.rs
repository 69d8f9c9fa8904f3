mod op;

pub use op::{Command, Segment};
use std::fmt::Display;

pub type Instructions = Vec<Instruction>;

/// One line of the target VM language.
#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub enum Instruction {
    Push(Segment, usize),
    Pop(Segment, usize),
    Arithmetic(Command),
    Label(String),
    Goto(String),
    IfGoto(String),
    /// `function <Class.name> <nLocals>`
    Function(String, usize),
    /// `call <Class.name> <nArgs>`
    Call(String, usize),
    Return,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push(segment, index) => write!(f, "push {segment} {index}"),
            Self::Pop(segment, index) => write!(f, "pop {segment} {index}"),
            Self::Arithmetic(command) => write!(f, "{command}"),
            Self::Label(label) => write!(f, "label {label}"),
            Self::Goto(label) => write!(f, "goto {label}"),
            Self::IfGoto(label) => write!(f, "if-goto {label}"),
            Self::Function(name, n_locals) => write!(f, "function {name} {n_locals}"),
            Self::Call(name, n_args) => write!(f, "call {name} {n_args}"),
            Self::Return => write!(f, "return"),
        }
    }
}

impl Instruction {
    /// Net change in stack depth seen by the code around this instruction.
    /// A call consumes its arguments and leaves the callee's return value.
    pub fn stack_effect(&self) -> isize {
        match self {
            Self::Push(..) => 1,
            Self::Pop(..) => -1,
            Self::Arithmetic(command) if command.is_unary() => 0,
            Self::Arithmetic(_) => -1,
            Self::Label(_) | Self::Goto(_) | Self::Function(..) => 0,
            Self::IfGoto(_) => -1,
            Self::Call(_, n_args) => 1 - *n_args as isize,
            Self::Return => -1,
        }
    }
}

/// Renders instructions one per line, each line newline-terminated.
pub fn instructions_to_string(ins: &[Instruction]) -> String {
    let mut out = String::new();

    for instruction in ins {
        out.push_str(&instruction.to_string());
        out.push('\n');
    }

    out
}
