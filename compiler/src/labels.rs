use std::fmt::Display;

/// Hands out label pairs for loops and conditionals within one class.
///
/// Every construct gets a fresh sequence id, so labels never repeat inside a
/// class; the nesting depth is carried along for readability of the output.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    class_name: String,
    sequence: usize,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
    class_name: String,
    id: usize,
    depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// loop start, or the else-or-end target of a conditional
    First,
    /// loop end, or the end of a conditional with an else branch
    Second,
}

impl LabelAllocator {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            ..Self::default()
        }
    }

    /// Opens a construct. Must be paired with [`LabelAllocator::leave`].
    pub fn enter(&mut self) -> LabelPair {
        let id = self.sequence;
        self.sequence += 1;
        self.depth += 1;

        LabelPair {
            class_name: self.class_name.clone(),
            id,
            depth: self.depth,
        }
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl LabelPair {
    pub fn label(&self, role: Role) -> String {
        format!("{}_{}_{}_{}", self.class_name, self.id, self.depth, role)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "0"),
            Self::Second => write!(f, "1"),
        }
    }
}
