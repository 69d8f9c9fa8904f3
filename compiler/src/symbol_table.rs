use code::Segment;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Storage segment holding variables of this kind. Fields live in the
    /// receiver's segment.
    pub fn segment(&self) -> Segment {
        match self {
            Self::Static => Segment::Static,
            Self::Field => Segment::This,
            Self::Argument => Segment::Argument,
            Self::Local => Segment::Local,
        }
    }

    fn is_class_level(&self) -> bool {
        matches!(self, Self::Static | Self::Field)
    }

    fn slot(&self) -> usize {
        match self {
            Self::Static => 0,
            Self::Field => 1,
            Self::Argument => 2,
            Self::Local => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub type_name: String,
    pub kind: Kind,
    pub index: usize,
}

/// A scope of declarations. The class scope has no `outer`; a subroutine
/// scope is enclosed by its class scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub outer: Option<Box<Self>>,
    store: HashMap<String, Symbol>,
    // one running counter per kind
    counts: [usize; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: Box<Self>) -> Self {
        Self {
            outer: Some(outer),
            ..Self::default()
        }
    }

    /// Declares `name` and returns its slot index. Statics and fields always
    /// go to the class scope. Redeclaring a name already in the target scope
    /// keeps the first declaration and returns its index.
    pub fn define(&mut self, name: &str, type_name: &str, kind: Kind) -> usize {
        if kind.is_class_level() {
            if let Some(outer) = self.outer.as_mut() {
                return outer.define(name, type_name, kind);
            }
        }

        if let Some(existing) = self.store.get(name) {
            return existing.index;
        }

        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] += 1;

        self.store.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                type_name: type_name.to_string(),
                kind,
                index,
            },
        );

        index
    }

    /// Looks in this scope first, then in the enclosing one.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        let symbol = self.store.get(name);
        if symbol.is_none() {
            if let Some(outer) = self.outer.as_ref() {
                return outer.resolve(name);
            }
        }
        symbol
    }

    /// Number of variables of `kind` declared in the scope that owns that
    /// kind.
    pub fn var_count(&self, kind: Kind) -> usize {
        match self.outer.as_ref() {
            Some(outer) if kind.is_class_level() => outer.var_count(kind),
            _ => self.counts[kind.slot()],
        }
    }
}
