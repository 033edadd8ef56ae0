use crate::builtins;
use crate::types::{LispObject, LispSymbol};
use itertools::Itertools;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared handle on the value slot of one binding. Writing through it is
/// visible to every environment that can see the binding.
pub type Binding = Rc<RefCell<LispObject>>;

/// One binding frame, linked to the frame it was spawned from. A frame with
/// no parent is the root.
#[derive(Default)]
pub struct Environment {
    bindings: RefCell<Vec<(LispSymbol, Binding)>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A root frame with every builtin operator bound in it.
    pub fn with_builtins() -> Rc<Self> {
        let env = Self::root();
        builtins::load_builtins(&env);
        env
    }

    pub fn spawn_from(parent: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(Vec::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Searches from this frame outwards. Within a frame the newest binding
    /// wins.
    pub fn find(&self, symbol: &LispSymbol) -> Option<Binding> {
        let mut frame = self;
        loop {
            let found = frame
                .bindings
                .borrow()
                .iter()
                .rev()
                .find(|(name, _)| name == symbol)
                .map(|(_, binding)| binding.clone());
            if found.is_some() {
                return found;
            }
            frame = frame.parent.as_deref()?;
        }
    }

    pub fn fetch(&self, symbol: &LispSymbol) -> Option<LispObject> {
        self.find(symbol).map(|binding| binding.borrow().clone())
    }

    /// Binds `symbol` in this frame without looking for an existing binding,
    /// so any outer or earlier binding of the same name is shadowed.
    pub fn add_variable(&self, symbol: LispSymbol, value: LispObject) -> Binding {
        log::trace!("bind {} to {}", symbol, value);
        let binding = Rc::new(RefCell::new(value));
        self.bindings.borrow_mut().push((symbol, binding.clone()));
        binding
    }
}

impl fmt::Debug for Environment {
    // Only names: the values may be closures whose parent is this very frame.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .bindings
            .borrow()
            .iter()
            .map(|(name, _)| name.to_string())
            .join(" ");
        match &self.parent {
            Some(parent) => write!(f, "[{}] -> {:?}", names, parent),
            None => write!(f, "[{}]", names),
        }
    }
}
