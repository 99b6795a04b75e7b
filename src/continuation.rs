//! # continuation
//!
//! the boundary to the evaluator and the per-instance continuation table
//!
//! the evaluator hands out one entry point per suspension point; the table
//! caches them so each distinct point is materialized at most once per
//! generator instance
//!

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::exception::Exception;
use crate::rt::{ResumeToken, Signal};
use crate::scope::Scope;

/// runs a body from one suspension point until it yields, returns or raises
pub type EntryPoint = Rc<dyn Fn(&mut Scope<'_>) -> Result<Signal, Exception>>;

/// wrap a closure as an entry point
pub fn continuation<F>(f: F) -> EntryPoint
where
    F: Fn(&mut Scope<'_>) -> Result<Signal, Exception> + 'static,
{
    Rc::new(f)
}

/// a compiled generator body as seen by the engine
pub trait Code {
    /// function name
    fn name(&self) -> &str;

    /// qualified name, defaults to the name
    fn qualname(&self) -> &str {
        self.name()
    }

    /// source file
    fn filename(&self) -> &str {
        "<unknown>"
    }

    /// line of the `def`
    fn first_lineno(&self) -> u32 {
        1
    }

    /// number of local variable slots
    fn nlocals(&self) -> usize {
        0
    }

    /// build the entry point that resumes execution at `at`
    fn entry_point(&self, at: ResumeToken) -> EntryPoint;
}

/// a `Code` whose body is a single closure dispatching on the resume token
pub struct FnCode {
    name: String,
    filename: String,
    first_lineno: u32,
    nlocals: usize,
    body: Rc<dyn Fn(ResumeToken, &mut Scope<'_>) -> Result<Signal, Exception>>,
}

impl FnCode {
    /// create a code object from a body closure
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(ResumeToken, &mut Scope<'_>) -> Result<Signal, Exception> + 'static,
    {
        FnCode {
            name: name.to_owned(),
            filename: String::from("<unknown>"),
            first_lineno: 1,
            nlocals: 0,
            body: Rc::new(body),
        }
    }

    /// set the source location of the `def`
    pub fn at(mut self, filename: &str, first_lineno: u32) -> Self {
        self.filename = filename.to_owned();
        self.first_lineno = first_lineno;
        self
    }

    /// reserve local variable slots
    pub fn with_locals(mut self, nlocals: usize) -> Self {
        self.nlocals = nlocals;
        self
    }
}

impl Code for FnCode {
    fn name(&self) -> &str {
        &self.name
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn first_lineno(&self) -> u32 {
        self.first_lineno
    }

    fn nlocals(&self) -> usize {
        self.nlocals
    }

    fn entry_point(&self, at: ResumeToken) -> EntryPoint {
        let body = self.body.clone();
        continuation(move |scope| body(at, scope))
    }
}

impl fmt::Debug for FnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<code object {} at {}:{}>", self.name, self.filename, self.first_lineno)
    }
}

/// resume token to entry point map, filled lazily
#[derive(Default)]
pub struct ContinuationTable {
    entries: FxHashMap<ResumeToken, EntryPoint>,
}

impl ContinuationTable {
    /// an empty table
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        ContinuationTable { entries }
    }

    /// the entry point for `at`, created on first use
    pub fn get_or_create(&mut self, at: ResumeToken, code: &dyn Code) -> EntryPoint {
        self.entries
            .entry(at)
            .or_insert_with(|| {
                debug!("materialize continuation {at:?} of {}", code.qualname());
                code.entry_point(at)
            })
            .clone()
    }

    /// make sure `at` has an entry without running it
    #[inline]
    pub fn prepare(&mut self, at: ResumeToken, code: &dyn Code) {
        if !self.entries.contains_key(&at) {
            self.get_or_create(at, code);
        }
    }

    /// is there an entry for `at`
    pub fn contains(&self, at: ResumeToken) -> bool {
        self.entries.contains_key(&at)
    }

    /// number of materialized entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// is the table empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ContinuationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<_> = self.entries.keys().collect();
        tokens.sort_by_key(|t| t.yield_index());
        f.debug_struct("ContinuationTable").field("entries", &tokens).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;
    use std::cell::Cell;

    #[test]
    fn test_lazy_entries() {
        let made = Rc::new(Cell::new(0));
        struct Counting(Rc<Cell<usize>>);
        impl Code for Counting {
            fn name(&self) -> &str {
                "counting"
            }
            fn entry_point(&self, _at: ResumeToken) -> EntryPoint {
                self.0.set(self.0.get() + 1);
                continuation(|_scope| Ok(Signal::Return(Value::None)))
            }
        }

        let code = Counting(made.clone());
        let mut table = ContinuationTable::with_capacity(4);
        assert!(table.is_empty());

        table.get_or_create(ResumeToken::START, &code);
        table.get_or_create(ResumeToken::START, &code);
        assert_eq!(made.get(), 1);

        table.prepare(ResumeToken::yield_point(0), &code);
        table.prepare(ResumeToken::yield_point(0), &code);
        assert_eq!(made.get(), 2);
        assert_eq!(table.len(), 2);
        assert!(table.contains(ResumeToken::yield_point(0)));
        assert!(!table.contains(ResumeToken::yield_point(1)));
    }

    #[test]
    fn test_fn_code_location() {
        let code = FnCode::new("gen", |_, _| Ok(Signal::Return(Value::None)))
            .at("mod.py", 7)
            .with_locals(2);
        assert_eq!(code.name(), "gen");
        assert_eq!(code.qualname(), "gen");
        assert_eq!(code.filename(), "mod.py");
        assert_eq!(code.first_lineno(), 7);
        assert_eq!(code.nlocals(), 2);
    }
}
