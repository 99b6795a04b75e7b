//! # generator
//!
//! the generator engine: lifecycle state, the continuation table, and the
//! translation of a raw resumption result into an `Outcome`
//!

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::continuation::{Code, ContinuationTable};
use crate::exception::{msg, Exception};
use crate::rt::{Arguments, GeneratorKind, Injected, Outcome, ResumeToken, Signal, Snapshot};
use crate::scope::Scope;
use crate::value::Value;

/// default initial capacity of the continuation table
pub const DEFAULT_TABLE_CAPACITY: usize = 4;

/// the generator type
pub type Generator = Rc<GeneratorImpl>;

/// generator options
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// attach a native backtrace to exceptions injected by `throw`/`close`
    pub native_stacktrace: bool,
    /// initial capacity of the continuation table
    pub table_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            native_stacktrace: false,
            table_capacity: DEFAULT_TABLE_CAPACITY,
        }
    }
}

/// Generator helper
pub struct Gn;

impl Gn {
    /// create a generator instance with default options
    pub fn new(kind: GeneratorKind, code: Rc<dyn Code>, args: Vec<Value>) -> Generator {
        Self::new_opt(Options::default(), kind, code, args)
    }

    /// create a generator instance with specified options
    pub fn new_opt(
        opts: Options,
        kind: GeneratorKind,
        code: Rc<dyn Code>,
        args: Vec<Value>,
    ) -> Generator {
        Rc::new(GeneratorImpl::new(opts, kind, code, args))
    }

    /// create a plain generator
    pub fn generator(code: Rc<dyn Code>, args: Vec<Value>) -> Generator {
        Self::new(GeneratorKind::PlainGenerator, code, args)
    }

    /// create a coroutine
    pub fn coroutine(code: Rc<dyn Code>, args: Vec<Value>) -> Generator {
        Self::new(GeneratorKind::Coroutine, code, args)
    }

    /// create an async generator
    pub fn async_generator(code: Rc<dyn Code>, args: Vec<Value>) -> Generator {
        Self::new(GeneratorKind::AsyncGenerator, code, args)
    }
}

/// externally visible frame of a suspended generator
#[derive(Debug)]
pub struct FrameObject {
    name: Rc<str>,
    filename: Rc<str>,
    lineno: Cell<u32>,
    locals: RefCell<Vec<Value>>,
}

impl FrameObject {
    /// function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// source file
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// `f_lineno`
    pub fn lineno(&self) -> u32 {
        self.lineno.get()
    }

    /// `f_locals`
    pub fn locals(&self) -> Vec<Value> {
        self.locals.borrow().clone()
    }

    fn sync(&self, snapshot: &Snapshot) {
        self.lineno.set(snapshot.lineno);
        *self.locals.borrow_mut() = snapshot.locals.clone();
    }
}

/// code handle exposed for introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInfo {
    /// `co_name`
    pub name: Rc<str>,
    /// `co_qualname`
    pub qualname: Rc<str>,
    /// `co_filename`
    pub filename: Rc<str>,
    /// `co_firstlineno`
    pub first_lineno: u32,
}

/// `running` flag held for the duration of one resumption
struct RunningGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(RunningGuard { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// `GeneratorImpl`
pub struct GeneratorImpl {
    kind: GeneratorKind,
    opts: Options,
    name: RefCell<Rc<str>>,
    qualname: RefCell<Rc<str>>,
    code: Rc<dyn Code>,
    // lifecycle
    running: Cell<bool>,
    started: Cell<bool>,
    finished: Cell<bool>,
    token: Cell<ResumeToken>,
    // template copied for every resumption
    arguments: Arguments,
    snapshot: RefCell<Snapshot>,
    table: RefCell<ContinuationTable>,
    // lazily materialized introspection artifacts
    frame: RefCell<Option<Rc<FrameObject>>>,
    code_info: OnceCell<Rc<CodeInfo>>,
}

impl GeneratorImpl {
    fn new(opts: Options, kind: GeneratorKind, code: Rc<dyn Code>, args: Vec<Value>) -> Self {
        let snapshot = Snapshot::new(code.nlocals());
        GeneratorImpl {
            kind,
            opts,
            name: RefCell::new(Rc::from(code.name())),
            qualname: RefCell::new(Rc::from(code.qualname())),
            running: Cell::new(false),
            started: Cell::new(false),
            finished: Cell::new(false),
            token: Cell::new(ResumeToken::START),
            arguments: Arguments::new(args),
            snapshot: RefCell::new(snapshot),
            table: RefCell::new(ContinuationTable::with_capacity(opts.table_capacity)),
            frame: RefCell::new(None),
            code_info: OnceCell::new(),
            code,
        }
    }

    /// generator kind
    #[inline]
    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    /// is this a coroutine
    #[inline]
    pub fn is_coroutine(&self) -> bool {
        self.kind == GeneratorKind::Coroutine
    }

    /// is this an async generator
    #[inline]
    pub fn is_async_gen(&self) -> bool {
        self.kind == GeneratorKind::AsyncGenerator
    }

    /// options the instance was created with
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// `gi_running`
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// is finished
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// has any body code run yet
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// `gi_suspended`
    pub fn is_suspended(&self) -> bool {
        self.is_started() && !self.is_running() && !self.is_finished()
    }

    /// where the next resumption continues
    pub fn resume_token(&self) -> ResumeToken {
        self.token.get()
    }

    /// number of materialized continuations
    pub fn continuation_count(&self) -> usize {
        self.table.borrow().len()
    }

    /// `__name__`
    pub fn name(&self) -> Rc<str> {
        self.name.borrow().clone()
    }

    /// set `__name__`
    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = Rc::from(name);
    }

    /// `__qualname__`
    pub fn qualname(&self) -> Rc<str> {
        self.qualname.borrow().clone()
    }

    /// set `__qualname__`
    pub fn set_qualname(&self, qualname: &str) {
        *self.qualname.borrow_mut() = Rc::from(qualname);
    }

    /// the body this instance runs
    pub fn code_object(&self) -> &Rc<dyn Code> {
        &self.code
    }

    /// `gi_code`
    pub fn code(&self) -> Rc<CodeInfo> {
        self.code_info
            .get_or_init(|| {
                Rc::new(CodeInfo {
                    name: Rc::from(self.code.name()),
                    qualname: Rc::from(self.code.qualname()),
                    filename: Rc::from(self.code.filename()),
                    first_lineno: self.code.first_lineno(),
                })
            })
            .clone()
    }

    /// `gi_frame`, `None` once finished
    pub fn frame(&self) -> Option<Rc<FrameObject>> {
        if self.is_finished() {
            return None;
        }
        let mut cached = self.frame.borrow_mut();
        let frame = cached.get_or_insert_with(|| {
            Rc::new(FrameObject {
                name: self.qualname(),
                filename: Rc::from(self.code.filename()),
                lineno: Cell::new(self.code.first_lineno()),
                locals: RefCell::new(Vec::new()),
            })
        });
        // while running the snapshot is borrowed by the body
        if let Ok(snapshot) = self.snapshot.try_borrow() {
            if self.is_started() {
                frame.sync(&snapshot);
            } else {
                *frame.locals.borrow_mut() = snapshot.locals.clone();
            }
        }
        Some(frame.clone())
    }

    /// `gi_yieldfrom`
    pub fn yield_from(&self) -> Option<Value> {
        if !self.is_suspended() {
            return None;
        }
        self.snapshot
            .try_borrow()
            .ok()
            .and_then(|s| s.yield_from.clone())
    }

    /// mark the instance as finished, drops everything a body could reach
    pub(crate) fn mark_finished(&self) {
        if self.finished.replace(true) {
            return;
        }
        debug!("{} {} finished", self.kind.type_name(), self.qualname());
        self.frame.borrow_mut().take();
        if let Ok(mut snapshot) = self.snapshot.try_borrow_mut() {
            snapshot.yield_from = None;
        }
    }

    /// resume the body at the current resume token
    ///
    /// the caller makes sure the instance is neither finished nor running;
    /// a reentrant call is still refused here
    pub(crate) fn resume(&self, injected: Injected) -> Outcome {
        debug_assert!(!self.is_finished());

        let at = self.token.get();
        let result = {
            let _running = match RunningGuard::acquire(&self.running) {
                Some(guard) => guard,
                None => {
                    warn!("refused reentrant resume of {}", self.qualname());
                    return Outcome::Raised(Exception::value_error(
                        msg::GENERATOR_ALREADY_EXECUTING,
                    ));
                }
            };

            self.started.set(true);

            // fresh copy of the arguments for this resumption only
            let mut args = self.arguments.clone();
            args.special = injected;

            let entry = self.table.borrow_mut().get_or_create(at, &*self.code);
            trace!("resume {} at {at:?}", self.qualname());

            let mut snapshot = self.snapshot.borrow_mut();
            let mut scope = Scope::new(
                &mut snapshot,
                &mut args,
                self.qualname(),
                Rc::from(self.code.filename()),
            );
            let result = entry(&mut scope);
            // a thrown exception nobody read is raised at the resume point
            match scope.take_pending_throw() {
                Some(exc) if result.is_ok() => Err(exc),
                _ => result,
            }
        };

        match result {
            Ok(Signal::Yield { resume_at, .. }) if resume_at.is_start() => {
                error!("{} yielded with the start token", self.qualname());
                self.mark_finished();
                Outcome::Raised(Exception::runtime_error(msg::YIELD_TO_START))
            }
            Ok(Signal::Yield { value, resume_at }) => {
                trace!("{} suspended at {resume_at:?}", self.qualname());
                self.table.borrow_mut().prepare(resume_at, &*self.code);
                self.token.set(resume_at);
                Outcome::Yielded(value)
            }
            Ok(Signal::Return(value)) => {
                self.mark_finished();
                Outcome::Returned(value)
            }
            Err(e) => {
                self.mark_finished();
                Outcome::Raised(e)
            }
        }
    }
}

impl Drop for GeneratorImpl {
    fn drop(&mut self) {
        if self.is_suspended() {
            warn!(
                "{} {} dropped while suspended",
                self.kind.type_name(),
                self.qualname()
            );
        }
    }
}

impl fmt::Debug for GeneratorImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorImpl")
            .field("kind", &self.kind)
            .field("qualname", &self.qualname())
            .field("running", &self.is_running())
            .field("finished", &self.is_finished())
            .field("token", &self.token.get())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::continuation::FnCode;
    use crate::exception::ExceptionKind;

    fn counter() -> Rc<dyn Code> {
        Rc::new(
            FnCode::new("counter", |at, s| match at.yield_index() {
                None => {
                    s.set_local(0, Value::Int(0));
                    s.set_lineno(2);
                    s.yield_(Value::Int(0), ResumeToken::yield_point(0))
                }
                Some(0) => {
                    s.sent()?;
                    let n = match s.local(0) {
                        Value::Int(n) => n + 1,
                        _ => 0,
                    };
                    s.set_local(0, Value::Int(n));
                    if n == 3 {
                        return s.return_(Value::Int(n));
                    }
                    s.yield_(Value::Int(n), ResumeToken::yield_point(0))
                }
                Some(_) => unreachable!(),
            })
            .with_locals(1),
        )
    }

    #[test]
    fn test_fresh_instance() {
        let g = Gn::generator(counter(), vec![]);
        assert!(!g.is_finished());
        assert!(!g.is_running());
        assert!(!g.is_started());
        assert!(!g.is_suspended());
        assert_eq!(g.continuation_count(), 0);
    }

    #[test]
    fn test_resume_outcomes() {
        let g = Gn::generator(counter(), vec![]);
        assert!(matches!(g.resume(Injected::Nothing), Outcome::Yielded(Value::Int(0))));
        assert!(g.is_suspended());
        assert_eq!(g.resume_token(), ResumeToken::yield_point(0));
        // START and the one yield point
        assert_eq!(g.continuation_count(), 2);

        assert!(matches!(g.resume(Injected::Value(Value::None)), Outcome::Yielded(Value::Int(1))));
        assert!(matches!(g.resume(Injected::Value(Value::None)), Outcome::Yielded(Value::Int(2))));
        assert!(matches!(g.resume(Injected::Value(Value::None)), Outcome::Returned(Value::Int(3))));
        assert!(g.is_finished());
        assert!(!g.is_running());
        assert_eq!(g.continuation_count(), 2);
    }

    #[test]
    fn test_raise_finishes() {
        let code = Rc::new(FnCode::new("bad", |_, s| {
            s.raise(Exception::value_error("bad"))
        }));
        let g = Gn::generator(code, vec![]);
        match g.resume(Injected::Nothing) {
            Outcome::Raised(e) => assert!(e.is(&ExceptionKind::ValueError)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(g.is_finished());
        assert!(g.is_started());
        assert!(!g.is_running());
    }

    #[test]
    fn test_frame_and_code() {
        let g = Gn::generator(counter(), vec![]);
        let code = g.code();
        assert!(Rc::ptr_eq(&code, &g.code()));
        assert_eq!(&*code.name, "counter");

        let frame = g.frame().unwrap();
        assert_eq!(frame.lineno(), 1);
        g.resume(Injected::Nothing);
        let again = g.frame().unwrap();
        assert!(Rc::ptr_eq(&frame, &again));
        assert_eq!(again.lineno(), 2);
        assert_eq!(again.locals(), vec![Value::Int(0)]);

        g.mark_finished();
        assert!(g.frame().is_none());
    }

    #[test]
    fn test_names() {
        let g = Gn::generator(counter(), vec![]);
        assert_eq!(&*g.name(), "counter");
        g.set_qualname("Outer.counter");
        assert_eq!(&*g.qualname(), "Outer.counter");
        assert_eq!(&*g.name(), "counter");
    }
}
