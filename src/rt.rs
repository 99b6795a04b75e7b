//! # generator run time support
//!
//! the data threaded through one resumption: where to resume, the
//! per-instance execution state, and the per-call argument copy
//!
use std::fmt;

use crate::exception::Exception;
use crate::value::Value;

/// which protocol a generator instance follows
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GeneratorKind {
    /// `def f(): yield`
    PlainGenerator,
    /// `async def f(): await`
    Coroutine,
    /// `async def f(): yield`
    AsyncGenerator,
}

impl GeneratorKind {
    /// runtime type name
    pub fn type_name(self) -> &'static str {
        match self {
            GeneratorKind::PlainGenerator => "generator",
            GeneratorKind::Coroutine => "coroutine",
            GeneratorKind::AsyncGenerator => "async_generator",
        }
    }
}

/// opaque identifier of a suspension point
///
/// `START` marks an instance that has not run any code yet, every other
/// token names a yield point reported by the evaluator
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResumeToken(u32);

impl ResumeToken {
    /// the "not yet started" token
    pub const START: ResumeToken = ResumeToken(0);

    /// the highest valid yield point index
    pub const MAX_YIELD_POINT: u32 = u32::MAX - 1;

    /// token of the `n`th yield point of a body
    ///
    /// `n` is clamped to `MAX_YIELD_POINT`
    #[inline]
    pub const fn yield_point(n: u32) -> ResumeToken {
        ResumeToken(n.saturating_add(1))
    }

    /// the yield point index, `None` for `START`
    #[inline]
    pub fn yield_index(self) -> Option<u32> {
        self.0.checked_sub(1)
    }

    /// is this the "not yet started" token
    #[inline]
    pub fn is_start(self) -> bool {
        self == ResumeToken::START
    }
}

impl fmt::Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.yield_index() {
            None => write!(f, "ResumeToken(START)"),
            Some(n) => write!(f, "ResumeToken({n})"),
        }
    }
}

/// exception injected at the current suspension point
#[derive(Debug, Clone)]
pub struct ThrowRequest {
    /// the exception to raise at the resumption point
    pub exception: Exception,
    /// attach a native backtrace when the exception is raised
    pub native_trace: bool,
}

impl ThrowRequest {
    /// create a throw request
    pub fn new(exception: Exception, native_trace: bool) -> Self {
        ThrowRequest {
            exception,
            native_trace,
        }
    }
}

/// what a resumption delivers to the last yield expression
#[derive(Debug, Clone, Default)]
pub enum Injected {
    /// nothing, used for the very first resumption
    #[default]
    Nothing,
    /// the value of the yield expression
    Value(Value),
    /// raise at the yield expression instead of producing a value
    Throw(ThrowRequest),
}

/// the argument array of one resumption
///
/// a fresh copy of the instance template is made for every resumption, so
/// anything a body stores here dies with that resumption
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    /// positional arguments bound when the generator was created
    pub(crate) bound: Vec<Value>,
    /// the special slot: sent value or thrown exception
    pub(crate) special: Injected,
    /// the exception currently being handled
    pub(crate) exc_state: Option<Exception>,
}

impl Arguments {
    /// argument template for a new instance
    pub fn new(bound: Vec<Value>) -> Self {
        Arguments {
            bound,
            special: Injected::Nothing,
            exc_state: None,
        }
    }

    /// positional arguments
    pub fn bound(&self) -> &[Value] {
        &self.bound
    }
}

/// execution state snapshot of one generator instance
///
/// owned exclusively by its instance, only mutated while it is running
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// local variables
    pub(crate) locals: Vec<Value>,
    /// evaluation stack kept across suspension points
    pub(crate) stack: Vec<Value>,
    /// current line, `0` before the first line ran
    pub(crate) lineno: u32,
    /// target of an in-progress `yield from`
    pub(crate) yield_from: Option<Value>,
}

impl Snapshot {
    /// snapshot with `nlocals` unbound locals
    pub fn new(nlocals: usize) -> Self {
        Snapshot {
            locals: vec![Value::None; nlocals],
            ..Snapshot::default()
        }
    }

    /// local variables
    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// current line
    pub fn lineno(&self) -> u32 {
        self.lineno
    }
}

/// how a body leaves a resumption without raising
#[derive(Debug, Clone)]
pub enum Signal {
    /// suspend with `value`, next resumption starts at `resume_at`
    Yield {
        /// yielded value
        value: Value,
        /// where to continue
        resume_at: ResumeToken,
    },
    /// normal return
    Return(Value),
}

/// the outcome of one resumption
#[derive(Debug, Clone)]
pub enum Outcome {
    /// the body suspended with a value
    Yielded(Value),
    /// the body returned, `None` when it returned nothing
    Returned(Value),
    /// an error propagated out of the body
    Raised(Exception),
}
