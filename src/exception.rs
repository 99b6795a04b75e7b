//! # exception
//!
//! exception taxonomy used by the send/throw/close protocol
//!
//! the engine never defines new control flow through exceptions, but the
//! caller-visible contract is expressed with them: exhaustion signals,
//! the cancellation signal, and the protocol violation errors
//!

use std::backtrace::Backtrace;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::value::Value;

/// error messages raised by the protocol adapters
pub mod msg {
    /// reentrant resume
    pub const GENERATOR_ALREADY_EXECUTING: &str = "generator already executing";
    /// first send carried a value
    pub const SEND_NON_NONE_TO_UNSTARTED_GENERATOR: &str =
        "can't send non-None value to a just-started generator";
    /// resuming a finished coroutine
    pub const CANNOT_REUSE_CORO: &str = "cannot reuse already awaited coroutine";
    /// body yielded while handling `GeneratorExit`
    pub const GENERATOR_IGNORED_EXIT: &str = "generator ignored GeneratorExit";
    /// StopIteration escaped the body
    pub const GENERATOR_RAISED_STOPITER: &str = "generator raised StopIteration";
    /// StopAsyncIteration escaped an async generator body
    pub const ASYNCGEN_RAISED_ASYNCSTOPITER: &str = "async generator raised StopAsyncIteration";
    /// malformed third argument of `throw`
    pub const THROW_THIRD_ARG_MUST_BE_TRACEBACK: &str =
        "throw() third argument must be a traceback object";
    /// the evaluator asked to resume at the start token
    pub const YIELD_TO_START: &str = "generator cannot be suspended at its start";
    /// `throw(instance, value)`
    pub const INSTANCE_EX_MAY_NOT_HAVE_SEP_VALUE: &str =
        "instance exception may not have a separate value";
}

/// a user defined exception class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomKind {
    name: Rc<str>,
    base: ExceptionKind,
}

/// exception class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// root of the hierarchy
    BaseException,
    /// root of the ordinary errors
    Exception,
    /// cancellation signal injected by `close()`
    GeneratorExit,
    /// synchronous exhaustion signal
    StopIteration,
    /// asynchronous exhaustion signal
    StopAsyncIteration,
    /// protocol violation
    RuntimeError,
    /// reentrancy
    ValueError,
    /// malformed arguments
    TypeError,
    /// user defined class
    Custom(Rc<CustomKind>),
}

impl ExceptionKind {
    /// define a new exception class deriving from `base`
    pub fn custom(name: &str, base: ExceptionKind) -> ExceptionKind {
        ExceptionKind::Custom(Rc::new(CustomKind {
            name: Rc::from(name),
            base,
        }))
    }

    /// class name
    pub fn name(&self) -> &str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::GeneratorExit => "GeneratorExit",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::StopAsyncIteration => "StopAsyncIteration",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::Custom(c) => &*c.name,
        }
    }

    /// direct base class, `None` for `BaseException`
    pub fn base(&self) -> Option<ExceptionKind> {
        match self {
            ExceptionKind::BaseException => None,
            ExceptionKind::Exception | ExceptionKind::GeneratorExit => {
                Some(ExceptionKind::BaseException)
            }
            ExceptionKind::Custom(c) => Some(c.base.clone()),
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// `issubclass(self, other)`
    pub fn is_subclass(&self, other: &ExceptionKind) -> bool {
        let mut cur = Some(self.clone());
        while let Some(kind) = cur {
            if &kind == other {
                return true;
            }
            cur = kind.base();
        }
        false
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// one traceback entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackEntry {
    /// function name
    pub name: Rc<str>,
    /// source file
    pub filename: Rc<str>,
    /// line number
    pub lineno: u32,
}

/// traceback, outermost entry first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traceback {
    entries: SmallVec<[TracebackEntry; 2]>,
}

impl Traceback {
    /// an empty traceback
    pub fn new() -> Self {
        Traceback::default()
    }

    /// a traceback with a single entry
    pub fn single(name: &str, filename: &str, lineno: u32) -> Self {
        let mut tb = Traceback::new();
        tb.push(name, filename, lineno);
        tb
    }

    /// append an inner entry
    pub fn push(&mut self, name: &str, filename: &str, lineno: u32) {
        self.entries.push(TracebackEntry {
            name: Rc::from(name),
            filename: Rc::from(filename),
            lineno,
        });
    }

    /// link `self` in front of `inner`, like `tb_next`
    pub fn chain(mut self, inner: Option<&Traceback>) -> Self {
        if let Some(inner) = inner {
            self.entries.extend(inner.entries.iter().cloned());
        }
        self
    }

    /// all entries, outermost first
    pub fn entries(&self) -> &[TracebackEntry] {
        &self.entries
    }

    /// the innermost entry
    pub fn last(&self) -> Option<&TracebackEntry> {
        self.entries.last()
    }
}

/// an exception instance
#[derive(Error, Clone)]
#[error("{kind}{}", render_args(.args))]
pub struct Exception {
    kind: ExceptionKind,
    args: SmallVec<[Value; 1]>,
    #[source]
    cause: Option<Box<Exception>>,
    context: Option<Box<Exception>>,
    suppress_context: bool,
    traceback: Option<Traceback>,
    native_trace: Option<Rc<Backtrace>>,
}

fn render_args(args: &[Value]) -> String {
    match args {
        [] => String::new(),
        [single] => format!(": {single}"),
        many => {
            let inner: Vec<String> = many.iter().map(Value::repr).collect();
            format!(": ({})", inner.join(", "))
        }
    }
}

impl Exception {
    /// new exception with a message argument
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Exception::with_args(kind, vec![Value::str(&message)])
    }

    /// new exception with explicit args
    pub fn with_args(kind: ExceptionKind, args: Vec<Value>) -> Self {
        Exception {
            kind,
            args: SmallVec::from_vec(args),
            cause: None,
            context: None,
            suppress_context: false,
            traceback: None,
            native_trace: None,
        }
    }

    /// new exception without args
    pub fn bare(kind: ExceptionKind) -> Self {
        Exception::with_args(kind, Vec::new())
    }

    /// `StopIteration()` or `StopIteration(value)`
    pub fn stop_iteration(value: Option<Value>) -> Self {
        match value {
            Some(v) => Exception::with_args(ExceptionKind::StopIteration, vec![v]),
            None => Exception::bare(ExceptionKind::StopIteration),
        }
    }

    /// `StopAsyncIteration()`
    pub fn stop_async_iteration() -> Self {
        Exception::bare(ExceptionKind::StopAsyncIteration)
    }

    /// `GeneratorExit()`
    pub fn generator_exit() -> Self {
        Exception::bare(ExceptionKind::GeneratorExit)
    }

    /// `RuntimeError(message)`
    pub fn runtime_error(message: &str) -> Self {
        Exception::new(ExceptionKind::RuntimeError, message)
    }

    /// `ValueError(message)`
    pub fn value_error(message: &str) -> Self {
        Exception::new(ExceptionKind::ValueError, message)
    }

    /// `TypeError(message)`
    pub fn type_error(message: &str) -> Self {
        Exception::new(ExceptionKind::TypeError, message)
    }

    /// the exception class
    #[inline]
    pub fn kind(&self) -> &ExceptionKind {
        &self.kind
    }

    /// `isinstance(self, kind)`
    #[inline]
    pub fn is(&self, kind: &ExceptionKind) -> bool {
        self.kind.is_subclass(kind)
    }

    /// positional args
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// `StopIteration.value`, `None` when there are no args
    pub fn value(&self) -> Value {
        self.args.first().cloned().unwrap_or_default()
    }

    /// `str(self)`
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            many => Value::tuple(many.to_vec()).repr(),
        }
    }

    /// `repr(self)`
    pub fn repr(&self) -> String {
        let inner: Vec<String> = self.args.iter().map(Value::repr).collect();
        format!("{}({})", self.kind, inner.join(", "))
    }

    /// `__cause__`
    pub fn cause(&self) -> Option<&Exception> {
        self.cause.as_deref()
    }

    /// set `__cause__`, which also suppresses the context in reports
    pub fn set_cause(&mut self, cause: Option<Exception>) {
        self.cause = cause.map(Box::new);
        self.suppress_context = true;
    }

    /// `__context__`
    pub fn context(&self) -> Option<&Exception> {
        self.context.as_deref()
    }

    /// set `__context__`
    pub fn set_context(&mut self, context: Option<Exception>) {
        self.context = context.map(Box::new);
    }

    /// `__suppress_context__`
    pub fn suppress_context(&self) -> bool {
        self.suppress_context
    }

    /// `__traceback__`
    pub fn traceback(&self) -> Option<&Traceback> {
        self.traceback.as_ref()
    }

    /// set `__traceback__`
    pub fn set_traceback(&mut self, tb: Option<Traceback>) {
        self.traceback = tb;
    }

    /// record the location where the exception passes through
    pub fn add_traceback_entry(&mut self, name: &str, filename: &str, lineno: u32) {
        self.traceback
            .get_or_insert_with(Traceback::new)
            .push(name, filename, lineno);
    }

    /// native backtrace captured when the exception was injected
    pub fn native_trace(&self) -> Option<&Backtrace> {
        self.native_trace.as_deref()
    }

    /// capture and attach a native backtrace
    pub fn capture_native_trace(&mut self) {
        self.native_trace = Some(Rc::new(Backtrace::force_capture()));
    }

    /// wrap `self` in a `RuntimeError` with `self` as its cause
    pub(crate) fn wrap_in_runtime_error(self, message: &str) -> Exception {
        let mut err = Exception::runtime_error(message);
        err.context = Some(Box::new(self.clone()));
        err.set_cause(Some(self));
        err
    }

    /// build an exception instance from `throw(typ, val)` arguments
    ///
    /// `typ` is either an exception class, instantiated with `val`, or an
    /// instance, in which case `val` has to be `None`
    pub fn prepare(typ: &Value, val: &Value) -> Result<Exception, Exception> {
        match typ {
            Value::ExceptionType(kind) => Ok(match val {
                Value::None => Exception::bare(kind.clone()),
                Value::Exception(e) if e.is(kind) => (**e).clone(),
                Value::Tuple(items) => Exception::with_args(kind.clone(), items.to_vec()),
                other => Exception::with_args(kind.clone(), vec![other.clone()]),
            }),
            Value::Exception(e) => {
                if !val.is_none() {
                    return Err(Exception::type_error(
                        msg::INSTANCE_EX_MAY_NOT_HAVE_SEP_VALUE,
                    ));
                }
                Ok((**e).clone())
            }
            other => Err(Exception::type_error(&format!(
                "exceptions must be classes or instances deriving from BaseException, not {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}
