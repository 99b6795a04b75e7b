//! # yieldpoint
//!
//! suspension and resumption engine for generator, coroutine and async
//! generator objects of a language runtime
//!
//! the evaluator that runs user code is outside of this crate; it provides
//! a [`Code`] that hands out one entry point per suspension point, and the
//! engine decides when to run which one and what the caller sees
//!
//! ```
//! use std::rc::Rc;
//! use yieldpoint::{FnCode, Gn, ResumeToken, Value};
//!
//! let code = FnCode::new("count", |at, s| match at.yield_index() {
//!     None => s.yield_(Value::Int(1), ResumeToken::yield_point(0)),
//!     Some(0) => {
//!         s.sent()?;
//!         s.yield_(Value::Int(2), ResumeToken::yield_point(1))
//!     }
//!     _ => {
//!         s.sent()?;
//!         s.return_(Value::str("done"))
//!     }
//! });
//!
//! let g = Gn::generator(Rc::new(code), vec![]);
//! assert_eq!(g.next().unwrap(), Value::Int(1));
//! assert_eq!(g.next().unwrap(), Value::Int(2));
//! assert_eq!(g.next().unwrap_err().value(), Value::str("done"));
//! assert!(g.is_finished());
//! ```
//!

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod awaitable;
mod continuation;
mod coroutine;
mod exception;
mod gen_impl;
mod generator;
mod rt;
mod scope;
mod value;
mod yield_;

pub use crate::awaitable::get_awaitable_iter;
pub use crate::continuation::{continuation, Code, ContinuationTable, EntryPoint, FnCode};
pub use crate::coroutine::CoroutineWrapper;
pub use crate::exception::{msg, CustomKind, Exception, ExceptionKind, Traceback, TracebackEntry};
pub use crate::gen_impl::{
    CodeInfo, FrameObject, Generator, GeneratorImpl, Gn, Options, DEFAULT_TABLE_CAPACITY,
};
pub use crate::generator::Iter;
pub use crate::rt::{
    Arguments, GeneratorKind, Injected, Outcome, ResumeToken, Signal, Snapshot, ThrowRequest,
};
pub use crate::scope::Scope;
pub use crate::value::{Object, Value};
pub use crate::yield_::{delegate_to, yield_from, Step};
