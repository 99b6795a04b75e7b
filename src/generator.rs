//! # generator
//!
//! the caller facing protocol: send, throw and close
//!
//! each adapter checks its preconditions, drives the engine once and turns
//! the `Outcome` into the kind specific result
//!

use std::fmt;
use std::rc::Rc;

use crate::exception::{msg, Exception, ExceptionKind, Traceback};
use crate::gen_impl::{Generator, GeneratorImpl};
use crate::rt::{GeneratorKind, Injected, Outcome, ThrowRequest};
use crate::value::Value;

impl GeneratorImpl {
    // the finished/running checks shared by send and next
    fn check_resumable(&self) -> Result<(), Exception> {
        if self.is_finished() {
            return Err(match self.kind() {
                GeneratorKind::AsyncGenerator => Exception::stop_async_iteration(),
                GeneratorKind::Coroutine => Exception::runtime_error(msg::CANNOT_REUSE_CORO),
                GeneratorKind::PlainGenerator => Exception::stop_iteration(None),
            });
        }
        if self.is_running() {
            return Err(Exception::value_error(msg::GENERATOR_ALREADY_EXECUTING));
        }
        Ok(())
    }

    // map an outcome onto the caller visible result
    fn translate(&self, outcome: Outcome) -> Result<Value, Exception> {
        match outcome {
            Outcome::Yielded(v) => Ok(v),
            Outcome::Returned(v) => Err(if self.is_async_gen() {
                Exception::stop_async_iteration()
            } else if v.is_none() {
                Exception::stop_iteration(None)
            } else {
                Exception::stop_iteration(Some(v))
            }),
            Outcome::Raised(e) => Err(self.escaped(e)),
        }
    }

    // an exhaustion signal must not leave a body unwrapped
    fn escaped(&self, e: Exception) -> Exception {
        if self.is_async_gen() && e.is(&ExceptionKind::StopAsyncIteration) {
            return e.wrap_in_runtime_error(msg::ASYNCGEN_RAISED_ASYNCSTOPITER);
        }
        if e.is(&ExceptionKind::StopIteration) {
            return e.wrap_in_runtime_error(msg::GENERATOR_RAISED_STOPITER);
        }
        e
    }

    /// send interface
    ///
    /// `Value::None` is the "no value" sentinel, the only value an
    /// unstarted generator accepts
    pub fn send(&self, value: Value) -> Result<Value, Exception> {
        self.check_resumable()?;
        if !self.is_started() {
            if !value.is_none() {
                return Err(Exception::type_error(
                    msg::SEND_NON_NONE_TO_UNSTARTED_GENERATOR,
                ));
            }
            return self.translate(self.resume(Injected::Nothing));
        }
        self.translate(self.resume(Injected::Value(value)))
    }

    /// `__next__`
    #[inline]
    pub fn next(&self) -> Result<Value, Exception> {
        self.send(Value::None)
    }

    /// `throw(typ, val, tb)`
    ///
    /// `tb` has to be `None` or a traceback, `typ` and `val` are turned into
    /// an exception instance the way `raise` would
    pub fn throw(&self, typ: &Value, val: &Value, tb: &Value) -> Result<Value, Exception> {
        let tb = match tb {
            Value::None => None,
            Value::Traceback(tb) => Some(tb.clone()),
            _ => {
                return Err(Exception::type_error(
                    msg::THROW_THIRD_ARG_MUST_BE_TRACEBACK,
                ))
            }
        };
        if self.is_running() {
            return Err(Exception::value_error(msg::GENERATOR_ALREADY_EXECUTING));
        }
        let mut exc = Exception::prepare(typ, val)?;
        if tb.is_some() {
            exc.set_traceback(tb);
        }
        self.throw_exception(exc)
    }

    /// throw an already built exception instance
    pub fn throw_exception(&self, mut exc: Exception) -> Result<Value, Exception> {
        if self.is_running() {
            return Err(Exception::value_error(msg::GENERATOR_ALREADY_EXECUTING));
        }
        // filled again only if the body catches it
        exc.set_context(None);
        if self.is_coroutine() && self.is_finished() {
            return Err(Exception::runtime_error(msg::CANNOT_REUSE_CORO));
        }
        if self.is_started() && !self.is_finished() {
            let req = ThrowRequest::new(exc, self.options().native_stacktrace);
            return self.translate(self.resume(Injected::Throw(req)));
        }

        // nothing in the body could handle it, raise it here as if the body
        // had been entered at its first line
        self.mark_finished();
        let code = self.code_object();
        let entry = Traceback::single(&self.qualname(), code.filename(), code.first_lineno());
        let tb = entry.chain(exc.traceback());
        exc.set_traceback(Some(tb));
        if self.options().native_stacktrace {
            exc.capture_native_trace();
        }
        debug!("throw into unstarted {}: {exc}", self.qualname());
        Err(exc)
    }

    /// close the generator
    ///
    /// raises `GeneratorExit` at the suspension point; the body has to finish
    /// in response, yielding again is an error
    pub fn close(&self) -> Result<(), Exception> {
        if self.is_running() {
            return Err(Exception::value_error(msg::GENERATOR_ALREADY_EXECUTING));
        }
        if !self.is_started() || self.is_finished() {
            self.mark_finished();
            return Ok(());
        }

        let req = ThrowRequest::new(Exception::generator_exit(), self.options().native_stacktrace);
        let outcome = self.resume(Injected::Throw(req));
        self.mark_finished();
        match outcome {
            Outcome::Yielded(_) => Err(Exception::runtime_error(msg::GENERATOR_IGNORED_EXIT)),
            Outcome::Returned(_) => Ok(()),
            Outcome::Raised(e)
                if e.is(&ExceptionKind::GeneratorExit) || e.is(&ExceptionKind::StopIteration) =>
            {
                Ok(())
            }
            Outcome::Raised(e) => Err(self.escaped(e)),
        }
    }

    /// iterate the generator, exhaustion ends the iteration
    pub fn iter(self: &Rc<Self>) -> Iter {
        Iter::new(self.clone())
    }
}

/// `Iterator` view of a generator
///
/// yields `Ok` for every produced value, at most one `Err` for an error
/// escaping the body, and stops on the exhaustion signal
pub struct Iter {
    gen: Generator,
    done: bool,
}

impl Iter {
    /// create an iterator over `gen`
    pub fn new(gen: Generator) -> Self {
        Iter { gen, done: false }
    }
}

impl Iterator for Iter {
    type Item = Result<Value, Exception>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.gen.next() {
            Ok(v) => Some(Ok(v)),
            Err(e) => {
                self.done = true;
                let exhausted = if self.gen.is_async_gen() {
                    e.is(&ExceptionKind::StopAsyncIteration)
                } else {
                    e.is(&ExceptionKind::StopIteration)
                };
                if exhausted {
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

impl fmt::Display for GeneratorImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} object {} at {:p}>",
            self.kind().type_name(),
            self.qualname(),
            self as *const GeneratorImpl
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::continuation::FnCode;
    use crate::gen_impl::Gn;
    use crate::rt::ResumeToken;

    fn once(kind: GeneratorKind) -> Generator {
        let code = FnCode::new("once", |at, s| match at.yield_index() {
            None => s.yield_(Value::Int(1), ResumeToken::yield_point(0)),
            _ => {
                s.sent()?;
                s.return_(Value::None)
            }
        });
        Gn::new(kind, Rc::new(code), vec![])
    }

    #[test]
    fn test_finished_error_per_kind() {
        let g = once(GeneratorKind::PlainGenerator);
        g.close().unwrap();
        assert!(g.next().unwrap_err().is(&ExceptionKind::StopIteration));

        let c = once(GeneratorKind::Coroutine);
        c.close().unwrap();
        let err = c.next().unwrap_err();
        assert!(err.is(&ExceptionKind::RuntimeError));
        assert_eq!(err.message(), msg::CANNOT_REUSE_CORO);

        let a = once(GeneratorKind::AsyncGenerator);
        a.close().unwrap();
        assert!(a.next().unwrap_err().is(&ExceptionKind::StopAsyncIteration));
    }

    #[test]
    fn test_returned_none_per_kind() {
        let g = once(GeneratorKind::PlainGenerator);
        assert_eq!(g.next().unwrap(), Value::Int(1));
        let err = g.next().unwrap_err();
        assert!(err.is(&ExceptionKind::StopIteration));
        assert!(err.args().is_empty());

        let a = once(GeneratorKind::AsyncGenerator);
        assert_eq!(a.next().unwrap(), Value::Int(1));
        assert!(a.next().unwrap_err().is(&ExceptionKind::StopAsyncIteration));
    }

    #[test]
    fn test_iter() {
        let g = once(GeneratorKind::PlainGenerator);
        let items: Vec<_> = g.iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &Value::Int(1));
        assert!(g.is_finished());
    }

    #[test]
    fn test_display() {
        let g = once(GeneratorKind::AsyncGenerator);
        g.set_qualname("C.once");
        let s = g.to_string();
        assert!(s.starts_with("<async_generator object C.once at 0x"), "{s}");
    }
}
