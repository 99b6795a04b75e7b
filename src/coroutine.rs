//! # coroutine
//!
//! coroutine wrapper
//! republishes a coroutine under the plain iterator contract, this is what
//! `__await__` hands out; it holds no state of its own and forwards every
//! call, so the coroutine error rules apply unchanged
//!

use std::fmt;
use std::rc::Rc;

use crate::exception::{Exception, ExceptionKind};
use crate::gen_impl::{Generator, GeneratorImpl};
use crate::value::{Object, Value};

/// CoroutineWrapper
pub struct CoroutineWrapper {
    coroutine: Generator,
}

impl CoroutineWrapper {
    /// wrap a coroutine, anything else is a `TypeError`
    pub fn new(coroutine: Generator) -> Result<Self, Exception> {
        if !coroutine.is_coroutine() {
            return Err(Exception::new(
                ExceptionKind::TypeError,
                format!(
                    "expected a coroutine, got '{}'",
                    coroutine.kind().type_name()
                ),
            ));
        }
        Ok(CoroutineWrapper { coroutine })
    }

    /// the wrapped coroutine
    pub fn coroutine(&self) -> &Generator {
        &self.coroutine
    }

    /// `__next__`
    #[inline]
    pub fn next(&self) -> Result<Value, Exception> {
        self.coroutine.send(Value::None)
    }

    /// `send`
    #[inline]
    pub fn send(&self, value: Value) -> Result<Value, Exception> {
        self.coroutine.send(value)
    }

    /// `throw`
    #[inline]
    pub fn throw(&self, typ: &Value, val: &Value, tb: &Value) -> Result<Value, Exception> {
        self.coroutine.throw(typ, val, tb)
    }

    /// `close`
    #[inline]
    pub fn close(&self) -> Result<(), Exception> {
        self.coroutine.close()
    }
}

impl GeneratorImpl {
    /// `__await__` of a coroutine
    pub fn await_iter(self: &Rc<Self>) -> Result<CoroutineWrapper, Exception> {
        CoroutineWrapper::new(self.clone())
    }
}

impl Object for CoroutineWrapper {
    fn type_name(&self) -> &str {
        "coroutine_wrapper"
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Value, Exception> {
        CoroutineWrapper::next(self)
    }

    fn close(&self) -> Result<bool, Exception> {
        CoroutineWrapper::close(self)?;
        Ok(true)
    }
}

impl Iterator for CoroutineWrapper {
    type Item = Result<Value, Exception>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.coroutine.is_finished() {
            return None;
        }
        match CoroutineWrapper::next(self) {
            Ok(v) => Some(Ok(v)),
            Err(e) if e.is(&ExceptionKind::StopIteration) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl fmt::Debug for CoroutineWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<coroutine_wrapper object for {}>", self.coroutine)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::continuation::FnCode;
    use crate::exception::msg;
    use crate::gen_impl::Gn;
    use crate::rt::ResumeToken;

    // await something once, then return the sent value
    fn coro() -> Generator {
        let code = FnCode::new("coro", |at, s| match at.yield_index() {
            None => s.yield_(Value::str("pending"), ResumeToken::yield_point(0)),
            _ => {
                let v = s.sent()?;
                s.return_(v)
            }
        });
        Gn::coroutine(Rc::new(code), vec![])
    }

    #[test]
    fn test_wraps_only_coroutines() {
        let code = FnCode::new("g", |_, s| s.return_(Value::None));
        let g = Gn::generator(Rc::new(code), vec![]);
        assert!(g.await_iter().is_err());
        assert!(coro().await_iter().is_ok());
    }

    #[test]
    fn test_delegates() {
        let c = coro();
        let w = c.await_iter().unwrap();
        assert_eq!(w.next().unwrap(), Value::str("pending"));
        let err = w.send(Value::Int(42)).unwrap_err();
        assert!(err.is(&ExceptionKind::StopIteration));
        assert_eq!(err.value(), Value::Int(42));
        assert!(c.is_finished());

        let err = w.next().unwrap_err();
        assert_eq!(err.message(), msg::CANNOT_REUSE_CORO);
    }

    #[test]
    fn test_throw_through_wrapper() {
        let c = coro();
        let w = c.await_iter().unwrap();
        let err = w
            .throw(
                &Value::ExceptionType(ExceptionKind::ValueError),
                &Value::str("boom"),
                &Value::None,
            )
            .unwrap_err();
        assert!(err.is(&ExceptionKind::ValueError));
        assert!(c.is_finished());
    }

    #[test]
    fn test_iterator() {
        let w = coro().await_iter().unwrap();
        let items: Vec<_> = w.collect();
        assert_eq!(items.len(), 1);
    }
}
