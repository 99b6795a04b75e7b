//! # scope
//!
//! the view of one resumption handed to the evaluator
//!

use std::rc::Rc;

use crate::exception::Exception;
use crate::rt::{Arguments, Injected, ResumeToken, Signal, Snapshot, ThrowRequest};
use crate::value::Value;

/// passed in scope type
/// it borrows the instance snapshot and owns nothing, the per-call argument
/// copy it refers to is dropped when the resumption ends
pub struct Scope<'a> {
    snapshot: &'a mut Snapshot,
    args: &'a mut Arguments,
    name: Rc<str>,
    filename: Rc<str>,
}

impl<'a> Scope<'a> {
    /// create a new scope object
    pub(crate) fn new(
        snapshot: &'a mut Snapshot,
        args: &'a mut Arguments,
        name: Rc<str>,
        filename: Rc<str>,
    ) -> Self {
        Scope {
            snapshot,
            args,
            name,
            filename,
        }
    }

    /// the value of the yield expression we resumed at
    ///
    /// a pending throw request is raised here instead, with this frame added
    /// to its traceback
    pub fn sent(&mut self) -> Result<Value, Exception> {
        match std::mem::take(&mut self.args.special) {
            Injected::Nothing => Ok(Value::None),
            Injected::Value(v) => Ok(v),
            Injected::Throw(req) => Err(self.raise_here(req)),
        }
    }

    fn raise_here(&self, req: ThrowRequest) -> Exception {
        let mut exc = req.exception;
        if req.native_trace {
            exc.capture_native_trace();
        }
        exc.add_traceback_entry(&self.name, &self.filename, self.snapshot.lineno);
        exc
    }

    /// the throw request the body never looked at, if any
    pub(crate) fn take_pending_throw(&mut self) -> Option<Exception> {
        match std::mem::take(&mut self.args.special) {
            Injected::Throw(req) => Some(self.raise_here(req)),
            other => {
                self.args.special = other;
                None
            }
        }
    }

    /// is a throw request waiting at this resumption point
    pub fn has_pending_throw(&self) -> bool {
        matches!(self.args.special, Injected::Throw(_))
    }

    /// suspend with `value`, continue at `resume_at` next time
    #[inline]
    pub fn yield_(&mut self, value: Value, resume_at: ResumeToken) -> Result<Signal, Exception> {
        Ok(Signal::Yield { value, resume_at })
    }

    /// return `value` from the body
    #[inline]
    pub fn return_(&mut self, value: Value) -> Result<Signal, Exception> {
        Ok(Signal::Return(value))
    }

    /// raise `exc`, chaining the exception being handled as its context
    pub fn raise(&mut self, mut exc: Exception) -> Result<Signal, Exception> {
        if exc.context().is_none() {
            exc.set_context(self.args.exc_state.clone());
        }
        exc.add_traceback_entry(&self.name, &self.filename, self.snapshot.lineno);
        Err(exc)
    }

    /// enter an `except` block for `exc`
    pub fn catch(&mut self, exc: Exception) {
        self.args.exc_state = Some(exc);
    }

    /// leave the `except` block
    pub fn end_catch(&mut self) {
        self.args.exc_state = None;
    }

    /// the exception being handled in this resumption
    pub fn exc_state(&self) -> Option<&Exception> {
        self.args.exc_state.as_ref()
    }

    /// positional arguments the generator was created with
    pub fn args(&self) -> &[Value] {
        self.args.bound()
    }

    /// read a local
    pub fn local(&self, idx: usize) -> Value {
        self.snapshot.locals.get(idx).cloned().unwrap_or_default()
    }

    /// write a local, growing the slot array when needed
    pub fn set_local(&mut self, idx: usize, v: Value) {
        if idx >= self.snapshot.locals.len() {
            self.snapshot.locals.resize(idx + 1, Value::None);
        }
        self.snapshot.locals[idx] = v;
    }

    /// push onto the evaluation stack
    pub fn push(&mut self, v: Value) {
        self.snapshot.stack.push(v);
    }

    /// pop from the evaluation stack
    pub fn pop(&mut self) -> Option<Value> {
        self.snapshot.stack.pop()
    }

    /// record the line being executed
    pub fn set_lineno(&mut self, lineno: u32) {
        self.snapshot.lineno = lineno;
    }

    /// current line
    pub fn lineno(&self) -> u32 {
        self.snapshot.lineno
    }

    /// the `yield from` target of this frame
    pub fn delegate(&self) -> Option<&Value> {
        self.snapshot.yield_from.as_ref()
    }

    /// start or stop delegating to a sub iterator
    pub fn set_delegate(&mut self, target: Option<Value>) {
        self.snapshot.yield_from = target;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exception::ExceptionKind;

    fn scope_parts() -> (Snapshot, Arguments) {
        (Snapshot::new(1), Arguments::new(vec![Value::Int(5)]))
    }

    #[test]
    fn test_sent_value() {
        let (mut snap, mut args) = scope_parts();
        args.special = Injected::Value(Value::Int(3));
        let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
        assert_eq!(s.sent().unwrap(), Value::Int(3));
        // consumed
        assert_eq!(s.sent().unwrap(), Value::None);
        assert_eq!(s.args(), &[Value::Int(5)]);
    }

    #[test]
    fn test_sent_throw() {
        let (mut snap, mut args) = scope_parts();
        snap.lineno = 12;
        args.special = Injected::Throw(ThrowRequest::new(Exception::value_error("boom"), false));
        let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
        assert!(s.has_pending_throw());
        let err = s.sent().unwrap_err();
        assert!(err.is(&ExceptionKind::ValueError));
        let entry = err.traceback().unwrap().last().unwrap();
        assert_eq!(entry.lineno, 12);
        assert_eq!(&*entry.name, "g");
        assert!(err.native_trace().is_none());
    }

    #[test]
    fn test_unread_throw_is_still_pending() {
        let (mut snap, mut args) = scope_parts();
        snap.lineno = 4;
        args.special = Injected::Throw(ThrowRequest::new(Exception::value_error("boom"), false));
        let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
        let err = s.take_pending_throw().unwrap();
        assert!(err.is(&ExceptionKind::ValueError));
        assert_eq!(err.traceback().unwrap().last().unwrap().lineno, 4);
        assert!(s.take_pending_throw().is_none());

        let (mut snap, mut args) = scope_parts();
        args.special = Injected::Value(Value::Int(1));
        let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
        assert!(s.take_pending_throw().is_none());
        // a sent value is left in place
        assert_eq!(s.sent().unwrap(), Value::Int(1));
    }

    #[test]
    fn test_raise_chains_context() {
        let (mut snap, mut args) = scope_parts();
        let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
        s.catch(Exception::value_error("first"));
        let err = s.raise(Exception::type_error("second")).unwrap_err();
        assert_eq!(err.context().unwrap().message(), "first");
        s.end_catch();
        assert!(s.exc_state().is_none());
    }

    #[test]
    fn test_locals_and_stack() {
        let (mut snap, mut args) = scope_parts();
        {
            let mut s = Scope::new(&mut snap, &mut args, Rc::from("g"), Rc::from("m.py"));
            s.set_local(3, Value::Int(9));
            s.push(Value::Int(1));
            assert_eq!(s.local(3), Value::Int(9));
            assert_eq!(s.local(10), Value::None);
        }
        assert_eq!(snap.locals().len(), 4);
        assert_eq!(snap.stack.len(), 1);
    }
}
