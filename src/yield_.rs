//! # yield
//!
//! `yield from` delegation
//!
//! a delegating body parks the sub iterator in its scope and calls
//! `yield_from` every time it is resumed at the delegation point, until
//! the sub iterator is exhausted
//!

use crate::exception::{Exception, ExceptionKind};
use crate::scope::Scope;
use crate::value::Value;

/// result of one delegation step
#[derive(Debug, Clone)]
pub enum Step {
    /// the sub iterator produced a value, yield it and come back here
    Yielded(Value),
    /// the sub iterator finished with this value
    Done(Value),
}

/// start delegating to `target`
pub fn delegate_to(scope: &mut Scope<'_>, target: Value) {
    scope.set_delegate(Some(target));
}

/// run one step of `yield from`
///
/// forwards the sent value, or the thrown exception, to the current
/// delegation target; `GeneratorExit` closes the target and is raised again
pub fn yield_from(scope: &mut Scope<'_>) -> Result<Step, Exception> {
    let target = match scope.delegate() {
        Some(t) => t.clone(),
        None => {
            error!("yield from run without a delegation target");
            return Err(Exception::runtime_error("no delegation target"));
        }
    };

    let ret = match scope.sent() {
        Ok(v) => send_to(&target, v),
        Err(exc) => throw_to(&target, exc),
    };

    match ret {
        Ok(v) => Ok(Step::Yielded(v)),
        Err(e) if e.is(&ExceptionKind::StopIteration) => {
            scope.set_delegate(None);
            Ok(Step::Done(e.value()))
        }
        Err(e) => {
            scope.set_delegate(None);
            Err(e)
        }
    }
}

fn send_to(target: &Value, v: Value) -> Result<Value, Exception> {
    match target {
        Value::Generator(g) => g.send(v),
        Value::Object(o) if o.is_iterator() => {
            if v.is_none() {
                o.next()
            } else {
                Err(Exception::new(
                    ExceptionKind::TypeError,
                    format!("'{}' object has no attribute 'send'", o.type_name()),
                ))
            }
        }
        other => Err(Exception::new(
            ExceptionKind::TypeError,
            format!("'{}' object is not an iterator", other.type_name()),
        )),
    }
}

fn throw_to(target: &Value, exc: Exception) -> Result<Value, Exception> {
    if exc.is(&ExceptionKind::GeneratorExit) {
        match target {
            Value::Generator(g) => g.close()?,
            Value::Object(o) => {
                o.close()?;
            }
            _ => {}
        }
        return Err(exc);
    }
    match target {
        Value::Generator(g) => g.throw_exception(exc),
        _ => Err(exc),
    }
}
