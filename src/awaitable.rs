//! # awaitable
//!
//! turn the operand of `await` into something the engine can pull from
//!

use crate::exception::{Exception, ExceptionKind};
use crate::value::Value;

fn not_awaitable(type_name: &str) -> Exception {
    Exception::new(
        ExceptionKind::TypeError,
        format!("object {type_name} can't be used in 'await' expression"),
    )
}

// coroutines are never acceptable as the result of `__await__`
fn is_coroutine(v: &Value) -> bool {
    v.as_generator().map_or(false, |g| g.is_coroutine())
}

/// `GetAwaitable`
///
/// a coroutine is returned as is; any other object has to provide
/// `__await__` returning an iterator which is not itself a coroutine
pub fn get_awaitable_iter(obj: &Value) -> Result<Value, Exception> {
    match obj {
        Value::Generator(g) if g.is_coroutine() => Ok(obj.clone()),
        Value::Generator(g) => Err(not_awaitable(g.kind().type_name())),
        Value::Object(o) => {
            let res = match o.await_() {
                Some(res) => res?,
                None => return Err(not_awaitable(o.type_name())),
            };
            if is_coroutine(&res) {
                return Err(Exception::type_error("__await__() returned a coroutine"));
            }
            let is_iter = match &res {
                Value::Generator(g) => !g.is_async_gen(),
                Value::Object(it) => it.is_iterator(),
                _ => false,
            };
            if !is_iter {
                return Err(Exception::new(
                    ExceptionKind::TypeError,
                    format!(
                        "__await__() returned non-iterator of type '{}'",
                        res.type_name()
                    ),
                ));
            }
            Ok(res)
        }
        other => Err(not_awaitable(other.type_name())),
    }
}
