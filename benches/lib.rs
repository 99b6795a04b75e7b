#![feature(test)]
extern crate test;
extern crate yieldpoint;

use std::rc::Rc;
use test::Bencher;
use yieldpoint::*;

fn counter() -> Rc<dyn Code> {
    Rc::new(FnCode::new("counter", |at, s| {
        s.sent()?;
        let n = at.yield_index().map_or(0, |i| i + 1);
        s.yield_(Value::Int(n as i64), ResumeToken::yield_point(0))
    }))
}

#[bench]
fn yield_bench(b: &mut Bencher) {
    b.iter(|| {
        let g = Gn::generator(counter(), vec![]);
        for _ in 0..1000 {
            test::black_box(g.next().unwrap());
        }
    });
}

#[bench]
fn single_yield_bench(b: &mut Bencher) {
    let g = Gn::generator(counter(), vec![]);
    g.next().unwrap();
    b.iter(|| {
        let v = g.send(Value::None).unwrap();
        test::black_box(v);
    });
}

#[bench]
fn create_gen(b: &mut Bencher) {
    let code = counter();
    b.iter(|| {
        let g = Gn::generator(code.clone(), vec![]);
        test::black_box(g);
    });
}

#[bench]
fn throw_into_suspended(b: &mut Bencher) {
    let code: Rc<dyn Code> = Rc::new(FnCode::new("catcher", |_, s| {
        if let Err(e) = s.sent() {
            s.catch(e);
        }
        s.yield_(Value::None, ResumeToken::yield_point(0))
    }));
    let g = Gn::generator(code, vec![]);
    g.next().unwrap();
    b.iter(|| {
        let v = g.throw_exception(Exception::value_error("x")).unwrap();
        test::black_box(v);
    });
}

#[bench]
fn close_suspended(b: &mut Bencher) {
    let code = counter();
    b.iter(|| {
        let g = Gn::generator(code.clone(), vec![]);
        g.next().unwrap();
        g.close().unwrap();
    });
}
