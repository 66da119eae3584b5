mod common;

use common::build_frame;
use std::panic::{AssertUnwindSafe, catch_unwind};
use withscope::{CodeLayout, Frame, Scope, ScopeError, Value};

fn s(text: &str) -> Value {
    Value::from(text)
}

fn no_bindings() -> Scope<Value> {
    Scope::new([] as [(&str, Value); 0])
}

#[test]
fn test_simple_single() {
    let mut frame = build_frame(&["a=\"tacos\"", "b=\"soup\""], &[], &[]);
    let mut scope = Scope::new([("a", s("fajita"))]);

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("fajita")));
            assert_eq!(frame.lookup("b"), Some(s("soup")));
        })
        .unwrap();

    assert_eq!(frame.lookup("a"), Some(s("tacos")));
    assert_eq!(frame.lookup("b"), Some(s("soup")));
}

#[test]
fn test_nested_let() {
    let mut frame = build_frame(&["a=\"tacos\"", "b=\"soup\"", "c=\"cake\""], &[], &[]);
    let mut outer = Scope::new([("a", s("fajita"))]);
    let mut inner = Scope::new([("c", s("bread"))]);

    outer
        .with(&mut frame, |frame| {
            inner
                .with(frame, |frame| {
                    assert_eq!(frame.lookup("a"), Some(s("fajita")));
                    assert_eq!(frame.lookup("b"), Some(s("soup")));
                    assert_eq!(frame.lookup("c"), Some(s("bread")));

                    frame.assign("c", s("cupcake")).unwrap();
                    assert_eq!(frame.lookup("c"), Some(s("cupcake")));
                })
                .unwrap();

            assert_eq!(frame.lookup("a"), Some(s("fajita")));
            assert_eq!(frame.lookup("b"), Some(s("soup")));
            assert_eq!(frame.lookup("c"), Some(s("cake")));
        })
        .unwrap();

    assert_eq!(frame.lookup("a"), Some(s("tacos")));
    assert_eq!(frame.lookup("b"), Some(s("soup")));
    assert_eq!(frame.lookup("c"), Some(s("cake")));
    assert_eq!(inner.get("c"), Some(s("cupcake")));
}

#[test]
fn test_nested_assign() {
    // Names a scope does not define are written straight through.
    let mut frame = build_frame(&["a=\"tacos\"", "b=\"soup\"", "c=\"cake\""], &[], &[]);
    let mut outer = no_bindings();
    let mut inner = no_bindings();

    outer
        .with(&mut frame, |frame| {
            frame.assign("a", s("fajita")).unwrap();
            inner
                .with(frame, |frame| {
                    assert_eq!(frame.lookup("a"), Some(s("fajita")));
                    frame.assign("b", s("stew")).unwrap();
                })
                .unwrap();
            assert_eq!(frame.lookup("a"), Some(s("fajita")));
            assert_eq!(frame.lookup("b"), Some(s("stew")));
        })
        .unwrap();

    assert_eq!(frame.lookup("a"), Some(s("fajita")));
    assert_eq!(frame.lookup("b"), Some(s("stew")));
    assert_eq!(frame.lookup("c"), Some(s("cake")));
}

#[test]
fn test_reusable_scope() {
    let mut frame = build_frame(&["a", "b", "c", "d=\"godzilla\""], &[], &[]);
    let mut scope = Scope::new([("a", s("tacos")), ("b", s("soup")), ("c", s("cake"))]);

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("tacos")));
            assert_eq!(frame.lookup("b"), Some(s("soup")));
            assert_eq!(frame.lookup("c"), Some(s("cake")));
            assert_eq!(frame.lookup("d"), Some(s("godzilla")));

            frame.assign("a", s("fajita")).unwrap();
            frame.assign("b", s("stew")).unwrap();
            frame.assign("d", s("mothra")).unwrap();
        })
        .unwrap();

    for name in ["a", "b", "c"] {
        assert_eq!(frame.local(name).unwrap(), None);
    }
    assert!(frame.globals().is_empty());
    assert_eq!(frame.lookup("d"), Some(s("mothra")));

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("fajita")));
            assert_eq!(frame.lookup("b"), Some(s("stew")));
            assert_eq!(frame.lookup("c"), Some(s("cake")));
            assert_eq!(frame.lookup("d"), Some(s("mothra")));
        })
        .unwrap();
}

/// Does what a closure body `b = a; a = new_a` would do.
fn set_a(closure: &mut Frame<Value>, new_a: Value) {
    let old = closure.lookup("a").unwrap();
    closure.assign("b", old).unwrap();
    closure.assign("a", new_a).unwrap();
}

fn closure_layout() -> CodeLayout {
    CodeLayout::new([] as [&str; 0], [] as [&str; 0], ["a", "b"])
}

#[test]
fn test_closure() {
    let mut frame = build_frame(&[], &["a=\"taco\"", "b=none"], &[]);
    let mut closure_1 = Frame::enclosed_by(closure_layout(), &frame).unwrap();

    let mut scope = Scope::new([("a", s("fajita")), ("b", Value::None)]);
    let mut closure_2 = scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("fajita")));
            let closure = Frame::enclosed_by(closure_layout(), frame).unwrap();
            assert_eq!(closure.lookup("a"), Some(s("fajita")));
            closure
        })
        .unwrap();

    assert_eq!(closure_1.lookup("a"), Some(s("taco")));
    assert_eq!(closure_1.lookup("b"), Some(Value::None));
    assert_eq!(closure_2.lookup("a"), Some(s("fajita")));
    assert_eq!(closure_2.lookup("b"), Some(Value::None));

    set_a(&mut closure_1, s("pizza"));
    set_a(&mut closure_2, s("curry"));

    assert_eq!(closure_1.lookup("a"), Some(s("pizza")));
    assert_eq!(closure_1.lookup("b"), Some(s("taco")));
    assert_eq!(closure_2.lookup("a"), Some(s("curry")));
    assert_eq!(closure_2.lookup("b"), Some(s("fajita")));

    assert_eq!(frame.lookup("a"), Some(s("pizza")));
    assert_eq!(frame.lookup("b"), Some(s("taco")));
    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("curry")));
            assert_eq!(frame.lookup("b"), Some(s("fajita")));
        })
        .unwrap();
}

#[test]
fn test_del_fast_local() {
    let mut frame = build_frame(&["a=\"taco\""], &[], &[]);
    let mut scope = Scope::new([("a", s("pizza"))]);

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("pizza")));
            frame.delete("a").unwrap();
            assert_eq!(frame.local("a").unwrap(), None);
        })
        .unwrap();
    assert_eq!(frame.lookup("a"), Some(s("taco")));

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("taco")))
        })
        .unwrap();
    assert_eq!(frame.lookup("a"), Some(s("taco")));
}

#[test]
fn test_del_global() {
    let mut frame = build_frame(&[], &[], &[]);
    let mut scope = Scope::new([("a", s("pizza"))]);

    scope
        .with(&mut frame, |frame| {
            assert_eq!(frame.lookup("a"), Some(s("pizza")));
            frame.delete("a").unwrap();
            assert_eq!(frame.lookup("a"), None);
        })
        .unwrap();

    assert_eq!(frame.lookup("a"), None);
    assert!(frame.globals().is_empty());
    assert_eq!(scope.defined().count(), 0);
}

#[test]
fn test_reenter_active_scope_fails() {
    let mut frame = build_frame(&["a"], &[], &[]);
    let mut scope = Scope::new([("a", s("pizza"))]);

    scope.enter(&mut frame).unwrap();
    let err = scope.enter(&mut frame).unwrap_err();
    assert_eq!(err, ScopeError::InUse);
    scope.exit(&mut frame).unwrap();
    assert_eq!(frame.local("a").unwrap(), None);
}

#[test]
fn test_alias_nested_on_same_frame() {
    let mut frame = build_frame(&["a=\"taco\""], &[], &[]);
    let mut scope = Scope::new([("a", s("pizza"))]);
    let mut alias = scope.alias();

    scope.enter(&mut frame).unwrap();
    alias.enter(&mut frame).unwrap();
    frame.assign("a", s("curry")).unwrap();
    alias.exit(&mut frame).unwrap();

    // The alias wrote its value back to the shared box, and the frame is
    // back to what the outer entry installed.
    assert_eq!(scope.get("a"), Some(s("curry")));
    assert_eq!(frame.lookup("a"), Some(s("pizza")));

    scope.exit(&mut frame).unwrap();
    assert_eq!(alias.get("a"), Some(s("pizza")));
    assert_eq!(frame.lookup("a"), Some(s("taco")));
}

#[test]
fn test_unwind_reverts_frame() {
    let mut frame = build_frame(&["a=\"taco\""], &["c=1"], &[]);
    let mut scope = Scope::new([("a", s("pizza")), ("c", Value::Int(2)), ("g", Value::Int(3))]);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut guard = scope.guard(&mut frame).unwrap();
        guard.assign("a", s("curry")).unwrap();
        panic!("boom");
    }));
    assert!(result.is_err());

    assert!(!scope.is_active());
    assert_eq!(scope.get("a"), Some(s("curry")));
    assert_eq!(frame.lookup("a"), Some(s("taco")));
    assert_eq!(frame.lookup("c"), Some(Value::Int(1)));
    assert!(frame.globals().is_empty());
}
