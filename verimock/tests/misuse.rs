// vim: tw=80
//! API misuse fails fast, before any verification side effect.

use verimock::{
    at_most, calls, matchers, never, only, times, times_range, verify,
    InOrder, InvocationBuilder, InvocationMatcher, MethodSignature, Mock,
    MockingSession, ParamType, UsageError,
};

fn sig(name: &str) -> MethodSignature {
    MethodSignature::new(
        name,
        vec![ParamType::of::<i32>()],
        ParamType::of::<()>(),
    )
}

fn call(mock: &Mock, name: &str, arg: i32) {
    mock.record(InvocationBuilder::new(mock, sig(name)).arg(arg));
}

fn wanted(mock: &Mock, name: &str, arg: i32) -> InvocationMatcher {
    InvocationMatcher::from_template(
        InvocationBuilder::new(mock, sig(name)).arg(arg).template(),
    )
}

fn usage(err: verimock::Error) -> UsageError {
    match err {
        verimock::Error::Usage(u) => u,
        other => panic!("expected usage error, got {other:?}"),
    }
}

#[test]
fn mismatched_matcher_count_is_rejected_at_construction() {
    let session = MockingSession::new();
    let m = session.mock("m");
    let two_args = MethodSignature::new(
        "f",
        vec![ParamType::of::<i32>(), ParamType::of::<i32>()],
        ParamType::of::<()>(),
    );
    let err = InvocationMatcher::new(
        InvocationBuilder::new(&m, two_args).arg(1).arg(2).template(),
        vec![matchers::eq(1)],
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Invalid use of argument matchers!"));
    assert!(message.contains("2 matchers expected, 1 recorded:"));
    assert!(message.contains(
        "When using matchers, all arguments have to be provided by matchers.",
    ));
}

#[test]
fn calls_outside_in_order_is_rejected() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let err = usage(verify(&m, &wanted(&m, "f", 1), calls(1)).unwrap_err());
    assert!(matches!(err, UsageError::CallsRequiresInOrder));
    assert_eq!(
        err.to_string(),
        "calls is only intended to work with InOrder",
    );
    // Nothing was marked by the failed attempt.
    assert!(m.invocations().iter().all(|i| !i.is_verified()));
}

#[test]
fn zero_calls_is_rejected() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let mut in_order = InOrder::new([m.clone()]);
    let err = usage(in_order.verify(&wanted(&m, "f", 1), calls(0)).unwrap_err());
    assert!(matches!(err, UsageError::NonPositiveCalls));
    assert_eq!(
        err.to_string(),
        "Negative and zero values are not allowed here",
    );
}

#[test]
fn at_most_is_rejected_in_order() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let mut in_order = InOrder::new([m.clone()]);
    let err =
        usage(in_order.verify(&wanted(&m, "f", 1), at_most(1)).unwrap_err());
    assert_eq!(
        err.to_string(),
        "AtMost is not implemented to work with InOrder",
    );
}

#[test]
fn never_is_rejected_in_order() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let mut in_order = InOrder::new([m.clone()]);
    let err =
        usage(in_order.verify(&wanted(&m, "f", 1), never()).unwrap_err());
    assert_eq!(
        err.to_string(),
        "Never is not implemented to work with InOrder",
    );
}

#[test]
fn only_is_rejected_in_order() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let mut in_order = InOrder::new([m.clone()]);
    let err =
        usage(in_order.verify(&wanted(&m, "f", 1), only()).unwrap_err());
    assert_eq!(
        err.to_string(),
        "Only is not implemented to work with InOrder",
    );
}

#[test]
fn descending_range_is_rejected() {
    let session = MockingSession::new();
    let m = session.mock("m");
    call(&m, "f", 1);
    let err =
        usage(verify(&m, &wanted(&m, "f", 1), times_range(3..=1)).unwrap_err());
    assert!(matches!(err, UsageError::InvalidRange { min: 3, max: 1 }));
}

#[test]
fn unfamiliar_mock_is_rejected_in_order() {
    let session = MockingSession::new();
    let a = session.mock("a");
    let b = session.mock("b");
    call(&a, "f", 1);
    call(&b, "f", 1);
    let mut in_order = InOrder::new([a.clone()]);
    let err =
        usage(in_order.verify(&wanted(&b, "f", 1), times(1)).unwrap_err());
    assert!(err.to_string().contains(
        "InOrder can only verify mocks that were passed in during creation \
         of InOrder.",
    ));
}
