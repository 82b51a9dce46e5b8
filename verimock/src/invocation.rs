// vim: tw=80
//! Invocation records and the value/signature types captured with them.

use std::{
    any,
    any::TypeId,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use downcast::{downcast, Any};

use crate::session::Mock;

/// Object-safe storage for a type-erased argument value.
pub trait ArgAny: Any + Send + Sync {}
downcast!(dyn ArgAny);

impl<T: Any + Send + Sync> ArgAny for T {}

fn eq_thunk<T>(a: &dyn ArgAny, b: &dyn ArgAny) -> bool
    where T: PartialEq + Send + Sync + 'static
{
    match (a.downcast_ref::<T>().ok(), b.downcast_ref::<T>().ok()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[derive(Clone)]
struct Scalar {
    value: Arc<dyn ArgAny>,
    type_id: TypeId,
    type_name: &'static str,
    /// `Debug` rendering captured at construction, so diagnostics never need
    /// the concrete type again.
    rendered: String,
    eq: fn(&dyn ArgAny, &dyn ArgAny) -> bool,
}

#[derive(Clone)]
enum Repr {
    Null,
    Scalar(Scalar),
    Array(Vec<ArgValue>),
}

/// A type-erased argument value.
///
/// Values are captured by the interception layer at call time.  `Null` is a
/// legal value that every matcher must accept without panicking; `Array`
/// carries an uncollapsed variadic tail and compares elementwise.
///
/// # Examples
/// ```
/// use verimock::ArgValue;
///
/// assert_eq!(ArgValue::of(42u32), ArgValue::of(42u32));
/// assert_ne!(ArgValue::of(42u32), ArgValue::of(42i64));
/// assert_eq!(ArgValue::null(), ArgValue::null());
/// ```
#[derive(Clone)]
pub struct ArgValue(Repr);

impl ArgValue {
    /// Capture an owned value.
    pub fn of<T>(value: T) -> Self
        where T: PartialEq + fmt::Debug + Send + Sync + 'static
    {
        let rendered = format!("{value:?}");
        ArgValue(Repr::Scalar(Scalar {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            rendered,
            eq: eq_thunk::<T>,
        }))
    }

    /// Capture a shared value without copying it.  Two `ArgValue`s built from
    /// clones of the same `Arc` are the same instance for the identity
    /// matcher.
    pub fn shared<T>(value: Arc<T>) -> Self
        where T: PartialEq + fmt::Debug + Send + Sync + 'static
    {
        let rendered = format!("{:?}", &*value);
        ArgValue(Repr::Scalar(Scalar {
            value,
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            rendered,
            eq: eq_thunk::<T>,
        }))
    }

    /// The null value.
    pub fn null() -> Self {
        ArgValue(Repr::Null)
    }

    /// An array value, used for the uncollapsed tail of a variadic call.
    pub fn array<I: IntoIterator<Item = ArgValue>>(values: I) -> Self {
        ArgValue(Repr::Array(values.into_iter().collect()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0, Repr::Null)
    }

    pub fn as_array(&self) -> Option<&[ArgValue]> {
        match &self.0 {
            Repr::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Recover the concrete value, if this is a scalar of type `T`.
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        match &self.0 {
            Repr::Scalar(s) => s.value.downcast_ref::<T>().ok(),
            _ => None,
        }
    }

    /// The concrete type of a scalar value.
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.0 {
            Repr::Scalar(s) => Some(s.type_id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> Option<&'static str> {
        match &self.0 {
            Repr::Scalar(s) => Some(s.type_name),
            _ => None,
        }
    }

    /// Pointer identity, for the `same` matcher.  Nulls are identical to each
    /// other; arrays and values captured by copy never are.
    pub fn same_instance(&self, other: &ArgValue) -> bool {
        match (&self.0, &other.0) {
            (Repr::Null, Repr::Null) => true,
            (Repr::Scalar(a), Repr::Scalar(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Repr::Null, Repr::Null) => true,
            (Repr::Scalar(a), Repr::Scalar(b)) => {
                a.type_id == b.type_id && (a.eq)(&*a.value, &*b.value)
            },
            (Repr::Array(a), Repr::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Null => write!(f, "null"),
            Repr::Scalar(s) => f.write_str(&s.rendered),
            Repr::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            },
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One parameter (or return) type of a method signature, compared
/// structurally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamType {
    name: &'static str,
    id: TypeId,
}

impl ParamType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        ParamType {
            name: any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A method signature captured as a plain value at interception time.
///
/// Signatures compare structurally.  [`MethodSignature::same_method`] uses
/// only the name and the ordered parameter-type list, because the recorded
/// and the wanted call may have been captured through different synthetic
/// entry points for the same call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    name: Arc<str>,
    params: Arc<[ParamType]>,
    ret: ParamType,
    varargs: bool,
}

impl MethodSignature {
    pub fn new(name: &str, params: Vec<ParamType>, ret: ParamType) -> Self {
        MethodSignature {
            name: Arc::from(name),
            params: params.into(),
            ret,
            varargs: false,
        }
    }

    /// A signature whose final parameter is a variadic tail.
    pub fn new_varargs(name: &str, params: Vec<ParamType>, ret: ParamType)
        -> Self
    {
        MethodSignature {
            name: Arc::from(name),
            params: params.into(),
            ret,
            varargs: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_types(&self) -> &[ParamType] {
        &self.params
    }

    pub fn return_type(&self) -> ParamType {
        self.ret
    }

    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    /// Same method name and same ordered parameter-type list.
    pub fn same_method(&self, other: &MethodSignature) -> bool {
        self.name == other.name && self.params == other.params
    }
}

/// A source location, rendered in diagnostics the way the reporter expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    file: &'static str,
    line: u32,
}

impl Location {
    /// Capture the caller's location.
    #[track_caller]
    pub fn capture() -> Self {
        let caller = core::panic::Location::caller();
        Location {
            file: caller.file(),
            line: caller.line(),
        }
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-> at {}:{}", self.file, self.line)
    }
}

/// Record of a stubbing rule having matched an invocation, set by the
/// stubbing layer through [`Invocation::mark_stubbed`].
#[derive(Clone, Copy, Debug)]
pub struct StubInfo {
    stubbed_at: Location,
}

impl StubInfo {
    pub fn new(stubbed_at: Location) -> Self {
        StubInfo { stubbed_at }
    }

    pub fn stubbed_at(&self) -> Location {
        self.stubbed_at
    }
}

/// If the call is variadic and its trailing raw argument is an array, splice
/// the array's elements in its place.  A trailing null is not an array.
fn expand_varargs(method: &MethodSignature, raw: &[ArgValue]) -> Vec<ArgValue> {
    if !method.is_varargs() {
        return raw.to_vec();
    }
    match raw.split_last() {
        Some((tail, head)) if tail.as_array().is_some() => {
            let mut expanded = head.to_vec();
            expanded.extend_from_slice(tail.as_array().unwrap());
            expanded
        },
        _ => raw.to_vec(),
    }
}

/// One intercepted method call on a mock.
///
/// Immutable after creation, apart from the verification-state flags.  The
/// sequence number is assigned from the owning session's counter and is
/// globally unique across all of the session's mocks, giving a strict total
/// order usable for cross-mock ordered verification.
pub struct Invocation {
    mock_id: u64,
    mock_name: Arc<str>,
    method: MethodSignature,
    sequence_number: u64,
    raw_arguments: Vec<ArgValue>,
    arguments: Vec<ArgValue>,
    location: Location,
    verified: AtomicBool,
    ignored_for_verification: AtomicBool,
    stub_info: OnceLock<StubInfo>,
}

impl Invocation {
    fn new(
        mock_id: u64,
        mock_name: Arc<str>,
        method: MethodSignature,
        sequence_number: u64,
        raw_arguments: Vec<ArgValue>,
        location: Location,
    ) -> Self {
        let arguments = expand_varargs(&method, &raw_arguments);
        Invocation {
            mock_id,
            mock_name,
            method,
            sequence_number,
            raw_arguments,
            arguments,
            location,
            verified: AtomicBool::new(false),
            ignored_for_verification: AtomicBool::new(false),
            stub_info: OnceLock::new(),
        }
    }

    pub fn mock_id(&self) -> u64 {
        self.mock_id
    }

    pub fn mock_name(&self) -> &str {
        &self.mock_name
    }

    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// The arguments exactly as passed, variadic tail uncollapsed.
    pub fn raw_arguments(&self) -> &[ArgValue] {
        &self.raw_arguments
    }

    /// The variadic-expanded arguments.
    pub fn arguments(&self) -> &[ArgValue] {
        &self.arguments
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub fn mark_ignored_for_verification(&self) {
        self.ignored_for_verification.store(true, Ordering::Release);
    }

    pub fn is_ignored_for_verification(&self) -> bool {
        self.ignored_for_verification.load(Ordering::Acquire)
    }

    /// Record that a stubbing rule matched this call.  The first stubbing
    /// wins; later calls are no-ops.
    pub fn mark_stubbed(&self, info: StubInfo) {
        let _ = self.stub_info.set(info);
    }

    pub fn stub_info(&self) -> Option<&StubInfo> {
        self.stub_info.get()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.mock_name, self.method.name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} #{}", self.sequence_number)
    }
}

/// Assembles an [`Invocation`] for recording, or a wanted-call template for
/// an [`InvocationMatcher`](crate::InvocationMatcher).
///
/// # Examples
/// ```
/// use verimock::{ArgValue, InvocationBuilder, MethodSignature, MockingSession, ParamType};
///
/// let session = MockingSession::new();
/// let mock = session.mock("translator");
/// let sig = MethodSignature::new(
///     "translate",
///     vec![ParamType::of::<String>()],
///     ParamType::of::<String>(),
/// );
/// let call = mock.record(
///     InvocationBuilder::new(&mock, sig).arg("hello".to_string()),
/// );
/// assert_eq!(call.sequence_number(), 1);
/// ```
#[must_use = "a builder does nothing until recorded or turned into a template"]
pub struct InvocationBuilder {
    mock_id: u64,
    mock_name: Arc<str>,
    method: MethodSignature,
    arguments: Vec<ArgValue>,
    location: Location,
}

impl InvocationBuilder {
    /// Start a builder for a call on `mock`.  Captures the caller's location
    /// as the call site; use [`InvocationBuilder::location`] to override.
    #[track_caller]
    pub fn new(mock: &Mock, method: MethodSignature) -> Self {
        InvocationBuilder {
            mock_id: mock.id(),
            mock_name: mock.name_arc(),
            method,
            arguments: Vec::new(),
            location: Location::capture(),
        }
    }

    /// Append an argument value, capturing it on the spot.
    pub fn arg<T>(mut self, value: T) -> Self
        where T: PartialEq + fmt::Debug + Send + Sync + 'static
    {
        self.arguments.push(ArgValue::of(value));
        self
    }

    /// Append an already-captured argument value.
    pub fn value(mut self, value: ArgValue) -> Self {
        self.arguments.push(value);
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub(crate) fn build(self, sequence_number: u64) -> Invocation {
        Invocation::new(
            self.mock_id,
            self.mock_name,
            self.method,
            sequence_number,
            self.arguments,
            self.location,
        )
    }

    /// Build a wanted-call template.  Templates carry sequence number zero;
    /// they are never part of any mock's history.
    pub fn template(self) -> Invocation {
        self.build(0)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::session::MockingSession;

    fn sig(name: &str, varargs: bool) -> MethodSignature {
        let params = vec![ParamType::of::<String>(), ParamType::of::<i32>()];
        if varargs {
            MethodSignature::new_varargs(name, params, ParamType::of::<()>())
        } else {
            MethodSignature::new(name, params, ParamType::of::<()>())
        }
    }

    #[test]
    fn expands_trailing_array() {
        let session = MockingSession::new();
        let mock = session.mock("m");
        let call = mock.record(
            InvocationBuilder::new(&mock, sig("f", true))
                .arg("x".to_string())
                .value(ArgValue::array([ArgValue::of(1), ArgValue::of(2)])),
        );
        assert_eq!(call.raw_arguments().len(), 2);
        assert_eq!(call.arguments().len(), 3);
        assert_eq!(call.arguments()[1], ArgValue::of(1));
    }

    #[test]
    fn empty_vararg_tail_contributes_nothing() {
        let session = MockingSession::new();
        let mock = session.mock("m");
        let call = mock.record(
            InvocationBuilder::new(&mock, sig("f", true))
                .arg("x".to_string())
                .value(ArgValue::array([])),
        );
        assert_eq!(call.raw_arguments().len(), 2);
        assert_eq!(call.arguments().len(), 1);
    }

    #[test]
    fn null_vararg_tail_is_not_expanded() {
        let session = MockingSession::new();
        let mock = session.mock("m");
        let call = mock.record(
            InvocationBuilder::new(&mock, sig("f", true))
                .arg("x".to_string())
                .value(ArgValue::null()),
        );
        assert_eq!(call.arguments().len(), 2);
        assert!(call.arguments()[1].is_null());
    }

    #[test]
    fn non_vararg_arguments_pass_through() {
        let session = MockingSession::new();
        let mock = session.mock("m");
        let call = mock.record(
            InvocationBuilder::new(&mock, sig("f", false))
                .arg("x".to_string())
                .arg(7),
        );
        assert_eq!(call.raw_arguments(), call.arguments());
    }

    #[test]
    fn scalar_equality_is_typed() {
        assert_eq!(ArgValue::of("a".to_string()), ArgValue::of("a".to_string()));
        assert_ne!(ArgValue::of("a".to_string()), ArgValue::of("b".to_string()));
        assert_ne!(ArgValue::of(1u8), ArgValue::of(1u16));
        assert_ne!(ArgValue::of(1u8), ArgValue::null());
    }

    #[test]
    fn array_equality_is_elementwise() {
        let a = ArgValue::array([ArgValue::of(1), ArgValue::of(2)]);
        let b = ArgValue::array([ArgValue::of(1), ArgValue::of(2)]);
        let c = ArgValue::array([ArgValue::of(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn same_instance_tracks_shared_values() {
        let value = Arc::new("shared".to_string());
        let a = ArgValue::shared(value.clone());
        let b = ArgValue::shared(value);
        let c = ArgValue::of("shared".to_string());
        assert!(a.same_instance(&b));
        assert!(!a.same_instance(&c));
        assert_eq!(a, c);
    }

    #[test]
    fn renders_like_the_reporter_expects() {
        let v = ArgValue::of("arg".to_string());
        assert_eq!(v.to_string(), "\"arg\"");
        assert_eq!(ArgValue::null().to_string(), "null");
        let arr = ArgValue::array([ArgValue::of(1), ArgValue::of(2)]);
        assert_eq!(arr.to_string(), "[1, 2]");
    }
}
