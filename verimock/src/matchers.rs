// vim: tw=80
//! Argument matchers.
//!
//! A matcher is a predicate over one [`ArgValue`].  Every matcher accepts
//! null without panicking; most simply fail to match it.  Capabilities that
//! some algorithms branch on (variadic awareness, argument capture, a
//! described type) are defaulted trait methods rather than concrete-type
//! checks, so new matcher kinds compose without touching the matching code.
//!
//! Typed matchers bridge the [`predicates`] crate: a predicate over `T` is
//! applied through a downcast, and a value that is not a `T` simply does not
//! match.

use std::{
    any::{type_name, TypeId},
    fmt,
    sync::Arc,
};

use parking_lot::RwLock;
use predicates::prelude::Predicate;
use predicates_tree::CaseTreeExt;

use crate::invocation::ArgValue;

/// A predicate over one argument value.
///
/// `matches` is total: it must return `false` (or a defined semantic) for
/// null and for values of an unexpected type, and must never panic.
pub trait ArgumentMatcher: fmt::Display + Send + Sync {
    fn matches(&self, value: &ArgValue) -> bool;

    /// Whether this matcher may be paired against a whole variadic tail, or
    /// replicated across each of its elements.
    fn is_vararg_aware(&self) -> bool {
        false
    }

    /// The capture capability: matchers that record the values they are
    /// applied to expose their sink here.
    fn capture_sink(&self) -> Option<&CaptureSink> {
        None
    }

    /// The type this matcher is declared over, when it has one.
    fn described_type(&self) -> Option<&'static str> {
        None
    }

    /// A rendered explanation of why `value` failed to match, for matchers
    /// that can produce one.
    fn find_mismatch_case(&self, _value: &ArgValue) -> Option<String> {
        None
    }
}

/// Shared handle to a matcher.
pub type MatcherRef = Arc<dyn ArgumentMatcher>;

struct AnyMatcher {
    vararg: bool,
}

impl fmt::Display for AnyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<any>")
    }
}

impl ArgumentMatcher for AnyMatcher {
    fn matches(&self, _value: &ArgValue) -> bool {
        true
    }

    fn is_vararg_aware(&self) -> bool {
        self.vararg
    }
}

/// Matches any value, including null.
pub fn any() -> MatcherRef {
    Arc::new(AnyMatcher { vararg: false })
}

/// Matches any variadic tail: the whole trailing array, or each of its
/// elements.
pub fn any_vararg() -> MatcherRef {
    Arc::new(AnyMatcher { vararg: true })
}

struct Equals {
    expected: ArgValue,
}

impl fmt::Display for Equals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expected)
    }
}

impl ArgumentMatcher for Equals {
    fn matches(&self, value: &ArgValue) -> bool {
        self.expected == *value
    }
}

/// Matches a value equal to `expected`.
pub fn eq<T>(expected: T) -> MatcherRef
    where T: PartialEq + fmt::Debug + Send + Sync + 'static
{
    eq_value(ArgValue::of(expected))
}

/// Matches a value equal to an already-captured [`ArgValue`].  Array values
/// compare elementwise, so this is also the array-equality matcher.
pub fn eq_value(expected: ArgValue) -> MatcherRef {
    Arc::new(Equals { expected })
}

struct Same {
    expected: ArgValue,
}

impl fmt::Display for Same {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "same({})", self.expected)
    }
}

impl ArgumentMatcher for Same {
    fn matches(&self, value: &ArgValue) -> bool {
        self.expected.same_instance(value)
    }
}

/// Matches exactly the given shared instance, by identity rather than
/// equality.
pub fn same<T>(expected: &Arc<T>) -> MatcherRef
    where T: PartialEq + fmt::Debug + Send + Sync + 'static
{
    Arc::new(Same { expected: ArgValue::shared(expected.clone()) })
}

struct IsA {
    id: TypeId,
    name: &'static str,
}

impl fmt::Display for IsA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "isA({})", self.name)
    }
}

impl ArgumentMatcher for IsA {
    fn matches(&self, value: &ArgValue) -> bool {
        value.type_id() == Some(self.id)
    }

    fn described_type(&self) -> Option<&'static str> {
        Some(self.name)
    }
}

/// Matches any non-null value of concrete type `T`.
pub fn is_a<T: Send + Sync + 'static>() -> MatcherRef {
    Arc::new(IsA { id: TypeId::of::<T>(), name: type_name::<T>() })
}

struct IsNull;

impl fmt::Display for IsNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("isNull()")
    }
}

impl ArgumentMatcher for IsNull {
    fn matches(&self, value: &ArgValue) -> bool {
        value.is_null()
    }
}

/// Matches only null.
pub fn is_null() -> MatcherRef {
    Arc::new(IsNull)
}

struct NotNull;

impl fmt::Display for NotNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("notNull()")
    }
}

impl ArgumentMatcher for NotNull {
    fn matches(&self, value: &ArgValue) -> bool {
        !value.is_null()
    }
}

/// Matches any non-null value.
pub fn not_null() -> MatcherRef {
    Arc::new(NotNull)
}

struct NotMatcher {
    inner: MatcherRef,
}

impl fmt::Display for NotMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not({})", self.inner)
    }
}

impl ArgumentMatcher for NotMatcher {
    fn matches(&self, value: &ArgValue) -> bool {
        !self.inner.matches(value)
    }
}

/// Negates a matcher.
pub fn not(inner: MatcherRef) -> MatcherRef {
    Arc::new(NotMatcher { inner })
}

struct AndMatcher {
    left: MatcherRef,
    right: MatcherRef,
}

impl fmt::Display for AndMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "and({}, {})", self.left, self.right)
    }
}

impl ArgumentMatcher for AndMatcher {
    fn matches(&self, value: &ArgValue) -> bool {
        self.left.matches(value) && self.right.matches(value)
    }
}

/// Matches when both matchers match.
pub fn and(left: MatcherRef, right: MatcherRef) -> MatcherRef {
    Arc::new(AndMatcher { left, right })
}

struct OrMatcher {
    left: MatcherRef,
    right: MatcherRef,
}

impl fmt::Display for OrMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "or({}, {})", self.left, self.right)
    }
}

impl ArgumentMatcher for OrMatcher {
    fn matches(&self, value: &ArgValue) -> bool {
        self.left.matches(value) || self.right.matches(value)
    }
}

/// Matches when either matcher matches.
pub fn or(left: MatcherRef, right: MatcherRef) -> MatcherRef {
    Arc::new(OrMatcher { left, right })
}

/// Bridge from a typed predicate to a type-erased matcher.  A value that
/// does not downcast to `T` does not match.
struct Pred<T> {
    pred: Box<dyn Predicate<T> + Send + Sync>,
    label: Option<String>,
}

impl<T> fmt::Display for Pred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => f.write_str(label),
            None => write!(f, "{}", self.pred),
        }
    }
}

impl<T: Send + Sync + 'static> ArgumentMatcher for Pred<T> {
    fn matches(&self, value: &ArgValue) -> bool {
        value.downcast_ref::<T>().is_some_and(|v| self.pred.eval(v))
    }

    fn described_type(&self) -> Option<&'static str> {
        Some(type_name::<T>())
    }

    fn find_mismatch_case(&self, value: &ArgValue) -> Option<String> {
        let v = value.downcast_ref::<T>()?;
        self.pred.find_case(false, v).map(|case| case.tree().to_string())
    }
}

/// Wrap any [`Predicate`] over `T` as an argument matcher.
pub fn from_predicate<T, P>(pred: P) -> MatcherRef
    where T: Send + Sync + 'static,
          P: Predicate<T> + Send + Sync + 'static
{
    Arc::new(Pred::<T> { pred: Box::new(pred), label: None })
}

fn labeled<T, P>(pred: P, label: String) -> MatcherRef
    where T: Send + Sync + 'static,
          P: Predicate<T> + Send + Sync + 'static
{
    Arc::new(Pred::<T> { pred: Box::new(pred), label: Some(label) })
}

/// Matches values strictly greater than `expected`.
pub fn gt<T>(expected: T) -> MatcherRef
    where T: PartialOrd + fmt::Debug + Send + Sync + 'static
{
    let label = format!("gt({expected:?})");
    labeled::<T, _>(predicates::ord::gt(expected), label)
}

/// Matches values greater than or equal to `expected`.
pub fn geq<T>(expected: T) -> MatcherRef
    where T: PartialOrd + fmt::Debug + Send + Sync + 'static
{
    let label = format!("geq({expected:?})");
    labeled::<T, _>(predicates::ord::ge(expected), label)
}

/// Matches values strictly less than `expected`.
pub fn lt<T>(expected: T) -> MatcherRef
    where T: PartialOrd + fmt::Debug + Send + Sync + 'static
{
    let label = format!("lt({expected:?})");
    labeled::<T, _>(predicates::ord::lt(expected), label)
}

/// Matches values less than or equal to `expected`.
pub fn leq<T>(expected: T) -> MatcherRef
    where T: PartialOrd + fmt::Debug + Send + Sync + 'static
{
    let label = format!("leq({expected:?})");
    labeled::<T, _>(predicates::ord::le(expected), label)
}

/// Matches by an arbitrary function over the concrete argument type.
pub fn arg_that<T, F>(f: F) -> MatcherRef
    where T: Send + Sync + 'static,
          F: Fn(&T) -> bool + Send + Sync + 'static
{
    labeled::<T, _>(
        predicates::function::function(f),
        "<custom argument matcher>".to_owned(),
    )
}

/// Bridge from a predicate over `str` to a matcher over string values.
struct StrPred {
    pred: Box<dyn Predicate<str> + Send + Sync>,
    label: String,
}

impl fmt::Display for StrPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl StrPred {
    fn as_str<'a>(value: &'a ArgValue) -> Option<&'a str> {
        if let Some(s) = value.downcast_ref::<String>() {
            Some(s)
        } else {
            value.downcast_ref::<&'static str>().copied()
        }
    }
}

impl ArgumentMatcher for StrPred {
    fn matches(&self, value: &ArgValue) -> bool {
        Self::as_str(value).is_some_and(|s| self.pred.eval(s))
    }

    fn described_type(&self) -> Option<&'static str> {
        Some("str")
    }

    fn find_mismatch_case(&self, value: &ArgValue) -> Option<String> {
        let s = Self::as_str(value)?;
        self.pred.find_case(false, s).map(|case| case.tree().to_string())
    }
}

/// Wrap any [`Predicate`] over `str` as a matcher over string values.
pub fn from_str_predicate<P>(pred: P) -> MatcherRef
    where P: Predicate<str> + Send + Sync + 'static
{
    let label = pred.to_string();
    Arc::new(StrPred { pred: Box::new(pred), label })
}

/// Matches string values against a regular expression.
///
/// # Panics
/// Panics if `pattern` is not a valid regular expression.
pub fn matches_pattern(pattern: &str) -> MatcherRef {
    let pred = match predicates::str::is_match(pattern) {
        Ok(pred) => pred,
        Err(e) => panic!("invalid regex {pattern:?}: {e}"),
    };
    Arc::new(StrPred {
        pred: Box::new(pred),
        label: format!("matches({pattern:?})"),
    })
}

/// Matches string values containing `substring`.
pub fn contains(substring: &str) -> MatcherRef {
    Arc::new(StrPred {
        pred: Box::new(predicates::str::contains(substring)),
        label: format!("contains({substring:?})"),
    })
}

/// Matches string values starting with `prefix`.
pub fn starts_with(prefix: &str) -> MatcherRef {
    Arc::new(StrPred {
        pred: Box::new(predicates::str::starts_with(prefix)),
        label: format!("startsWith({prefix:?})"),
    })
}

/// Matches string values ending with `suffix`.
pub fn ends_with(suffix: &str) -> MatcherRef {
    Arc::new(StrPred {
        pred: Box::new(predicates::str::ends_with(suffix)),
        label: format!("endsWith({suffix:?})"),
    })
}

/// Accumulates the values a capturing matcher was applied to.
///
/// Captures may arrive while other threads are still invoking the mock, so
/// the list is guarded by a read/write lock: `push` takes the write half,
/// the accessors snapshot under the read half.
pub struct CaptureSink {
    values: RwLock<Vec<ArgValue>>,
}

impl CaptureSink {
    fn new() -> Self {
        CaptureSink { values: RwLock::new(Vec::new()) }
    }

    pub fn push(&self, value: ArgValue) {
        self.values.write().push(value);
    }

    /// Snapshot of every captured value, in capture order.
    pub fn all(&self) -> Vec<ArgValue> {
        self.values.read().clone()
    }

    pub fn last(&self) -> Option<ArgValue> {
        self.values.read().last().cloned()
    }
}

struct CapturingMatcher {
    sink: Arc<CaptureSink>,
}

impl fmt::Display for CapturingMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Capturing argument>")
    }
}

impl ArgumentMatcher for CapturingMatcher {
    fn matches(&self, _value: &ArgValue) -> bool {
        true
    }

    // Replicated across variadic elements, so a captor on a variadic
    // parameter captures each element.
    fn is_vararg_aware(&self) -> bool {
        true
    }

    fn capture_sink(&self) -> Option<&CaptureSink> {
        Some(&self.sink)
    }
}

/// Captures argument values during verification.
///
/// The captor's matcher matches anything; once a checker has confirmed its
/// count decision, the values of the verified invocations are replayed into
/// the captor in sequence order.
///
/// # Examples
/// ```
/// use verimock::matchers::ArgumentCaptor;
///
/// let captor = ArgumentCaptor::new();
/// let matcher = captor.matcher();
/// // ... pass `matcher` to an InvocationMatcher, run a verification ...
/// assert!(captor.all_values().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ArgumentCaptor {
    sink: Arc<CaptureSink>,
}

impl ArgumentCaptor {
    pub fn new() -> Self {
        ArgumentCaptor { sink: Arc::new(CaptureSink::new()) }
    }

    /// The capturing matcher feeding this captor.
    pub fn matcher(&self) -> MatcherRef {
        Arc::new(CapturingMatcher { sink: self.sink.clone() })
    }

    /// Every captured value in capture order, as a snapshot copy.
    pub fn all_values(&self) -> Vec<ArgValue> {
        self.sink.all()
    }

    /// The most recently captured value.
    ///
    /// # Panics
    /// Panics if nothing was captured, which usually means the captor's
    /// matcher was not part of a successful verification.
    pub fn last_value(&self) -> ArgValue {
        match self.sink.last() {
            Some(value) => value,
            None => panic!("No argument value was captured!"),
        }
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}
