// vim: tw=80
//! Pairing matchers with arguments, and the wanted-invocation matcher.

use std::{fmt, sync::Arc};

use crate::{
    error::UsageError,
    invocation::{ArgValue, Invocation},
    matchers::{self, ArgumentMatcher, MatcherRef},
    reporter,
};

/// How a matcher list pairs with a recorded call's arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatcherApplication {
    /// One matcher per expanded argument.
    OneMatcherPerArgument,
    /// One matcher per raw argument, with the trailing vararg-aware matcher
    /// logically replicated across each expanded variadic element.
    MatchEachVarargWithLastMatcher,
    /// The counts fit neither way; no matcher may be applied.
    Unsupported,
}

/// Classify how `matchers` pair with the arguments of `invocation`.
pub fn matcher_application_for(
    invocation: &Invocation,
    matchers: &[MatcherRef],
) -> MatcherApplication {
    if invocation.arguments().len() == matchers.len() {
        return MatcherApplication::OneMatcherPerArgument;
    }
    if invocation.method().is_varargs()
        && invocation.raw_arguments().len() == matchers.len()
        && matchers.last().is_some_and(|m| m.is_vararg_aware())
    {
        return MatcherApplication::MatchEachVarargWithLastMatcher;
    }
    MatcherApplication::Unsupported
}

/// Apply `action` to every (matcher, expanded-argument) pair in order.
///
/// Returns `false` without applying anything when the matcher count is
/// unsupported, and short-circuits on the first `action` that returns
/// `false`.  Used both for yes/no matching and for capture replay.
pub fn for_each_matcher_and_argument<F>(
    invocation: &Invocation,
    matchers: &[MatcherRef],
    mut action: F,
) -> bool
    where F: FnMut(&dyn ArgumentMatcher, &ArgValue) -> bool
{
    let application = matcher_application_for(invocation, matchers);
    if application == MatcherApplication::Unsupported {
        return false;
    }
    for (i, argument) in invocation.arguments().iter().enumerate() {
        let matcher = match application {
            MatcherApplication::OneMatcherPerArgument => &matchers[i],
            MatcherApplication::MatchEachVarargWithLastMatcher => {
                &matchers[i.min(matchers.len() - 1)]
            },
            MatcherApplication::Unsupported => unreachable!(),
        };
        if !action(&**matcher, argument) {
            return false;
        }
    }
    true
}

/// A wanted invocation: the template call plus its argument matchers.
///
/// When no matchers are supplied, one equality matcher is synthesized per
/// expanded argument of the template, so raw values and matchers give the
/// same matching behavior.
///
/// # Examples
/// ```
/// use verimock::{matchers, InvocationBuilder, InvocationMatcher,
///                MethodSignature, MockingSession, ParamType};
///
/// let session = MockingSession::new();
/// let mock = session.mock("calc");
/// let sig = MethodSignature::new(
///     "add", vec![ParamType::of::<i32>()], ParamType::of::<i32>(),
/// );
/// let recorded = mock.record(
///     InvocationBuilder::new(&mock, sig.clone()).arg(2i32),
/// );
/// let wanted = InvocationMatcher::new(
///     InvocationBuilder::new(&mock, sig).arg(0i32).template(),
///     vec![matchers::gt(1i32)],
/// ).unwrap();
/// assert!(wanted.matches(&recorded));
/// ```
pub struct InvocationMatcher {
    invocation: Arc<Invocation>,
    matchers: Vec<MatcherRef>,
}

impl fmt::Debug for InvocationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationMatcher")
            .field("invocation", &self.invocation)
            .field(
                "matchers",
                &self
                    .matchers
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl InvocationMatcher {
    /// Bind matchers to a wanted template.
    ///
    /// Fails fast with the invalid-matchers usage error when the matcher
    /// count fits neither the template's expanded-argument count nor its raw
    /// count with a trailing vararg-aware matcher.
    pub fn new(
        invocation: Invocation,
        matchers: Vec<MatcherRef>,
    ) -> Result<Self, UsageError> {
        if matchers.is_empty() {
            return Ok(Self::from_template(invocation));
        }
        let fits = invocation.arguments().len() == matchers.len()
            || (invocation.method().is_varargs()
                && invocation.raw_arguments().len() == matchers.len()
                && matchers.last().is_some_and(|m| m.is_vararg_aware()));
        if !fits {
            return Err(reporter::invalid_use_of_matchers(
                invocation.arguments().len(),
                matchers.len(),
            ));
        }
        Ok(InvocationMatcher { invocation: Arc::new(invocation), matchers })
    }

    /// A wanted pattern matching exactly the template's own arguments.
    pub fn from_template(invocation: Invocation) -> Self {
        let matchers = invocation
            .arguments()
            .iter()
            .map(|arg| matchers::eq_value(arg.clone()))
            .collect();
        InvocationMatcher { invocation: Arc::new(invocation), matchers }
    }

    pub fn invocation(&self) -> &Arc<Invocation> {
        &self.invocation
    }

    pub fn matchers(&self) -> &[MatcherRef] {
        &self.matchers
    }

    /// Exact match: same mock, same method signature, and every matcher
    /// accepts its paired argument.
    pub fn matches(&self, candidate: &Invocation) -> bool {
        self.invocation.mock_id() == candidate.mock_id()
            && self.has_same_method(candidate)
            && self.arguments_match(candidate)
    }

    /// Same method name and parameter-type list.  Deliberately structural:
    /// recorded and wanted calls may come through different synthetic entry
    /// points for the same call site.
    pub fn has_same_method(&self, candidate: &Invocation) -> bool {
        self.invocation.method().same_method(candidate.method())
    }

    /// Similar means: same method name, same mock, not yet verified — and
    /// not an overload that happens to take the same arguments, which would
    /// be misleading in a closest-miss diagnostic.
    pub fn has_similar_method(&self, candidate: &Invocation) -> bool {
        let name_eq =
            self.invocation.method().name() == candidate.method().name();
        if !name_eq
            || candidate.is_verified()
            || self.invocation.mock_id() != candidate.mock_id()
        {
            return false;
        }
        let method_eq = self.has_same_method(candidate);
        let overloaded_but_same_args =
            !method_eq && self.arguments_match(candidate);
        !overloaded_but_same_args
    }

    /// Replay the pairing, feeding the candidate's actual argument values
    /// into every capture-capable matcher.
    pub fn capture_arguments_from(&self, invocation: &Invocation) {
        let _ = for_each_matcher_and_argument(
            invocation,
            &self.matchers,
            |matcher, argument| {
                if let Some(sink) = matcher.capture_sink() {
                    sink.push(argument.clone());
                }
                true
            },
        );
    }

    fn arguments_match(&self, candidate: &Invocation) -> bool {
        for_each_matcher_and_argument(
            candidate,
            &self.matchers,
            |matcher, argument| matcher.matches(argument),
        )
    }

    /// Rendered per-argument mismatch explanations against `actual`, for
    /// matchers that can produce one.
    pub(crate) fn describe_mismatch(&self, actual: &Invocation)
        -> Option<String>
    {
        let mut details = Vec::new();
        let applied = for_each_matcher_and_argument(
            actual,
            &self.matchers,
            |matcher, argument| {
                if !matcher.matches(argument) {
                    if let Some(case) = matcher.find_mismatch_case(argument) {
                        details.push(case);
                    } else if let (Some(expected), Some(actual)) =
                        (matcher.described_type(), argument.type_name())
                    {
                        if expected != actual {
                            details.push(format!(
                                "{matcher} expects an argument of type \
                                 {expected}, but the actual type is {actual}",
                            ));
                        }
                    }
                }
                true
            },
        );
        if !applied || details.is_empty() {
            None
        } else {
            Some(details.join("\n"))
        }
    }
}

impl fmt::Display for InvocationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}(",
            self.invocation.mock_name(),
            self.invocation.method().name(),
        )?;
        for (i, matcher) in self.matchers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{matcher}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{
        invocation::{InvocationBuilder, MethodSignature, ParamType},
        matchers::ArgumentCaptor,
        session::{Mock, MockingSession},
    };

    fn mock() -> Mock {
        MockingSession::new().mock("m")
    }

    fn vararg_sig(name: &str) -> MethodSignature {
        MethodSignature::new_varargs(
            name,
            vec![ParamType::of::<String>(), ParamType::of::<String>()],
            ParamType::of::<()>(),
        )
    }

    fn plain_sig(name: &str, nargs: usize) -> MethodSignature {
        MethodSignature::new(
            name,
            vec![ParamType::of::<i32>(); nargs],
            ParamType::of::<()>(),
        )
    }

    fn vararg_call(mock: &Mock, args: &[&str]) -> Arc<Invocation> {
        let tail = ArgValue::array(
            args[1..].iter().map(|a| ArgValue::of(a.to_string())),
        );
        mock.record(
            InvocationBuilder::new(mock, vararg_sig("f"))
                .arg(args[0].to_string())
                .value(tail),
        )
    }

    #[test]
    fn classifies_one_matcher_per_argument() {
        let m = mock();
        let call = vararg_call(&m, &["a", "b", "c"]);
        let ms = vec![
            matchers::eq("a".to_string()),
            matchers::eq("b".to_string()),
            matchers::eq("c".to_string()),
        ];
        assert_eq!(
            matcher_application_for(&call, &ms),
            MatcherApplication::OneMatcherPerArgument,
        );
    }

    #[test]
    fn classifies_vararg_replication() {
        let m = mock();
        let call = vararg_call(&m, &["a", "b", "c"]);
        let ms = vec![matchers::eq("a".to_string()), matchers::any_vararg()];
        assert_eq!(
            matcher_application_for(&call, &ms),
            MatcherApplication::MatchEachVarargWithLastMatcher,
        );
    }

    #[test]
    fn last_matcher_must_be_vararg_aware() {
        let m = mock();
        let call = vararg_call(&m, &["a", "b", "c"]);
        let ms = vec![matchers::eq("a".to_string()), matchers::any()];
        assert_eq!(
            matcher_application_for(&call, &ms),
            MatcherApplication::Unsupported,
        );
    }

    #[test]
    fn unsupported_count_applies_nothing() {
        let m = mock();
        let call = vararg_call(&m, &["a", "b", "c"]);
        let ms = vec![matchers::eq("a".to_string())];
        let mut applied = 0;
        let ok = for_each_matcher_and_argument(&call, &ms, |_, _| {
            applied += 1;
            true
        });
        assert!(!ok);
        assert_eq!(applied, 0);
    }

    #[test]
    fn zero_vararg_elements_contribute_zero_pairs() {
        let m = mock();
        let call = vararg_call(&m, &["a"]);
        let ms = vec![matchers::eq("a".to_string()), matchers::any_vararg()];
        assert_eq!(
            matcher_application_for(&call, &ms),
            MatcherApplication::MatchEachVarargWithLastMatcher,
        );
        let mut applied = 0;
        let ok = for_each_matcher_and_argument(&call, &ms, |_, _| {
            applied += 1;
            true
        });
        assert!(ok);
        assert_eq!(applied, 1);
    }

    #[test]
    fn null_tail_is_one_argument_not_an_empty_array() {
        let m = mock();
        let call = m.record(
            InvocationBuilder::new(&m, vararg_sig("f"))
                .arg("a".to_string())
                .value(ArgValue::null()),
        );
        // Two expanded arguments, so two matchers pair one-per-argument.
        let ms = vec![matchers::eq("a".to_string()), matchers::any_vararg()];
        assert_eq!(
            matcher_application_for(&call, &ms),
            MatcherApplication::OneMatcherPerArgument,
        );
        let wanted = InvocationMatcher::new(
            InvocationBuilder::new(&m, vararg_sig("f"))
                .arg("a".to_string())
                .value(ArgValue::null())
                .template(),
            ms,
        ).unwrap();
        assert!(wanted.matches(&call));
    }

    #[test]
    fn synthesizes_equality_matchers_from_template() {
        let m = mock();
        let call = m.record(
            InvocationBuilder::new(&m, plain_sig("g", 2)).arg(1).arg(2),
        );
        let wanted = InvocationMatcher::from_template(
            InvocationBuilder::new(&m, plain_sig("g", 2))
                .arg(1)
                .arg(2)
                .template(),
        );
        assert!(wanted.matches(&call));
        let other = m.record(
            InvocationBuilder::new(&m, plain_sig("g", 2)).arg(1).arg(3),
        );
        assert!(!wanted.matches(&other));
    }

    #[test]
    fn rejects_mismatched_matcher_count() {
        let m = mock();
        let template =
            InvocationBuilder::new(&m, plain_sig("g", 2)).arg(1).arg(2);
        let err = InvocationMatcher::new(
            template.template(),
            vec![matchers::eq(1)],
        )
        .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("Invalid use of argument matchers!"));
        assert!(rendered.contains("2 matchers expected, 1 recorded:"));
    }

    #[test]
    fn different_mocks_never_match() {
        let session = MockingSession::new();
        let m1 = session.mock("m1");
        let m2 = session.mock("m2");
        let call = m2.record(
            InvocationBuilder::new(&m2, plain_sig("g", 1)).arg(1),
        );
        let wanted = InvocationMatcher::from_template(
            InvocationBuilder::new(&m1, plain_sig("g", 1)).arg(1).template(),
        );
        assert!(!wanted.matches(&call));
    }

    #[test]
    fn similar_method_skips_equal_arg_overloads() {
        let m = mock();
        // Overload: same name, different parameter types, same argument
        // values as far as matching is concerned.
        let overload = MethodSignature::new(
            "g",
            vec![ParamType::of::<i64>()],
            ParamType::of::<()>(),
        );
        let call = m.record(
            InvocationBuilder::new(&m, overload).value(ArgValue::of(1i32)),
        );
        let wanted = InvocationMatcher::from_template(
            InvocationBuilder::new(&m, plain_sig("g", 1)).arg(1i32).template(),
        );
        // Same name, arguments match, but the signature differs: reporting
        // it as "similar" would claim an exact near-miss that isn't there.
        assert!(!wanted.has_similar_method(&call));

        let differing = m.record(
            InvocationBuilder::new(&m, plain_sig("g", 1)).arg(9i32),
        );
        assert!(wanted.has_similar_method(&differing));
    }

    #[test]
    fn capture_replays_actual_values_across_varargs() {
        let m = mock();
        let call = vararg_call(&m, &["a", "b", "c"]);
        let captor = ArgumentCaptor::new();
        let wanted = InvocationMatcher::new(
            InvocationBuilder::new(&m, vararg_sig("f"))
                .arg("a".to_string())
                .value(ArgValue::array([]))
                .template(),
            vec![matchers::eq("a".to_string()), captor.matcher()],
        ).unwrap();
        wanted.capture_arguments_from(&call);
        assert_eq!(
            captor.all_values(),
            vec![
                ArgValue::of("b".to_string()),
                ArgValue::of("c".to_string()),
            ],
        );
    }
}
