// vim: tw=80
//! Verification modes, the ordering context, and the checkers.
//!
//! A checker either returns `Ok(())` after marking every invocation it
//! consumed as verified (and replaying argument capture for them), or fails
//! before applying any side effect.  Partial marking on failure never
//! happens: the count decision always precedes the marking.

use std::{collections::HashSet, ops::RangeInclusive, sync::Arc};

use crate::{
    error::{Error, UsageError},
    finder,
    invocation::{Invocation, Location},
    matching::InvocationMatcher,
    reporter::{self, Discrepancy},
    session::Mock,
};

/// Tracks which invocations one ordered-verification session has already
/// consumed, keyed by sequence number (globally unique, so an exact identity
/// key: two calls with equal arguments stay distinct members).  Grow-only
/// for the lifetime of the session.
#[derive(Clone, Debug, Default)]
pub struct InOrderContext {
    consumed: HashSet<u64>,
}

impl InOrderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_verified(&self, invocation: &Invocation) -> bool {
        self.consumed.contains(&invocation.sequence_number())
    }

    pub fn mark_verified(&mut self, invocation: &Invocation) {
        self.consumed.insert(invocation.sequence_number());
    }
}

/// How many matching invocations a verification requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationMode {
    /// Exactly `n` matches.  `Times(0)` asserts the call never happened.
    Times(usize),
    /// At least `n` matches.  Marks every match it finds as verified, so a
    /// later no-more-interactions assertion does not trip over the surplus.
    AtLeast(usize),
    /// At most `n` matches.  Meaningless under ordered verification and
    /// rejected there.
    AtMost(usize),
    /// Between `min` and `max` matches, inclusive.
    Range { min: usize, max: usize },
    /// Exactly `n` matches consumed non-greedily, in order.  Only valid
    /// within an `InOrder` session.
    Calls(usize),
    /// Exactly one match, which must also be the mock's only interaction.
    Only,
}

/// Exactly `n` invocations.
pub fn times(n: usize) -> VerificationMode {
    VerificationMode::Times(n)
}

/// No invocations at all.  Equivalent to `times(0)`.
pub fn never() -> VerificationMode {
    VerificationMode::Times(0)
}

/// At least `n` invocations.
pub fn at_least(n: usize) -> VerificationMode {
    VerificationMode::AtLeast(n)
}

/// At least one invocation.
pub fn at_least_once() -> VerificationMode {
    VerificationMode::AtLeast(1)
}

/// At most `n` invocations.
pub fn at_most(n: usize) -> VerificationMode {
    VerificationMode::AtMost(n)
}

/// Between `range.start()` and `range.end()` invocations, inclusive.
pub fn times_range(range: RangeInclusive<usize>) -> VerificationMode {
    VerificationMode::Range { min: *range.start(), max: *range.end() }
}

/// Exactly `n` invocations, consumed non-greedily within an `InOrder`
/// session.
pub fn calls(n: usize) -> VerificationMode {
    VerificationMode::Calls(n)
}

/// The wanted invocation must be the mock's only interaction.
pub fn only() -> VerificationMode {
    VerificationMode::Only
}

/// Unordered verification of `wanted` against `mock`'s history.
///
/// # Examples
/// ```
/// use verimock::{times, verify, InvocationBuilder, InvocationMatcher,
///                MethodSignature, MockingSession, ParamType};
///
/// let session = MockingSession::new();
/// let mock = session.mock("greeter");
/// let sig = MethodSignature::new(
///     "greet", vec![ParamType::of::<String>()], ParamType::of::<()>(),
/// );
/// mock.record(
///     InvocationBuilder::new(&mock, sig.clone()).arg("hi".to_string()),
/// );
/// let wanted = InvocationMatcher::from_template(
///     InvocationBuilder::new(&mock, sig).arg("hi".to_string()).template(),
/// );
/// assert!(verify(&mock, &wanted, times(1)).is_ok());
/// assert!(verify(&mock, &wanted, times(2)).is_err());
/// ```
#[track_caller]
pub fn verify(
    mock: &Mock,
    wanted: &InvocationMatcher,
    mode: VerificationMode,
) -> Result<(), Error> {
    let at = Location::capture();
    let invocations = mock.invocations();
    match mode {
        VerificationMode::Times(n) => {
            if n > 0 {
                check_missing_invocation(&invocations, wanted, at)?;
            }
            check_number_of_invocations(&invocations, wanted, n, at)
        },
        VerificationMode::AtLeast(n) => {
            // Only at-least-once gets the missing-invocation analysis; a
            // larger lower bound reports its discrepancy with both counts.
            if n == 1 {
                check_missing_invocation(&invocations, wanted, at)?;
            }
            check_at_least(&invocations, wanted, n, at)
        },
        VerificationMode::AtMost(max) => {
            check_at_most(&invocations, wanted, max)
        },
        VerificationMode::Range { min, max } => {
            if min > max {
                return Err(UsageError::InvalidRange { min, max }.into());
            }
            if min > 0 {
                check_missing_invocation(&invocations, wanted, at)?;
            }
            check_range(&invocations, wanted, min, max, at)
        },
        VerificationMode::Calls(_) => {
            Err(UsageError::CallsRequiresInOrder.into())
        },
        VerificationMode::Only => check_only(&invocations, wanted, at),
    }
}

/// An ordered-verification session over one or more mocks.
///
/// Invocations from all of the session's mocks are merged in sequence-number
/// order, so ordering holds across mocks even when the calls originated on
/// different threads.  Each session owns its own consumed set: a second
/// `verify` within the session cannot re-match an invocation an earlier
/// `verify` consumed.
pub struct InOrder {
    mocks: Vec<Mock>,
    context: InOrderContext,
}

impl InOrder {
    pub fn new<I: IntoIterator<Item = Mock>>(mocks: I) -> Self {
        InOrder {
            mocks: mocks.into_iter().collect(),
            context: InOrderContext::new(),
        }
    }

    fn sorted_invocations(&self) -> Vec<Arc<Invocation>> {
        let mut all: Vec<_> = self
            .mocks
            .iter()
            .flat_map(|m| m.invocations())
            .filter(|i| !i.is_ignored_for_verification())
            .collect();
        all.sort_by_key(|i| i.sequence_number());
        all
    }

    /// Ordered verification of `wanted`, consuming the matched invocations
    /// from this session's pool.
    #[track_caller]
    pub fn verify(
        &mut self,
        wanted: &InvocationMatcher,
        mode: VerificationMode,
    ) -> Result<(), Error> {
        let at = Location::capture();
        let target = wanted.invocation().mock_id();
        if !self.mocks.iter().any(|m| m.id() == target) {
            return Err(reporter::unfamiliar_mock_for_in_order().into());
        }
        let invocations = self.sorted_invocations();
        match mode {
            VerificationMode::Times(0) => {
                Err(UsageError::NotImplementedForInOrder { mode: "Never" }
                    .into())
            },
            VerificationMode::AtMost(_) => {
                Err(UsageError::NotImplementedForInOrder { mode: "AtMost" }
                    .into())
            },
            VerificationMode::Only => {
                Err(UsageError::NotImplementedForInOrder { mode: "Only" }
                    .into())
            },
            VerificationMode::Times(n) => {
                check_missing_in_order(
                    &invocations, wanted, &self.context, at,
                )?;
                check_number_in_order(
                    &invocations, wanted, n, &mut self.context, at,
                )
            },
            VerificationMode::AtLeast(n) => {
                if n == 1 {
                    check_missing_in_order(
                        &invocations, wanted, &self.context, at,
                    )?;
                }
                check_at_least_in_order(
                    &invocations, wanted, n, &mut self.context, at,
                )
            },
            VerificationMode::Range { min, max } => {
                if min > max {
                    return Err(UsageError::InvalidRange { min, max }.into());
                }
                if min == max {
                    check_missing_in_order(
                        &invocations, wanted, &self.context, at,
                    )?;
                    return check_number_in_order(
                        &invocations, wanted, min, &mut self.context, at,
                    );
                }
                if min > 0 {
                    check_missing_in_order(
                        &invocations, wanted, &self.context, at,
                    )?;
                }
                check_range_in_order(
                    &invocations, wanted, min, max, &mut self.context, at,
                )
            },
            VerificationMode::Calls(n) => {
                if n == 0 {
                    return Err(UsageError::NonPositiveCalls.into());
                }
                check_missing_in_order(
                    &invocations, wanted, &self.context, at,
                )?;
                check_calls_non_greedy(
                    &invocations, wanted, n, &mut self.context, at,
                )
            },
        }
    }

    /// Assert that this session consumed every interaction on its mocks.
    #[track_caller]
    pub fn verify_no_more_interactions(&self) -> Result<(), Error> {
        let at = Location::capture();
        let invocations = self.sorted_invocations();
        match finder::find_first_unverified_in_order(
            &self.context,
            &invocations,
        ) {
            Some(unverified) => Err(reporter::no_more_interactions_wanted_in_order(
                &unverified,
                at,
            )
            .into()),
            None => Ok(()),
        }
    }
}

/// Assert that every non-ignored interaction on each mock has been verified.
#[track_caller]
pub fn verify_no_more_interactions(mocks: &[&Mock]) -> Result<(), Error> {
    let at = Location::capture();
    for mock in mocks {
        let invocations: Vec<_> = mock
            .invocations()
            .into_iter()
            .filter(|i| !i.is_ignored_for_verification())
            .collect();
        if let Some(unverified) = finder::find_first_unverified(&invocations) {
            return Err(reporter::no_more_interactions_wanted(
                &unverified,
                &invocations,
                at,
            )
            .into());
        }
    }
    Ok(())
}

/// Assert that each mock saw no non-ignored interactions at all, verified or
/// not.
#[track_caller]
pub fn verify_no_interactions(mocks: &[&Mock]) -> Result<(), Error> {
    let at = Location::capture();
    for mock in mocks {
        let invocations: Vec<_> = mock
            .invocations()
            .into_iter()
            .filter(|i| !i.is_ignored_for_verification())
            .collect();
        if let Some(first) = invocations.first() {
            return Err(reporter::no_more_interactions_wanted(
                first,
                &invocations,
                at,
            )
            .into());
        }
    }
    Ok(())
}

/// Mark every stubbed invocation on the given mocks as ignored for
/// verification, so no-more-interactions assertions skip them.
pub fn ignore_stubs(mocks: &[&Mock]) {
    for mock in mocks {
        for invocation in mock.invocations() {
            if invocation.stub_info().is_some() {
                invocation.mark_ignored_for_verification();
            }
        }
    }
}

fn mark_verified(found: &[Arc<Invocation>], wanted: &InvocationMatcher) {
    for invocation in found {
        invocation.mark_verified();
        wanted.capture_arguments_from(invocation);
    }
}

fn mark_verified_in_order(
    chunk: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    context: &mut InOrderContext,
) {
    mark_verified(chunk, wanted);
    for invocation in chunk {
        context.mark_verified(invocation);
    }
}

fn check_missing_invocation(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    at: Location,
) -> Result<(), Error> {
    let actual = finder::find_invocations(invocations, wanted);
    if !actual.is_empty() {
        return Ok(());
    }
    match finder::find_similar_invocation(invocations, wanted) {
        Some(similar) => {
            Err(reporter::arguments_are_different(wanted, &similar, at).into())
        },
        None => {
            Err(reporter::wanted_but_not_invoked(wanted, invocations, at)
                .into())
        },
    }
}

fn check_number_of_invocations(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    at: Location,
) -> Result<(), Error> {
    let actual_invocations = finder::find_invocations(invocations, wanted);
    let actual_count = actual_invocations.len();
    if wanted_count > actual_count {
        let last = finder::last_location(&actual_invocations);
        return Err(reporter::too_few_actual_invocations(
            Discrepancy::exact(wanted_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    if wanted_count == 0 && actual_count > 0 {
        let first_undesired = actual_invocations[wanted_count].location();
        return Err(reporter::never_wanted_but_invoked(
            wanted,
            first_undesired,
            at,
        )
        .into());
    }
    if wanted_count < actual_count {
        let first_undesired = actual_invocations[wanted_count].location();
        return Err(reporter::too_many_actual_invocations(
            wanted_count,
            actual_count,
            wanted,
            first_undesired,
            at,
        )
        .into());
    }
    mark_verified(&actual_invocations, wanted);
    Ok(())
}

fn check_at_least(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    at: Location,
) -> Result<(), Error> {
    let actual_invocations = finder::find_invocations(invocations, wanted);
    let actual_count = actual_invocations.len();
    if wanted_count > actual_count {
        let last = finder::last_location(&actual_invocations);
        return Err(reporter::too_few_actual_invocations(
            Discrepancy::at_least(wanted_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    // An at-least check consumes everything it finds, not just the minimum.
    mark_verified(&actual_invocations, wanted);
    Ok(())
}

fn check_at_most(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    max_count: usize,
) -> Result<(), Error> {
    let actual_invocations = finder::find_invocations(invocations, wanted);
    let actual_count = actual_invocations.len();
    if actual_count > max_count {
        return Err(reporter::wanted_at_most_x(max_count, actual_count)
            .into());
    }
    mark_verified(&actual_invocations, wanted);
    Ok(())
}

fn check_range(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    min_count: usize,
    max_count: usize,
    at: Location,
) -> Result<(), Error> {
    let actual_invocations = finder::find_invocations(invocations, wanted);
    let actual_count = actual_invocations.len();
    if actual_count < min_count {
        let last = finder::last_location(&actual_invocations);
        return Err(reporter::too_few_actual_invocations(
            Discrepancy::at_least(min_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    if actual_count > max_count {
        return Err(reporter::wanted_at_most_x(max_count, actual_count)
            .into());
    }
    mark_verified(&actual_invocations, wanted);
    Ok(())
}

fn check_only(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    at: Location,
) -> Result<(), Error> {
    let found = finder::find_invocations(invocations, wanted);
    if invocations.len() != 1 && !found.is_empty() {
        if let Some(unverified) = finder::find_first_unverified(invocations) {
            return Err(reporter::no_more_interactions_wanted(
                &unverified,
                invocations,
                at,
            )
            .into());
        }
    }
    if invocations.len() != 1 || found.is_empty() {
        return Err(reporter::wanted_but_not_invoked(wanted, invocations, at)
            .into());
    }
    mark_verified(&found, wanted);
    Ok(())
}

fn check_missing_in_order(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    context: &InOrderContext,
    at: Location,
) -> Result<(), Error> {
    let chunk = finder::find_all_matching_unverified_chunks(
        invocations,
        wanted,
        context,
    );
    if !chunk.is_empty() {
        return Ok(());
    }
    match finder::find_previous_verified_in_order(invocations, context) {
        Some(previous) => Err(reporter::wanted_but_not_invoked_in_order(
            wanted,
            &previous,
            at,
        )
        .into()),
        // Nothing consumed before this point: fall back to the ordinary
        // missing-invocation analysis for the nicer diagnostics.
        None => check_missing_invocation(invocations, wanted, at),
    }
}

fn check_number_in_order(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    context: &mut InOrderContext,
    at: Location,
) -> Result<(), Error> {
    let chunk = finder::find_matching_chunk(
        invocations,
        wanted,
        wanted_count,
        context,
    );
    let actual_count = chunk.len();
    if wanted_count > actual_count {
        let last = finder::last_location(&chunk);
        return Err(reporter::too_few_actual_invocations_in_order(
            Discrepancy::exact(wanted_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    if wanted_count < actual_count {
        let first_undesired = chunk[wanted_count].location();
        return Err(reporter::too_many_actual_invocations_in_order(
            wanted_count,
            actual_count,
            wanted,
            first_undesired,
            at,
        )
        .into());
    }
    mark_verified_in_order(&chunk, wanted, context);
    Ok(())
}

fn check_at_least_in_order(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    context: &mut InOrderContext,
    at: Location,
) -> Result<(), Error> {
    let chunk = finder::find_all_matching_unverified_chunks(
        invocations,
        wanted,
        context,
    );
    let actual_count = chunk.len();
    if wanted_count > actual_count {
        let last = finder::last_location(&chunk);
        return Err(reporter::too_few_actual_invocations_in_order(
            Discrepancy::at_least(wanted_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    mark_verified_in_order(&chunk, wanted, context);
    Ok(())
}

fn check_range_in_order(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    min_count: usize,
    max_count: usize,
    context: &mut InOrderContext,
    at: Location,
) -> Result<(), Error> {
    let chunk = finder::find_all_matching_unverified_chunks(
        invocations,
        wanted,
        context,
    );
    let actual_count = chunk.len();
    if actual_count < min_count {
        let last = finder::last_location(&chunk);
        return Err(reporter::too_few_actual_invocations_in_order(
            Discrepancy::at_least(min_count, actual_count),
            wanted,
            last,
            at,
        )
        .into());
    }
    if actual_count > max_count {
        return Err(reporter::wanted_at_most_x(max_count, actual_count)
            .into());
    }
    mark_verified_in_order(&chunk, wanted, context);
    Ok(())
}

/// Consume the first `wanted_count` matching unconsumed invocations one at a
/// time.  The consumption is simulated on a scratch context first, so a
/// too-few failure leaves no side effects behind.
fn check_calls_non_greedy(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    context: &mut InOrderContext,
    at: Location,
) -> Result<(), Error> {
    let mut scratch = context.clone();
    let mut claimed = Vec::with_capacity(wanted_count);
    while claimed.len() < wanted_count {
        match finder::find_first_matching_unverified(
            invocations,
            wanted,
            &scratch,
        ) {
            Some(next) => {
                scratch.mark_verified(&next);
                claimed.push(next);
            },
            None => {
                let last = finder::last_location(&claimed);
                return Err(reporter::too_few_actual_invocations_in_order(
                    Discrepancy::exact(wanted_count, claimed.len()),
                    wanted,
                    last,
                    at,
                )
                .into());
            },
        }
    }
    mark_verified_in_order(&claimed, wanted, context);
    Ok(())
}
