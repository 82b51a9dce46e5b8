// vim: tw=80
//! Renders failure diagnostics.
//!
//! The wording here is a compatibility surface: test suites assert on
//! substrings of these messages, so the phrasing, line layout, and
//! punctuation are deliberate and stable.  Every message is built eagerly;
//! the error values carry the finished string.

use std::sync::Arc;

use crate::{
    error::{UsageError, VerificationError},
    invocation::{Invocation, Location},
    matching::InvocationMatcher,
};

/// Join message lines the way every diagnostic is laid out: a leading line
/// break, one line per element, and no break after the last element (so an
/// empty trailing element yields a trailing newline).
fn join<I>(lines: I) -> String
    where I: IntoIterator<Item = String>
{
    let mut out = String::from("\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.pop();
    out
}

pub(crate) fn pluralize(n: usize) -> String {
    if n == 1 {
        "1 time".to_owned()
    } else {
        format!("{n} times")
    }
}

fn were_exactly_x_interactions(n: usize) -> String {
    if n == 1 {
        "was exactly 1 interaction".to_owned()
    } else {
        format!("were exactly {n} interactions")
    }
}

/// Wanted-versus-actual counts, with the at-least flavor marking the wanted
/// count as a lower bound.
pub(crate) struct Discrepancy {
    pub wanted: usize,
    pub actual: usize,
    pub at_least: bool,
}

impl Discrepancy {
    pub fn exact(wanted: usize, actual: usize) -> Self {
        Discrepancy { wanted, actual, at_least: false }
    }

    pub fn at_least(wanted: usize, actual: usize) -> Self {
        Discrepancy { wanted, actual, at_least: true }
    }

    fn pluralized_wanted(&self) -> String {
        if self.at_least {
            format!("*at least* {}", pluralize(self.wanted))
        } else {
            pluralize(self.wanted)
        }
    }

    fn pluralized_actual(&self) -> String {
        pluralize(self.actual)
    }
}

fn scenario(invocations: &[Arc<Invocation>]) -> String {
    if invocations.len() == 1 {
        return "Actually, above is the only interaction with this mock."
            .to_owned();
    }
    let mut out = String::from(
        "***\n\
         For your reference, here is the list of all invocations \
         ([?] - means unverified).\n",
    );
    for (counter, i) in invocations.iter().enumerate() {
        out.push_str(&format!("{}. ", counter + 1));
        if !i.is_verified() {
            out.push_str("[?]");
        }
        out.push_str(&format!("{}\n", i.location()));
    }
    out
}

pub(crate) fn wanted_but_not_invoked(
    wanted: &InvocationMatcher,
    invocations: &[Arc<Invocation>],
    at: Location,
) -> VerificationError {
    let base = join(vec![
        "Wanted but not invoked:".to_owned(),
        wanted.to_string(),
        at.to_string(),
        String::new(),
    ]);
    let all_invocations = if invocations.is_empty() {
        "Actually, there were zero interactions with this mock.\n".to_owned()
    } else {
        let mut sb = format!(
            "\nHowever, there {} with this mock:\n",
            were_exactly_x_interactions(invocations.len()),
        );
        for i in invocations {
            sb.push_str(&format!("{}\n{}\n\n", i, i.location()));
        }
        sb
    };
    VerificationError::WantedButNotInvoked { message: base + &all_invocations }
}

pub(crate) fn arguments_are_different(
    wanted: &InvocationMatcher,
    actual: &Invocation,
    at: Location,
) -> VerificationError {
    let wanted_str = wanted.to_string();
    let actual_str = actual.to_string();
    let mut message = join(vec![
        "Argument(s) are different! Wanted:".to_owned(),
        wanted_str.clone(),
        at.to_string(),
        "Actual invocation has different arguments:".to_owned(),
        actual_str.clone(),
        actual.location().to_string(),
        String::new(),
    ]);
    if let Some(detail) = wanted.describe_mismatch(actual) {
        message.push_str("Comparison failure:\n");
        message.push_str(&detail);
        if !message.ends_with('\n') {
            message.push('\n');
        }
    }
    VerificationError::ArgumentsAreDifferent {
        message,
        wanted: wanted_str,
        actual: actual_str,
    }
}

pub(crate) fn wanted_but_not_invoked_in_order(
    wanted: &InvocationMatcher,
    previous: &Invocation,
    at: Location,
) -> VerificationError {
    VerificationError::VerificationInOrderFailure {
        message: join(vec![
            "Verification in order failure".to_owned(),
            "Wanted but not invoked:".to_owned(),
            wanted.to_string(),
            at.to_string(),
            "Wanted anywhere AFTER following interaction:".to_owned(),
            previous.to_string(),
            previous.location().to_string(),
            String::new(),
        ]),
    }
}

fn too_many_invocations_message(
    wanted_count: usize,
    actual_count: usize,
    wanted: &InvocationMatcher,
    first_undesired: Location,
    at: Location,
) -> String {
    join(vec![
        wanted.to_string(),
        format!("Wanted {}:", pluralize(wanted_count)),
        at.to_string(),
        format!(
            "But was {}. Undesired invocation:",
            pluralize(actual_count),
        ),
        first_undesired.to_string(),
        String::new(),
    ])
}

pub(crate) fn too_many_actual_invocations(
    wanted_count: usize,
    actual_count: usize,
    wanted: &InvocationMatcher,
    first_undesired: Location,
    at: Location,
) -> VerificationError {
    VerificationError::TooManyActualInvocations {
        message: too_many_invocations_message(
            wanted_count, actual_count, wanted, first_undesired, at,
        ),
        wanted_count,
        actual_count,
    }
}

pub(crate) fn too_many_actual_invocations_in_order(
    wanted_count: usize,
    actual_count: usize,
    wanted: &InvocationMatcher,
    first_undesired: Location,
    at: Location,
) -> VerificationError {
    let message = too_many_invocations_message(
        wanted_count, actual_count, wanted, first_undesired, at,
    );
    VerificationError::VerificationInOrderFailure {
        message: format!("\nVerification in order failure:{message}"),
    }
}

pub(crate) fn never_wanted_but_invoked(
    wanted: &InvocationMatcher,
    first_undesired: Location,
    at: Location,
) -> VerificationError {
    VerificationError::NeverWantedButInvoked {
        message: join(vec![
            wanted.to_string(),
            "Never wanted here:".to_owned(),
            at.to_string(),
            "But invoked here:".to_owned(),
            first_undesired.to_string(),
            String::new(),
        ]),
    }
}

fn too_few_invocations_message(
    discrepancy: &Discrepancy,
    wanted: &InvocationMatcher,
    last_actual: Option<Location>,
    at: Location,
) -> String {
    let ending = match last_actual {
        Some(location) => format!("{location}\n"),
        None => "\n".to_owned(),
    };
    join(vec![
        wanted.to_string(),
        format!(
            "Wanted {}{}",
            discrepancy.pluralized_wanted(),
            if discrepancy.wanted == 0 { "." } else { ":" },
        ),
        at.to_string(),
        format!(
            "But was {}{}",
            discrepancy.pluralized_actual(),
            if discrepancy.actual == 0 { "." } else { ":" },
        ),
        ending,
    ])
}

pub(crate) fn too_few_actual_invocations(
    discrepancy: Discrepancy,
    wanted: &InvocationMatcher,
    last_actual: Option<Location>,
    at: Location,
) -> VerificationError {
    let message =
        too_few_invocations_message(&discrepancy, wanted, last_actual, at);
    VerificationError::TooFewActualInvocations {
        message,
        wanted_count: discrepancy.wanted,
        actual_count: discrepancy.actual,
    }
}

pub(crate) fn too_few_actual_invocations_in_order(
    discrepancy: Discrepancy,
    wanted: &InvocationMatcher,
    last_actual: Option<Location>,
    at: Location,
) -> VerificationError {
    let message =
        too_few_invocations_message(&discrepancy, wanted, last_actual, at);
    VerificationError::VerificationInOrderFailure {
        message: format!("\nVerification in order failure:{message}"),
    }
}

pub(crate) fn wanted_at_most_x(
    max_count: usize,
    actual_count: usize,
) -> VerificationError {
    VerificationError::MoreThanAllowedActualInvocations {
        message: join(vec![format!(
            "Wanted at most {} but was {}",
            pluralize(max_count),
            actual_count,
        )]),
        max_count,
        actual_count,
    }
}

pub(crate) fn no_more_interactions_wanted(
    undesired: &Invocation,
    relevant: &[Arc<Invocation>],
    at: Location,
) -> VerificationError {
    VerificationError::NoInteractionsWanted {
        message: join(vec![
            "No interactions wanted here:".to_owned(),
            at.to_string(),
            format!(
                "But found this interaction on mock '{}':",
                undesired.mock_name(),
            ),
            undesired.location().to_string(),
            scenario(relevant),
        ]),
    }
}

pub(crate) fn no_more_interactions_wanted_in_order(
    undesired: &Invocation,
    at: Location,
) -> VerificationError {
    VerificationError::VerificationInOrderFailure {
        message: join(vec![
            "No interactions wanted here:".to_owned(),
            at.to_string(),
            format!(
                "But found this interaction on mock '{}':",
                undesired.mock_name(),
            ),
            undesired.location().to_string(),
        ]),
    }
}

pub(crate) fn invalid_use_of_matchers(
    expected: usize,
    recorded: usize,
) -> UsageError {
    UsageError::InvalidUseOfMatchers {
        message: join(vec![
            "Invalid use of argument matchers!".to_owned(),
            format!("{expected} matchers expected, {recorded} recorded:"),
            String::new(),
            "This exception may occur if matchers are combined with raw \
             values:".to_owned(),
            "    //incorrect:".to_owned(),
            "    some_method(any(), \"raw String\");".to_owned(),
            "When using matchers, all arguments have to be provided by \
             matchers.".to_owned(),
            "For example:".to_owned(),
            "    //correct:".to_owned(),
            "    some_method(any(), eq(\"String by matcher\"));".to_owned(),
            String::new(),
        ]),
        expected,
        recorded,
    }
}

pub(crate) fn unfamiliar_mock_for_in_order() -> UsageError {
    UsageError::UnfamiliarMockForInOrder {
        message: join(vec![
            "InOrder can only verify mocks that were passed in during \
             creation of InOrder.".to_owned(),
            "For example:".to_owned(),
            "    let mut in_order = InOrder::new([mock_one.clone()]);"
                .to_owned(),
            "    in_order.verify(&wanted, times(1))?;".to_owned(),
        ]),
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn join_layout() {
        assert_eq!(join(vec!["a".to_owned(), "b".to_owned()]), "\na\nb");
        assert_eq!(
            join(vec!["a".to_owned(), String::new()]),
            "\na\n",
        );
    }

    #[test]
    fn pluralization() {
        assert_eq!(pluralize(1), "1 time");
        assert_eq!(pluralize(0), "0 times");
        assert_eq!(pluralize(3), "3 times");
        assert_eq!(were_exactly_x_interactions(1), "was exactly 1 interaction");
        assert_eq!(
            were_exactly_x_interactions(2),
            "were exactly 2 interactions",
        );
    }

    #[test]
    fn discrepancy_wording() {
        assert_eq!(Discrepancy::exact(2, 1).pluralized_wanted(), "2 times");
        assert_eq!(
            Discrepancy::at_least(2, 1).pluralized_wanted(),
            "*at least* 2 times",
        );
    }
}
