// vim: tw=80
//! An invocation recording and verification engine for mock object
//! frameworks.
//!
//! Verimock is the decision core of a record-then-verify mocking library:
//! it answers "did this mock receive the calls we expect, in the order and
//! count we expect, and if not, why."  It deliberately contains no code
//! generation and no interception machinery.  An interception layer (a
//! proxy, a hand-written test double, a macro-generated mock) records one
//! [`Invocation`] per call; a test then asserts on the recorded history
//! through the verification entry points, and failed assertions come back
//! as typed errors with fully rendered diagnostics.
//!
//! # Recording
//!
//! A [`MockingSession`] owns the counters shared by its mocks, most
//! importantly the global sequence counter that gives every recorded call a
//! unique position in a strict total order — across mocks and across
//! threads.  Recording is thread-safe and append-only; production code may
//! keep calling the mock on other threads while a test thread verifies.
//!
//! ```
//! use verimock::*;
//!
//! let session = MockingSession::new();
//! let warehouse = session.mock("warehouse");
//! let remove = MethodSignature::new(
//!     "remove",
//!     vec![ParamType::of::<String>(), ParamType::of::<u32>()],
//!     ParamType::of::<()>(),
//! );
//! warehouse.record(
//!     InvocationBuilder::new(&warehouse, remove)
//!         .arg("bread".to_string())
//!         .arg(50u32),
//! );
//! assert_eq!(warehouse.invocations().len(), 1);
//! ```
//!
//! # Verifying
//!
//! A wanted call is an [`InvocationMatcher`]: a template invocation plus one
//! argument matcher per argument.  Raw values and matchers behave the same,
//! because a template without explicit matchers gets one equality matcher
//! synthesized per argument.
//!
//! ```
//! # fn main() -> Result<(), verimock::Error> {
//! use verimock::{matchers, *};
//!
//! let session = MockingSession::new();
//! let warehouse = session.mock("warehouse");
//! let remove = MethodSignature::new(
//!     "remove",
//!     vec![ParamType::of::<String>(), ParamType::of::<u32>()],
//!     ParamType::of::<()>(),
//! );
//! warehouse.record(
//!     InvocationBuilder::new(&warehouse, remove.clone())
//!         .arg("bread".to_string())
//!         .arg(50u32),
//! );
//!
//! let wanted = InvocationMatcher::new(
//!     InvocationBuilder::new(&warehouse, remove)
//!         .arg(String::new())
//!         .arg(0u32)
//!         .template(),
//!     vec![matchers::eq("bread".to_string()), matchers::gt(10u32)],
//! )?;
//! verify(&warehouse, &wanted, times(1))?;
//! verify_no_more_interactions(&[&warehouse])?;
//! # Ok(())
//! # }
//! ```
//!
//! # Call counts
//!
//! [`times`], [`never`], [`at_least`], [`at_least_once`], [`at_most`],
//! [`times_range`], [`only`], and (within ordered verification) [`calls`].
//! `times(0)` failing reports "never wanted but invoked" rather than "too
//! many", and an at-least check marks *every* match it finds as verified,
//! so a following [`verify_no_more_interactions`] sees no leftovers.
//!
//! # Ordered verification
//!
//! An [`InOrder`] session verifies that calls happened in a given relative
//! order, optionally across several mocks.  Each session tracks what it has
//! already consumed; repeated verification of the same wanted call claims
//! contiguous, non-overlapping chunks in call order.
//!
//! ```
//! # fn main() -> Result<(), verimock::Error> {
//! use verimock::*;
//!
//! let session = MockingSession::new();
//! let first = session.mock("first");
//! let second = session.mock("second");
//! let poke = MethodSignature::new("poke", vec![], ParamType::of::<()>());
//! first.record(InvocationBuilder::new(&first, poke.clone()));
//! second.record(InvocationBuilder::new(&second, poke.clone()));
//!
//! let mut in_order = InOrder::new([first.clone(), second.clone()]);
//! in_order.verify(
//!     &InvocationMatcher::from_template(
//!         InvocationBuilder::new(&first, poke.clone()).template(),
//!     ),
//!     times(1),
//! )?;
//! in_order.verify(
//!     &InvocationMatcher::from_template(
//!         InvocationBuilder::new(&second, poke).template(),
//!     ),
//!     times(1),
//! )?;
//! in_order.verify_no_more_interactions()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Capturing arguments
//!
//! A [`matchers::ArgumentCaptor`] records the argument values of the calls
//! a successful verification consumed, in call order.  Capture happens only
//! after the count decision, so a failed verification captures nothing.
//!
//! # Variadic calls
//!
//! A variadic call records its trailing arguments as an array value, which
//! is expanded for matching.  A wanted pattern may pair one matcher per
//! expanded argument, or pair the raw argument list with a trailing
//! vararg-aware matcher such as [`matchers::any_vararg`], which is then
//! applied to each variadic element.
//!
//! # Errors
//!
//! Verification failures and API misuse are different things: the former
//! are [`VerificationError`] verdicts rendered with the wanted call, the
//! counts, and every relevant call site; the latter are [`UsageError`]s
//! raised before any checking happens.  Both carry their complete message
//! eagerly — nothing is formatted lazily.

mod error;
pub mod finder;
mod invocation;
pub mod matchers;
mod matching;
mod reporter;
mod session;
mod verification;

pub use predicates::prelude::{predicate, Predicate};

pub use error::{Error, UsageError, VerificationError};
pub use invocation::{
    ArgValue, Invocation, InvocationBuilder, Location, MethodSignature,
    ParamType, StubInfo,
};
pub use matching::{
    for_each_matcher_and_argument, matcher_application_for,
    InvocationMatcher, MatcherApplication,
};
pub use session::{Mock, MockingSession};
pub use verification::{
    at_least, at_least_once, at_most, calls, ignore_stubs, never, only,
    times, times_range, verify, verify_no_interactions,
    verify_no_more_interactions, InOrder, InOrderContext, VerificationMode,
};
