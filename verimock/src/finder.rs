// vim: tw=80
//! Pure queries over a time-ordered invocation list.
//!
//! Nothing here mutates: callers mark invocations verified (or consumed in
//! an ordering context) only after a checker confirms its count decision.

use std::sync::Arc;

use crate::{
    invocation::{Invocation, Location},
    matching::InvocationMatcher,
    verification::InOrderContext,
};

/// Every invocation matching `wanted`, preserving history order.
pub fn find_invocations(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
) -> Vec<Arc<Invocation>> {
    invocations
        .iter()
        .filter(|i| wanted.matches(i))
        .cloned()
        .collect()
}

/// Every match not yet consumed by the ordering context.
pub fn find_all_matching_unverified_chunks(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    remove_verified_in_order(invocations, context)
        .into_iter()
        .filter(|i| wanted.matches(i))
        .collect()
}

/// The candidate pool for an ordered count check.
///
/// Given the invocation sequence `1,1,2,1` and wanted `1`:
/// with an expected count of 2 this returns the first chunk `1,1`; with any
/// other expected count it returns all unconsumed matches `1,1,1`.  Pinning
/// to the first contiguous run only on an exact count match supports relaxed
/// re-verification of earlier chunks, while a discrepancy message needs the
/// full remaining match set for context.
pub fn find_matching_chunk(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    wanted_count: usize,
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    let unverified = remove_verified_in_order(invocations, context);
    let first_chunk = first_matching_chunk(wanted, &unverified);
    if wanted_count != first_chunk.len() {
        find_all_matching_unverified_chunks(invocations, wanted, context)
    } else {
        first_chunk
    }
}

fn first_matching_chunk(
    wanted: &InvocationMatcher,
    unverified: &[Arc<Invocation>],
) -> Vec<Arc<Invocation>> {
    let mut first_chunk = Vec::new();
    for invocation in unverified {
        if wanted.matches(invocation) {
            first_chunk.push(invocation.clone());
        } else if !first_chunk.is_empty() {
            break;
        }
    }
    first_chunk
}

/// The first unconsumed match, for non-greedy ordered consumption.
pub fn find_first_matching_unverified(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
    context: &InOrderContext,
) -> Option<Arc<Invocation>> {
    remove_verified_in_order(invocations, context)
        .into_iter()
        .find(|i| wanted.matches(i))
}

/// The nearest miss for diagnostics: the first invocation with an identical
/// signature anywhere in the history wins; otherwise the first with merely
/// the same method name; otherwise nothing.
pub fn find_similar_invocation(
    invocations: &[Arc<Invocation>],
    wanted: &InvocationMatcher,
) -> Option<Arc<Invocation>> {
    let mut first_similar = None;
    for invocation in invocations {
        if !wanted.has_similar_method(invocation) {
            continue;
        }
        if first_similar.is_none() {
            first_similar = Some(invocation.clone());
        }
        if wanted.has_same_method(invocation) {
            return Some(invocation.clone());
        }
    }
    first_similar
}

/// The first invocation not yet marked verified.
pub fn find_first_unverified(
    invocations: &[Arc<Invocation>],
) -> Option<Arc<Invocation>> {
    invocations.iter().find(|i| !i.is_verified()).cloned()
}

/// The call site of the last invocation in the list.
pub fn last_location(invocations: &[Arc<Invocation>]) -> Option<Location> {
    invocations.last().map(|i| i.location())
}

/// The most recent invocation already consumed by the ordering context.
pub fn find_previous_verified_in_order(
    invocations: &[Arc<Invocation>],
    context: &InOrderContext,
) -> Option<Arc<Invocation>> {
    invocations
        .iter()
        .filter(|i| context.is_verified(i))
        .next_back()
        .cloned()
}

/// Only the tail after the last consumed invocation survives: consuming an
/// invocation closes the window on everything recorded before it.
fn remove_verified_in_order(
    invocations: &[Arc<Invocation>],
    context: &InOrderContext,
) -> Vec<Arc<Invocation>> {
    let mut unverified = Vec::new();
    for invocation in invocations {
        if context.is_verified(invocation) {
            unverified.clear();
        } else {
            unverified.push(invocation.clone());
        }
    }
    unverified
}

/// The invocation a no-more-interactions failure should point at.
///
/// Scans forward tracking the earliest unconsumed invocation since the last
/// consumed one: the candidate resets whenever a consumed invocation is
/// seen, and is set once (not overwritten) on the first unconsumed
/// invocation after a reset.
pub fn find_first_unverified_in_order(
    context: &InOrderContext,
    ordered_invocations: &[Arc<Invocation>],
) -> Option<Arc<Invocation>> {
    let mut candidate = None;
    for invocation in ordered_invocations {
        if !context.is_verified(invocation) {
            if candidate.is_none() {
                candidate = Some(invocation.clone());
            }
        } else {
            candidate = None;
        }
    }
    candidate
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{
        invocation::{InvocationBuilder, MethodSignature, ParamType},
        session::{Mock, MockingSession},
        verification::InOrderContext,
    };

    fn mock() -> Mock {
        MockingSession::new().mock("m")
    }

    fn sig(name: &str) -> MethodSignature {
        MethodSignature::new(
            name,
            vec![ParamType::of::<i32>()],
            ParamType::of::<()>(),
        )
    }

    fn call(mock: &Mock, name: &str, arg: i32) -> Arc<Invocation> {
        mock.record(InvocationBuilder::new(mock, sig(name)).arg(arg))
    }

    fn wanted(mock: &Mock, name: &str, arg: i32) -> InvocationMatcher {
        InvocationMatcher::from_template(
            InvocationBuilder::new(mock, sig(name)).arg(arg).template(),
        )
    }

    #[test]
    fn chunk_pins_to_first_run_on_exact_count() {
        let m = mock();
        call(&m, "f", 1);
        call(&m, "f", 1);
        call(&m, "g", 2);
        call(&m, "f", 1);
        let w = wanted(&m, "f", 1);
        let ctx = InOrderContext::new();
        let chunk = find_matching_chunk(&m.invocations(), &w, 2, &ctx);
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk[0].sequence_number(), 1);
        assert_eq!(chunk[1].sequence_number(), 2);
    }

    #[test]
    fn chunk_widens_to_all_matches_on_other_counts() {
        let m = mock();
        call(&m, "f", 1);
        call(&m, "f", 1);
        call(&m, "g", 2);
        call(&m, "f", 1);
        let w = wanted(&m, "f", 1);
        let ctx = InOrderContext::new();
        for count in [1, 3, 4] {
            let chunk = find_matching_chunk(&m.invocations(), &w, count, &ctx);
            assert_eq!(chunk.len(), 3, "count {count}");
        }
    }

    #[test]
    fn consumed_invocations_close_the_window() {
        let m = mock();
        let i1 = call(&m, "f", 1);
        let i2 = call(&m, "f", 1);
        call(&m, "f", 1);
        let w = wanted(&m, "f", 1);
        let mut ctx = InOrderContext::new();
        ctx.mark_verified(&i1);
        ctx.mark_verified(&i2);
        let remaining =
            find_all_matching_unverified_chunks(&m.invocations(), &w, &ctx);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].sequence_number(), 3);
    }

    #[test]
    fn similar_prefers_same_signature_anywhere() {
        let m = mock();
        // Same name, different signature, recorded first.
        let overload = MethodSignature::new(
            "f",
            vec![ParamType::of::<String>()],
            ParamType::of::<()>(),
        );
        m.record(
            InvocationBuilder::new(&m, overload).arg("x".to_string()),
        );
        let exact_sig = call(&m, "f", 9);
        let w = wanted(&m, "f", 1);
        let similar = find_similar_invocation(&m.invocations(), &w).unwrap();
        assert!(Arc::ptr_eq(&similar, &exact_sig));
    }

    #[test]
    fn unverified_in_order_window_resets() {
        let m = mock();
        let i1 = call(&m, "a", 1);
        let i2 = call(&m, "b", 2);
        let i3 = call(&m, "c", 3);
        let mut ctx = InOrderContext::new();
        // i2 consumed: i1 is before a consumed invocation, so the failure
        // should point at i3.
        ctx.mark_verified(&i2);
        let first =
            find_first_unverified_in_order(&ctx, &m.invocations()).unwrap();
        assert!(Arc::ptr_eq(&first, &i3));
        // Nothing consumed: points at the first invocation.
        let empty = InOrderContext::new();
        let first =
            find_first_unverified_in_order(&empty, &m.invocations()).unwrap();
        assert!(Arc::ptr_eq(&first, &i1));
        // Everything consumed: no candidate.
        ctx.mark_verified(&i1);
        ctx.mark_verified(&i3);
        assert!(find_first_unverified_in_order(&ctx, &m.invocations())
            .is_none());
    }
}
