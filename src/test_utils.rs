//! Shared arbitrary generators for property-based testing.

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use crate::github::RemotePullRequest;
use crate::types::{PrNumber, PrState, Sha, Watermark};

pub fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
    // 1970 through 2100, millisecond precision
    (0i64..4_102_444_800, 0u32..1000)
        .prop_map(|(secs, ms)| DateTime::from_timestamp(secs, ms * 1_000_000).unwrap())
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(Sha::new)
}

pub fn arb_pr_state() -> impl Strategy<Value = PrState> {
    prop_oneof![Just(PrState::Open), Just(PrState::Closed)]
}

pub fn arb_remote_pull_request() -> impl Strategy<Value = RemotePullRequest> {
    (
        1u64..100_000,
        arb_pr_state(),
        "[a-zA-Z ]{0,30}",
        "[a-z][a-z0-9/-]{0,20}",
        arb_sha(),
        prop::option::weighted(0.9, arb_datetime()),
    )
        .prop_map(
            |(number, state, title, head_ref, head_sha, updated_at)| RemotePullRequest {
                number: PrNumber(number),
                state,
                title,
                head_ref,
                head_sha,
                updated_at,
            },
        )
}

pub fn arb_remote_pull_requests() -> impl Strategy<Value = Vec<RemotePullRequest>> {
    prop::collection::vec(arb_remote_pull_request(), 0..20)
}

pub fn arb_watermark() -> impl Strategy<Value = Watermark> {
    (arb_datetime(), any::<bool>(), ".{0,40}").prop_map(|(time, succeeded, status)| Watermark {
        time,
        succeeded,
        status,
    })
}
