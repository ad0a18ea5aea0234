//! Property tests: transfer records obey query idempotence and terminal immutability.

use chrono::{DateTime, Duration, TimeZone, Utc};
use epp_core::{
    AutoResponsePolicy, TransferBook, TransferConfig, TransferRecord, TransferStatus,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

const REQUESTER: &str = "ClientX";
const SPONSOR: &str = "ClientY";

#[derive(Clone, Copy, Debug)]
enum Action {
    Query,
    Cancel(bool),
    Reject(bool),
    Approve(bool),
    Elapse(i64),
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 6, 6, 22, 0, 0).unwrap()
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Query),
        any::<bool>().prop_map(Action::Cancel),
        any::<bool>().prop_map(Action::Reject),
        any::<bool>().prop_map(Action::Approve),
        (0i64..10).prop_map(Action::Elapse),
    ]
}

fn arb_config() -> impl Strategy<Value = TransferConfig> {
    (
        prop_oneof![Just(AutoResponsePolicy::Approve), Just(AutoResponsePolicy::Reject)],
        1i64..10,
    )
        .prop_map(|(auto_response, auto_response_days)| TransferConfig {
            auto_response,
            auto_response_days,
        })
}

/// Applies one action; `true` picks the authorized client.
fn apply(record: &mut TransferRecord, action: Action, now: DateTime<Utc>, config: &TransferConfig) -> bool {
    let outcome = match action {
        Action::Query => {
            record.query();
            return true;
        }
        Action::Cancel(authorized) => record
            .cancel(if authorized { REQUESTER } else { SPONSOR }, now)
            .map(|_| ()),
        Action::Reject(authorized) => record
            .reject(if authorized { SPONSOR } else { REQUESTER }, now)
            .map(|_| ()),
        Action::Approve(authorized) => record
            .approve(if authorized { SPONSOR } else { REQUESTER }, now)
            .map(|_| ()),
        Action::Elapse(days) => record.auto_respond(now + Duration::days(days), config).map(|_| ()),
    };
    match outcome {
        Ok(()) => true,
        Err(err) => {
            assert!(err.is_state(), "unexpected error kind: {err}");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Any number of queries leaves the record exactly as it was.
    #[test]
    fn query_is_idempotent(
        config in arb_config(),
        prefix in prop::collection::vec(arb_action(), 0..6),
        queries in 1usize..20,
    ) {
        let mut record =
            TransferRecord::request("example.com", REQUESTER, SPONSOR, t0(), &config, None).unwrap();
        for action in prefix {
            apply(&mut record, action, t0(), &config);
        }
        let snapshot = record.clone();
        for _ in 0..queries {
            prop_assert_eq!(record.query(), snapshot.status());
        }
        prop_assert_eq!(record, snapshot);
    }

    /// Once terminal, every further operation fails and nothing changes.
    #[test]
    fn terminal_records_are_immutable(
        config in arb_config(),
        actions in prop::collection::vec(arb_action(), 1..20),
    ) {
        let mut record =
            TransferRecord::request("example.com", REQUESTER, SPONSOR, t0(), &config, None).unwrap();
        let mut frozen: Option<TransferRecord> = None;
        for action in actions {
            let accepted = apply(&mut record, action, t0(), &config);
            if let Some(snapshot) = &frozen {
                if !matches!(action, Action::Query) {
                    prop_assert!(!accepted);
                }
                prop_assert_eq!(&record, snapshot);
            } else if record.status().is_terminal() {
                frozen = Some(record.clone());
            }
        }
    }

    /// Unauthorized clients never move a pending record.
    #[test]
    fn wrong_actor_never_transitions(config in arb_config()) {
        let mut record =
            TransferRecord::request("example.com", REQUESTER, SPONSOR, t0(), &config, None).unwrap();
        prop_assert!(record.cancel(SPONSOR, t0()).is_err());
        prop_assert!(record.approve(REQUESTER, t0()).is_err());
        prop_assert!(record.reject("ClientZ", t0()).is_err());
        prop_assert_eq!(record.status(), TransferStatus::Pending);
    }

    /// A sweep after every deadline leaves nothing pending.
    #[test]
    fn sweep_after_deadline_resolves_everything(
        config in arb_config(),
        names in prop::collection::btree_set("[a-z]{3,10}", 1..8),
    ) {
        let mut book = TransferBook::new(config.clone());
        for name in &names {
            book.request(name, REQUESTER, SPONSOR, t0(), None).unwrap();
        }
        let resolved = book.sweep(t0() + config.auto_response_period().unwrap());
        prop_assert_eq!(resolved.len(), names.len());
        prop_assert_eq!(book.pending().count(), 0);
        for (_, status) in resolved {
            prop_assert_eq!(status, config.auto_response.outcome());
        }
    }

    /// A reply at or after the deadline never yields a client-decided status.
    #[test]
    fn late_reply_never_decides_the_transfer(
        config in arb_config(),
        action in prop_oneof![
            any::<bool>().prop_map(Action::Cancel),
            any::<bool>().prop_map(Action::Reject),
            any::<bool>().prop_map(Action::Approve),
        ],
        late_by in 0i64..(30 * 24 * 3600),
    ) {
        let deadline = t0() + config.auto_response_period().unwrap();
        let now = deadline + Duration::seconds(late_by);

        let mut record =
            TransferRecord::request("example.com", REQUESTER, SPONSOR, t0(), &config, None).unwrap();
        let snapshot = record.clone();
        prop_assert!(!apply(&mut record, action, now, &config));
        prop_assert_eq!(&record, &snapshot);

        let mut book = TransferBook::new(config.clone());
        book.request("example.com", REQUESTER, SPONSOR, t0(), None).unwrap();
        let result = match action {
            Action::Cancel(authorized) => book.cancel("example.com", if authorized { REQUESTER } else { SPONSOR }, now),
            Action::Reject(authorized) => book.reject("example.com", if authorized { SPONSOR } else { REQUESTER }, now),
            Action::Approve(authorized) => book.approve("example.com", if authorized { SPONSOR } else { REQUESTER }, now),
            Action::Query | Action::Elapse(_) => unreachable!(),
        };
        prop_assert!(result.unwrap_err().is_state());
        let settled = book.query("example.com").unwrap();
        prop_assert_eq!(settled.status(), config.auto_response.outcome());
        prop_assert_eq!(settled.acted_at(), deadline);
    }
}
