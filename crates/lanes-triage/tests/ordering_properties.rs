//! Property tests for the priority score and the filter/sort engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use lanes_core::model::{Issue, Priority, Severity, Status};
use lanes_triage::score::priority_score;
use lanes_triage::view::{FilterCriteria, SortKey, apply};
use proptest::prelude::*;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Backlog),
        Just(Status::InProgress),
        Just(Status::Done)
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High)
    ]
}

fn arb_issue() -> impl Strategy<Value = Issue> {
    (
        "[A-Z]{1,3}-[0-9]{1,3}",
        "[a-z ]{0,12}",
        arb_status(),
        arb_priority(),
        1u8..=10,
        0i64..2_000,
        prop_oneof![Just(String::new()), "u-[0-9]"],
        prop::collection::vec("[a-z]{1,4}", 0..3),
    )
        .prop_map(
            |(id, title, status, priority, severity, hours, assignee, tags)| Issue {
                id,
                title,
                status,
                priority,
                severity: Severity::new(severity).unwrap(),
                created_at: epoch() + Duration::hours(hours),
                assignee,
                tags,
            },
        )
}

fn arb_sort() -> impl Strategy<Value = SortKey> {
    prop::sample::select(SortKey::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn score_never_increases_with_age(issue in arb_issue(), a in 0i64..5_000, b in 0i64..5_000) {
        let (early, late) = (a.min(b), a.max(b));
        let now = issue.created_at;
        prop_assert!(
            priority_score(&issue, now + Duration::hours(late))
                <= priority_score(&issue, now + Duration::hours(early))
        );
    }

    #[test]
    fn score_increases_with_severity(issue in arb_issue(), bump in 1u8..=9, days in 0i64..400) {
        prop_assume!(issue.severity.get() + bump <= 10);
        let mut higher = issue.clone();
        higher.severity = Severity::new(issue.severity.get() + bump).unwrap();
        let now = epoch() + Duration::days(days);
        prop_assert!(priority_score(&higher, now) > priority_score(&issue, now));
    }

    #[test]
    fn empty_criteria_keeps_everything(issues in prop::collection::vec(arb_issue(), 0..30), sort in arb_sort()) {
        let out = apply(&issues, &FilterCriteria::default(), sort, epoch());
        prop_assert_eq!(out.len(), issues.len());
    }

    #[test]
    fn filtering_is_an_ordered_subsequence(
        issues in prop::collection::vec(arb_issue(), 0..30),
        status in arb_status(),
        sort in arb_sort(),
    ) {
        let all = apply(&issues, &FilterCriteria::default(), sort, epoch());
        let criteria = FilterCriteria { status: Some(status), ..FilterCriteria::default() };
        let filtered = apply(&issues, &criteria, sort, epoch());

        prop_assert!(filtered.iter().all(|issue| issue.status == status));
        let expected: Vec<_> = all.into_iter().filter(|issue| issue.status == status).collect();
        prop_assert_eq!(filtered, expected);
    }

    #[test]
    fn output_is_independent_of_input_order(
        issues in prop::collection::vec(arb_issue(), 0..30),
        sort in arb_sort(),
    ) {
        // Distinct ids make the order total.
        let mut unique = issues;
        unique.sort_by(|a, b| a.id.cmp(&b.id));
        unique.dedup_by(|a, b| a.id == b.id);
        let mut reversed = unique.clone();
        reversed.reverse();

        prop_assert_eq!(
            apply(&unique, &FilterCriteria::default(), sort, epoch()),
            apply(&reversed, &FilterCriteria::default(), sort, epoch())
        );
    }
}

#[test]
fn severity_eight_high_today_then_a_day_later() {
    let issue = Issue {
        id: "ISSUE-8".into(),
        title: "Checkout fails".into(),
        status: Status::Backlog,
        priority: Priority::High,
        severity: Severity::new(8).unwrap(),
        created_at: epoch(),
        assignee: String::new(),
        tags: vec![],
    };
    assert_eq!(priority_score(&issue, epoch()), 180);
    assert_eq!(priority_score(&issue, epoch() + Duration::days(1)), 179);
}
