//! Property tests for bounded state

use proptest::prelude::*;
use uihealth::config::{ElementIds, RetentionConfig};
use uihealth::host::TargetDescriptor;
use uihealth::monitor::recorder::{InteractionId, InteractionLog, InteractionRecord};
use uihealth::monitor::remediation::AttemptCounters;
use uihealth::monitor::reporter::{dedup_key, DEDUP_KEY_CHARS};
use uihealth::monitor::ActionCategory;

proptest! {
    #[test]
    fn prop_dedup_key_is_title_prefix(title in ".{0,120}") {
        let key = dedup_key(&title);
        prop_assert!(key.chars().count() <= DEDUP_KEY_CHARS);
        prop_assert!(title.starts_with(&key));
        if title.chars().count() <= DEDUP_KEY_CHARS {
            prop_assert_eq!(key, title);
        }
    }

    #[test]
    fn prop_attempts_never_exceed_max(max in 1u32..10, tries in 0usize..40) {
        let mut counters = AttemptCounters::default();
        let mut granted = 0;
        for _ in 0..tries {
            if counters.try_reserve("settingsButton", max).is_some() {
                granted += 1;
            }
        }
        prop_assert!(counters.get("settingsButton") <= max);
        prop_assert_eq!(granted as u32, (tries as u32).min(max));
    }

    #[test]
    fn prop_log_bounded_by_max_records(max in 1usize..20, inserts in 0usize..60) {
        let mut log = InteractionLog::new(RetentionConfig { max_records: max, max_age_secs: 600 });
        let mut last = None;
        for _ in 0..inserts {
            let record = InteractionRecord::new(
                ActionCategory::ChatOpen,
                TargetDescriptor::new("chatFab"),
            );
            last = Some(record.id.clone());
            log.insert(record);
        }
        prop_assert_eq!(log.len(), inserts.min(max));
        if let Some(id) = last {
            prop_assert!(log.contains(&id));
        }
    }

    #[test]
    fn prop_classification_total(id in "[a-zA-Z]{0,12}", text in "[ a-zA-Z]{0,30}") {
        let target = TargetDescriptor::new(id).with_text(&text);
        let category = ActionCategory::classify(&target, &ElementIds::default());
        if category.is_monitored() && category != ActionCategory::SettingsSave {
            prop_assert!(category.remediation_target().is_some());
        }
    }
}

#[test]
fn test_generated_ids_unique_in_bulk() {
    let ids: std::collections::HashSet<InteractionId> =
        (0..1_000).map(|_| InteractionId::generate()).collect();
    assert_eq!(ids.len(), 1_000);
}
