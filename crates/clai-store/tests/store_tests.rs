use clai_store::{AggregateTuning, ApplyOutcome, EventApply, NewCommandEvent, Store};
use clai_types::{QueryFilter, Session, SlotKind, SlotValue};

const HOUR_MS: i64 = 3_600_000;

fn new_event(session: &str, command: &str, cmd: &str, exit_code: i32, ts_ms: i64) -> NewCommandEvent {
    NewCommandEvent {
        session_id: session.to_string(),
        command_id: command.to_string(),
        ts_ms,
        cwd: "/home/dev/project".to_string(),
        repo_key: None,
        branch: None,
        cmd_raw: cmd.to_string(),
        cmd_norm: cmd.to_string(),
        cmd_truncated: false,
        template_id: format!("tmpl-{}", cmd.replace(' ', "-")),
        exit_code: Some(exit_code),
        duration_ms: Some(12),
    }
}

fn apply_for(event: NewCommandEvent, scopes: &[&str]) -> EventApply {
    EventApply {
        event,
        slots: Vec::new(),
        prev_template_id: None,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        tuning: AggregateTuning::default(),
        defer_decay: false,
    }
}

#[test]
fn apply_then_duplicate_is_noop() {
    let mut store = Store::open_in_memory().unwrap();

    let apply = apply_for(new_event("s1", "c1", "git status", 0, 1_000), &["global"]);
    let first = store.apply_command_end(&apply).unwrap();
    assert!(matches!(first, ApplyOutcome::Applied(_)));

    let second = store.apply_command_end(&apply).unwrap();
    assert_eq!(second, ApplyOutcome::Duplicate);

    assert_eq!(store.event_count().unwrap(), 1);
    let stats = store.top_stats("global", None, 10).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].success_count, 1);
    assert_eq!(stats[0].failure_count, 0);
}

#[test]
fn aggregates_share_the_event_timestamp() {
    let mut store = Store::open_in_memory().unwrap();

    let mut apply = apply_for(
        new_event("s1", "c1", "make test", 1, 42_000),
        &["global", "session:s1", "dir:/home/dev/project"],
    );
    apply.prev_template_id = Some("tmpl-prev".to_string());
    apply.slots.push(SlotValue {
        index: 2,
        kind: SlotKind::Path,
        value: "/tmp/x".to_string(),
    });
    store.apply_command_end(&apply).unwrap();

    for scope in ["global", "session:s1", "dir:/home/dev/project"] {
        let stats = store.top_stats(scope, None, 10).unwrap();
        assert_eq!(stats.len(), 1, "scope {}", scope);
        assert_eq!(stats[0].last_seen_ms, 42_000, "scope {}", scope);
        assert_eq!(stats[0].failure_count, 1);

        let transitions = store.transitions_from(scope, "tmpl-prev", None, 10).unwrap();
        assert_eq!(transitions.len(), 1, "scope {}", scope);
        assert_eq!(transitions[0].last_seen_ms, 42_000);

        let slots = store.slot_values(scope, "tmpl-make-test").unwrap();
        assert_eq!(slots.len(), 1, "scope {}", scope);
        assert_eq!(slots[0].last_seen_ms, 42_000);
    }

    let template = store.template_by_id("tmpl-make-test").unwrap().unwrap();
    assert_eq!(template.first_seen_ms, 42_000);
    assert_eq!(template.last_seen_ms, 42_000);
}

#[test]
fn last_seen_never_regresses() {
    let mut store = Store::open_in_memory().unwrap();

    store
        .apply_command_end(&apply_for(new_event("s1", "c1", "ls", 0, 5_000), &["global"]))
        .unwrap();
    // Late-arriving event with an older timestamp.
    store
        .apply_command_end(&apply_for(new_event("s1", "c2", "ls", 0, 3_000), &["global"]))
        .unwrap();

    let stats = store.top_stats("global", None, 10).unwrap();
    assert_eq!(stats[0].last_seen_ms, 5_000);
    assert_eq!(stats[0].success_count, 2);
}

#[test]
fn score_decays_between_writes() {
    let mut store = Store::open_in_memory().unwrap();
    let half_life = AggregateTuning::default().half_life_ms;

    store
        .apply_command_end(&apply_for(new_event("s1", "c1", "ls", 0, 0), &["global"]))
        .unwrap();
    // One half-life later the first hit is worth 0.5.
    store
        .apply_command_end(&apply_for(new_event("s1", "c2", "ls", 0, half_life), &["global"]))
        .unwrap();

    let stats = store.top_stats("global", None, 10).unwrap();
    assert!((stats[0].score - 1.5).abs() < 1e-6, "score {}", stats[0].score);
}

#[test]
fn slot_values_are_lru_capped() {
    let mut store = Store::open_in_memory().unwrap();

    for i in 0..30 {
        let mut apply = apply_for(
            new_event("s1", &format!("c{}", i), "cat <PATH>", 0, 1_000 + i),
            &["global"],
        );
        apply.slots.push(SlotValue {
            index: 1,
            kind: SlotKind::Path,
            value: format!("/tmp/file-{}", i),
        });
        store.apply_command_end(&apply).unwrap();
    }

    let slots = store.slot_values("global", "tmpl-cat-<PATH>").unwrap();
    assert_eq!(slots.len(), 20);
    // Oldest values were evicted.
    assert!(!slots.iter().any(|s| s.value == "/tmp/file-0"));
    assert!(slots.iter().any(|s| s.value == "/tmp/file-29"));
}

#[test]
fn prefix_filter_on_top_stats() {
    let mut store = Store::open_in_memory().unwrap();

    for (i, cmd) in ["git status", "git diff", "make build"].iter().enumerate() {
        store
            .apply_command_end(&apply_for(
                new_event("s1", &format!("c{}", i), cmd, 0, 1_000),
                &["global"],
            ))
            .unwrap();
    }

    let git = store.top_stats("global", Some("git"), 10).unwrap();
    assert_eq!(git.len(), 2);
    assert!(git.iter().all(|row| row.cmd_norm.starts_with("git")));

    let all = store.top_stats("global", None, 10).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn query_commands_filters_compose() {
    let mut store = Store::open_in_memory().unwrap();

    store
        .apply_command_end(&apply_for(new_event("s1", "c1", "git status", 0, 1_000), &["global"]))
        .unwrap();
    store
        .apply_command_end(&apply_for(new_event("s1", "c2", "make test", 1, 2_000), &["global"]))
        .unwrap();
    store
        .apply_command_end(&apply_for(new_event("s2", "c1", "git push", 0, 3_000), &["global"]))
        .unwrap();

    let mut filter = QueryFilter::default();
    filter.session_id = Some("s1".to_string());
    let rows = store.query_commands(&filter).unwrap();
    assert_eq!(rows.len(), 2);
    // Recent first.
    assert_eq!(rows[0].cmd_raw, "make test");

    let mut filter = QueryFilter::default();
    filter.failure_only = true;
    let rows = store.query_commands(&filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cmd_raw, "make test");

    let mut filter = QueryFilter::default();
    filter.prefix = Some("git".to_string());
    filter.success_only = true;
    let rows = store.query_commands(&filter).unwrap();
    assert_eq!(rows.len(), 2);

    let mut filter = QueryFilter::default();
    filter.substring = Some("push".to_string());
    let rows = store.query_commands(&filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].session_id, "s2");
}

#[test]
fn session_prefix_resolution() {
    let mut store = Store::open_in_memory().unwrap();

    for id in ["abc-111", "abd-222"] {
        store
            .upsert_session(&Session {
                id: id.to_string(),
                shell: None,
                host: None,
                user: None,
                started_ms: 0,
                ended_ms: None,
                project_types: Vec::new(),
            })
            .unwrap();
    }

    assert_eq!(
        store.resolve_session_prefix("abc").unwrap(),
        Some("abc-111".to_string())
    );
    assert_eq!(store.resolve_session_prefix("zzz").unwrap(), None);
    assert!(matches!(
        store.resolve_session_prefix("ab"),
        Err(clai_store::Error::AmbiguousPrefix(_))
    ));
}

#[test]
fn session_end_round_trip() {
    let mut store = Store::open_in_memory().unwrap();

    store
        .upsert_session(&Session {
            id: "s1".to_string(),
            shell: Some("zsh".to_string()),
            host: None,
            user: None,
            started_ms: 100,
            ended_ms: None,
            project_types: vec!["rust".to_string()],
        })
        .unwrap();

    assert!(store.end_session("s1", 200).unwrap());
    assert!(!store.end_session("missing", 200).unwrap());

    let session = store.get_session("s1").unwrap().unwrap();
    assert_eq!(session.ended_ms, Some(200));
    assert_eq!(session.project_types, vec!["rust".to_string()]);
}

#[test]
fn prune_by_age_and_count() {
    let mut store = Store::open_in_memory().unwrap();

    for i in 0..10 {
        store
            .apply_command_end(&apply_for(
                new_event("s1", &format!("c{}", i), "ls", 0, i * HOUR_MS),
                &["global"],
            ))
            .unwrap();
    }

    // Age cutoff drops the first three, max rows keeps the newest five.
    let removed = store.prune_events(3 * HOUR_MS, 5).unwrap();
    assert_eq!(removed, 5);
    assert_eq!(store.event_count().unwrap(), 5);

    let rows = store.query_commands(&QueryFilter::default()).unwrap();
    assert_eq!(rows[0].ts_ms, 9 * HOUR_MS);
    assert_eq!(rows[rows.len() - 1].ts_ms, 5 * HOUR_MS);
}

#[test]
fn feedback_and_dismissals_accumulate() {
    let mut store = Store::open_in_memory().unwrap();
    let scopes = vec!["global".to_string(), "session:s1".to_string()];

    store
        .record_feedback(&scopes, "tmpl-x", "dismissed", 1_000)
        .unwrap();
    store
        .record_feedback(&scopes, "tmpl-x", "dismissed", 2_000)
        .unwrap();
    store
        .record_feedback(&scopes, "tmpl-x", "accepted", 3_000)
        .unwrap();

    let dismissals = store.dismissals_for_scope("global").unwrap();
    assert_eq!(dismissals, vec![("tmpl-x".to_string(), 2)]);

    let dismissals = store.dismissals_for_scope("session:s1").unwrap();
    assert_eq!(dismissals[0].1, 2);
}

#[test]
fn reader_sees_writer_commits_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("state.db");

    let mut writer = Store::open(&db_path).unwrap();
    writer
        .apply_command_end(&apply_for(new_event("s1", "c1", "git status", 0, 1_000), &["global"]))
        .unwrap();

    let reader = Store::open_reader(&db_path).unwrap();
    let stats = reader.top_stats("global", None, 10).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].cmd_norm, "git status");
}

#[test]
fn meta_round_trip() {
    let mut store = Store::open_in_memory().unwrap();
    assert_eq!(store.meta_get("import:zsh").unwrap(), None);
    store.meta_set("import:zsh", "1700000000").unwrap();
    assert_eq!(
        store.meta_get("import:zsh").unwrap(),
        Some("1700000000".to_string())
    );
    store.meta_set("import:zsh", "1800000000").unwrap();
    assert_eq!(
        store.meta_get("import:zsh").unwrap(),
        Some("1800000000".to_string())
    );
}
