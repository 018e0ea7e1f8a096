//! Repeated identical suggest calls against a settled store must return
//! identical results: command text, score, confidence, source, reasons,
//! and order.

use clai_testing::TestWorld;

#[test]
fn identical_context_yields_identical_results() {
    let world = TestWorld::new();
    let cwd = world.project_dir("det");
    let now = clai_runtime::now_ms();

    world.start_session("s1", &cwd, now - 60_000);
    for (i, cmd) in [
        "git status",
        "git diff",
        "cargo build",
        "cargo test",
        "ls -la",
        "git push origin main",
        "make install",
    ]
    .iter()
    .enumerate()
    {
        for rep in 0..(i as i64 % 3 + 1) {
            world.log_command("s1", &cwd, cmd, 0, now - 30_000 + i as i64 * 1_000 + rep);
        }
    }
    world.flush();

    let first = world.suggest("s1", &cwd, "").unwrap();
    assert!(!first.suggestions.is_empty());

    for call in 0..100 {
        let again = world.suggest("s1", &cwd, "").unwrap();
        assert_eq!(
            again.suggestions.len(),
            first.suggestions.len(),
            "call {}",
            call
        );
        for (a, b) in first.suggestions.iter().zip(again.suggestions.iter()) {
            assert_eq!(a.command, b.command, "call {}", call);
            assert_eq!(a.template_id, b.template_id, "call {}", call);
            assert_eq!(a.score.to_bits(), b.score.to_bits(), "call {}", call);
            assert_eq!(
                a.confidence.to_bits(),
                b.confidence.to_bits(),
                "call {}",
                call
            );
            assert_eq!(a.source, b.source, "call {}", call);
            assert_eq!(a.risk, b.risk, "call {}", call);
            assert_eq!(a.reasons, b.reasons, "call {}", call);
        }
    }
}

#[test]
fn second_call_is_served_from_cache() {
    let world = TestWorld::new();
    let cwd = world.project_dir("cache");
    let now = clai_runtime::now_ms();

    world.start_session("s1", &cwd, now - 10_000);
    world.log_command("s1", &cwd, "git status", 0, now - 1_000);
    world.flush();

    let first = world.suggest("s1", &cwd, "git").unwrap();
    assert!(!first.from_cache);

    let second = world.suggest("s1", &cwd, "git").unwrap();
    assert!(second.from_cache);
    assert_eq!(
        first.suggestions.len(),
        second.suggestions.len(),
        "cache must not change the result set"
    );
}

#[test]
fn suggestions_are_sorted_by_score_with_stable_ties() {
    let world = TestWorld::new();
    let cwd = world.project_dir("order");
    let now = clai_runtime::now_ms();

    world.start_session("s1", &cwd, now - 60_000);
    for cmd in ["alpha run", "bravo run", "charlie run"] {
        world.log_command("s1", &cwd, cmd, 0, now - 5_000);
    }
    world.log_command("s1", &cwd, "alpha run", 0, now - 4_000);
    world.flush();

    let response = world.suggest("s1", &cwd, "").unwrap();
    let scores: Vec<f64> = response.suggestions.iter().map(|s| s.score).collect();
    for pair in scores.windows(2) {
        assert!(
            pair[0] >= pair[1],
            "scores must be non-increasing: {:?}",
            scores
        );
    }

    for suggestion in &response.suggestions {
        assert!(
            (0.0..=1.0).contains(&suggestion.confidence),
            "confidence out of bounds: {}",
            suggestion.confidence
        );
    }
}
