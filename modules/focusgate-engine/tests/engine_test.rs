//! End-to-end decision pipeline tests.
//!
//! Every test drives a `DecisionEngine` over a `MemoryStore`, a `MockGate`
//! (deterministic remote answers with call counters) and a
//! `RecordingNavigator` (captures what a result reader could see at the
//! moment of each redirect). Time is passed explicitly.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;

use focusgate_common::{
    BlockHomepages, ContentItem, KeywordProfile, Mode, ProfileText, Settings, SourceKind,
    SurfaceId, SurfaceState, UrlRules, UserInstructions, VerdictSource,
};
use focusgate_engine::gate::RawKeywordMaps;
use focusgate_engine::testing::{forum_item, t0, video_item, MockGate, RecordingNavigator};
use focusgate_engine::{DecisionEngine, DecisionStore, EngineDeps, MemoryStore};

const REDIRECT: &str = "https://example.com/take-a-break";

struct Harness {
    store: Arc<MemoryStore>,
    gate: Arc<MockGate>,
    navigator: Arc<RecordingNavigator>,
    engine: Arc<DecisionEngine>,
}

fn harness(gate: MockGate, settings: Settings) -> Harness {
    let store = Arc::new(MemoryStore::with_settings(settings));
    let gate = Arc::new(gate);
    let navigator = Arc::new(RecordingNavigator::new(store.clone()));
    let engine = Arc::new(DecisionEngine::new(
        EngineDeps::builder()
            .store(store.clone())
            .gate(gate.clone())
            .navigator(navigator.clone())
            .redirect_url(REDIRECT)
            .build(),
    ));
    Harness {
        store,
        gate,
        navigator,
        engine,
    }
}

fn lenient() -> Settings {
    Settings {
        productive_content: "rust".into(),
        unwanted_content: "gaming".into(),
        ..Settings::default()
    }
}

fn strict() -> Settings {
    Settings {
        mode: Mode::Strict,
        ..lenient()
    }
}

fn profile(productive: &[(&str, &[&str])], unwanted: &[(&str, &[&str])]) -> KeywordProfile {
    fn split(entries: &[(&str, &[&str])]) -> (Vec<String>, BTreeMap<String, Vec<String>>) {
        let terms = entries.iter().map(|(t, _)| t.to_string()).collect();
        let raw = entries
            .iter()
            .map(|(t, kws)| (t.to_string(), kws.iter().map(|k| k.to_string()).collect()))
            .collect();
        (terms, raw)
    }
    let (p_terms, p_raw) = split(productive);
    let (u_terms, u_raw) = split(unwanted);
    KeywordProfile::normalized(&p_terms, &u_terms, &p_raw, &u_raw)
}

fn rust_video() -> ContentItem {
    ContentItem::builder()
        .source_kind(SourceKind::VideoSite)
        .identity_key("Fireship")
        .url("https://www.youtube.com/watch?v=rust100")
        .title("Rust in 100 seconds")
        .body_text("Why Rust? Because rust is fast. Rust!")
        .build()
}

fn gaming_video() -> ContentItem {
    ContentItem::builder()
        .source_kind(SourceKind::VideoSite)
        .identity_key("clipchannel")
        .url("https://www.youtube.com/watch?v=speed")
        .title("Speedrun gaming highlights")
        .body_text("gaming gaming")
        .build()
}

fn surface() -> SurfaceId {
    SurfaceId::from(42u64)
}

// ---------------------------------------------------------------------------
// Permanent blocklist
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocklisted_identity_blocks_without_remote_call() {
    let h = harness(MockGate::new().entertainment(false), lenient());
    h.store.add_to_blocklist("funnyclips").await.unwrap();

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("funnyclips", "a totally serious lecture"), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::PermanentBlocklist);
    assert_eq!(verdict.identity_key(), "funnyclips");
    assert_eq!(h.gate.classify_calls(), 0);
}

#[tokio::test]
async fn remote_block_is_learned_and_reused() {
    let h = harness(MockGate::new().entertainment(true), lenient());
    let item = video_item("prankchannel", "epic prank");

    let first = h.engine.classify_at(&surface(), &item, t0()).await.unwrap();
    assert_eq!(first.source(), VerdictSource::RemoteGate);
    assert!(first.is_entertainment());
    assert_eq!(h.engine.list_blocked().await.unwrap(), vec!["prankchannel"]);

    let second = h.engine.classify_at(&surface(), &item, t0()).await.unwrap();
    assert_eq!(second.source(), VerdictSource::PermanentBlocklist);
    assert_eq!(h.gate.dual_calls(), 1);
}

// ---------------------------------------------------------------------------
// Unblock and the temporary whitelist
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unblock_removes_identity_from_blocklist() {
    let h = harness(MockGate::new(), lenient());
    h.store.add_to_blocklist("funnyclips").await.unwrap();

    assert!(h.engine.unblock_at("funnyclips", t0()).await.unwrap());
    assert!(h.engine.list_blocked().await.unwrap().is_empty());
    assert!(!h.engine.remove("funnyclips").await.unwrap());
}

#[tokio::test]
async fn unblocked_identity_is_allowed_within_window_regardless_of_remote() {
    let h = harness(MockGate::new().entertainment(true), lenient());
    h.store.add_to_blocklist("funnyclips").await.unwrap();
    h.engine.unblock_at("funnyclips", t0()).await.unwrap();

    for minutes in [0, 1, 5, 9] {
        let verdict = h
            .engine
            .classify_at(
                &surface(),
                &video_item("funnyclips", "prank compilation"),
                t0() + Duration::minutes(minutes),
            )
            .await
            .unwrap();
        assert!(!verdict.is_entertainment(), "minute {minutes}");
        assert_eq!(verdict.source(), VerdictSource::TempWhitelist);
    }

    assert_eq!(h.gate.classify_calls(), 0);
    assert!(!h.store.is_blocked("funnyclips").await.unwrap());
}

#[tokio::test]
async fn unblock_during_classification_is_not_undone() {
    let store = Arc::new(MemoryStore::with_settings(lenient()));
    let gate = Arc::new(
        MockGate::new()
            .entertainment(true)
            .unblock_during_classify(store.clone(), "clipchannel", t0()),
    );
    let engine = DecisionEngine::new(
        EngineDeps::builder()
            .store(store.clone())
            .gate(gate.clone())
            .redirect_url(REDIRECT)
            .build(),
    );

    let verdict = engine
        .classify_at(&surface(), &gaming_video(), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert_eq!(gate.dual_calls(), 1);
    assert!(!store.is_blocked("clipchannel").await.unwrap());
    assert_eq!(store.whitelisted_at("clipchannel").await.unwrap(), Some(t0()));
}

#[tokio::test]
async fn whitelist_expires_after_ten_minutes() {
    let h = harness(MockGate::new().entertainment(true), lenient());
    h.engine.unblock_at("funnyclips", t0()).await.unwrap();

    let verdict = h
        .engine
        .classify_at(
            &surface(),
            &video_item("funnyclips", "prank compilation"),
            t0() + Duration::minutes(10),
        )
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert!(h.store.is_blocked("funnyclips").await.unwrap());
}

#[tokio::test]
async fn unblock_rejects_empty_key() {
    let h = harness(MockGate::new(), lenient());
    assert!(h.engine.unblock("  ").await.is_err());
}

// ---------------------------------------------------------------------------
// URL rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exact_url_rule_blocks_even_when_identity_is_whitelisted() {
    let item = video_item("Fireship", "Rust in 100 seconds");
    let settings = Settings {
        url_rules: UrlRules {
            exact: vec![item.url.clone()],
            prefix: vec![],
        },
        ..lenient()
    };
    let h = harness(MockGate::new().entertainment(false), settings);
    h.engine.unblock_at("Fireship", t0()).await.unwrap();

    let verdict = h.engine.classify_at(&surface(), &item, t0()).await.unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::UrlRule);
    assert_eq!(h.gate.classify_calls(), 0);
    // URL rules never teach the identity blocklist.
    assert!(!h.store.is_blocked("Fireship").await.unwrap());
}

#[tokio::test]
async fn prefix_rule_blocks_a_whole_community() {
    let settings = Settings {
        url_rules: UrlRules {
            exact: vec![],
            prefix: vec!["reddit.com/r/funny".into()],
        },
        ..lenient()
    };
    let h = harness(MockGate::new().entertainment(false), settings);

    let verdict = h
        .engine
        .classify_at(&surface(), &forum_item("funny", "cat", "lol"), t0())
        .await
        .unwrap();
    assert_eq!(verdict.source(), VerdictSource::UrlRule);

    let verdict = h
        .engine
        .classify_at(&surface(), &forum_item("rust", "borrowck", "lifetimes"), t0())
        .await
        .unwrap();
    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert!(!verdict.is_entertainment());
}

// ---------------------------------------------------------------------------
// Heuristic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dominant_productive_keywords_allow_without_remote_call() {
    let h = harness(MockGate::new().entertainment(true), lenient());
    h.store
        .set_keyword_profile(Some(profile(
            &[("rust", &["rust", "rustlang", "systems programming"])],
            &[],
        )))
        .await
        .unwrap();

    let verdict = h
        .engine
        .classify_at(&surface(), &rust_video(), t0())
        .await
        .unwrap();

    assert!(!verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::Heuristic);
    assert_eq!(h.gate.classify_calls(), 0);
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn heuristic_block_in_strict_mode_adds_to_blocklist() {
    let h = harness(MockGate::new().productive_match(true), strict());
    h.store
        .set_keyword_profile(Some(profile(&[("rust", &[])], &[("gaming", &["speedrun"])])))
        .await
        .unwrap();

    let verdict = h
        .engine
        .classify_at(&surface(), &gaming_video(), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::Heuristic);
    assert_eq!(h.gate.strict_calls(), 0);
    assert!(h.store.is_blocked("clipchannel").await.unwrap());
}

#[tokio::test]
async fn heuristic_block_in_lenient_mode_adds_to_blocklist() {
    let h = harness(MockGate::new().entertainment(false), lenient());
    h.store
        .set_keyword_profile(Some(profile(&[("rust", &[])], &[("gaming", &["speedrun"])])))
        .await
        .unwrap();

    let verdict = h
        .engine
        .classify_at(&surface(), &gaming_video(), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::Heuristic);
    assert_eq!(h.gate.dual_calls(), 0);
    assert!(h.store.is_blocked("clipchannel").await.unwrap());
    assert_eq!(h.navigator.redirects().len(), 1);
}

#[tokio::test]
async fn inconclusive_heuristic_falls_through_to_remote() {
    let h = harness(MockGate::new().entertainment(false), lenient());
    h.store
        .set_keyword_profile(Some(profile(&[("rust", &[])], &[("gaming", &[])])))
        .await
        .unwrap();

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("somebody", "rust vs gaming"), t0())
        .await
        .unwrap();

    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert_eq!(h.gate.dual_calls(), 1);
}

// ---------------------------------------------------------------------------
// Remote gate defaults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn strict_mode_blocks_when_gate_is_unavailable() {
    let h = harness(MockGate::new(), strict());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("somebody", "anything"), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGateDefault);
    assert_eq!(h.gate.strict_calls(), 1);
    assert!(h.store.is_blocked("somebody").await.unwrap());
}

#[tokio::test]
async fn lenient_mode_allows_when_gate_is_unavailable() {
    let h = harness(MockGate::new(), lenient());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("somebody", "anything"), t0())
        .await
        .unwrap();

    assert!(!verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGateDefault);
    assert_eq!(h.gate.dual_calls(), 1);
    assert!(h.engine.list_blocked().await.unwrap().is_empty());
}

#[tokio::test]
async fn strict_gate_allows_confirmed_productive_content() {
    let h = harness(MockGate::new().productive_match(true), strict());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("Ferris", "borrowck deep dive"), t0())
        .await
        .unwrap();

    assert!(!verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert_eq!(h.gate.last_strict_productive().as_deref(), Some("rust"));
    assert_eq!(h.gate.dual_calls(), 0);
}

#[tokio::test]
async fn strict_gate_blocks_unconfirmed_content() {
    let h = harness(MockGate::new().productive_match(false), strict());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("cooking", "pasta"), t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::RemoteGate);
    assert!(h.store.is_blocked("cooking").await.unwrap());
}

// ---------------------------------------------------------------------------
// Dropped items and surface results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn item_without_identity_produces_nothing() {
    let h = harness(MockGate::new().entertainment(true), lenient());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("   ", "no channel"), t0())
        .await;

    assert!(verdict.is_none());
    assert!(h.engine.get_verdict(&surface()).await.is_none());
    assert_eq!(h.gate.classify_calls(), 0);
    assert!(h.navigator.redirects().is_empty());
}

#[tokio::test]
async fn verdict_is_visible_before_redirect() {
    let h = harness(MockGate::new().entertainment(true), lenient());

    let verdict = h
        .engine
        .classify_at(&surface(), &video_item("prankchannel", "prank"), t0())
        .await
        .unwrap();

    let redirects = h.navigator.redirects();
    assert_eq!(redirects.len(), 1);
    assert_eq!(redirects[0].surface, surface());
    assert_eq!(redirects[0].target_url, REDIRECT);
    assert_eq!(
        redirects[0].visible_state,
        Some(SurfaceState::Decided { verdict })
    );
}

#[tokio::test]
async fn submit_runs_in_background_and_publishes_result() {
    let h = harness(MockGate::new().entertainment(false), lenient());

    let handle = h
        .engine
        .submit(surface(), video_item("Ferris", "lifetimes explained"));
    let verdict = handle.await.unwrap().unwrap();

    let state = h.engine.get_verdict(&surface()).await.unwrap();
    assert_eq!(state.verdict(), Some(&verdict));
}

#[tokio::test]
async fn later_classification_overwrites_surface_result() {
    let h = harness(MockGate::new(), strict());
    h.store.add_to_blocklist("first").await.unwrap();

    h.engine
        .classify_at(&surface(), &video_item("first", "a"), t0())
        .await
        .unwrap();
    h.engine.unblock_at("second", t0()).await.unwrap();
    let second = h
        .engine
        .classify_at(&surface(), &video_item("second", "b"), t0())
        .await
        .unwrap();

    let state = h.engine.get_verdict(&surface()).await.unwrap();
    assert_eq!(state.verdict(), Some(&second));
}

#[tokio::test]
async fn concurrent_tabs_add_the_same_identity_once() {
    let h = harness(MockGate::new().entertainment(true), lenient());

    let a = h
        .engine
        .submit(SurfaceId::from(1u64), video_item("prankchannel", "prank 1"));
    let b = h
        .engine
        .submit(SurfaceId::from(2u64), video_item("prankchannel", "prank 2"));
    assert!(a.await.unwrap().unwrap().is_entertainment());
    assert!(b.await.unwrap().unwrap().is_entertainment());

    assert_eq!(h.engine.list_blocked().await.unwrap(), vec!["prankchannel"]);
}

// ---------------------------------------------------------------------------
// Navigation pre-check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocked_homepage_redirects_without_touching_blocklist() {
    let settings = Settings {
        block_homepages: BlockHomepages {
            video_site: true,
            forum_site: false,
        },
        ..lenient()
    };
    let h = harness(MockGate::new(), settings);

    let verdict = h
        .engine
        .check_navigation_at(&surface(), "https://www.youtube.com/", t0())
        .await
        .unwrap();

    assert!(verdict.is_entertainment());
    assert_eq!(verdict.source(), VerdictSource::UrlRule);
    assert_eq!(verdict.identity_key(), "https://www.youtube.com/");
    assert!(h.engine.list_blocked().await.unwrap().is_empty());

    let redirects = h.navigator.redirects();
    assert_eq!(redirects.len(), 1);
    assert!(matches!(
        redirects[0].visible_state,
        Some(SurfaceState::Decided { .. })
    ));

    assert!(h
        .engine
        .check_navigation_at(&surface(), "https://www.reddit.com/", t0())
        .await
        .is_none());
}

#[tokio::test]
async fn navigation_to_redirect_target_is_never_blocked() {
    let settings = Settings {
        url_rules: UrlRules {
            exact: vec![],
            prefix: vec!["example.com".into()],
        },
        ..lenient()
    };
    let h = harness(MockGate::new(), settings);

    assert!(h
        .engine
        .check_navigation_at(&surface(), REDIRECT, t0())
        .await
        .is_none());
    assert!(h
        .engine
        .check_navigation_at(&surface(), "https://example.com/other", t0())
        .await
        .is_some());
}

// ---------------------------------------------------------------------------
// Profile updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_profile_stores_profile_and_guidance() {
    let instructions = UserInstructions {
        relevant_topics: vec!["systems programming".into()],
        entertainment_indicators: vec!["reaction videos".into()],
    };
    let maps = RawKeywordMaps {
        productive: [("rust".to_string(), vec!["cargo".to_string()])].into(),
        unwanted: [("gaming".to_string(), vec!["speedrun".to_string()])].into(),
    };
    let h = harness(
        MockGate::new()
            .with_expansion(maps)
            .with_instructions(instructions.clone())
            .entertainment(false),
        Settings::default(),
    );

    let available = h
        .engine
        .update_profile(ProfileText::new("rust", "gaming"))
        .await
        .unwrap();
    assert!(available);

    let settings = h.engine.settings().await.unwrap();
    assert_eq!(settings.productive_content, "rust");
    assert_eq!(settings.unwanted_content, "gaming");

    let stored = h.store.keyword_profile().await.unwrap().unwrap();
    assert!(stored.productive["rust"].contains("cargo"));
    assert!(stored.unwanted["gaming"].contains("speedrun"));

    // Guidance reaches the dual-list gate.
    h.engine
        .classify_at(&surface(), &video_item("somebody", "untitled"), t0())
        .await
        .unwrap();
    assert_eq!(h.gate.last_dual_instructions(), Some(instructions));
}

#[tokio::test]
async fn failed_expansion_clears_stale_profile() {
    let h = harness(MockGate::new(), Settings::default());
    h.store
        .set_keyword_profile(Some(profile(&[("old", &[])], &[])))
        .await
        .unwrap();

    let available = h
        .engine
        .update_profile(ProfileText::new("rust", ""))
        .await
        .unwrap();

    assert!(!available);
    assert!(h.store.keyword_profile().await.unwrap().is_none());
    assert_eq!(h.gate.expand_calls(), 1);
}
