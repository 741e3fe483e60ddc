//! Unit tests for the model router: filtering, strategies, health-driven
//! status transitions, and the admission peek.

use std::collections::HashSet;
use std::time::Duration;

use novellus_domain::entities::RateLimits;
use novellus_domain::value_objects::{Capability, ModelId, ModelStatus, RouteStrategy};

use crate::support::{descriptor, router_for, unlimited};

#[tokio::test]
async fn round_robin_cycles_through_eligible_models() {
    let models = vec![
        descriptor("a", "scripted", 1e-6, 1, unlimited()),
        descriptor("b", "scripted", 1e-6, 1, unlimited()),
        descriptor("c", "scripted", 1e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::RoundRobin).await;

    let none_tried = HashSet::new();
    let mut seen = Vec::new();
    for _ in 0..6 {
        let model = router
            .select(Capability::Completion, None, &none_tried, 10)
            .await
            .expect("a model");
        seen.push(model.as_str().to_owned());
    }
    assert_eq!(seen[0..3], seen[3..6]);
    let distinct: HashSet<&String> = seen.iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn capability_and_status_filters_apply() {
    let mut disabled = descriptor("off", "scripted", 1e-6, 9, unlimited());
    disabled.status = ModelStatus::Disabled;
    let mut embed_only = descriptor("embedder", "scripted", 1e-6, 9, unlimited());
    embed_only.capabilities = vec![Capability::Embedding];
    let models = vec![
        disabled,
        embed_only,
        descriptor("live", "scripted", 1e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::RoundRobin).await;

    let selected = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(selected, Some(ModelId::from("live")));

    let for_embedding = router
        .select(Capability::Embedding, None, &HashSet::new(), 10)
        .await;
    assert_eq!(for_embedding, Some(ModelId::from("embedder")));
}

#[tokio::test]
async fn tried_models_are_excluded() {
    let models = vec![
        descriptor("a", "scripted", 1e-6, 1, unlimited()),
        descriptor("b", "scripted", 2e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::CostOptimized).await;

    let first = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(first, Some(ModelId::from("a")));

    let mut tried = HashSet::new();
    tried.insert(ModelId::from("a"));
    let second = router
        .select(Capability::Completion, None, &tried, 10)
        .await;
    assert_eq!(second, Some(ModelId::from("b")));

    tried.insert(ModelId::from("b"));
    assert!(
        router
            .select(Capability::Completion, None, &tried, 10)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn hint_wins_when_admissible() {
    let models = vec![
        descriptor("cheap", "scripted", 1e-7, 1, unlimited()),
        descriptor("hinted", "scripted", 5e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::CostOptimized).await;

    let hint = ModelId::from("hinted");
    let selected = router
        .select(Capability::Completion, Some(&hint), &HashSet::new(), 10)
        .await;
    assert_eq!(selected, Some(hint));
}

#[tokio::test]
async fn least_latency_prefers_the_faster_model() {
    let models = vec![
        descriptor("slow", "scripted", 1e-6, 1, unlimited()),
        descriptor("fast", "scripted", 1e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::LeastLatency).await;

    for _ in 0..8 {
        router.record_outcome(&ModelId::from("slow"), Duration::from_millis(900), true);
        router.record_outcome(&ModelId::from("fast"), Duration::from_millis(30), true);
    }

    let selected = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(selected, Some(ModelId::from("fast")));
}

#[tokio::test]
async fn adaptive_prefers_the_healthier_model() {
    let models = vec![
        descriptor("flaky", "scripted", 1e-6, 1, unlimited()),
        descriptor("steady", "scripted", 1e-6, 1, unlimited()),
    ];
    let (router, _) = router_for(models, RouteStrategy::Adaptive).await;

    for i in 0..16 {
        router.record_outcome(
            &ModelId::from("flaky"),
            Duration::from_millis(50),
            i % 4 == 0,
        );
        router.record_outcome(&ModelId::from("steady"), Duration::from_millis(50), true);
    }

    let selected = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(selected, Some(ModelId::from("steady")));
}

#[tokio::test]
async fn repeated_failures_degrade_but_keep_model_selectable() {
    let models = vec![descriptor("only", "scripted", 1e-6, 1, unlimited())];
    let (router, _) = router_for(models, RouteStrategy::RoundRobin).await;
    let model = ModelId::from("only");

    for _ in 0..10 {
        router.record_outcome(&model, Duration::from_millis(40), false);
    }

    let report = router.health_report();
    assert_eq!(report[0].status, ModelStatus::Degraded);
    assert!(report[0].health.success_rate < 0.5);
    assert!(report[0].health.last_error_at.is_some());

    // Degraded models still pass the status filter.
    let selected = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(selected, Some(model));
}

#[tokio::test]
async fn admission_peek_skips_exhausted_models() {
    let models = vec![
        descriptor(
            "tiny-budget",
            "scripted",
            1e-7,
            1,
            RateLimits {
                rpm: 1,
                tpm: 0,
                rpd: 0,
            },
        ),
        descriptor("roomy", "scripted", 5e-6, 1, unlimited()),
    ];
    let (router, limiter) = router_for(models, RouteStrategy::CostOptimized).await;

    // Cheapest first while its window is open.
    let first = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(first, Some(ModelId::from("tiny-budget")));

    // Consume its one-request window for real.
    use novellus_domain::ports::providers::RateLimiterProvider;
    assert!(
        limiter
            .try_acquire(&ModelId::from("tiny-budget"), 10)
            .await
            .unwrap()
            .is_admitted()
    );

    let second = router
        .select(Capability::Completion, None, &HashSet::new(), 10)
        .await;
    assert_eq!(second, Some(ModelId::from("roomy")));
}
