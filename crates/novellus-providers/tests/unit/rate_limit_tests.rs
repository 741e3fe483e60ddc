//! Unit tests for the local token-bucket rate limiter.

use chrono::Utc;
use novellus_domain::entities::RateLimits;
use novellus_domain::error::Error;
use novellus_domain::ports::providers::{Admission, RateLimiterProvider};
use novellus_domain::value_objects::ModelId;
use novellus_providers::rate_limit::LocalRateLimiter;

fn limits(rpm: u32, tpm: u32, rpd: u32) -> RateLimits {
    RateLimits { rpm, tpm, rpd }
}

#[tokio::test]
async fn admissions_never_exceed_rpm_in_a_window() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(10, 0, 0))
        .await
        .unwrap();

    let mut admitted = 0;
    for _ in 0..25 {
        if limiter
            .try_acquire(&model, 100)
            .await
            .unwrap()
            .is_admitted()
        {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 10);
}

#[tokio::test]
async fn denial_carries_earliest_admission_time() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(1, 0, 0))
        .await
        .unwrap();

    assert!(
        limiter
            .try_acquire(&model, 10)
            .await
            .unwrap()
            .is_admitted()
    );
    match limiter.try_acquire(&model, 10).await.unwrap() {
        Admission::Denied { retry_at } => {
            assert!(retry_at > Utc::now());
            // One request against rpm=1 refills within a minute.
            assert!(retry_at <= Utc::now() + chrono::Duration::seconds(61));
        }
        Admission::Admitted => panic!("second request should be denied"),
    }
}

#[tokio::test]
async fn token_window_limits_large_requests() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(0, 1000, 0))
        .await
        .unwrap();

    assert!(
        limiter
            .try_acquire(&model, 800)
            .await
            .unwrap()
            .is_admitted()
    );
    // 800 of 1000 tokens consumed: a 500-token request must wait.
    assert!(
        !limiter
            .try_acquire(&model, 500)
            .await
            .unwrap()
            .is_admitted()
    );
    assert!(!limiter.would_admit(&model, 500).await.unwrap());
    assert!(limiter.would_admit(&model, 100).await.unwrap());
}

#[tokio::test]
async fn reconcile_charges_actuals_and_reports_overdraft() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(0, 1000, 0))
        .await
        .unwrap();

    assert!(
        limiter
            .try_acquire(&model, 100)
            .await
            .unwrap()
            .is_admitted()
    );

    // The call actually consumed far more than estimated.
    let usage = limiter.reconcile(&model, 100, 1500).await.unwrap();
    assert!(usage.overdrawn);
    assert!(usage.tokens_this_minute >= 1000);

    // While overdrawn, nothing is admitted.
    assert!(!limiter.would_admit(&model, 1).await.unwrap());
}

#[tokio::test]
async fn overestimates_are_refunded() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(0, 1000, 0))
        .await
        .unwrap();

    assert!(
        limiter
            .try_acquire(&model, 900)
            .await
            .unwrap()
            .is_admitted()
    );
    let usage = limiter.reconcile(&model, 900, 200).await.unwrap();
    assert!(!usage.overdrawn);
    assert!(usage.tokens_this_minute <= 250);
    assert!(limiter.would_admit(&model, 700).await.unwrap());
}

#[tokio::test]
async fn unknown_model_is_an_error() {
    let limiter = LocalRateLimiter::new();
    let err = limiter
        .try_acquire(&ModelId::from("ghost"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownModel { .. }));

    assert!(
        limiter
            .usage(&ModelId::from("ghost"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn daily_window_is_tracked_separately() {
    let limiter = LocalRateLimiter::new();
    let model = ModelId::from("model-a");
    limiter
        .register_model(&model, limits(0, 0, 2))
        .await
        .unwrap();

    assert!(limiter.try_acquire(&model, 1).await.unwrap().is_admitted());
    assert!(limiter.try_acquire(&model, 1).await.unwrap().is_admitted());
    match limiter.try_acquire(&model, 1).await.unwrap() {
        Admission::Denied { retry_at } => {
            // Day-window refill: the retry time is far out.
            assert!(retry_at > Utc::now() + chrono::Duration::minutes(30));
        }
        Admission::Admitted => panic!("third request should be denied"),
    }

    let usage = limiter.usage(&model).await.unwrap().unwrap();
    assert_eq!(usage.requests_today, 2);
}
