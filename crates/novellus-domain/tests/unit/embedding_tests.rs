//! Unit tests for the Embedding value object and vector math

use novellus_domain::value_objects::{Embedding, confidence_bucket, cosine_score, l2_distance};
use novellus_domain::{Error, content_hash};
use rstest::*;

#[rstest]
#[case(vec![0.1, 0.2, 0.3, 0.4, 0.5], "text-embedding-ada-002", 5)]
#[case(vec![0.1; 10], "text-embedding-3-small", 10)]
#[case(vec![0.0; 1536], "large-model", 1536)]
fn embedding_creation_derives_dimensions(
    #[case] vector: Vec<f32>,
    #[case] model: &str,
    #[case] dimensions: usize,
) {
    let embedding = Embedding::new(vector.clone(), model);
    assert_eq!(embedding.vector, vector);
    assert_eq!(embedding.model, model);
    assert_eq!(embedding.dimensions, dimensions);
    assert!(embedding.check_dimensions(dimensions).is_ok());
}

#[test]
fn dimension_check_rejects_mismatch() {
    let embedding = Embedding::new(vec![0.0; 768], "test");
    let err = embedding.check_dimensions(1536).unwrap_err();
    assert!(matches!(
        err,
        Error::Dimension {
            expected: 1536,
            actual: 768
        }
    ));
}

// Property: cosine scores stay inside [0, 1] for arbitrary vector pairs,
// and L2 distances are never negative.
#[rstest]
#[case(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0])]
#[case(vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0])]
#[case(vec![-1.0, -2.0, -3.0], vec![1.0, 2.0, 3.0])]
#[case(vec![0.5, -0.5, 0.25], vec![100.0, 200.0, -50.0])]
#[case(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0])]
fn similarity_bounds_hold(#[case] a: Vec<f32>, #[case] b: Vec<f32>) {
    let score = cosine_score(&a, &b).unwrap();
    assert!((0.0..=1.0).contains(&score), "score {score} out of bounds");

    let distance = l2_distance(&a, &b).unwrap();
    assert!(distance >= 0.0);
}

#[rstest]
#[case(0.95, 0.95)]
#[case(0.9, 0.95)]
#[case(0.85, 0.85)]
#[case(0.8, 0.85)]
#[case(0.75, 0.75)]
#[case(0.7, 0.75)]
#[case(0.69, 0.60)]
#[case(0.0, 0.60)]
fn confidence_buckets_follow_score(#[case] score: f64, #[case] expected: f64) {
    assert_eq!(confidence_bucket(score), expected);
}

#[test]
fn content_hash_is_stable_across_calls() {
    let text = "命运链能够预见概率";
    assert_eq!(content_hash(text), content_hash(text));
    assert_eq!(content_hash(text).len(), 64);
}
