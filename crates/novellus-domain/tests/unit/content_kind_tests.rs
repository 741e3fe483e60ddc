//! Unit tests for the ContentKind closed set

use std::str::FromStr;

use novellus_domain::value_objects::ContentKind;
use rstest::*;

#[rstest]
#[case(ContentKind::Text, "text")]
#[case(ContentKind::LawChain, "law_chain")]
#[case(ContentKind::Character, "character")]
#[case(ContentKind::Scene, "scene")]
#[case(ContentKind::Dialogue, "dialogue")]
fn as_str_round_trips_through_from_str(#[case] kind: ContentKind, #[case] s: &str) {
    assert_eq!(kind.as_str(), s);
    assert_eq!(ContentKind::from_str(s).unwrap(), kind);
}

#[test]
fn unknown_kind_is_rejected() {
    assert!(ContentKind::from_str("hologram").is_err());
}

#[test]
fn closed_set_has_nine_members() {
    assert_eq!(ContentKind::get_all().len(), 9);
}

#[test]
fn serde_uses_snake_case() {
    let json = serde_json::to_string(&ContentKind::LawChain).unwrap();
    assert_eq!(json, "\"law_chain\"");
    let back: ContentKind = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ContentKind::LawChain);
}
