use std::collections::HashMap;

use camp_portal::models::{CampgroundInput, ReviewInput};
use camp_portal::validate::{
    CAMPGROUND_SCHEMA, CREDENTIALS_SCHEMA, FieldValue, REVIEW_SCHEMA, validate,
};

// The schema evaluator in isolation: coercion, constraints, and the
// accumulate-all-violations behavior the 400 responses are built from.

fn payload(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn valid_campground_payload_coerces() {
    let raw = payload(&[
        ("title", "  Pine Ridge  "),
        ("location", "North Valley"),
        ("description", "Tall trees"),
        ("price", "25"),
    ]);
    let values = validate(&CAMPGROUND_SCHEMA, &raw).expect("payload should validate");

    // Text is trimmed, numbers are coerced.
    assert_eq!(values["title"], FieldValue::Text("Pine Ridge".to_string()));
    assert_eq!(values["price"], FieldValue::Number(25.0));

    let input = CampgroundInput::from_validated(&values);
    assert_eq!(input.title, "Pine Ridge");
    assert_eq!(input.description, "Tall trees");
    assert_eq!(input.price, 25.0);
}

#[test]
fn missing_required_fields_all_reported() {
    let violations = validate(&CAMPGROUND_SCHEMA, &payload(&[])).unwrap_err();
    let mut fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["location", "price", "title"]);
}

#[test]
fn whitespace_title_is_empty() {
    let raw = payload(&[("title", "   "), ("location", "Valley"), ("price", "1")]);
    let violations = validate(&CAMPGROUND_SCHEMA, &raw).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "title");
    assert_eq!(violations[0].message, "must not be empty");
}

#[test]
fn price_must_be_a_non_negative_number() {
    let raw = payload(&[("title", "Ridge"), ("location", "Valley"), ("price", "abc")]);
    let violations = validate(&CAMPGROUND_SCHEMA, &raw).unwrap_err();
    assert_eq!(violations[0].field, "price");
    assert_eq!(violations[0].message, "must be a number");

    let raw = payload(&[("title", "Ridge"), ("location", "Valley"), ("price", "-1")]);
    let violations = validate(&CAMPGROUND_SCHEMA, &raw).unwrap_err();
    assert_eq!(violations[0].field, "price");
    assert_eq!(violations[0].message, "must be at least 0");
}

#[test]
fn description_is_optional() {
    let raw = payload(&[("title", "Ridge"), ("location", "Valley"), ("price", "0")]);
    let values = validate(&CAMPGROUND_SCHEMA, &raw).expect("description may be absent");
    let input = CampgroundInput::from_validated(&values);
    assert_eq!(input.description, "");
}

#[test]
fn fields_outside_the_schema_are_ignored() {
    let raw = payload(&[
        ("title", "Ridge"),
        ("location", "Valley"),
        ("price", "5"),
        ("owner_id", "not-yours-to-set"),
    ]);
    let values = validate(&CAMPGROUND_SCHEMA, &raw).expect("extra fields are dropped");
    assert!(!values.contains_key("owner_id"));
}

#[test]
fn rating_must_be_an_integer_in_range() {
    for (rating, message) in [
        ("0", "must be at least 1"),
        ("6", "must be at most 5"),
        ("4.5", "must be an integer"),
        ("four", "must be an integer"),
    ] {
        let raw = payload(&[("rating", rating), ("body", "Great spot")]);
        let violations = validate(&REVIEW_SCHEMA, &raw).unwrap_err();
        assert_eq!(violations[0].field, "rating", "rating={rating}");
        assert_eq!(violations[0].message, message, "rating={rating}");
    }
}

#[test]
fn valid_review_payload_coerces() {
    let raw = payload(&[("rating", "4"), ("body", "  Great spot  ")]);
    let values = validate(&REVIEW_SCHEMA, &raw).expect("payload should validate");
    let input = ReviewInput::from_validated(&values);
    assert_eq!(input.rating, 4);
    assert_eq!(input.body, "Great spot");
}

#[test]
fn review_body_is_required() {
    let raw = payload(&[("rating", "4")]);
    let violations = validate(&REVIEW_SCHEMA, &raw).unwrap_err();
    assert_eq!(violations[0].field, "body");
    assert_eq!(violations[0].message, "is required");
}

#[test]
fn credentials_require_both_fields() {
    let violations = validate(&CREDENTIALS_SCHEMA, &payload(&[("username", "maya")])).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "password");
}

#[test]
fn violations_accumulate_across_fields() {
    let raw = payload(&[("rating", "9"), ("body", " ")]);
    let violations = validate(&REVIEW_SCHEMA, &raw).unwrap_err();
    assert_eq!(violations.len(), 2);
}
