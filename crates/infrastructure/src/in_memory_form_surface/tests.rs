use std::collections::BTreeMap;

use serde_json::json;
use tenderform_application::{FieldAccessor, FieldValueProvider, RuleEngine};
use tenderform_core::AppError;
use tenderform_domain::{FieldValue, FormSchema, OptionItem};

use super::InMemoryFormSurface;

fn schema() -> FormSchema {
    serde_json::from_value(json!({
        "fields": [
            {"name": "tags", "label": "标签", "type": "checkbox-group",
             "options": [{"label": "甲", "value": "a"}, {"label": "乙", "value": "b"},
                         {"label": "丙", "value": "c"}]},
            {"name": "agree", "label": "同意条款", "type": "checkbox"},
            {"name": "method", "label": "方式", "type": "radio", "options": "线上,线下"},
            {"name": "province", "label": "省份", "type": "select", "options": "广东,浙江"},
            {"name": "city", "label": "城市", "type": "select", "options": "广州,深圳,杭州"},
            {"name": "lots", "label": "标段", "type": "select-multiple", "options": "一,二,三"},
            {"name": "memo", "label": "备注", "type": "textarea", "default_value": "无"}
        ],
        "conditional_rules": [
            {"name": "同意后锁定备注", "definition": {
                "if": {"field": "agree", "operator": "equals", "value": "是"},
                "then": [{"action": "disable", "targets": ["memo"]}]}},
            {"name": "广东城市", "definition": {
                "if": {"field": "province", "operator": "equals", "value": "广东"},
                "then": [{"action": "filter_options", "targets": ["city"],
                          "filter_value": "广东", "options": ["广州", "深圳"]}]}}
        ]
    }))
    .unwrap_or_else(|_| unreachable!())
}

fn text(surface: &InMemoryFormSurface, name: &str) -> String {
    surface
        .field_value(name)
        .map(|value| value.raw_text())
        .unwrap_or_default()
}

#[test]
fn checkbox_group_joins_checked_values_in_document_order() {
    let mut surface = InMemoryFormSurface::from_schema(&schema(), &BTreeMap::new());

    assert!(surface.toggle_option("tags", "b", true).is_ok());
    assert!(surface.toggle_option("tags", "a", true).is_ok());

    assert_eq!(surface.field_value("tags"), Some(FieldValue::text("a,b")));
}

#[test]
fn renders_stored_values_and_defaults() {
    let stored = BTreeMap::from([
        ("agree".to_owned(), "True".to_owned()),
        ("method".to_owned(), "线下".to_owned()),
        ("lots".to_owned(), "三,一".to_owned()),
    ]);
    let surface = InMemoryFormSurface::from_schema(&schema(), &stored);

    assert_eq!(surface.field_value("agree"), Some(FieldValue::Checked(true)));
    assert_eq!(text(&surface, "method"), "线下");
    assert_eq!(text(&surface, "lots"), "一,三");
    assert_eq!(text(&surface, "memo"), "无");
    assert_eq!(text(&surface, "province"), "");
}

#[test]
fn enter_value_only_accepts_offered_options() {
    let mut surface = InMemoryFormSurface::from_schema(&schema(), &BTreeMap::new());

    assert!(surface.enter_value("province", "广东").is_ok());
    assert!(matches!(
        surface.enter_value("province", "北京"),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        surface.enter_value("missing", "x"),
        Err(AppError::NotFound(_))
    ));
    assert!(surface.enter_value("agree", "是").is_ok());
    assert_eq!(surface.field_value("agree"), Some(FieldValue::Checked(true)));
}

#[test]
fn disabled_controls_reject_user_edits() {
    let mut surface = InMemoryFormSurface::from_schema(&schema(), &BTreeMap::new());
    surface.set_disabled("memo", true);

    assert!(matches!(
        surface.enter_value("memo", "改动"),
        Err(AppError::Conflict(_))
    ));
}

#[test]
fn replacing_options_clears_selection_that_went_away() {
    let mut surface = InMemoryFormSurface::from_schema(&schema(), &BTreeMap::new());
    assert!(surface.enter_value("city", "杭州").is_ok());
    assert!(surface.enter_value("lots", "一,二").is_ok());

    surface.set_options("city", &[OptionItem::plain("广州")]);
    surface.set_options("lots", &[OptionItem::plain("二")]);

    assert_eq!(text(&surface, "city"), "");
    assert_eq!(text(&surface, "lots"), "二");
    assert!(surface.options("memo").is_none());
}

#[test]
fn drives_rule_engine_end_to_end() {
    let schema = schema();
    let mut surface = InMemoryFormSurface::from_schema(&schema, &BTreeMap::new());
    let engine = RuleEngine::initialize(&schema, &mut surface);
    engine.evaluate_all(&mut surface);

    assert!(surface.set_checked("agree", true).is_ok());
    assert!(surface.enter_value("province", "广东").is_ok());
    assert!(surface.enter_value("city", "杭州").is_ok());
    engine.evaluate_all(&mut surface);

    let snapshot = surface.snapshot();
    assert!(snapshot["memo"].state.disabled);
    assert_eq!(
        snapshot["city"].options.clone().unwrap_or_default(),
        vec!["广州", "深圳"]
    );
    assert_eq!(snapshot["city"].value, FieldValue::text(""));

    assert!(surface.set_checked("agree", false).is_ok());
    assert!(surface.enter_value("province", "浙江").is_ok());
    engine.evaluate_all(&mut surface);

    let snapshot = surface.snapshot();
    assert!(!snapshot["memo"].state.disabled);
    assert_eq!(
        snapshot["city"].options.clone().unwrap_or_default(),
        vec!["广州", "深圳", "杭州"]
    );
}
