use proptest::prelude::*;
use serde_json::{Value, json};
use tenderform_domain::{FieldValue, FormSchema};

use super::RuleEngine;
use crate::test_support::FakeSurface;

fn schema(value: Value) -> FormSchema {
    serde_json::from_value(value).unwrap_or_else(|_| unreachable!())
}

fn province_city_schema() -> FormSchema {
    schema(json!({
        "fields": [
            {"name": "province", "label": "省份", "type": "select", "options": "广东,浙江,北京"},
            {"name": "city", "label": "城市", "type": "select", "options": "广州,深圳,杭州,北京"},
            {"name": "capitalNote", "label": "首都说明", "type": "textarea"}
        ],
        "conditional_rules": [
            {"name": "首都说明", "definition": {
                "if": {"field": "city", "operator": "equals", "value": "北京"},
                "then": [{"action": "show", "targets": ["capitalNote"]}]}},
            {"name": "广东城市", "definition": {
                "if": {"field": "province", "operator": "equals", "value": "广东"},
                "then": [{"action": "filter_options", "targets": ["city"],
                          "filter_value": "广东", "options": ["广州", "深圳"]}]}}
        ]
    }))
}

fn date_schema(message: Option<&str>) -> FormSchema {
    let mut action = json!({
        "action": "validate_comparison",
        "targets": ["startDate"],
        "comparison_field": "endDate",
        "operator": "less_than_or_equals"
    });
    if let Some(message) = message {
        action["message"] = json!(message);
    }

    schema(json!({
        "fields": [
            {"name": "startDate", "label": "开始日期", "type": "date"},
            {"name": "endDate", "label": "结束日期", "type": "date"}
        ],
        "conditional_rules": [
            {"name": "日期先后", "definition": {
                "if": {"field": "startDate", "operator": "is_not_empty"},
                "then": [action]}}
        ]
    }))
}

fn interactivity_schema() -> FormSchema {
    schema(json!({
        "fields": [
            {"name": "mode", "label": "模式", "type": "radio", "options": "自行填写,沿用模板"},
            {"name": "remark", "label": "备注", "type": "text",
             "validation_rules": [
                {"rule_type": "required", "rule_value": "True"},
                {"rule_type": "allowEnglishSpace", "rule_value": "True"}
             ]},
            {"name": "contact", "label": "联系人", "type": "text",
             "validation_rules": [{"rule_type": "required", "rule_value": "True"}]},
            {"name": "budget", "label": "预算", "type": "number"},
            {"name": "archived", "label": "归档编号", "type": "text",
             "validation_rules": [
                {"rule_type": "disabled", "rule_value": "True"},
                {"rule_type": "required", "rule_value": "True"}
             ]}
        ],
        "conditional_rules": [
            {"name": "沿用模板时锁定备注", "definition": {
                "if": {"field": "mode", "operator": "equals", "value": "沿用模板"},
                "then": [{"action": "disable", "targets": ["remark"]},
                         {"action": "set_optional", "targets": ["contact"]}]}},
            {"name": "自行填写时开放预算", "definition": {
                "if": {"field": "mode", "operator": "equals", "value": "自行填写"},
                "then": [{"action": "enable", "targets": ["budget"]},
                         {"action": "set_required", "targets": ["budget"]},
                         {"action": "hide", "targets": ["archived"]}]}}
        ]
    }))
}

#[test]
fn initialize_applies_declared_disabled_state() {
    let schema = interactivity_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    RuleEngine::initialize(&schema, &mut surface);

    let archived = surface.state("archived");
    assert!(archived.disabled);
    assert!(!archived.required);
    assert!(!archived.space_allowance.english);

    let remark = surface.state("remark");
    assert!(remark.required);
    assert!(remark.space_allowance.english);
    assert!(!remark.space_allowance.chinese);
}

#[test]
fn disabled_field_returns_to_required_baseline() {
    let schema = interactivity_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("mode", FieldValue::text("沿用模板"));
    engine.evaluate_all(&mut surface);
    let locked = surface.state("remark");
    assert!(locked.disabled);
    assert!(!locked.required);
    assert!(!locked.space_allowance.english);
    assert!(!surface.state("contact").required);

    surface.set_raw("mode", FieldValue::text(""));
    engine.evaluate_all(&mut surface);
    let restored = surface.state("remark");
    assert!(!restored.disabled);
    assert!(restored.required);
    assert!(restored.space_allowance.english);
    assert!(surface.state("contact").required);
}

#[test]
fn enable_and_set_required_follow_the_trigger() {
    let schema = interactivity_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    engine.evaluate_all(&mut surface);
    let closed = surface.state("budget");
    assert!(closed.disabled);
    assert!(!closed.required);

    surface.set_raw("mode", FieldValue::text("自行填写"));
    let report = engine.evaluate_all(&mut surface);
    let open = surface.state("budget");
    assert!(!open.disabled);
    assert!(open.required);
    assert!(surface.state("archived").hidden);
    assert_eq!(report.matched_rules(), vec!["自行填写时开放预算"]);
}

#[test]
fn filter_options_restricts_and_restores_city_list() {
    let schema = province_city_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("province", FieldValue::text("广东"));
    surface.set_raw("city", FieldValue::text("广州"));
    engine.evaluate_all(&mut surface);
    assert_eq!(surface.option_values("city"), vec!["广州", "深圳"]);
    assert_eq!(surface.field_value_text("city"), "广州");

    surface.set_raw("province", FieldValue::text("浙江"));
    engine.evaluate_all(&mut surface);
    assert_eq!(
        surface.option_values("city"),
        vec!["广州", "深圳", "杭州", "北京"]
    );

    surface.set_raw("city", FieldValue::text("北京"));
    surface.set_raw("province", FieldValue::text("广东"));
    engine.evaluate_all(&mut surface);
    assert_eq!(surface.option_values("city"), vec!["广州", "深圳"]);
    assert_eq!(surface.field_value_text("city"), "");
}

#[test]
fn cleared_selection_settles_dependent_rules() {
    let schema = province_city_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("province", FieldValue::text("浙江"));
    surface.set_raw("city", FieldValue::text("北京"));
    engine.evaluate_all(&mut surface);
    assert!(!surface.state("capitalNote").hidden);

    surface.set_raw("province", FieldValue::text("广东"));
    let report = engine.evaluate_all(&mut surface);
    assert!(surface.state("capitalNote").hidden);
    assert_eq!(report.matched_rules(), vec!["广东城市"]);
    assert_eq!(report.changed_fields, vec!["city"]);

    let settled = engine.evaluate_all(&mut surface);
    assert!(settled.changed_fields.is_empty());
}

#[test]
fn cross_field_comparison_sets_and_clears_message() {
    let schema = date_schema(None);
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("startDate", FieldValue::text("2024-01-10"));
    surface.set_raw("endDate", FieldValue::text("2024-01-01"));
    engine.evaluate_all(&mut surface);
    assert_eq!(
        surface.state("startDate").validation_message,
        "与'结束日期'的逻辑关系不正确"
    );
    assert_eq!(surface.reports("startDate"), 1);

    surface.set_raw("startDate", FieldValue::text("2024-01-01"));
    surface.set_raw("endDate", FieldValue::text("2024-01-10"));
    engine.evaluate_all(&mut surface);
    assert_eq!(surface.state("startDate").validation_message, "");
    assert_eq!(surface.reports("startDate"), 2);
}

#[test]
fn comparison_message_interpolates_field_values() {
    let schema = date_schema(Some("开始日期不能晚于${endDate}"));
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("startDate", FieldValue::text("2024-03-01"));
    surface.set_raw("endDate", FieldValue::text("2024-02-01"));
    engine.evaluate_all(&mut surface);
    assert_eq!(
        surface.state("startDate").validation_message,
        "开始日期不能晚于2024-02-01"
    );

    surface.set_raw("startDate", FieldValue::text(""));
    engine.evaluate_all(&mut surface);
    assert_eq!(surface.state("startDate").validation_message, "");
}

#[test]
fn comparison_with_empty_operand_clears_without_reporting() {
    let schema = date_schema(None);
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("startDate", FieldValue::text("2024-01-10"));
    engine.evaluate_all(&mut surface);
    assert_eq!(surface.state("startDate").validation_message, "");
    assert_eq!(surface.reports("startDate"), 0);
}

#[test]
fn missing_targets_are_skipped_and_reported() {
    let schema = interactivity_schema();
    let mut surface = FakeSurface::from_schema(&schema);
    surface.remove("budget");
    let engine = RuleEngine::initialize(&schema, &mut surface);

    surface.set_raw("mode", FieldValue::text("自行填写"));
    let report = engine.evaluate_all(&mut surface);
    let outcome = report
        .outcomes
        .iter()
        .find(|outcome| outcome.rule_name == "自行填写时开放预算")
        .unwrap_or_else(|| unreachable!());
    assert_eq!(outcome.skipped_targets, vec!["budget", "budget"]);
    assert!(surface.state("archived").hidden);
}

#[test]
fn unknown_operator_and_action_are_inert() {
    let schema = schema(json!({
        "fields": [
            {"name": "a", "label": "A", "type": "text"},
            {"name": "b", "label": "B", "type": "text"}
        ],
        "conditional_rules": [
            {"name": "legacy", "definition": {
                "if": {"field": "a", "operator": "matches", "value": ""},
                "then": [{"action": "show", "targets": ["b"]},
                         {"action": "shake", "targets": ["b"]}]}}
        ]
    }));
    let mut surface = FakeSurface::from_schema(&schema);
    let engine = RuleEngine::initialize(&schema, &mut surface);

    let report = engine.evaluate_all(&mut surface);
    assert!(!report.outcomes[0].condition_met);
    assert!(surface.state("b").hidden);
}

fn combined_schema() -> FormSchema {
    let mut fields = Vec::new();
    let mut rules = Vec::new();
    for fixture in [
        province_city_schema(),
        date_schema(Some("${startDate} 晚于 ${endDate}")),
        interactivity_schema(),
    ] {
        fields.extend(fixture.fields().iter().cloned());
        rules.extend(fixture.conditional_rules().iter().cloned());
    }
    FormSchema::new(fields, rules).unwrap_or_else(|_| unreachable!())
}

proptest! {
    #[test]
    fn evaluate_all_is_idempotent(
        province in prop::sample::select(vec!["广东", "浙江", "北京", ""]),
        city in prop::sample::select(vec!["广州", "杭州", "北京", ""]),
        start in prop::sample::select(vec!["2024-01-01", "2024-02-01", "", "abc"]),
        end in prop::sample::select(vec!["2024-01-15", "2024-03-01", ""]),
        mode in prop::sample::select(vec!["自行填写", "沿用模板", ""]),
    ) {
        let schema = combined_schema();
        let mut surface = FakeSurface::from_schema(&schema);
        let engine = RuleEngine::initialize(&schema, &mut surface);
        for (name, value) in [
            ("province", province),
            ("city", city),
            ("startDate", start),
            ("endDate", end),
            ("mode", mode),
        ] {
            surface.set_raw(name, FieldValue::text(value));
        }

        let first_report = engine.evaluate_all(&mut surface);
        let first = surface.snapshot();
        let second_report = engine.evaluate_all(&mut surface);
        let second = surface.snapshot();

        prop_assert_eq!(first, second);
        prop_assert_eq!(first_report, second_report);
    }
}
