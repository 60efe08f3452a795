use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tenderform_core::{AppError, AppResult};

use crate::{ConditionOperator, ConditionalRule, ControlledAttribute, FieldDefinition, RuleAction};

/// Field definitions and conditional rules of one fixed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormSchemaDocument")]
pub struct FormSchema {
    fields: Vec<FieldDefinition>,
    conditional_rules: Vec<ConditionalRule>,
    #[serde(skip)]
    dropped_rules: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct FormSchemaDocument {
    #[serde(default)]
    fields: Vec<FieldDefinition>,
    #[serde(default, alias = "rules")]
    conditional_rules: Vec<RuleDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Rule(ConditionalRule),
    Malformed(IgnoredAny),
}

impl TryFrom<FormSchemaDocument> for FormSchema {
    type Error = AppError;

    fn try_from(document: FormSchemaDocument) -> Result<Self, Self::Error> {
        let mut rules = Vec::with_capacity(document.conditional_rules.len());
        let mut dropped_rules = Vec::new();
        for (index, rule) in document.conditional_rules.into_iter().enumerate() {
            match rule {
                RuleDocument::Rule(rule) => rules.push(rule),
                RuleDocument::Malformed(_) => {
                    tracing::warn!(index, "dropping malformed conditional rule");
                    dropped_rules.push(index);
                }
            }
        }

        let mut schema = Self::new(document.fields, rules)?;
        schema.dropped_rules = dropped_rules;
        Ok(schema)
    }
}

/// Authoring-time problem found in a rule set.
///
/// Lint issues never block loading; the engine tolerates every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleLintIssue {
    /// Rule references a field the form does not declare.
    UnknownField {
        /// Rule name.
        rule: String,
        /// Missing field name.
        field: String,
    },
    /// Condition or comparison uses an operator that never matches.
    UnknownOperator {
        /// Rule name.
        rule: String,
    },
    /// Action kind was not recognized.
    UnknownAction {
        /// Rule name.
        rule: String,
    },
    /// `filter_options` targets a field that is not a drop-down.
    FilterTargetNotSelect {
        /// Rule name.
        rule: String,
        /// Offending target.
        field: String,
    },
    /// `validate_comparison` must name exactly one target.
    ComparisonTargetCount {
        /// Rule name.
        rule: String,
        /// Number of targets declared.
        count: usize,
    },
    /// Rule entry could not be read and was left out of the form.
    MalformedRule {
        /// Position of the entry in the schema document.
        index: usize,
    },
    /// Validation rule was ignored because its kind or value is invalid.
    InvalidValidationRule {
        /// Field declaring the rule.
        field: String,
        /// Rule kind as written.
        rule_type: String,
        /// Why the rule was ignored.
        reason: String,
    },
    /// Several rules write the same attribute of one field; the last one evaluated wins.
    ConflictingRules {
        /// Contested field.
        field: String,
        /// Contested attribute.
        attribute: ControlledAttribute,
        /// Rule names in evaluation order.
        rules: Vec<String>,
    },
}

impl FormSchema {
    /// Creates a validated form schema.
    pub fn new(
        fields: Vec<FieldDefinition>,
        conditional_rules: Vec<ConditionalRule>,
    ) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name().as_str()) {
                return Err(AppError::Validation(format!(
                    "duplicate field name '{}' in form schema",
                    field.name().as_str()
                )));
            }
        }

        Ok(Self {
            fields,
            conditional_rules,
            dropped_rules: Vec::new(),
        })
    }

    /// Returns field definitions in display order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Returns conditional rules in evaluation order.
    #[must_use]
    pub fn conditional_rules(&self) -> &[ConditionalRule] {
        &self.conditional_rules
    }

    /// Looks up a field definition by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name().as_str() == name)
    }

    /// Reports rule-set and validation-rule problems an administrator should fix.
    #[must_use]
    pub fn lint_rules(&self) -> Vec<RuleLintIssue> {
        let mut issues: Vec<RuleLintIssue> = self
            .dropped_rules
            .iter()
            .map(|index| RuleLintIssue::MalformedRule { index: *index })
            .collect();
        for field in &self.fields {
            issues.extend(field.validation_rules().rejected_rules().iter().map(|rejected| {
                RuleLintIssue::InvalidValidationRule {
                    field: field.name().as_str().to_owned(),
                    rule_type: rejected.rule_type.clone(),
                    reason: rejected.reason.clone(),
                }
            }));
        }
        let mut writers: BTreeMap<(String, ControlledAttribute), Vec<String>> = BTreeMap::new();

        for rule in &self.conditional_rules {
            let rule_name = rule.name().as_str().to_owned();
            let mut referenced: BTreeSet<String> = BTreeSet::new();
            referenced.insert(rule.condition().field().to_owned());

            if rule.condition().operator() == ConditionOperator::Unknown {
                issues.push(RuleLintIssue::UnknownOperator {
                    rule: rule_name.clone(),
                });
            }

            for action in rule.actions() {
                referenced.extend(action.targets().iter().map(|target| target.as_str().to_owned()));

                match action {
                    RuleAction::Unknown => issues.push(RuleLintIssue::UnknownAction {
                        rule: rule_name.clone(),
                    }),
                    RuleAction::ValidateComparison {
                        targets,
                        comparison_field,
                        operator,
                        ..
                    } => {
                        referenced.insert(comparison_field.as_str().to_owned());
                        if targets.len() != 1 {
                            issues.push(RuleLintIssue::ComparisonTargetCount {
                                rule: rule_name.clone(),
                                count: targets.len(),
                            });
                        }
                        if *operator == ConditionOperator::Unknown {
                            issues.push(RuleLintIssue::UnknownOperator {
                                rule: rule_name.clone(),
                            });
                        }
                    }
                    RuleAction::FilterOptions { targets, .. } => {
                        for target in targets {
                            if let Some(field) = self.field(target.as_str())
                                && !field.field_type().is_select_like()
                            {
                                issues.push(RuleLintIssue::FilterTargetNotSelect {
                                    rule: rule_name.clone(),
                                    field: target.as_str().to_owned(),
                                });
                            }
                        }
                    }
                    _ => {}
                }

                for attribute in action.controlled_attributes() {
                    for target in action.targets() {
                        let rules = writers
                            .entry((target.as_str().to_owned(), *attribute))
                            .or_default();
                        if !rules.contains(&rule_name) {
                            rules.push(rule_name.clone());
                        }
                    }
                }
            }

            for field in referenced {
                if self.field(field.as_str()).is_none() {
                    issues.push(RuleLintIssue::UnknownField {
                        rule: rule_name.clone(),
                        field,
                    });
                }
            }
        }

        issues.extend(
            writers
                .into_iter()
                .filter(|(_, rules)| rules.len() > 1)
                .map(|((field, attribute), rules)| RuleLintIssue::ConflictingRules {
                    field,
                    attribute,
                    rules,
                }),
        );

        issues
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FormSchema, RuleLintIssue};
    use crate::ControlledAttribute;

    fn schema(value: serde_json::Value) -> FormSchema {
        serde_json::from_value(value).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let result = serde_json::from_value::<FormSchema>(json!({
            "fields": [
                {"name": "a", "label": "A", "type": "text"},
                {"name": "a", "label": "A again", "type": "text"}
            ]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn accepts_rules_alias() {
        let parsed = schema(json!({
            "fields": [{"name": "a", "label": "A", "type": "text"}],
            "rules": [{
                "name": "r",
                "definition": {"if": {"field": "a", "operator": "is_empty"}, "then": []}
            }]
        }));
        assert_eq!(parsed.conditional_rules().len(), 1);
        assert!(parsed.lint_rules().is_empty());
    }

    #[test]
    fn lint_reports_drift_and_unknown_kinds() {
        let parsed = schema(json!({
            "fields": [
                {"name": "a", "label": "A", "type": "text"},
                {"name": "b", "label": "B", "type": "text"}
            ],
            "conditional_rules": [{
                "name": "drift",
                "definition": {
                    "if": {"field": "a", "operator": "resembles", "value": "x"},
                    "then": [
                        {"action": "show", "targets": ["ghost"]},
                        {"action": "filter_options", "targets": ["b"], "filter_value": "x", "options": []},
                        {"action": "validate_comparison", "targets": [], "comparison_field": "a", "operator": "equals"},
                        {"action": "teleport"}
                    ]
                }
            }]
        }));

        let issues = parsed.lint_rules();
        assert!(issues.contains(&RuleLintIssue::UnknownOperator {
            rule: "drift".to_owned()
        }));
        assert!(issues.contains(&RuleLintIssue::UnknownField {
            rule: "drift".to_owned(),
            field: "ghost".to_owned()
        }));
        assert!(issues.contains(&RuleLintIssue::FilterTargetNotSelect {
            rule: "drift".to_owned(),
            field: "b".to_owned()
        }));
        assert!(issues.contains(&RuleLintIssue::ComparisonTargetCount {
            rule: "drift".to_owned(),
            count: 0
        }));
        assert!(issues.contains(&RuleLintIssue::UnknownAction {
            rule: "drift".to_owned()
        }));
    }

    #[test]
    fn lint_reports_rules_competing_for_one_attribute() {
        let parsed = schema(json!({
            "fields": [
                {"name": "a", "label": "A", "type": "text"},
                {"name": "b", "label": "B", "type": "text"}
            ],
            "conditional_rules": [
                {"name": "first", "definition": {
                    "if": {"field": "a", "operator": "is_empty"},
                    "then": [{"action": "show", "targets": ["b"]}]}},
                {"name": "second", "definition": {
                    "if": {"field": "a", "operator": "is_not_empty"},
                    "then": [{"action": "hide", "targets": ["b"]},
                             {"action": "set_required", "targets": ["b"]}]}}
            ]
        }));

        assert_eq!(
            parsed.lint_rules(),
            vec![RuleLintIssue::ConflictingRules {
                field: "b".to_owned(),
                attribute: ControlledAttribute::Visibility,
                rules: vec!["first".to_owned(), "second".to_owned()],
            }]
        );
    }

    #[test]
    fn malformed_rule_data_degrades_instead_of_failing_the_form() {
        let parsed = schema(json!({
            "fields": [
                {"name": "a", "label": "A", "type": "text",
                 "validation_rules": [{"rule_type": "required", "rule_value": "yes"}]},
                {"name": "b", "label": "B", "type": "text"}
            ],
            "conditional_rules": [
                {"name": "blank target", "definition": {
                    "if": {"field": "a", "operator": "is_empty"},
                    "then": [{"action": "show", "targets": [""]}]}},
                {"name": "no comparison field", "definition": {
                    "if": {"field": "a", "operator": "is_not_empty"},
                    "then": [{"action": "validate_comparison", "targets": ["b"], "operator": "equals"}]}},
                {"name": " ", "definition": {"if": {"field": "a"}}},
                {"name": "intact", "definition": {
                    "if": {"field": "a", "operator": "equals", "value": "x"},
                    "then": [{"action": "hide", "targets": ["b"]}]}}
            ]
        }));

        let names: Vec<&str> = parsed
            .conditional_rules()
            .iter()
            .map(|rule| rule.name().as_str())
            .collect();
        assert_eq!(names, vec!["blank target", "no comparison field", "intact"]);
        assert!(parsed.conditional_rules()[0].actions()[0].targets().is_empty());
        assert!(!parsed.fields()[0].validation_rules().required());

        let issues = parsed.lint_rules();
        assert!(issues.contains(&RuleLintIssue::MalformedRule { index: 2 }));
        assert!(issues.contains(&RuleLintIssue::UnknownAction {
            rule: "no comparison field".to_owned()
        }));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            RuleLintIssue::InvalidValidationRule { field, rule_type, .. }
                if field == "a" && rule_type == "required"
        )));
    }
}
