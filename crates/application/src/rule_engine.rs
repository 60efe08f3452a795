use serde::Serialize;
use tenderform_domain::{ConditionOperator, ConditionalRule, FormSchema, RuleAction};

use crate::action_executor::{ActionContext, apply_action, restore_baseline};
use crate::condition_evaluator::evaluate;
use crate::form_ports::FieldAccessor;

mod registry;

#[cfg(test)]
mod tests;

pub use registry::{FieldBaseline, FieldRegistry};

/// Result of evaluating one rule in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    /// Rule name.
    pub rule_name: String,
    /// Whether the `if` condition held.
    pub condition_met: bool,
    /// Targets the rule could not reach.
    pub skipped_targets: Vec<String>,
}

/// Per-rule results of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    /// Outcomes in rule-definition order.
    pub outcomes: Vec<RuleOutcome>,
    /// Fields whose value the rules changed, in the order they first changed.
    pub changed_fields: Vec<String>,
}

impl EvaluationReport {
    /// Returns names of rules whose condition held.
    #[must_use]
    pub fn matched_rules(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.condition_met)
            .map(|outcome| outcome.rule_name.as_str())
            .collect()
    }
}

/// Conditional logic engine for one rendered form.
///
/// Holds the rule set and the baselines captured at start-up. All live
/// state stays on the surface, so a pass is a pure function of the current
/// field values.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<ConditionalRule>,
    registry: FieldRegistry,
    comparison_targets: Vec<String>,
}

impl RuleEngine {
    /// Captures baselines from the schema and applies them to the surface.
    ///
    /// Fields the schema declares disabled start disabled, optional, and
    /// without space allowance. Call [`RuleEngine::evaluate_all`] once the
    /// host has finished rendering.
    pub fn initialize(schema: &FormSchema, surface: &mut dyn FieldAccessor) -> Self {
        let registry = FieldRegistry::capture(schema, surface);

        for name in registry.names() {
            if surface.has_field(name)
                && let Some(baseline) = registry.baseline(name)
            {
                restore_baseline(surface, name, baseline);
            }
        }

        let rules = schema.conditional_rules().to_vec();
        warn_on_drift(&rules, &registry, surface);

        let mut comparison_targets: Vec<String> = rules
            .iter()
            .flat_map(ConditionalRule::actions)
            .filter_map(|action| match action {
                RuleAction::ValidateComparison { targets, .. } => {
                    targets.first().map(|target| target.as_str().to_owned())
                }
                _ => None,
            })
            .collect();
        comparison_targets.sort();
        comparison_targets.dedup();

        tracing::info!(
            fields = schema.fields().len(),
            rules = rules.len(),
            "rule engine initialized"
        );

        Self {
            rules,
            registry,
            comparison_targets,
        }
    }

    /// Returns rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ConditionalRule] {
        &self.rules
    }

    /// Re-evaluates every rule against the current field values.
    ///
    /// Rules run in definition order and actions in `then` order, so the
    /// last write to a target attribute wins. When option filtering clears
    /// a selection another rule may read, the pass repeats until selections
    /// settle; running it again without value changes leaves the surface
    /// untouched.
    pub fn evaluate_all(&self, surface: &mut dyn FieldAccessor) -> EvaluationReport {
        let max_passes = self.rules.len() + 1;
        let mut passes = 0;
        let mut changed_fields: Vec<String> = Vec::new();

        loop {
            passes += 1;
            let (mut report, changed_values) = self.evaluate_pass(surface);
            for field in &changed_values {
                if !changed_fields.contains(field) {
                    changed_fields.push(field.clone());
                }
            }

            if changed_values.is_empty() {
                report.changed_fields = changed_fields;
                tracing::debug!(
                    passes,
                    matched = report.matched_rules().len(),
                    "evaluated conditional rules"
                );
                return report;
            }

            if passes >= max_passes {
                tracing::warn!(
                    passes,
                    fields = ?changed_values,
                    "option filtering did not settle"
                );
                report.changed_fields = changed_fields;
                return report;
            }
        }
    }

    fn evaluate_pass(&self, surface: &mut dyn FieldAccessor) -> (EvaluationReport, Vec<String>) {
        for target in &self.comparison_targets {
            surface.set_validation_message(target, "");
        }

        let mut report = EvaluationReport::default();
        let mut changed_values = Vec::new();

        for rule in &self.rules {
            let trigger_value = surface.field_value(rule.condition().field());
            let condition_met = evaluate(rule.condition(), &*surface);
            let context = ActionContext {
                registry: &self.registry,
                trigger_value: trigger_value.as_ref(),
            };

            let mut skipped_targets = Vec::new();
            for action in rule.actions() {
                let outcome = apply_action(action, condition_met, context, surface);
                skipped_targets.extend(outcome.skipped_targets);
                changed_values.extend(outcome.changed_values);
            }

            report.outcomes.push(RuleOutcome {
                rule_name: rule.name().as_str().to_owned(),
                condition_met,
                skipped_targets,
            });
        }

        (report, changed_values)
    }
}

fn warn_on_drift(rules: &[ConditionalRule], registry: &FieldRegistry, surface: &dyn FieldAccessor) {
    for rule in rules {
        if rule.condition().operator() == ConditionOperator::Unknown {
            tracing::warn!(rule = %rule.name(), "condition operator is not recognized");
        }

        for action in rule.actions() {
            if *action == RuleAction::Unknown {
                tracing::warn!(rule = %rule.name(), "action is not recognized");
            }

            for target in action.targets() {
                let name = target.as_str();
                if !registry.contains(name) || !surface.has_field(name) {
                    tracing::warn!(
                        rule = %rule.name(),
                        field = %name,
                        "rule target is not part of the rendered form"
                    );
                }
            }
        }
    }
}
