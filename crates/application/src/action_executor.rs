use serde::Serialize;
use tenderform_core::NonEmptyString;
use tenderform_domain::{ConditionOperator, FieldValue, OptionItem, RuleAction, SpaceAllowance};

use crate::condition_evaluator::matches_operator;
use crate::form_ports::{FieldAccessor, FieldValueProvider};
use crate::rule_engine::{FieldBaseline, FieldRegistry};

/// Read-only inputs shared by every action of one rule in one pass.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// Schema fields with their captured baselines.
    pub registry: &'a FieldRegistry,
    /// Current value of the rule's trigger field.
    pub trigger_value: Option<&'a FieldValue>,
}

/// Targets an action touched or had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Targets whose state the action wrote.
    pub applied_targets: Vec<String>,
    /// Targets missing from the schema or the rendered form.
    pub skipped_targets: Vec<String>,
    /// Targets whose selection was cleared because the option went away.
    pub changed_values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetResult {
    Applied,
    ValueChanged,
    Skipped,
}

/// Applies one action to each of its targets.
///
/// Restoration policy: any action that disables a field also clears its
/// required flag and space allowance, and every "off" branch restores the
/// captured baseline instead of clearing.
pub fn apply_action(
    action: &RuleAction,
    condition_met: bool,
    context: ActionContext<'_>,
    surface: &mut dyn FieldAccessor,
) -> ActionOutcome {
    let mut outcome = ActionOutcome::default();

    match action {
        RuleAction::Unknown => {}
        RuleAction::ValidateComparison {
            targets,
            comparison_field,
            operator,
            message,
        } => {
            if condition_met {
                validate_comparison(
                    ComparisonCheck {
                        targets,
                        comparison_field,
                        operator: *operator,
                        message: message.as_deref(),
                    },
                    context.registry,
                    surface,
                    &mut outcome,
                );
            }
        }
        _ => {
            for target in action.targets() {
                let name = target.as_str();
                let result = match context.registry.baseline(name) {
                    Some(baseline) if surface.has_field(name) => {
                        apply_to_target(action, name, baseline, condition_met, context, surface)
                    }
                    _ => TargetResult::Skipped,
                };

                match result {
                    TargetResult::Applied => outcome.applied_targets.push(name.to_owned()),
                    TargetResult::ValueChanged => {
                        outcome.applied_targets.push(name.to_owned());
                        outcome.changed_values.push(name.to_owned());
                    }
                    TargetResult::Skipped => {
                        tracing::debug!(
                            field = %name,
                            action = action.action_type(),
                            "skipping action target"
                        );
                        outcome.skipped_targets.push(name.to_owned());
                    }
                }
            }
        }
    }

    outcome
}

fn apply_to_target(
    action: &RuleAction,
    name: &str,
    baseline: FieldBaseline,
    condition_met: bool,
    context: ActionContext<'_>,
    surface: &mut dyn FieldAccessor,
) -> TargetResult {
    match action {
        RuleAction::Show { .. } => surface.set_hidden(name, !condition_met),
        RuleAction::Hide { .. } => surface.set_hidden(name, condition_met),
        RuleAction::Enable { .. } => {
            if condition_met {
                make_interactive(surface, name, baseline);
            } else {
                make_disabled(surface, name);
            }
        }
        RuleAction::Disable { .. } => {
            if condition_met {
                make_disabled(surface, name);
            } else {
                restore_baseline(surface, name, baseline);
            }
        }
        RuleAction::SetRequired { .. } => {
            surface.set_required(name, condition_met || baseline.effective_required());
        }
        RuleAction::SetOptional { .. } => {
            surface.set_required(name, !condition_met && baseline.effective_required());
        }
        RuleAction::FilterOptions {
            filter_value,
            options,
            ..
        } => return filter_options(name, filter_value, options, context, surface),
        RuleAction::ValidateComparison { .. } | RuleAction::Unknown => {
            return TargetResult::Skipped;
        }
    }

    TargetResult::Applied
}

/// Writes the captured baseline of one field back to the surface.
pub(crate) fn restore_baseline(surface: &mut dyn FieldAccessor, name: &str, baseline: FieldBaseline) {
    surface.set_disabled(name, baseline.disabled);
    surface.set_required(name, baseline.effective_required());
    surface.set_space_allowance(name, baseline.effective_space_allowance());
}

fn make_interactive(surface: &mut dyn FieldAccessor, name: &str, baseline: FieldBaseline) {
    surface.set_disabled(name, false);
    surface.set_required(name, baseline.required);
    surface.set_space_allowance(name, baseline.space_allowance);
}

fn make_disabled(surface: &mut dyn FieldAccessor, name: &str) {
    surface.set_disabled(name, true);
    surface.set_required(name, false);
    surface.set_space_allowance(name, SpaceAllowance::NONE);
}

fn filter_options(
    name: &str,
    filter_value: &str,
    allowed: &[String],
    context: ActionContext<'_>,
    surface: &mut dyn FieldAccessor,
) -> TargetResult {
    let Some(definition) = context.registry.definition(name) else {
        return TargetResult::Skipped;
    };
    if !definition.field_type().is_select_like() {
        return TargetResult::Skipped;
    }
    let Some(original) = context.registry.original_options(name) else {
        return TargetResult::Skipped;
    };

    let current = surface
        .field_value(name)
        .map(|value| value.raw_text())
        .unwrap_or_default();
    let active = context
        .trigger_value
        .is_some_and(|value| value.display_text() == filter_value);

    let offered: Vec<OptionItem> = if active {
        original
            .iter()
            .filter(|option| option.value.is_empty() || allowed.contains(&option.value))
            .cloned()
            .collect()
    } else {
        original.to_vec()
    };

    surface.set_options(name, &offered);
    let kept = retain_selection(
        current.as_str(),
        &offered,
        definition.field_type().is_multi_value(),
    );
    let changed = kept != current;
    surface.set_value(name, FieldValue::Text(kept));

    if changed {
        TargetResult::ValueChanged
    } else {
        TargetResult::Applied
    }
}

fn retain_selection(current: &str, offered: &[OptionItem], multi_value: bool) -> String {
    let is_offered = |value: &str| offered.iter().any(|option| option.value == value);

    if multi_value {
        return current
            .split(',')
            .filter(|value| !value.is_empty() && is_offered(*value))
            .collect::<Vec<_>>()
            .join(",");
    }

    if is_offered(current) {
        current.to_owned()
    } else {
        String::new()
    }
}

struct ComparisonCheck<'a> {
    targets: &'a [NonEmptyString],
    comparison_field: &'a NonEmptyString,
    operator: ConditionOperator,
    message: Option<&'a str>,
}

fn validate_comparison(
    check: ComparisonCheck<'_>,
    registry: &FieldRegistry,
    surface: &mut dyn FieldAccessor,
    outcome: &mut ActionOutcome,
) {
    let Some(target) = check.targets.first().map(NonEmptyString::as_str) else {
        return;
    };
    if !surface.has_field(target) {
        outcome.skipped_targets.push(target.to_owned());
        return;
    }

    let comparison = check.comparison_field.as_str();
    if !surface.has_field(comparison) {
        outcome.skipped_targets.push(comparison.to_owned());
    }

    let left = surface.field_value(target).filter(|value| !value.is_empty());
    let right = surface
        .field_value(comparison)
        .filter(|value| !value.is_empty());
    outcome.applied_targets.push(target.to_owned());

    let (Some(left), Some(right)) = (left, right) else {
        surface.set_validation_message(target, "");
        return;
    };

    let message = if matches_operator(check.operator, Some(&left), right.display_text().as_str())
    {
        String::new()
    } else {
        let template = check
            .message
            .filter(|message| !message.trim().is_empty())
            .map_or_else(
                || format!("与'{}'的逻辑关系不正确", registry.label(comparison)),
                str::to_owned,
            );
        interpolate_field_tokens(template.as_str(), &*surface)
    };

    surface.set_validation_message(target, message.as_str());
    surface.report_validity(target);
}

/// Replaces `${name}` tokens with the display value of the named field.
///
/// Tokens naming unknown fields are left as written.
pub fn interpolate_field_tokens<P>(template: &str, provider: &P) -> String
where
    P: FieldValueProvider + ?Sized,
{
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let (head, after_head) = rest.split_at(start);
        result.push_str(head);

        let Some(end_relative) = after_head.find('}') else {
            result.push_str(after_head);
            rest = "";
            break;
        };

        let token = after_head[2..end_relative].trim();
        match provider.field_value(token) {
            Some(value) => result.push_str(value.display_text().as_str()),
            None => result.push_str(&after_head[..=end_relative]),
        }

        rest = &after_head[end_relative + 1..];
    }

    result.push_str(rest);
    result
}
