use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use tenderform_core::NonEmptyString;

use crate::FieldDefinition;

/// Comparison operators usable in rule conditions and cross-field checks.
///
/// Unrecognized operator text loads as [`ConditionOperator::Unknown`], which
/// never matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    /// Display value equals the operand.
    Equals,
    /// Display value differs from the operand.
    NotEquals,
    /// Display value contains the operand.
    Contains,
    /// Display value does not contain the operand.
    NotContains,
    /// Value is missing or an empty string.
    IsEmpty,
    /// Value is present and not an empty string.
    IsNotEmpty,
    /// Ordered comparison `>`.
    GreaterThan,
    /// Ordered comparison `<`.
    LessThan,
    /// Ordered comparison `>=`.
    GreaterThanOrEquals,
    /// Ordered comparison `<=`.
    LessThanOrEquals,
    /// Operator text not recognized at load time.
    #[default]
    Unknown,
}

impl ConditionOperator {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEquals => "greater_than_or_equals",
            Self::LessThanOrEquals => "less_than_or_equals",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the label shown to administrators.
    #[must_use]
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Equals => "等于",
            Self::NotEquals => "不等于",
            Self::Contains => "包含",
            Self::NotContains => "不包含",
            Self::IsEmpty => "为空",
            Self::IsNotEmpty => "不为空",
            Self::GreaterThan => "大于",
            Self::LessThan => "小于",
            Self::GreaterThanOrEquals => "大于等于",
            Self::LessThanOrEquals => "小于等于",
            Self::Unknown => "未知运算",
        }
    }

    /// Returns whether the operator compares numerically or chronologically.
    #[must_use]
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan
                | Self::LessThan
                | Self::GreaterThanOrEquals
                | Self::LessThanOrEquals
        )
    }

    /// Returns whether the operator reads its operand.
    #[must_use]
    pub fn takes_operand(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty | Self::Unknown)
    }
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.trim() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "greater_than_or_equals" => Self::GreaterThanOrEquals,
            "less_than_or_equals" => Self::LessThanOrEquals,
            _ => Self::Unknown,
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        value.as_str().to_owned()
    }
}

/// Predicate over one trigger field.
///
/// A blank or missing trigger name is kept as written; no rendered field
/// answers to it, so the condition reads an absent value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    field: String,
    #[serde(default)]
    operator: ConditionOperator,
    #[serde(default)]
    value: String,
}

impl Condition {
    /// Creates a condition.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Returns the trigger field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the operator.
    #[must_use]
    pub fn operator(&self) -> ConditionOperator {
        self.operator
    }

    /// Returns the operand literal.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Field attribute an action controls, used for conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlledAttribute {
    /// Container visibility.
    Visibility,
    /// Interactive (enabled/disabled) state.
    Interactivity,
    /// Required flag.
    Requirement,
    /// Option list of a select-like field.
    Options,
}

/// One effect applied to target fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Visible while the condition holds, hidden otherwise.
    Show {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Hidden while the condition holds, visible otherwise.
    Hide {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Interactive while the condition holds, disabled otherwise.
    Enable {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Disabled while the condition holds, baseline otherwise.
    Disable {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Required while the condition holds, baseline otherwise.
    SetRequired {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Optional while the condition holds, baseline otherwise.
    SetOptional {
        /// Target field names.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
    },
    /// Cross-field comparison checked while the condition holds.
    ValidateComparison {
        /// Field that receives the validation message; only the first is used.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
        /// Field whose value is the right-hand operand.
        comparison_field: NonEmptyString,
        /// Comparison operator, target on the left.
        operator: ConditionOperator,
        /// Failure message; `${field}` placeholders are interpolated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Restricts a select field's options when the trigger equals `filter_value`.
    FilterOptions {
        /// Select-like target fields.
        #[serde(default, deserialize_with = "deserialize_targets")]
        targets: Vec<NonEmptyString>,
        /// Trigger value that activates the filter.
        #[serde(default)]
        filter_value: String,
        /// Raw option values kept while filtering.
        #[serde(default)]
        options: Vec<String>,
    },
    /// Action text not recognized at load time; never has an effect.
    #[serde(other)]
    Unknown,
}

impl RuleAction {
    /// Returns stable action value.
    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::Show { .. } => "show",
            Self::Hide { .. } => "hide",
            Self::Enable { .. } => "enable",
            Self::Disable { .. } => "disable",
            Self::SetRequired { .. } => "set_required",
            Self::SetOptional { .. } => "set_optional",
            Self::ValidateComparison { .. } => "validate_comparison",
            Self::FilterOptions { .. } => "filter_options",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the label shown to administrators.
    #[must_use]
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Show { .. } => "显示",
            Self::Hide { .. } => "隐藏",
            Self::Enable { .. } => "启用",
            Self::Disable { .. } => "禁用",
            Self::SetRequired { .. } => "设为必填",
            Self::SetOptional { .. } => "设为选填",
            Self::ValidateComparison { .. } => "校验",
            Self::FilterOptions { .. } => "筛选下拉选项",
            Self::Unknown => "未知动作",
        }
    }

    /// Returns target field names.
    #[must_use]
    pub fn targets(&self) -> &[NonEmptyString] {
        match self {
            Self::Show { targets }
            | Self::Hide { targets }
            | Self::Enable { targets }
            | Self::Disable { targets }
            | Self::SetRequired { targets }
            | Self::SetOptional { targets }
            | Self::ValidateComparison { targets, .. }
            | Self::FilterOptions { targets, .. } => targets,
            Self::Unknown => &[],
        }
    }

    /// Returns the target attributes this action writes.
    #[must_use]
    pub fn controlled_attributes(&self) -> &'static [ControlledAttribute] {
        match self {
            Self::Show { .. } | Self::Hide { .. } => &[ControlledAttribute::Visibility],
            Self::Enable { .. } | Self::Disable { .. } => &[
                ControlledAttribute::Interactivity,
                ControlledAttribute::Requirement,
            ],
            Self::SetRequired { .. } | Self::SetOptional { .. } => {
                &[ControlledAttribute::Requirement]
            }
            Self::FilterOptions { .. } => &[ControlledAttribute::Options],
            Self::ValidateComparison { .. } | Self::Unknown => &[],
        }
    }
}

/// The `if`/`then` body of a conditional rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Trigger condition.
    #[serde(rename = "if")]
    pub condition: Condition,
    /// Actions applied in order with the same condition result.
    #[serde(rename = "then", default, deserialize_with = "deserialize_actions")]
    pub actions: Vec<RuleAction>,
}

fn deserialize_targets<'de, D>(deserializer: D) -> Result<Vec<NonEmptyString>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    let total = names.len();
    let targets: Vec<NonEmptyString> = names
        .into_iter()
        .filter_map(|name| NonEmptyString::new(name).ok())
        .collect();

    if targets.len() < total {
        tracing::warn!(dropped = total - targets.len(), "ignoring blank action targets");
    }
    Ok(targets)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionDocument {
    Action(RuleAction),
    Malformed(IgnoredAny),
}

fn deserialize_actions<'de, D>(deserializer: D) -> Result<Vec<RuleAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let documents = Vec::<ActionDocument>::deserialize(deserializer)?;
    Ok(documents
        .into_iter()
        .map(|document| match document {
            ActionDocument::Action(action) => action,
            ActionDocument::Malformed(_) => {
                tracing::warn!("malformed rule action loads as an inert action");
                RuleAction::Unknown
            }
        })
        .collect())
}

/// Administrator-authored if/then rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    name: NonEmptyString,
    definition: RuleDefinition,
}

impl ConditionalRule {
    /// Creates a conditional rule.
    #[must_use]
    pub fn new(id: Option<i64>, name: NonEmptyString, definition: RuleDefinition) -> Self {
        Self {
            id,
            name,
            definition,
        }
    }

    /// Returns the optional persisted identifier.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the trigger condition.
    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.definition.condition
    }

    /// Returns the ordered actions.
    #[must_use]
    pub fn actions(&self) -> &[RuleAction] {
        &self.definition.actions
    }

    /// Renders a one-line summary using field labels where known.
    #[must_use]
    pub fn describe(&self, fields: &[FieldDefinition]) -> String {
        let label_of = |name: &str| -> String {
            fields
                .iter()
                .find(|field| field.name().as_str() == name)
                .map(|field| field.label().as_str().to_owned())
                .unwrap_or_else(|| name.to_owned())
        };

        let condition = self.condition();
        let mut if_part = format!(
            "如果 {} {}",
            label_of(condition.field()),
            condition.operator().display_label()
        );
        if condition.operator().takes_operand() {
            if_part.push_str(format!(" '{}'", condition.value()).as_str());
        }

        let then_parts: Vec<String> = self
            .actions()
            .iter()
            .map(|action| {
                let targets = action
                    .targets()
                    .iter()
                    .map(|target| format!("'{}'", label_of(target.as_str())))
                    .collect::<Vec<_>>()
                    .join(", ");
                match action {
                    RuleAction::ValidateComparison {
                        comparison_field,
                        operator,
                        ..
                    } => format!(
                        "{} {} {} '{}'",
                        action.display_label(),
                        targets,
                        operator.display_label(),
                        label_of(comparison_field.as_str())
                    ),
                    RuleAction::FilterOptions { filter_value, .. } => format!(
                        "当值为 '{}' 时, {} {}",
                        filter_value,
                        action.display_label(),
                        targets
                    ),
                    _ => format!("{} {}", action.display_label(), targets),
                }
            })
            .collect();

        format!("{if_part}, 那么 {}", then_parts.join("; "))
    }
}
