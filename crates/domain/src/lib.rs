//! Form schema entities: fields, validation rules, and conditional rules.

#![forbid(unsafe_code)]

mod conditional_rule;
mod field;
mod form_schema;
mod validation_rule;
mod value;

pub use conditional_rule::{
    Condition, ConditionOperator, ConditionalRule, ControlledAttribute, RuleAction,
    RuleDefinition,
};
pub use field::{FieldDefinition, FieldDefinitionInput, FieldType, OptionItem, ValueLabelMap};
pub use form_schema::{FormSchema, RuleLintIssue};
pub use validation_rule::{
    RawValidationRule, RejectedValidationRule, SpaceAllowance, ValidationRuleType,
    ValidationRules, ValidationViolation, legacy_flag, parse_legacy_flag,
};
pub use value::{CHECKED_DISPLAY, FieldValue, UNCHECKED_DISPLAY};
