use std::cmp::Ordering;

use chrono::NaiveDate;
use tenderform_domain::{Condition, ConditionOperator, FieldValue};

use crate::form_ports::FieldValueProvider;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Evaluates one condition against the live value of its trigger field.
///
/// Never fails: missing fields read as absent, failed coercions and unknown
/// operators evaluate to `false`.
pub fn evaluate<P>(condition: &Condition, provider: &P) -> bool
where
    P: FieldValueProvider + ?Sized,
{
    let value = provider.field_value(condition.field());
    if value.is_none() {
        tracing::debug!(field = %condition.field(), "condition field is not rendered");
    }

    matches_operator(condition.operator(), value.as_ref(), condition.value())
}

/// Applies `operator` with the field value on the left and `operand` on the right.
///
/// Booleans and the legacy `"True"`/`"False"` strings compare as `是`/`否`.
#[must_use]
pub fn matches_operator(
    operator: ConditionOperator,
    value: Option<&FieldValue>,
    operand: &str,
) -> bool {
    let text = value.map(FieldValue::display_text);
    let text = text.as_deref();

    match operator {
        ConditionOperator::IsEmpty => text.is_none_or(str::is_empty),
        ConditionOperator::IsNotEmpty => text.is_some_and(|text| !text.is_empty()),
        ConditionOperator::Equals => text.is_some_and(|text| text == operand),
        ConditionOperator::NotEquals => text.is_none_or(|text| text != operand),
        ConditionOperator::Contains => text.is_some_and(|text| text.contains(operand)),
        ConditionOperator::NotContains => text.is_none_or(|text| !text.contains(operand)),
        ConditionOperator::GreaterThan => {
            compare_ordered(text, operand).is_some_and(|ordering| ordering.is_gt())
        }
        ConditionOperator::LessThan => {
            compare_ordered(text, operand).is_some_and(|ordering| ordering.is_lt())
        }
        ConditionOperator::GreaterThanOrEquals => {
            compare_ordered(text, operand).is_some_and(|ordering| ordering.is_ge())
        }
        ConditionOperator::LessThanOrEquals => {
            compare_ordered(text, operand).is_some_and(|ordering| ordering.is_le())
        }
        ConditionOperator::Unknown => false,
    }
}

/// Orders two values numerically, falling back to ISO dates.
///
/// Returns `None` when either side is empty, the sides parse as different
/// kinds, or neither parse succeeds.
fn compare_ordered(left: Option<&str>, right: &str) -> Option<Ordering> {
    let left = left?;

    if let (Some(left_number), Some(right_number)) = (parse_number(left), parse_number(right)) {
        return left_number.partial_cmp(&right_number);
    }

    if let (Some(left_date), Some(right_date)) = (parse_date(left), parse_date(right)) {
        return Some(left_date.cmp(&right_date));
    }

    None
}

fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
