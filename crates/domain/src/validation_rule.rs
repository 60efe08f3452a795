use std::collections::BTreeMap;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use tenderform_core::{AppError, AppResult};

use crate::FieldType;

/// Parses a legacy boolean rule value.
///
/// Schema documents encode flags as `"True"`/`"False"`; an absent or empty
/// value means `false`.
pub fn parse_legacy_flag(value: &str) -> AppResult<bool> {
    match value.trim() {
        "True" | "true" => Ok(true),
        "False" | "false" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "invalid boolean rule value '{other}', expected 'True' or 'False'"
        ))),
    }
}

/// Returns the legacy string encoding for a boolean flag.
#[must_use]
pub fn legacy_flag(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Supported validation rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationRuleType {
    /// Field must be filled.
    Required,
    /// Field is rendered non-interactive.
    Disabled,
    /// ASCII spaces are accepted.
    AllowEnglishSpace,
    /// Ideographic (full-width) spaces are accepted.
    AllowChineseSpace,
    /// Value must fully match a regular expression.
    Pattern,
    /// Minimum character count.
    MinLength,
    /// Maximum character count.
    MaxLength,
    /// Comma-separated fragments that must all appear.
    Contains,
    /// Comma-separated fragments that must not appear.
    Excludes,
    /// Minimum numeric value.
    MinValue,
    /// Maximum numeric value.
    MaxValue,
}

impl ValidationRuleType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Disabled => "disabled",
            Self::AllowEnglishSpace => "allowEnglishSpace",
            Self::AllowChineseSpace => "allowChineseSpace",
            Self::Pattern => "pattern",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Contains => "contains",
            Self::Excludes => "excludes",
            Self::MinValue => "minValue",
            Self::MaxValue => "maxValue",
        }
    }
}

impl FromStr for ValidationRuleType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "required" => Ok(Self::Required),
            "disabled" => Ok(Self::Disabled),
            "allowEnglishSpace" => Ok(Self::AllowEnglishSpace),
            "allowChineseSpace" => Ok(Self::AllowChineseSpace),
            "pattern" => Ok(Self::Pattern),
            "minLength" => Ok(Self::MinLength),
            "maxLength" => Ok(Self::MaxLength),
            "contains" => Ok(Self::Contains),
            "excludes" => Ok(Self::Excludes),
            "minValue" => Ok(Self::MinValue),
            "maxValue" => Ok(Self::MaxValue),
            _ => Err(AppError::Validation(format!(
                "unknown validation rule type '{value}'"
            ))),
        }
    }
}

/// Validation rule exactly as stored in schema documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValidationRule {
    /// Rule kind, kept as text so unknown kinds survive loading.
    pub rule_type: String,
    /// Rule payload; booleans use the legacy `"True"`/`"False"` encoding.
    #[serde(default)]
    pub rule_value: Option<String>,
    /// Optional custom failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RawValidationRule {
    /// Creates a raw rule without a custom message.
    #[must_use]
    pub fn new(rule_type: impl Into<String>, rule_value: impl Into<String>) -> Self {
        Self {
            rule_type: rule_type.into(),
            rule_value: Some(rule_value.into()),
            message: None,
        }
    }
}

/// Which kinds of whitespace a text field accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceAllowance {
    /// ASCII space (U+0020) accepted.
    pub english: bool,
    /// Ideographic space (U+3000) accepted.
    pub chinese: bool,
}

impl SpaceAllowance {
    /// Neither space kind accepted.
    pub const NONE: Self = Self {
        english: false,
        chinese: false,
    };
}

#[derive(Debug, Clone)]
struct PatternRule {
    source: String,
    regex: Regex,
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One failed validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationViolation {
    /// Rule that failed.
    pub rule_type: ValidationRuleType,
    /// Human-readable failure message.
    pub message: String,
}

/// Raw rule that could not be applied and was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedValidationRule {
    /// Rule kind as written.
    pub rule_type: String,
    /// Why the rule was ignored.
    pub reason: String,
}

/// Typed, de-duplicated validation rules of one field.
///
/// Built from the raw rule list with last-write-wins per rule type.
/// Unknown kinds and unparsable values are ignored and kept in
/// [`ValidationRules::rejected_rules`], so one bad entry never blocks a form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Vec<RawValidationRule>")]
pub struct ValidationRules {
    required: bool,
    disabled: bool,
    space_allowance: SpaceAllowance,
    pattern: Option<PatternRule>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    contains: Vec<String>,
    excludes: Vec<String>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    messages: BTreeMap<ValidationRuleType, String>,
    rejected: Vec<RejectedValidationRule>,
}

impl ValidationRules {
    /// Builds typed rules from raw schema rules.
    #[must_use]
    pub fn from_raw(rules: &[RawValidationRule]) -> Self {
        let mut typed = Self::default();
        let mut latest: BTreeMap<ValidationRuleType, &RawValidationRule> = BTreeMap::new();
        for rule in rules {
            match ValidationRuleType::from_str(rule.rule_type.trim()) {
                Ok(rule_type) => {
                    latest.insert(rule_type, rule);
                }
                Err(error) => typed.reject(rule.rule_type.as_str(), &error),
            }
        }

        for (rule_type, rule) in latest {
            let value = rule.rule_value.as_deref().unwrap_or_default().trim();
            if let Err(error) = typed.apply(rule_type, value) {
                typed.reject(rule_type.as_str(), &error);
                continue;
            }

            if let Some(message) = rule
                .message
                .as_deref()
                .map(str::trim)
                .filter(|message| !message.is_empty())
            {
                typed.messages.insert(rule_type, message.to_owned());
            }
        }

        if let (Some(min), Some(max)) = (typed.min_length, typed.max_length)
            && min > max
        {
            typed.max_length = None;
            typed.messages.remove(&ValidationRuleType::MaxLength);
            typed.reject(
                ValidationRuleType::MaxLength.as_str(),
                &AppError::Validation(format!("maxLength {max} is below minLength {min}")),
            );
        }

        typed
    }

    fn apply(&mut self, rule_type: ValidationRuleType, value: &str) -> AppResult<()> {
        match rule_type {
            ValidationRuleType::Required => self.required = parse_legacy_flag(value)?,
            ValidationRuleType::Disabled => self.disabled = parse_legacy_flag(value)?,
            ValidationRuleType::AllowEnglishSpace => {
                self.space_allowance.english = parse_legacy_flag(value)?;
            }
            ValidationRuleType::AllowChineseSpace => {
                self.space_allowance.chinese = parse_legacy_flag(value)?;
            }
            ValidationRuleType::Pattern => {
                if !value.is_empty() {
                    let regex = Regex::new(format!("^(?:{value})$").as_str()).map_err(|error| {
                        AppError::Validation(format!("invalid pattern rule '{value}': {error}"))
                    })?;
                    self.pattern = Some(PatternRule {
                        source: value.to_owned(),
                        regex,
                    });
                }
            }
            ValidationRuleType::MinLength => self.min_length = parse_length(rule_type, value)?,
            ValidationRuleType::MaxLength => self.max_length = parse_length(rule_type, value)?,
            ValidationRuleType::Contains => self.contains = split_fragments(value),
            ValidationRuleType::Excludes => self.excludes = split_fragments(value),
            ValidationRuleType::MinValue => self.min_value = parse_bound(rule_type, value)?,
            ValidationRuleType::MaxValue => self.max_value = parse_bound(rule_type, value)?,
        }
        Ok(())
    }

    fn reject(&mut self, rule_type: &str, error: &AppError) {
        tracing::warn!(rule_type = %rule_type, error = %error, "ignoring validation rule");
        self.rejected.push(RejectedValidationRule {
            rule_type: rule_type.to_owned(),
            reason: error.to_string(),
        });
    }

    /// Returns raw rules that were ignored while loading.
    #[must_use]
    pub fn rejected_rules(&self) -> &[RejectedValidationRule] {
        &self.rejected
    }

    /// Converts typed rules back to the legacy raw encoding.
    #[must_use]
    pub fn to_raw(&self) -> Vec<RawValidationRule> {
        let mut raw = Vec::new();
        let mut push = |rule_type: ValidationRuleType, value: String| {
            raw.push(RawValidationRule {
                rule_type: rule_type.as_str().to_owned(),
                rule_value: Some(value),
                message: self.messages.get(&rule_type).cloned(),
            });
        };

        if self.required {
            push(ValidationRuleType::Required, legacy_flag(true).to_owned());
        }
        if self.disabled {
            push(ValidationRuleType::Disabled, legacy_flag(true).to_owned());
        }
        if self.space_allowance.english {
            push(ValidationRuleType::AllowEnglishSpace, legacy_flag(true).to_owned());
        }
        if self.space_allowance.chinese {
            push(ValidationRuleType::AllowChineseSpace, legacy_flag(true).to_owned());
        }
        if let Some(pattern) = &self.pattern {
            push(ValidationRuleType::Pattern, pattern.source.clone());
        }
        if let Some(min_length) = self.min_length {
            push(ValidationRuleType::MinLength, min_length.to_string());
        }
        if let Some(max_length) = self.max_length {
            push(ValidationRuleType::MaxLength, max_length.to_string());
        }
        if !self.contains.is_empty() {
            push(ValidationRuleType::Contains, self.contains.join(","));
        }
        if !self.excludes.is_empty() {
            push(ValidationRuleType::Excludes, self.excludes.join(","));
        }
        if let Some(min_value) = self.min_value {
            push(ValidationRuleType::MinValue, min_value.to_string());
        }
        if let Some(max_value) = self.max_value {
            push(ValidationRuleType::MaxValue, max_value.to_string());
        }

        raw
    }

    /// Returns the schema-declared required flag.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns the schema-declared disabled flag.
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the schema-declared space allowance.
    #[must_use]
    pub fn space_allowance(&self) -> SpaceAllowance {
        self.space_allowance
    }

    /// Checks one value against these rules.
    ///
    /// `required` is the live flag, which conditional rules may have changed
    /// from the declared one. Empty optional values pass every other check.
    /// The space policy only applies to typed text; picked option values
    /// are never checked for spaces.
    #[must_use]
    pub fn check(
        &self,
        field_type: FieldType,
        label: &str,
        value: &str,
        required: bool,
    ) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();

        if value.trim().is_empty() {
            if required {
                violations.push(self.violation(
                    ValidationRuleType::Required,
                    format!("{label}为必填项"),
                ));
            }
            return violations;
        }

        let free_text = field_type.is_free_text();
        if free_text && !self.space_allowance.english && value.contains(' ') {
            violations.push(self.violation(
                ValidationRuleType::AllowEnglishSpace,
                format!("{label}不允许包含英文空格"),
            ));
        }
        if free_text && !self.space_allowance.chinese && value.contains('\u{3000}') {
            violations.push(self.violation(
                ValidationRuleType::AllowChineseSpace,
                format!("{label}不允许包含中文空格"),
            ));
        }

        if let Some(pattern) = &self.pattern
            && !pattern.regex.is_match(value)
        {
            violations.push(self.violation(
                ValidationRuleType::Pattern,
                format!("{label}格式不正确"),
            ));
        }

        let length = value.chars().count();
        if let Some(min_length) = self.min_length
            && length < min_length
        {
            violations.push(self.violation(
                ValidationRuleType::MinLength,
                format!("{label}长度不能少于{min_length}个字符"),
            ));
        }
        if let Some(max_length) = self.max_length
            && length > max_length
        {
            violations.push(self.violation(
                ValidationRuleType::MaxLength,
                format!("{label}长度不能超过{max_length}个字符"),
            ));
        }

        if let Some(missing) = self
            .contains
            .iter()
            .find(|fragment| !value.contains(fragment.as_str()))
        {
            violations.push(self.violation(
                ValidationRuleType::Contains,
                format!("{label}必须包含'{missing}'"),
            ));
        }
        if let Some(present) = self
            .excludes
            .iter()
            .find(|fragment| value.contains(fragment.as_str()))
        {
            violations.push(self.violation(
                ValidationRuleType::Excludes,
                format!("{label}不能包含'{present}'"),
            ));
        }

        if self.min_value.is_some() || self.max_value.is_some() {
            match value.trim().parse::<f64>() {
                Ok(number) => {
                    if let Some(min_value) = self.min_value
                        && number < min_value
                    {
                        violations.push(self.violation(
                            ValidationRuleType::MinValue,
                            format!("{label}不能小于{min_value}"),
                        ));
                    }
                    if let Some(max_value) = self.max_value
                        && number > max_value
                    {
                        violations.push(self.violation(
                            ValidationRuleType::MaxValue,
                            format!("{label}不能大于{max_value}"),
                        ));
                    }
                }
                Err(_) => {
                    let rule_type = if self.min_value.is_some() {
                        ValidationRuleType::MinValue
                    } else {
                        ValidationRuleType::MaxValue
                    };
                    violations.push(self.violation(rule_type, format!("{label}必须是数字")));
                }
            }
        }

        violations
    }

    fn violation(&self, rule_type: ValidationRuleType, fallback: String) -> ValidationViolation {
        ValidationViolation {
            rule_type,
            message: self.messages.get(&rule_type).cloned().unwrap_or(fallback),
        }
    }
}

impl From<Vec<RawValidationRule>> for ValidationRules {
    fn from(value: Vec<RawValidationRule>) -> Self {
        Self::from_raw(&value)
    }
}

impl Serialize for ValidationRules {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_raw().serialize(serializer)
    }
}

fn parse_length(rule_type: ValidationRuleType, value: &str) -> AppResult<Option<usize>> {
    if value.is_empty() {
        return Ok(None);
    }

    value.parse::<usize>().map(Some).map_err(|_| {
        AppError::Validation(format!(
            "{} must be a non-negative integer, got '{value}'",
            rule_type.as_str()
        ))
    })
}

fn parse_bound(rule_type: ValidationRuleType, value: &str) -> AppResult<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }

    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(AppError::Validation(format!(
            "{} must be a finite number, got '{value}'",
            rule_type.as_str()
        ))),
    }
}

fn split_fragments(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_owned)
        .collect()
}
