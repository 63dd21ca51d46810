//! Validation of untyped lead submissions.
//!
//! [`validate_lead`] turns a raw JSON object into a [`LeadInput`] whose
//! categorical fields are closed enums, or reports every violated constraint
//! as a [`FieldIssue`] keyed by the camelCase field path the client sent.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::models::lead::UnknownVariant;
use crate::models::{Bhk, City, LeadStatus, PropertyType, Purpose, Source, Timeline};

pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 80;
pub const PHONE_MIN: usize = 10;
pub const PHONE_MAX: usize = 15;
pub const NOTES_MAX: usize = 1000;

/// Largest budget that survives a round trip through a JSON number.
pub const MAX_BUDGET: i64 = (1 << 53) - 1;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldIssue {
    /// Field the message applies to, e.g. `budgetMax`
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every issue found in a rejected submission, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    issues: Vec<FieldIssue>,
}

impl ValidationErrors {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues attached to `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.path == path)
    }

    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue::new(path, message));
    }
}

impl From<Vec<FieldIssue>> for ValidationErrors {
    fn from(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A lead submission that passed validation.
///
/// `bhk` is only ever set for property types that require it, and
/// `budget_max >= budget_min` whenever both are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadInput {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub city: City,
    pub property_type: PropertyType,
    pub bhk: Option<Bhk>,
    pub purpose: Purpose,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Timeline,
    pub source: Source,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub tags: String,
}

/// Validates a raw submission.
///
/// Independent fields are all checked before returning. The two cross-field
/// rules run afterwards, and only once the fields they read have parsed.
pub fn validate_lead(raw: &Value) -> Result<LeadInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(fields) = raw.as_object() else {
        errors.push("", "Expected an object");
        return Err(errors);
    };
    let mut reader = FieldReader {
        fields,
        errors: &mut errors,
    };

    let full_name = reader.required_text("fullName").and_then(|name| {
        let length = name.chars().count();
        if length < FULL_NAME_MIN {
            reader.fail("fullName", "Name must be at least 2 characters")
        } else if length > FULL_NAME_MAX {
            reader.fail("fullName", "Name must be less than 80 characters")
        } else {
            Some(name)
        }
    });

    let email = match reader.optional_text("email") {
        Ok(Some(email)) if !EMAIL_PATTERN.is_match(&email) => {
            reader.fail::<()>("email", "Invalid email");
            None
        }
        Ok(email) => email,
        Err(()) => None,
    };

    let phone = reader.required_text("phone").and_then(|phone| {
        let length = phone.chars().count();
        if length < PHONE_MIN {
            reader.fail("phone", "Phone must be at least 10 digits")
        } else if length > PHONE_MAX {
            reader.fail("phone", "Phone must be less than 15 digits")
        } else {
            Some(phone)
        }
    });

    let city = reader.required_enum::<City>("city");
    let property_type = reader.required_enum::<PropertyType>("propertyType");
    let bhk = reader.optional_enum::<Bhk>("bhk");
    let purpose = reader.required_enum::<Purpose>("purpose");
    let budget_min = reader.budget("budgetMin");
    let budget_max = reader.budget("budgetMax");
    let timeline = reader.required_enum::<Timeline>("timeline");
    let source = reader.required_enum::<Source>("source");
    let status = reader.optional_enum::<LeadStatus>("status");

    let notes = match reader.optional_text("notes") {
        Ok(Some(notes)) if notes.chars().count() > NOTES_MAX => {
            reader.fail::<()>("notes", "Notes must be less than 1000 characters");
            None
        }
        Ok(notes) => notes,
        Err(()) => None,
    };

    let tags = reader.optional_text("tags").ok().flatten().unwrap_or_default();

    // Cross-field rules.
    let mut bhk = bhk.ok().flatten();
    if let Some(property_type) = property_type {
        if !property_type.requires_bhk() {
            bhk = None;
        } else if bhk.is_none() && !reader.has_issue("bhk") {
            reader.fail::<()>("bhk", "BHK is required for Apartment/Villa");
        }
    }

    if let (Ok(Some(min)), Ok(Some(max))) = (budget_min, budget_max)
        && max < min
    {
        reader.fail::<()>("budgetMax", "Budget max must be greater than budget min");
    }

    match (
        full_name,
        phone,
        city,
        property_type,
        purpose,
        timeline,
        source,
        budget_min,
        budget_max,
        status,
    ) {
        (
            Some(full_name),
            Some(phone),
            Some(city),
            Some(property_type),
            Some(purpose),
            Some(timeline),
            Some(source),
            Ok(budget_min),
            Ok(budget_max),
            Ok(status),
        ) if errors.is_empty() => Ok(LeadInput {
            full_name,
            email,
            phone,
            city,
            property_type,
            bhk,
            purpose,
            budget_min,
            budget_max,
            timeline,
            source,
            status: status.unwrap_or_default(),
            notes,
            tags,
        }),
        _ => Err(errors),
    }
}

struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    errors: &'a mut ValidationErrors,
}

impl FieldReader<'_> {
    fn fail<T>(&mut self, path: &str, message: impl Into<String>) -> Option<T> {
        self.errors.push(path, message);
        None
    }

    fn has_issue(&self, path: &str) -> bool {
        self.errors.for_path(path).next().is_some()
    }

    /// `Ok(None)` for absent, null or empty values.
    fn optional_text(&mut self, path: &str) -> Result<Option<String>, ()> {
        match self.fields.get(path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(other) => {
                self.errors
                    .push(path, format!("Expected string, received {}", kind_of(other)));
                Err(())
            }
        }
    }

    /// Empty strings are passed through so length rules can report them.
    fn required_text(&mut self, path: &str) -> Option<String> {
        match self.fields.get(path) {
            None | Some(Value::Null) => self.fail(path, "Required"),
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => self.fail(
                path,
                format!("Expected string, received {}", kind_of(other)),
            ),
        }
    }

    fn required_enum<T>(&mut self, path: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant> + Variants,
    {
        match self.optional_enum::<T>(path) {
            Ok(Some(value)) => Some(value),
            Ok(None) => self.fail(path, "Required"),
            Err(()) => None,
        }
    }

    fn optional_enum<T>(&mut self, path: &str) -> Result<Option<T>, ()>
    where
        T: FromStr<Err = UnknownVariant> + Variants,
    {
        let Some(text) = self.optional_text(path)? else {
            return Ok(None);
        };
        match text.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                let expected: Vec<String> =
                    T::variants().iter().map(|v| format!("'{}'", v)).collect();
                self.errors.push(
                    path,
                    format!(
                        "Invalid enum value. Expected {}, received '{}'",
                        expected.join(" | "),
                        err.value
                    ),
                );
                Err(())
            }
        }
    }

    /// Accepts JSON numbers or numeric strings.
    fn budget(&mut self, path: &str) -> Result<Option<i64>, ()> {
        let parsed = match self.fields.get(path) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
            Some(Value::String(text)) => parse_budget_text(text.trim()),
            Some(Value::Number(number)) => match number.as_i64() {
                Some(whole) => Ok(whole),
                None => match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float.abs() <= MAX_BUDGET as f64 => {
                        Ok(float as i64)
                    }
                    Some(float) if float.fract() == 0.0 => Err("Budget is too large"),
                    _ => Err("Budget must be a whole number"),
                },
            },
            Some(other) => {
                self.errors
                    .push(path, format!("Expected number, received {}", kind_of(other)));
                return Err(());
            }
        };

        match parsed {
            Ok(value) if value < 0 => {
                self.errors.push(path, "Budget cannot be negative");
                Err(())
            }
            Ok(value) if value > MAX_BUDGET => {
                self.errors.push(path, "Budget is too large");
                Err(())
            }
            Ok(value) => Ok(Some(value)),
            Err(message) => {
                self.errors.push(path, message);
                Err(())
            }
        }
    }
}

fn parse_budget_text(text: &str) -> Result<i64, &'static str> {
    if let Ok(whole) = text.parse::<i64>() {
        return Ok(whole);
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() && float.fract() == 0.0 => {
            if float.abs() > MAX_BUDGET as f64 {
                Err("Budget is too large")
            } else {
                Ok(float as i64)
            }
        }
        Ok(_) => Err("Budget must be a whole number"),
        Err(_) => Err("Budget must be a number"),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Closed vocabularies listed in enum error messages.
pub trait Variants {
    fn variants() -> &'static [&'static str];
}

macro_rules! impl_variants {
    ($($ty:ty),+) => {
        $(impl Variants for $ty {
            fn variants() -> &'static [&'static str] {
                <$ty>::VARIANTS
            }
        })+
    };
}

impl_variants!(City, PropertyType, Bhk, Purpose, Timeline, Source, LeadStatus);
