//! Feature encoding for ML inference
//!
//! Turns a raw, human-entered booking record into the fixed ten-slot vector
//! the classifier was trained on. The transform mirrors the training
//! pipeline: weekday ordinal, one-hot category with the first level dropped,
//! and time collapsed to a single `time_PM` indicator.

use crate::error::EncodingError;
use crate::models::{
    ClassCategory, ClassTime, DayOfWeek, FeatureVector, RawAttributeRecord, RawField,
    NUM_FEATURES,
};

const MONTHS_AS_MEMBER: usize = 0;
const WEIGHT: usize = 1;
const DAYS_BEFORE: usize = 2;
const DAY_OF_WEEK: usize = 3;
const TIME_PM: usize = 9;

/// Seam between the predictor and the record encoding step
pub trait RecordEncoder: Send + Sync {
    fn encode(&self, record: &RawAttributeRecord) -> Result<FeatureVector, EncodingError>;
}

/// Encodes booking records into the trained feature schema
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordEncoder for FeatureEncoder {
    fn encode(&self, record: &RawAttributeRecord) -> Result<FeatureVector, EncodingError> {
        let months = parse_count("months_as_member", record.months_as_member.as_ref())?;
        let weight = parse_weight(record.weight.as_ref())?;
        let days_before = parse_count("days_before", record.days_before.as_ref())?;

        let day = parse_day(record.day_of_week.as_ref())?;

        let time_token = required_text("time", record.time.as_ref())?;
        let time = ClassTime::from_token(time_token)
            .ok_or_else(|| EncodingError::invalid("time", format!("unrecognized {:?}", time_token)))?;

        let category_token = required_text("category", record.category.as_ref())?;
        let category = ClassCategory::from_token(category_token).ok_or_else(|| {
            EncodingError::invalid("category", format!("unrecognized {:?}", category_token))
        })?;

        let mut values = [0.0f32; NUM_FEATURES];
        values[MONTHS_AS_MEMBER] = months as f32;
        values[WEIGHT] = weight as f32;
        values[DAYS_BEFORE] = days_before as f32;
        values[DAY_OF_WEEK] = day.ordinal() as f32;
        // Aqua has no slot in the fitted schema and leaves every category column at 0
        if let Some(slot) = category.one_hot_slot() {
            values[slot] = 1.0;
        }
        if time.is_evening() {
            values[TIME_PM] = 1.0;
        }

        Ok(FeatureVector::from_values(values))
    }
}

fn required_text<'a>(
    field: &'static str,
    value: Option<&'a RawField>,
) -> Result<&'a str, EncodingError> {
    let value = value.ok_or_else(|| EncodingError::invalid(field, "missing"))?;
    match value.as_text().map(str::trim) {
        Some("") => Err(EncodingError::invalid(field, "missing")),
        Some(text) => Ok(text),
        None => Err(EncodingError::invalid(field, format!("expected text, got {}", value))),
    }
}

/// A present but unrecognized day, including a non-text value, is `UnknownDay`
fn parse_day(value: Option<&RawField>) -> Result<DayOfWeek, EncodingError> {
    let value = value.ok_or_else(|| EncodingError::invalid("day_of_week", "missing"))?;
    match value.as_text() {
        Some(token) => DayOfWeek::from_token(token.trim())
            .ok_or_else(|| EncodingError::UnknownDay(token.to_string())),
        None => Err(EncodingError::UnknownDay(value.to_string())),
    }
}

fn parse_number(field: &'static str, value: Option<&RawField>) -> Result<f64, EncodingError> {
    let number = match value {
        None => return Err(EncodingError::invalid(field, "missing")),
        Some(RawField::Number(n)) => *n,
        Some(RawField::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(EncodingError::invalid(field, "missing"));
            }
            text.parse::<f64>()
                .map_err(|_| EncodingError::invalid(field, format!("not a number: {:?}", text)))?
        }
        Some(RawField::Other(other)) => {
            return Err(EncodingError::invalid(field, format!("not a number: {}", other)))
        }
    };
    if !number.is_finite() {
        return Err(EncodingError::invalid(field, format!("not a finite number: {}", number)));
    }
    Ok(number)
}

fn parse_count(field: &'static str, value: Option<&RawField>) -> Result<u32, EncodingError> {
    let number = parse_number(field, value)?;
    if number < 0.0 {
        return Err(EncodingError::invalid(field, format!("negative value {}", number)));
    }
    if number.fract() != 0.0 {
        return Err(EncodingError::invalid(field, format!("expected a whole number, got {}", number)));
    }
    if number > u32::MAX as f64 {
        return Err(EncodingError::invalid(field, format!("out of range: {}", number)));
    }
    Ok(number as u32)
}

fn parse_weight(value: Option<&RawField>) -> Result<f64, EncodingError> {
    let weight = parse_number("weight", value)?;
    if weight <= 0.0 {
        return Err(EncodingError::invalid("weight", format!("must be positive, got {}", weight)));
    }
    if !(weight as f32).is_finite() {
        return Err(EncodingError::invalid("weight", format!("out of range: {}", weight)));
    }
    Ok(weight)
}
