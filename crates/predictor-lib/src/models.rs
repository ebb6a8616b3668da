//! Core data models for the attendance predictor

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of slots in the feature schema
pub const NUM_FEATURES: usize = 10;

/// Ordered slot names the classifier was fit on.
///
/// Reordering this list silently corrupts every prediction; the ONNX loader
/// compares it against the model metadata at startup.
pub const FEATURE_SCHEMA: [&str; NUM_FEATURES] = [
    "months_as_member",
    "weight",
    "days_before",
    "day_of_week",
    "category_Cycling",
    "category_HIIT",
    "category_Strength",
    "category_Yoga",
    "category_unknown",
    "time_PM",
];

/// Human-readable labels for each schema slot, same order as [`FEATURE_SCHEMA`]
pub const FEATURE_LABELS: [&str; NUM_FEATURES] = [
    "Months as Member",
    "Weight",
    "Days Before",
    "Day of Week",
    "Cycling Class",
    "HIIT Class",
    "Strength Class",
    "Yoga Class",
    "Unknown Class",
    "PM Time",
];

/// A single human-entered value: a JSON number, free text from a form/CLI,
/// or any other JSON value, kept so the encoder can reject it with a typed error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawField {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawField::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        RawField::Number(value)
    }
}

impl From<i64> for RawField {
    fn from(value: i64) -> Self {
        RawField::Number(value as f64)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

impl From<String> for RawField {
    fn from(value: String) -> Self {
        RawField::Text(value)
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawField::Number(n) => write!(f, "{}", n),
            RawField::Text(s) => write!(f, "{:?}", s),
            RawField::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One booking-intent observation, as collected from the caller.
///
/// Every field is optional here so that missing input can be reported by the
/// encoder as a typed error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttributeRecord {
    #[serde(default, alias = "monthsAsMember")]
    pub months_as_member: Option<RawField>,
    #[serde(default)]
    pub weight: Option<RawField>,
    #[serde(default, alias = "daysBefore")]
    pub days_before: Option<RawField>,
    #[serde(default, alias = "dayOfWeek")]
    pub day_of_week: Option<RawField>,
    #[serde(default)]
    pub time: Option<RawField>,
    #[serde(default)]
    pub category: Option<RawField>,
}

impl RawAttributeRecord {
    pub fn new(
        months_as_member: impl Into<RawField>,
        weight: impl Into<RawField>,
        days_before: impl Into<RawField>,
        day_of_week: impl Into<String>,
        time: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            months_as_member: Some(months_as_member.into()),
            weight: Some(weight.into()),
            days_before: Some(days_before.into()),
            day_of_week: Some(RawField::Text(day_of_week.into())),
            time: Some(RawField::Text(time.into())),
            category: Some(RawField::Text(category.into())),
        }
    }
}

/// Day of the week a class is held on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    /// Parse a three-letter token or the full English day name
    pub fn from_token(token: &str) -> Option<Self> {
        let day = match token {
            "Mon" | "Monday" => DayOfWeek::Mon,
            "Tue" | "Tuesday" => DayOfWeek::Tue,
            "Wed" | "Wednesday" => DayOfWeek::Wed,
            "Thu" | "Thursday" => DayOfWeek::Thu,
            "Fri" | "Friday" => DayOfWeek::Fri,
            "Sat" | "Saturday" => DayOfWeek::Sat,
            "Sun" | "Sunday" => DayOfWeek::Sun,
            _ => return None,
        };
        Some(day)
    }

    /// Ordinal used by the training data: Mon=1 ... Sun=7
    pub fn ordinal(self) -> u8 {
        match self {
            DayOfWeek::Mon => 1,
            DayOfWeek::Tue => 2,
            DayOfWeek::Wed => 3,
            DayOfWeek::Thu => 4,
            DayOfWeek::Fri => 5,
            DayOfWeek::Sat => 6,
            DayOfWeek::Sun => 7,
        }
    }
}

/// Time slot of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassTime {
    Morning,
    Evening,
}

impl ClassTime {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "AM" | "Morning" => Some(ClassTime::Morning),
            "PM" | "Evening" => Some(ClassTime::Evening),
            _ => None,
        }
    }

    /// Binary indicator kept by the schema as `time_PM`
    pub fn is_evening(self) -> bool {
        matches!(self, ClassTime::Evening)
    }
}

/// Class category offered by the gym
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassCategory {
    Hiit,
    Cycling,
    Strength,
    Yoga,
    Aqua,
    Unknown,
}

impl ClassCategory {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HIIT" => Some(ClassCategory::Hiit),
            "Cycling" => Some(ClassCategory::Cycling),
            "Strength" => Some(ClassCategory::Strength),
            "Yoga" => Some(ClassCategory::Yoga),
            "Aqua" => Some(ClassCategory::Aqua),
            // "-" is how the raw dataset marks a missing category
            "Unknown" | "unknown" | "-" => Some(ClassCategory::Unknown),
            _ => None,
        }
    }

    /// Schema slot index for this category, if the trained schema has one.
    ///
    /// Aqua has no column in the fitted model and returns `None`.
    pub fn one_hot_slot(self) -> Option<usize> {
        match self {
            ClassCategory::Cycling => Some(4),
            ClassCategory::Hiit => Some(5),
            ClassCategory::Strength => Some(6),
            ClassCategory::Yoga => Some(7),
            ClassCategory::Unknown => Some(8),
            ClassCategory::Aqua => None,
        }
    }
}

/// Fixed-length, schema-ordered model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f32; NUM_FEATURES],
}

impl FeatureVector {
    pub(crate) fn from_values(values: [f32; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values.to_vec()
    }

    pub fn len(&self) -> usize {
        NUM_FEATURES
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Look up a slot by its schema name
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_SCHEMA
            .iter()
            .position(|slot| *slot == name)
            .map(|idx| self.values[idx])
    }

    /// Iterate `(slot name, value)` pairs in schema order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_SCHEMA.iter().copied().zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_FEATURES))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Binary attendance outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceLabel {
    Attend,
    NotAttend,
}

impl AttendanceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceLabel::Attend => "attend",
            AttendanceLabel::NotAttend => "not_attend",
        }
    }
}

impl fmt::Display for AttendanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label plus probability of the attend class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: AttendanceLabel,
    pub probability: f32,
}
