//! Receipt extraction result and the expense category enumeration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Expense categories the model may assign.
///
/// The set is closed; anything the model invents is reported as
/// [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
    #[serde(rename = "Meals & Entertainment")]
    MealsAndEntertainment,
    Travel,
    Equipment,
    Software,
    #[serde(rename = "Professional Services")]
    ProfessionalServices,
    Marketing,
    Utilities,
    Insurance,
    Other,
}

impl Category {
    /// Every category, in the order the prompt lists them.
    pub const ALL: [Category; 10] = [
        Category::OfficeSupplies,
        Category::MealsAndEntertainment,
        Category::Travel,
        Category::Equipment,
        Category::Software,
        Category::ProfessionalServices,
        Category::Marketing,
        Category::Utilities,
        Category::Insurance,
        Category::Other,
    ];

    /// Exact label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::OfficeSupplies => "Office Supplies",
            Category::MealsAndEntertainment => "Meals & Entertainment",
            Category::Travel => "Travel",
            Category::Equipment => "Equipment",
            Category::Software => "Software",
            Category::ProfessionalServices => "Professional Services",
            Category::Marketing => "Marketing",
            Category::Utilities => "Utilities",
            Category::Insurance => "Insurance",
            Category::Other => "Other",
        }
    }

    /// Match a label case-insensitively, ignoring surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Category> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised extraction result returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub merchant: String,
    /// Decimal amount as text, e.g. `"42.99"`.
    pub total: String,
    pub category: String,
    pub justification: String,
}

impl ExtractionResult {
    /// The fixed answer served in demo mode.
    pub fn demo() -> Self {
        Self {
            merchant: "Demo Store".to_string(),
            total: "42.99".to_string(),
            category: Category::OfficeSupplies.as_str().to_string(),
            justification: "Demo mode enabled. No AI call was made.".to_string(),
        }
    }

    /// Build a result from the model's decoded JSON object.
    ///
    /// Missing or `null` fields take their defaults: merchant `"Unknown"`,
    /// total `"0"`, category `"Other"`, justification `""`. Numbers and
    /// booleans are rendered as text. Categories outside [`Category::ALL`]
    /// become `"Other"`.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let merchant = text_field(fields, "merchant").unwrap_or_else(|| "Unknown".to_string());
        let total = text_field(fields, "total").unwrap_or_else(|| "0".to_string());
        let justification = text_field(fields, "justification").unwrap_or_default();

        let category = match text_field(fields, "category") {
            None => Category::Other,
            Some(raw) => Category::from_label(&raw).unwrap_or_else(|| {
                warn!(category = %raw, "model returned unknown category, using Other");
                Category::Other
            }),
        };

        Self {
            merchant,
            total,
            category: category.as_str().to_string(),
            justification,
        }
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
