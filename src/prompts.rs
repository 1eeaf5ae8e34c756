//! Instruction prompt for receipt extraction.
//!
//! The prompt is part of the contract with [`crate::pipeline::parse`]: it
//! asks for bare JSON with four named fields, or a single `error` field when
//! the receipt cannot be read. The parser tolerates a code fence around the
//! answer but never prose.

use crate::receipt::Category;
use once_cell::sync::Lazy;

/// Reply the model is told to use for unreadable receipts.
pub const UNREADABLE_REPLY: &str =
    r#"{"error": "Could not read receipt. Please upload a clearer image."}"#;

/// The instruction sent alongside every receipt image.
pub static RECEIPT_PROMPT: Lazy<String> = Lazy::new(|| {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a tax assistant. Analyze the attached receipt image and extract the following.
Return ONLY valid JSON. No markdown. No extra text.

{{
  "merchant": "name of the business/store",
  "total": "total amount as a number (e.g., 42.99)",
  "category": "one of: {categories}",
  "justification": "1-2 sentence explanation of why this category applies"
}}

If the receipt is unreadable, return:
{UNREADABLE_REPLY}"#
    )
});
