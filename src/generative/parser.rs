//! Extraction of a budget object from free-form model output

use serde_json::{Map, Value};

use crate::models::{CostBreakdown, MAX_AMOUNT};

/// Budget fields as stated by a model, rounded to whole units.
/// Missing or unusable numbers are 0. Every field is at most [`MAX_AMOUNT`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiBudget {
    pub accommodation: u64,
    pub food: u64,
    pub transportation: u64,
    pub activities: u64,
    pub miscellaneous: u64,
    pub total: u64,
    pub insights: String,
}

impl AiBudget {
    /// Five-category breakdown whose sum honours the stated total where
    /// possible: a shortfall against the total is booked as miscellaneous,
    /// and categories exceeding the total win over it.
    #[must_use]
    pub fn breakdown(&self) -> CostBreakdown {
        let mut breakdown = CostBreakdown {
            accommodation: self.accommodation,
            food: self.food,
            transportation: self.transportation,
            activities: self.activities,
            miscellaneous: self.miscellaneous,
        };
        let sum = breakdown.sum();
        if self.total > sum {
            breakdown.miscellaneous = breakdown.miscellaneous.saturating_add(self.total - sum);
        }
        breakdown
    }
}

/// Remove a surrounding Markdown code fence (with or without a language tag)
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json", "JSON", ...) up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Widest `{ ... }` span: from the first opening brace to the last closing one
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output into an [`AiBudget`]. `None` when no JSON object can
/// be recovered or any amount exceeds [`MAX_AMOUNT`].
#[must_use]
pub fn parse_budget(text: &str) -> Option<AiBudget> {
    let candidate = extract_json_object(strip_code_fences(text))?;
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;

    Some(AiBudget {
        accommodation: amount(object, "accommodation")?,
        food: amount(object, "food")?,
        transportation: amount(object, "transportation")?,
        activities: amount(object, "activities")?,
        miscellaneous: amount(object, "miscellaneous")?,
        total: amount(object, "total")?,
        insights: insights(object),
    })
}

/// Rounded amount of `field`, 0 when absent or not a positive number.
/// `None` when the value is out of range.
fn amount(object: &Map<String, Value>, field: &str) -> Option<u64> {
    let raw = match object.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_numeric_string(s),
        _ => None,
    };
    match raw {
        Some(v) if v.is_infinite() => None,
        Some(v) if v.is_finite() && v > 0.0 => {
            let rounded = v.round();
            // bounds checked before the cast
            (rounded <= MAX_AMOUNT as f64).then_some(rounded as u64)
        }
        _ => Some(0),
    }
}

/// Accepts "1,200", "$ 1200.50", "1200 USD"
fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .trim_end_matches("USD")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

fn insights(object: &Map<String, Value>) -> String {
    match object.get("insights") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fenced_json_with_missing_fields() {
        let text = "```json\n{\"total\": 5000, \"accommodation\": 2000}\n```";
        let budget = parse_budget(text).unwrap();
        assert_eq!(budget.total, 5000);
        assert_eq!(budget.accommodation, 2000);
        assert_eq!(budget.food, 0);
        assert_eq!(budget.transportation, 0);
        assert_eq!(budget.activities, 0);
        assert_eq!(budget.miscellaneous, 0);
        assert!(budget.insights.is_empty());
    }

    #[rstest]
    #[case("```json\n{\"a\": 1}\n```", "{\"a\": 1}")]
    #[case("```\n{\"a\": 1}\n```", "{\"a\": 1}")]
    #[case("```JSON{\"a\": 1}```", "{\"a\": 1}")]
    #[case("  {\"a\": 1}  ", "{\"a\": 1}")]
    fn test_strip_code_fences(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_code_fences(input), expected);
    }

    #[test]
    fn test_extract_uses_widest_braces() {
        let text = "Here you go: {\"total\": 10, \"nested\": {\"x\": 1}} Enjoy!";
        assert_eq!(
            extract_json_object(text),
            Some("{\"total\": 10, \"nested\": {\"x\": 1}}")
        );
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_prose_around_json() {
        let text = "Sure! Based on current prices:\n{\"food\": 180.4, \"total\": 180.6, \"insights\": \"Eat local.\"}\nHave fun.";
        let budget = parse_budget(text).unwrap();
        assert_eq!(budget.food, 180);
        assert_eq!(budget.total, 181);
        assert_eq!(budget.insights, "Eat local.");
    }

    #[rstest]
    #[case(r#"{"total": "1,200"}"#, 1200)]
    #[case(r#"{"total": "$ 99.5"}"#, 100)]
    #[case(r#"{"total": "450 USD"}"#, 450)]
    #[case(r#"{"total": -20}"#, 0)]
    #[case(r#"{"total": "lots"}"#, 0)]
    #[case(r#"{"total": null}"#, 0)]
    fn test_numeric_coercion(#[case] text: &str, #[case] expected: u64) {
        assert_eq!(parse_budget(text).unwrap().total, expected);
    }

    #[test]
    fn test_unparsable_content() {
        assert!(parse_budget("not json at all").is_none());
        assert!(parse_budget("{ total: 5000 }").is_none());
        assert!(parse_budget("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_insights_array_is_joined() {
        let budget = parse_budget(r#"{"total": 1, "insights": ["Book early.", " Carry cash. "]}"#).unwrap();
        assert_eq!(budget.insights, "Book early. Carry cash.");
    }

    #[test]
    fn test_breakdown_books_shortfall_as_miscellaneous() {
        let budget = parse_budget("{\"total\": 5000, \"accommodation\": 2000}").unwrap();
        let breakdown = budget.breakdown();
        assert_eq!(breakdown.accommodation, 2000);
        assert_eq!(breakdown.miscellaneous, 3000);
        assert_eq!(breakdown.sum(), 5000);
    }

    #[test]
    fn test_breakdown_ignores_understated_total() {
        let budget = AiBudget {
            accommodation: 600,
            food: 300,
            total: 500,
            ..AiBudget::default()
        };
        assert_eq!(budget.breakdown().sum(), 900);
        assert_eq!(budget.breakdown().miscellaneous, 0);
    }

    #[rstest]
    #[case(r#"{"food": 1e19, "accommodation": 1e19, "total": 1}"#)]
    #[case(r#"{"total": 1e300}"#)]
    #[case(r#"{"food": "99999999999999999999", "total": 10}"#)]
    fn test_out_of_range_amounts_are_rejected(#[case] text: &str) {
        assert_eq!(parse_budget(text), None);
    }

    #[test]
    fn test_largest_amounts_still_sum() {
        let budget = AiBudget {
            accommodation: MAX_AMOUNT,
            food: MAX_AMOUNT,
            transportation: MAX_AMOUNT,
            activities: MAX_AMOUNT,
            miscellaneous: MAX_AMOUNT,
            total: MAX_AMOUNT,
            ..AiBudget::default()
        };
        assert_eq!(budget.breakdown().sum(), 5 * MAX_AMOUNT);
    }
}
