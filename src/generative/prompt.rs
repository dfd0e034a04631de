use std::fmt::Write;

use crate::models::{BudgetRequest, CURRENCY, PlaceCandidate};

const RESPONSE_FORMAT: &str = r#"Respond with ONLY a JSON object, no prose, in exactly this shape:
{
  "accommodation": <number>,
  "food": <number>,
  "transportation": <number>,
  "activities": <number>,
  "miscellaneous": <number>,
  "total": <number, the sum of the five categories>,
  "insights": "<two or three sentences of practical money-saving advice>"
}"#;

fn trip_summary(request: &BudgetRequest) -> String {
    format!(
        "Estimate the total trip cost in {CURRENCY} for {} traveller(s) spending {} day(s) in {} during {}. \
All amounts are for the whole group and the whole trip, as plain numbers without currency symbols.",
        request.party_size, request.days, request.destination, request.season
    )
}

/// Prompt for an estimate without any place data
#[must_use]
pub fn generic_prompt(request: &BudgetRequest) -> String {
    format!(
        "You are a travel budget planner.\n{}\n\n{RESPONSE_FORMAT}",
        trip_summary(request)
    )
}

/// Prompt grounding the estimate in specific lodging and dining options
#[must_use]
pub fn hybrid_prompt(
    request: &BudgetRequest,
    lodging: &[PlaceCandidate],
    dining: &[PlaceCandidate],
) -> String {
    let mut prompt = format!(
        "You are a travel budget planner.\n{}\n\n\
Base accommodation and food costs on these real, top-rated options \
(price tier runs from $ = budget to $$$$ = luxury):\n",
        trip_summary(request)
    );

    append_places(&mut prompt, "Hotels", lodging);
    append_places(&mut prompt, "Restaurants", dining);

    prompt.push_str("\nMention the specific options you priced in the insights.\n\n");
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

fn append_places(prompt: &mut String, heading: &str, places: &[PlaceCandidate]) {
    if places.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "{heading}:");
    for place in places {
        let rating = place
            .rating
            .map_or_else(|| "unrated".to_string(), |r| format!("{r:.1}/5"));
        let _ = writeln!(
            prompt,
            "- {} (rating {}, price tier {})",
            place.name,
            rating,
            place.price_label()
        );
    }
}
