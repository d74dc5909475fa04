//! The structured record a run produces for each recommended movie.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PLACEHOLDER_POSTER_URL: &str = "https://via.placeholder.com/300x450/000/fff?text=No+Poster";
pub const THEATER_INDEX_URL: &str = "https://hotcinema.co.il/theater/1";

/// Keys every record carries, in display order.
pub const FIELDS: [&str; 8] = [
    "poster",
    "hebrew_title",
    "english_title",
    "hebrew_summary",
    "english_summary",
    "age_range",
    "family_friendly_reason",
    "ticket_link",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub poster: String,
    pub hebrew_title: String,
    pub english_title: String,
    /// Right-to-left text.
    pub hebrew_summary: String,
    pub english_summary: String,
    pub age_range: String,
    pub family_friendly_reason: String,
    pub ticket_link: String,
}

impl Default for Recommendation {
    fn default() -> Self {
        Self {
            poster: PLACEHOLDER_POSTER_URL.to_string(),
            hebrew_title: String::new(),
            english_title: String::new(),
            hebrew_summary: String::new(),
            english_summary: String::new(),
            age_range: String::new(),
            family_friendly_reason: String::new(),
            ticket_link: THEATER_INDEX_URL.to_string(),
        }
    }
}

impl Recommendation {
    /// Value substituted for `field` when it is missing or unusable.
    pub fn default_for(field: &str) -> &'static str {
        match field {
            "poster" => PLACEHOLDER_POSTER_URL,
            "ticket_link" => THEATER_INDEX_URL,
            _ => "",
        }
    }

    /// Coerces an arbitrary JSON value into a record. Never fails: each key
    /// that is absent or not a scalar takes its default, and a non-object
    /// value yields an all-default record.
    pub fn from_loose_mapping(mapping: &Value) -> Self {
        let read = |field: &str| -> String {
            let value = match mapping.get(field) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => return Self::default_for(field).to_string(),
            };
            if is_url_field(field) && value.trim().is_empty() {
                Self::default_for(field).to_string()
            } else {
                value
            }
        };

        Self {
            poster: read("poster"),
            hebrew_title: read("hebrew_title"),
            english_title: read("english_title"),
            hebrew_summary: read("hebrew_summary"),
            english_summary: read("english_summary"),
            age_range: read("age_range"),
            family_friendly_reason: read("family_friendly_reason"),
            ticket_link: read("ticket_link"),
        }
    }

    /// The record shown when the model's reply could not be structured. The
    /// raw transcript is kept so the operator still sees what the agent found.
    pub fn diagnostic(transcript: &str) -> Self {
        Self {
            poster: PLACEHOLDER_POSTER_URL.to_string(),
            hebrew_title: "שגיאת JSON".to_string(),
            english_title: "JSON Error".to_string(),
            hebrew_summary: transcript.to_string(),
            english_summary: "Could not parse JSON from LLM translation.".to_string(),
            age_range: "N/A".to_string(),
            family_friendly_reason: "N/A".to_string(),
            ticket_link: THEATER_INDEX_URL.to_string(),
        }
    }
}

fn is_url_field(field: &str) -> bool {
    matches!(field, "poster" | "ticket_link")
}

/// Ordered records handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationSet(Vec<Recommendation>);

impl RecommendationSet {
    pub fn new(records: Vec<Recommendation>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Recommendation> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Recommendation> {
        self.0
    }
}

impl From<Vec<Recommendation>> for RecommendationSet {
    fn from(records: Vec<Recommendation>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a RecommendationSet {
    type Item = &'a Recommendation;
    type IntoIter = std::slice::Iter<'a, Recommendation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_poster_takes_placeholder_and_keeps_other_fields() {
        let rec = Recommendation::from_loose_mapping(&json!({
            "hebrew_title": "הנכס",
            "english_title": "The Asset",
            "age_range": "12+",
            "ticket_link": "https://hotcinema.co.il/movie/abcd1234"
        }));

        assert_eq!(rec.poster, PLACEHOLDER_POSTER_URL);
        assert_eq!(rec.hebrew_title, "הנכס");
        assert_eq!(rec.english_title, "The Asset");
        assert_eq!(rec.age_range, "12+");
        assert_eq!(rec.ticket_link, "https://hotcinema.co.il/movie/abcd1234");
        assert_eq!(rec.hebrew_summary, "");
    }

    #[test]
    fn blank_links_fall_back() {
        let rec = Recommendation::from_loose_mapping(&json!({
            "poster": "   ",
            "ticket_link": ""
        }));
        assert_eq!(rec.poster, PLACEHOLDER_POSTER_URL);
        assert_eq!(rec.ticket_link, THEATER_INDEX_URL);
    }

    #[test]
    fn scalar_values_are_stringified_and_others_defaulted() {
        let rec = Recommendation::from_loose_mapping(&json!({
            "age_range": 12,
            "family_friendly_reason": true,
            "english_summary": null,
            "hebrew_summary": ["not", "a", "string"]
        }));
        assert_eq!(rec.age_range, "12");
        assert_eq!(rec.family_friendly_reason, "true");
        assert_eq!(rec.english_summary, "");
        assert_eq!(rec.hebrew_summary, "");
    }

    #[test]
    fn non_object_yields_default_record() {
        let rec = Recommendation::from_loose_mapping(&json!("just a string"));
        assert_eq!(rec, Recommendation::default());
    }

    #[test]
    fn diagnostic_preserves_transcript() {
        let rec = Recommendation::diagnostic("raw agent output");
        assert_eq!(rec.hebrew_summary, "raw agent output");
        assert_eq!(rec.english_title, "JSON Error");
        assert_eq!(rec.age_range, "N/A");
        assert_eq!(rec.ticket_link, THEATER_INDEX_URL);
    }

    #[test]
    fn field_list_matches_serialized_keys() {
        let value = serde_json::to_value(Recommendation::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FIELDS.len());
        for field in FIELDS {
            assert!(object.contains_key(field), "missing {field}");
        }
    }
}
