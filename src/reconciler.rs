//! Turns the agent's free-form transcript into structured recommendations.

use serde_json::Value;
use tracing::{info, warn};

use crate::completion::{TextCompletion, strip_code_fences};
use crate::error::CompletionError;
use crate::recommendation::{
    PLACEHOLDER_POSTER_URL, Recommendation, RecommendationSet, THEATER_INDEX_URL,
};

/// Result of interpreting the model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(Vec<Recommendation>),
    Diagnostic(Recommendation),
}

impl ParseOutcome {
    pub fn into_set(self) -> RecommendationSet {
        match self {
            ParseOutcome::Parsed(records) => RecommendationSet::new(records),
            ParseOutcome::Diagnostic(record) => RecommendationSet::new(vec![record]),
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, ParseOutcome::Diagnostic(_))
    }
}

pub struct Reconciler<C> {
    completion: C,
}

impl<C: TextCompletion> Reconciler<C> {
    pub fn new(completion: C) -> Self {
        Self { completion }
    }

    /// Makes exactly one completion call. Only a failed call is an error;
    /// an unusable reply degrades to the diagnostic record.
    pub async fn reconcile(&self, transcript: &str) -> Result<RecommendationSet, CompletionError> {
        let prompt = build_prompt(transcript);
        let response = self.completion.complete(&prompt).await?;

        let outcome = parse_response(&response, transcript);
        match &outcome {
            ParseOutcome::Parsed(records) => info!(count = records.len(), "structured recommendations"),
            ParseOutcome::Diagnostic(_) => warn!(
                response = %response.trim(),
                "completion reply was not a JSON array, using diagnostic record"
            ),
        }
        Ok(outcome.into_set())
    }
}

/// Interprets the reply: a JSON array becomes one record per element, anything
/// else becomes the diagnostic record carrying `transcript`.
pub fn parse_response(response: &str, transcript: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(strip_code_fences(response)) {
        Ok(Value::Array(items)) => ParseOutcome::Parsed(
            items
                .iter()
                .map(Recommendation::from_loose_mapping)
                .collect(),
        ),
        Ok(_) | Err(_) => ParseOutcome::Diagnostic(Recommendation::diagnostic(transcript)),
    }
}

pub fn build_prompt(transcript: &str) -> String {
    format!(
        r#"
We have the following text describing multiple recommended movies (some Hebrew, some English):
{transcript}

Please extract each recommended movie as an **array of JSON objects** with the **exact** keys:
- "poster" (a direct URL or fallback "{PLACEHOLDER_POSTER_URL}")
- "hebrew_title"
- "english_title"
- "hebrew_summary" (RTL)
- "english_summary"
- "age_range"
- "family_friendly_reason"
- "ticket_link": the specific link from {THEATER_INDEX_URL} for that movie's tickets
  (if no exact link was found, fallback to "{THEATER_INDEX_URL}")

Make **no** additional text, headings, or code fences.
Output **only** valid JSON, e.g.:

[
  {{
    "poster": "https://example.com/poster.jpg",
    "hebrew_title": "הנכס",
    "english_title": "The Asset",
    "hebrew_summary": "עלילה משפחתית...",
    "english_summary": "A family-oriented plot...",
    "age_range": "12+",
    "family_friendly_reason": "Shows a strong bond between grandparents and grandchildren.",
    "ticket_link": "https://hotcinema.co.il/movie/abcd1234"
  }},
  ...
]
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextCompletion for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| CompletionError::EmptyResponse("scripted failure".into()))
        }
    }

    fn full_record(n: usize) -> Value {
        json!({
            "poster": format!("https://img.example/{n}.jpg"),
            "hebrew_title": format!("סרט {n}"),
            "english_title": format!("Movie {n}"),
            "hebrew_summary": "תקציר",
            "english_summary": "Summary",
            "age_range": "8+",
            "family_friendly_reason": "Gentle humour",
            "ticket_link": format!("https://hotcinema.co.il/movie/{n}"),
        })
    }

    #[tokio::test]
    async fn valid_array_preserves_order_and_values() {
        let input = [full_record(1), full_record(2), full_record(3)];
        let reply = json!(input).to_string();
        let reconciler = Reconciler::new(Scripted::replying(&reply));

        let records = reconciler.reconcile("transcript").await.unwrap().into_inner();

        let expected: Vec<Value> = input.to_vec();
        let actual: Vec<Value> = records
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(records[0].hebrew_title, "סרט 1");
        assert_eq!(records[2].ticket_link, "https://hotcinema.co.il/movie/3");
    }

    #[tokio::test]
    async fn missing_key_defaults_only_that_key() {
        let mut record = full_record(7);
        record.as_object_mut().unwrap().remove("poster");
        let reply = json!([record]).to_string();
        let reconciler = Reconciler::new(Scripted::replying(&reply));

        let set = reconciler.reconcile("t").await.unwrap();
        let rec = set.iter().next().unwrap();

        assert_eq!(rec.poster, PLACEHOLDER_POSTER_URL);
        assert_eq!(rec.english_title, "Movie 7");
        assert_eq!(rec.age_range, "8+");
    }

    #[tokio::test]
    async fn non_json_reply_yields_single_diagnostic() {
        let reconciler = Reconciler::new(Scripted::replying("not json"));

        let set = reconciler.reconcile("the raw transcript").await.unwrap();

        assert_eq!(set.len(), 1);
        let rec = set.iter().next().unwrap();
        assert_eq!(rec.hebrew_summary, "the raw transcript");
        assert_eq!(rec.english_summary, "Could not parse JSON from LLM translation.");
    }

    #[tokio::test]
    async fn object_reply_is_treated_as_malformed() {
        let reply = full_record(1).to_string();
        let reconciler = Reconciler::new(Scripted::replying(&reply));

        let set = reconciler.reconcile("kept").await.unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap(), &Recommendation::diagnostic("kept"));
    }

    #[tokio::test]
    async fn empty_array_yields_empty_set() {
        let reconciler = Reconciler::new(Scripted::replying("[]"));
        let set = reconciler.reconcile("").await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn failed_call_propagates() {
        let reconciler = Reconciler::new(Scripted {
            reply: Err(()),
            prompts: Mutex::new(Vec::new()),
        });
        let err = reconciler.reconcile("t").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn prompt_embeds_transcript_and_fallbacks_once() {
        let completion = Scripted::replying("[]");
        let reconciler = Reconciler::new(completion);
        reconciler.reconcile("Frozen II, ages 6+").await.unwrap();

        let prompts = reconciler.completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Frozen II, ages 6+"));
        assert!(prompts[0].contains(PLACEHOLDER_POSTER_URL));
        assert!(prompts[0].contains(THEATER_INDEX_URL));
    }

    #[test]
    fn fenced_array_is_accepted() {
        let outcome = parse_response("```json\n[{\"english_title\": \"Up\"}]\n```", "t");
        match outcome {
            ParseOutcome::Parsed(records) => assert_eq!(records[0].english_title, "Up"),
            ParseOutcome::Diagnostic(_) => panic!("expected parsed records"),
        }
    }

    #[test]
    fn uppercase_fence_is_accepted() {
        let outcome = parse_response("```JSON\n[{\"english_title\": \"Coco\"}]\n```", "t");
        assert_eq!(outcome.into_set().into_inner()[0].english_title, "Coco");
    }

    #[test]
    fn malformed_element_is_defaulted_not_diagnostic() {
        let outcome = parse_response(r#"[{"english_title": "Up"}, 42]"#, "t");
        assert!(!outcome.is_diagnostic());
        let set = outcome.into_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().nth(1).unwrap(), &Recommendation::default());
    }
}
