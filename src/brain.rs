use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::completion::{ChatModel, strip_code_fences};
use crate::types::{ChatMessage, PageState, Step};

const SYSTEM_PROMPT: &str = r#"You are a browser automation agent. You control a real Chrome browser by issuing ONE step at a time as JSON.

Available actions:
- {"action":"Navigate","url":"https://..."}
- {"action":"WaitFor","selector":"[data-eid=\"[e0]\"]","timeout_ms":5000}
- {"action":"TypeInto","selector":"[data-eid=\"[e0]\"]","text":"search query"}
- {"action":"Click","selector":"[data-eid=\"[e0]\"]"}
- {"action":"PressKey","key":"Enter"}
- {"action":"Scroll","pixels":800}
- {"action":"Extract","selector":"body","label":"main_content"}
- {"action":"Done","summary":"<the complete answer to the task>"}

Rules:
1. Return ONLY a single JSON object per response. No markdown, no explanation.
2. Use the [eN] element IDs from the DOM snapshot to target elements. Use selector format: [data-eid="[eN]"]
3. After each step the system shows you the new page DOM (and a screenshot when available). Decide your next step based on what you see.
4. Use Extract to read long listings, and Scroll when content is below the fold.
5. When the task is accomplished, use Done. The summary is the ONLY output kept, so it must contain the full answer, including image and ticket URLs you saw.
6. If you encounter an error, try an alternative approach.
7. Keep steps minimal. Do not over-navigate."#;

/// Conversation state for one navigation run. Nothing is persisted.
pub struct Brain<'a, M> {
    model: &'a M,
    conversation: Vec<ChatMessage>,
}

impl<'a, M: ChatModel> Brain<'a, M> {
    pub fn new(model: &'a M, goal: &str) -> Self {
        Self {
            model,
            conversation: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Task: {goal}\n\nThe browser is on the current page. What is your next step?"
                )),
            ],
        }
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    /// Feed observation back to the LLM. Only the newest screenshot is kept.
    pub fn observe(&mut self, page_state: &PageState, screenshot: Option<&[u8]>) {
        let mut observation = format!(
            "Page URL: {}\nTitle: {}\n\nDOM:\n{}",
            page_state.url, page_state.title, page_state.dom_snapshot
        );

        if let Some(ref err) = page_state.error {
            observation.push_str(&format!("\n\nERROR from last step: {err}"));
        }

        for ext in &page_state.extracted {
            observation.push_str(&format!("\n\nExtracted [{}]: {}", ext.label, ext.content));
        }

        if screenshot.is_some() {
            for message in &mut self.conversation {
                message.image_png = None;
            }
        }

        let mut message = ChatMessage::user(observation);
        message.image_png = screenshot.map(|png| STANDARD.encode(png));
        self.conversation.push(message);
    }

    /// Tell the LLM its last reply could not be used.
    pub fn reject(&mut self, error: &str) {
        self.conversation.push(ChatMessage::user(format!(
            "ERROR from last step: {error}\n\nReply with a single valid JSON action."
        )));
    }

    /// Ask the LLM for the next step.
    pub async fn decide_next_step(&mut self) -> Result<Step> {
        if self.conversation.len() > 40 {
            debug!(messages = self.conversation.len(), "conversation history is long");
        }

        let content = self.model.chat(&self.conversation).await?;
        debug!(%content, "LLM replied");

        self.conversation.push(ChatMessage::assistant(content.clone()));

        parse_step(&content)
    }
}

pub fn parse_step(content: &str) -> Result<Step> {
    let cleaned = strip_code_fences(content);
    serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, content = %cleaned, "could not parse step");
        anyhow!("Failed to parse LLM response: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use async_trait::async_trait;

    struct Echo(&'static str);

    #[async_trait]
    impl ChatModel for Echo {
        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parses_fenced_step() {
        let step = parse_step("```json\n{\"action\":\"Navigate\",\"url\":\"https://hotcinema.co.il\"}\n```")
            .unwrap();
        assert_eq!(
            step,
            Step::Navigate {
                url: "https://hotcinema.co.il".to_string()
            }
        );
    }

    #[test]
    fn parses_id_selector() {
        let step = parse_step(r##"{"action":"Click","selector":"#buy"}"##).unwrap();
        assert_eq!(
            step,
            Step::Click {
                selector: "#buy".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(parse_step(r#"{"action":"Teleport"}"#).is_err());
        assert!(parse_step("I will click the button").is_err());
    }

    #[test]
    fn only_latest_screenshot_is_kept() {
        let model = Echo("{}");
        let mut brain = Brain::new(&model, "find movies");
        let page = PageState::default();

        brain.observe(&page, Some(b"first".as_slice()));
        brain.observe(&page, None);
        brain.observe(&page, Some(b"second".as_slice()));

        let images: Vec<_> = brain
            .conversation()
            .iter()
            .filter_map(|m| m.image_png.as_deref())
            .collect();
        assert_eq!(images, [STANDARD.encode(b"second")]);
    }

    #[test]
    fn observation_includes_errors_and_extractions() {
        let model = Echo("{}");
        let mut brain = Brain::new(&model, "find movies");
        brain.observe(
            &PageState {
                url: "https://hotcinema.co.il".into(),
                title: "Hot Cinema".into(),
                error: Some("element not found".into()),
                extracted: vec![crate::types::Extraction {
                    label: "listing".into(),
                    content: "Moana 2".into(),
                }],
                ..PageState::default()
            },
            None,
        );
        let last = &brain.conversation().last().unwrap().content;
        assert!(last.contains("ERROR from last step: element not found"));
        assert!(last.contains("Extracted [listing]: Moana 2"));
    }

    #[tokio::test]
    async fn decision_is_recorded_in_conversation() {
        let model = Echo(r#"{"action":"Done","summary":"Paddington"}"#);
        let mut brain = Brain::new(&model, "find movies");

        let step = brain.decide_next_step().await.unwrap();

        assert_eq!(
            step,
            Step::Done {
                summary: "Paddington".into()
            }
        );
        assert_eq!(brain.conversation().last().unwrap().role, "assistant");
    }
}
