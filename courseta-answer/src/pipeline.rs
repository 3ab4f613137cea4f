//! Answer synthesis pipeline
//!
//! One request, one attempt, one deadline. The upstream call runs inside
//! a genuine cancellable timeout clamped to the remaining budget, so a
//! slow completion is aborted instead of merely detected after the fact;
//! elapsed time is re-checked once more after the call returns.

use crate::context::assemble_context;
use crate::llm_client::{ChatMessage, CompletionApi};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use courseta_core::{Answer, CoursetaError, CoursetaResult, ErrorContext, Question, Snapshot};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Wall-clock budget for one answer, measured request start to return
pub const ANSWER_BUDGET: Duration = Duration::from_secs(30);

/// Token budget for one completion
const DEFAULT_MAX_TOKENS: u32 = 500;

/// Outcome of parsing the model's reply: either it honored the requested
/// JSON shape, or we keep the raw text. Both are valid end states.
#[derive(Debug)]
pub enum ModelReply {
    Structured(Answer),
    Raw(String),
}

impl ModelReply {
    /// Strict parse attempt with the mandatory raw fallback; the upstream
    /// model is not guaranteed to honor the requested output shape.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Answer>(raw.trim()) {
            Ok(answer) => ModelReply::Structured(answer),
            Err(e) => {
                debug!("Model reply is not structured JSON ({}), keeping raw text", e);
                ModelReply::Raw(raw.to_string())
            }
        }
    }

    pub fn into_answer(self) -> Answer {
        match self {
            ModelReply::Structured(answer) => answer.clamp_links(),
            ModelReply::Raw(text) => Answer {
                answer: text,
                links: Vec::new(),
            },
        }
    }
}

/// The deadline-bounded question-to-answer pipeline
pub struct AnswerPipeline {
    completion: Box<dyn CompletionApi>,
    budget: Duration,
    max_tokens: u32,
}

impl AnswerPipeline {
    pub fn new(completion: Box<dyn CompletionApi>) -> Self {
        Self {
            completion,
            budget: ANSWER_BUDGET,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the latency budget; tests use tiny budgets
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Answer a student question against the given snapshot.
    ///
    /// `image_base64` is validated by decoding and then discarded; only
    /// its presence reaches the model.
    pub async fn answer(
        &self,
        text: &str,
        image_base64: Option<&str>,
        snapshot: &Snapshot,
    ) -> CoursetaResult<Answer> {
        let started = Instant::now();

        let question = validate_question(text, image_base64)?;
        let context = assemble_context(snapshot);
        let prompt = build_prompt(&question, &context);

        let remaining = self.budget.saturating_sub(started.elapsed());
        let raw = tokio::time::timeout(
            remaining,
            self.completion
                .complete(vec![ChatMessage::user(prompt)], self.max_tokens),
        )
        .await
        .map_err(|_| self.deadline_error(started))??;

        let answer = ModelReply::parse(&raw).into_answer();

        // the budget covers the whole pipeline, not just the upstream call
        let elapsed = started.elapsed();
        if elapsed > self.budget {
            warn!("Answer produced but budget exceeded ({:?})", elapsed);
            return Err(self.deadline_error(started));
        }

        info!(
            "Answered in {:?} with {} links",
            elapsed,
            answer.links.len()
        );
        Ok(answer)
    }

    fn deadline_error(&self, started: Instant) -> CoursetaError {
        CoursetaError::DeadlineExceeded {
            operation: "answer".to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            budget_ms: self.budget.as_millis() as u64,
            context: ErrorContext::new("answer_pipeline").with_operation("answer"),
        }
    }
}

/// Decode and validate the optional image; the bytes themselves never
/// travel further than this function.
fn validate_question(text: &str, image_base64: Option<&str>) -> CoursetaResult<Question> {
    let image = match image_base64 {
        Some(encoded) => Some(BASE64.decode(encoded.trim()).map_err(|e| {
            CoursetaError::InvalidInput {
                message: format!("Invalid base64 image: {}", e),
                field: Some("image".to_string()),
                context: ErrorContext::new("answer_pipeline")
                    .with_operation("validate_question")
                    .with_suggestion("Send the image as standard base64 without a data: prefix"),
            }
        })?),
        None => None,
    };

    Ok(Question {
        text: text.to_string(),
        image,
    })
}

fn build_prompt(question: &Question, context: &str) -> String {
    let image_note = if question.image.is_some() {
        "An image was attached to this question; assume it contains relevant context \
         (for example a screenshot), but do not process it directly.\n"
    } else {
        ""
    };

    format!(
        "You are a virtual Teaching Assistant for the Tools in Data Science course.\n\
         Answer the student's question based on the course content and Discourse posts \
         given as context.\n\
         {image_note}\
         Provide a concise answer and include up to two relevant Discourse links.\n\
         Format the response as a JSON object with 'answer' and 'links' fields, where \
         'links' is a list of objects with 'url' and 'text' fields.\n\
         \n\
         Question: {question}\n\
         Context: {context}\n",
        image_note = image_note,
        question = question.text,
        context = context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courseta_core::AnswerLink;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Completion double: canned reply, call counter, optional delay
    struct FakeCompletion {
        reply: String,
        calls: Arc<AtomicU32>,
        last_prompt: Arc<Mutex<String>>,
        delay: Option<Duration>,
    }

    impl FakeCompletion {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Arc::new(AtomicU32::new(0)),
                last_prompt: Arc::new(Mutex::new(String::new())),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl CompletionApi for FakeCompletion {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            _max_tokens: u32,
        ) -> CoursetaResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_structured_reply_is_returned_verbatim() {
        let fake = FakeCompletion::replying(r#"{"answer":"x","links":[]}"#);
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let answer = pipeline
            .answer("What is Docker?", None, &Snapshot::empty())
            .await
            .unwrap();

        assert_eq!(answer.answer, "x");
        assert!(answer.links.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_reply_falls_back_to_raw_text() {
        let fake = FakeCompletion::replying("just text");
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let answer = pipeline
            .answer("What is Docker?", None, &Snapshot::empty())
            .await
            .unwrap();

        assert_eq!(answer.answer, "just text");
        assert!(answer.links.is_empty());
    }

    #[tokio::test]
    async fn test_links_are_clamped_to_two() {
        let fake = FakeCompletion::replying(
            r#"{"answer":"see threads","links":[
                {"url":"https://forum.example/t/1","text":"one"},
                {"url":"https://forum.example/t/2","text":"two"},
                {"url":"https://forum.example/t/3","text":"three"}
            ]}"#,
        );
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let answer = pipeline
            .answer("GA deadlines?", None, &Snapshot::empty())
            .await
            .unwrap();

        assert_eq!(
            answer.links,
            vec![
                AnswerLink {
                    url: "https://forum.example/t/1".to_string(),
                    text: "one".to_string()
                },
                AnswerLink {
                    url: "https://forum.example/t/2".to_string(),
                    text: "two".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_base64_never_reaches_the_model() {
        let fake = FakeCompletion::replying(r#"{"answer":"x","links":[]}"#);
        let calls = fake.calls.clone();
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let result = pipeline
            .answer("What is Docker?", Some("!!!not-base64!!!"), &Snapshot::empty())
            .await;

        assert!(matches!(result, Err(CoursetaError::InvalidInput { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_image_is_acknowledged_but_not_forwarded() {
        let fake = FakeCompletion::replying(r#"{"answer":"x","links":[]}"#);
        let last_prompt = fake.last_prompt.clone();
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let encoded = BASE64.encode(b"\x89PNG fake image bytes");
        pipeline
            .answer("Whats on this screenshot?", Some(&encoded), &Snapshot::empty())
            .await
            .unwrap();

        let prompt = last_prompt.lock().unwrap();
        assert!(prompt.contains("An image was attached"));
        // the bytes themselves stay out of the prompt
        assert!(!prompt.contains(&encoded));
    }

    #[tokio::test]
    async fn test_slow_upstream_is_cancelled_with_deadline_error() {
        let mut fake = FakeCompletion::replying(r#"{"answer":"late","links":[]}"#);
        fake.delay = Some(Duration::from_secs(5));
        let pipeline =
            AnswerPipeline::new(Box::new(fake)).with_budget(Duration::from_millis(20));

        let started = Instant::now();
        let result = pipeline
            .answer("What is Docker?", None, &Snapshot::empty())
            .await;

        assert!(matches!(
            result,
            Err(CoursetaError::DeadlineExceeded { .. })
        ));
        // cancelled at the budget, not after the full upstream delay
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_snapshot_question_uses_no_links() {
        // with no corpus there is no context to source links from
        let fake = FakeCompletion::replying(
            r#"{"answer":"Docker is a container platform.","links":[]}"#,
        );
        let last_prompt = fake.last_prompt.clone();
        let pipeline = AnswerPipeline::new(Box::new(fake));

        let answer = pipeline
            .answer("What is Docker?", None, &Snapshot::empty())
            .await
            .unwrap();

        assert_eq!(answer.answer, "Docker is a container platform.");
        assert!(answer.links.is_empty());
        assert!(last_prompt.lock().unwrap().contains("Context: \n"));
    }

    #[test]
    fn test_model_reply_parse_states() {
        assert!(matches!(
            ModelReply::parse(r#"{"answer":"a","links":[]}"#),
            ModelReply::Structured(_)
        ));
        assert!(matches!(ModelReply::parse("not json"), ModelReply::Raw(_)));
        // a JSON value of the wrong shape is also the raw fallback
        assert!(matches!(ModelReply::parse(r#"[1,2,3]"#), ModelReply::Raw(_)));
    }
}
