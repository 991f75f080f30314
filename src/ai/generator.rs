// src/ai/generator.rs
//
// Orchestrates AI question generation: staggered fan-out across question
// slots, bounded retries with exponential backoff, duplicate filtering by
// fingerprint, and fallback-template backfill for every slot the AI path
// cannot fill.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::{
    ai::{
        client::{ChatBackend, ChatError, SamplingParams},
        fallback::TemplateBank,
        parser::{self, ParsedQuestion},
    },
    config::{
        GENERATION_BACKOFF_BASE_MS, GENERATION_BACKOFF_CAP_MS, GENERATION_MAX_COUNT,
        GENERATION_MAX_RETRIES, GENERATION_STAGGER_MS,
    },
    models::question::{GenerateQuestionsRequest, GeneratedQuestion, QuestionSource},
};

const SYSTEM_PROMPT: &str = "You are an experienced exam item writer. You produce rigorous, \
     unambiguous multiple-choice questions and always respond with a single JSON object.";

/// Batch-level failures. Per-slot failures never surface here: a slot that
/// exhausts its retries is silently backfilled from the template bank.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no network connectivity: {0}")]
    Offline(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A completed batch with aggregate source counts.
#[derive(Debug)]
pub struct GeneratedBatch {
    pub questions: Vec<GeneratedQuestion>,
    pub ai_count: usize,
    pub fallback_count: usize,
}

pub struct QuestionGenerator {
    /// `None` when no API key is configured; generation then serves
    /// fallback templates only.
    backend: Option<Arc<dyn ChatBackend>>,
    model: String,
    backup_model: String,
}

impl QuestionGenerator {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, model: String, backup_model: String) -> Self {
        Self {
            backend,
            model,
            backup_model,
        }
    }

    /// Produces exactly `req.count` unique questions, preferring AI output
    /// and backfilling from the template bank.
    pub async fn generate(
        &self,
        req: &GenerateQuestionsRequest,
    ) -> Result<GeneratedBatch, GenerationError> {
        if req.count == 0 || req.count > GENERATION_MAX_COUNT {
            return Err(GenerationError::InvalidRequest(format!(
                "count must be between 1 and {}",
                GENERATION_MAX_COUNT
            )));
        }

        let difficulty = req.challenge.as_deref().unwrap_or("standard").to_string();

        let slots: Vec<Result<Option<ParsedQuestion>, GenerationError>> =
            if let Some(backend) = &self.backend {
                let tasks: Vec<_> = (0..req.count)
                    .map(|index| self.fill_slot(backend, req, index))
                    .collect();
                futures::future::join_all(tasks).await
            } else {
                tracing::info!("generation backend disabled; serving fallback templates only");
                (0..req.count).map(|_| Ok(None)).collect()
            };

        // A connectivity failure anywhere fails the whole batch: the caller
        // should learn the network is down, not receive templates.
        let mut parsed_slots = Vec::with_capacity(slots.len());
        for slot in slots {
            parsed_slots.push(slot?);
        }

        let mut bank = TemplateBank::new();
        let mut fingerprints: HashSet<String> = HashSet::new();
        let mut questions = Vec::with_capacity(req.count);
        let mut ai_count = 0;
        let mut fallback_count = 0;

        for (index, slot) in parsed_slots.into_iter().enumerate() {
            match slot {
                Some(parsed) => {
                    let fp = fingerprint(&parsed.text, &parsed.options[0], &parsed.options[1]);
                    if fingerprints.insert(fp) {
                        ai_count += 1;
                        questions.push(finish_ai(req.subject.clone(), parsed));
                    } else {
                        tracing::warn!(slot = index, "duplicate completion dropped, backfilling");
                        questions.push(backfill(
                            &mut bank,
                            &mut fingerprints,
                            &req.subject,
                            &difficulty,
                            index,
                            true,
                        ));
                        fallback_count += 1;
                    }
                }
                None => {
                    questions.push(backfill(
                        &mut bank,
                        &mut fingerprints,
                        &req.subject,
                        &difficulty,
                        index,
                        false,
                    ));
                    fallback_count += 1;
                }
            }
        }

        tracing::info!(
            subject = %req.subject,
            requested = req.count,
            ai = ai_count,
            fallback = fallback_count,
            "generation batch complete"
        );

        Ok(GeneratedBatch {
            questions,
            ai_count,
            fallback_count,
        })
    }

    /// Runs one question slot: staggered start, then up to
    /// 1 + GENERATION_MAX_RETRIES calls with exponential backoff.
    /// Returns Ok(None) when the AI path is exhausted for this slot.
    async fn fill_slot(
        &self,
        backend: &Arc<dyn ChatBackend>,
        req: &GenerateQuestionsRequest,
        index: usize,
    ) -> Result<Option<ParsedQuestion>, GenerationError> {
        // Stagger slot starts so sibling prompts do not land simultaneously.
        tokio::time::sleep(Duration::from_millis(GENERATION_STAGGER_MS * index as u64)).await;

        let request_id = Uuid::new_v4();
        let mut model = self.model.as_str();

        for attempt in 0..=GENERATION_MAX_RETRIES {
            let params = sampling_for(index, attempt);
            let angle: u32 = StdRng::from_entropy().gen_range(1..=99);
            let prompt = build_prompt(req, index, request_id, angle);

            match backend.complete(model, SYSTEM_PROMPT, &prompt, params).await {
                Ok(text) => match parser::extract_question(&text) {
                    Some(parsed) => return Ok(Some(parsed)),
                    None => {
                        tracing::warn!(slot = index, attempt, "completion had no usable question");
                    }
                },
                // Connectivity problems are non-transient: abort at once.
                Err(ChatError::Connectivity(msg)) => return Err(GenerationError::Offline(msg)),
                Err(ChatError::RateLimited) => {
                    tracing::warn!(slot = index, attempt, "rate limited; switching to backup model");
                    model = self.backup_model.as_str();
                }
                Err(e) => {
                    tracing::warn!(slot = index, attempt, error = %e, "completion failed");
                }
            }

            if attempt < GENERATION_MAX_RETRIES {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }

        Ok(None)
    }
}

/// Sampling varies by slot and attempt so sibling prompts explore
/// different regions of the model's output distribution.
fn sampling_for(index: usize, attempt: u32) -> SamplingParams {
    let step = (index as u32 + attempt) % 4;
    SamplingParams {
        temperature: 0.65 + 0.1 * f64::from(step),
        top_p: 0.85 + 0.04 * f64::from(attempt % 3),
        max_tokens: 600 + 100 * (index as u32 % 3),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = GENERATION_BACKOFF_BASE_MS
        .saturating_mul(1u64 << attempt)
        .min(GENERATION_BACKOFF_CAP_MS);
    Duration::from_millis(ms)
}

fn build_prompt(
    req: &GenerateQuestionsRequest,
    index: usize,
    request_id: Uuid,
    angle: u32,
) -> String {
    let difficulty = req.challenge.as_deref().unwrap_or("standard");
    let objective = req
        .objective
        .as_deref()
        .map(|o| format!("Target learning objective: {}.\n", o))
        .unwrap_or_default();

    format!(
        "Write one multiple-choice exam question for the subject \"{}\".\n\
         Difficulty: {}.\n\
         {}Return ONLY a JSON object with exactly these keys:\n\
         {{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"answer\": \"A\", \"explanation\": \"...\"}}\n\
         The four options must be plausible and distinct, and \"answer\" must be the letter of the correct option.\n\
         This is question {} of a set; approach the topic from angle #{} and do not repeat phrasing used for other questions in the set.\n\
         request-id: {}",
        req.subject,
        difficulty,
        objective,
        index + 1,
        angle,
        request_id
    )
}

fn finish_ai(subject: String, parsed: ParsedQuestion) -> GeneratedQuestion {
    GeneratedQuestion {
        id: Uuid::new_v4().to_string(),
        subject,
        text: parsed.text,
        options: parsed.options,
        answer: parsed.answer.to_string(),
        explanation: parsed.explanation,
        source: QuestionSource::Ai,
        generated_at: Utc::now(),
    }
}

/// Draws a fallback question that does not collide with any fingerprint
/// already in the batch. Replacements for dropped duplicates carry an
/// index tag and a numeric suffix so they cannot re-collide.
fn backfill(
    bank: &mut TemplateBank,
    fingerprints: &mut HashSet<String>,
    subject: &str,
    difficulty: &str,
    index: usize,
    tag_replacement: bool,
) -> GeneratedQuestion {
    let mut question = bank.draw(subject, difficulty);

    if tag_replacement {
        let salt: u32 = StdRng::from_entropy().gen_range(1000..10_000);
        question.text = format!("[v{}] {} #{}", index + 1, question.text, salt);
    }

    loop {
        let fp = fingerprint(&question.text, &question.options[0], &question.options[1]);
        if fingerprints.insert(fp) {
            break;
        }
        let salt: u32 = StdRng::from_entropy().gen_range(1000..10_000);
        question.text = format!("{} #{}", question.text, salt);
    }

    question
}

/// Near-duplicate key over the question-text prefix and the first two
/// option prefixes.
fn fingerprint(text: &str, option_a: &str, option_b: &str) -> String {
    format!(
        "{}|{}|{}",
        prefix(text, 50),
        prefix(option_a, 20),
        prefix(option_b, 20)
    )
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<String, ChatError>>>,
        models_seen: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<String, ChatError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                models_seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            model: &str,
            _system: &str,
            _user: &str,
            _params: SamplingParams,
        ) -> Result<String, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.models_seen.lock().unwrap().push(model.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatError::Empty))
        }
    }

    fn request(count: usize) -> GenerateQuestionsRequest {
        GenerateQuestionsRequest {
            subject: "mathematics".to_string(),
            count,
            objective: None,
            challenge: None,
        }
    }

    fn question_json(stem: &str) -> Result<String, ChatError> {
        Ok(format!(
            r#"{{"question": "{} and what follows from it?", "options": ["alpha", "beta", "gamma", "delta"], "answer": "B", "explanation": "because"}}"#,
            stem
        ))
    }

    fn generator(backend: Arc<ScriptedBackend>) -> QuestionGenerator {
        QuestionGenerator::new(
            Some(backend as Arc<dyn ChatBackend>),
            "primary-model".to_string(),
            "backup-model".to_string(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn returns_exactly_n_ai_questions() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            question_json("What is one plus one"),
            question_json("What is two plus two"),
            question_json("What is three plus three"),
        ]));
        let generator = generator(backend.clone());

        let batch = generator.generate(&request(3)).await.unwrap();

        assert_eq!(batch.questions.len(), 3);
        assert_eq!(batch.ai_count, 3);
        assert_eq!(batch.fallback_count, 0);
        for q in &batch.questions {
            assert!(!q.text.is_empty());
            assert_eq!(q.options.len(), 4);
            assert!(q.options.iter().all(|o| !o.is_empty()));
            assert_eq!(q.source, QuestionSource::Ai);
        }
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_completions_are_backfilled() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            question_json("Exactly the same stem"),
            question_json("Exactly the same stem"),
            question_json("Exactly the same stem"),
        ]));
        let generator = generator(backend);

        let batch = generator.generate(&request(3)).await.unwrap();

        assert_eq!(batch.questions.len(), 3);
        assert_eq!(batch.ai_count, 1);
        assert_eq!(batch.fallback_count, 2);

        let fps: HashSet<String> = batch
            .questions
            .iter()
            .map(|q| fingerprint(&q.text, &q.options[0], &q.options[1]))
            .collect();
        assert_eq!(fps.len(), 3, "fingerprints must be unique across the batch");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_slots_fall_back_to_templates() {
        // Empty script: every call fails, so both slots retry to exhaustion.
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let generator = generator(backend.clone());

        let batch = generator.generate(&request(2)).await.unwrap();

        assert_eq!(batch.questions.len(), 2);
        assert_eq!(batch.ai_count, 0);
        assert_eq!(batch.fallback_count, 2);
        for q in &batch.questions {
            assert_eq!(q.source, QuestionSource::Fallback);
        }
        // 1 initial + GENERATION_MAX_RETRIES calls per slot.
        assert_eq!(backend.calls(), 2 * (1 + GENERATION_MAX_RETRIES as usize));
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_error_aborts_without_retry() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(ChatError::Connectivity(
            "dns failure".to_string(),
        ))]));
        let generator = generator(backend.clone());

        let result = generator.generate(&request(1)).await;

        assert!(matches!(result, Err(GenerationError::Offline(_))));
        assert_eq!(backend.calls(), 1, "connectivity errors must not be retried");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_switches_to_backup_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(ChatError::RateLimited),
            question_json("Question after the model switch"),
        ]));
        let generator = generator(backend.clone());

        let batch = generator.generate(&request(1)).await.unwrap();

        assert_eq!(batch.ai_count, 1);
        let models = backend.models_seen.lock().unwrap().clone();
        assert_eq!(models, vec!["primary-model", "backup-model"]);
    }

    #[tokio::test]
    async fn disabled_backend_serves_templates_only() {
        let generator = QuestionGenerator::new(None, "m".to_string(), "m".to_string());

        let batch = generator.generate(&request(4)).await.unwrap();

        assert_eq!(batch.questions.len(), 4);
        assert_eq!(batch.ai_count, 0);
        assert_eq!(batch.fallback_count, 4);
    }

    #[tokio::test]
    async fn rejects_out_of_range_count() {
        let generator = QuestionGenerator::new(None, "m".to_string(), "m".to_string());

        assert!(matches!(
            generator.generate(&request(0)).await,
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(matches!(
            generator.generate(&request(11)).await,
            Err(GenerationError::InvalidRequest(_))
        ));
    }
}
