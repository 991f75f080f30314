// src/ai/parser.rs
//
// The LLM is asked for a JSON object but is not guaranteed to emit one.
// Extraction is layered: strict JSON first, then a fenced code block,
// then a naive field-by-field sweep over plain text.

use regex::Regex;
use serde::Deserialize;

/// An option shorter than this (after trimming) is rejected.
const MIN_OPTION_LEN: usize = 1;

/// A question stem shorter than this is considered garbage.
const MIN_QUESTION_LEN: usize = 10;

/// A question successfully pulled out of a raw completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuestion {
    pub text: String,
    pub options: Vec<String>,
    /// Correct answer letter, normalized to 'A'..'D'.
    pub answer: char,
    pub explanation: String,
}

/// Wire shape of the JSON object the prompt asks for.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "text")]
    question: String,
    options: Vec<String>,
    #[serde(alias = "correct_answer", alias = "correctAnswer")]
    answer: String,
    #[serde(default)]
    explanation: String,
}

/// Attempts to extract one multiple-choice question from a completion.
/// Returns `None` when no strategy produces an acceptable question.
pub fn extract_question(raw: &str) -> Option<ParsedQuestion> {
    if let Some(q) = extract_json(raw) {
        return Some(q);
    }
    if let Some(q) = extract_fenced(raw) {
        return Some(q);
    }
    extract_fields(raw)
}

/// Strategy 1: grab the outermost brace span and parse it as JSON.
fn extract_json(raw: &str) -> Option<ParsedQuestion> {
    let greedy = Regex::new(r"\{[\s\S]*\}").unwrap();
    let lazy = Regex::new(r"\{[\s\S]*?\}").unwrap();

    for re in [&greedy, &lazy] {
        if let Some(m) = re.find(raw) {
            if let Ok(parsed) = serde_json::from_str::<RawQuestion>(m.as_str()) {
                if let Some(q) = accept(parsed) {
                    return Some(q);
                }
            }
        }
    }
    None
}

/// Strategy 2: look inside a ``` fenced block, which may carry prose braces
/// around it that defeat the whole-string match.
fn extract_fenced(raw: &str) -> Option<ParsedQuestion> {
    let fence = Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap();
    let body = fence.captures(raw)?.get(1)?.as_str();

    let brace = Regex::new(r"\{[\s\S]*\}").unwrap();
    let span = brace.find(body)?;
    let parsed = serde_json::from_str::<RawQuestion>(span.as_str()).ok()?;
    accept(parsed)
}

/// Strategy 3: last resort, pick fields out of plain text line by line.
fn extract_fields(raw: &str) -> Option<ParsedQuestion> {
    let question_re = Regex::new(r"(?im)^\s*(?:question|q)\s*[:.]\s*(.+)$").unwrap();
    let option_re = Regex::new(r"(?im)^\s*([A-D])\s*[.):]\s*(.+)$").unwrap();
    let answer_re =
        Regex::new(r"(?i)(?:correct\s+answer|answer)\s*(?:is)?\s*[:.]?\s*\(?([A-Da-d])\)?").unwrap();
    let explanation_re = Regex::new(r"(?im)^\s*explanation\s*[:.]\s*(.+)$").unwrap();

    let text = question_re.captures(raw)?.get(1)?.as_str().trim().to_string();

    let mut options = vec![None, None, None, None];
    for cap in option_re.captures_iter(raw) {
        let letter = cap.get(1)?.as_str().chars().next()?;
        let idx = (letter as u8 - b'A') as usize;
        if options[idx].is_none() {
            options[idx] = Some(cap.get(2)?.as_str().trim().to_string());
        }
    }
    let options: Vec<String> = options.into_iter().collect::<Option<Vec<_>>>()?;

    let answer = answer_re.captures(raw)?.get(1)?.as_str().to_string();

    let explanation = explanation_re
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    accept(RawQuestion {
        question: text,
        options,
        answer,
        explanation,
    })
}

/// Gatekeeper for every strategy: four sufficiently long options,
/// a plausible stem, and a recognizable answer letter.
fn accept(raw: RawQuestion) -> Option<ParsedQuestion> {
    let text = raw.question.trim().to_string();
    if text.chars().count() < MIN_QUESTION_LEN {
        return None;
    }

    if raw.options.len() != 4 {
        return None;
    }
    let options: Vec<String> = raw.options.iter().map(|o| o.trim().to_string()).collect();
    if options.iter().any(|o| o.chars().count() < MIN_OPTION_LEN) {
        return None;
    }

    let answer = answer_letter(&raw.answer)?;

    Some(ParsedQuestion {
        text,
        options,
        answer,
        explanation: raw.explanation.trim().to_string(),
    })
}

/// Normalizes an answer field ("c", "C)", "Answer C") to a letter.
fn answer_letter(raw: &str) -> Option<char> {
    raw.chars()
        .map(|c| c.to_ascii_uppercase())
        .find(|c| ('A'..='D').contains(c))
}
