// src/ai/analyzer.rs
//
// Exam performance analysis: one LLM call, no retry. The free-text report
// is split into sections by keyword search over paragraph breaks; when the
// call fails, a generic summary computed from the raw score substitutes.

use std::sync::Arc;

use serde::Serialize;

use crate::ai::client::{ChatBackend, SamplingParams};
use crate::models::exam_record::AnalyzeExamRequest;

const SYSTEM_PROMPT: &str = "You are a supportive tutor. You review exam results and write a \
     concise performance report in plain paragraphs separated by blank lines.";

const ANALYSIS_PARAMS: SamplingParams = SamplingParams {
    temperature: 0.4,
    top_p: 0.9,
    max_tokens: 900,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Ai,
    Fallback,
}

/// Sectioned performance report returned to the client.
/// `full_text` always carries the unsplit report, so nothing is lost when
/// a paragraph matches no section keyword.
#[derive(Debug, Serialize)]
pub struct ExamAnalysis {
    pub overview: String,
    pub strengths: String,
    pub weaknesses: String,
    pub recommendations: String,
    pub full_text: String,
    pub source: AnalysisSource,
    pub correct_count: usize,
    pub total_questions: usize,
}

pub struct ExamAnalyzer {
    backend: Option<Arc<dyn ChatBackend>>,
    model: String,
}

impl ExamAnalyzer {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, model: String) -> Self {
        Self { backend, model }
    }

    /// Analyzes a completed exam. Never fails: any upstream problem
    /// degrades to the score-derived generic summary.
    pub async fn analyze(&self, req: &AnalyzeExamRequest) -> ExamAnalysis {
        let total = req.answers.len();
        let correct = req
            .answers
            .iter()
            .filter(|a| {
                a.user_answer
                    .trim()
                    .eq_ignore_ascii_case(a.correct_answer.trim())
            })
            .count();

        let backend = match &self.backend {
            Some(backend) => backend,
            None => return generic_summary(&req.subject, correct, total),
        };

        let prompt = build_prompt(req, correct, total);

        match backend
            .complete(&self.model, SYSTEM_PROMPT, &prompt, ANALYSIS_PARAMS)
            .await
        {
            Ok(text) => {
                let (overview, strengths, weaknesses, recommendations) = partition_report(&text);
                ExamAnalysis {
                    overview,
                    strengths,
                    weaknesses,
                    recommendations,
                    full_text: text,
                    source: AnalysisSource::Ai,
                    correct_count: correct,
                    total_questions: total,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "exam analysis failed; using generic summary");
                generic_summary(&req.subject, correct, total)
            }
        }
    }
}

fn build_prompt(req: &AnalyzeExamRequest, correct: usize, total: usize) -> String {
    let mut lines = String::new();
    for (i, a) in req.answers.iter().enumerate() {
        let mark = if a.user_answer.trim().eq_ignore_ascii_case(a.correct_answer.trim()) {
            "correct"
        } else {
            "incorrect"
        };
        lines.push_str(&format!(
            "{}. {} — expected: {}, given: {} ({})\n",
            i + 1,
            a.question,
            a.correct_answer,
            a.user_answer,
            mark
        ));
    }

    format!(
        "A student scored {} out of {} on a {} exam. The answered questions:\n\n{}\n\
         Write a short performance report as plain paragraphs separated by blank lines: \
         an overall summary, then the student's strengths, then the weaknesses they should \
         improve, then concrete recommendations for further study.",
        correct, total, req.subject, lines
    )
}

/// Splits a free-text report into sections by keyword search over
/// paragraph breaks. Paragraphs matching no keyword accumulate into the
/// overview.
fn partition_report(text: &str) -> (String, String, String, String) {
    let mut overview = Vec::new();
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let lower = paragraph.to_lowercase();
        if lower.contains("strength") {
            strengths.push(paragraph);
        } else if lower.contains("weak") || lower.contains("improve") {
            weaknesses.push(paragraph);
        } else if lower.contains("recommend") || lower.contains("suggest") {
            recommendations.push(paragraph);
        } else {
            overview.push(paragraph);
        }
    }

    (
        overview.join("\n\n"),
        strengths.join("\n\n"),
        weaknesses.join("\n\n"),
        recommendations.join("\n\n"),
    )
}

/// Score-derived report used when the AI path is unavailable.
fn generic_summary(subject: &str, correct: usize, total: usize) -> ExamAnalysis {
    let pct = if total == 0 { 0 } else { correct * 100 / total };

    let overview = format!(
        "You answered {} of {} questions correctly in {} ({}%).",
        correct, total, subject, pct
    );

    let (strengths, weaknesses, recommendations) = if pct >= 80 {
        (
            "Strong overall command of the material at this level.".to_string(),
            "Only a few gaps remain; review the questions you missed.".to_string(),
            "Move on to harder material, and retry the missed questions in a week.".to_string(),
        )
    } else if pct >= 50 {
        (
            "A solid foundation: more than half the questions were answered correctly.".to_string(),
            "Several topics still cause mistakes; go through each missed question's explanation."
                .to_string(),
            "Practice a focused set on the weakest topics before the next full exam.".to_string(),
        )
    } else {
        (
            "You completed the exam, which is the first step.".to_string(),
            "Most questions were missed; the fundamentals of this subject need revisiting."
                .to_string(),
            "Restudy the basics with short practice sets, then retake this exam.".to_string(),
        )
    };

    let full_text = format!(
        "{}\n\n{}\n\n{}\n\n{}",
        overview, strengths, weaknesses, recommendations
    );

    ExamAnalysis {
        overview,
        strengths,
        weaknesses,
        recommendations,
        full_text,
        source: AnalysisSource::Fallback,
        correct_count: correct,
        total_questions: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::ChatError;
    use crate::models::exam_record::AnsweredQuestion;
    use async_trait::async_trait;

    struct FixedBackend(Result<String, ()>);

    #[async_trait]
    impl ChatBackend for FixedBackend {
        async fn complete(
            &self,
            _model: &str,
            _system: &str,
            _user: &str,
            _params: SamplingParams,
        ) -> Result<String, ChatError> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(ChatError::Upstream {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    fn sample_request() -> AnalyzeExamRequest {
        AnalyzeExamRequest {
            subject: "physics".to_string(),
            answers: vec![
                AnsweredQuestion {
                    question: "What is the SI unit of force?".to_string(),
                    correct_answer: "A".to_string(),
                    user_answer: "A".to_string(),
                },
                AnsweredQuestion {
                    question: "What is the SI unit of power?".to_string(),
                    correct_answer: "B".to_string(),
                    user_answer: "C".to_string(),
                },
            ],
        }
    }

    #[test]
    fn partitions_by_keywords() {
        let report = "Overall a decent attempt across the paper.\n\n\
                      Your main strength is mechanics.\n\n\
                      You should improve your unit conversions.\n\n\
                      I recommend two short practice sets per week.";
        let (overview, strengths, weaknesses, recommendations) = partition_report(report);
        assert_eq!(overview, "Overall a decent attempt across the paper.");
        assert!(strengths.contains("mechanics"));
        assert!(weaknesses.contains("unit conversions"));
        assert!(recommendations.contains("practice sets"));
    }

    #[test]
    fn unmatched_paragraphs_accumulate_in_overview() {
        let report = "First paragraph.\n\nSecond paragraph.";
        let (overview, strengths, weaknesses, recommendations) = partition_report(report);
        assert_eq!(overview, "First paragraph.\n\nSecond paragraph.");
        assert!(strengths.is_empty());
        assert!(weaknesses.is_empty());
        assert!(recommendations.is_empty());
    }

    #[test]
    fn generic_summary_reports_the_score() {
        let analysis = generic_summary("physics", 1, 2);
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(analysis.correct_count, 1);
        assert_eq!(analysis.total_questions, 2);
        assert!(analysis.overview.contains("1 of 2"));
        assert!(analysis.overview.contains("50%"));
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_generic_summary() {
        let analyzer = ExamAnalyzer::new(
            Some(Arc::new(FixedBackend(Err(())))),
            "model".to_string(),
        );
        let analysis = analyzer.analyze(&sample_request()).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(analysis.correct_count, 1);
    }

    #[tokio::test]
    async fn successful_call_returns_sectioned_ai_report() {
        let report = "Good effort overall.\n\nYour strength is definitions.\n\n\
                      You should improve calculations.\n\nI recommend daily drills.";
        let analyzer = ExamAnalyzer::new(
            Some(Arc::new(FixedBackend(Ok(report.to_string())))),
            "model".to_string(),
        );
        let analysis = analyzer.analyze(&sample_request()).await;
        assert_eq!(analysis.source, AnalysisSource::Ai);
        assert_eq!(analysis.full_text, report);
        assert!(analysis.strengths.contains("definitions"));
    }

    #[tokio::test]
    async fn missing_backend_uses_generic_summary() {
        let analyzer = ExamAnalyzer::new(None, "model".to_string());
        let analysis = analyzer.analyze(&sample_request()).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
    }
}
