//! Retrieval quality evaluation.
//!
//! Labelled cases score two things: did retrieval surface the right source
//! documents for a question, and did the generated answer contain the facts
//! it should. Retrieval scoring runs against the engine directly; answer
//! scoring takes the answer as a string, so callers decide whether a real
//! completion client is in the loop.

use crate::error::IndexResult;
use crate::retriever::RetrievalEngine;

/// One labelled evaluation question.
#[derive(Debug, Clone)]
pub struct EvalCase {
    pub question: String,
    /// Source filenames retrieval should surface.
    pub expected_sources: Vec<String>,
    /// Keywords the answer should contain, matched case-insensitively.
    pub expected_keywords: Vec<String>,
    pub collection: String,
}

impl EvalCase {
    pub fn new(
        question: impl Into<String>,
        expected_sources: Vec<String>,
        expected_keywords: Vec<String>,
    ) -> Self {
        Self {
            question: question.into(),
            expected_sources,
            expected_keywords,
            collection: "eval".to_string(),
        }
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

/// Scores for one case. `keyword_recall` stays `None` until an answer is
/// scored with [`CaseResult::score_answer`].
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub question: String,
    pub sources: Vec<String>,
    pub source_recall: f64,
    pub answer: Option<String>,
    pub keyword_recall: Option<f64>,
}

impl CaseResult {
    /// Folds a generated answer in, scoring keyword recall against the case.
    pub fn score_answer(mut self, case: &EvalCase, answer: &str) -> Self {
        self.keyword_recall = Some(keyword_recall(&case.expected_keywords, answer));
        self.answer = Some(answer.to_string());
        self
    }
}

/// Fraction of expected sources present among the retrieved ones. An empty
/// expectation scores 1.0.
pub fn source_recall(expected: &[String], retrieved: &[String]) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let hits = expected
        .iter()
        .filter(|source| retrieved.contains(source))
        .count();
    hits as f64 / expected.len() as f64
}

/// Fraction of expected keywords appearing in the answer, case-insensitively.
/// An empty expectation scores 1.0.
pub fn keyword_recall(expected: &[String], answer: &str) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let answer = answer.to_lowercase();
    let hits = expected
        .iter()
        .filter(|keyword| answer.contains(&keyword.to_lowercase()))
        .count();
    hits as f64 / expected.len() as f64
}

/// Runs the retrieval half of one case: query the engine, dedup sources in
/// ranking order, score source recall.
pub fn run_retrieval_case(
    engine: &RetrievalEngine,
    case: &EvalCase,
    k: usize,
) -> IndexResult<CaseResult> {
    let chunks = engine.answer_context(&case.collection, &case.question, k)?;

    let mut sources: Vec<String> = Vec::new();
    for chunk in &chunks {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }

    Ok(CaseResult {
        question: case.question.clone(),
        source_recall: source_recall(&case.expected_sources, &sources),
        sources,
        answer: None,
        keyword_recall: None,
    })
}

/// Aggregated results over a case set.
#[derive(Debug)]
pub struct EvalReport {
    pub results: Vec<CaseResult>,
}

impl EvalReport {
    pub fn mean_source_recall(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total: f64 = self.results.iter().map(|r| r.source_recall).sum();
        total / self.results.len() as f64
    }

    /// Mean over the cases whose answers were scored; `None` if none were.
    pub fn mean_keyword_recall(&self) -> Option<f64> {
        let scored: Vec<f64> = self.results.iter().filter_map(|r| r.keyword_recall).collect();
        if scored.is_empty() {
            return None;
        }
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    }
}

/// Runs retrieval scoring for every case.
pub fn run_retrieval_eval(
    engine: &RetrievalEngine,
    cases: &[EvalCase],
    k: usize,
) -> IndexResult<EvalReport> {
    let results = cases
        .iter()
        .map(|case| run_retrieval_case(engine, case, k))
        .collect::<IndexResult<Vec<_>>>()?;
    Ok(EvalReport { results })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn source_recall_counts_hits_over_expected() {
        let expected = strings(&["alice.pdf", "bob.docx"]);
        assert_eq!(source_recall(&expected, &strings(&["alice.pdf"])), 0.5);
        assert_eq!(
            source_recall(&expected, &strings(&["bob.docx", "alice.pdf", "extra.txt"])),
            1.0
        );
        assert_eq!(source_recall(&expected, &[]), 0.0);
    }

    #[test]
    fn empty_expectations_score_perfect() {
        assert_eq!(source_recall(&[], &strings(&["anything.txt"])), 1.0);
        assert_eq!(keyword_recall(&[], "any answer"), 1.0);
    }

    #[test]
    fn keyword_recall_is_case_insensitive() {
        let expected = strings(&["Korean", "chemistry"]);
        assert_eq!(
            keyword_recall(&expected, "The candidate speaks korean and studied CHEMISTRY."),
            1.0
        );
        assert_eq!(keyword_recall(&expected, "Fluent in korean only."), 0.5);
        assert_eq!(keyword_recall(&expected, "No relevant skills."), 0.0);
    }

    #[test]
    fn score_answer_fills_in_keyword_recall() {
        let case = EvalCase::new("Who knows Korean?", vec![], strings(&["Korean"]));
        let result = CaseResult {
            question: case.question.clone(),
            sources: vec![],
            source_recall: 1.0,
            answer: None,
            keyword_recall: None,
        };

        let scored = result.score_answer(&case, "Alice knows Korean.");
        assert_eq!(scored.keyword_recall, Some(1.0));
        assert_eq!(scored.answer.as_deref(), Some("Alice knows Korean."));
    }

    #[test]
    fn report_means_cover_scored_cases_only() {
        let report = EvalReport {
            results: vec![
                CaseResult {
                    question: "q1".into(),
                    sources: vec![],
                    source_recall: 1.0,
                    answer: Some("a".into()),
                    keyword_recall: Some(0.5),
                },
                CaseResult {
                    question: "q2".into(),
                    sources: vec![],
                    source_recall: 0.0,
                    answer: None,
                    keyword_recall: None,
                },
            ],
        };

        assert_eq!(report.mean_source_recall(), 0.5);
        assert_eq!(report.mean_keyword_recall(), Some(0.5));

        let empty = EvalReport { results: vec![] };
        assert_eq!(empty.mean_source_recall(), 0.0);
        assert_eq!(empty.mean_keyword_recall(), None);
    }
}
