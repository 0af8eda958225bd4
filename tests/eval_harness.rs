//! Evaluation harness driven end to end: fixture documents indexed with a
//! deterministic embedding provider, retrieval scored per case, answers
//! scored from canned completions.

mod common;

use common::HashingProvider;
use docqa::config::ChunkingConfig;
use docqa::eval::{EvalCase, run_retrieval_case, run_retrieval_eval};
use docqa::retriever::RetrievalEngine;
use std::sync::Arc;

const KOREAN_RESUME: &str = "Fluent in Korean and English. Built translation tools.";
const CHEMISTRY_RESUME: &str = "Five years of analytical chemistry lab experience.";
const ARCHITECTURE_RESUME: &str = "Licensed architect, designed two museum buildings.";
const UNRELATED_RESUME: &str = "Touring musician, plays jazz trombone professionally.";

fn loaded_engine() -> RetrievalEngine {
    let mut engine =
        RetrievalEngine::new(Arc::new(HashingProvider::new()), &ChunkingConfig::default());
    for (source, text) in [
        ("korean.pdf", KOREAN_RESUME),
        ("chemistry.docx", CHEMISTRY_RESUME),
        ("architecture.pdf", ARCHITECTURE_RESUME),
        ("unrelated.txt", UNRELATED_RESUME),
    ] {
        engine.index_document("eval", source, text).unwrap();
    }
    engine
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn expected_source_is_retrieved_for_a_matching_question() {
    let engine = loaded_engine();
    // Verbatim question: the matching chunk embeds identically and must
    // rank first even with k below the document count.
    let case = EvalCase::new(
        KOREAN_RESUME,
        strings(&["korean.pdf"]),
        strings(&["Korean"]),
    );

    let result = run_retrieval_case(&engine, &case, 2).unwrap();
    assert_eq!(result.source_recall, 1.0);
    assert_eq!(result.sources[0], "korean.pdf");
    assert!(result.keyword_recall.is_none());
}

#[test]
fn missing_document_scores_zero_recall() {
    let engine = loaded_engine();
    let case = EvalCase::new(
        "Which candidate knows ancient Greek?",
        strings(&["greek.pdf"]),
        vec![],
    );

    let result = run_retrieval_case(&engine, &case, 2).unwrap();
    assert_eq!(result.source_recall, 0.0);
}

#[test]
fn unknown_collection_retrieves_nothing() {
    let engine = loaded_engine();
    let case = EvalCase::new("anything", strings(&["korean.pdf"]), vec![])
        .in_collection("nowhere");

    let result = run_retrieval_case(&engine, &case, 3).unwrap();
    assert!(result.sources.is_empty());
    assert_eq!(result.source_recall, 0.0);
}

#[test]
fn answers_are_scored_against_case_keywords() {
    let engine = loaded_engine();
    let case = EvalCase::new(
        CHEMISTRY_RESUME,
        strings(&["chemistry.docx"]),
        strings(&["chemistry", "lab"]),
    );

    let result = run_retrieval_case(&engine, &case, 2).unwrap();
    let scored = result.score_answer(&case, "The candidate has chemistry experience.");

    assert_eq!(scored.source_recall, 1.0);
    assert_eq!(scored.keyword_recall, Some(0.5));
}

#[test]
fn report_aggregates_across_cases() {
    let engine = loaded_engine();
    let cases = [
        EvalCase::new(
            ARCHITECTURE_RESUME,
            strings(&["architecture.pdf"]),
            strings(&["architecture"]),
        ),
        EvalCase::new("Who has culinary training?", strings(&["chef.pdf"]), vec![]),
    ];

    let report = run_retrieval_eval(&engine, &cases, 2).unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.mean_source_recall(), 0.5);
    assert_eq!(report.mean_keyword_recall(), None);
}
