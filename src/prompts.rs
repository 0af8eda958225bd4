//! Prompt construction for question answering over retrieved chunks.

use crate::chunking::Chunk;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about uploaded documents.\n\
You will be given relevant excerpts from the documents and a question about them.\n\
Answer based on the provided context. If the information is not in the context, say so.\n\
Be concise and direct.";

/// Builds the QA prompt: retrieved chunks joined by a separator, then the
/// question.
pub fn build_qa_prompt(question: &str, context_chunks: &[Chunk]) -> String {
    let context: Vec<&str> = context_chunks.iter().map(|c| c.text.as_str()).collect();
    let context = context.join("\n\n---\n\n");

    format!("Context from documents:\n\n{context}\n\n---\n\nQuestion: {question}\n\nAnswer:")
}
