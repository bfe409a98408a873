//! Prompt templates for the question-answering flow.
//!
//! Two layers: [`instruction`] wraps the caller's question with the risk
//! definition, and [`stuff`] places the retrieved documents and that
//! instruction into the final model input.

use crate::{document::Document, records::ProjectRecord};

/// The instruction block sent to the model (and, by default, used as the
/// retrieval query). The question is embedded verbatim.
pub fn instruction(question: &str) -> String {
    format!(
        "\nYou are a project assistant. \n\
         You are given project data including 'target' and \
         'achieved' values. \n\
         A project is considered 'risked' if achieved < target.\n\
         Answer the user's question based on this data.\n\
         \n\
         Question: {question}\n"
    )
}

/// Put every retrieved document body directly in front of the question,
/// with no summarization or splitting.
pub fn stuff(
    documents: &[&Document],
    question: &str,
    notes: Option<&str>,
) -> String {
    let mut context = documents
        .iter()
        .map(|d| d.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    if let Some(notes) = notes {
        context.push_str("\n\n");
        context.push_str(notes);
    }

    format!(
        "Use the following pieces of context to answer the question at the \
         end. If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         {context}\n\n\
         Question: {question}\n\
         Helpful Answer:"
    )
}

/// Risk status computed from the records themselves, one line per project.
/// Projects missing either figure are listed as unknown.
pub fn risk_summary(records: &[&ProjectRecord]) -> String {
    let mut out = String::from("Risk assessment (achieved < target):");
    for r in records {
        let name = &r.project_name;
        let task = r.task_name.as_deref().unwrap_or("-");
        let line = match (r.is_at_risk(), r.achieved, r.target) {
            (Some(true), Some(a), Some(t)) => {
                format!("{name} ({task}): at risk ({a} < {t})")
            }
            (Some(false), Some(a), Some(t)) => {
                format!("{name} ({task}): on track ({a} >= {t})")
            }
            _ => format!("{name} ({task}): unknown"),
        };
        out.push_str("\n- ");
        out.push_str(&line);
    }
    out
}
