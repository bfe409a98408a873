use serde::Serialize;

use crate::{doc_id::DocumentId, records::ProjectRecord};

/// Flattened text form of one [`ProjectRecord`], tagged with its project
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub project_name: String,
    pub body: String,
}

impl Document {
    pub fn id(&self) -> DocumentId {
        DocumentId::new(&self.project_name)
    }

    /// The first `max_chars` characters of the body. Never splits a
    /// multi-byte character.
    pub fn snippet(&self, max_chars: usize) -> &str {
        match self.body.char_indices().nth(max_chars) {
            Some((end, _)) => &self.body[..end],
            None => &self.body,
        }
    }
}

/// Render a record as one `key: value` line per present field.
pub fn project(record: &ProjectRecord) -> Document {
    let body = record
        .fields()
        .into_iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    Document {
        project_name: record.project_name.clone(),
        body,
    }
}

pub fn project_all(records: &[ProjectRecord]) -> Vec<Document> {
    records.iter().map(project).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records;

    #[test]
    fn body_lists_every_key_once_on_its_own_line() {
        for record in records::builtin() {
            let doc = project(&record);
            let lines: Vec<&str> = doc.body.lines().collect();
            let fields = record.fields();
            assert_eq!(lines.len(), fields.len());

            for (key, value) in fields {
                let prefix = format!("{key}: ");
                let matching: Vec<_> =
                    lines.iter().filter(|l| l.starts_with(&prefix)).collect();
                assert_eq!(matching.len(), 1, "{key} should appear once");
                assert_eq!(*matching[0], format!("{key}: {value}"));
            }
        }
    }

    #[test]
    fn paytrack_body_matches_source_layout() {
        let doc = project(&records::builtin()[3]);
        assert_eq!(
            doc.body,
            "valueStream: Payments\n\
             subStream: Billing\n\
             projectName: PayTrack\n\
             valueStreamLead: David\n\
             engineeringManager: Sophia\n\
             taskName: Payment Gateway\n\
             resourceCount: 6\n\
             weeklyHours: 18\n\
             montlyHours: 42\n\
             quaterlyHours: 75\n\
             catagaory: Opex\n\
             target: 90\n\
             achieved: 30"
        );
        assert_eq!(doc.project_name, "PayTrack");
    }

    #[test]
    fn missing_field_omits_line() {
        let mut record = records::builtin().remove(0);
        record.engineering_manager = None;
        record.target = None;

        let doc = project(&record);
        assert!(!doc.body.contains("engineeringManager"));
        assert!(!doc.body.contains("target"));
        assert!(doc.body.contains("achieved: 40"));
    }

    #[test]
    fn tags_trace_to_exactly_one_record() {
        let records = records::builtin();
        let docs = project_all(&records);
        assert_eq!(docs.len(), records.len());

        for doc in &docs {
            let owners = records
                .iter()
                .filter(|r| r.project_name == doc.project_name)
                .count();
            assert_eq!(owners, 1);
        }
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let doc = Document {
            project_name: "x".to_string(),
            body: "é".repeat(300),
        };
        let snippet = doc.snippet(200);
        assert_eq!(snippet.chars().count(), 200);
        assert!(doc.body.starts_with(snippet));
    }

    #[test]
    fn snippet_of_short_body_is_whole_body() {
        let doc = Document {
            project_name: "x".to_string(),
            body: "short".to_string(),
        };
        assert_eq!(doc.snippet(200), "short");
    }
}
