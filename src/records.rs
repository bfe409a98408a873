//! The fixed set of project records the service answers questions about.
//!
//! Records are loaded once at startup, either from the built-in dataset or
//! from a JSON file, and never change afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One project row. Key spellings follow the source data and show up
/// verbatim in the projected documents. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectRecord {
    #[serde(default)]
    pub value_stream: Option<String>,
    #[serde(default)]
    pub sub_stream: Option<String>,
    pub project_name: String,
    #[serde(default)]
    pub value_stream_lead: Option<String>,
    #[serde(default)]
    pub engineering_manager: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub resource_count: Option<f64>,
    #[serde(default)]
    pub weekly_hours: Option<f64>,
    #[serde(default, rename = "montlyHours")]
    pub monthly_hours: Option<f64>,
    #[serde(default, rename = "quaterlyHours")]
    pub quarterly_hours: Option<f64>,
    #[serde(default, rename = "catagaory")]
    pub category: Option<String>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub achieved: Option<f64>,
}

/// A single field value as it appears in a projected document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    /// Integral values render without a fractional part (`67`, `67.5`).
    Number(f64),
}

impl std::fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl ProjectRecord {
    /// Present fields in the record's natural order, keyed by their source
    /// names. Absent fields are skipped.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        [
            ("valueStream", text(&self.value_stream)),
            ("subStream", text(&self.sub_stream)),
            ("projectName", Some(FieldValue::Text(&self.project_name))),
            ("valueStreamLead", text(&self.value_stream_lead)),
            ("engineeringManager", text(&self.engineering_manager)),
            ("taskName", text(&self.task_name)),
            ("resourceCount", number(self.resource_count)),
            ("weeklyHours", number(self.weekly_hours)),
            ("montlyHours", number(self.monthly_hours)),
            ("quaterlyHours", number(self.quarterly_hours)),
            ("catagaory", text(&self.category)),
            ("target", number(self.target)),
            ("achieved", number(self.achieved)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }

    /// `achieved < target`. `None` when either figure is missing.
    pub fn is_at_risk(&self) -> Option<bool> {
        Some(self.achieved? < self.target?)
    }
}

fn text(value: &Option<String>) -> Option<FieldValue<'_>> {
    value.as_deref().map(FieldValue::Text)
}

fn number(value: Option<f64>) -> Option<FieldValue<'static>> {
    value.map(FieldValue::Number)
}

#[allow(clippy::too_many_arguments)]
fn record(
    value_stream: &str,
    sub_stream: &str,
    project_name: &str,
    value_stream_lead: &str,
    engineering_manager: &str,
    task_name: &str,
    hours: [f64; 4],
    category: &str,
    target: f64,
    achieved: f64,
) -> ProjectRecord {
    let [resource_count, weekly, monthly, quarterly] = hours;
    ProjectRecord {
        value_stream: Some(value_stream.to_string()),
        sub_stream: Some(sub_stream.to_string()),
        project_name: project_name.to_string(),
        value_stream_lead: Some(value_stream_lead.to_string()),
        engineering_manager: Some(engineering_manager.to_string()),
        task_name: Some(task_name.to_string()),
        resource_count: Some(resource_count),
        weekly_hours: Some(weekly),
        monthly_hours: Some(monthly),
        quarterly_hours: Some(quarterly),
        category: Some(category.to_string()),
        target: Some(target),
        achieved: Some(achieved),
    }
}

/// The built-in dataset.
pub fn builtin() -> Vec<ProjectRecord> {
    vec![
        record(
            "Benefits and Pricing",
            "Benefits Journey",
            "PRjej",
            "Eric",
            "Susan",
            "Benefits strategy",
            [8.0, 22.0, 40.0, 80.0],
            "Capex",
            67.0,
            40.0,
        ),
        record(
            "AOR",
            "CLM",
            "PRjejewew",
            "Eff",
            "Ttn",
            "CLM",
            [4.0, 20.0, 38.0, 50.0],
            "Opex",
            75.0,
            80.0,
        ),
        record(
            "Customer Experience",
            "Onboarding",
            "OnboardX",
            "Alice",
            "John",
            "Onboarding Flow",
            [10.0, 28.0, 50.0, 100.0],
            "Capex",
            60.0,
            55.0,
        ),
        record(
            "Payments",
            "Billing",
            "PayTrack",
            "David",
            "Sophia",
            "Payment Gateway",
            [6.0, 18.0, 42.0, 75.0],
            "Opex",
            90.0,
            30.0,
        ),
    ]
}

/// Load records from a JSON array file.
pub fn load_file(path: &Path) -> Result<Vec<ProjectRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "cannot read records file {}: {e}",
            path.display()
        ))
    })?;
    let records: Vec<ProjectRecord> = serde_json::from_str(&content)?;
    if records.is_empty() {
        return Err(Error::Config(format!(
            "records file {} contains no records",
            path.display()
        )));
    }
    Ok(records)
}

/// Resolve the record set: an explicit file if given, else the built-in set.
pub fn load(path: Option<&Path>) -> Result<Vec<ProjectRecord>> {
    match path {
        Some(path) => load_file(path),
        None => Ok(builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_four_distinct_projects() {
        let records = builtin();
        assert_eq!(records.len(), 4);

        let mut names: Vec<_> =
            records.iter().map(|r| r.project_name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn risk_predicate_matches_dataset() {
        let at_risk: Vec<_> = builtin()
            .into_iter()
            .filter(|r| r.is_at_risk() == Some(true))
            .filter_map(|r| r.task_name)
            .collect();

        assert_eq!(
            at_risk,
            ["Benefits strategy", "Onboarding Flow", "Payment Gateway"]
        );
    }

    #[test]
    fn risk_unknown_without_figures() {
        let mut r = builtin().remove(0);
        r.target = None;
        assert_eq!(r.is_at_risk(), None);
    }

    #[test]
    fn fields_follow_natural_order() {
        let r = &builtin()[0];
        let keys: Vec<_> = r.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "valueStream",
                "subStream",
                "projectName",
                "valueStreamLead",
                "engineeringManager",
                "taskName",
                "resourceCount",
                "weeklyHours",
                "montlyHours",
                "quaterlyHours",
                "catagaory",
                "target",
                "achieved",
            ]
        );
    }

    #[test]
    fn load_file_accepts_source_keys_and_missing_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"projectName": "Solo", "catagaory": "Opex",
                "montlyHours": 12}]"#,
        )
        .unwrap();

        let records = load_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].project_name, "Solo");
        assert_eq!(records[0].category.as_deref(), Some("Opex"));
        assert_eq!(records[0].monthly_hours, Some(12.0));
        assert_eq!(records[0].target, None);
    }

    #[test]
    fn load_file_rejects_unknown_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(&path, r#"[{"projectName": "A", "owner": "Zed"}]"#)
            .unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn fractional_figures_are_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"projectName": "A", "target": 67.5, "achieved": 67}]"#,
        )
        .unwrap();

        let records = load_file(&path).unwrap();
        assert_eq!(records[0].target, Some(67.5));
        assert_eq!(records[0].is_at_risk(), Some(true));

        let rendered: Vec<String> = records[0]
            .fields()
            .into_iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        assert_eq!(
            rendered,
            ["projectName: A", "target: 67.5", "achieved: 67"]
        );
    }

    #[test]
    fn load_file_rejects_empty_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(&path, "[]").unwrap();

        assert!(matches!(load_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn load_defaults_to_builtin() {
        assert_eq!(load(None).unwrap(), builtin());
    }
}
