use crate::types::{AnalysisStatus, AnalyzerKind, Link, ScrapeStatus};
use serde::{Deserialize, Serialize};

/// One row of the export: a link joined with its scrape and analysis outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub link: Link,
    pub scrape: ScrapeStatus,
    /// `None` when no analyzer has run for this link.
    pub analyzer: Option<AnalyzerKind>,
    pub analysis: AnalysisStatus,
}

impl ExportRow {
    pub fn scrape_label(&self) -> String {
        match &self.scrape {
            ScrapeStatus::Success { .. } => "ok".to_string(),
            ScrapeStatus::Failed { error } => format!("failed: {}", error),
        }
    }

    pub fn analyzer_label(&self) -> String {
        self.analyzer
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Compact rendering of the analysis column for tabular display.
    pub fn analysis_label(&self) -> String {
        match &self.analysis {
            AnalysisStatus::Success { output } => output.to_string(),
            AnalysisStatus::Failed { error } => format!("failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportTable {
    rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn new(rows: Vec<ExportRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn scrape_failures(&self) -> usize {
        self.rows.iter().filter(|row| !row.scrape.is_success()).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(link: &str, scraped: bool) -> ExportRow {
        ExportRow {
            link: Link::new(link),
            scrape: if scraped {
                ScrapeStatus::Success {
                    content: "body".to_string(),
                }
            } else {
                ScrapeStatus::Failed {
                    error: "timeout".to_string(),
                }
            },
            analyzer: Some(AnalyzerKind::TextStats),
            analysis: AnalysisStatus::Success {
                output: json!({"words": 1}),
            },
        }
    }

    #[test]
    fn test_labels() {
        let ok = row("a", true);
        assert_eq!(ok.scrape_label(), "ok");
        assert_eq!(ok.analysis_label(), r#"{"words":1}"#);

        let failed = row("b", false);
        assert_eq!(failed.scrape_label(), "failed: timeout");
        assert_eq!(ok.analyzer_label(), "text-stats");

        let unanalyzed = ExportRow {
            analyzer: None,
            ..row("c", true)
        };
        assert_eq!(unanalyzed.analyzer_label(), "-");
    }

    #[test]
    fn test_scrape_failure_count() {
        let table = ExportTable::new(vec![row("a", true), row("b", false), row("c", false)]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.scrape_failures(), 2);
    }

    #[test]
    fn test_to_json_is_stable() {
        let table = ExportTable::new(vec![row("a", true)]);
        assert_eq!(table.to_json().unwrap(), table.clone().to_json().unwrap());
        assert!(table.to_json().unwrap().contains("\"analyzer\": \"text_stats\""));
    }
}
