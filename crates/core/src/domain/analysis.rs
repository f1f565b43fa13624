use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tags: String,
    pub summary: String,
    pub interest: String,
}

impl AnalysisResult {
    pub fn new(
        tags: impl Into<String>,
        summary: impl Into<String>,
        interest: impl Into<String>,
    ) -> Self {
        Self { tags: tags.into(), summary: summary.into(), interest: interest.into() }
    }
}
