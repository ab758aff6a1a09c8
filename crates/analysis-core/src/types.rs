use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// A request to run one analysis job for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub company_name: String,
}

impl AnalysisRequest {
    /// Builds a request, trimming both fields and upper-casing the symbol.
    pub fn new(symbol: impl AsRef<str>, company_name: impl AsRef<str>) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_uppercase(),
            company_name: company_name.as_ref().trim().to_string(),
        }
    }

    /// Local check run before any network call.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.symbol.trim().is_empty() || self.company_name.trim().is_empty() {
            return Err(JobError::Validation(
                "Please provide both stock symbol and company name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Correlation id handed back by the service for an accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub request_id: String,
}

impl JobHandle {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.request_id)
    }
}

/// Result of a single status query.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Processing,
    /// Raw report payload, either a text blob or a structured object.
    Completed(serde_json::Value),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// Overall news sentiment attached to a structured report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Case-insensitive match; anything that is not positive or negative is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Investment recommendation. Unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
    Other(String),
}

/// Display tone of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationTone {
    Bullish,
    Neutral,
    Bearish,
}

impl Recommendation {
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "strongbuy" => Recommendation::StrongBuy,
            "buy" => Recommendation::Buy,
            "hold" => Recommendation::Hold,
            "sell" => Recommendation::Sell,
            "strongsell" => Recommendation::StrongSell,
            _ => Recommendation::Other(label.trim().to_string()),
        }
    }

    /// Human-readable label for the recommendation
    pub fn to_label(&self) -> &str {
        match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
            Recommendation::StrongSell => "Strong Sell",
            Recommendation::Other(label) => label,
        }
    }

    pub fn tone(&self) -> RecommendationTone {
        match self {
            Recommendation::StrongBuy | Recommendation::Buy => RecommendationTone::Bullish,
            Recommendation::Hold => RecommendationTone::Neutral,
            _ => RecommendationTone::Bearish,
        }
    }
}

/// Fields recognised in a structured report payload. Unset fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub company_name: Option<String>,
    pub stock_symbol: Option<String>,
    pub executive_summary: Option<String>,
    pub quantitative_summary: Option<String>,
    pub current_price: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub qualitative_summary: Option<String>,
    pub overall_sentiment: Option<Sentiment>,
    /// 0 to 100
    pub confidence_level: Option<f64>,
    pub investment_recommendation: Option<Recommendation>,
    pub recommendation_rationale: Option<String>,
    pub risk_assessment: Option<String>,
    pub key_risks: Option<Vec<String>>,
    pub key_opportunities: Option<Vec<String>>,
    pub report_date: Option<String>,
    pub analysis_period: Option<String>,
}

/// One block of a legacy text report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSection {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ReportBody {
    Structured(StructuredReport),
    LegacyText(Vec<TextSection>),
    NoData,
}

/// Canonical report handed to presentation, built once per completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub body: ReportBody,
    /// Payload exactly as the service returned it, kept for downloads.
    pub raw: serde_json::Value,
}

impl NormalizedReport {
    pub fn no_data(raw: serde_json::Value) -> Self {
        Self {
            body: ReportBody::NoData,
            raw,
        }
    }

    pub fn structured(&self) -> Option<&StructuredReport> {
        match &self.body {
            ReportBody::Structured(report) => Some(report),
            _ => None,
        }
    }

    pub fn sections(&self) -> Option<&[TextSection]> {
        match &self.body {
            ReportBody::LegacyText(sections) => Some(sections),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.body {
            ReportBody::Structured(_) => false,
            ReportBody::LegacyText(sections) => sections.is_empty(),
            ReportBody::NoData => true,
        }
    }
}
