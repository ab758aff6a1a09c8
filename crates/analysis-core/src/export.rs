//! Print, download and share payloads for a finished report.
//!
//! These only read a frozen [`NormalizedReport`]; they never drive a job.

use std::fmt::Write as _;

use serde::Serialize;

use crate::types::{AnalysisRequest, NormalizedReport, ReportBody, StructuredReport};

/// A file ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub body: String,
}

/// Title and text for a share sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareMessage {
    pub title: String,
    pub text: String,
}

/// Structured payloads download as pretty JSON, everything else as plain text.
pub fn download(symbol: &str, report: &NormalizedReport) -> Result<Download, serde_json::Error> {
    if report.raw.is_object() {
        return Ok(Download {
            file_name: format!("{}_analysis_report.json", symbol),
            mime_type: "application/json",
            body: serde_json::to_string_pretty(&report.raw)?,
        });
    }

    let body = match report.raw.as_str() {
        Some(text) => text.to_string(),
        None => render_text(report),
    };
    Ok(Download {
        file_name: format!("{}_analysis_report.txt", symbol),
        mime_type: "text/plain",
        body,
    })
}

pub fn share_message(request: &AnalysisRequest) -> ShareMessage {
    ShareMessage {
        title: format!("Financial Analysis Report - {}", request.symbol),
        text: format!(
            "Investment analysis for {} by {}",
            request.symbol, request.company_name
        ),
    }
}

/// Plain-text print view. Unset fields are omitted.
pub fn render_text(report: &NormalizedReport) -> String {
    match &report.body {
        ReportBody::Structured(s) => render_structured(s),
        ReportBody::LegacyText(sections) => {
            let mut out = String::new();
            for section in sections {
                if let Some(heading) = &section.heading {
                    push_heading(&mut out, heading);
                }
                for paragraph in &section.paragraphs {
                    let _ = writeln!(out, "{}", paragraph);
                }
                out.push('\n');
            }
            out
        }
        ReportBody::NoData => "No report data available.\n".to_string(),
    }
}

fn render_structured(s: &StructuredReport) -> String {
    let mut out = String::new();

    if let Some(summary) = &s.executive_summary {
        push_heading(&mut out, "Executive Summary");
        let _ = writeln!(out, "{}\n", summary);
    }

    push_heading(&mut out, "Quantitative Analysis");
    if let Some(summary) = &s.quantitative_summary {
        let _ = writeln!(out, "{}", summary);
    }
    if let Some(price) = s.current_price {
        let _ = writeln!(out, "Current Price: ${}", price);
    }
    if let Some(high) = s.week_52_high {
        let _ = writeln!(out, "52W High: ${}", high);
    }
    if let Some(low) = s.week_52_low {
        let _ = writeln!(out, "52W Low: ${}", low);
    }
    if let Some(pe) = s.pe_ratio {
        let _ = writeln!(out, "P/E Ratio: {}", pe);
    }
    out.push('\n');

    push_heading(&mut out, "Qualitative Analysis");
    if let Some(summary) = &s.qualitative_summary {
        let _ = writeln!(out, "{}", summary);
    }
    if let Some(sentiment) = s.overall_sentiment {
        let _ = writeln!(out, "Sentiment: {}", sentiment.as_str().to_uppercase());
    }
    if let Some(confidence) = s.confidence_level {
        let _ = writeln!(out, "Confidence: {}%", confidence);
    }
    out.push('\n');

    push_heading(&mut out, "Investment Recommendation");
    if let Some(rec) = &s.investment_recommendation {
        let _ = writeln!(out, "{}", rec.to_label());
    }
    if let Some(rationale) = &s.recommendation_rationale {
        let _ = writeln!(out, "{}", rationale);
    }
    if let Some(risk) = &s.risk_assessment {
        let _ = writeln!(out, "Risk Assessment: {}", risk);
    }
    out.push('\n');

    push_list(&mut out, "Key Risks", s.key_risks.as_deref());
    push_list(&mut out, "Key Opportunities", s.key_opportunities.as_deref());

    out
}

fn push_heading(out: &mut String, heading: &str) {
    let _ = writeln!(out, "{}", heading);
    let _ = writeln!(out, "{}", "-".repeat(heading.chars().count()));
}

fn push_list(out: &mut String, heading: &str, items: Option<&[String]>) {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return;
    };
    push_heading(out, heading);
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;
    use serde_json::json;

    #[test]
    fn test_structured_download_is_json() {
        let report = normalize(&json!({ "executive_summary": "Up." }));
        let file = download("TSLA", &report).unwrap();
        assert_eq!(file.file_name, "TSLA_analysis_report.json");
        assert_eq!(file.mime_type, "application/json");
        let back: serde_json::Value = serde_json::from_str(&file.body).unwrap();
        assert_eq!(back, report.raw);
    }

    #[test]
    fn test_text_download_keeps_raw_text() {
        let report = normalize(&json!("SUMMARY\n\nFine."));
        let file = download("AAPL", &report).unwrap();
        assert_eq!(file.file_name, "AAPL_analysis_report.txt");
        assert_eq!(file.body, "SUMMARY\n\nFine.");
    }

    #[test]
    fn test_render_omits_unset_fields() {
        let report = normalize(&json!({
            "executive_summary": "Strong.",
            "current_price": 10.5,
            "overall_sentiment": "negative",
            "key_risks": ["Debt"],
            "key_opportunities": []
        }));
        let text = render_text(&report);
        assert!(text.contains("Executive Summary\n-----------------\nStrong."));
        assert!(text.contains("Current Price: $10.5"));
        assert!(text.contains("Sentiment: NEGATIVE"));
        assert!(text.contains("  - Debt"));
        assert!(!text.contains("P/E Ratio"));
        assert!(!text.contains("52W High"));
        assert!(!text.contains("Key Opportunities"));
    }

    #[test]
    fn test_render_no_data() {
        let report = normalize(&json!(null));
        assert_eq!(render_text(&report), "No report data available.\n");
    }

    #[test]
    fn test_share_message() {
        let msg = share_message(&AnalysisRequest::new("tsla", "Tesla Inc."));
        assert_eq!(msg.title, "Financial Analysis Report - TSLA");
        assert_eq!(msg.text, "Investment analysis for TSLA by Tesla Inc.");
    }
}
