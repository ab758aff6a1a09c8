//! Converts report payloads into a [`NormalizedReport`].
//!
//! The service either returns a legacy free-text report or a structured
//! object. Both are mapped into one representation; anything else becomes
//! the explicit no-data state. Normalization never fails.

use serde_json::{Map, Value};

use crate::types::{
    NormalizedReport, Recommendation, ReportBody, Sentiment, StructuredReport, TextSection,
};

/// Normalize a raw report payload.
pub fn normalize(payload: &Value) -> NormalizedReport {
    let body = match payload {
        Value::String(text) => ReportBody::LegacyText(split_sections(text)),
        Value::Object(fields) => ReportBody::Structured(map_structured(fields)),
        _ => ReportBody::NoData,
    };
    NormalizedReport {
        body,
        raw: payload.clone(),
    }
}

/// Split a text blob on blank lines into heading and paragraph sections.
///
/// A block is a heading when it contains `**` or is entirely upper case.
/// Other blocks are split into lines and attached to the most recent heading,
/// or to an untitled section when no heading has been seen yet.
pub fn split_sections(text: &str) -> Vec<TextSection> {
    let mut sections: Vec<TextSection> = Vec::new();

    for block in blocks(text) {
        if is_heading(&block) {
            sections.push(TextSection {
                heading: Some(block.replace("**", "").trim().to_string()),
                paragraphs: Vec::new(),
            });
            continue;
        }

        let paragraphs = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string);

        match sections.last_mut() {
            Some(current) => current.paragraphs.extend(paragraphs),
            None => sections.push(TextSection {
                heading: None,
                paragraphs: paragraphs.collect(),
            }),
        }
    }

    sections
}

/// Blocks separated by one or more whitespace-only lines. Empty blocks are dropped.
fn blocks(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }

    out
}

fn is_heading(block: &str) -> bool {
    block.contains("**") || block.to_uppercase() == block
}

fn map_structured(fields: &Map<String, Value>) -> StructuredReport {
    StructuredReport {
        company_name: text_field(fields, "company_name"),
        stock_symbol: text_field(fields, "stock_symbol"),
        executive_summary: text_field(fields, "executive_summary"),
        quantitative_summary: text_field(fields, "quantitative_summary"),
        current_price: number_field(fields, "current_price"),
        week_52_high: number_field(fields, "week_high_52"),
        week_52_low: number_field(fields, "week_low_52"),
        pe_ratio: number_field(fields, "pe_ratio"),
        qualitative_summary: text_field(fields, "qualitative_summary"),
        overall_sentiment: text_field(fields, "overall_sentiment")
            .map(|label| Sentiment::from_label(&label)),
        confidence_level: number_field(fields, "confidence_level")
            .map(|level| level.clamp(0.0, 100.0)),
        investment_recommendation: text_field(fields, "investment_recommendation")
            .map(|label| Recommendation::from_label(&label)),
        recommendation_rationale: text_field(fields, "recommendation_rationale"),
        risk_assessment: text_field(fields, "risk_assessment"),
        key_risks: list_field(fields, "key_risks"),
        key_opportunities: list_field(fields, "key_opportunities"),
        report_date: text_field(fields, "report_date"),
        analysis_period: text_field(fields, "analysis_period"),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(str::to_string)
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    }
}

fn list_field(fields: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = fields.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
