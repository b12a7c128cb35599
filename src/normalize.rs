//! Normalization of backend payloads onto the internal model.
//!
//! The backend's results blob is loosely shaped: sections may be missing,
//! null or malformed, and the molecule, regulatory and patent sub-objects
//! mix snake_case and camelCase keys. [`normalize_result`] is the single
//! place that resolves all of that. The result is built in three layers:
//!
//! 1. the canned sample result (every field populated),
//! 2. each market / trials / insights / sources section the backend sent,
//!    read field by field (a present section replaces the canned one
//!    wholesale; its absent, null or unparsable fields become zero/empty),
//! 3. the explicitly normalized molecule / regulatory / patent sections.
//!
//! A section that is present but of the wrong shape (e.g. a string where a
//! list is expected) keeps the canned layer. Numbers are accepted as JSON
//! numbers or numeric strings.
//!
//! Later layers win. Explicit field precedence (first present key wins; a
//! missing, null or blank value falls through to the fallback):
//!
//! | Field                   | Keys tried                                         | Fallback          |
//! |-------------------------|----------------------------------------------------|-------------------|
//! | molecule.name           | `name`                                             | requested name    |
//! | molecule.formula        | `formula`                                          | `"N/A"`           |
//! | molecule.molecularWeight| `molecularWeight`, `molecular_weight`              | `0`               |
//! | molecule.category       | `category`                                         | `"Unknown"`       |
//! | molecule.mechanism      | `mechanism`, `mechanismOfAction`, `mechanism_of_action` | `"Unknown"`  |
//! | molecule.indications    | `indications`                                      | `[]`              |
//! | regulatory.fda          | `fda`, `fdaStatus`, `fda_status`                   | `"Unknown"`       |
//! | regulatory.ema          | `ema`, `emaStatus`, `ema_status`                   | `"Unknown"`       |
//! | regulatory.approvalDate | `approvalDate`, `approval_date`                    | `"N/A"`           |
//! | regulatory.approvedIndications | `approvedIndications`, `approved_indications` | `[]`          |
//! | regulatory.labelWarnings| `labelWarnings`, `label_warnings`                  | `[]`              |
//! | patent.patentNumber     | `patentNumber`, `patent_number`                    | `"N/A"`           |
//! | patent.title            | `title`                                            | `"N/A"`           |
//! | patent.filingDate       | `filingDate`, `filing_date`                        | `"N/A"`           |
//! | patent.expiryDate       | `expiryDate`, `expiry_date`                        | `"N/A"`           |
//! | patent.status           | `status`                                           | `"Unknown"`       |
//! | patent.holder           | `holder`                                           | `"N/A"`           |
//! | market.marketSize       | `marketSize`, `market_size`                        | `0`               |
//! | market.growthRate       | `growthRate`, `growth_rate`                        | `0`               |
//! | competitor.marketShare  | `marketShare`, `market_share`                      | `0`               |
//! | trial.startDate         | `startDate`, `start_date`                          | `""`              |
//! | insight.type            | `type`, `insightType`, `insight_type`              | neutral           |
//! | source.type             | `type`, `sourceType`, `source_type`                | `""`              |

use crate::api::RemoteStep;
use crate::catalog::{self, NOT_AVAILABLE, UNKNOWN};
use crate::models::{
    AgentStep, AnalysisResult, ClinicalTrial, Competitor, Insight, InsightType, MarketData,
    MoleculeData, PatentInfo, RegulatoryStatus, Source, StepStatus,
};
use crate::pipeline;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// First present, non-null, non-blank value among `keys`.
fn field<'a>(object: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    let object = object?.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

fn text(object: Option<&Value>, keys: &[&str], fallback: &str) -> String {
    match field(object, keys) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => fallback.to_string(),
    }
}

fn number(object: Option<&Value>, keys: &[&str], fallback: f64) -> f64 {
    match field(object, keys) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(fallback),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(fallback),
        _ => fallback,
    }
}

fn string_list(object: Option<&Value>, keys: &[&str]) -> Vec<String> {
    match field(object, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn count(object: Option<&Value>, keys: &[&str]) -> u32 {
    let value = number(object, keys, 0.0);
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Objects of a list-valued field; non-object items are skipped.
fn objects<'a>(object: Option<&'a Value>, keys: &[&str]) -> Vec<&'a Value> {
    match field(object, keys) {
        Some(Value::Array(items)) => items.iter().filter(|item| item.is_object()).collect(),
        _ => Vec::new(),
    }
}

/// Read one object-valued section; `None` when absent or of the wrong shape.
fn object_section<'a>(results: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let raw = field(Some(results), keys)?;
    if raw.is_object() {
        Some(raw)
    } else {
        warn!("Ignoring malformed '{}' section: expected an object", keys[0]);
        None
    }
}

/// Normalize every item of one list-valued section, keeping `default` when
/// the section is absent or not a list.
fn list_section<T>(
    results: &Value,
    keys: &[&str],
    default: Vec<T>,
    item: impl Fn(usize, &Value) -> T,
) -> Vec<T> {
    match field(Some(results), keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|raw| raw.is_object())
            .enumerate()
            .map(|(i, raw)| item(i, raw))
            .collect(),
        Some(_) => {
            warn!("Ignoring malformed '{}' section: expected a list", keys[0]);
            default
        }
        None => default,
    }
}

fn timestamp(results: &Value) -> DateTime<Utc> {
    let raw = match field(Some(results), &["generatedAt", "generated_at"]) {
        Some(Value::String(s)) => s.trim(),
        _ => return Utc::now(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    // Naive ISO timestamps are emitted in UTC
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive.and_utc(),
        Err(_) => Utc::now(),
    }
}

/// Normalize a molecule sub-object.
pub fn normalize_molecule(raw: Option<&Value>, requested_name: &str) -> MoleculeData {
    MoleculeData {
        name: text(raw, &["name"], requested_name),
        formula: text(raw, &["formula"], NOT_AVAILABLE),
        molecular_weight: number(raw, &["molecularWeight", "molecular_weight"], 0.0),
        category: text(raw, &["category"], UNKNOWN),
        mechanism: text(
            raw,
            &["mechanism", "mechanismOfAction", "mechanism_of_action"],
            UNKNOWN,
        ),
        indications: string_list(raw, &["indications"]),
    }
}

/// Normalize a regulatory sub-object.
pub fn normalize_regulatory(raw: Option<&Value>) -> RegulatoryStatus {
    RegulatoryStatus {
        fda: text(raw, &["fda", "fdaStatus", "fda_status"], UNKNOWN),
        ema: text(raw, &["ema", "emaStatus", "ema_status"], UNKNOWN),
        approval_date: text(raw, &["approvalDate", "approval_date"], NOT_AVAILABLE),
        approved_indications: string_list(raw, &["approvedIndications", "approved_indications"]),
        label_warnings: string_list(raw, &["labelWarnings", "label_warnings"]),
    }
}

/// Normalize a patent sub-object.
pub fn normalize_patent(raw: Option<&Value>) -> PatentInfo {
    PatentInfo {
        patent_number: text(raw, &["patentNumber", "patent_number"], NOT_AVAILABLE),
        title: text(raw, &["title"], NOT_AVAILABLE),
        filing_date: text(raw, &["filingDate", "filing_date"], NOT_AVAILABLE),
        expiry_date: text(raw, &["expiryDate", "expiry_date"], NOT_AVAILABLE),
        status: text(raw, &["status"], UNKNOWN),
        holder: text(raw, &["holder"], NOT_AVAILABLE),
    }
}

/// Normalize a market sub-object.
pub fn normalize_market(raw: Option<&Value>) -> MarketData {
    MarketData {
        market_size: number(raw, &["marketSize", "market_size"], 0.0),
        market_share: number(raw, &["marketShare", "market_share"], 0.0),
        growth_rate: number(raw, &["growthRate", "growth_rate"], 0.0),
        projected_market_2028: number(
            raw,
            &["projectedMarket2028", "projected_market_2028"],
            0.0,
        ),
        competitors: objects(raw, &["competitors"])
            .into_iter()
            .map(|c| normalize_competitor(Some(c)))
            .collect(),
    }
}

fn normalize_competitor(raw: Option<&Value>) -> Competitor {
    Competitor {
        name: text(raw, &["name"], UNKNOWN),
        company: text(raw, &["company"], ""),
        category: text(raw, &["category"], ""),
        market_share: number(raw, &["marketShare", "market_share"], 0.0),
        revenue: number(raw, &["revenue"], 0.0),
    }
}

fn normalize_trial(raw: &Value) -> ClinicalTrial {
    let raw = Some(raw);
    ClinicalTrial {
        id: text(raw, &["id", "nctId", "nct_id"], ""),
        title: text(raw, &["title"], ""),
        phase: text(raw, &["phase"], NOT_AVAILABLE),
        status: text(raw, &["status"], UNKNOWN),
        enrollment: count(raw, &["enrollment"]),
        condition: text(raw, &["condition"], ""),
        sponsor: text(raw, &["sponsor"], ""),
        start_date: text(raw, &["startDate", "start_date"], ""),
        estimated_completion: text(
            raw,
            &["estimatedCompletion", "estimated_completion"],
            "",
        ),
    }
}

fn normalize_insight(index: usize, raw: &Value) -> Insight {
    let raw = Some(raw);
    Insight {
        id: text(raw, &["id"], &format!("insight-{}", index + 1)),
        insight_type: InsightType::from(text(
            raw,
            &["type", "insightType", "insight_type"],
            "neutral",
        )),
        category: text(raw, &["category"], ""),
        title: text(raw, &["title"], ""),
        content: text(raw, &["content", "description"], ""),
        confidence: number(raw, &["confidence"], 0.0),
        source: text(raw, &["source"], ""),
    }
}

fn normalize_source(index: usize, raw: &Value) -> Source {
    let raw = Some(raw);
    Source {
        id: text(raw, &["id"], &format!("source-{}", index + 1)),
        title: text(raw, &["title"], ""),
        source_type: text(raw, &["type", "sourceType", "source_type"], ""),
        publisher: text(raw, &["publisher"], ""),
        date: text(raw, &["date"], ""),
        url: text(raw, &["url"], ""),
        reliability: number(raw, &["reliability"], 0.0),
    }
}

/// Build a complete [`AnalysisResult`] from a backend results blob.
pub fn normalize_result(results: &Value, requested_name: &str, analysis_id: &str) -> AnalysisResult {
    let defaults = catalog::sample_result();

    let molecule_raw = field(Some(results), &["moleculeData", "molecule_data"]);
    let regulatory_raw = field(Some(results), &["regulatoryStatus", "regulatory_status"]);
    let patent_raw = field(Some(results), &["patentInfo", "patent_info"]);

    AnalysisResult {
        id: text(Some(results), &["id"], analysis_id),
        molecule_name: text(Some(results), &["moleculeName", "molecule_name"], requested_name),
        market_data: object_section(results, &["marketData", "market_data"])
            .map(|raw| normalize_market(Some(raw)))
            .unwrap_or(defaults.market_data),
        clinical_trials: list_section(
            results,
            &["clinicalTrials", "clinical_trials"],
            defaults.clinical_trials,
            |_, raw| normalize_trial(raw),
        ),
        insights: list_section(results, &["insights"], defaults.insights, normalize_insight),
        sources: list_section(results, &["sources"], defaults.sources, normalize_source),
        summary: text(Some(results), &["summary"], &defaults.summary),
        generated_at: timestamp(results),
        molecule_data: normalize_molecule(molecule_raw, requested_name),
        regulatory_status: normalize_regulatory(regulatory_raw),
        patent_info: normalize_patent(patent_raw),
    }
}

/// Mirror the backend's step list onto the local pipeline.
///
/// A local step matches the first remote step whose name contains the local
/// step's first word (case-insensitive). Unmatched steps are left unchanged.
/// Steps only move forward and only once their predecessor is completed, so
/// the local pipeline keeps its strict ordering whatever the backend reports.
pub fn mirror_steps(steps: &mut [AgentStep], remote: &[RemoteStep], now: DateTime<Utc>) {
    for i in 0..steps.len() {
        let key = pipeline::match_key(&steps[i].name);
        if key.is_empty() {
            continue;
        }

        let Some(remote_step) = remote
            .iter()
            .find(|r| r.name.to_lowercase().contains(&key))
        else {
            continue;
        };

        if i > 0 && steps[i - 1].status != StepStatus::Completed {
            continue;
        }

        apply_remote_step(&mut steps[i], remote_step, now);
    }
}

fn apply_remote_step(step: &mut AgentStep, remote: &RemoteStep, now: DateTime<Utc>) {
    if step.status.is_terminal() {
        return;
    }

    let progress = remote.progress.map(|p| p.clamp(0.0, 100.0));
    let status = match (remote.status.as_deref(), progress) {
        (Some(status), _) => StepStatus::from(status),
        (None, Some(p)) if p >= 100.0 => StepStatus::Completed,
        (None, Some(p)) if p > 0.0 => StepStatus::InProgress,
        _ => StepStatus::Pending,
    };

    if let Some(output) = remote.output.as_ref().filter(|o| !o.trim().is_empty()) {
        step.output = Some(output.clone());
    }

    match status {
        StepStatus::Completed => step.complete(now),
        StepStatus::Error => {
            step.status = StepStatus::Error;
            step.ended_at = Some(now);
        }
        StepStatus::InProgress => {
            step.begin(now);
            if let Some(p) = progress {
                step.progress = step.progress.max(p);
            }
        }
        StepStatus::Pending => {}
    }

    debug!("Mirrored step {} -> {} ({:.0}%)", step.id, step.status, step.progress);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(name: &str, status: &str, progress: f64) -> RemoteStep {
        RemoteStep {
            name: name.to_string(),
            status: Some(status.to_string()),
            progress: Some(progress),
            output: None,
        }
    }

    #[test]
    fn test_snake_case_molecular_weight() {
        let raw = json!({"name": "Aspirin", "molecular_weight": 180.16});
        let molecule = normalize_molecule(Some(&raw), "Aspirin");
        assert_eq!(molecule.molecular_weight, 180.16);
        assert_eq!(molecule.formula, "N/A");
        assert_eq!(molecule.category, "Unknown");
    }

    #[test]
    fn test_camel_case_wins() {
        let raw = json!({"molecularWeight": 200.0, "molecular_weight": 180.16});
        assert_eq!(normalize_molecule(Some(&raw), "X").molecular_weight, 200.0);

        let raw = json!({"expiryDate": "2035-03-20", "expiry_date": "2030-01-01"});
        assert_eq!(normalize_patent(Some(&raw)).expiry_date, "2035-03-20");
    }

    #[test]
    fn test_null_and_blank_fall_back() {
        let raw = json!({"molecularWeight": null, "molecular_weight": "129.16", "formula": "  "});
        let molecule = normalize_molecule(Some(&raw), "Metformin");
        assert_eq!(molecule.molecular_weight, 129.16);
        assert_eq!(molecule.formula, "N/A");
        assert_eq!(molecule.name, "Metformin");
    }

    #[test]
    fn test_absent_sections_get_fallbacks() {
        let result = normalize_result(&json!({}), "UnknownDrug123", "a-1");
        assert_eq!(result.id, "a-1");
        assert_eq!(result.molecule_name, "UnknownDrug123");
        assert_eq!(result.molecule_data.molecular_weight, 0.0);
        assert_eq!(result.molecule_data.formula, "N/A");
        assert_eq!(result.regulatory_status.fda, "Unknown");
        assert_eq!(result.patent_info.patent_number, "N/A");
        assert_eq!(result.market_data, catalog::sample_result().market_data);
        assert!(!result.insights.is_empty());
    }

    #[test]
    fn test_layering_raw_then_explicit() {
        let raw = json!({
            "id": "analysis-42",
            "moleculeData": {"name": "Aspirin", "formula": "C9H8O4", "molecular_weight": 180.16},
            "marketData": {"marketSize": 4200000000.0, "growthRate": 3.1},
            "clinicalTrials": "not-a-list",
            "regulatoryStatus": {"fda": "Approved", "approved_indications": ["Pain"]},
            "patentInfo": {"status": "Expired", "expiryDate": ""},
            "generatedAt": "2024-05-01T10:00:00.123456"
        });
        let result = normalize_result(&raw, "Aspirin", "fallback-id");

        assert_eq!(result.id, "analysis-42");
        assert_eq!(result.molecule_data.formula, "C9H8O4");
        assert_eq!(result.market_data.market_size, 4_200_000_000.0);
        assert_eq!(result.market_data.market_share, 0.0);
        assert!(result.market_data.competitors.is_empty());
        assert_eq!(result.clinical_trials, catalog::sample_result().clinical_trials);
        assert_eq!(result.regulatory_status.fda, "Approved");
        assert_eq!(result.regulatory_status.ema, "Unknown");
        assert_eq!(result.regulatory_status.approved_indications, vec!["Pain"]);
        assert_eq!(result.patent_info.status, "Expired");
        assert_eq!(result.patent_info.expiry_date, "N/A");
        assert_eq!(result.generated_at.to_rfc3339(), "2024-05-01T10:00:00.123456+00:00");
    }

    #[test]
    fn test_null_and_string_values_keep_remote_market() {
        let raw = json!({
            "marketData": {
                "marketSize": 3e9,
                "growthRate": "4.2",
                "competitors": [{"name": "Advil (Ibuprofen)", "marketShare": null, "revenue": "1.1e9"}]
            }
        });
        let market = normalize_result(&raw, "Aspirin", "a-1").market_data;

        assert_eq!(market.market_size, 3e9);
        assert_eq!(market.growth_rate, 4.2);
        assert_eq!(market.competitors.len(), 1);
        assert_eq!(market.competitors[0].name, "Advil (Ibuprofen)");
        assert_eq!(market.competitors[0].market_share, 0.0);
        assert_eq!(market.competitors[0].revenue, 1.1e9);
    }

    #[test]
    fn test_lenient_list_items() {
        let raw = json!({
            "clinicalTrials": [
                {"id": "NCT01", "phase": "Phase 3", "enrollment": "1200", "start_date": null},
                "garbage"
            ],
            "insights": [
                {"type": "opportunity", "title": "Pediatric label", "confidence": null},
                {"type": "market", "title": "Generic entry", "confidence": "0.7"}
            ],
            "sources": [{"title": "ClinicalTrials.gov", "source_type": "registry", "reliability": null}]
        });
        let result = normalize_result(&raw, "Aspirin", "a-1");

        assert_eq!(result.clinical_trials.len(), 1);
        assert_eq!(result.clinical_trials[0].id, "NCT01");
        assert_eq!(result.clinical_trials[0].enrollment, 1200);
        assert_eq!(result.clinical_trials[0].start_date, "");
        assert_eq!(result.clinical_trials[0].status, "Unknown");

        assert_eq!(result.insights.len(), 2);
        assert_eq!(result.insights[0].id, "insight-1");
        assert_eq!(result.insights[0].insight_type, InsightType::Opportunity);
        assert_eq!(result.insights[0].confidence, 0.0);
        assert_eq!(result.insights[1].insight_type, InsightType::Neutral);
        assert_eq!(result.insights[1].confidence, 0.7);

        assert_eq!(result.sources[0].source_type, "registry");
        assert_eq!(result.sources[0].reliability, 0.0);
    }

    #[test]
    fn test_mirror_matches_first_word() {
        let mut steps = pipeline::initial_steps();
        let now = Utc::now();
        let remote_steps = vec![
            remote("Query Parser", "completed", 100.0),
            remote("Clinical Trials Agent", "in-progress", 40.0),
            remote("Molecule Analyzer", "completed", 100.0),
        ];

        mirror_steps(&mut steps, &remote_steps, now);

        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[1].status, StepStatus::InProgress);
        assert_eq!(steps[1].progress, 40.0);
        assert!(steps[2..].iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_mirror_keeps_pipeline_order() {
        let mut steps = pipeline::initial_steps();
        let remote_steps = vec![
            remote("Market Intelligence", "completed", 100.0),
            remote("Regulatory Scanner", "running", 50.0),
        ];

        mirror_steps(&mut steps, &remote_steps, Utc::now());

        // Coordination has no matching remote step, so nothing downstream moves
        assert!(steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_mirror_never_regresses() {
        let mut steps = pipeline::initial_steps();
        mirror_steps(&mut steps, &[remote("Query Parser", "completed", 100.0)], Utc::now());
        mirror_steps(&mut steps, &[remote("Query Parser", "pending", 0.0)], Utc::now());
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[0].progress, 100.0);
    }

    #[test]
    fn test_mirror_copies_output() {
        let mut steps = pipeline::initial_steps();
        let mut step = remote("Query Parser", "in-progress", 10.0);
        step.output = Some("Query parsed: Aspirin".to_string());
        mirror_steps(&mut steps, &[step], Utc::now());
        assert_eq!(steps[0].output.as_deref(), Some("Query parsed: Aspirin"));
    }
}
