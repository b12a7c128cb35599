//! Local reference data.
//!
//! Holds the reference molecule catalog and the canned sample result used by
//! the local simulation and as the base layer of remote-result normalization.

use crate::models::{
    AnalysisRequest, AnalysisResult, ClinicalTrial, Competitor, Insight, InsightType, MarketData,
    MoleculeData, PatentInfo, RegulatoryStatus, Source,
};
use chrono::Utc;
use uuid::Uuid;

/// Placeholder used for unknown string fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder used for unknown categorical fields.
pub const UNKNOWN: &str = "Unknown";

fn molecule(
    name: &str,
    formula: &str,
    molecular_weight: f64,
    category: &str,
    mechanism: &str,
    indications: &[&str],
) -> MoleculeData {
    MoleculeData {
        name: name.to_string(),
        formula: formula.to_string(),
        molecular_weight,
        category: category.to_string(),
        mechanism: mechanism.to_string(),
        indications: indications.iter().map(|s| s.to_string()).collect(),
    }
}

/// The reference molecule catalog.
pub fn molecule_catalog() -> Vec<MoleculeData> {
    vec![
        molecule(
            "Aspirin",
            "C9H8O4",
            180.16,
            "NSAID",
            "Irreversible COX-1 and COX-2 inhibition",
            &["Pain", "Fever", "Cardiovascular prevention"],
        ),
        molecule(
            "Metformin",
            "C4H11N5",
            129.16,
            "Antidiabetic",
            "Decreases hepatic glucose production and improves insulin sensitivity",
            &["Type 2 diabetes"],
        ),
        molecule(
            "Semaglutide",
            "C187H291N45O59",
            4113.58,
            "GLP-1 Agonist",
            "GLP-1 receptor agonism",
            &["Type 2 diabetes", "Chronic weight management"],
        ),
        molecule(
            "Pembrolizumab",
            "C6504H10004N1716O2036S46",
            146300.0,
            "Immunotherapy",
            "PD-1 checkpoint inhibition",
            &["Melanoma", "Non-small cell lung cancer"],
        ),
        molecule(
            "Ibuprofen",
            "C13H18O2",
            206.28,
            "NSAID",
            "Reversible COX-1 and COX-2 inhibition",
            &["Pain", "Inflammation", "Fever"],
        ),
        molecule(
            "Adalimumab",
            "C6428H9912N1694O1987S46",
            144190.3,
            "TNF Inhibitor",
            "Binds TNF-alpha and blocks receptor interaction",
            &["Rheumatoid arthritis", "Crohn's disease", "Psoriasis"],
        ),
        molecule(
            "Atorvastatin",
            "C33H35FN2O5",
            558.64,
            "Statin",
            "HMG-CoA reductase inhibition",
            &["Hypercholesterolemia", "Cardiovascular prevention"],
        ),
        molecule(
            "Acetaminophen",
            "C8H9NO2",
            151.16,
            "Analgesic",
            "Central COX inhibition",
            &["Pain", "Fever"],
        ),
    ]
}

/// Look up a catalog entry by case-insensitive exact name.
pub fn find_molecule(name: &str) -> Option<MoleculeData> {
    let needle = name.trim().to_lowercase();
    molecule_catalog()
        .into_iter()
        .find(|m| m.name.to_lowercase() == needle)
}

/// Fabricate a profile for a molecule missing from the catalog.
pub fn synthetic_molecule(name: &str) -> MoleculeData {
    MoleculeData {
        name: name.to_string(),
        formula: NOT_AVAILABLE.to_string(),
        molecular_weight: 0.0,
        category: UNKNOWN.to_string(),
        mechanism: "Mechanism of action under investigation".to_string(),
        indications: Vec::new(),
    }
}

fn trial(
    id: &str,
    title: &str,
    phase: &str,
    status: &str,
    enrollment: u32,
    condition: &str,
) -> ClinicalTrial {
    ClinicalTrial {
        id: id.to_string(),
        title: title.to_string(),
        phase: phase.to_string(),
        status: status.to_string(),
        enrollment,
        condition: condition.to_string(),
        sponsor: "Novo Nordisk".to_string(),
        start_date: "2022-03-01".to_string(),
        estimated_completion: "2026-09-30".to_string(),
    }
}

fn insight(
    id: &str,
    insight_type: InsightType,
    category: &str,
    title: &str,
    content: &str,
    confidence: f64,
    source: &str,
) -> Insight {
    Insight {
        id: id.to_string(),
        insight_type,
        category: category.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        confidence,
        source: source.to_string(),
    }
}

fn source(id: &str, title: &str, source_type: &str, publisher: &str, url: &str) -> Source {
    Source {
        id: id.to_string(),
        title: title.to_string(),
        source_type: source_type.to_string(),
        publisher: publisher.to_string(),
        date: "2024".to_string(),
        url: url.to_string(),
        reliability: 0.95,
    }
}

/// The canned sample result. Every section is fully populated.
pub fn sample_result() -> AnalysisResult {
    let molecule_data = find_molecule("Semaglutide").unwrap_or_else(|| synthetic_molecule("Semaglutide"));

    AnalysisResult {
        id: "analysis-sample".to_string(),
        molecule_name: molecule_data.name.clone(),
        molecule_data,
        market_data: MarketData {
            market_size: 21_500_000_000.0,
            market_share: 42.5,
            growth_rate: 28.3,
            projected_market_2028: 45_000_000_000.0,
            competitors: vec![
                Competitor {
                    name: "Tirzepatide".to_string(),
                    company: "Eli Lilly".to_string(),
                    category: "GIP/GLP-1 Agonist".to_string(),
                    market_share: 24.1,
                    revenue: 5_200_000_000.0,
                },
                Competitor {
                    name: "Dulaglutide".to_string(),
                    company: "Eli Lilly".to_string(),
                    category: "GLP-1 Agonist".to_string(),
                    market_share: 18.7,
                    revenue: 7_100_000_000.0,
                },
                Competitor {
                    name: "Liraglutide".to_string(),
                    company: "Novo Nordisk".to_string(),
                    category: "GLP-1 Agonist".to_string(),
                    market_share: 9.4,
                    revenue: 2_600_000_000.0,
                },
            ],
        },
        clinical_trials: vec![
            trial(
                "NCT04251156",
                "Cardiovascular outcomes in adults with obesity",
                "Phase 3",
                "Recruiting",
                17_604,
                "Obesity",
            ),
            trial(
                "NCT03574597",
                "Weekly dosing in type 2 diabetes",
                "Phase 3",
                "Completed",
                3_297,
                "Type 2 diabetes",
            ),
            trial(
                "NCT05064735",
                "Oral formulation in chronic kidney disease",
                "Phase 2",
                "Active",
                1_250,
                "Chronic kidney disease",
            ),
        ],
        patent_info: PatentInfo {
            patent_number: "US8129343B2".to_string(),
            title: "Acylated GLP-1 compounds".to_string(),
            filing_date: "2006-03-20".to_string(),
            expiry_date: "2031-12-05".to_string(),
            status: "Active".to_string(),
            holder: "Novo Nordisk A/S".to_string(),
        },
        regulatory_status: RegulatoryStatus {
            fda: "Approved".to_string(),
            ema: "Approved".to_string(),
            approval_date: "2017-12-05".to_string(),
            approved_indications: vec![
                "Type 2 diabetes".to_string(),
                "Chronic weight management".to_string(),
                "Cardiovascular risk reduction".to_string(),
            ],
            label_warnings: vec!["Risk of thyroid C-cell tumors".to_string()],
        },
        insights: vec![
            insight(
                "insight-1",
                InsightType::Positive,
                "Market",
                "Blockbuster growth trajectory",
                "Market growth is far above the pharmaceutical industry average.",
                0.92,
                "Market Intelligence Agent",
            ),
            insight(
                "insight-2",
                InsightType::Opportunity,
                "Clinical",
                "Label expansion potential",
                "Ongoing cardiovascular and renal trials could add new indications.",
                0.85,
                "Clinical Trials Agent",
            ),
            insight(
                "insight-3",
                InsightType::Negative,
                "Patent",
                "Approaching patent cliff",
                "Core compound protection ends within the decade, opening the door to generics.",
                0.88,
                "Patent Analyzer",
            ),
            insight(
                "insight-4",
                InsightType::Neutral,
                "Regulatory",
                "Stable regulatory position",
                "Approved by both FDA and EMA with a boxed warning on the label.",
                0.9,
                "Regulatory Scanner",
            ),
            insight(
                "insight-5",
                InsightType::Negative,
                "Competitive",
                "Intensifying competition",
                "Dual agonists are gaining share quickly in the same indications.",
                0.81,
                "Market Intelligence Agent",
            ),
        ],
        sources: vec![
            source(
                "src-1",
                "Global GLP-1 Market Report",
                "Market Research",
                "Global Market Insights",
                "https://example.com/market-report",
            ),
            source(
                "src-2",
                "ClinicalTrials.gov Database",
                "Clinical Database",
                "U.S. National Library of Medicine",
                "https://clinicaltrials.gov",
            ),
            source(
                "src-3",
                "FDA Drug Approval Database",
                "Regulatory",
                "U.S. Food and Drug Administration",
                "https://www.fda.gov/drugs",
            ),
        ],
        summary: "Strong commercial position with expanding indications, offset by patent expiry and rising competition.".to_string(),
        generated_at: Utc::now(),
    }
}

/// Build the locally simulated result for a request.
///
/// Uses the catalog entry verbatim when the molecule is known, otherwise a
/// synthetic profile; every other section comes from the sample result.
pub fn local_result(request: &AnalysisRequest) -> AnalysisResult {
    let name = request.molecule_name();
    let molecule_data = find_molecule(name).unwrap_or_else(|| synthetic_molecule(name));

    AnalysisResult {
        id: format!("analysis-{}", Uuid::new_v4().simple()),
        molecule_name: name.to_string(),
        molecule_data,
        generated_at: Utc::now(),
        ..sample_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisType;

    #[test]
    fn test_find_molecule_case_insensitive() {
        let aspirin = find_molecule("aSpIrIn").unwrap();
        assert_eq!(aspirin.formula, "C9H8O4");
        assert_eq!(aspirin.category, "NSAID");
        assert!(find_molecule("Asp").is_none());
    }

    #[test]
    fn test_local_result_known_molecule() {
        let request = AnalysisRequest::new("aspirin", [AnalysisType::Market], None).unwrap();
        let result = local_result(&request);
        assert_eq!(result.molecule_data, find_molecule("Aspirin").unwrap());
        assert_eq!(result.molecule_name, "aspirin");
        assert_eq!(result.insights.len(), sample_result().insights.len());
    }

    #[test]
    fn test_local_result_unknown_molecule() {
        let request = AnalysisRequest::new("UnknownDrug123", [AnalysisType::Market], None).unwrap();
        let result = local_result(&request);
        assert_eq!(result.molecule_data.name, "UnknownDrug123");
        assert_eq!(result.molecule_data.molecular_weight, 0.0);
        assert_eq!(result.molecule_data.formula, "N/A");
    }

    #[test]
    fn test_sample_result_fully_populated() {
        let result = sample_result();
        assert!(!result.market_data.competitors.is_empty());
        assert!(!result.clinical_trials.is_empty());
        assert!(!result.patent_info.expiry_date.is_empty());
        assert!(!result.regulatory_status.fda.is_empty());
        assert!(!result.sources.is_empty());
    }
}
