//! Markdown report generation.
//!
//! This module renders an [`AnalysisResult`] as a Markdown research brief or
//! as pretty-printed JSON.

use crate::catalog::NOT_AVAILABLE;
use crate::chat::format_billions;
use crate::error::Result;
use crate::models::{
    AnalysisResult, ClinicalTrial, Insight, MarketData, MoleculeData, PatentInfo,
    RegulatoryStatus, Source,
};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(result: &AnalysisResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("# PharmAssist Report: {}\n\n", result.molecule_name));

    output.push_str(&generate_metadata_section(result));
    output.push_str(&generate_table_of_contents(result));
    output.push_str(&generate_summary_section(&result.summary));
    output.push_str(&generate_molecule_section(&result.molecule_data));
    output.push_str(&generate_market_section(&result.market_data));
    output.push_str(&generate_trials_section(&result.clinical_trials));
    output.push_str(&generate_patent_section(&result.patent_info));
    output.push_str(&generate_regulatory_section(&result.regulatory_status));
    output.push_str(&generate_insights_section(&result.insights));
    output.push_str(&generate_sources_section(&result.sources));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

fn generate_metadata_section(result: &AnalysisResult) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Analysis ID:** `{}`\n", result.id));
    section.push_str(&format!("- **Molecule:** {}\n", result.molecule_name));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Insights:** {}\n", result.insights.len()));
    section.push_str(&format!("- **Sources:** {}\n", result.sources.len()));
    section.push('\n');

    section
}

fn generate_table_of_contents(result: &AnalysisResult) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    if !result.summary.is_empty() {
        toc.push_str("- [Executive Summary](#executive-summary)\n");
    }
    toc.push_str("- [Molecule Profile](#molecule-profile)\n");
    toc.push_str("- [Market Intelligence](#market-intelligence)\n");
    toc.push_str("- [Clinical Trials](#clinical-trials)\n");
    toc.push_str("- [Patent Landscape](#patent-landscape)\n");
    toc.push_str("- [Regulatory Status](#regulatory-status)\n");
    if !result.insights.is_empty() {
        toc.push_str("- [Key Insights](#key-insights)\n");
    }
    if !result.sources.is_empty() {
        toc.push_str("- [Sources](#sources)\n");
    }
    toc.push('\n');

    toc
}

fn generate_summary_section(summary: &str) -> String {
    if summary.is_empty() {
        return String::new();
    }

    format!("## Executive Summary\n\n{}\n\n", summary)
}

fn generate_molecule_section(molecule: &MoleculeData) -> String {
    let mut section = String::new();

    section.push_str("## Molecule Profile\n\n");
    section.push_str("| Property | Value |\n");
    section.push_str("|:---|:---|\n");
    section.push_str(&format!("| Name | {} |\n", molecule.name));
    section.push_str(&format!("| Formula | {} |\n", molecule.formula));
    let weight = if molecule.molecular_weight > 0.0 {
        format!("{:.2} g/mol", molecule.molecular_weight)
    } else {
        NOT_AVAILABLE.to_string()
    };
    section.push_str(&format!("| Molecular Weight | {} |\n", weight));
    section.push_str(&format!("| Category | {} |\n", molecule.category));
    section.push_str(&format!("| Mechanism | {} |\n", molecule.mechanism));
    section.push('\n');

    if !molecule.indications.is_empty() {
        section.push_str("**Indications:**\n\n");
        for indication in &molecule.indications {
            section.push_str(&format!("- {}\n", indication));
        }
        section.push('\n');
    }

    section
}

fn generate_market_section(market: &MarketData) -> String {
    let mut section = String::new();

    section.push_str("## Market Intelligence\n\n");
    section.push_str(&format!(
        "- **Market Size:** {}\n",
        format_billions(market.market_size)
    ));
    section.push_str(&format!("- **Market Share:** {:.1}%\n", market.market_share));
    section.push_str(&format!("- **Annual Growth:** {:.1}%\n", market.growth_rate));
    if market.projected_market_2028 > 0.0 {
        section.push_str(&format!(
            "- **Projected 2028:** {}\n",
            format_billions(market.projected_market_2028)
        ));
    }
    section.push('\n');

    if !market.competitors.is_empty() {
        section.push_str("### Competitors\n\n");
        section.push_str("| Drug | Company | Category | Share | Revenue |\n");
        section.push_str("|:---|:---|:---|:---:|:---:|\n");

        let mut competitors: Vec<_> = market.competitors.iter().collect();
        competitors.sort_by(|a, b| b.market_share.total_cmp(&a.market_share));

        for competitor in competitors {
            section.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {} |\n",
                competitor.name,
                competitor.company,
                competitor.category,
                competitor.market_share,
                format_billions(competitor.revenue)
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_trials_section(trials: &[ClinicalTrial]) -> String {
    let mut section = String::new();

    section.push_str("## Clinical Trials\n\n");

    if trials.is_empty() {
        section.push_str("No clinical trials found.\n\n");
        return section;
    }

    section.push_str("| ID | Title | Phase | Status | Enrollment | Sponsor |\n");
    section.push_str("|:---|:---|:---:|:---|:---:|:---|\n");
    for trial in trials {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            trial.id, trial.title, trial.phase, trial.status, trial.enrollment, trial.sponsor
        ));
    }
    section.push('\n');

    section
}

fn generate_patent_section(patent: &PatentInfo) -> String {
    let mut section = String::new();

    section.push_str("## Patent Landscape\n\n");
    section.push_str(&format!("- **Patent:** {}\n", patent.patent_number));
    if !patent.title.is_empty() {
        section.push_str(&format!("- **Title:** {}\n", patent.title));
    }
    section.push_str(&format!("- **Status:** {}\n", patent.status));
    section.push_str(&format!("- **Filed:** {}\n", patent.filing_date));
    section.push_str(&format!("- **Expires:** {}\n", patent.expiry_date));
    if !patent.holder.is_empty() {
        section.push_str(&format!("- **Holder:** {}\n", patent.holder));
    }
    section.push('\n');

    section
}

fn generate_regulatory_section(regulatory: &RegulatoryStatus) -> String {
    let mut section = String::new();

    section.push_str("## Regulatory Status\n\n");
    section.push_str("| Agency | Status |\n");
    section.push_str("|:---|:---|\n");
    section.push_str(&format!("| FDA | {} |\n", regulatory.fda));
    section.push_str(&format!("| EMA | {} |\n", regulatory.ema));
    section.push('\n');

    if !regulatory.approved_indications.is_empty() {
        section.push_str("**Approved Indications:**\n\n");
        for indication in &regulatory.approved_indications {
            section.push_str(&format!("- {}\n", indication));
        }
        section.push('\n');
    }

    if !regulatory.label_warnings.is_empty() {
        section.push_str("**Label Warnings:**\n\n");
        for warning in &regulatory.label_warnings {
            section.push_str(&format!("- ⚠️ {}\n", warning));
        }
        section.push('\n');
    }

    section
}

fn generate_insights_section(insights: &[Insight]) -> String {
    if insights.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Key Insights\n\n");

    for insight in insights {
        section.push_str(&format!(
            "### {} {}\n\n",
            insight.insight_type.emoji(),
            insight.title
        ));
        if !insight.category.is_empty() {
            section.push_str(&format!(
                "*{} · confidence {:.0}%*\n\n",
                insight.category,
                insight.confidence * 100.0
            ));
        }
        if !insight.content.is_empty() {
            section.push_str(&format!("{}\n\n", insight.content));
        }
    }

    section
}

fn generate_sources_section(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Sources\n\n");

    for (i, source) in sources.iter().enumerate() {
        let title = if source.url.is_empty() {
            source.title.clone()
        } else {
            format!("[{}]({})", source.title, source.url)
        };
        section.push_str(&format!("{}. {}", i + 1, title));
        if !source.publisher.is_empty() {
            section.push_str(&format!(" ({}", source.publisher));
            if !source.date.is_empty() {
                section.push_str(&format!(", {}", source.date));
            }
            section.push(')');
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by PharmAssist*\n");

    footer
}
