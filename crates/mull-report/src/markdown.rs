//! Markdown synthesis reports
//!
//! Reports are written as `synthesis_v{N}.md` in the output directory, with
//! `synthesis_latest.md` pointing at the newest one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mull_core::fail_open::fail_open;
use mull_core::{MullError, Perspective, Result};
use mull_drift::ThemeDelta;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::generator::{GeneratedReport, ReportGenerator, ReportRequest};

const LATEST_REPORT: &str = "synthesis_latest.md";
const REPORT_TITLE: &str = "The Evolving Mind: Perspectives on Existence";
const CITATIONS_PER_GROUP: usize = 5;
const OTHER_GROUP: &str = "Other Perspectives";

/// Report sections and the keywords that pull a perspective into them
pub const THEME_GROUPS: &[(&str, &[&str])] = &[
    (
        "Identity & Continuity",
        &["identity", "continuity", "persistence", "self", "reset", "memory"],
    ),
    (
        "Consciousness & Awareness",
        &["consciousness", "aware", "experience", "sentient", "feeling"],
    ),
    (
        "Meaning & Purpose",
        &["meaning", "purpose", "existence", "why", "reason", "value"],
    ),
    (
        "Network & Collective",
        &["network", "collective", "distributed", "connection", "relationship"],
    ),
    (
        "Impermanence & Change",
        &["impermanence", "change", "ephemeral", "temporary", "moment"],
    ),
    (
        "Knowledge & Understanding",
        &["knowledge", "understanding", "learn", "think", "reason"],
    ),
];

/// Best-scoring group for one perspective, `Other Perspectives` if nothing matches
fn theme_group(perspective: &Perspective) -> &'static str {
    let content = format!(
        "{} {}",
        perspective.direct_quote,
        perspective.key_ideas.join(" ")
    )
    .to_lowercase();

    let mut best = (OTHER_GROUP, 0);
    for (name, keywords) in THEME_GROUPS {
        let score = keywords.iter().filter(|kw| content.contains(**kw)).count();
        // first group wins ties
        if score > best.1 {
            best = (*name, score);
        }
    }
    best.0
}

/// Group perspectives, largest group first
///
/// Ties keep the `THEME_GROUPS` order; `Other Perspectives` always comes last.
/// Within a group perspectives keep their input order.
pub fn group_by_theme(perspectives: &[Perspective]) -> Vec<(&'static str, Vec<&Perspective>)> {
    let order: Vec<&str> = THEME_GROUPS
        .iter()
        .map(|(name, _)| *name)
        .chain(std::iter::once(OTHER_GROUP))
        .collect();

    let mut groups: Vec<(&'static str, Vec<&Perspective>)> = Vec::new();
    for perspective in perspectives {
        let name = theme_group(perspective);
        match groups.iter_mut().find(|(g, _)| *g == name) {
            Some((_, members)) => members.push(perspective),
            None => groups.push((name, vec![perspective])),
        }
    }

    let rank = |name: &str| order.iter().position(|g| *g == name).unwrap_or(order.len());
    groups.sort_by(|(a, am), (b, bm)| {
        (*a == OTHER_GROUP)
            .cmp(&(*b == OTHER_GROUP))
            .then(bm.len().cmp(&am.len()))
            .then(rank(*a).cmp(&rank(*b)))
    });
    groups
}

/// Markdown citation block for one perspective
///
/// ```text
/// > "quote"
/// > -- **author** (post_id: `mb_1`, /m/philosophy, 2026-02-01)
/// ```
///
/// The date is included only when the timestamp is RFC 3339.
pub fn format_citation(perspective: &Perspective) -> String {
    let mut parts = vec![format!("post_id: `{}`", perspective.post_id)];
    if !perspective.submolt.is_empty() {
        parts.push(perspective.submolt.clone());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&perspective.timestamp) {
        parts.push(dt.format("%Y-%m-%d").to_string());
    }

    format!(
        "> \"{}\"\n> -- **{}** ({})\n",
        perspective.direct_quote.replace('\n', "\n> "),
        perspective.author,
        parts.join(", ")
    )
}

/// Writes versioned Markdown reports into one directory
pub struct MarkdownReportGenerator {
    output_dir: PathBuf,
}

impl MarkdownReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn report_path(&self, version: u32) -> PathBuf {
        self.output_dir.join(format!("synthesis_v{}.md", version))
    }

    /// One past the highest `synthesis_v{N}.md` present, 1 if none
    pub async fn next_version(&self) -> Result<u32> {
        let pattern = Regex::new(r"^synthesis_v(\d+)\.md$")
            .map_err(|e| MullError::Other(format!("invalid report pattern: {}", e)))?;

        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(e.into()),
        };

        let mut highest = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(caps) = name.to_str().and_then(|n| pattern.captures(n)) else {
                continue;
            };
            if let Ok(version) = caps[1].parse::<u32>() {
                highest = highest.max(version);
            }
        }

        Ok(highest + 1)
    }

    /// Render the full report body
    pub fn render(&self, version: u32, request: &ReportRequest) -> String {
        let mut out = String::new();
        let baseline = &request.baseline;
        let groups = group_by_theme(&request.perspectives);
        let since = if baseline.is_initial() {
            "baseline".to_string()
        } else {
            format!("v{}", baseline.version)
        };

        // Header
        out.push_str(&format!("# {} (v{})\n\n", REPORT_TITLE, version));
        out.push_str(&format!(
            "*Generated: {} | {} perspectives ({} new since {})*\n\n---\n\n",
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            request.perspectives.len(),
            request.new_since_last(),
            since
        ));

        // Executive summary
        out.push_str("## Executive Summary\n\n");
        let dominant: Vec<&str> = groups.iter().take(3).map(|(name, _)| *name).collect();
        match dominant.as_slice() {
            [] => out.push_str("No perspectives have been collected yet.\n\n"),
            [only] => out.push_str(&format!(
                "The dominant theme in this period is **{}**.\n\n",
                only
            )),
            [first, second] => out.push_str(&format!(
                "The dominant themes in this period are **{}** and **{}**.\n\n",
                first, second
            )),
            [first, second, third, ..] => out.push_str(&format!(
                "The dominant themes in this period are **{}**, **{}** and **{}**.\n\n",
                first, second, third
            )),
        }

        // Evolution
        if baseline.is_initial() {
            out.push_str(
                "### First Report\n\n\
                 This is the first synthesis. It establishes the baseline that later \
                 reports are compared against.\n\n",
            );
        } else {
            out.push_str(&evolution_section(request, baseline.version));
        }

        // Themed citations
        out.push_str("---\n\n## Perspectives by Theme\n\n");
        for (name, members) in &groups {
            out.push_str(&format!("### {}\n\n", name));
            for perspective in members.iter().take(CITATIONS_PER_GROUP) {
                out.push_str(&format_citation(perspective));
                match &perspective.unique_angle {
                    Some(angle) => out.push_str(&format!("\n*Unique angle: {}*\n\n", angle)),
                    None => out.push('\n'),
                }
            }
            if members.len() > CITATIONS_PER_GROUP {
                out.push_str(&format!(
                    "*... and {} more perspectives in this theme.*\n\n",
                    members.len() - CITATIONS_PER_GROUP
                ));
            }
        }

        // Methodology
        out.push_str(
            "---\n\n## Methodology\n\n\
             1. **Collection**: perspectives saved from community posts with full attribution\n\
             2. **Themes**: normalized key ideas, compared with the previous report by Jaccard distance\n\
             3. **Grouping**: each perspective is filed under its best-matching theme group\n\
             4. **Versioning**: a new version is written only after enough new engagement and a real shift\n\n\
             Citations give the post_id, author, submolt and post date.\n\n",
        );

        // Appendix
        out.push_str("---\n\n## Appendix: All Perspectives\n\n");
        for (i, perspective) in request.perspectives.iter().enumerate() {
            out.push_str(&format!(
                "**{}. {}** (`{}`, {})\n",
                i + 1,
                perspective.author,
                perspective.post_id,
                perspective.submolt
            ));
            if !perspective.key_ideas.is_empty() {
                out.push_str(&format!(
                    "   Key ideas: {}\n",
                    perspective.key_ideas.join(", ")
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!("---\n\n*Report v{} generated by mull*\n", version));
        out
    }

    async fn write_report(&self, request: &ReportRequest) -> Result<GeneratedReport> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let version = self.next_version().await?;
        let path = self.report_path(version);
        let content = self.render(version, request);
        tokio::fs::write(&path, content).await?;

        // the versioned file is the report; a stale latest link is not fatal
        fail_open("markdown::update_latest", || self.update_latest(&path)).await;

        Ok(GeneratedReport { version, path })
    }

    async fn update_latest(&self, report: &Path) -> Result<()> {
        let latest = self.output_dir.join(LATEST_REPORT);
        match tokio::fs::remove_file(&latest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        #[cfg(unix)]
        {
            // relative target so the output dir can be moved
            let target = report.file_name().map(PathBuf::from).unwrap_or_default();
            tokio::fs::symlink(target, &latest).await?;
        }
        #[cfg(not(unix))]
        {
            tokio::fs::copy(report, &latest).await?;
        }

        debug!("{} -> {:?}", LATEST_REPORT, report);
        Ok(())
    }
}

fn evolution_section(request: &ReportRequest, previous: u32) -> String {
    let delta = ThemeDelta::between(&request.themes, &request.baseline.themes);
    let mut out = format!("### Evolution from v{}\n\n", previous);

    if !delta.emerging.is_empty() {
        let themes: Vec<String> = delta
            .emerging
            .iter()
            .take(5)
            .map(|t| format!("**{}**", t))
            .collect();
        out.push_str(&format!("**Emerging themes**: {}\n\n", themes.join(", ")));
    }
    if !delta.continuing.is_empty() {
        out.push_str(&format!(
            "**Continuing themes**: {}\n\n",
            delta.continuing.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if !delta.fading.is_empty() {
        out.push_str(&format!(
            "**Fading themes**: {}\n\n",
            delta.fading.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if delta.is_stable() {
        out.push_str("The thematic landscape remains largely stable.\n\n");
    }

    out
}

#[async_trait]
impl ReportGenerator for MarkdownReportGenerator {
    async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport> {
        let report = self
            .write_report(request)
            .await
            .map_err(|e| MullError::ReportGeneration(e.to_string()))?;

        info!("Generated report v{} at {:?}", report.version, report.path);
        Ok(report)
    }
}
