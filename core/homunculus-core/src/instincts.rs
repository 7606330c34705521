//! Instinct records and the reports built from them.
//!
//! An instinct is a `*.yaml` file written by the analysis tool:
//!
//! ```text
//! ---
//! id: prefer-rg
//! trigger: "when searching code"
//! confidence: 0.8
//! domain: "workflow"
//! source: session-observation
//! observed_count: 6
//! last_observed: 2025-01-15
//! ---
//!
//! # Prefer ripgrep
//!
//! ## Action
//! Use Grep instead of Bash grep.
//! ```
//!
//! Files are only ever read here. The summary document is derived and
//! regenerated from scratch on every sync.

use crate::error::Result;
use crate::fsutil;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Confidence used when the field is missing or not a number.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Instincts at or above this confidence are listed as "Apply These".
pub const AUTO_APPLY_THRESHOLD: f64 = 0.7;

const INSTINCT_PATTERN: &str = "*.yaml";
const RULE: &str = "============================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstinctOrigin {
    Personal,
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instinct {
    pub id: String,
    pub trigger: Option<String>,
    pub confidence: f64,
    pub domain: Option<String>,
    pub source: Option<String>,
    pub observed_count: Option<u32>,
    pub last_observed: Option<String>,
    /// Markdown after the front matter.
    pub body: String,
    pub origin: InstinctOrigin,
    pub source_file: Option<PathBuf>,
}

impl Instinct {
    /// Text under `## Action` up to the next `## ` heading.
    pub fn action(&self) -> Option<String> {
        let mut lines = self.body.lines();
        lines
            .by_ref()
            .find(|line| line.trim_end().starts_with("## Action"))?;
        let action: Vec<&str> = lines.take_while(|line| !line.starts_with("## ")).collect();
        let action = action.join("\n").trim().to_string();
        (!action.is_empty()).then_some(action)
    }

    pub fn domain_or_general(&self) -> &str {
        self.domain.as_deref().unwrap_or("general")
    }

    pub fn percent(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }
}

/// Parses the front matter and body. Returns `None` without an `id`.
pub fn parse_instinct(content: &str, origin: InstinctOrigin) -> Option<Instinct> {
    let mut meta: BTreeMap<String, String> = BTreeMap::new();
    let mut body = Vec::new();
    let mut in_front_matter = false;
    let mut past_front_matter = false;

    for line in content.lines() {
        if line.trim() == "---" {
            if in_front_matter {
                in_front_matter = false;
                past_front_matter = true;
            } else if !past_front_matter {
                in_front_matter = true;
            } else {
                body.push(line);
            }
            continue;
        }
        if in_front_matter {
            if let Some((key, value)) = line.split_once(':') {
                meta.insert(key.trim().to_string(), unquote(value.trim()).to_string());
            }
        } else if past_front_matter {
            body.push(line);
        }
    }

    let id = meta.remove("id").filter(|id| !id.is_empty())?;
    let non_empty = |v: String| (!v.is_empty()).then_some(v);

    Some(Instinct {
        id,
        trigger: meta.remove("trigger").and_then(non_empty),
        confidence: meta
            .get("confidence")
            .and_then(|v| parse_confidence(v))
            .unwrap_or(DEFAULT_CONFIDENCE),
        domain: meta.remove("domain").and_then(non_empty),
        source: meta.remove("source").and_then(non_empty),
        observed_count: meta
            .get("observed_count")
            .and_then(|v| v.parse().ok()),
        last_observed: meta.remove("last_observed").and_then(non_empty),
        body: body.join("\n").trim().to_string(),
        origin,
        source_file: None,
    })
}

fn unquote(value: &str) -> &str {
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

/// Leading number of the field; non-finite values count as missing.
fn parse_confidence(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses every `*.yaml` file in `dir`, ordered by file name.
pub fn load_dir(dir: &Path, origin: InstinctOrigin) -> Vec<Instinct> {
    let mut files = fsutil::find_files(dir, INSTINCT_PATTERN, None);
    files.sort_by(|a, b| a.path.cmp(&b.path));

    files
        .into_iter()
        .filter_map(|file| {
            let content = match fsutil::read_file(&file.path) {
                Some(content) => content,
                None => {
                    tracing::warn!(path = %file.path.display(), "Failed to read instinct file");
                    return None;
                }
            };
            let mut instinct = parse_instinct(&content, origin)?;
            instinct.source_file = Some(file.path);
            Some(instinct)
        })
        .collect()
}

/// Personal then inherited instincts.
pub fn load_all(personal_dir: &Path, inherited_dir: &Path) -> Vec<Instinct> {
    let mut all = load_dir(personal_dir, InstinctOrigin::Personal);
    all.extend(load_dir(inherited_dir, InstinctOrigin::Inherited));
    all
}

pub fn count_files(dir: &Path) -> usize {
    fsutil::find_files(dir, INSTINCT_PATTERN, None).len()
}

/// File name to modification time for every instinct file in `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<String, SystemTime> {
    fsutil::find_files(dir, INSTINCT_PATTERN, None)
        .into_iter()
        .filter_map(|file| {
            let name = file.path.file_name()?.to_str()?.to_string();
            Some((name, file.modified))
        })
        .collect()
}

/// Files present in `after` that are new or changed relative to `before`.
pub fn changed_since(
    before: &BTreeMap<String, SystemTime>,
    after: &BTreeMap<String, SystemTime>,
) -> Vec<String> {
    after
        .iter()
        .filter(|(name, modified)| before.get(*name) != Some(*modified))
        .map(|(name, _)| name.clone())
        .collect()
}

fn sort_by_confidence(instincts: &mut [Instinct]) {
    instincts.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Summary Document
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders the instincts summary. `None` when there are no instincts.
pub fn render_summary(instincts: &[Instinct], generated_on: NaiveDate) -> Option<String> {
    if instincts.is_empty() {
        return None;
    }

    let mut sorted = instincts.to_vec();
    sort_by_confidence(&mut sorted);
    let threshold_pct = (AUTO_APPLY_THRESHOLD * 100.0).round() as i64;

    let mut lines = vec![
        "# Learned Instincts".to_string(),
        String::new(),
        format!(
            "> Auto-generated by Continuous Learning v2 on {}",
            generated_on.format("%Y-%m-%d")
        ),
        format!("> {} instinct(s) from session observations", sorted.len()),
        String::new(),
    ];

    let (high, low): (Vec<&Instinct>, Vec<&Instinct>) = sorted
        .iter()
        .partition(|i| i.confidence >= AUTO_APPLY_THRESHOLD);

    if !high.is_empty() {
        lines.push(format!("## Apply These (confidence >= {}%)", threshold_pct));
        lines.push(String::new());
        for instinct in high {
            lines.push(format!("### {} ({}%)", instinct.id, instinct.percent()));
            lines.push(format!(
                "- **Trigger**: {}",
                instinct.trigger.as_deref().unwrap_or("unknown")
            ));
            if let Some(action) = instinct.action() {
                lines.push(format!("- **Action**: {}", action));
            }
            lines.push(String::new());
        }
    }

    if !low.is_empty() {
        lines.push(format!("## Consider These (confidence < {}%)", threshold_pct));
        lines.push(String::new());
        for instinct in low {
            lines.push(format!(
                "- **{}** ({}%): {}",
                instinct.id,
                instinct.percent(),
                instinct.trigger.as_deref().unwrap_or("")
            ));
        }
        lines.push(String::new());
    }

    Some(lines.join("\n"))
}

/// Regenerates `output` from the instincts in `dir`.
///
/// Returns the number of instincts rendered; nothing is written for zero.
pub fn sync_summary(dir: &Path, output: &Path, generated_on: NaiveDate) -> Result<usize> {
    let instincts = load_dir(dir, InstinctOrigin::Personal);
    let Some(document) = render_summary(&instincts, generated_on) else {
        return Ok(0);
    };
    fsutil::atomic_write(output, &document)?;
    tracing::info!(path = %output.display(), count = instincts.len(), "Generated instincts summary");
    Ok(instincts.len())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════════════

fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence * 10.0).floor().max(0.0) as usize).min(10);
    format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled))
}

/// Human-readable listing grouped by domain.
pub fn status_report(
    instincts: &[Instinct],
    personal_dir: &Path,
    inherited_dir: &Path,
    observations: Option<(usize, &Path)>,
) -> String {
    let mut out = String::new();

    if instincts.is_empty() {
        out.push_str("No instincts found.\n\nInstinct directories:\n");
        let _ = writeln!(out, "  Personal:  {}", personal_dir.display());
        let _ = writeln!(out, "  Inherited: {}", inherited_dir.display());
        return out;
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "  INSTINCT STATUS - {} total", instincts.len());
    let _ = writeln!(out, "{}\n", RULE);

    let personal = instincts
        .iter()
        .filter(|i| i.origin == InstinctOrigin::Personal)
        .count();
    let _ = writeln!(out, "  Personal:  {}", personal);
    let _ = writeln!(out, "  Inherited: {}", instincts.len() - personal);
    out.push('\n');

    let mut by_domain: BTreeMap<&str, Vec<Instinct>> = BTreeMap::new();
    for instinct in instincts {
        by_domain
            .entry(instinct.domain_or_general())
            .or_default()
            .push(instinct.clone());
    }

    for (domain, mut group) in by_domain {
        sort_by_confidence(&mut group);
        let _ = writeln!(out, "## {} ({})\n", domain.to_uppercase(), group.len());
        for instinct in &group {
            let pct = (instinct.confidence * 100.0).floor() as i64;
            let _ = writeln!(
                out,
                "  {} {:>3}%  {}",
                confidence_bar(instinct.confidence),
                pct,
                instinct.id
            );
            let _ = writeln!(
                out,
                "            trigger: {}",
                instinct.trigger.as_deref().unwrap_or("unknown trigger")
            );
            if let Some(action) = instinct.action() {
                let first = action.lines().next().unwrap_or_default();
                let shown: String = first.chars().take(60).collect();
                let ellipsis = if first.chars().count() > 60 { "..." } else { "" };
                let _ = writeln!(out, "            action: {}{}", shown, ellipsis);
            }
            out.push('\n');
        }
    }

    if let Some((count, path)) = observations {
        let _ = writeln!(out, "  Observations: {} events logged", count);
        let _ = writeln!(out, "  File: {}", path.display());
    }

    let _ = writeln!(out, "\n{}", RULE);
    out
}

/// Group of instincts whose triggers reduce to the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillCandidate {
    pub trigger: String,
    pub instinct_ids: Vec<String>,
    pub avg_confidence: f64,
    pub domains: Vec<String>,
}

const TRIGGER_FILLER: [&str; 6] = [
    "when",
    "creating",
    "writing",
    "adding",
    "implementing",
    "testing",
];

fn trigger_key(trigger: &str) -> String {
    let mut key = trigger.to_lowercase();
    for word in TRIGGER_FILLER {
        key = key.replace(word, "").trim().to_string();
    }
    key
}

/// Clusters of two or more instincts sharing a trigger key, biggest first.
pub fn skill_candidates(instincts: &[Instinct]) -> Vec<SkillCandidate> {
    let mut clusters: Vec<(String, Vec<&Instinct>)> = Vec::new();
    for instinct in instincts {
        let key = trigger_key(instinct.trigger.as_deref().unwrap_or(""));
        match clusters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(instinct),
            None => clusters.push((key, vec![instinct])),
        }
    }

    let mut candidates: Vec<SkillCandidate> = clusters
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(trigger, members)| {
            let avg_confidence =
                members.iter().map(|i| i.confidence).sum::<f64>() / members.len() as f64;
            let mut domains: Vec<String> = members
                .iter()
                .map(|i| i.domain_or_general().to_string())
                .collect();
            domains.sort();
            domains.dedup();
            SkillCandidate {
                trigger,
                instinct_ids: members.iter().map(|i| i.id.clone()).collect(),
                avg_confidence,
                domains,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.instinct_ids
            .len()
            .cmp(&a.instinct_ids.len())
            .then(b.avg_confidence.total_cmp(&a.avg_confidence))
    });
    candidates
}

/// Evolve analysis; `None` when fewer than three instincts exist.
pub fn evolve_report(instincts: &[Instinct]) -> Option<String> {
    if instincts.len() < 3 {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "  EVOLVE ANALYSIS - {} instincts", instincts.len());
    let _ = writeln!(out, "{}\n", RULE);

    let high = instincts.iter().filter(|i| i.confidence >= 0.8).count();
    let _ = writeln!(out, "High confidence instincts (>=80%): {}", high);

    let candidates = skill_candidates(instincts);
    let _ = writeln!(out, "\nPotential skill clusters found: {}", candidates.len());

    if !candidates.is_empty() {
        let _ = writeln!(out, "\n## SKILL CANDIDATES\n");
        for (idx, candidate) in candidates.iter().take(5).enumerate() {
            let _ = writeln!(out, "{}. Cluster: \"{}\"", idx + 1, candidate.trigger);
            let _ = writeln!(
                out,
                "   Instincts: {}, Avg confidence: {}%",
                candidate.instinct_ids.len(),
                (candidate.avg_confidence * 100.0).round() as i64
            );
            for id in candidate.instinct_ids.iter().take(3) {
                let _ = writeln!(out, "     - {}", id);
            }
            out.push('\n');
        }
    }

    let _ = writeln!(out, "\n{}", RULE);
    Some(out)
}
