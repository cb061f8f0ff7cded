use crate::report::{self, Report, ReportStatus};
use crate::severity::{ReportedSeverity, Severity, SeverityCounts};
use std::fmt;

pub const UNKNOWN: &str = "Unknown";

const REFERENCE_KEYWORDS: &[&str] = &["advisories", "vuln", "detail"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CvssScore {
    Score(f64),
    Unknown,
}

impl From<Option<f64>> for CvssScore {
    fn from(score: Option<f64>) -> Self {
        score.map(CvssScore::Score).unwrap_or(CvssScore::Unknown)
    }
}

impl fmt::Display for CvssScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CvssScore::Score(score) => write!(f, "{:.1}", score),
            CvssScore::Unknown => f.write_str(UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vulnerability {
    pub dependency: String,
    pub version: String,
    pub identifiers: Vec<String>,
    pub severity: ReportedSeverity,
    pub cvssv2: CvssScore,
    pub cvssv3: CvssScore,
    /// Empty if no reference qualifies
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPack {
    vulnerabilities: Vec<Vulnerability>,
    counts: SeverityCounts,
    dependencies: usize,
    project: Option<String>,
}

pub fn parse(status: &ReportStatus) -> Option<DataPack> {
    status.report().map(DataPack::from_report)
}

impl DataPack {
    pub fn from_report(report: &Report) -> Self {
        let mut vulnerabilities = Vec::new();

        for dependency in &report.dependencies {
            let Some(vulns) = &dependency.vulnerabilities else {
                continue;
            };
            let (name, version) = split_dependency(&dependency.file_name);

            for vuln in vulns {
                vulnerabilities.push(Vulnerability {
                    dependency: name.clone(),
                    version: version.clone(),
                    identifiers: identifiers(vuln),
                    severity: ReportedSeverity::parse(&vuln.severity),
                    cvssv2: vuln.cvssv2.as_ref().map(|c| c.score).into(),
                    cvssv3: vuln.cvssv3.as_ref().map(|c| c.base_score).into(),
                    reference: select_reference(vuln.references.as_deref().unwrap_or_default())
                        .to_string(),
                });
            }
        }

        let counts = SeverityCounts::tally(vulnerabilities.iter().map(|v| &v.severity));
        let project = report
            .project_info
            .as_ref()
            .and_then(|info| info.name.clone())
            .filter(|name| !name.trim().is_empty());

        DataPack {
            vulnerabilities,
            counts,
            dependencies: report.dependencies.len(),
            project,
        }
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        &self.vulnerabilities
    }

    pub fn counts(&self) -> &SeverityCounts {
        &self.counts
    }

    /// Number of scanned dependencies, including those without findings
    pub fn dependencies(&self) -> usize {
        self.dependencies
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// True if there is at least one critical or high finding
    pub fn has_vulnerabilities(&self) -> bool {
        self.counts.get(Severity::Critical) + self.counts.get(Severity::High) > 0
    }

    pub fn filter_by_min_severity(&self, threshold: Severity) -> Vec<&Vulnerability> {
        self.vulnerabilities
            .iter()
            .filter(|v| v.severity.rank() >= threshold.rank())
            .collect()
    }
}

pub fn split_dependency(file_name: &str) -> (String, String) {
    match file_name.split_once(':') {
        Some((name, version)) => (name.to_string(), version.to_string()),
        None => (file_name.to_string(), UNKNOWN.to_string()),
    }
}

/// The advisory name if there is one, otherwise all vulnerable software ids
fn identifiers(vuln: &report::Vulnerability) -> Vec<String> {
    if let Some(name) = &vuln.name {
        return vec![name.clone()];
    }

    vuln.vulnerable_software
        .iter()
        .flatten()
        .map(|vs| vs.software.id.clone())
        .collect()
}

pub fn select_reference(references: &[report::Reference]) -> &str {
    if references.len() < 2 {
        return "";
    }

    references
        .iter()
        .find(|r| REFERENCE_KEYWORDS.iter().any(|kw| r.url.contains(kw)))
        .map(|r| r.url.as_str())
        .unwrap_or("")
}
