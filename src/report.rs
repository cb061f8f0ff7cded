use crate::errors::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_schema: Option<String>,
    pub scan_info: Option<ScanInfo>,
    pub project_info: Option<ProjectInfo>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInfo {
    pub engine_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: Option<String>,
    pub report_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// `name:version` for package manager dependencies, a plain file name otherwise
    pub file_name: String,
    pub file_path: Option<String>,
    pub vulnerabilities: Option<Vec<Vulnerability>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub source: Option<String>,
    pub name: Option<String>,
    pub severity: String,
    pub cvssv2: Option<CvssV2>,
    pub cvssv3: Option<CvssV3>,
    pub references: Option<Vec<Reference>>,
    pub vulnerable_software: Option<Vec<VulnerableSoftware>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV2 {
    pub score: f64,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV3 {
    pub base_score: f64,
    pub base_severity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reference {
    pub source: Option<String>,
    pub url: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VulnerableSoftware {
    pub software: Software,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Software {
    pub id: String,
}

impl Report {
    /// Validate a whole document, there is no partial result
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let report = serde_path_to_error::deserialize(&mut de)
            .map_err(|err| anyhow!("Report doesn't match the expected schema: {}", err))?;
        de.end().context("Trailing data after report document")?;
        Ok(report)
    }
}

#[derive(Debug)]
pub enum ReportStatus {
    Missing,
    Invalid(String),
    Loaded(Report),
}

impl ReportStatus {
    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportStatus::Loaded(report) => Some(report),
            _ => None,
        }
    }
}

pub fn load(path: &Path) -> ReportStatus {
    if !path.exists() {
        error!("Can't resolve the json report in the path location: {:?}", path);
        return ReportStatus::Missing;
    }

    let result = fs::read(path)
        .with_context(|| anyhow!("Failed to read report {:?}", path))
        .and_then(|bytes| Report::from_slice(&bytes));

    match result {
        Ok(report) => {
            debug!(
                "Loaded report with {} dependencies (schema={:?})",
                report.dependencies.len(),
                report.report_schema
            );
            ReportStatus::Loaded(report)
        }
        Err(err) => {
            error!("Failed to parse report {:?}: {:#}", path, err);
            ReportStatus::Invalid(format!("{:#}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_report() -> Result<()> {
        let report = Report::from_slice(
            br#"{
                "reportSchema": "1.1",
                "projectInfo": {"name": "shop", "reportDate": "2024-05-01T10:00:00Z"},
                "dependencies": [
                    {"fileName": "commons-io-2.6.jar"},
                    {
                        "fileName": "lodash:4.17.15",
                        "filePath": "/app/package-lock.json?lodash",
                        "vulnerabilities": [{
                            "source": "NPM",
                            "name": "CVE-2020-8203",
                            "severity": "HIGH",
                            "cvssv2": {"score": 5.8, "severity": "MEDIUM"},
                            "cvssv3": {"baseScore": 7.4, "baseSeverity": "HIGH"},
                            "references": [
                                {"source": "NPM", "url": "https://github.com/lodash/lodash/issues/4744"},
                                {"source": "NPM", "url": "https://github.com/advisories/GHSA-p6mc-m468-83gw", "name": "GHSA"}
                            ],
                            "vulnerableSoftware": [{"software": {"id": "cpe:2.3:a:lodash:lodash:*:*:*:*:*:*:*:*"}}],
                            "unknownExtraField": true
                        }]
                    }
                ]
            }"#,
        )?;
        assert_eq!(report.dependencies.len(), 2);
        assert!(report.dependencies[0].vulnerabilities.is_none());
        let vuln = &report.dependencies[1].vulnerabilities.as_ref().unwrap()[0];
        assert_eq!(vuln.name.as_deref(), Some("CVE-2020-8203"));
        assert_eq!(vuln.cvssv3.as_ref().map(|c| c.base_score), Some(7.4));
        assert_eq!(vuln.references.as_ref().map(Vec::len), Some(2));
        Ok(())
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = Report::from_slice(
            br#"{"dependencies": [{"fileName": "a:1", "vulnerabilities": [{"name": "CVE-1"}]}]}"#,
        )
        .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("severity"), "{}", msg);
        assert!(msg.contains("dependencies[0].vulnerabilities[0]"), "{}", msg);
    }

    #[test]
    fn test_wrong_type_fails() {
        let err = Report::from_slice(
            br#"{"dependencies": [{"fileName": "a:1", "vulnerabilities": [{"severity": "LOW", "cvssv3": {"baseScore": "high"}}]}]}"#,
        );
        assert!(err.is_err());
        assert!(Report::from_slice(br#"{"scanInfo": {}}"#).is_err());
        assert!(Report::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_load_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let status = load(&dir.path().join("dependency-check-report.json"));
        assert!(matches!(status, ReportStatus::Missing));
        Ok(())
    }

    #[test]
    fn test_load_invalid_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dependency-check-report.json");
        fs::write(&path, r#"{"dependencies": "nope"}"#)?;
        let status = load(&path);
        assert!(matches!(status, ReportStatus::Invalid(_)));
        assert!(status.report().is_none());
        Ok(())
    }

    #[test]
    fn test_load_valid_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dependency-check-report.json");
        fs::write(&path, r#"{"dependencies": []}"#)?;
        let status = load(&path);
        assert!(status.report().is_some());
        Ok(())
    }
}
