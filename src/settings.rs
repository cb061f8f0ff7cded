use crate::args::Args;
use crate::errors::*;
use crate::severity::Severity;
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, EnumVariantNames, IntoEnumIterator, VariantNames};

pub const DEFAULT_ARTIFACT_JOB: &str = "dependency_check";
pub const DEFAULT_REPORT_JSON: &str = "dependency-check-report.json";
pub const DEFAULT_REPORT_HTML: &str = "dependency-check-report.html";
pub const DEFAULT_MAX_ITEMS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotifyMode {
    /// Only the links to the report and the pipeline
    Link,
    /// Severity counts and the list of vulnerabilities
    Summary,
    Both,
    /// Title and description only
    Plain,
}

impl NotifyMode {
    pub fn shows_summary(&self) -> bool {
        matches!(self, NotifyMode::Summary | NotifyMode::Both)
    }

    pub fn shows_links(&self) -> bool {
        matches!(self, NotifyMode::Link | NotifyMode::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Button {
    Html,
    Zip,
    Pipeline,
    Repo,
}

impl Button {
    pub fn label(&self) -> &'static str {
        match self {
            Button::Html => "HTML report",
            Button::Zip => "Artifacts (zip)",
            Button::Pipeline => "Pipeline",
            Button::Repo => "Repository",
        }
    }
}

/// GitLab CI metadata, empty values are normalized to `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub project_url: Option<String>,
    pub project_path: Option<String>,
    pub api_v4_url: Option<String>,
    pub project_id: Option<String>,
    pub pipeline_url: Option<String>,
    pub pipeline_id: Option<String>,
    pub commit_ref_name: Option<String>,
    pub repository_url: Option<String>,
    pub artifact_job_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub html: Option<String>,
    pub zip: Option<String>,
    pub pipeline: Option<String>,
    pub repo: Option<String>,
}

impl Links {
    pub fn derive(ci: &CiContext, report_html_name: &str) -> Self {
        let job = &ci.artifact_job_name;

        let html = match (&ci.project_url, &ci.commit_ref_name) {
            (Some(project_url), Some(git_ref)) => Some(format!(
                "{}/-/jobs/artifacts/{}/file/{}?job={}",
                project_url, git_ref, report_html_name, job
            )),
            _ => None,
        };

        let zip = match (&ci.api_v4_url, &ci.project_id, &ci.commit_ref_name) {
            (Some(api), Some(id), Some(git_ref)) => Some(format!(
                "{}/projects/{}/jobs/artifacts/{}/download?job={}",
                api, id, git_ref, job
            )),
            _ => None,
        };

        let pipeline = ci.pipeline_url.clone().or_else(|| {
            match (&ci.project_url, &ci.pipeline_id) {
                (Some(project_url), Some(id)) => {
                    Some(format!("{}/-/pipelines/{}", project_url, id))
                }
                _ => None,
            }
        });

        let repo = ci
            .project_url
            .clone()
            .or_else(|| ci.repository_url.as_deref().map(strip_credentials));

        Links {
            html,
            zip,
            pipeline,
            repo,
        }
    }

    pub fn get(&self, button: Button) -> Option<&str> {
        match button {
            Button::Html => self.html.as_deref(),
            Button::Zip => self.zip.as_deref(),
            Button::Pipeline => self.pipeline.as_deref(),
            Button::Repo => self.repo.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub verbose: u8,
    pub quiet: bool,
    pub webhook_url: Option<String>,
    pub dry_run: bool,

    pub report_dir: Option<PathBuf>,
    pub report_json: PathBuf,
    pub report_html: PathBuf,

    pub min_severity: Severity,
    pub notify_mode: NotifyMode,
    pub attach_html: bool,
    pub notify_on_zero: bool,
    pub max_items: usize,
    pub project_label: Option<String>,
    pub fail_on_vuln: bool,
    pub icon_url: Option<String>,

    pub ci: CiContext,
    pub buttons: Vec<Button>,
    pub links: Links,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self> {
        let min_severity = non_empty(args.min_severity).or(non_empty(args.dc_min_severity));
        let min_severity = match min_severity {
            Some(value) => Severity::from_str(&value).map_err(|_| {
                anyhow!(
                    "Invalid MIN_SEVERITY {:?}, expected one of {:?}",
                    value,
                    Severity::VARIANTS
                )
            })?,
            None => Severity::Low,
        };
        let notify_mode = match non_empty(args.notify_mode) {
            Some(value) => NotifyMode::from_str(&value).map_err(|_| {
                anyhow!(
                    "Invalid DC_NOTIFY_MODE {:?}, expected one of {:?}",
                    value,
                    NotifyMode::VARIANTS
                )
            })?,
            None => NotifyMode::Both,
        };
        let buttons = match non_empty(args.buttons) {
            Some(value) => parse_buttons(&value)?,
            None => Button::iter().collect(),
        };
        let max_items = match non_empty(args.max_items) {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| anyhow!("Invalid DC_MAX_ITEMS {:?}, expected integer", value))?,
            None => DEFAULT_MAX_ITEMS,
        };

        let quiet = parse_bool("DC_QUIET", args.quiet)?;
        let attach_html = parse_bool(
            "ATTACH_HTML",
            non_empty(args.attach_html).or(non_empty(args.dc_attach_html)),
        )?;
        let notify_on_zero = parse_bool("DC_NOTIFY_ON_ZERO", args.notify_on_zero)?;
        let fail_on_vuln = parse_bool("DC_FAIL_ON_VULN", args.fail_on_vuln)?;

        let ci = CiContext {
            project_url: non_empty_url(args.ci_project_url),
            project_path: non_empty(args.ci_project_path),
            api_v4_url: non_empty_url(args.ci_api_v4_url),
            project_id: non_empty(args.ci_project_id),
            pipeline_url: non_empty(args.ci_pipeline_url),
            pipeline_id: non_empty(args.ci_pipeline_id),
            commit_ref_name: non_empty(args.ci_commit_ref_name),
            repository_url: non_empty(args.ci_repository_url),
            artifact_job_name: non_empty(args.artifact_job_name)
                .or(non_empty(args.dc_artifact_job_name))
                .unwrap_or_else(|| DEFAULT_ARTIFACT_JOB.to_string()),
        };

        let report_html_name =
            non_empty(args.report_html_name).unwrap_or_else(|| DEFAULT_REPORT_HTML.to_string());
        let links = Links::derive(&ci, &report_html_name);

        let report_dir = non_empty(args.report_dir).map(PathBuf::from);
        let mut report_json = PathBuf::from(
            non_empty(args.report_json_name).unwrap_or_else(|| DEFAULT_REPORT_JSON.to_string()),
        );
        let mut report_html = PathBuf::from(&report_html_name);
        if let Some(dir) = &report_dir {
            report_json = dir.join(report_json);
            report_html = dir.join(report_html);
        }

        Ok(Settings {
            verbose: args.verbose,
            quiet,
            webhook_url: non_empty(args.webhook_url),
            dry_run: args.dry_run,
            report_dir,
            report_json,
            report_html,
            min_severity,
            notify_mode,
            attach_html,
            notify_on_zero,
            max_items,
            project_label: non_empty(args.project_label),
            fail_on_vuln,
            icon_url: non_empty(args.icon_url),
            ci,
            buttons,
            links,
        })
    }

    /// Project label, falling back to the CI project path
    pub fn context(&self) -> Option<&str> {
        self.project_label
            .as_deref()
            .or(self.ci.project_path.as_deref())
    }

    pub fn branch(&self) -> Option<&str> {
        self.ci.commit_ref_name.as_deref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty_url(value: Option<String>) -> Option<String> {
    non_empty(value)
        .map(|v| v.trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

/// Unset or empty means false
fn parse_bool(name: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = non_empty(value) else {
        return Ok(false);
    };
    match value.to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => bail!("Invalid {} {:?}, expected a boolean", name, value),
    }
}

fn parse_buttons(value: &str) -> Result<Vec<Button>> {
    let mut buttons = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let button = Button::from_str(name).map_err(|_| {
            anyhow!(
                "Invalid DC_BUTTONS entry {:?}, expected one of {:?}",
                name,
                Button::VARIANTS
            )
        })?;
        if !buttons.contains(&button) {
            buttons.push(button);
        }
    }
    Ok(buttons)
}

/// CI_REPOSITORY_URL carries a job token in its userinfo
fn strip_credentials(url: &str) -> String {
    if let Some((scheme, rest)) = url.split_once("://") {
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        if let Some((_, host)) = authority.rsplit_once('@') {
            return format!("{}://{}{}", scheme, host, path);
        }
    }
    url.to_string()
}

#[cfg(test)]
pub(crate) fn fixture(report_dir: &std::path::Path) -> Settings {
    Settings {
        verbose: 0,
        quiet: false,
        webhook_url: Some("https://discord.com/api/webhooks/1/token".to_string()),
        dry_run: false,
        report_dir: Some(report_dir.to_path_buf()),
        report_json: report_dir.join(DEFAULT_REPORT_JSON),
        report_html: report_dir.join(DEFAULT_REPORT_HTML),
        min_severity: Severity::Low,
        notify_mode: NotifyMode::Both,
        attach_html: false,
        notify_on_zero: false,
        max_items: DEFAULT_MAX_ITEMS,
        project_label: None,
        fail_on_vuln: false,
        icon_url: None,
        ci: CiContext {
            artifact_job_name: DEFAULT_ARTIFACT_JOB.to_string(),
            ..Default::default()
        },
        buttons: vec![Button::Html, Button::Zip, Button::Pipeline, Button::Repo],
        links: Links::default(),
    }
}
