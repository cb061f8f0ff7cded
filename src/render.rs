//! Turns the outcome of a scan into a Discord embed.

use crate::discord::{
    truncate, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedThumbnail, WebhookMessage,
    MAX_DESCRIPTION_LEN, MAX_FIELDS, MAX_TITLE_LEN,
};
use crate::errors::*;
use crate::report::ReportStatus;
use crate::settings::Settings;
use crate::severity::SeverityCounts;
use crate::transform::{CvssScore, DataPack, Vulnerability};

pub const COLOUR_OK: u32 = 0x2ECC71;
pub const COLOUR_ISSUE: u32 = 0xE1A32A;
pub const COLOUR_VULNERABLE: u32 = 0xE74C3C;

const AUTHOR: &str = "OWASP Dependency-Check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Clean,
    VulnerabilitiesFound,
    ReportMissing,
    ParseFailed,
}

impl RunState {
    pub fn derive(status: &ReportStatus, pack: Option<&DataPack>) -> Self {
        match (status, pack) {
            (ReportStatus::Missing, _) => RunState::ReportMissing,
            (_, None) => RunState::ParseFailed,
            (_, Some(pack)) if pack.has_vulnerabilities() => RunState::VulnerabilitiesFound,
            (_, Some(_)) => RunState::Clean,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            RunState::Clean => "✅ No vulnerabilities detected",
            RunState::VulnerabilitiesFound => "🚨 Vulnerabilities detected",
            RunState::ReportMissing => "⚠️ Dependency-Check report missing",
            RunState::ParseFailed => "⚠️ Dependency-Check parser failed",
        }
    }

    pub fn colour(&self) -> u32 {
        match self {
            RunState::Clean => COLOUR_OK,
            RunState::VulnerabilitiesFound => COLOUR_VULNERABLE,
            RunState::ReportMissing | RunState::ParseFailed => COLOUR_ISSUE,
        }
    }

    pub fn is_issue(&self) -> bool {
        matches!(self, RunState::ReportMissing | RunState::ParseFailed)
    }
}

pub fn severity_label(severity: &str) -> &'static str {
    match severity.to_lowercase().as_str() {
        "low" => "🟢 LOW",
        "medium" => "🟡 MEDIUM",
        "moderate" => "🟠 MODERATE",
        "high" => "🔴 HIGH",
        "critical" => "🟣 CRITICAL",
        _ => "⚪ N/A",
    }
}

pub fn format_cvss3(score: CvssScore) -> String {
    match score {
        CvssScore::Score(score) => format!("{:.1}", score),
        CvssScore::Unknown => "n/a".to_string(),
    }
}

pub fn title(settings: &Settings, state: RunState) -> String {
    let suffix = match (settings.context(), settings.branch()) {
        (Some(context), Some(branch)) => format!(" ({} @ {})", context, branch),
        (Some(context), None) => format!(" ({})", context),
        (None, Some(branch)) => format!(" ({})", branch),
        (None, None) => String::new(),
    };
    format!("{}{}", state.prefix(), suffix)
}

pub struct Renderer<'a> {
    settings: &'a Settings,
}

impl<'a> Renderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Renderer { settings }
    }

    /// `flagged` are the vulnerabilities at or above the configured threshold
    pub fn render(
        &self,
        state: RunState,
        status: &ReportStatus,
        pack: Option<&DataPack>,
        flagged: &[&Vulnerability],
    ) -> WebhookMessage {
        let description = self.description(state, status, pack, flagged);

        let mut fields = Vec::new();
        if let (RunState::VulnerabilitiesFound, Some(pack)) = (state, pack) {
            if self.settings.notify_mode.shows_summary() {
                fields.push(self.counts_field(flagged));
                let reserved = fields.len() + usize::from(self.links_field().is_some());
                let cap = self
                    .settings
                    .max_items
                    .min(MAX_FIELDS.saturating_sub(reserved));
                if cap < flagged.len() {
                    debug!(
                        "Listing {} of {} vulnerabilities in {} dependencies",
                        cap,
                        flagged.len(),
                        pack.dependencies()
                    );
                }
                fields.extend(flagged.iter().take(cap).map(|v| vulnerability_field(v)));
            }
        }
        if let Some(links) = self.links_field() {
            fields.push(links);
        }

        let embed = Embed {
            title: truncate(&title(self.settings, state), MAX_TITLE_LEN),
            description: truncate(&description, MAX_DESCRIPTION_LEN),
            url: self.primary_link(),
            color: state.colour(),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            author: Some(EmbedAuthor {
                name: AUTHOR.to_string(),
                url: self.settings.links.repo.clone(),
                icon_url: self.settings.icon_url.clone(),
            }),
            footer: Some(self.footer(pack)),
            thumbnail: self
                .settings
                .icon_url
                .as_ref()
                .map(|url| EmbedThumbnail { url: url.clone() }),
            fields,
        };

        WebhookMessage {
            embeds: vec![embed],
        }
    }

    fn description(
        &self,
        state: RunState,
        status: &ReportStatus,
        pack: Option<&DataPack>,
        flagged: &[&Vulnerability],
    ) -> String {
        let path = self.settings.report_json.display();
        match (state, status, pack) {
            (RunState::ReportMissing, _, _) => {
                format!("Can't resolve the json report at `{}`.", path)
            }
            (RunState::ParseFailed, ReportStatus::Invalid(err), _) => {
                format!("The json report at `{}` could not be parsed:\n```\n{}\n```", path, err)
            }
            (RunState::ParseFailed, _, _) => {
                format!("The json report at `{}` could not be parsed.", path)
            }
            (RunState::VulnerabilitiesFound, _, Some(pack)) => format!(
                "Found **{}** vulnerabilities in **{}** scanned dependencies, **{}** rated {} or above.",
                pack.vulnerabilities().len(),
                pack.dependencies(),
                flagged.len(),
                self.settings.min_severity
            ),
            (_, _, Some(pack)) => format!(
                "No critical or high severity vulnerabilities in **{}** scanned dependencies.",
                pack.dependencies()
            ),
            (_, _, None) => String::new(),
        }
    }

    fn counts_field(&self, flagged: &[&Vulnerability]) -> EmbedField {
        let counts = SeverityCounts::tally(flagged.iter().map(|v| &v.severity));
        let value = counts
            .iter()
            .map(|(key, count)| {
                let label = severity_label(key);
                if label == severity_label("") {
                    format!("⚪ {}: {}", key, count)
                } else {
                    format!("{}: {}", label, count)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        EmbedField::new(
            &format!("Severity counts (≥ {})", self.settings.min_severity),
            &value,
            false,
        )
    }

    fn links_field(&self) -> Option<EmbedField> {
        if !self.settings.notify_mode.shows_links() {
            return None;
        }
        let links = self
            .settings
            .buttons
            .iter()
            .filter_map(|button| {
                self.settings
                    .links
                    .get(*button)
                    .map(|url| format!("[{}]({})", button.label(), url))
            })
            .collect::<Vec<_>>();
        if links.is_empty() {
            None
        } else {
            Some(EmbedField::new("Links", &links.join(" · "), false))
        }
    }

    fn primary_link(&self) -> Option<String> {
        let links = &self.settings.links;
        links
            .html
            .as_ref()
            .or(links.pipeline.as_ref())
            .or(links.repo.as_ref())
            .cloned()
    }

    fn footer(&self, pack: Option<&DataPack>) -> EmbedFooter {
        let mut parts = Vec::new();
        if let Some(project) = pack.and_then(|p| p.project()) {
            parts.push(project.to_string());
        }
        if let Some(id) = &self.settings.ci.pipeline_id {
            parts.push(format!("Pipeline #{}", id));
        }
        if parts.is_empty() {
            parts.push(AUTHOR.to_string());
        }
        EmbedFooter {
            text: parts.join(" · "),
            icon_url: self.settings.icon_url.clone(),
        }
    }
}

fn vulnerability_field(vuln: &Vulnerability) -> EmbedField {
    let name = format!(
        "{} {} {}",
        severity_label(vuln.severity.as_str()),
        vuln.dependency,
        vuln.version
    );

    let ids = vuln.identifiers.join(", ");
    let link = match (ids.is_empty(), vuln.reference.is_empty()) {
        (false, false) => format!("[{}]({})", ids, vuln.reference),
        (true, false) => vuln.reference.clone(),
        _ => ids,
    };

    let mut value = format!(
        "CVSSv2: {} · CVSSv3: {}",
        vuln.cvssv2,
        format_cvss3(vuln.cvssv3)
    );
    if !link.is_empty() {
        value.push('\n');
        value.push_str(&link);
    }

    EmbedField::new(&name, &value, false)
}
