use crate::discord::{Attachment, Notifier};
use crate::errors::*;
use crate::render::{Renderer, RunState};
use crate::report;
use crate::settings::Settings;
use crate::transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    /// Vulnerabilities at or above the configured threshold
    pub flagged: usize,
    pub delivered: bool,
}

pub const EXIT_OK: i32 = 0;
pub const EXIT_DELIVERY_ERROR: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_VULNERABLE: i32 = 3;

pub async fn run_notifier(
    settings: &Settings,
    notifier: Option<&dyn Notifier>,
) -> Result<RunSummary> {
    let status = report::load(&settings.report_json);
    let pack = transform::parse(&status);
    let state = RunState::derive(&status, pack.as_ref());

    let flagged = pack
        .as_ref()
        .map(|pack| pack.filter_by_min_severity(settings.min_severity))
        .unwrap_or_default();

    if let Some(pack) = &pack {
        let counts = pack
            .counts()
            .iter()
            .map(|(key, count)| format!("{}={}", key, count))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "Found {} vulnerabilities in {} dependencies ({}), {} at or above {}",
            pack.vulnerabilities().len(),
            pack.dependencies(),
            counts,
            flagged.len(),
            settings.min_severity
        );
    }

    let mut summary = RunSummary {
        state,
        flagged: flagged.len(),
        delivered: false,
    };

    let Some(notifier) = notifier else {
        warn!("No webhook configured, skipping notification");
        return Ok(summary);
    };

    if state == RunState::Clean && !settings.notify_on_zero {
        info!("No critical or high vulnerabilities, skipping notification");
        return Ok(summary);
    }

    let message = Renderer::new(settings).render(state, &status, pack.as_ref(), &flagged);

    let attachment = if settings.attach_html && !state.is_issue() {
        html_attachment(settings).await
    } else {
        None
    };

    notifier.notify(&message, attachment.as_ref()).await?;
    info!("Notification sent.");
    summary.delivered = true;

    Ok(summary)
}

/// Skipped notifications and degraded reports still exit with 0
pub fn exit_code(settings: &Settings, result: &Result<RunSummary>) -> i32 {
    match result {
        Ok(summary) if settings.fail_on_vuln && summary.flagged > 0 => {
            warn!(
                "Failing because {} vulnerabilities are rated {} or above",
                summary.flagged, settings.min_severity
            );
            EXIT_VULNERABLE
        }
        Ok(_) => EXIT_OK,
        Err(err) => {
            error!("Failed to send notification: {:#}", err);
            EXIT_DELIVERY_ERROR
        }
    }
}

async fn html_attachment(settings: &Settings) -> Option<Attachment> {
    let path = &settings.report_html;
    let filename = path.file_name()?.to_string_lossy().into_owned();

    match tokio::fs::read(path).await {
        Ok(data) => Some(Attachment {
            filename,
            content_type: "text/html",
            data,
        }),
        Err(err) => {
            warn!("Not attaching html report {:?}: {:#}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::WebhookMessage;
    use crate::render::{COLOUR_ISSUE, COLOUR_VULNERABLE};
    use crate::settings;
    use crate::severity::Severity;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(WebhookMessage, Option<Attachment>)>>,
    }

    impl Recorder {
        fn sent(&self) -> Vec<(WebhookMessage, Option<Attachment>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(
            &self,
            message: &WebhookMessage,
            attachment: Option<&Attachment>,
        ) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((message.clone(), attachment.cloned()));
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Notifier for Unreachable {
        async fn notify(&self, _: &WebhookMessage, _: Option<&Attachment>) -> Result<()> {
            bail!("Connection refused")
        }
    }

    const CRITICAL_AND_LOW: &str = r#"{"dependencies": [
        {"fileName": "log4j-core:2.14.1", "vulnerabilities": [
            {"name": "CVE-2021-44228", "severity": "CRITICAL", "cvssv3": {"baseScore": 10.0}}
        ]},
        {"fileName": "commons-io:2.6", "vulnerabilities": [
            {"name": "CVE-2021-29425", "severity": "LOW"}
        ]}
    ]}"#;

    const ONLY_LOW: &str = r#"{"dependencies": [
        {"fileName": "commons-io:2.6", "vulnerabilities": [
            {"name": "CVE-2021-29425", "severity": "LOW"}
        ]}
    ]}"#;

    #[tokio::test]
    async fn test_report_missing_sends_one_notification() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings::fixture(dir.path());
        let recorder = Recorder::default();

        let summary = run_notifier(&settings, Some(&recorder)).await?;
        assert_eq!(summary.state, RunState::ReportMissing);
        assert!(summary.delivered);

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        let embed = &sent[0].0.embeds[0];
        assert!(embed.title.contains("report missing"));
        assert_eq!(embed.color, COLOUR_ISSUE);
        assert!(embed.fields.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_report_sends_issue() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, r#"{"dependencies": [{"vulnerabilities": []}]}"#)?;
        let recorder = Recorder::default();

        let summary = run_notifier(&settings, Some(&recorder)).await?;
        assert_eq!(summary.state, RunState::ParseFailed);
        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.embeds[0].description.contains("fileName"));
        Ok(())
    }

    #[tokio::test]
    async fn test_vulnerabilities_above_threshold() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        settings.min_severity = Severity::High;
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;
        let recorder = Recorder::default();

        let summary = run_notifier(&settings, Some(&recorder)).await?;
        assert_eq!(
            summary,
            RunSummary {
                state: RunState::VulnerabilitiesFound,
                flagged: 1,
                delivered: true,
            }
        );

        let sent = recorder.sent();
        let embed = &sent[0].0.embeds[0];
        assert_eq!(embed.color, COLOUR_VULNERABLE);
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields[0].value.contains("CRITICAL: 1"));
        assert!(embed.fields[0].value.contains("LOW: 0"));
        assert!(embed.fields[1].value.contains("CVE-2021-44228"));
        assert!(sent[0].1.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_report_is_skipped_unless_requested() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, ONLY_LOW)?;

        let recorder = Recorder::default();
        let summary = run_notifier(&settings, Some(&recorder)).await?;
        assert_eq!(summary.state, RunState::Clean);
        assert!(!summary.delivered);
        assert!(recorder.sent().is_empty());

        settings.notify_on_zero = true;
        let summary = run_notifier(&settings, Some(&recorder)).await?;
        assert!(summary.delivered);
        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.embeds[0].title.starts_with("✅"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_webhook_configured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;

        let summary = run_notifier(&settings, None).await?;
        assert_eq!(summary.state, RunState::VulnerabilitiesFound);
        assert_eq!(summary.flagged, 2);
        assert!(!summary.delivered);
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_html_report() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        settings.attach_html = true;
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;
        fs::write(&settings.report_html, "<html></html>")?;
        let recorder = Recorder::default();

        run_notifier(&settings, Some(&recorder)).await?;
        let sent = recorder.sent();
        let attachment = sent[0].1.as_ref().expect("attachment");
        assert_eq!(attachment.filename, "dependency-check-report.html");
        assert_eq!(attachment.data, b"<html></html>");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_html_is_not_attached() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        settings.attach_html = true;
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;
        let recorder = Recorder::default();

        run_notifier(&settings, Some(&recorder)).await?;
        assert!(recorder.sent()[0].1.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delivery_error_is_returned() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;

        let err = run_notifier(&settings, Some(&Unreachable)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Connection refused"));
        Ok(())
    }

    #[tokio::test]
    async fn test_exit_code_ok_for_skipped_and_degraded_runs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        settings.fail_on_vuln = true;
        let recorder = Recorder::default();

        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_OK);

        fs::write(&settings.report_json, "{")?;
        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_OK);

        settings.min_severity = Severity::High;
        fs::write(&settings.report_json, ONLY_LOW)?;
        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_OK);
        assert_eq!(recorder.sent().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_exit_code_for_delivery_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;

        let result = run_notifier(&settings, Some(&Unreachable)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_DELIVERY_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn test_exit_code_fail_on_vuln() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = settings::fixture(dir.path());
        fs::write(&settings.report_json, CRITICAL_AND_LOW)?;
        let recorder = Recorder::default();

        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_OK);

        settings.fail_on_vuln = true;
        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_VULNERABLE);

        // the gate does not depend on delivery
        let result = run_notifier(&settings, None).await;
        assert_eq!(exit_code(&settings, &result), EXIT_VULNERABLE);

        settings.min_severity = Severity::Critical;
        fs::write(&settings.report_json, ONLY_LOW)?;
        let result = run_notifier(&settings, Some(&recorder)).await;
        assert_eq!(exit_code(&settings, &result), EXIT_OK);
        Ok(())
    }
}
