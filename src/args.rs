use clap::{ArgAction, Parser};

/// Every option can also be set through its environment variable, a `.env`
/// file in the working directory is loaded first. Values are validated by
/// `Settings::from_args`, empty values count as unset.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Turn debugging information on
    #[arg(short, long, action(ArgAction::Count))]
    pub verbose: u8,
    /// Disable all log output
    #[arg(
        short,
        long,
        env = "DC_QUIET",
        value_name = "BOOL",
        num_args(0..=1),
        default_missing_value = "true"
    )]
    pub quiet: Option<String>,
    /// Print the webhook payload to stdout instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Discord webhook that receives the notification, nothing is sent without it
    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Directory containing the Dependency-Check reports
    #[arg(long, env = "REPORT_DIR", value_name = "PATH")]
    pub report_dir: Option<String>,
    /// [default: dependency-check-report.json]
    #[arg(long, env = "REPORT_JSON_NAME", value_name = "NAME")]
    pub report_json_name: Option<String>,
    /// [default: dependency-check-report.html]
    #[arg(long, env = "REPORT_HTML_NAME", value_name = "NAME")]
    pub report_html_name: Option<String>,

    /// Only list vulnerabilities at or above this severity (low, medium, high, critical)
    #[arg(long, env = "MIN_SEVERITY")]
    pub min_severity: Option<String>,
    #[arg(long, env = "DC_MIN_SEVERITY", hide = true)]
    pub dc_min_severity: Option<String>,

    /// Which parts of the summary to include (link, summary, both, plain) [default: both]
    #[arg(long, env = "DC_NOTIFY_MODE")]
    pub notify_mode: Option<String>,

    /// Attach the html report to the notification
    #[arg(
        long,
        env = "ATTACH_HTML",
        value_name = "BOOL",
        num_args(0..=1),
        default_missing_value = "true"
    )]
    pub attach_html: Option<String>,
    #[arg(long, env = "DC_ATTACH_HTML", hide = true)]
    pub dc_attach_html: Option<String>,

    /// Also notify if no critical or high vulnerabilities were found
    #[arg(
        long,
        env = "DC_NOTIFY_ON_ZERO",
        value_name = "BOOL",
        num_args(0..=1),
        default_missing_value = "true"
    )]
    pub notify_on_zero: Option<String>,

    /// Maximum number of vulnerabilities listed in the notification [default: 20]
    #[arg(long, env = "DC_MAX_ITEMS")]
    pub max_items: Option<String>,

    /// Label used in the title instead of the CI project path
    #[arg(long, env = "DC_PROJECT_LABEL")]
    pub project_label: Option<String>,

    /// Exit with code 3 if vulnerabilities at or above the threshold were found
    #[arg(
        long,
        env = "DC_FAIL_ON_VULN",
        value_name = "BOOL",
        num_args(0..=1),
        default_missing_value = "true"
    )]
    pub fail_on_vuln: Option<String>,

    /// Comma separated list of links to include [default: html,zip,pipeline,repo]
    #[arg(long, env = "DC_BUTTONS")]
    pub buttons: Option<String>,

    /// Icon used for the embed author and thumbnail
    #[arg(long, env = "DC_ICON_URL")]
    pub icon_url: Option<String>,

    #[arg(long, env = "CI_PROJECT_URL", hide = true)]
    pub ci_project_url: Option<String>,
    #[arg(long, env = "CI_PROJECT_PATH", hide = true)]
    pub ci_project_path: Option<String>,
    #[arg(long, env = "CI_API_V4_URL", hide = true)]
    pub ci_api_v4_url: Option<String>,
    #[arg(long, env = "CI_PROJECT_ID", hide = true)]
    pub ci_project_id: Option<String>,
    #[arg(long, env = "CI_PIPELINE_URL", hide = true)]
    pub ci_pipeline_url: Option<String>,
    #[arg(long, env = "CI_PIPELINE_ID", hide = true)]
    pub ci_pipeline_id: Option<String>,
    #[arg(long, env = "CI_COMMIT_REF_NAME", hide = true)]
    pub ci_commit_ref_name: Option<String>,
    #[arg(long, env = "CI_REPOSITORY_URL", hide = true)]
    pub ci_repository_url: Option<String>,

    /// CI job that publishes the report artifacts [default: dependency_check]
    #[arg(long, env = "ARTIFACT_JOB_NAME")]
    pub artifact_job_name: Option<String>,
    #[arg(long, env = "DC_ARTIFACT_JOB_NAME", hide = true)]
    pub dc_artifact_job_name: Option<String>,
}
