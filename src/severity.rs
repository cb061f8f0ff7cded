use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, EnumVariantNames, IntoEnumIterator, IntoStaticStr};

/// The fixed severity vocabulary, ordered from least to most severe
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
    EnumVariantNames,
    IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn rank(&self) -> i8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }

    pub fn as_upper(&self) -> &'static str {
        self.into()
    }

    pub fn as_lower(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Severity as written in a report, either one of the known levels or whatever
/// else the scanner emitted (eg. `moderate`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportedSeverity {
    Known(Severity),
    Unrecognized(String),
}

impl ReportedSeverity {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        match Severity::from_str(&lower) {
            Ok(severity) => ReportedSeverity::Known(severity),
            Err(_) => ReportedSeverity::Unrecognized(lower),
        }
    }

    /// Unrecognized severities rank below `LOW`
    pub fn rank(&self) -> i8 {
        match self {
            ReportedSeverity::Known(severity) => severity.rank(),
            ReportedSeverity::Unrecognized(_) => -1,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReportedSeverity::Known(severity) => severity.as_lower(),
            ReportedSeverity::Unrecognized(raw) => raw,
        }
    }

    /// Key used in [`SeverityCounts`]
    fn count_key(&self) -> &str {
        match self {
            ReportedSeverity::Known(severity) => severity.as_upper(),
            ReportedSeverity::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ReportedSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occurrences per severity, always listing the four known levels first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityCounts {
    counts: Vec<(String, usize)>,
}

impl Default for SeverityCounts {
    fn default() -> Self {
        let counts = Severity::iter()
            .map(|severity| (severity.as_upper().to_string(), 0))
            .collect();
        Self { counts }
    }
}

impl SeverityCounts {
    pub fn tally<'a, I>(severities: I) -> Self
    where
        I: IntoIterator<Item = &'a ReportedSeverity>,
    {
        let mut counts = Self::default();
        for severity in severities {
            counts.increment(severity);
        }
        counts
    }

    fn increment(&mut self, severity: &ReportedSeverity) {
        let key = severity.count_key();
        if let Some((_, count)) = self.counts.iter_mut().find(|(k, _)| k == key) {
            *count += 1;
        } else {
            self.counts.push((key.to_string(), 1));
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.get_key(severity.as_upper())
    }

    pub fn get_key(&self, key: &str) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, count)| (k.as_str(), *count))
    }
}
