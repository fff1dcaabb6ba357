//! Status vocabulary shared by every probe.
//!
//! Levels form the scale `Healthy < Warning < Unhealthy`. `Error` is not on
//! that scale: it means a probe could not finish its assessment, and it is
//! always reported as such rather than folded into `Unhealthy`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict for one entity, subsystem or probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StatusLevel {
    #[default]
    Healthy,
    Warning,
    Unhealthy,
    /// The assessment itself failed.
    Error,
}

impl StatusLevel {
    /// Position on the severity scale, `None` for `Error`.
    #[must_use]
    pub fn severity(self) -> Option<u8> {
        match self {
            Self::Healthy => Some(0),
            Self::Warning => Some(1),
            Self::Unhealthy => Some(2),
            Self::Error => None,
        }
    }

    /// Combine two levels: `Error` wins over everything, otherwise the more
    /// severe level is kept.
    #[must_use]
    pub fn escalate(self, other: Self) -> Self {
        match (self.severity(), other.severity()) {
            (None, _) | (_, None) => Self::Error,
            (Some(current), Some(next)) if next > current => other,
            _ => self,
        }
    }

    /// Whether this level should fail a run (Unhealthy or Error).
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Unhealthy | Self::Error)
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Warning => write!(f, "Warning"),
            Self::Unhealthy => write!(f, "Unhealthy"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Verdict for a single node, pod or operator.
///
/// `level` only ever moves up as issues and warnings are recorded, so it is
/// always the most severe level implied by what has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub level: StatusLevel,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl EntityStatus {
    /// A healthy entity with nothing recorded yet.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            level: StatusLevel::Healthy,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Stand-in entity that makes an empty result visible in the report.
    pub fn placeholder(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut status = Self::healthy(name);
        status.issue(StatusLevel::Warning, message);
        status
    }

    /// Entity for an assessment that could not be completed.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut status = Self::healthy(name);
        status.issue(StatusLevel::Error, message);
        status
    }

    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Record an issue and raise the level to at least `level`.
    pub fn issue(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.level = self.level.escalate(level);
        self.issues.push(message.into());
    }

    /// Record a warning and raise the level to at least `Warning`.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.level = self.level.escalate(StatusLevel::Warning);
        self.warnings.push(message.into());
    }
}

/// Single verdict for a whole subsystem (etcd, certificates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemStatus {
    pub level: StatusLevel,
    /// One-line description shown when there is nothing else to say.
    pub summary: String,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl SubsystemStatus {
    pub fn healthy(summary: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Healthy,
            summary: summary.into(),
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a status from a list of findings, all at `level`.
    pub fn with_issues(level: StatusLevel, summary: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            level,
            summary: summary.into(),
            issues,
            warnings: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_issues(StatusLevel::Error, message.clone(), vec![message])
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.level = self.level.escalate(StatusLevel::Warning);
        self.warnings.push(message.into());
    }
}
