//! Machine-readable summary of a renewal run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use certkeeper_common::{Serial, SiteName};

use crate::daemons::DaemonOutcome;
use crate::error::{exit, CertError, ErrorKind};

/// What happened to one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SiteOutcome {
    /// Expiry is further away than the threshold
    NotDue {
        serial: Serial,
        not_after: DateTime<Utc>,
    },
    /// A new generation was issued and promoted
    Renewed {
        previous: Serial,
        serial: Serial,
        not_after: DateTime<Utc>,
    },
    /// Evaluation or issuance failed; links are untouched
    Failed { kind: ErrorKind, message: String },
    /// No `latest_*` links yet
    Unprovisioned,
}

impl SiteOutcome {
    pub fn failed(error: &CertError) -> Self {
        SiteOutcome::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub site: SiteName,
    #[serde(flatten)]
    pub outcome: SiteOutcome,
}

/// Result of one `renew` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalReport {
    /// Clock value the due dates were evaluated against
    pub evaluated_at: DateTime<Utc>,
    /// Another run held the lock; no site was looked at
    pub skipped: bool,
    pub sites: Vec<SiteReport>,
    /// Empty unless at least one site was renewed
    pub daemons: Vec<DaemonOutcome>,
}

impl RenewalReport {
    pub fn new(evaluated_at: DateTime<Utc>) -> Self {
        Self {
            evaluated_at,
            skipped: false,
            sites: Vec::new(),
            daemons: Vec::new(),
        }
    }

    /// Report of a run that found the lock taken
    pub fn skipped(evaluated_at: DateTime<Utc>) -> Self {
        Self {
            skipped: true,
            ..Self::new(evaluated_at)
        }
    }

    pub fn push(&mut self, site: SiteName, outcome: SiteOutcome) {
        self.sites.push(SiteReport { site, outcome });
    }

    pub fn renewed(&self) -> usize {
        self.count(|o| matches!(o, SiteOutcome::Renewed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SiteOutcome::Failed { .. }))
    }

    /// Outcome recorded for a site
    pub fn outcome(&self, site: &str) -> Option<&SiteOutcome> {
        self.sites
            .iter()
            .find(|r| r.site.as_str() == site)
            .map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&SiteOutcome) -> bool) -> usize {
        self.sites.iter().filter(|r| predicate(&r.outcome)).count()
    }

    /// 3 if any site failed, 0 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.failed() > 0 {
            exit::RENEWAL_FAILED
        } else {
            exit::SUCCESS
        }
    }
}
