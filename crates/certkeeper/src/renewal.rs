//! Expiry-driven certificate renewal
//!
//! One run walks every site under the certificates root, in name order:
//!
//! 1. Read the deployed generation through the `latest_cert.crt` link
//! 2. Compare its expiry with the threshold
//! 3. If due, ask the CA client for a new generation at the next serial,
//!    reusing the site's CSR and validating through its webroot
//! 4. Promote the generation once all three files are present
//!
//! A failure ends that site's evaluation only. If any site was renewed,
//! the configured daemons are restarted once at the end of the batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use certkeeper_config::RenewalConfig;

use crate::certificate::{is_dns_name, Certificate};
use crate::daemons::DaemonCoordinator;
use crate::error::{CertError, StoreError, ToolError};
use crate::lock::RunLock;
use crate::report::{RenewalReport, SiteOutcome};
use crate::store::{CertificateStore, Generation, LinkState, SiteStore};
use crate::tools::{
    Certbot, CertificateIssuer, IssuanceRequest, ServiceManager, Systemctl, ToolRunner,
};

/// Whether a certificate expiring at `not_after` must be renewed at `now`.
///
/// Due once expired, or when at most `threshold_days` remain. The
/// comparison is exact: exactly `threshold_days` left is due, one second
/// more is not.
pub fn renewal_due(not_after: DateTime<Utc>, now: DateTime<Utc>, threshold_days: u32) -> bool {
    now >= not_after || not_after - now <= Duration::days(i64::from(threshold_days))
}

/// Runs renewal batches over a certificate store
pub struct RenewalScheduler {
    config: RenewalConfig,
    store: CertificateStore,
    issuer: Arc<dyn CertificateIssuer>,
    daemons: DaemonCoordinator,
    staging: bool,
}

impl RenewalScheduler {
    pub fn new(
        config: RenewalConfig,
        issuer: Arc<dyn CertificateIssuer>,
        services: Arc<dyn ServiceManager>,
    ) -> Self {
        Self {
            store: CertificateStore::new(&config.certs_root),
            config,
            issuer,
            daemons: DaemonCoordinator::new(services),
            staging: false,
        }
    }

    /// Scheduler backed by the configured `certbot` and `systemctl`
    pub fn with_system_tools(config: RenewalConfig) -> Self {
        let runner = ToolRunner::new(config.tool_timeout());
        let issuer = Arc::new(Certbot::new(config.certbot.clone(), runner.clone()));
        let services = Arc::new(Systemctl::new(config.systemctl.clone(), runner));
        Self::new(config, issuer, services)
    }

    /// Request certificates from the CA's staging environment
    pub fn with_staging(mut self, staging: bool) -> Self {
        self.staging = staging;
        self
    }

    /// Run one batch against the current time
    pub async fn run(&self) -> Result<RenewalReport, CertError> {
        self.run_at(Utc::now()).await
    }

    /// Run one batch with due dates evaluated at `now`.
    ///
    /// Returns an error only when the batch cannot start: the lock file or
    /// the certificates root is unusable. Per-site failures are recorded
    /// in the report.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RenewalReport, CertError> {
        let lock_path = self.config.lock_path();
        let Some(_lock) = RunLock::try_acquire(&lock_path)? else {
            info!(lock = %lock_path.display(), "Another renewal run is in progress, skipping");
            return Ok(RenewalReport::skipped(now));
        };

        let start = Instant::now();
        let sites = self.store.list_sites()?;
        info!(
            site_count = sites.len(),
            threshold_days = self.config.threshold,
            staging = self.staging,
            "Checking certificates for renewal"
        );

        let mut report = RenewalReport::new(now);
        for name in sites {
            let site = self.store.site(&name);
            let outcome = match self.check_site(&site, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(site = %name, error = %e, "Certificate renewal failed");
                    SiteOutcome::failed(&e)
                }
            };
            report.push(name, outcome);
        }

        if report.renewed() > 0 {
            report.daemons = self.daemons.restart_all(&self.config.daemons).await;
        } else {
            debug!("No certificate renewed, daemons left alone");
        }

        info!(
            sites = report.sites.len(),
            renewed = report.renewed(),
            failed = report.failed(),
            elapsed_ms = start.elapsed().as_millis(),
            "Renewal run complete"
        );
        Ok(report)
    }

    async fn check_site(
        &self,
        site: &SiteStore,
        now: DateTime<Utc>,
    ) -> Result<SiteOutcome, CertError> {
        match site.link_state() {
            LinkState::Absent => {
                info!(site = %site.name(), "Site has no issued certificate yet, skipping");
                return Ok(SiteOutcome::Unprovisioned);
            }
            LinkState::Partial => {
                return Err(
                    StoreError::corrupt(site.path(), "only some latest_* links exist").into(),
                );
            }
            LinkState::Present => {}
        }

        let current = site.current_serial()?;
        let cert = Certificate::from_file(&site.latest_cert())?;
        let remaining = cert.remaining(now);

        if !renewal_due(cert.not_after(), now, self.config.threshold) {
            debug!(
                site = %site.name(),
                serial = %current,
                not_after = %cert.not_after(),
                remaining_days = remaining.num_days(),
                "Certificate is still valid"
            );
            return Ok(SiteOutcome::NotDue {
                serial: current,
                not_after: cert.not_after(),
            });
        }

        info!(
            site = %site.name(),
            serial = %current,
            not_after = %cert.not_after(),
            remaining_days = remaining.num_days(),
            "Certificate needs renewal"
        );
        for cn in cert.common_names() {
            if !is_dns_name(cn) {
                warn!(
                    site = %site.name(),
                    common_name = %cn,
                    "CommonName is not a DNS name, requesting it anyway"
                );
            }
        }

        let generation = site.generation(site.next_serial()?);
        let webroot = self
            .config
            .www_root
            .join(site.owner()?)
            .join(site.name().as_str());

        let request = IssuanceRequest {
            domains: cert.fqdns().iter().cloned().collect(),
            csr: site.csr_path(),
            webroot,
            output: generation,
            email: self.config.admin_email.clone(),
            staging: self.staging,
            agree_tos: false,
        };
        let issued =
            issue_generation(self.issuer.as_ref(), &self.config.certbot, site, &request).await?;

        info!(
            site = %site.name(),
            previous = %current,
            serial = %request.output.serial,
            not_after = %issued.not_after(),
            "Certificate renewed"
        );
        Ok(SiteOutcome::Renewed {
            previous: current,
            serial: request.output.serial,
            not_after: issued.not_after(),
        })
    }
}

/// Request one generation and promote it.
///
/// Leftover files at the target serial are removed first. On any failure
/// the generation's files are removed again and the links stay as they
/// were. Returns the newly deployed certificate.
pub(crate) async fn issue_generation(
    issuer: &dyn CertificateIssuer,
    program: &str,
    site: &SiteStore,
    request: &IssuanceRequest,
) -> Result<Certificate, CertError> {
    let generation = &request.output;
    site.discard(generation)?;

    match request_generation(issuer, program, generation, request).await {
        Ok(cert) => {
            site.promote(generation)?;
            Ok(cert)
        }
        Err(e) => {
            if let Err(cleanup) = site.discard(generation) {
                warn!(
                    site = %site.name(),
                    serial = %generation.serial,
                    error = %cleanup,
                    "Failed to remove partial generation"
                );
            }
            Err(e)
        }
    }
}

async fn request_generation(
    issuer: &dyn CertificateIssuer,
    program: &str,
    generation: &Generation,
    request: &IssuanceRequest,
) -> Result<Certificate, CertError> {
    issuer.issue(request).await?;

    if let Some(missing) = generation.missing() {
        return Err(ToolError::MissingOutput {
            program: program.to_string(),
            path: PathBuf::from(missing),
        }
        .into());
    }
    Ok(Certificate::from_file(&generation.cert)?)
}
