//! First-time site provisioning
//!
//! Creates the site directory, generates the private key and the CSR the
//! site will reuse for every renewal, and obtains generation `0000`. The
//! renewal scheduler takes over once the `latest_*` links exist.

use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use certkeeper_common::{KeyType, Serial, SiteName};
use certkeeper_config::ProvisionConfig;

use crate::certificate::is_dns_name;
use crate::error::{CertError, ToolError};
use crate::renewal::issue_generation;
use crate::store::{CertificateStore, SiteStore};
use crate::tools::{
    Certbot, CertificateIssuer, CsrGenerator, CsrRequest, DirectoryOwner, IssuanceRequest,
    KeyGenerator, OpenSsl, SystemOwner, ToolRunner,
};

/// Mode of newly generated private keys
const KEY_MODE: u32 = 0o640;

/// Split a comma separated alias list.
///
/// Entries are trimmed; empty entries and duplicates are dropped.
pub fn parse_alt_names(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// A site to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Main FQDN; also the site directory name
    pub common_name: String,
    /// System user the site belongs to
    pub owner: String,
    /// CommonName plus every alias
    pub fqdns: BTreeSet<String>,
    pub key_type: KeyType,
    pub staging: bool,
}

impl ProvisionRequest {
    pub fn new(
        common_name: impl Into<String>,
        owner: impl Into<String>,
        alt_names: Option<&str>,
        key_type: KeyType,
    ) -> Self {
        let common_name = common_name.into();
        let mut fqdns = alt_names.map(parse_alt_names).unwrap_or_default();
        fqdns.insert(common_name.clone());
        Self {
            common_name,
            owner: owner.into(),
            fqdns,
            key_type,
            staging: false,
        }
    }

    pub fn with_staging(mut self, staging: bool) -> Self {
        self.staging = staging;
        self
    }
}

/// Result of a successful provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub site: SiteName,
    pub serial: Serial,
    pub not_after: DateTime<Utc>,
}

/// External capabilities used while provisioning
#[derive(Clone)]
pub struct ProvisionTools {
    pub keys: Arc<dyn KeyGenerator>,
    pub csrs: Arc<dyn CsrGenerator>,
    pub issuer: Arc<dyn CertificateIssuer>,
    pub owner: Arc<dyn DirectoryOwner>,
}

impl ProvisionTools {
    /// `openssl`, `certbot` and the system user database
    pub fn system(config: &ProvisionConfig) -> Self {
        let runner = ToolRunner::new(config.tool_timeout());
        let openssl = Arc::new(OpenSsl::new(
            config.openssl.clone(),
            &config.openssl_config,
            runner.clone(),
        ));
        Self {
            keys: openssl.clone(),
            csrs: openssl,
            issuer: Arc::new(Certbot::new(config.certbot.clone(), runner)),
            owner: Arc::new(SystemOwner::new(config.ssl_group.clone())),
        }
    }
}

/// Sets up new sites
pub struct Provisioner {
    config: ProvisionConfig,
    store: CertificateStore,
    tools: ProvisionTools,
}

impl Provisioner {
    pub fn new(config: ProvisionConfig, tools: ProvisionTools) -> Self {
        Self {
            store: CertificateStore::new(&config.certs_root),
            config,
            tools,
        }
    }

    /// Provision one site through first issuance.
    ///
    /// The owner and site name are checked before anything is written. An
    /// existing site directory is an error; a failed step leaves the
    /// directory in place without `latest_*` links.
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<Provisioned, CertError> {
        let name = site_name(&request.common_name)?;
        if !is_dns_name(&request.common_name) {
            warn!(
                common_name = %request.common_name,
                "CommonName is not a DNS name, requesting it anyway"
            );
        }
        self.tools.owner.check(&request.owner)?;

        info!(
            site = %name,
            owner = %request.owner,
            fqdns = ?request.fqdns,
            key_type = %request.key_type,
            staging = request.staging,
            "Provisioning site"
        );

        let site = self.store.create_site(&name)?;
        self.tools.owner.assign(site.path(), &request.owner)?;

        let key = site.key_path(request.key_type);
        self.tools.keys.generate_key(request.key_type, &key).await?;
        expect_output("key generator", &key)?;
        fs::set_permissions(&key, fs::Permissions::from_mode(KEY_MODE))?;
        self.tools.owner.assign(&key, &request.owner)?;

        let csr = site.csr_path();
        self.tools
            .csrs
            .generate_csr(&CsrRequest {
                common_name: request.common_name.clone(),
                fqdns: request.fqdns.clone(),
                key,
                output: csr.clone(),
            })
            .await?;
        expect_output("CSR generator", &csr)?;

        self.first_issuance(&site, request).await
    }

    async fn first_issuance(
        &self,
        site: &SiteStore,
        request: &ProvisionRequest,
    ) -> Result<Provisioned, CertError> {
        let issuance = IssuanceRequest {
            domains: request.fqdns.iter().cloned().collect(),
            csr: site.csr_path(),
            webroot: self
                .config
                .www_root
                .join(&request.owner)
                .join(site.name().as_str()),
            output: site.generation(Serial::FIRST),
            email: self.config.admin_email.clone(),
            staging: request.staging,
            agree_tos: true,
        };

        let cert = issue_generation(
            self.tools.issuer.as_ref(),
            &self.config.certbot,
            site,
            &issuance,
        )
        .await?;

        info!(
            site = %site.name(),
            serial = %Serial::FIRST,
            not_after = %cert.not_after(),
            "Site provisioned"
        );
        Ok(Provisioned {
            site: site.name().clone(),
            serial: Serial::FIRST,
            not_after: cert.not_after(),
        })
    }
}

/// A common name usable as a single directory component
fn site_name(common_name: &str) -> Result<SiteName, CertError> {
    let usable = !common_name.is_empty()
        && common_name != "."
        && common_name != ".."
        && !common_name.starts_with('.')
        && !common_name.contains('/')
        && !common_name.contains('\0');
    if usable {
        Ok(SiteName::from(common_name))
    } else {
        Err(CertError::InvalidSiteName(common_name.to_string()))
    }
}

fn expect_output(program: &str, path: &Path) -> Result<(), ToolError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::MissingOutput {
            program: program.to_string(),
            path: path.to_path_buf(),
        })
    }
}
