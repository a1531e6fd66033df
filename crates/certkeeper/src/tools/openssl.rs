//! OpenSSL for keys and certificate signing requests.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use certkeeper_common::KeyType;

use super::{CsrGenerator, CsrRequest, KeyGenerator, ToolRunner};
use crate::error::ToolError;

/// Name of the request extension section added to the base configuration
const SAN_SECTION: &str = "SAN";

/// Key and CSR generation through the `openssl` command line
#[derive(Debug, Clone)]
pub struct OpenSsl {
    program: String,
    base_config: PathBuf,
    runner: ToolRunner,
}

impl OpenSsl {
    /// `base_config` is the system configuration the SAN section is
    /// appended to, usually `/etc/ssl/openssl.cnf`
    pub fn new(program: impl Into<String>, base_config: &Path, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            base_config: base_config.to_path_buf(),
            runner,
        }
    }

    /// Copy of the base configuration with a SAN section, deleted on drop
    fn scoped_config(&self, fqdns: &BTreeSet<String>) -> Result<NamedTempFile, ToolError> {
        let prepare = |source| ToolError::Prepare {
            program: self.program.clone(),
            source,
        };

        let base = fs::read_to_string(&self.base_config).map_err(prepare)?;
        let mut file = NamedTempFile::new().map_err(prepare)?;
        file.write_all(base.as_bytes()).map_err(prepare)?;
        file.write_all(san_section(fqdns).as_bytes()).map_err(prepare)?;
        file.flush().map_err(prepare)?;

        debug!(path = %file.path().display(), "Wrote scoped OpenSSL configuration");
        Ok(file)
    }
}

/// `[SAN]` section listing every FQDN as a DNS subjectAltName
pub fn san_section(fqdns: &BTreeSet<String>) -> String {
    let names = fqdns
        .iter()
        .map(|fqdn| format!("DNS:{}", fqdn))
        .collect::<Vec<_>>()
        .join(",");
    format!("\n[{}]\nsubjectAltName={}\n", SAN_SECTION, names)
}

#[async_trait]
impl KeyGenerator for OpenSsl {
    async fn generate_key(&self, key_type: KeyType, output: &Path) -> Result<(), ToolError> {
        info!(key_type = %key_type, path = %output.display(), "Generating private key");
        let args: Vec<OsString> = match key_type {
            KeyType::Ecdsa => vec![
                "ecparam".into(),
                "-genkey".into(),
                "-name".into(),
                key_type.curve().into(),
                "-out".into(),
                output.into(),
            ],
        };
        self.runner.run(&self.program, args).await
    }
}

#[async_trait]
impl CsrGenerator for OpenSsl {
    async fn generate_csr(&self, request: &CsrRequest) -> Result<(), ToolError> {
        info!(
            common_name = %request.common_name,
            fqdns = ?request.fqdns,
            path = %request.output.display(),
            "Generating certificate signing request"
        );

        // Removed when dropped, whichever way this function returns
        let config = self.scoped_config(&request.fqdns)?;
        let subject = format!("/CN={}", request.common_name);

        let args: Vec<OsString> = vec![
            "req".into(),
            "-new".into(),
            "-sha256".into(),
            "-key".into(),
            request.key.clone().into(),
            "-subj".into(),
            subject.into(),
            "-reqexts".into(),
            SAN_SECTION.into(),
            "-config".into(),
            config.path().into(),
            "-outform".into(),
            "PEM".into(),
            "-out".into(),
            request.output.clone().into(),
        ];
        self.runner.run(&self.program, args).await
    }
}
