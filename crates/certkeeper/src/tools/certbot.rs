//! certbot as the CA client.

use std::ffi::OsString;

use async_trait::async_trait;
use tracing::info;

use super::{CertificateIssuer, IssuanceRequest, ToolRunner};
use crate::error::ToolError;

/// Webroot-validated issuance through `certbot certonly`
#[derive(Debug, Clone)]
pub struct Certbot {
    program: String,
    runner: ToolRunner,
}

impl Certbot {
    pub fn new(program: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Command line for a request, without the program name
    pub fn args(request: &IssuanceRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "certonly".into(),
            "-n".into(),
            "-q".into(),
            "--webroot".into(),
            "-w".into(),
            request.webroot.clone().into(),
        ];
        if request.agree_tos {
            args.push("--agree-tos".into());
        }
        for domain in &request.domains {
            args.push("-d".into());
            args.push(domain.into());
        }
        args.extend([
            "--email".into(),
            request.email.clone().into(),
            "--csr".into(),
            request.csr.clone().into(),
            "--cert-path".into(),
            request.output.cert.clone().into(),
            "--fullchain-path".into(),
            request.output.fullchain.clone().into(),
            "--chain-path".into(),
            request.output.chain.clone().into(),
        ]);
        if request.staging {
            args.push("--staging".into());
            args.push("--break-my-certs".into());
        }
        args
    }
}

#[async_trait]
impl CertificateIssuer for Certbot {
    async fn issue(&self, request: &IssuanceRequest) -> Result<(), ToolError> {
        info!(
            domains = ?request.domains,
            serial = %request.output.serial,
            staging = request.staging,
            "Requesting certificate"
        );
        self.runner.run(&self.program, Self::args(request)).await
    }
}
