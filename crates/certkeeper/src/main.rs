//! certkeeper - Main entry point
//!
//! TLS certificate lifecycle tooling: renewal runs, site provisioning and
//! DANE/TLSA record generation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use certkeeper::{
    exit, tlsa, CertError, Certificate, ConfigError, KeyType, ProvisionConfig, ProvisionRequest,
    ProvisionTools, Provisioner, RenewalConfig, RenewalReport, RenewalScheduler,
};
use certkeeper_config::{DEFAULT_RENEW_CONFIG, DEFAULT_SETUP_CONFIG};

/// certkeeper - TLS certificate lifecycle tooling
#[derive(Parser, Debug)]
#[command(name = "certkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Renew every certificate that expires within the threshold
    Renew {
        /// Enable verbose logging (debug level)
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,

        /// Issue staging certificates (useful for testing purposes)
        #[arg(short = 's', long = "staging")]
        staging: bool,

        /// Configuration file path
        #[arg(short = 'c', long = "config", env = "CERTKEEPER_CONFIG", default_value = DEFAULT_RENEW_CONFIG)]
        config: PathBuf,

        /// Print the run report as JSON on stdout
        #[arg(long = "json")]
        json: bool,
    },
    /// Create a site and obtain its first certificate
    Setup {
        /// Main FQDN, used as CommonName
        cn: String,

        /// System user affiliated with the certificate
        owner: String,

        /// Enable verbose logging (debug level)
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,

        /// Issue staging certificates (useful for testing purposes)
        #[arg(short = 's', long = "staging")]
        staging: bool,

        /// Type of private key (default from the configuration: ecdsa)
        #[arg(short = 'k', long = "keytype")]
        keytype: Option<String>,

        /// Comma separated aliases, used as SubjectAltName
        #[arg(short = 'a', long = "altnames")]
        altnames: Option<String>,

        /// Configuration file path
        #[arg(short = 'c', long = "config", env = "CERTKEEPER_CONFIG", default_value = DEFAULT_SETUP_CONFIG)]
        config: PathBuf,
    },
    /// Print TLSA records for a certificate
    Tlsa {
        /// PEM certificate file
        certificate: PathBuf,

        /// Transport protocol label
        #[arg(default_value = tlsa::DEFAULT_PROTOCOL)]
        stream: String,

        /// Service port
        #[arg(default_value_t = tlsa::DEFAULT_PORT)]
        port: u16,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Renew {
            verbose,
            staging,
            config,
            json,
        } => {
            init_logging(verbose);
            renew(&config, staging, json)
        }
        Commands::Setup {
            cn,
            owner,
            verbose,
            staging,
            keytype,
            altnames,
            config,
        } => {
            init_logging(verbose);
            setup(&config, cn, owner, keytype, altnames, staging)
        }
        Commands::Tlsa {
            certificate,
            stream,
            port,
        } => {
            init_logging(false);
            print_tlsa(&certificate, &stream, port)
        }
    };

    ExitCode::from(code)
}

/// Logs go to stderr so stdout carries only records and reports
fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exit code for an error that ended the command
fn fail(context: &str, err: &CertError) -> u8 {
    error!(error = %err, kind = ?err.kind(), "{}", context);
    err.exit_code()
}

fn runtime() -> Result<tokio::runtime::Runtime, CertError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn renew(config_path: &Path, staging: bool, json: bool) -> u8 {
    let config = match RenewalConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => return fail("Invalid renewal configuration", &e.into()),
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(e) => return fail("Failed to start runtime", &e),
    };

    let scheduler = RenewalScheduler::with_system_tools(config).with_staging(staging);
    let result = runtime.block_on(async {
        tokio::select! {
            result = scheduler.run() => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    let report = match result {
        Some(Ok(report)) => report,
        Some(Err(e)) => return fail("Renewal run failed", &e),
        None => {
            warn!("Interrupted, running tool killed; links are unchanged");
            return exit::RUNTIME;
        }
    };

    if json {
        if let Err(e) = print_report(&report) {
            error!(error = %e, "Failed to write run report");
            return exit::RUNTIME;
        }
    }
    report.exit_code()
}

fn print_report(report: &RenewalReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
    Ok(())
}

fn setup(
    config_path: &Path,
    cn: String,
    owner: String,
    keytype: Option<String>,
    altnames: Option<String>,
    staging: bool,
) -> u8 {
    let config = match ProvisionConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => return fail("Invalid provisioning configuration", &e.into()),
    };
    let key_type = match keytype.as_deref().map(str::parse::<KeyType>).transpose() {
        Ok(key_type) => key_type.unwrap_or(config.keytype),
        Err(e) => return fail("Invalid key type", &ConfigError::from(e).into()),
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(e) => return fail("Failed to start runtime", &e),
    };

    let request =
        ProvisionRequest::new(cn, owner, altnames.as_deref(), key_type).with_staging(staging);
    let provisioner = Provisioner::new(config.clone(), ProvisionTools::system(&config));

    let result = runtime.block_on(async {
        tokio::select! {
            result = provisioner.provision(&request) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match result {
        Some(Ok(provisioned)) => {
            info!(
                site = %provisioned.site,
                serial = %provisioned.serial,
                not_after = %provisioned.not_after,
                "Setup complete"
            );
            exit::SUCCESS
        }
        Some(Err(e)) => fail("Site setup failed", &e),
        None => {
            warn!("Interrupted, running tool killed");
            exit::RUNTIME
        }
    }
}

fn print_tlsa(certificate: &Path, protocol: &str, port: u16) -> u8 {
    let cert = match Certificate::from_file(certificate) {
        Ok(cert) => cert,
        Err(e) => return fail("Failed to parse certificate", &e.into()),
    };

    let mut stdout = std::io::stdout().lock();
    for record in tlsa::records_for(&cert, protocol, port) {
        if let Err(e) = writeln!(stdout, "{}", record) {
            return fail("Failed to write records", &e.into());
        }
    }
    exit::SUCCESS
}
