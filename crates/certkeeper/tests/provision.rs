//! Site provisioning with fake tools

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use certkeeper::store::{CERT_LINK, FULLCHAIN_LINK};
use certkeeper::{
    exit, CertError, CertificateStore, ConfigError, ErrorKind, KeyType, LinkState,
    ProvisionConfig, ProvisionRequest, ProvisionTools, Provisioner, Serial, SiteName, StoreError,
};

use common::*;

struct Harness {
    _temp: TempDir,
    config: ProvisionConfig,
    openssl: Arc<FakeOpenSsl>,
    issuer: Arc<FakeIssuer>,
    owner: Arc<FakeOwner>,
}

impl Harness {
    fn new(issuer: FakeIssuer) -> Self {
        let temp = TempDir::new().unwrap();
        let config = provision_config(temp.path());
        Self {
            _temp: temp,
            config,
            openssl: Arc::new(FakeOpenSsl::default()),
            issuer: Arc::new(issuer),
            owner: Arc::new(FakeOwner::knowing(&["alice"])),
        }
    }

    fn provisioner(&self) -> Provisioner {
        Provisioner::new(
            self.config.clone(),
            ProvisionTools {
                keys: self.openssl.clone(),
                csrs: self.openssl.clone(),
                issuer: self.issuer.clone(),
                owner: self.owner.clone(),
            },
        )
    }

    fn site_dir(&self, name: &str) -> PathBuf {
        self.config.certs_root.join(name)
    }
}

#[tokio::test]
async fn test_first_issuance_creates_generation_zero() {
    let h = Harness::new(FakeIssuer::issuing(EXAMPLE_COM));
    let request = ProvisionRequest::new(
        "example.com",
        "alice",
        Some("www.example.com, example.com"),
        KeyType::Ecdsa,
    );

    let provisioned = h.provisioner().provision(&request).await.unwrap();
    assert_eq!(provisioned.site, SiteName::from("example.com"));
    assert_eq!(provisioned.serial, Serial::FIRST);
    assert_eq!(provisioned.not_after, example_com_expiry());

    let site = CertificateStore::new(&h.config.certs_root).site(&SiteName::from("example.com"));
    assert_eq!(site.link_state(), LinkState::Present);
    assert_eq!(site.current_serial().unwrap(), Serial::FIRST);
    assert_eq!(
        fs::read_link(site.path().join(FULLCHAIN_LINK)).unwrap(),
        PathBuf::from("0000_fullchain.pem")
    );

    // Key and CSR
    let key = h.site_dir("example.com").join("example.com-secp384r1.key");
    assert_eq!(
        *h.openssl.keys.lock().unwrap(),
        vec![(KeyType::Ecdsa, key.clone())]
    );
    assert_eq!(
        fs::metadata(&key).unwrap().permissions().mode() & 0o777,
        0o640
    );
    let csrs = h.openssl.csrs.lock().unwrap().clone();
    assert_eq!(csrs.len(), 1);
    assert_eq!(csrs[0].common_name, "example.com");
    assert_eq!(csrs[0].key, key);
    assert_eq!(csrs[0].output, site.csr_path());
    assert_eq!(
        csrs[0].fqdns.iter().collect::<Vec<_>>(),
        vec!["example.com", "www.example.com"]
    );

    // Issuance
    let requests = h.issuer.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].agree_tos);
    assert_eq!(requests[0].domains, vec!["example.com", "www.example.com"]);
    assert_eq!(requests[0].output, site.generation(Serial::FIRST));
    assert_eq!(
        requests[0].webroot,
        h.config.www_root.join("alice").join("example.com")
    );

    // Ownership
    assert_eq!(
        h.owner.assigned(),
        vec![
            (h.site_dir("example.com"), "alice".to_string()),
            (key, "alice".to_string()),
        ]
    );
    assert_eq!(
        fs::metadata(site.path()).unwrap().permissions().mode() & 0o777,
        0o750
    );
}

#[tokio::test]
async fn test_existing_site_directory_is_refused() {
    let h = Harness::new(FakeIssuer::issuing(EXAMPLE_COM));
    fs::create_dir(h.site_dir("example.com")).unwrap();

    let request = ProvisionRequest::new("example.com", "alice", None, KeyType::Ecdsa);
    let err = h.provisioner().provision(&request).await.unwrap_err();

    assert!(matches!(err, CertError::Store(StoreError::SiteExists(_))));
    assert!(h.openssl.keys.lock().unwrap().is_empty());
    assert!(h.issuer.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_owner_fails_before_any_change() {
    let h = Harness::new(FakeIssuer::issuing(EXAMPLE_COM));

    let request = ProvisionRequest::new("example.com", "mallory", None, KeyType::Ecdsa);
    let err = h.provisioner().provision(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.exit_code(), exit::CONFIG);
    assert!(!h.site_dir("example.com").exists());
}

#[tokio::test]
async fn test_failed_first_issuance_leaves_no_links() {
    let issuer = FakeIssuer::issuing(EXAMPLE_COM)
        .with_site("example.com", Issuance::FailAfterPartialWrite);
    let h = Harness::new(issuer);

    let request = ProvisionRequest::new("example.com", "alice", None, KeyType::Ecdsa);
    let err = h.provisioner().provision(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalTool);
    assert_eq!(err.exit_code(), exit::RENEWAL_FAILED);

    let site = CertificateStore::new(&h.config.certs_root).site(&SiteName::from("example.com"));
    assert_eq!(site.link_state(), LinkState::Absent);
    assert!(!site.path().join(CERT_LINK).exists());
    assert_eq!(
        site_files(&site),
        vec!["example.com-secp384r1.key", "example.com.csr"]
    );
}

#[tokio::test]
async fn test_staging_first_issuance() {
    let h = Harness::new(FakeIssuer::issuing(EXAMPLE_COM));
    let request =
        ProvisionRequest::new("example.com", "alice", None, KeyType::Ecdsa).with_staging(true);

    h.provisioner().provision(&request).await.unwrap();
    assert!(h.issuer.requests()[0].staging);
}

#[tokio::test]
async fn test_path_like_common_name_is_rejected() {
    let h = Harness::new(FakeIssuer::issuing(EXAMPLE_COM));

    let request = ProvisionRequest::new("../etc", "alice", None, KeyType::Ecdsa);
    let err = h.provisioner().provision(&request).await.unwrap_err();

    assert!(matches!(err, CertError::InvalidSiteName(_)));
    assert_eq!(
        fs::read_dir(&h.config.certs_root).unwrap().count(),
        0
    );
}

#[test]
fn test_unsupported_key_type_is_a_config_error() {
    let err: CertError = ConfigError::from("rsa".parse::<KeyType>().unwrap_err()).into();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.exit_code(), exit::CONFIG);
}
