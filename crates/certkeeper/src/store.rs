//! Serially versioned certificate storage
//!
//! Every site keeps all certificate generations it ever received, plus
//! three symlinks naming the one currently deployed.
//!
//! # Directory Structure
//!
//! ```text
//! certs_root/
//! └── example.com/
//!     ├── example.com.csr             # CSR reused for every renewal
//!     ├── example.com-secp384r1.key   # Private key
//!     ├── 0000_cert.crt
//!     ├── 0000_chain.pem
//!     ├── 0000_fullchain.pem
//!     ├── 0001_cert.crt
//!     ├── 0001_chain.pem
//!     ├── 0001_fullchain.pem
//!     ├── latest_cert.crt      -> 0001_cert.crt
//!     ├── latest_chain.pem     -> 0001_chain.pem
//!     └── latest_fullchain.pem -> 0001_fullchain.pem
//! ```
//!
//! Link targets are bare file names, so a site directory can be moved or
//! bind-mounted without breaking them. Links are replaced by renaming a
//! freshly created link over the old one; readers see either the old or
//! the new generation, never a missing link.

use std::fs;
use std::io;
use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, trace, warn};

use certkeeper_common::{KeyType, Serial, SiteName};

use crate::error::StoreError;

/// Link to the deployed certificate
pub const CERT_LINK: &str = "latest_cert.crt";
/// Link to the deployed intermediate chain
pub const CHAIN_LINK: &str = "latest_chain.pem";
/// Link to the deployed certificate + chain
pub const FULLCHAIN_LINK: &str = "latest_fullchain.pem";

const LINKS: [&str; 3] = [CERT_LINK, CHAIN_LINK, FULLCHAIN_LINK];

static CERT_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_cert\.crt$").expect("certificate file pattern is valid"));

/// The three files of one certificate generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub serial: Serial,
    pub cert: PathBuf,
    pub chain: PathBuf,
    pub fullchain: PathBuf,
}

impl Generation {
    fn new(site_path: &Path, serial: Serial) -> Self {
        Self {
            serial,
            cert: site_path.join(format!("{}_cert.crt", serial)),
            chain: site_path.join(format!("{}_chain.pem", serial)),
            fullchain: site_path.join(format!("{}_fullchain.pem", serial)),
        }
    }

    /// Files in link order: cert, chain, fullchain
    pub fn files(&self) -> [&Path; 3] {
        [&self.cert, &self.chain, &self.fullchain]
    }

    /// First file of the generation that does not exist
    pub fn missing(&self) -> Option<&Path> {
        self.files().into_iter().find(|path| !path.is_file())
    }
}

/// State of a site's `latest_*` links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link exists: the site has not completed first issuance
    Absent,
    /// All three links exist
    Present,
    /// Some links exist and some do not
    Partial,
}

/// Root of all site directories
#[derive(Debug, Clone)]
pub struct CertificateStore {
    root: PathBuf,
}

impl CertificateStore {
    /// Open the store at an existing root directory
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle for one site; the directory may not exist yet
    pub fn site(&self, name: &SiteName) -> SiteStore {
        SiteStore {
            name: name.clone(),
            path: self.root.join(name.as_str()),
        }
    }

    /// List site directories, sorted by name.
    ///
    /// Hidden entries (such as the run lock) and plain files are skipped.
    pub fn list_sites(&self) -> Result<Vec<SiteName>, StoreError> {
        let mut sites = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(entry = ?entry.file_name(), "Skipping non UTF-8 entry in certificates root");
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                trace!(entry = %name, "Skipping non-site entry");
                continue;
            }
            sites.push(SiteName::from(name));
        }
        sites.sort();
        Ok(sites)
    }

    /// Create a new site directory.
    ///
    /// Fails with [`StoreError::SiteExists`] rather than reusing an
    /// existing directory.
    pub fn create_site(&self, name: &SiteName) -> Result<SiteStore, StoreError> {
        let site = self.site(name);
        match fs::create_dir(&site.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::SiteExists(site.path));
            }
            Err(e) => return Err(e.into()),
        }
        fs::set_permissions(&site.path, fs::Permissions::from_mode(0o750))?;

        info!(site = %name, path = %site.path.display(), "Created site directory");
        Ok(site)
    }
}

/// One site directory
#[derive(Debug, Clone)]
pub struct SiteStore {
    name: SiteName,
    path: PathBuf,
}

impl SiteStore {
    pub fn name(&self) -> &SiteName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the deployed certificate link
    pub fn latest_cert(&self) -> PathBuf {
        self.path.join(CERT_LINK)
    }

    /// CSR submitted on every issuance for this site
    pub fn csr_path(&self) -> PathBuf {
        self.path.join(format!("{}.csr", self.name))
    }

    /// Private key file for a key type
    pub fn key_path(&self, key_type: KeyType) -> PathBuf {
        self.path
            .join(format!("{}-{}.key", self.name, key_type.curve()))
    }

    /// Paths of a generation's files
    pub fn generation(&self, serial: Serial) -> Generation {
        Generation::new(&self.path, serial)
    }

    /// Which of the `latest_*` links exist
    pub fn link_state(&self) -> LinkState {
        let present = LINKS
            .iter()
            .filter(|link| fs::symlink_metadata(self.path.join(link)).is_ok())
            .count();
        match present {
            0 => LinkState::Absent,
            n if n == LINKS.len() => LinkState::Present,
            _ => LinkState::Partial,
        }
    }

    /// Serial of the deployed generation, read from `latest_cert.crt`.
    ///
    /// A missing, dangling or oddly named link means the store is corrupt.
    pub fn current_serial(&self) -> Result<Serial, StoreError> {
        let link = self.latest_cert();
        let target = fs::read_link(&link)
            .map_err(|e| StoreError::corrupt(&link, format!("cannot read link: {}", e)))?;

        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::corrupt(&link, format!("bad target {:?}", target)))?;

        let captures = CERT_FILE_RE.captures(file_name).ok_or_else(|| {
            StoreError::corrupt(&link, format!("target '{}' is not a generation file", file_name))
        })?;
        let serial: Serial = captures[1]
            .parse()
            .map_err(|e| StoreError::corrupt(&link, format!("bad serial in '{}': {}", file_name, e)))?;

        if !link.is_file() {
            return Err(StoreError::corrupt(
                &link,
                format!("target '{}' does not exist", file_name),
            ));
        }

        trace!(site = %self.name, serial = %serial, "Resolved current generation");
        Ok(serial)
    }

    /// Serial the next renewal should be written to
    pub fn next_serial(&self) -> Result<Serial, StoreError> {
        let current = self.current_serial()?;
        current.next().ok_or_else(|| {
            StoreError::corrupt(
                self.latest_cert(),
                format!("serial {} has no successor", current),
            )
        })
    }

    /// Point all three links at a generation.
    ///
    /// Nothing is touched unless every file of the generation exists.
    pub fn promote(&self, generation: &Generation) -> Result<(), StoreError> {
        if let Some(missing) = generation.missing() {
            return Err(StoreError::IncompleteGeneration {
                serial: generation.serial,
                missing: missing.to_path_buf(),
            });
        }

        for (link, target) in LINKS.iter().zip(generation.files()) {
            let target_name = target
                .file_name()
                .ok_or_else(|| StoreError::corrupt(target, "generation file has no name"))?;
            replace_symlink(&self.path.join(link), Path::new(target_name))?;
        }

        info!(
            site = %self.name,
            serial = %generation.serial,
            "Promoted certificate generation"
        );
        Ok(())
    }

    /// Remove whatever files of an unpromoted generation exist
    pub fn discard(&self, generation: &Generation) -> Result<(), StoreError> {
        for path in generation.files() {
            match fs::remove_file(path) {
                Ok(()) => debug!(site = %self.name, path = %path.display(), "Discarded file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// User name owning the site directory, or the numeric uid if it has
    /// no passwd entry
    pub fn owner(&self) -> Result<String, StoreError> {
        let uid = fs::metadata(&self.path)?.uid();
        match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
            Ok(Some(user)) => Ok(user.name),
            Ok(None) => {
                warn!(site = %self.name, uid, "Site owner has no passwd entry, using uid");
                Ok(uid.to_string())
            }
            Err(errno) => Err(StoreError::Io(io::Error::from(errno))),
        }
    }
}

/// Atomically make `link` point at `target`
fn replace_symlink(link: &Path, target: &Path) -> Result<(), StoreError> {
    let file_name = link
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::corrupt(link, "link has no name"))?;
    let staging = link.with_file_name(format!(".{}.tmp", file_name));

    match fs::remove_file(&staging) {
        Ok(()) => warn!(path = %staging.display(), "Removed stale staging link"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    symlink(target, &staging)?;
    fs::rename(&staging, link)?;

    trace!(link = %link.display(), target = %target.display(), "Replaced symlink");
    Ok(())
}
