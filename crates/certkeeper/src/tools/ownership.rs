//! Site directory ownership via the system user database.

use std::path::Path;

use nix::unistd::{chown, Group, User};
use tracing::{debug, info};

use super::DirectoryOwner;
use crate::error::CertError;

/// Hands a site directory to `<owner>:<group>`
#[derive(Debug, Clone)]
pub struct SystemOwner {
    group: String,
}

impl SystemOwner {
    /// `group` is shared by every site, typically `ssl-cert`
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }

    fn lookup(&self, owner: &str) -> Result<(User, Group), CertError> {
        let user = User::from_name(owner)?.ok_or_else(|| CertError::UnknownUser(owner.to_string()))?;
        let group = Group::from_name(&self.group)?
            .ok_or_else(|| CertError::UnknownGroup(self.group.clone()))?;
        debug!(owner, uid = %user.uid, group = %self.group, gid = %group.gid, "Resolved site owner");
        Ok((user, group))
    }
}

impl DirectoryOwner for SystemOwner {
    fn check(&self, owner: &str) -> Result<(), CertError> {
        self.lookup(owner).map(|_| ())
    }

    fn assign(&self, path: &Path, owner: &str) -> Result<(), CertError> {
        let (user, group) = self.lookup(owner)?;
        chown(path, Some(user.uid), Some(group.gid))?;
        info!(
            path = %path.display(),
            owner,
            group = %self.group,
            "Assigned site directory ownership"
        );
        Ok(())
    }
}
