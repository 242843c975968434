use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// A role a principal holds, either globally (group membership) or with
/// respect to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Project manager.
    Pm,
    /// Data manager.
    Dm,
    /// Data access committee member.
    Dac,
    /// Owner of the request.
    Own,
    /// Assigned reviewer, pending or completed.
    Rev,
    /// Assigned reviewer who has not submitted yet.
    #[serde(rename = "PENREV")]
    PenRev,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pm => "PM",
            Role::Dm => "DM",
            Role::Dac => "DAC",
            Role::Own => "OWN",
            Role::Rev => "REV",
            Role::PenRev => "PENREV",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PM" => Ok(Role::Pm),
            "DM" => Ok(Role::Dm),
            "DAC" => Ok(Role::Dac),
            "OWN" => Ok(Role::Own),
            "REV" => Ok(Role::Rev),
            "PENREV" => Ok(Role::PenRev),
            other => Err(TypeError::InvalidRole(other.to_string())),
        }
    }
}

/// Set of roles held by one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when at least one of `roles` is held.
    pub fn intersects(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.0.contains(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_checks_any_role() {
        let roles = RoleSet::from([Role::Dac, Role::Rev]);
        assert!(roles.intersects(&[Role::Pm, Role::Rev]));
        assert!(!roles.intersects(&[Role::Pm, Role::Own]));
        assert!(!RoleSet::new().intersects(&[Role::Pm]));
    }

    #[test]
    fn serializes_as_names() {
        let roles = RoleSet::from([Role::PenRev, Role::Pm]);
        assert_eq!(serde_json::to_string(&roles).unwrap(), r#"["PM","PENREV"]"#);
        assert_eq!("PENREV".parse::<Role>().unwrap(), Role::PenRev);
        assert!("ADMIN".parse::<Role>().is_err());
    }
}
