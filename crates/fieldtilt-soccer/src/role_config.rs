// Role weight tables: the metrics that define each tactical role.
//
// Roles are grouped into outfield and goalkeeper sets, each scored against
// its own player table. The built-in tables ship as defaults/roles.toml and
// can be replaced with config/roles.toml.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use fieldtilt_core::weights::WeightTable;

use crate::config::ConfigError;

pub(crate) const BUILTIN_ROLES: &str = include_str!("../defaults/roles.toml");

// ---------------------------------------------------------------------------
// Role groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleGroup {
    Outfield,
    Goalkeeper,
}

impl RoleGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleGroup::Outfield => "outfield",
            RoleGroup::Goalkeeper => "goalkeeper",
        }
    }
}

impl fmt::Display for RoleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "outfield" => Ok(RoleGroup::Outfield),
            "goalkeeper" | "gk" => Ok(RoleGroup::Goalkeeper),
            other => Err(format!("unknown role group `{other}` (expected outfield or goalkeeper)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub weights: WeightTable,
}

impl Role {
    pub fn new(name: &str, weights: WeightTable) -> Self {
        Role {
            name: name.to_string(),
            weights,
        }
    }
}

/// Ordered roles scored together against one player table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSet {
    pub name: String,
    pub roles: Vec<Role>,
}

impl RoleSet {
    pub fn new(name: &str, roles: Vec<Role>) -> Self {
        RoleSet {
            name: name.to_string(),
            roles,
        }
    }

    pub fn get(&self, role: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == role)
    }

    /// Every metric named by any role, in first-seen order, without repeats.
    pub fn metrics(&self) -> Vec<&str> {
        let mut metrics: Vec<&str> = Vec::new();
        for metric in self.roles.iter().flat_map(|r| r.weights.metrics()) {
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        metrics
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role names must be present and unique. Weight sums are checked per role
    /// at scoring time instead, so one bad role does not block the others.
    fn validate(&self) -> Result<(), ConfigError> {
        for (i, role) in self.roles.iter().enumerate() {
            let field = format!("{}[{}].name", self.name, i);
            if role.name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    field,
                    message: "must not be empty".into(),
                });
            }
            if self.roles[..i].iter().any(|r| r.name == role.name) {
                return Err(ConfigError::ValidationError {
                    field,
                    message: format!("role `{}` is defined twice", role.name),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Raw deserialization target for roles.toml.
#[derive(Debug, Deserialize)]
struct RolesFile {
    #[serde(default)]
    outfield: Vec<Role>,
    #[serde(default)]
    goalkeeper: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCatalog {
    pub outfield: RoleSet,
    pub goalkeeper: RoleSet,
}

impl RoleCatalog {
    /// The role tables compiled into the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_ROLES, Path::new("defaults/roles.toml"))
    }

    /// Parse a roles.toml document; `path` is only used in error messages.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: RolesFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(RoleCatalog {
            outfield: RoleSet::new(RoleGroup::Outfield.as_str(), file.outfield),
            goalkeeper: RoleSet::new(RoleGroup::Goalkeeper.as_str(), file.goalkeeper),
        })
    }

    pub fn group(&self, group: RoleGroup) -> &RoleSet {
        match group {
            RoleGroup::Outfield => &self.outfield,
            RoleGroup::Goalkeeper => &self.goalkeeper,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.outfield.validate()?;
        self.goalkeeper.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
