//! Role-based permission gate for the admin surface.
//!
//! Roles map to a fixed permission table. Identity arrives in the
//! `X-User-Id` header from the upstream identity provider.

use std::collections::{HashMap, HashSet};

use axum::http::HeaderMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, Environment};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity used when the bypass admits a caller that sent no id.
const ANONYMOUS_DEV_USER: &str = "dev-anonymous";

/// One denial for every cause, so callers cannot probe what exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("forbidden")]
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    PortfolioManager,
    ProjectManager,
    ResourceManager,
    TeamMember,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    PortfolioRead,
    PortfolioWrite,
    ProjectRead,
    ProjectWrite,
    ResourceRead,
    ResourceAllocate,
    FinancialRead,
    RiskRead,
    UserManage,
    PerformanceRead,
    PerformanceReset,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::PortfolioRead,
        Permission::PortfolioWrite,
        Permission::ProjectRead,
        Permission::ProjectWrite,
        Permission::ResourceRead,
        Permission::ResourceAllocate,
        Permission::FinancialRead,
        Permission::RiskRead,
        Permission::UserManage,
        Permission::PerformanceRead,
        Permission::PerformanceReset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortfolioRead => "portfolio.read",
            Self::PortfolioWrite => "portfolio.write",
            Self::ProjectRead => "project.read",
            Self::ProjectWrite => "project.write",
            Self::ResourceRead => "resource.read",
            Self::ResourceAllocate => "resource.allocate",
            Self::FinancialRead => "financial.read",
            Self::RiskRead => "risk.read",
            Self::UserManage => "user.manage",
            Self::PerformanceRead => "performance.read",
            Self::PerformanceReset => "performance.reset",
        }
    }
}

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => Permission::ALL,
            Role::PortfolioManager => &[
                PortfolioRead,
                PortfolioWrite,
                ProjectRead,
                ProjectWrite,
                ResourceRead,
                FinancialRead,
                RiskRead,
            ],
            Role::ProjectManager => &[
                PortfolioRead,
                ProjectRead,
                ProjectWrite,
                ResourceRead,
                ResourceAllocate,
                FinancialRead,
                RiskRead,
            ],
            Role::ResourceManager => &[ProjectRead, ResourceRead, ResourceAllocate],
            Role::TeamMember => &[ProjectRead, ResourceRead, RiskRead],
            Role::Viewer => &[PortfolioRead, ProjectRead],
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Who the gate let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub via_dev_bypass: bool,
}

#[derive(Debug, Clone)]
enum DevBypass {
    AllCallers,
    Listed(HashSet<String>),
}

#[derive(Debug, Clone)]
pub struct Rbac {
    user_roles: HashMap<String, Role>,
    dev_bypass: Option<DevBypass>,
}

impl Rbac {
    /// The bypass is only armed in development, whatever `auth` says.
    pub fn new(environment: Environment, auth: &AuthConfig) -> Self {
        let dev_bypass = match (environment, auth.dev_bypass) {
            (Environment::Development, true) if auth.dev_admin_ids.is_empty() => {
                warn!("development bypass grants admin to every caller");
                Some(DevBypass::AllCallers)
            }
            (Environment::Development, true) => {
                warn!(
                    ids = auth.dev_admin_ids.len(),
                    "development bypass grants admin to listed identities"
                );
                Some(DevBypass::Listed(
                    auth.dev_admin_ids.iter().map(|id| canonical_id(id)).collect(),
                ))
            }
            (Environment::Production, true) => {
                warn!("ignoring development bypass in production");
                None
            }
            (_, false) => None,
        };

        Self {
            user_roles: auth
                .user_roles
                .iter()
                .map(|(id, role)| (canonical_id(id), *role))
                .collect(),
            dev_bypass,
        }
    }

    pub fn dev_bypass_active(&self) -> bool {
        self.dev_bypass.is_some()
    }

    /// Ids compare case-insensitively; env-sourced role keys arrive lowercased.
    fn resolve(&self, user_id: Option<&str>) -> Option<Principal> {
        let user_id = user_id.map(canonical_id);
        let user_id = user_id.as_deref();
        let bypass = match (&self.dev_bypass, user_id) {
            (Some(DevBypass::AllCallers), id) => Some(id.unwrap_or(ANONYMOUS_DEV_USER)),
            (Some(DevBypass::Listed(ids)), Some(id)) if ids.contains(id) => Some(id),
            _ => None,
        };
        if let Some(id) = bypass {
            debug!(user_id = id, "admitted through development bypass");
            return Some(Principal {
                user_id: id.to_owned(),
                role: Role::Admin,
                via_dev_bypass: true,
            });
        }

        let id = user_id?;
        let role = *self.user_roles.get(id)?;
        Some(Principal {
            user_id: id.to_owned(),
            role,
            via_dev_bypass: false,
        })
    }

    pub fn check(&self, user_id: Option<&str>, permission: Permission) -> Result<Principal, AuthError> {
        match self.resolve(user_id) {
            Some(principal) if principal.role.has(permission) => Ok(principal),
            _ => {
                info!(
                    user_id = user_id.unwrap_or("-"),
                    permission = permission.as_str(),
                    "permission denied"
                );
                Err(AuthError::Forbidden)
            }
        }
    }

    /// Read the caller from `X-User-Id` and check `permission`.
    pub fn authorize(&self, headers: &HeaderMap, permission: Permission) -> Result<Principal, AuthError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        self.check(user_id, permission)
    }
}

fn canonical_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(dev_bypass: bool, ids: &[&str], roles: &[(&str, Role)]) -> AuthConfig {
        AuthConfig {
            dev_bypass,
            dev_admin_ids: ids.iter().map(|s| s.to_string()).collect(),
            user_roles: roles.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn only_admin_reads_performance() {
        for role in [
            Role::PortfolioManager,
            Role::ProjectManager,
            Role::ResourceManager,
            Role::TeamMember,
            Role::Viewer,
        ] {
            assert!(!role.has(Permission::PerformanceRead), "{role:?}");
            assert!(!role.has(Permission::PerformanceReset), "{role:?}");
        }
        assert!(Role::Admin.has(Permission::PerformanceReset));
        assert_eq!(Role::Admin.permissions().len(), Permission::ALL.len());
    }

    #[test]
    fn role_store_grants_by_role() {
        let rbac = Rbac::new(
            Environment::Production,
            &auth(false, &[], &[("root", Role::Admin), ("pm", Role::ProjectManager)]),
        );
        assert_eq!(
            rbac.check(Some("root"), Permission::PerformanceRead).unwrap().role,
            Role::Admin
        );
        assert!(rbac.check(Some("pm"), Permission::ProjectWrite).is_ok());
        assert_eq!(
            rbac.check(Some("pm"), Permission::PerformanceRead),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn unknown_and_missing_callers_denied_uniformly() {
        let rbac = Rbac::new(Environment::Development, &auth(false, &[], &[]));
        assert_eq!(rbac.check(None, Permission::ProjectRead), Err(AuthError::Forbidden));
        assert_eq!(
            rbac.check(Some("ghost"), Permission::ProjectRead),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn listed_dev_ids_become_admin() {
        let rbac = Rbac::new(Environment::Development, &auth(true, &["dev-1"], &[]));
        assert!(rbac.dev_bypass_active());

        let principal = rbac.check(Some("dev-1"), Permission::PerformanceReset).unwrap();
        assert!(principal.via_dev_bypass);
        assert!(rbac.check(Some("dev-2"), Permission::PerformanceRead).is_err());
        assert!(rbac.check(None, Permission::PerformanceRead).is_err());
    }

    #[test]
    fn empty_dev_list_admits_everyone() {
        let rbac = Rbac::new(Environment::Development, &auth(true, &[], &[]));
        let principal = rbac.check(None, Permission::PerformanceRead).unwrap();
        assert_eq!(principal.user_id, ANONYMOUS_DEV_USER);
        assert!(rbac.check(Some("anyone"), Permission::UserManage).is_ok());
    }

    #[test]
    fn bypass_unreachable_in_production() {
        let rbac = Rbac::new(
            Environment::Production,
            &auth(true, &["dev-1"], &[("viewer", Role::Viewer)]),
        );
        assert!(!rbac.dev_bypass_active());
        assert!(rbac.check(Some("dev-1"), Permission::PerformanceRead).is_err());
        assert!(rbac.check(Some("viewer"), Permission::ProjectRead).is_ok());
    }

    #[test]
    fn ids_match_case_insensitively() {
        let rbac = Rbac::new(
            Environment::Development,
            &auth(true, &["Dev-Lead"], &[("root-user", Role::Admin)]),
        );
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, "Root-User".parse().unwrap());
        let principal = rbac.authorize(&headers, Permission::PerformanceRead).unwrap();
        assert_eq!(principal.user_id, "root-user");
        assert!(!principal.via_dev_bypass);

        assert!(rbac.check(Some("DEV-LEAD"), Permission::PerformanceReset).is_ok());
    }

    #[test]
    fn header_is_trimmed_and_blank_is_missing() {
        let rbac = Rbac::new(
            Environment::Production,
            &auth(false, &[], &[("root", Role::Admin)]),
        );
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, " root ".parse().unwrap());
        assert!(rbac.authorize(&headers, Permission::PerformanceRead).is_ok());

        headers.insert(USER_ID_HEADER, "   ".parse().unwrap());
        assert!(rbac.authorize(&headers, Permission::PerformanceRead).is_err());
    }
}
