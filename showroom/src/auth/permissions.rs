//! Roles, permissions, and the static table mapping one to the other.
//!
//! A [`Role`] is what gets stored on an account and embedded in the session token. The
//! [`Permission`] set of a role is never stored: it is looked up in [`ROLE_PERMISSIONS`]
//! every time a [`Principal`](super::principal::Principal) is built, so the two cannot drift.
//!
//! Handlers declare what they need with the [`RequiresPermission`] extractor:
//!
//! ```ignore
//! use showroom::auth::permissions::{require, RequiresPermission};
//!
//! async fn create_car(
//!     RequiresPermission(principal, ..): RequiresPermission<require::CreateCar>,
//! ) -> Result<Json<CarResponse>> { ... }
//! ```

use std::{fmt, marker::PhantomData, str::FromStr};

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::{Principal, authorize};
use crate::{AppState, errors::Error};

/// Role assigned to a back office account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Editor, Role::Viewer, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
            Role::User => "user",
        }
    }

    /// Permissions granted to this role, looked up in [`ROLE_PERMISSIONS`].
    pub fn permissions(&self) -> &'static [Permission] {
        ROLE_PERMISSIONS
            .iter()
            .find(|(role, _)| role == self)
            .map(|(_, permissions)| *permissions)
            .unwrap_or(&[])
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Coarse-grained capability checked once per privileged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ReadCars,
    CreateCar,
    UpdateCar,
    DeleteCar,
    ManageAttributes,
    ReadInquiries,
    UpdateInquiries,
    DeleteInquiries,
    ManageUsers,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::ReadCars,
        Permission::CreateCar,
        Permission::UpdateCar,
        Permission::DeleteCar,
        Permission::ManageAttributes,
        Permission::ReadInquiries,
        Permission::UpdateInquiries,
        Permission::DeleteInquiries,
        Permission::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadCars => "READ_CARS",
            Permission::CreateCar => "CREATE_CAR",
            Permission::UpdateCar => "UPDATE_CAR",
            Permission::DeleteCar => "DELETE_CAR",
            Permission::ManageAttributes => "MANAGE_ATTRIBUTES",
            Permission::ReadInquiries => "READ_INQUIRIES",
            Permission::UpdateInquiries => "UPDATE_INQUIRIES",
            Permission::DeleteInquiries => "DELETE_INQUIRIES",
            Permission::ManageUsers => "MANAGE_USERS",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role to permission mapping. Every role appears exactly once.
pub static ROLE_PERMISSIONS: &[(Role, &[Permission])] = &[
    (Role::Admin, &Permission::ALL),
    (
        Role::Editor,
        &[
            Permission::ReadCars,
            Permission::CreateCar,
            Permission::UpdateCar,
            Permission::ManageAttributes,
            Permission::ReadInquiries,
            Permission::UpdateInquiries,
        ],
    ),
    (Role::Viewer, &[Permission::ReadCars, Permission::ReadInquiries]),
    (Role::User, &[]),
];

/// Type-level permission used by [`RequiresPermission`].
pub trait PermissionMarker: Send + Sync + 'static {
    const PERMISSION: Permission;
}

/// Marker types for each [`Permission`].
pub mod require {
    use super::{Permission, PermissionMarker};

    macro_rules! markers {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug)]
                pub struct $name;

                impl PermissionMarker for $name {
                    const PERMISSION: Permission = Permission::$name;
                }
            )*
        };
    }

    markers!(
        ReadCars,
        CreateCar,
        UpdateCar,
        DeleteCar,
        ManageAttributes,
        ReadInquiries,
        UpdateInquiries,
        DeleteInquiries,
        ManageUsers,
    );
}

/// Extractor that authenticates the request and requires `P`'s permission.
///
/// Rejects with 401 when there is no valid session and 403 when the role lacks the permission.
#[derive(Debug)]
pub struct RequiresPermission<P: PermissionMarker>(pub Principal, pub PhantomData<P>);

impl<P: PermissionMarker> RequiresPermission<P> {
    pub fn principal(&self) -> &Principal {
        &self.0
    }

    pub fn into_principal(self) -> Principal {
        self.0
    }
}

impl<P: PermissionMarker> FromRequestParts<AppState> for RequiresPermission<P> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = authorize(&parts.headers, &state.config, Some(P::PERMISSION))?;
        Ok(Self(principal, PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_role_has_exactly_one_entry() {
        for role in Role::ALL {
            let entries = ROLE_PERMISSIONS.iter().filter(|(r, _)| *r == role).count();
            assert_eq!(entries, 1, "role {role} should appear once in the permission table");
        }
    }

    #[test]
    fn test_admin_has_every_permission() {
        for permission in Permission::ALL {
            assert!(Role::Admin.has_permission(permission), "admin should have {permission}");
        }
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Role::Viewer.has_permission(Permission::ReadCars));
        assert!(Role::Viewer.has_permission(Permission::ReadInquiries));
        assert!(!Role::Viewer.has_permission(Permission::CreateCar));
        assert!(!Role::Viewer.has_permission(Permission::UpdateCar));
        assert!(!Role::Viewer.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_editor_cannot_delete_or_manage_users() {
        assert!(Role::Editor.has_permission(Permission::CreateCar));
        assert!(!Role::Editor.has_permission(Permission::DeleteCar));
        assert!(!Role::Editor.has_permission(Permission::DeleteInquiries));
        assert!(!Role::Editor.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_plain_user_has_no_permissions() {
        assert!(Role::User.permissions().is_empty());
    }

    #[test]
    fn test_permission_sets_are_nested() {
        let set = |role: Role| role.permissions().iter().copied().collect::<HashSet<_>>();
        assert!(set(Role::Viewer).is_subset(&set(Role::Editor)));
        assert!(set(Role::Editor).is_subset(&set(Role::Admin)));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_permission_wire_names() {
        assert_eq!(serde_json::to_string(&Permission::CreateCar).unwrap(), "\"CREATE_CAR\"");
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"viewer\"");
        for permission in Permission::ALL {
            assert_eq!(serde_json::to_value(permission).unwrap(), permission.as_str());
        }
    }
}
