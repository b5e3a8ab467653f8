use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission taxonomy attached to principals through grants.
///
/// `Full` satisfies any requirement and is checked before the rest of the
/// effective set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionKind {
    Full,
    ViewItem,
    CreateItem,
    EditItem,
    DeleteItem,
    ManageUsers,
    ManagePermissions,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 7] = [
        PermissionKind::Full,
        PermissionKind::ViewItem,
        PermissionKind::CreateItem,
        PermissionKind::EditItem,
        PermissionKind::DeleteItem,
        PermissionKind::ManageUsers,
        PermissionKind::ManagePermissions,
    ];

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Full => "FULL",
            PermissionKind::ViewItem => "VIEW_ITEM",
            PermissionKind::CreateItem => "CREATE_ITEM",
            PermissionKind::EditItem => "EDIT_ITEM",
            PermissionKind::DeleteItem => "DELETE_ITEM",
            PermissionKind::ManageUsers => "MANAGE_USERS",
            PermissionKind::ManagePermissions => "MANAGE_PERMISSIONS",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown permission kind `{0}`")]
pub struct UnknownPermission(pub String);

impl FromStr for PermissionKind {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}
