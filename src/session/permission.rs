//! Per-session permission resolution.
//!
//! Resolved once when the session opens and cached for its lifetime.
//! A grant revoked while the session is open is not observed.

use crate::store::{Backend, Project, Role, ShareAccess, StoreError, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_edit: bool,
    pub is_owner: bool,
}

impl Permissions {
    pub const OWNER: Self = Self {
        can_edit: true,
        is_owner: true,
    };
    pub const EDITOR: Self = Self {
        can_edit: true,
        is_owner: false,
    };
    pub const READER: Self = Self {
        can_edit: false,
        is_owner: false,
    };
}

/// Combine ownership, an explicit grant and the role override.
///
/// `None` means no access at all.
pub fn resolve(is_owner: bool, share: Option<ShareAccess>, role: Role) -> Option<Permissions> {
    if is_owner {
        return Some(Permissions::OWNER);
    }
    if role == Role::Cxo {
        return Some(Permissions::EDITOR);
    }
    match share? {
        ShareAccess::Edit => Some(Permissions::EDITOR),
        ShareAccess::Read => Some(Permissions::READER),
    }
}

/// Query the share store for `user` on `project`.
pub async fn load_permissions(
    backend: &Backend,
    project: &Project,
    user: &User,
) -> Result<Option<Permissions>, StoreError> {
    let is_owner = project.owner_id == user.id;
    let share = if is_owner {
        None
    } else {
        backend.shares.get_permission(&project.id, &user.id).await?
    };
    let role = backend.shares.role_for_email(&user.email).await?;
    Ok(resolve(is_owner, share, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_wins() {
        assert_eq!(
            resolve(true, Some(ShareAccess::Read), Role::Member),
            Some(Permissions::OWNER)
        );
    }

    #[test]
    fn test_share_grants() {
        assert_eq!(
            resolve(false, Some(ShareAccess::Edit), Role::Member),
            Some(Permissions::EDITOR)
        );
        assert_eq!(
            resolve(false, Some(ShareAccess::Read), Role::Member),
            Some(Permissions::READER)
        );
    }

    #[test]
    fn test_cxo_override_edits_without_owning() {
        assert_eq!(resolve(false, None, Role::Cxo), Some(Permissions::EDITOR));
        assert_eq!(
            resolve(false, Some(ShareAccess::Read), Role::Cxo),
            Some(Permissions::EDITOR)
        );
    }

    #[test]
    fn test_no_signal_denies() {
        assert_eq!(resolve(false, None, Role::Member), None);
    }
}
