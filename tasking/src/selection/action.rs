//! Permissions and the status → action lookup.

use tasking_proto::project::{MappingLevel, Permission, Project, UserDetails, UserRole};
use tasking_proto::task::TaskStatus;

use super::TaskAction;

/// Whether `user` may map tasks of `project`.
#[must_use]
pub fn can_map(project: &Project, user: &UserDetails) -> bool {
    match user.role {
        UserRole::Admin | UserRole::ProjectManager => return true,
        UserRole::ReadOnly => return false,
        UserRole::Mapper | UserRole::Validator => {}
    }
    let level_ok = user.mapping_level != MappingLevel::Beginner;
    let team_ok = user.in_any_team(&project.allowed_teams);
    match project.mapping_permission {
        Permission::Any => true,
        Permission::Level => level_ok,
        Permission::Teams => team_ok,
        Permission::TeamsLevel => level_ok && team_ok,
    }
}

/// Whether `user` may validate tasks of `project`.
#[must_use]
pub fn can_validate(project: &Project, user: &UserDetails) -> bool {
    match user.role {
        UserRole::Admin | UserRole::ProjectManager => return true,
        UserRole::ReadOnly => return false,
        UserRole::Mapper | UserRole::Validator => {}
    }
    let level_ok =
        user.role == UserRole::Validator || user.mapping_level == MappingLevel::Advanced;
    let team_ok = user.in_any_team(&project.allowed_teams);
    match project.validation_permission {
        Permission::Any => true,
        Permission::Level => level_ok,
        Permission::Teams => team_ok,
        Permission::TeamsLevel => level_ok && team_ok,
    }
}

/// What a user may do on a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// May lock tasks for mapping.
    pub can_map: bool,
    /// May lock tasks for validation.
    pub can_validate: bool,
}

impl Capabilities {
    /// Evaluates the project's permissions for `user`.
    #[must_use]
    pub fn for_user(project: &Project, user: &UserDetails) -> Self {
        Self {
            can_map: can_map(project, user),
            can_validate: can_validate(project, user),
        }
    }

    /// The action offered while nothing is selected.
    ///
    /// Always a first-pick variant, so deselecting returns to the same
    /// default however many tasks were picked before.
    #[must_use]
    pub const fn idle_action(self) -> Option<TaskAction> {
        if self.can_map {
            Some(TaskAction::MapATask)
        } else if self.can_validate {
            Some(TaskAction::ValidateATask)
        } else {
            None
        }
    }
}

/// The action for a single task that the user does not hold a lock on.
///
/// `first_pick` selects between the `A` and `Another` variants.
#[must_use]
pub const fn resolve_action(
    status: TaskStatus,
    first_pick: bool,
    capabilities: Capabilities,
) -> Option<TaskAction> {
    if status.is_mappable() && capabilities.can_map {
        Some(if first_pick {
            TaskAction::MapATask
        } else {
            TaskAction::MapAnotherTask
        })
    } else if status.is_validatable() && capabilities.can_validate {
        Some(if first_pick {
            TaskAction::ValidateATask
        } else {
            TaskAction::ValidateAnotherTask
        })
    } else {
        None
    }
}
