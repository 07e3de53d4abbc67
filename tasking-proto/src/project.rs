//! Project and user records.

use serde::{Deserialize, Serialize};

use crate::task::ProjectId;

/// Who may map or validate a project's tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Anyone logged in.
    #[default]
    Any,
    /// Gated on the user's experience level.
    Level,
    /// Members of the project's allowed teams.
    Teams,
    /// Team members who also meet the level requirement.
    TeamsLevel,
}

/// Descriptive project text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Project name.
    pub name: String,
    /// Mapping instructions (markdown).
    #[serde(default)]
    pub instructions: String,
}

/// A mapping project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project id.
    pub project_id: ProjectId,
    /// Name and instructions.
    #[serde(default)]
    pub project_info: ProjectInfo,
    /// Who may map.
    #[serde(default)]
    pub mapping_permission: Permission,
    /// Who may validate.
    #[serde(default)]
    pub validation_permission: Permission,
    /// Team names referenced by the `TEAMS` permissions.
    #[serde(default)]
    pub allowed_teams: Vec<String>,
}

impl Project {
    /// A project with open permissions and the given name.
    #[must_use]
    pub fn new(project_id: ProjectId, name: &str) -> Self {
        Self {
            project_id,
            project_info: ProjectInfo {
                name: name.to_string(),
                instructions: String::new(),
            },
            mapping_permission: Permission::Any,
            validation_permission: Permission::Any,
            allowed_teams: Vec::new(),
        }
    }
}

/// Self-reported mapper experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingLevel {
    /// New mapper.
    #[default]
    Beginner,
    /// Some experience.
    Intermediate,
    /// Experienced mapper.
    Advanced,
}

/// Platform-wide role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Blocked from contributing.
    ReadOnly,
    /// Regular contributor.
    #[default]
    Mapper,
    /// Trusted validator.
    Validator,
    /// Manages projects.
    ProjectManager,
    /// Platform administrator.
    Admin,
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    /// Numeric user id (matches `lockedBy` on task features).
    pub id: u64,
    /// OSM username (matches `actionBy` in the activity feed).
    pub username: String,
    /// Experience level.
    #[serde(default)]
    pub mapping_level: MappingLevel,
    /// Role.
    #[serde(default)]
    pub role: UserRole,
    /// Opted into expert mode (search and sort in the task list).
    #[serde(default)]
    pub is_expert: bool,
    /// Names of the teams the user belongs to.
    #[serde(default)]
    pub teams: Vec<String>,
}

impl UserDetails {
    /// A mapper with the given id and username, intermediate level.
    #[must_use]
    pub fn mapper(id: u64, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            mapping_level: MappingLevel::Intermediate,
            role: UserRole::Mapper,
            is_expert: false,
            teams: Vec::new(),
        }
    }

    /// Whether the user belongs to any of `teams`.
    #[must_use]
    pub fn in_any_team(&self, teams: &[String]) -> bool {
        self.teams.iter().any(|t| teams.contains(t))
    }
}
