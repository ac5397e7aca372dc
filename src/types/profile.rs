//! User profiles and the per-request session

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::PipelineError;

/// Role tier of an administrator.
pub const TIER_ADMIN: i32 = 1;
/// Role tier of a supervisor; the least privileged tier allowed to import and export.
pub const TIER_SUPERVISOR: i32 = 2;
/// Role tier of a table operator, limited to their assigned table.
pub const TIER_OPERATOR: i32 = 3;

/// Application user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub nombre: String,
    pub role_tier: i32,
    pub mesa_numero: Option<i32>,
}

/// The authenticated caller, passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role_tier: i32,
    pub mesa_numero: Option<i32>,
}

impl Session {
    pub fn new(user_id: Uuid, role_tier: i32, mesa_numero: Option<i32>) -> Self {
        Self { user_id, role_tier, mesa_numero }
    }

    /// Fails unless the caller's tier is `max_tier` or more privileged.
    pub fn require_tier(&self, max_tier: i32, action: &str) -> Result<(), PipelineError> {
        if self.role_tier <= max_tier {
            Ok(())
        } else {
            Err(PipelineError::PermissionDenied(format!(
                "{} requiere nivel {} o superior (nivel actual {})",
                action, max_tier, self.role_tier
            )))
        }
    }

    /// Whether the caller may record votes at the given table.
    pub fn can_mark_table(&self, mesa_numero: Option<i32>) -> bool {
        if self.role_tier <= TIER_SUPERVISOR {
            return true;
        }
        self.role_tier == TIER_OPERATOR
            && self.mesa_numero.is_some()
            && self.mesa_numero == mesa_numero
    }
}

impl From<UserProfile> for Session {
    fn from(profile: UserProfile) -> Self {
        Session::new(profile.id, profile.role_tier, profile.mesa_numero)
    }
}
