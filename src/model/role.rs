use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    TeamMember = 3,
    Manager = 4,
    Finance = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::TeamMember),
            4 => Some(Role::Manager),
            5 => Some(Role::Finance),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// HR and Admin bypass the reporting-line filters.
    pub fn is_hr_or_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::TeamMember, Role::Manager, Role::Finance] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn parses_snake_case_names() {
        assert_eq!(Role::from_str("team_member").unwrap(), Role::TeamMember);
        assert_eq!(Role::Hr.to_string(), "hr");
        assert!(Role::from_str("owner").is_err());
    }
}
