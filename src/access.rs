// 🔐 Access Control - roles, views and the admin login
//
// Drivers (USER) only see the map and the entry/exit kiosk.
// Admins see everything. The admin account is a single fixed
// username/password pair taken from configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LotError, LotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Map,
    EntryExit,
    Reports,
    Tasks,
    Settings,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Dashboard,
        View::Map,
        View::EntryExit,
        View::Reports,
        View::Tasks,
        View::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Map => "Slot Map",
            View::EntryExit => "Entry / Exit",
            View::Reports => "Reports",
            View::Tasks => "Tasks",
            View::Settings => "Settings",
        }
    }
}

impl Role {
    pub fn can_access(&self, view: View) -> bool {
        match self {
            Role::Admin => true,
            Role::User => matches!(view, View::Map | View::EntryExit),
        }
    }

    /// View shown right after choosing this role
    pub fn landing_view(&self) -> View {
        match self {
            Role::Admin => View::Dashboard,
            Role::User => View::EntryExit,
        }
    }

    /// Views this role may open, in navigation order
    pub fn views(&self) -> Vec<View> {
        View::ALL.iter().copied().filter(|v| self.can_access(*v)).collect()
    }
}

// ============================================================================
// ADMIN CREDENTIALS
// ============================================================================

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        AdminCredentials {
            username: "admin".to_string(),
            password: "1234".to_string(),
        }
    }
}

impl AdminCredentials {
    /// Username is case-insensitive, password is exact
    pub fn authenticate(&self, username: &str, password: &str) -> LotResult<Role> {
        if username.trim().eq_ignore_ascii_case(&self.username) && password == self.password {
            tracing::info!(user = %self.username, "admin login");
            Ok(Role::Admin)
        } else {
            tracing::warn!(user = %username, "admin login rejected");
            Err(LotError::InvalidCredentials)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_views() {
        assert_eq!(Role::User.views(), vec![View::Map, View::EntryExit]);
        assert!(!Role::User.can_access(View::Reports));
        assert!(!Role::User.can_access(View::Settings));
        assert_eq!(Role::Admin.views().len(), 6);
    }

    #[test]
    fn test_landing_views() {
        assert_eq!(Role::Admin.landing_view(), View::Dashboard);
        assert_eq!(Role::User.landing_view(), View::EntryExit);
    }

    #[test]
    fn test_authenticate() {
        let creds = AdminCredentials::default();

        assert_eq!(creds.authenticate("ADMIN", "1234"), Ok(Role::Admin));
        assert_eq!(creds.authenticate("admin", "12345"), Err(LotError::InvalidCredentials));
        assert_eq!(creds.authenticate("root", "1234"), Err(LotError::InvalidCredentials));
    }

    #[test]
    fn test_view_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&View::EntryExit).unwrap(), "\"entry-exit\"");
    }
}
