use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::principal::Role;
use crate::error::ParseError;

/// Top-level dashboard screens, in canonical menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Citizen,
    Industry,
    Government,
}

impl View {
    pub const ALL: [View; 3] = [View::Citizen, View::Industry, View::Government];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Citizen => "citizen",
            View::Industry => "industry",
            View::Government => "government",
        }
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            View::Citizen => "Citizen Mode",
            View::Industry => "Industry Mode",
            View::Government => "Government Mode",
        }
    }

    pub(crate) fn position(&self) -> usize {
        match self {
            View::Citizen => 0,
            View::Industry => 1,
            View::Government => 2,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Ok(View::Citizen),
            "industry" => Ok(View::Industry),
            "government" | "gov" => Ok(View::Government),
            _ => Err(ParseError::new("view", s)),
        }
    }
}

/// Roles allowed to open a view. Each higher-privilege view admits a subset of
/// the roles admitted by the view before it.
pub fn permitted_roles(view: View) -> &'static [Role] {
    match view {
        View::Citizen => &[Role::Citizen, Role::Industry, Role::Government],
        View::Industry => &[Role::Industry, Role::Government],
        View::Government => &[Role::Government],
    }
}

pub fn can_access(role: Role, view: View) -> bool {
    permitted_roles(view).contains(&role)
}

/// Views a role may open, in canonical order (citizen, industry, government).
pub fn select_visible_views(role: Role) -> Vec<View> {
    View::ALL.iter().copied().filter(|v| can_access(role, *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_table_is_exact() {
        let expected = [
            (Role::Citizen, View::Citizen, true),
            (Role::Citizen, View::Industry, false),
            (Role::Citizen, View::Government, false),
            (Role::Industry, View::Citizen, true),
            (Role::Industry, View::Industry, true),
            (Role::Industry, View::Government, false),
            (Role::Government, View::Citizen, true),
            (Role::Government, View::Industry, true),
            (Role::Government, View::Government, true),
        ];
        for (role, view, allowed) in expected {
            assert_eq!(can_access(role, view), allowed, "{} -> {}", role, view);
        }
    }

    #[test]
    fn visible_views_keep_canonical_order() {
        assert_eq!(select_visible_views(Role::Citizen), vec![View::Citizen]);
        assert_eq!(select_visible_views(Role::Industry), vec![View::Citizen, View::Industry]);
        assert_eq!(
            select_visible_views(Role::Government),
            vec![View::Citizen, View::Industry, View::Government]
        );
    }

    #[test]
    fn privilege_nesting_is_monotonic() {
        for pair in View::ALL.windows(2) {
            let wider = permitted_roles(pair[0]);
            for role in permitted_roles(pair[1]) {
                assert!(wider.contains(role), "{} admits {} but {} does not", pair[1], role, pair[0]);
            }
        }
    }

    #[test]
    fn view_parse_and_labels() {
        assert_eq!("GOV".parse::<View>().unwrap(), View::Government);
        assert_eq!(View::Industry.label(), "Industry Mode");
        assert!("settings".parse::<View>().is_err());
        assert_eq!(View::ALL.iter().map(|v| v.position()).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
