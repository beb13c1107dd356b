// src/tribool.rs

//! Three-valued answers for policy questions

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A yes / no / no-opinion answer
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tribool {
    True,
    False,
    #[default]
    Indeterminate,
}

impl Tribool {
    pub fn is_true(self) -> bool {
        self == Tribool::True
    }

    pub fn is_false(self) -> bool {
        self == Tribool::False
    }

    pub fn is_indeterminate(self) -> bool {
        self == Tribool::Indeterminate
    }
}

impl From<bool> for Tribool {
    fn from(value: bool) -> Self {
        if value { Tribool::True } else { Tribool::False }
    }
}

impl From<Option<bool>> for Tribool {
    fn from(value: Option<bool>) -> Self {
        value.map(Tribool::from).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_option() {
        assert_eq!(Tribool::from(Some(true)), Tribool::True);
        assert_eq!(Tribool::from(Some(false)), Tribool::False);
        assert_eq!(Tribool::from(None), Tribool::Indeterminate);
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(Tribool::Indeterminate.to_string(), "indeterminate");
        assert_eq!(Tribool::from_str("false").unwrap(), Tribool::False);
    }
}
