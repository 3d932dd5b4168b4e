//! Moderation categories.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// A fixed classification axis for unsafe content.
///
/// The variant names match the category names used by the moderation
/// service, so [`Display`] and [`FromStr`] round-trip its wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Violent content.
    Violence,
    /// Self-harm content.
    SelfHarm,
    /// Sexual content.
    Sexual,
    /// Hateful content.
    Hate,
}

impl Category {
    /// Every category, in report order.
    pub const ALL: [Category; 4] = [
        Category::Violence,
        Category::SelfHarm,
        Category::Sexual,
        Category::Hate,
    ];

    /// The service-facing name of the category.
    pub fn name(self) -> &'static str {
        match self {
            Category::Violence => "Violence",
            Category::SelfHarm => "SelfHarm",
            Category::Sexual => "Sexual",
            Category::Hate => "Hate",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown category: {value}"))
    }
}
