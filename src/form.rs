//! Channel details collected from the user
//!
//! Five scalar fields. Only the topic is validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Channel topic is required")]
    MissingTopic,
    #[error("Unknown {field} '{value}' (expected one of: {expected})")]
    UnknownOption {
        field: &'static str,
        value: String,
        expected: String,
    },
}

/// Defines a select-style field: wire values, labels, cycling, and parsing.
macro_rules! choice {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $value:literal, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Value sent to the model
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Human readable option shown in the form
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn index(self) -> usize {
                Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
            }

            pub fn next(self) -> Self {
                Self::ALL[(self.index() + 1) % Self::ALL.len()]
            }

            pub fn prev(self) -> Self {
                Self::ALL[self.index().checked_sub(1).unwrap_or(Self::ALL.len() - 1)]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = FormError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| FormError::UnknownOption {
                        field: $field,
                        value: s.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

choice! {
    /// Primary goal of the channel
    Goal, "goal" {
        Views => "views", "Maximize Views & AdSense";
        Authority => "authority", "Build Industry Authority";
        Affiliate => "affiliate", "Affiliate Marketing Income";
        CourseSales => "course sales", "Sell Courses/Products";
        PersonalBrand => "personal brand", "Grow Personal Brand";
    }
}

choice! {
    /// How experienced the creator is
    Experience, "experience" {
        Beginner => "beginner", "Beginner (Just starting)";
        Intermediate => "intermediate", "Intermediate (Some videos made)";
        Advanced => "advanced", "Advanced (Experienced creator)";
    }
}

choice! {
    /// How often the creator can publish
    Capacity, "capacity" {
        OnePerWeek => "1 per week", "1 video per week";
        TwoToThreePerWeek => "2-3 per week", "2-3 videos per week";
        Daily => "daily", "Daily uploads";
        OneToTwoPerMonth => "1-2 per month", "1-2 videos per month";
    }
}

impl Default for Goal {
    fn default() -> Self {
        Goal::Views
    }
}

impl Default for Experience {
    fn default() -> Self {
        Experience::Beginner
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::OnePerWeek
    }
}

/// Everything the user types into the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInput {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub experience: Experience,
    #[serde(default)]
    pub capacity: Capacity,
}

impl ChannelInput {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.topic.trim().is_empty() {
            return Err(FormError::MissingTopic);
        }
        Ok(())
    }

    pub fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }
}
