//! Activity labels produced by the classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical activity recognised by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLabel {
    Others,
    Walking,
    Running,
    Standing,
    Sitting,
    Upstairs,
    Downstairs,
    /// The model returned a code outside the known set
    Unknown,
}

impl ActivityLabel {
    /// Every label the model can emit, in code order.
    pub const KNOWN: [ActivityLabel; 7] = [
        ActivityLabel::Others,
        ActivityLabel::Walking,
        ActivityLabel::Running,
        ActivityLabel::Standing,
        ActivityLabel::Sitting,
        ActivityLabel::Upstairs,
        ActivityLabel::Downstairs,
    ];

    /// Map a numeric model output to a label.
    ///
    /// SVM-style models return the class as a float; anything that is not
    /// exactly one of the trained class codes maps to `Unknown`.
    pub fn from_code(code: f64) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|label| label.code().map(f64::from) == Some(code))
            .unwrap_or(ActivityLabel::Unknown)
    }

    /// Training class code, `None` for `Unknown`.
    pub fn code(self) -> Option<u8> {
        match self {
            ActivityLabel::Others => Some(0),
            ActivityLabel::Walking => Some(1),
            ActivityLabel::Running => Some(2),
            ActivityLabel::Standing => Some(3),
            ActivityLabel::Sitting => Some(4),
            ActivityLabel::Upstairs => Some(5),
            ActivityLabel::Downstairs => Some(6),
            ActivityLabel::Unknown => None,
        }
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityLabel::Others => "Others",
            ActivityLabel::Walking => "Walking",
            ActivityLabel::Running => "Running",
            ActivityLabel::Standing => "Standing",
            ActivityLabel::Sitting => "Sitting",
            ActivityLabel::Upstairs => "Upstairs",
            ActivityLabel::Downstairs => "Downstairs",
            ActivityLabel::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for ActivityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::KNOWN
            .iter()
            .chain(std::iter::once(&ActivityLabel::Unknown))
            .copied()
            .find(|label| label.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown activity label: {wanted}"))
    }
}
