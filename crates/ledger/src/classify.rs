use once_cell::sync::Lazy;
use serde::Serialize;

use crate::normalize::{normalize, normalize_str};

/// Keywords that mark stock coming in.
pub const DEFAULT_INTAKE: &[&str] = &[
    "keltirildi",
    "olib kelindi",
    "olib keldi",
    "kirim",
    "in",
    "import",
    "qabul qilindi",
    "keldi",
    "incoming",
    "brought",
    "received",
    "stock in",
];

/// Keywords that mark stock going out.
pub const DEFAULT_OUTFLOW: &[&str] = &[
    "ishlatildi",
    "chiqim",
    "out",
    "sarflandi",
    "berildi",
    "outflow",
    "used",
    "spent",
    "given",
    "sold",
    "sotildi",
    "stock out",
];

static BUILTIN: Lazy<Vocabulary> = Lazy::new(Vocabulary::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Intake,
    Outflow,
    Unknown,
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Outflow => write!(f, "outflow"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Intake and outflow keyword sets.
///
/// Matching is substring containment on normalized text, not word matching:
/// "in" matches anywhere inside a label. Intake is always tried first, so a
/// label hitting both sets is an intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    intake: Vec<String>,
    outflow: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::empty()
            .with_intake(DEFAULT_INTAKE.iter().copied())
            .with_outflow(DEFAULT_OUTFLOW.iter().copied())
    }
}

impl Vocabulary {
    /// Shared instance of the default vocabulary.
    pub fn builtin() -> &'static Vocabulary {
        &BUILTIN
    }

    pub fn empty() -> Self {
        Self {
            intake: Vec::new(),
            outflow: Vec::new(),
        }
    }

    /// Add intake keywords. Keywords are normalized; blanks and duplicates are skipped.
    pub fn with_intake<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_keywords(&mut self.intake, keywords);
        self
    }

    /// Add outflow keywords. Keywords are normalized; blanks and duplicates are skipped.
    pub fn with_outflow<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_keywords(&mut self.outflow, keywords);
        self
    }

    pub fn intake(&self) -> &[String] {
        &self.intake
    }

    pub fn outflow(&self) -> &[String] {
        &self.outflow
    }

    /// Classify an action label, falling back to the comment when the label
    /// matches neither set.
    pub fn classify(&self, action_label: &str, comment: Option<&str>) -> ActionCategory {
        if let Some(category) = self.match_text(&normalize_str(action_label)) {
            return category;
        }
        if comment.is_some() {
            if let Some(category) = self.match_text(&normalize(comment)) {
                return category;
            }
        }
        ActionCategory::Unknown
    }

    fn match_text(&self, normalized: &str) -> Option<ActionCategory> {
        if self.intake.iter().any(|k| normalized.contains(k.as_str())) {
            Some(ActionCategory::Intake)
        } else if self.outflow.iter().any(|k| normalized.contains(k.as_str())) {
            Some(ActionCategory::Outflow)
        } else {
            None
        }
    }
}

fn push_keywords<I, S>(list: &mut Vec<String>, keywords: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for keyword in keywords {
        let keyword = normalize_str(keyword.as_ref());
        if !keyword.is_empty() && !list.contains(&keyword) {
            list.push(keyword);
        }
    }
}

/// Classify with the built-in vocabulary.
pub fn classify(action_label: &str, comment: Option<&str>) -> ActionCategory {
    Vocabulary::builtin().classify(action_label, comment)
}
