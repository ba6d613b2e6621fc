// src/models/program.rs

use serde::{Deserialize, Serialize};

/// Represents the 'programs' table: an academic program students can be pointed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub abbreviation: String,

    /// Free-text domain (e.g., "Science", "Engineering").
    /// Recommendation matching compares it against test categories.
    pub field: String,

    /// 'Bachelor', 'Master', 'PhD', 'Diploma' or 'Certificate'.
    pub level: String,

    /// Years.
    pub duration: i32,

    #[serde(default)]
    pub required_skills: Vec<String>,

    /// 'Growing', 'Stable', 'Declining' or 'Unknown'.
    pub career_outlook: String,

    pub average_salary: Option<i64>,

    pub is_active: bool,
}

impl Program {
    /// Case-insensitive substring match of `category` inside this program's field.
    pub fn field_matches(&self, category: &str) -> bool {
        self.field
            .to_lowercase()
            .contains(&category.to_lowercase())
    }
}
