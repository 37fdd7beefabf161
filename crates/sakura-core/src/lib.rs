use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod analysis;
pub mod config;
pub mod error;
pub mod prompt;

pub use analysis::{
    parse_analysis, response_schema, AnalysisResponse, BeautyAdvice, HealthAdvice, SkinAnalysis,
};
pub use config::SakuraConfig;
pub use error::{Result, SakuraError};
pub use prompt::{build_instruction, Instruction};

// ── Types ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Skin,
    Makeup,
    Health,
    General,
}

/// A user-authored advice snippet that steers the consultation prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeItem {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub content: String,
}

/// A knowledge item that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKnowledgeItem {
    pub category: Category,
    pub title: String,
    pub content: String,
}

// ── Helpers ──

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Skin,
        Category::Makeup,
        Category::Health,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Skin => "Skin",
            Category::Makeup => "Makeup",
            Category::Health => "Health",
            Category::General => "General",
        }
    }
}

impl FromStr for Category {
    type Err = SakuraError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                SakuraError::Validation(format!(
                    "unknown category '{}' (expected one of Skin, Makeup, Health, General)",
                    wanted
                ))
            })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NewKnowledgeItem {
    pub fn new(category: Category, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            category,
            title: title.into(),
            content: content.into(),
        }
    }

    /// Build an item from raw user input, parsing the category name.
    pub fn parse(category: &str, title: &str, content: &str) -> Result<Self> {
        Ok(Self::new(category.parse()?, title, content))
    }

    /// Reject blank titles or contents.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SakuraError::Validation("title must not be empty".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(SakuraError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Assign a fresh id, producing a storable item.
    pub fn into_item(self) -> KnowledgeItem {
        KnowledgeItem {
            id: Uuid::new_v4().to_string(),
            category: self.category,
            title: self.title,
            content: self.content,
        }
    }
}

impl KnowledgeItem {
    /// The single line this item contributes to the prompt context.
    pub fn context_line(&self) -> String {
        format!("[{}] {}: {}", self.category, self.title, self.content)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("skin".parse::<Category>().unwrap(), Category::Skin);
        assert_eq!(" MAKEUP ".parse::<Category>().unwrap(), Category::Makeup);
        assert_eq!("Health".parse::<Category>().unwrap(), Category::Health);
        assert_eq!("general".parse::<Category>().unwrap(), Category::General);
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        let err = "Haircare".parse::<Category>().unwrap_err();
        assert!(matches!(err, SakuraError::Validation(_)));
        assert!(err.to_string().contains("Haircare"));
    }

    #[test]
    fn test_category_serializes_as_plain_name() {
        let json = serde_json::to_string(&Category::Makeup).unwrap();
        assert_eq!(json, "\"Makeup\"");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let blank_title = NewKnowledgeItem::new(Category::Skin, "  ", "Use sunscreen");
        assert!(matches!(
            blank_title.validate(),
            Err(SakuraError::Validation(_))
        ));

        let blank_content = NewKnowledgeItem::new(Category::Skin, "Sunscreen", "");
        assert!(matches!(
            blank_content.validate(),
            Err(SakuraError::Validation(_))
        ));

        let ok = NewKnowledgeItem::new(Category::Skin, "Sunscreen", "Use SPF daily");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_into_item_assigns_distinct_ids() {
        let a = NewKnowledgeItem::new(Category::General, "A", "B").into_item();
        let b = NewKnowledgeItem::new(Category::General, "A", "B").into_item();
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "A");
    }

    #[test]
    fn test_context_line() {
        let item = KnowledgeItem {
            id: "1".to_string(),
            category: Category::Health,
            title: "Green Tea".to_string(),
            content: "Drink matcha.".to_string(),
        };
        assert_eq!(item.context_line(), "[Health] Green Tea: Drink matcha.");
    }
}
