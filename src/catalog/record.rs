use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::CatalogError;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_SLUG_LEN: usize = 50;
pub const MAX_ABILITIES_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Fighting,
    Dark,
    Dragon,
    Fairy,
    Flying,
    Ground,
    Rock,
    Steel,
    Ice,
    Bug,
    Poison,
    Ghost,
}

/// A catalog entry as posted by the record sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub types: Vec<CreatureType>,
    pub abilities: String,
    /// Sent as `weekness`, the key the backend reads.
    #[serde(rename = "weekness", alias = "weakness", default)]
    pub weakness: Vec<String>,
    pub description: String,
    pub category: String,
    pub sprite: String,
}

fn sprite_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?|ftp)://[^\s/$.?#].[^\s]*$").expect("sprite pattern is valid")
    })
}

fn check_required(field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.is_empty() {
        return Err(CatalogError::MissingField(field));
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), CatalogError> {
    let len = value.chars().count();
    if len > max {
        return Err(CatalogError::Invalid {
            field,
            reason: format!("cannot exceed {} characters (got {})", max, len),
        });
    }
    Ok(())
}

impl CatalogRecord {
    /// Trims text fields and lowercases the slug, as the store does on write.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.slug = self.slug.trim().to_lowercase();
        self.abilities = self.abilities.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        self.sprite = self.sprite.trim().to_string();
        self
    }

    /// Checks field constraints. Call on a [`normalized`](Self::normalized) record.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.id < 1 {
            return Err(CatalogError::Invalid {
                field: "id",
                reason: "must be positive".to_string(),
            });
        }
        check_required("name", &self.name)?;
        check_required("slug", &self.slug)?;
        if self.types.is_empty() {
            return Err(CatalogError::MissingField("types"));
        }
        check_required("abilities", &self.abilities)?;
        check_required("description", &self.description)?;
        check_required("category", &self.category)?;
        check_required("sprite", &self.sprite)?;

        check_len("name", &self.name, MAX_NAME_LEN)?;
        check_len("slug", &self.slug, MAX_SLUG_LEN)?;
        check_len("abilities", &self.abilities, MAX_ABILITIES_LEN)?;
        check_len("description", &self.description, MAX_DESCRIPTION_LEN)?;
        check_len("category", &self.category, MAX_CATEGORY_LEN)?;

        if self.slug.chars().any(|c| c.is_uppercase()) {
            return Err(CatalogError::Invalid {
                field: "slug",
                reason: "must be lowercase".to_string(),
            });
        }
        if !sprite_pattern().is_match(&self.sprite) {
            return Err(CatalogError::Invalid {
                field: "sprite",
                reason: format!("{} is not a valid URL", self.sprite),
            });
        }
        Ok(())
    }
}
