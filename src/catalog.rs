use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::language::Language;

/// Partitions of the corpus. The first three are animal groups; the last is
/// the image-only partition, which is never part of an "all" search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "cowAndBuffalo")]
    CowAndBuffalo,
    #[serde(rename = "PoultryBirds")]
    PoultryBirds,
    #[serde(rename = "SheepGoat")]
    SheepGoat,
    #[serde(rename = "imagesheepandgoat")]
    SheepGoatImages,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::CowAndBuffalo,
        Category::PoultryBirds,
        Category::SheepGoat,
        Category::SheepGoatImages,
    ];

    pub const ANIMAL_GROUPS: [Category; 3] = [
        Category::CowAndBuffalo,
        Category::PoultryBirds,
        Category::SheepGoat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CowAndBuffalo => "cowAndBuffalo",
            Category::PoultryBirds => "PoultryBirds",
            Category::SheepGoat => "SheepGoat",
            Category::SheepGoatImages => "imagesheepandgoat",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Which categories a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    /// `None`, empty and `"all"` mean every animal group.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(CategoryFilter::All),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(CategoryFilter::All),
            Some(s) => s.parse().map(CategoryFilter::Only),
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        match self {
            CategoryFilter::All => Category::ANIMAL_GROUPS.to_vec(),
            CategoryFilter::Only(c) => vec![*c],
        }
    }
}

/// One row of the collection table, as it appears in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub category: Category,
    pub language: Language,
    pub collection: String,
}

/// Static lookup table from (category, language) to a concrete collection.
#[derive(Debug, Clone)]
pub struct CollectionCatalog {
    table: HashMap<(Category, Language), String>,
}

impl Default for CollectionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl CollectionCatalog {
    /// The table for the shipped corpus: every animal group in English,
    /// Hindi, Tamil and Malayalam, plus the English-only image partition.
    pub fn standard() -> Self {
        let mut table = HashMap::new();
        for category in Category::ANIMAL_GROUPS {
            for language in [
                Language::English,
                Language::Hindi,
                Language::Tamil,
                Language::Malayalam,
            ] {
                table.insert(
                    (category, language),
                    format!("{}{}", category.as_str(), language.collection_suffix()),
                );
            }
        }
        table.insert(
            (Category::SheepGoatImages, Language::English),
            Category::SheepGoatImages.as_str().to_string(),
        );
        Self { table }
    }

    /// Start from the standard table and apply configured entries on top.
    pub fn with_entries(entries: &[CatalogEntry]) -> Self {
        let mut catalog = Self::standard();
        for entry in entries {
            debug!(
                category = %entry.category,
                language = %entry.language,
                collection = %entry.collection,
                "Catalog override"
            );
            catalog
                .table
                .insert((entry.category, entry.language), entry.collection.clone());
        }
        catalog
    }

    /// Collection for the pair, falling back to the category's English
    /// collection when the language has no entry.
    pub fn collection_for(&self, category: Category, language: Language) -> Option<&str> {
        self.table
            .get(&(category, language))
            .or_else(|| self.table.get(&(category, Language::default())))
            .map(String::as_str)
    }

    /// Collections to search, in category declaration order, without repeats.
    pub fn select(&self, filter: CategoryFilter, language: Language) -> Vec<String> {
        let mut selected: Vec<String> = Vec::new();
        for category in filter.categories() {
            if let Some(name) = self.collection_for(category, language) {
                if !selected.iter().any(|s| s == name) {
                    selected.push(name.to_string());
                }
            }
        }
        selected
    }

    /// Reverse lookup: which (category, language) a collection name belongs to.
    pub fn locate(&self, collection: &str) -> Option<(Category, Language)> {
        Category::ALL
            .iter()
            .flat_map(|c| Language::ALL.iter().map(move |l| (*c, *l)))
            .find(|key| self.table.get(key).map(String::as_str) == Some(collection))
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.locate(collection).is_some()
    }

    /// Every known collection, ordered by category then language.
    pub fn collections(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for category in Category::ALL {
            for language in Language::ALL {
                if let Some(name) = self.table.get(&(category, language)) {
                    names.push(name.as_str());
                }
            }
        }
        names
    }

    /// Drop entries whose collection the store does not have. English
    /// entries stay so that the fallback always resolves; they are only
    /// reported. Returns the names that were removed.
    pub fn retain_populated(&mut self, populated: &HashSet<String>) -> Vec<String> {
        let mut removed = Vec::new();
        self.table.retain(|(category, language), name| {
            if populated.contains(name.as_str()) {
                return true;
            }
            if *language == Language::default() {
                warn!(category = %category, collection = %name, "Default collection is not populated");
                return true;
            }
            removed.push(name.clone());
            false
        });
        removed.sort();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_names() {
        let catalog = CollectionCatalog::standard();
        assert_eq!(
            catalog.collection_for(Category::CowAndBuffalo, Language::English),
            Some("cowAndBuffalo")
        );
        assert_eq!(
            catalog.collection_for(Category::PoultryBirds, Language::Tamil),
            Some("PoultryBirdsTamil")
        );
        assert_eq!(
            catalog.collection_for(Category::SheepGoat, Language::Hindi),
            Some("SheepGoatHindi")
        );
        assert_eq!(catalog.collections().len(), 13);
    }

    #[test]
    fn missing_language_falls_back_to_default() {
        let catalog = CollectionCatalog::standard();
        assert_eq!(
            catalog.collection_for(Category::SheepGoat, Language::Telugu),
            Some("SheepGoat")
        );
        assert_eq!(
            catalog.collection_for(Category::SheepGoatImages, Language::Hindi),
            Some("imagesheepandgoat")
        );
    }

    #[test]
    fn all_selects_animal_groups_in_order() {
        let catalog = CollectionCatalog::standard();
        assert_eq!(
            catalog.select(CategoryFilter::All, Language::Hindi),
            vec!["cowAndBuffaloHindi", "PoultryBirdsHindi", "SheepGoatHindi"]
        );
    }

    #[test]
    fn locate_reverses_table() {
        let catalog = CollectionCatalog::standard();
        assert_eq!(
            catalog.locate("PoultryBirdsMalayalam"),
            Some((Category::PoultryBirds, Language::Malayalam))
        );
        assert_eq!(catalog.locate("nope"), None);
    }

    #[test]
    fn retain_populated_drops_missing_translations() {
        let mut catalog = CollectionCatalog::standard();
        let populated: HashSet<String> = ["cowAndBuffalo", "cowAndBuffaloHindi"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let removed = catalog.retain_populated(&populated);
        assert!(removed.contains(&"cowAndBuffaloTamil".to_string()));
        assert!(!removed.contains(&"PoultryBirds".to_string()));
        assert_eq!(
            catalog.collection_for(Category::CowAndBuffalo, Language::Tamil),
            Some("cowAndBuffalo")
        );
        assert_eq!(
            catalog.collection_for(Category::CowAndBuffalo, Language::Hindi),
            Some("cowAndBuffaloHindi")
        );
    }

    #[test]
    fn overrides_replace_entries() {
        let catalog = CollectionCatalog::with_entries(&[CatalogEntry {
            category: Category::PoultryBirds,
            language: Language::Telugu,
            collection: "PoultryBirdsTelugu".into(),
        }]);
        assert_eq!(
            catalog.collection_for(Category::PoultryBirds, Language::Telugu),
            Some("PoultryBirdsTelugu")
        );
    }

    #[test]
    fn category_filter_parsing() {
        assert_eq!(CategoryFilter::parse(None).unwrap(), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("ALL")).unwrap(), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(Some("poultrybirds")).unwrap(),
            CategoryFilter::Only(Category::PoultryBirds)
        );
        assert!(CategoryFilter::parse(Some("horses")).is_err());
    }
}
