//! # Clothing Catalog
//!
//! Catalog items are image objects stored under `{prefix}/{category}`. The
//! lister groups them by [`Category`]; the recommendation selector picks a
//! fixed number of items from each group.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{is_image_path, ObjectStore};

/// Number of items recommended per category.
pub const RECOMMENDATIONS_PER_CATEGORY: usize = 2;

/// Categories listed when the caller does not name any.
pub const DEFAULT_CATEGORIES: [Category; 2] = [Category::Tops, Category::Bottoms];

/// A clothing category, named after its storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tops,
    Bottoms,
    Overwears,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Tops, Category::Bottoms, Category::Overwears];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tops => "tops",
            Self::Bottoms => "bottoms",
            Self::Overwears => "overwears",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

/// Storage paths grouped by category, in storage order within each group.
pub type Catalog = BTreeMap<Category, Vec<String>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Invalid category {0:?}; expected one of tops, bottoms, overwears")]
    UnknownCategory(String),

    #[error("Not enough images in category {category}: found {found}, need 2")]
    InsufficientItems { category: Category, found: usize },
}

/// List image objects under `{prefix}/{category}` for each requested category.
///
/// Listing is best-effort. A storage failure stops the scan and the
/// partially filled catalog is returned; every requested category is present
/// in the result, possibly empty.
pub async fn list_catalog(
    store: &dyn ObjectStore,
    prefix: &str,
    categories: Option<&[Category]>,
) -> Catalog {
    let categories = categories.unwrap_or(&DEFAULT_CATEGORIES);
    let mut catalog: Catalog = categories.iter().map(|c| (*c, Vec::new())).collect();

    for category in categories {
        let category_prefix = format!("{prefix}/{category}");
        match store.list(&category_prefix).await {
            Ok(paths) => {
                let entry = catalog.entry(*category).or_default();
                entry.extend(paths.into_iter().filter(|p| is_image_path(p)));
            }
            Err(error) => {
                tracing::warn!(
                    prefix = %category_prefix,
                    %error,
                    "catalog listing failed, returning partial results"
                );
                break;
            }
        }
    }

    catalog
}

/// Take the first [`RECOMMENDATIONS_PER_CATEGORY`] items of every category.
pub fn select_recommendations(catalog: &Catalog) -> Result<Catalog, CatalogError> {
    catalog
        .iter()
        .map(|(category, items)| {
            if items.len() < RECOMMENDATIONS_PER_CATEGORY {
                return Err(CatalogError::InsufficientItems {
                    category: *category,
                    found: items.len(),
                });
            }
            Ok((
                *category,
                items[..RECOMMENDATIONS_PER_CATEGORY].to_vec(),
            ))
        })
        .collect()
}
