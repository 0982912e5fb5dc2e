//! Product catalog.
//!
//! The built-in catalog is embedded at compile time from `data/catalog.yaml`.
//! A catalog can also be loaded from any YAML file with the same shape: a list
//! of products in camelCase.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use furni_core::{Product, ProductId};

const BUILTIN: &str = include_str!("../data/catalog.yaml");

/// Errors that can occur while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate product id {0} in catalog")]
    DuplicateId(ProductId),
}

/// An immutable, cheaply cloneable list of products.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Arc<Vec<Product>>,
    index: Arc<HashMap<ProductId, usize>>,
}

impl Catalog {
    /// The catalog shipped with the storefront.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded document is malformed.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN)
    }

    /// Parse a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a list of products or two products
    /// share an id.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_yaml::from_str(text)?;
        Self::from_products(products)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), products = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Build a catalog from products in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two products share an id.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            if index.insert(product.id, position).is_some() {
                return Err(CatalogError::DuplicateId(product.id));
            }
        }
        Ok(Self {
            products: Arc::new(products),
            index: Arc::new(index),
        })
    }

    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).and_then(|&i| self.products.get(i))
    }

    /// Category names in order of first appearance.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for product in self.products.iter() {
            if !seen.contains(&product.category.as_str()) {
                seen.push(product.category.as_str());
            }
        }
        seen
    }

    /// Products in `category`, compared case-insensitively.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        self.filter(Some(category), None)
    }

    /// Products whose name or category contains `query`, ignoring case.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        self.filter(None, Some(query))
    }

    /// Products matching both an optional category and an optional query.
    #[must_use]
    pub fn filter(&self, category: Option<&str>, query: Option<&str>) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c.trim())))
            .filter(|p| query.is_none_or(|q| p.matches_query(q)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furni_core::Price;

    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 24);
        assert_eq!(
            catalog.categories(),
            vec!["Chairs", "Tables", "Cupboards", "Lamps", "Kitchen", "Bathroom", "Outdoor", "Decor"]
        );

        let cabinet = catalog.get(ProductId::new(11)).unwrap();
        assert_eq!(cabinet.name, "Kitchen Cabinet Set");
        assert_eq!(cabinet.price, Price::from_cents(129_900));
        assert_eq!(cabinet.original_price, Some(Price::from_cents(169_900)));
        assert_eq!(cabinet.discount_percent, Some(24));
        assert!(cabinet.in_stock);
    }

    #[test]
    fn test_by_category_ignores_case() {
        let catalog = Catalog::builtin().unwrap();
        let lamps: Vec<i32> = catalog
            .by_category("lamps")
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(lamps, vec![13, 14, 15]);
        assert!(catalog.by_category("Beds").is_empty());
    }

    #[test]
    fn test_search_matches_name_or_category() {
        let catalog = Catalog::builtin().unwrap();

        let kitchen: Vec<i32> = catalog.search("KITCHEN").iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(kitchen, vec![11, 16, 17, 18]);

        let bathroom_kitchen = catalog.filter(Some("Bathroom"), Some("cabinet"));
        assert_eq!(bathroom_kitchen.len(), 1);
        assert_eq!(bathroom_kitchen[0].name, "Bathroom Mirror Cabinet");

        assert_eq!(catalog.search("  ").len(), 24);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
- id: 1
  name: A
  price: "1.00"
  image: a.jpg
  category: Decor
- id: 1
  name: B
  price: "2.00"
  image: b.jpg
  category: Decor
"#;
        assert!(matches!(
            Catalog::from_yaml_str(yaml),
            Err(CatalogError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let yaml = r#"
- id: 1
  name: A
  price: "-1.00"
  image: a.jpg
  category: Decor
"#;
        assert!(matches!(Catalog::from_yaml_str(yaml), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "- id: 7\n  name: Stool\n  price: \"49.50\"\n  image: s.jpg\n  category: Kitchen\n").unwrap();

        let catalog = Catalog::from_path(&path).unwrap();
        assert_eq!(catalog.get(ProductId::new(7)).unwrap().price, Price::from_cents(4950));
        assert!(Catalog::from_path(&dir.path().join("missing.yaml")).is_err());
    }
}
