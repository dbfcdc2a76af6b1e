//! Seed the catalog from a YAML file.
//!
//! The whole file is parsed and validated before connecting to the
//! database. Products whose slug already exists are skipped, so seeding
//! twice is harmless.
//!
//! ```yaml
//! - name: Laptop
//!   slug: laptop
//!   description: 14-inch ultrabook
//!   price: "999.99"
//!   specs:
//!     - key: RAM
//!       value: 16GB
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use product_manager_core::Email;
use product_manager_core::forms::{
    FieldErrorKind, ProductInput, SpecRowInput, validate_spec_rows,
};
use product_manager_storefront::db::{self, PgStore, UserStore};
use product_manager_storefront::models::CurrentUser;
use product_manager_storefront::services::{CatalogService, MediaStorage, ServiceError};

use super::database_url;

/// One product in the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Quoted decimal, e.g. `"19.99"`.
    pub price: String,
    #[serde(default)]
    pub specs: Vec<SeedSpec>,
}

/// One specification row in the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSpec {
    pub key: String,
    pub value: String,
}

impl SeedProduct {
    fn input(&self) -> ProductInput {
        ProductInput {
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            price: Some(self.price.clone()),
        }
    }

    fn rows(&self) -> Vec<SpecRowInput> {
        self.specs
            .iter()
            .map(|spec| SpecRowInput::new(spec.key.clone(), spec.value.clone()))
            .collect()
    }
}

/// Parse seed file contents.
///
/// # Errors
///
/// Returns an error if the YAML does not match the seed format.
pub fn parse(content: &str) -> Result<Vec<SeedProduct>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Every validation problem in the seed, one line per field.
#[must_use]
pub fn validate(products: &[SeedProduct]) -> Vec<String> {
    let mut problems = Vec::new();

    for product in products {
        let mut errors = product.input().validate().err().unwrap_or_default();
        if let Err(spec_errors) = validate_spec_rows(&product.rows(), &[]) {
            errors.extend(spec_errors);
        }
        problems.extend(
            errors
                .errors()
                .iter()
                .map(|e| format!("{}: {}: {}", product.slug, e.field, e.kind)),
        );
    }

    problems
}

/// Seed products from a YAML file on behalf of the user with `email`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the user doesn't
/// exist, or the database fails.
pub async fn products(email: &str, file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;
    info!(products = seed.len(), "Parsed seed file");

    let problems = validate(&seed);
    if !problems.is_empty() {
        error!("Seed validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(format!("{} validation errors found", problems.len()).into());
    }

    let email = Email::parse(email)?;
    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    info!("Connected to database");

    let (user, _) = store
        .get_user_with_password(&email)
        .await?
        .ok_or_else(|| format!("No user with email {email}"))?;
    let owner = CurrentUser::from(user);

    let media_root = std::env::var("STOREFRONT_MEDIA_ROOT").unwrap_or_else(|_| "media".to_owned());
    let media = MediaStorage::new(media_root);
    let catalog = CatalogService::new(&store, &media);

    let mut inserted = 0usize;
    let mut skipped = 0usize;
    for product in &seed {
        match catalog
            .create(&owner, &product.input(), &product.rows(), None)
            .await
        {
            Ok(_) => inserted += 1,
            Err(ServiceError::ValidationFailed(errors))
                if errors.has("slug", &FieldErrorKind::DuplicateSlug) =>
            {
                warn!(slug = %product.slug, "Product already exists, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
- name: Laptop
  slug: laptop
  description: 14-inch ultrabook
  price: "999.99"
  specs:
    - key: RAM
      value: 16GB
    - key: Storage
      value: 512GB SSD
- name: Mouse
  slug: mouse
  description: Wireless mouse
  price: "25.00"
"#;

    #[test]
    fn test_parse_sample() {
        let seed = parse(SAMPLE).unwrap();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].specs.len(), 2);
        assert!(seed[1].specs.is_empty());
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validation_reports_each_problem() {
        let seed = parse(
            r#"
- name: Broken
  slug: "not a slug"
  description: Bad data
  price: "0"
  specs:
    - key: Color
      value: ""
"#,
        )
        .unwrap();

        let problems = validate(&seed);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("slug")));
        assert!(problems.iter().any(|p| p.contains("Price must be greater than zero.")));
        assert!(problems.iter().any(|p| p.contains("specs-0-value")));
    }
}
