use tracing::info;

use crate::error::{PosError, PosResult};
use crate::models::{Category, CategorySettings};
use crate::pos::{CatalogEvent, Pos};

/// Category ids are lowercase ASCII letters and digits.
fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl Pos {
    pub fn categories(&self) -> &[Category] {
        &self.state().categories
    }

    pub fn category_settings(&self, category_id: &str) -> CategorySettings {
        self.state()
            .category_settings
            .get(category_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn add_category(&mut self, id: &str, name: &str) -> PosResult<Category> {
        let id = normalize_id(id);
        let name = name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(PosError::Validation("category id and name are required".into()));
        }

        let category = self.commit(|state| {
            if state.categories.iter().any(|c| c.id == id) {
                return Err(PosError::Validation(format!("category id {id} is already used")));
            }
            let category = Category {
                id: id.clone(),
                name: name.to_string(),
            };
            state.categories.push(category.clone());
            state
                .category_settings
                .insert(id.clone(), CategorySettings::default());
            Ok(category)
        })?;

        info!(category = %category.id, "Category added");
        self.publish(CatalogEvent::CategoriesChanged);
        Ok(category)
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> PosResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PosError::Validation("category name cannot be empty".into()));
        }

        let category = self.commit(|state| {
            let category = state
                .categories
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| PosError::CategoryNotFound(id.to_string()))?;
            category.name = name.to_string();
            Ok(category.clone())
        })?;

        self.publish(CatalogEvent::CategoriesChanged);
        Ok(category)
    }

    pub fn update_category_settings(
        &mut self,
        id: &str,
        settings: CategorySettings,
    ) -> PosResult<()> {
        self.commit(|state| {
            if !state.categories.iter().any(|c| c.id == id) {
                return Err(PosError::CategoryNotFound(id.to_string()));
            }
            state.category_settings.insert(id.to_string(), settings);
            Ok(())
        })?;

        info!(category = %id, ?settings, "Category settings updated");
        self.publish(CatalogEvent::CategoriesChanged);
        Ok(())
    }

    /// Removes an empty category together with its settings.
    pub fn delete_category(&mut self, id: &str) -> PosResult<()> {
        self.commit(|state| {
            if !state.categories.iter().any(|c| c.id == id) {
                return Err(PosError::CategoryNotFound(id.to_string()));
            }
            let products = state.products.iter().filter(|p| p.category == id).count();
            if products > 0 {
                return Err(PosError::CategoryInUse {
                    category: id.to_string(),
                    products,
                });
            }
            state.categories.retain(|c| c.id != id);
            state.category_settings.remove(id);
            Ok(())
        })?;

        info!(category = %id, "Category deleted");
        self.publish(CatalogEvent::CategoriesChanged);
        Ok(())
    }
}
