//! Product catalog, ingredients and stock levels.

use chrono::Local;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PosError, PosResult};
use crate::models::{
    Ingredient, InventoryProduct, InventoryReport, LowStock, Product, StockChange, StockChanges,
    StockStatus,
};
use crate::pos::{today_label, CatalogEvent, Pos};
use crate::seed;
use crate::state::PosState;

fn generated_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn validate_product(state: &PosState, product: &Product) -> PosResult<()> {
    if product.name.trim().is_empty() {
        return Err(PosError::Validation("product name cannot be empty".into()));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(PosError::Validation(format!(
            "invalid price for {}: {}",
            product.name, product.price
        )));
    }
    if product.current_stock.is_some_and(|s| s < 0) || product.min_stock.is_some_and(|s| s < 0) {
        return Err(PosError::Validation("stock values cannot be negative".into()));
    }
    if !state.categories.iter().any(|c| c.id == product.category) {
        return Err(PosError::CategoryNotFound(product.category.clone()));
    }
    for line in &product.recipe {
        if !state.ingredients.iter().any(|i| i.id == line.ingredient_id) {
            return Err(PosError::IngredientNotFound(line.ingredient_id.clone()));
        }
        if line.amount <= 0.0 {
            return Err(PosError::Validation(format!(
                "recipe amount for {} must be positive",
                line.ingredient_id
            )));
        }
    }
    Ok(())
}

/// Keeps the stock row of a unit-counted product in line with its catalog entry.
fn sync_inventory(state: &mut PosState, product: &Product) {
    if let Some(row) = state.inventory.iter_mut().find(|row| row.id == product.id) {
        row.name = product.name.clone();
        row.category = product.category.clone();
        row.price = product.price;
        if let Some(supplier) = product.supplier.as_ref().filter(|s| !s.is_empty()) {
            row.supplier = supplier.clone();
        }
        if let Some(unit) = product.unit.as_ref().filter(|u| !u.is_empty()) {
            row.unit = unit.clone();
        }
        if let Some(stock) = product.current_stock {
            row.current_stock = stock;
        }
        if let Some(min) = product.min_stock {
            row.min_stock = min;
        }
        return;
    }

    if product.uses_recipe() {
        return;
    }

    let (stock, min, unit, supplier) = seed::inventory_defaults(&product.category);
    debug!(product = %product.name, "Adding product to stock tracking");
    state.inventory.push(InventoryProduct {
        id: product.id.clone(),
        name: product.name.clone(),
        category: product.category.clone(),
        current_stock: product.current_stock.unwrap_or(stock),
        min_stock: product.min_stock.unwrap_or(min),
        unit: product.unit.clone().unwrap_or_else(|| unit.to_string()),
        supplier: product.supplier.clone().unwrap_or_else(|| supplier.to_string()),
        last_restocked: today_label(),
        price: product.price,
    });
}

/// Unit-counted rows that take part in stock counts. Cocktail portions are
/// covered by their ingredients.
fn counted_rows(state: &PosState) -> impl Iterator<Item = &InventoryProduct> {
    state.inventory.iter().filter(|row| row.category != seed::COCKTAILS)
}

fn stock_change(id: &str, name: &str, unit: &str, before: f64, now: f64) -> StockChange {
    StockChange {
        id: id.to_string(),
        name: name.to_string(),
        unit: unit.to_string(),
        before,
        now,
        used: before - now,
    }
}

impl Pos {
    /// Products whose category is shown on the order screen.
    pub fn menu(&self) -> Vec<&Product> {
        let state = self.state();
        state
            .products
            .iter()
            .filter(|p| {
                state
                    .category_settings
                    .get(&p.category)
                    .map_or(true, |s| s.show_in_menu)
            })
            .collect()
    }

    /// Creates or replaces a product. An empty id gets a fresh one.
    pub fn upsert_product(&mut self, mut product: Product) -> PosResult<Product> {
        product.name = product.name.trim().to_string();
        if product.id.is_empty() {
            product.id = generated_id("p");
        }
        product.is_cocktail = product.is_cocktail || !product.recipe.is_empty();

        let product = self.commit(|state| {
            validate_product(state, &product)?;
            match state.products.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => *existing = product.clone(),
                None => state.products.push(product.clone()),
            }
            sync_inventory(state, &product);
            Ok(product)
        })?;

        info!(product = %product.id, name = %product.name, "Product saved");
        self.publish(CatalogEvent::ProductsChanged);
        Ok(product)
    }

    /// Removes a product from the catalog and from stock tracking.
    pub fn delete_product(&mut self, product_id: &str) -> PosResult<()> {
        self.commit(|state| {
            let before = state.products.len();
            state.products.retain(|p| p.id != product_id);
            if state.products.len() == before {
                return Err(PosError::ProductNotFound(product_id.to_string()));
            }
            state.inventory.retain(|row| row.id != product_id);
            Ok(())
        })?;

        info!(product = %product_id, "Product deleted");
        self.publish(CatalogEvent::ProductsChanged);
        Ok(())
    }

    pub fn upsert_ingredient(&mut self, mut ingredient: Ingredient) -> PosResult<Ingredient> {
        ingredient.name = ingredient.name.trim().to_string();
        if ingredient.name.is_empty() || ingredient.unit.trim().is_empty() {
            return Err(PosError::Validation("ingredient name and unit are required".into()));
        }
        if ingredient.current_stock < 0.0 || ingredient.min_stock < 0.0 {
            return Err(PosError::Validation("stock values cannot be negative".into()));
        }
        if ingredient.id.is_empty() {
            ingredient.id = generated_id("ing");
        }

        let ingredient = self.commit(|state| {
            match state.ingredients.iter_mut().find(|i| i.id == ingredient.id) {
                Some(existing) => *existing = ingredient.clone(),
                None => state.ingredients.push(ingredient.clone()),
            }
            Ok(ingredient)
        })?;

        info!(ingredient = %ingredient.id, name = %ingredient.name, "Ingredient saved");
        self.publish(CatalogEvent::IngredientsChanged);
        Ok(ingredient)
    }

    /// Deletes an ingredient no recipe uses any more.
    pub fn delete_ingredient(&mut self, ingredient_id: &str) -> PosResult<()> {
        self.commit(|state| {
            if !state.ingredients.iter().any(|i| i.id == ingredient_id) {
                return Err(PosError::IngredientNotFound(ingredient_id.to_string()));
            }
            let users: Vec<&str> = state
                .products
                .iter()
                .filter(|p| p.recipe.iter().any(|line| line.ingredient_id == ingredient_id))
                .map(|p| p.name.as_str())
                .collect();
            if !users.is_empty() {
                return Err(PosError::Validation(format!(
                    "ingredient {ingredient_id} is used by {}",
                    users.join(", ")
                )));
            }
            state.ingredients.retain(|i| i.id != ingredient_id);
            Ok(())
        })?;

        info!(ingredient = %ingredient_id, "Ingredient deleted");
        self.publish(CatalogEvent::IngredientsChanged);
        Ok(())
    }

    pub fn restock_ingredient(&mut self, ingredient_id: &str, amount: f64) -> PosResult<Ingredient> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PosError::Validation(format!("restock amount must be positive, got {amount}")));
        }

        let ingredient = self.commit(|state| {
            let ingredient = state
                .ingredients
                .iter_mut()
                .find(|i| i.id == ingredient_id)
                .ok_or_else(|| PosError::IngredientNotFound(ingredient_id.to_string()))?;
            ingredient.current_stock += amount;
            ingredient.last_restocked = today_label();
            Ok(ingredient.clone())
        })?;

        info!(
            ingredient = %ingredient.id,
            added = %amount,
            stock = %ingredient.current_stock,
            "Ingredient restocked"
        );
        self.publish(CatalogEvent::StockChanged);
        Ok(ingredient)
    }

    /// Sets the counted stock of a product and stamps the restock date.
    pub fn set_stock(&mut self, product_id: &str, stock: i64) -> PosResult<InventoryProduct> {
        if stock < 0 {
            return Err(PosError::Validation("stock cannot be negative".into()));
        }

        let row = self.commit(|state| {
            let row = state
                .inventory
                .iter_mut()
                .find(|row| row.id == product_id)
                .ok_or_else(|| PosError::ProductNotFound(product_id.to_string()))?;
            row.current_stock = stock;
            row.last_restocked = today_label();
            let row = row.clone();

            if let Some(product) = state.products.iter_mut().find(|p| p.id == product_id) {
                product.current_stock = Some(stock);
            }
            Ok(row)
        })?;

        info!(product = %row.id, stock = row.current_stock, "Stock updated");
        self.publish(CatalogEvent::StockChanged);
        Ok(row)
    }

    pub fn set_min_stock(&mut self, product_id: &str, min_stock: i64) -> PosResult<InventoryProduct> {
        if min_stock < 0 {
            return Err(PosError::Validation("minimum stock cannot be negative".into()));
        }

        let row = self.commit(|state| {
            let row = state
                .inventory
                .iter_mut()
                .find(|row| row.id == product_id)
                .ok_or_else(|| PosError::ProductNotFound(product_id.to_string()))?;
            row.min_stock = min_stock;
            Ok(row.clone())
        })?;

        self.publish(CatalogEvent::StockChanged);
        Ok(row)
    }

    /// Stock lines that are critical or running low, worst first. Categories
    /// hidden from inventory are skipped.
    pub fn low_stock(&self) -> Vec<LowStock> {
        let state = self.state();
        let shown = |category: &str| {
            state
                .category_settings
                .get(category)
                .map_or(true, |s| s.show_in_inventory)
        };

        let products = state.inventory.iter().filter(|row| shown(&row.category)).map(|row| {
            LowStock {
                id: row.id.clone(),
                name: row.name.clone(),
                current_stock: row.current_stock as f64,
                min_stock: row.min_stock as f64,
                unit: row.unit.clone(),
                status: StockStatus::of(row.current_stock as f64, row.min_stock as f64),
            }
        });
        let ingredients = state.ingredients.iter().map(|i| LowStock {
            id: i.id.clone(),
            name: i.name.clone(),
            current_stock: i.current_stock,
            min_stock: i.min_stock,
            unit: i.unit.clone(),
            status: StockStatus::of(i.current_stock, i.min_stock),
        });

        let mut lines: Vec<LowStock> = products
            .chain(ingredients)
            .filter(|line| line.status != StockStatus::Normal)
            .collect();
        lines.sort_by_key(|line| line.status);
        lines
    }

    /// Snapshots current unit and ingredient stock, replacing the previous
    /// snapshot.
    pub fn create_inventory_report(&mut self) -> PosResult<InventoryReport> {
        let now = Local::now();
        let report = self.commit(|state| {
            let report = InventoryReport {
                timestamp: now.timestamp_millis(),
                date: now.format("%d.%m.%Y %H:%M:%S").to_string(),
                products: counted_rows(state)
                    .map(|row| (row.id.clone(), row.current_stock))
                    .collect(),
                ingredients: state
                    .ingredients
                    .iter()
                    .map(|i| (i.id.clone(), i.current_stock))
                    .collect(),
            };
            state.inventory_report = Some(report.clone());
            Ok(report)
        })?;

        info!(
            products = report.products.len(),
            ingredients = report.ingredients.len(),
            "Inventory report created"
        );
        Ok(report)
    }

    pub fn inventory_report(&self) -> Option<&InventoryReport> {
        self.state().inventory_report.as_ref()
    }

    /// Stock used since the last inventory report, `None` before the first
    /// one. Lines added after the snapshot count from zero.
    pub fn stock_changes(&self) -> Option<StockChanges> {
        let state = self.state();
        let report = state.inventory_report.as_ref()?;

        let products: Vec<StockChange> = counted_rows(state)
            .map(|row| {
                let before = report.products.get(&row.id).copied().unwrap_or(0);
                stock_change(
                    &row.id,
                    &row.name,
                    &row.unit,
                    before as f64,
                    row.current_stock as f64,
                )
            })
            .collect();
        let ingredients: Vec<StockChange> = state
            .ingredients
            .iter()
            .map(|i| {
                let before = report.ingredients.get(&i.id).copied().unwrap_or(0.0);
                stock_change(&i.id, &i.name, &i.unit, before, i.current_stock)
            })
            .collect();

        let products_before: f64 = products.iter().map(|c| c.before).sum();
        let products_now: f64 = products.iter().map(|c| c.now).sum();
        let ingredients_before: f64 = ingredients.iter().map(|c| c.before).sum();
        let ingredients_now: f64 = ingredients.iter().map(|c| c.now).sum();

        Some(StockChanges {
            report_date: report.date.clone(),
            products,
            ingredients,
            products_before,
            products_now,
            products_used: products_before - products_now,
            ingredients_before,
            ingredients_now,
            ingredients_used: ingredients_before - ingredients_now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategorySettings, IngredientType, RecipeLine};

    fn ingredient(id: &str, stock: f64) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: "LİMON SUYU".to_string(),
            current_stock: stock,
            min_stock: 10.0,
            unit: "cl".to_string(),
            supplier: "Manav".to_string(),
            last_restocked: "01.12.2024".to_string(),
            price: 0.5,
            kind: IngredientType::Alcohol,
        }
    }

    #[test]
    fn test_new_product_gets_category_stock_defaults() {
        let mut pos = Pos::open_in_memory().unwrap();
        let events = pos.subscribe();

        let product = pos
            .upsert_product(Product::new("", "  GUINNESS ", 85.0, seed::BEER))
            .unwrap();

        assert!(product.id.starts_with("p-"));
        assert_eq!(product.name, "GUINNESS");
        let row = pos.state().inventory.iter().find(|r| r.id == product.id).unwrap();
        assert_eq!(row.current_stock, 24);
        assert_eq!(row.min_stock, 12);
        assert_eq!(row.unit, "adet");
        assert_eq!(row.supplier, "Bira Tedarikçisi");
        assert_eq!(events.try_recv().unwrap(), CatalogEvent::ProductsChanged);
    }

    #[test]
    fn test_updating_product_carries_into_inventory() {
        let mut pos = Pos::open_in_memory().unwrap();
        let mut efes = pos.state().products.iter().find(|p| p.id == "b1").unwrap().clone();
        efes.price = 50.0;
        efes.supplier = Some("Yeni Tedarikçi".into());

        pos.upsert_product(efes).unwrap();

        let row = pos.state().inventory.iter().find(|r| r.id == "b1").unwrap();
        assert_eq!(row.price, 50.0);
        assert_eq!(row.supplier, "Yeni Tedarikçi");
        assert_eq!(row.current_stock, 48);
    }

    #[test]
    fn test_recipe_product_is_not_unit_tracked() {
        let mut pos = Pos::open_in_memory().unwrap();
        let product = Product::new("x-gt", "GİN TONİK", 90.0, seed::COCKTAILS).with_recipe(vec![
            RecipeLine {
                ingredient_id: "ing-gin".into(),
                amount: 5.0,
            },
        ]);

        pos.upsert_product(product).unwrap();

        assert!(pos.state().inventory.iter().all(|r| r.id != "x-gt"));
        pos.place_order("bar1", &[crate::models::CartLine::new("GİN TONİK", 90.0, 2)], None)
            .unwrap();
        let gin = pos.state().ingredients.iter().find(|i| i.id == "ing-gin").unwrap();
        assert_eq!(gin.current_stock, 690.0);
    }

    #[test]
    fn test_product_validation() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(matches!(
            pos.upsert_product(Product::new("", "X", 10.0, "yok")),
            Err(PosError::CategoryNotFound(_))
        ));
        assert!(matches!(
            pos.upsert_product(Product::new("", " ", 10.0, seed::BEER)),
            Err(PosError::Validation(_))
        ));
        let bad_recipe = Product::new("", "X", 10.0, seed::COCKTAILS).with_recipe(vec![RecipeLine {
            ingredient_id: "ing-none".into(),
            amount: 4.0,
        }]);
        assert!(matches!(
            pos.upsert_product(bad_recipe),
            Err(PosError::IngredientNotFound(_))
        ));
    }

    #[test]
    fn test_delete_product_drops_stock_row() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.delete_product("f9").unwrap();
        assert!(pos.state().products.iter().all(|p| p.id != "f9"));
        assert!(pos.state().inventory.iter().all(|r| r.id != "f9"));
        assert!(matches!(pos.delete_product("f9"), Err(PosError::ProductNotFound(_))));
    }

    #[test]
    fn test_menu_hides_categories() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert_eq!(pos.menu().len(), 27);

        pos.update_category_settings(
            seed::COCKTAILS,
            CategorySettings {
                show_in_menu: false,
                ..CategorySettings::default()
            },
        )
        .unwrap();
        assert_eq!(pos.menu().len(), 18);
    }

    #[test]
    fn test_ingredient_lifecycle() {
        let mut pos = Pos::open_in_memory().unwrap();
        let events = pos.subscribe();

        let saved = pos.upsert_ingredient(ingredient("", 20.0)).unwrap();
        assert!(saved.id.starts_with("ing-"));
        assert_eq!(events.try_recv().unwrap(), CatalogEvent::IngredientsChanged);

        let restocked = pos.restock_ingredient(&saved.id, 30.0).unwrap();
        assert_eq!(restocked.current_stock, 50.0);
        assert!(pos.restock_ingredient(&saved.id, 0.0).is_err());

        pos.upsert_product(Product::new("", "VİSKİ SOUR", 90.0, seed::COCKTAILS).with_recipe(
            vec![RecipeLine {
                ingredient_id: saved.id.clone(),
                amount: 3.0,
            }],
        ))
        .unwrap();
        assert!(matches!(pos.delete_ingredient(&saved.id), Err(PosError::Validation(_))));
        assert!(matches!(
            pos.delete_ingredient("ing-none"),
            Err(PosError::IngredientNotFound(_))
        ));
    }

    #[test]
    fn test_set_stock_and_low_stock() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(pos.low_stock().iter().all(|l| l.id != "b1"));

        let row = pos.set_stock("b1", 5).unwrap();
        assert_eq!(row.current_stock, 5);
        assert_eq!(
            pos.state().products.iter().find(|p| p.id == "b1").unwrap().current_stock,
            Some(5)
        );

        pos.set_min_stock("b2", 30).unwrap();

        let low = pos.low_stock();
        let efes = low.iter().find(|l| l.id == "b1").unwrap();
        assert_eq!(efes.status, StockStatus::Critical);
        let bomonti = low.iter().find(|l| l.id == "b2").unwrap();
        assert_eq!(bomonti.status, StockStatus::Low);
        assert_eq!(low[0].status, StockStatus::Critical);

        assert!(matches!(pos.set_stock("b1", -1), Err(PosError::Validation(_))));
        assert!(matches!(pos.set_stock("zz", 1), Err(PosError::ProductNotFound(_))));
    }

    #[test]
    fn test_stock_changes_since_inventory_report() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(pos.stock_changes().is_none());

        let report = pos.create_inventory_report().unwrap();
        assert_eq!(report.products.len(), 18);
        assert!(!report.products.contains_key("c1"));
        assert_eq!(report.ingredients.get("ing-gin"), Some(&700.0));

        pos.upsert_product(
            Product::new("x-gt", "GİN TONİK", 90.0, seed::COCKTAILS).with_recipe(vec![
                RecipeLine {
                    ingredient_id: "ing-gin".into(),
                    amount: 5.0,
                },
            ]),
        )
        .unwrap();
        pos.place_order(
            "bar1",
            &[
                crate::models::CartLine::new("EFES PİLSEN", 45.0, 2),
                crate::models::CartLine::new("GİN TONİK", 90.0, 2),
                crate::models::CartLine::new("MOJİTO", 85.0, 1),
            ],
            None,
        )
        .unwrap();

        let changes = pos.stock_changes().unwrap();
        let efes = changes.products.iter().find(|c| c.id == "b1").unwrap();
        assert_eq!((efes.before, efes.now, efes.used), (48.0, 46.0, 2.0));
        assert_eq!(changes.products_used, 2.0);
        assert_eq!(changes.ingredients_used, 10.0);
        assert_eq!(changes.report_date, report.date);
    }

    #[test]
    fn test_inventory_report_is_persisted() {
        let mut pos = Pos::open_in_memory().unwrap();
        let report = pos.create_inventory_report().unwrap();

        let reloaded = PosState::load(pos.db()).unwrap();
        assert_eq!(reloaded.inventory_report, Some(report));
    }
}
