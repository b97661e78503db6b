//! Out-of-the-box floor plan, menu and stock used when a collection has never
//! been persisted.

use crate::models::{
    Category, CategorySettings, CategorySettingsMap, Ingredient, IngredientType, InventoryProduct,
    Position, Product, Table, TableShape,
};

pub const BEER: &str = "biralar";
pub const COCKTAILS: &str = "kokteyller";
pub const SNACKS: &str = "atistirmalik";

const SEED_DATE: &str = "01.12.2024";

pub fn default_tables() -> Vec<Table> {
    let mut tables = Vec::with_capacity(15);
    let mut number = 0;
    let mut push = |id: &str, name: &str, shape: TableShape, x: f64, y: f64| {
        number += 1;
        tables.push(Table::new(id, number, name, shape, Position { x, y }));
    };

    for i in 0..4 {
        let n = i + 1;
        push(&format!("bar{n}"), &format!("Bar {n}"), TableShape::Round, 146.0, 40.0 + 115.0 * i as f64);
    }
    for i in 0..4 {
        let n = i + 1;
        push(&format!("bistro{n}"), &format!("Bistro {n}"), TableShape::Square, 286.0 + 115.0 * i as f64, 40.0);
    }
    for i in 0..4 {
        let n = i + 1;
        push(&format!("orta{n}"), &format!("Orta {n}"), TableShape::Rectangle, 286.0 + 155.0 * i as f64, 170.0);
    }
    for i in 0..3 {
        let n = i + 1;
        push(&format!("duvar{n}"), &format!("Duvar {n}"), TableShape::Rectangle, 286.0 + 155.0 * i as f64, 300.0);
    }

    tables
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category { id: BEER.to_string(), name: "🍺 Biralar".to_string() },
        Category { id: COCKTAILS.to_string(), name: "🍹 Kokteyller".to_string() },
        Category { id: SNACKS.to_string(), name: "🍟 Atıştırmalık".to_string() },
    ]
}

pub fn default_category_settings() -> CategorySettingsMap {
    let mut settings = CategorySettingsMap::new();
    settings.insert(BEER.to_string(), CategorySettings::default());
    settings.insert(
        COCKTAILS.to_string(),
        CategorySettings {
            requires_ingredients: true,
            ..CategorySettings::default()
        },
    );
    settings.insert(SNACKS.to_string(), CategorySettings::default());
    settings
}

// (id, name, price, stock, min stock, unit, supplier)
const BEERS: &[(&str, &str, f64, i64, i64, &str)] = &[
    ("b1", "EFES PİLSEN", 45.0, 48, 24, "Anadolu Efes"),
    ("b2", "BOMONTİ", 50.0, 36, 24, "Anadolu Efes"),
    ("b3", "TUBORG", 45.0, 42, 24, "Anadolu Efes"),
    ("b4", "CORONA", 65.0, 18, 12, "AB InBev"),
    ("b5", "HEINEKEN", 60.0, 24, 18, "Heineken Turkey"),
    ("b6", "CARLSBERG", 55.0, 30, 18, "Carlsberg Turkey"),
    ("b7", "AMSTERDAM", 70.0, 12, 12, "AB InBev"),
    ("b8", "MILLER", 58.0, 15, 12, "Molson Coors"),
    ("b9", "BECKs", 62.0, 20, 12, "AB InBev"),
];

const COCKTAIL_MENU: &[(&str, &str, f64, i64, i64, &str)] = &[
    ("c1", "MOJİTO", 85.0, 15, 8, "Bar Stok"),
    ("c2", "MARGARİTA", 90.0, 12, 8, "Bar Stok"),
    ("c3", "COSMOPOLİTAN", 95.0, 10, 6, "Bar Stok"),
    ("c4", "LONG ISLAND", 110.0, 8, 5, "Bar Stok"),
    ("c5", "PIÑA COLADA", 100.0, 14, 8, "Bar Stok"),
    ("c6", "OLD FASHIONED", 105.0, 11, 6, "Bar Stok"),
    ("c7", "NEGRONI", 98.0, 9, 5, "Bar Stok"),
    ("c8", "APEROL SPRITZ", 88.0, 13, 8, "Bar Stok"),
    ("c9", "WHISKEY SOUR", 92.0, 10, 6, "Bar Stok"),
];

const SNACK_MENU: &[(&str, &str, f64, i64, i64, &str)] = &[
    ("f1", "ÇITIR TAVUK KANAT", 75.0, 25, 12, "Mutfak Tedarik"),
    ("f2", "NACHOS SUPREME", 65.0, 20, 10, "Mutfak Tedarik"),
    ("f3", "BBQ KABURGA", 120.0, 15, 8, "Et Tedarikçisi"),
    ("f4", "SEZAR SALATA", 55.0, 18, 10, "Mutfak Tedarik"),
    ("f5", "MARGHERİTA PİZZA", 95.0, 22, 12, "Hamur Tedarik"),
    ("f6", "DANA BURGER", 85.0, 20, 10, "Et Tedarikçisi"),
    ("f7", "PATATES KIZARTMASI", 40.0, 30, 15, "Mutfak Tedarik"),
    ("f8", "SOĞAN HALKASI", 45.0, 25, 12, "Mutfak Tedarik"),
    ("f9", "MEZE TABAĞI", 70.0, 18, 10, "Mutfak Tedarik"),
];

fn menu_sections() -> [(&'static str, &'static str, &'static [(&'static str, &'static str, f64, i64, i64, &'static str)]); 3] {
    [
        (BEER, "adet", BEERS),
        (COCKTAILS, "porsiyon", COCKTAIL_MENU),
        (SNACKS, "porsiyon", SNACK_MENU),
    ]
}

pub fn default_products() -> Vec<Product> {
    menu_sections()
        .iter()
        .flat_map(|(category, _, rows)| {
            rows.iter()
                .map(move |(id, name, price, ..)| Product::new(id, name, *price, category))
        })
        .collect()
}

pub fn default_inventory() -> Vec<InventoryProduct> {
    menu_sections()
        .iter()
        .flat_map(|(category, unit, rows)| {
            rows.iter().map(move |(id, name, price, stock, min, supplier)| InventoryProduct {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                current_stock: *stock,
                min_stock: *min,
                unit: unit.to_string(),
                supplier: supplier.to_string(),
                last_restocked: SEED_DATE.to_string(),
                price: *price,
            })
        })
        .collect()
}

pub fn default_ingredients() -> Vec<Ingredient> {
    let rows: &[(&str, &str, f64, &str, f64)] = &[
        ("ing-vodka", "ABSOLUT VOTKA", 700.0, "Pernod Ricard", 2.5),
        ("ing-rum", "BACARDI ROM", 700.0, "Bacardi", 2.2),
        ("ing-gin", "GORDONS GIN", 700.0, "Diageo", 2.4),
        ("ing-tequila", "JOSE CUERVO TEKİLA", 700.0, "Jose Cuervo", 2.8),
        ("ing-whiskey", "JACK DANIELS WHISKEY", 700.0, "Brown-Forman", 3.5),
        ("ing-aperol", "APEROL", 700.0, "Campari Group", 2.0),
        ("ing-campari", "CAMPARI", 350.0, "Campari Group", 2.3),
        ("ing-triple-sec", "TRIPLE SEC", 350.0, "Bols", 1.8),
        ("ing-coconut-rum", "MALIBU (HİNDİSTAN CEVİZİ ROM)", 350.0, "Pernod Ricard", 2.1),
    ];

    rows.iter()
        .map(|(id, name, stock, supplier, price)| Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            current_stock: *stock,
            min_stock: stock / 2.0,
            unit: "cl".to_string(),
            supplier: supplier.to_string(),
            last_restocked: SEED_DATE.to_string(),
            price: *price,
            kind: IngredientType::Alcohol,
        })
        .collect()
}

/// Stock defaults for a product newly added to inventory tracking:
/// (current stock, min stock, unit, supplier).
pub fn inventory_defaults(category: &str) -> (i64, i64, &'static str, &'static str) {
    match category {
        BEER => (24, 12, "adet", "Bira Tedarikçisi"),
        COCKTAILS => (12, 6, "porsiyon", "Bar Stok"),
        SNACKS => (20, 10, "porsiyon", "Mutfak Tedarik"),
        _ => (20, 10, "adet", "Tedarikçi Belirlenmedi"),
    }
}
