//! FILENAME: tests/common/mod.rs
//! Shared fixtures for row-engine integration tests.

use grid_model::{NodeChildDetails, RowCallbacks};
use row_engine::{RowModel, RowModelConfig};

// ============================================================================
// FLAT SALES FIXTURE
// ============================================================================

/// Flat sales record used by most tests; `id` doubles as the row id.
#[derive(Debug, Clone)]
pub struct SaleRow {
    pub id: String,
    pub region: &'static str,
    pub product: &'static str,
    pub amount: f64,
}

pub fn sale(id: &str, region: &'static str, product: &'static str, amount: f64) -> SaleRow {
    SaleRow {
        id: id.to_string(),
        region,
        product,
        amount,
    }
}

pub fn sales_fixture() -> Vec<SaleRow> {
    vec![
        sale("s1", "North", "Widget", 10000.0),
        sale("s2", "North", "Gadget", 8000.0),
        sale("s3", "South", "Widget", 15000.0),
        sale("s4", "South", "Gadget", 11000.0),
        sale("s5", "East", "Widget", 9000.0),
        sale("s6", "East", "Gadget", 7000.0),
    ]
}

/// Model over `rows` with id extraction and the three sale fields
/// registered.
pub fn sales_model_with(rows: Vec<SaleRow>) -> RowModel<SaleRow> {
    let callbacks = RowCallbacks::new().with_get_row_id(|row: &SaleRow| row.id.clone());
    let mut model = RowModel::with_defaults(callbacks);
    model.register_field("region", |row: &SaleRow| row.region.into());
    model.register_field("product", |row: &SaleRow| row.product.into());
    model.register_field("amount", |row: &SaleRow| row.amount.into());
    model.set_row_data(rows);
    model
}

pub fn sales_model() -> RowModel<SaleRow> {
    sales_model_with(sales_fixture())
}

/// Ids of the current display rows, top to bottom.
pub fn display_ids<T>(model: &RowModel<T>) -> Vec<String> {
    (0..model.get_row_count())
        .filter_map(|index| model.get_row(index).map(|node| node.id.clone()))
        .collect()
}

// ============================================================================
// NESTED (LEGACY TREE) FIXTURE
// ============================================================================

/// Nested record for legacy tree mode; `name` doubles as the row id and
/// the group key.
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub name: &'static str,
    pub amount: f64,
    pub children: Vec<TreeRow>,
}

pub fn branch(name: &'static str, children: Vec<TreeRow>) -> TreeRow {
    TreeRow {
        name,
        amount: 0.0,
        children,
    }
}

pub fn leaf_row(name: &'static str, amount: f64) -> TreeRow {
    TreeRow {
        name,
        amount,
        children: Vec::new(),
    }
}

/// Two-level produce hierarchy plus one top-level leaf:
/// Fruit(Apples, Oranges), Vegetables(Root(Carrots), Potatoes), Misc.
pub fn produce_fixture() -> Vec<TreeRow> {
    vec![
        branch(
            "Fruit",
            vec![leaf_row("Apples", 10.0), leaf_row("Oranges", 20.0)],
        ),
        branch(
            "Vegetables",
            vec![
                branch("Root", vec![leaf_row("Carrots", 5.0)]),
                leaf_row("Potatoes", 7.0),
            ],
        ),
        leaf_row("Misc", 1.0),
    ]
}

/// Legacy-tree model over the produce fixture with the given
/// default-expanded threshold.
pub fn tree_model(group_default_expanded: i32) -> RowModel<TreeRow> {
    let callbacks = RowCallbacks::new()
        .with_get_row_id(|row: &TreeRow| row.name.to_string())
        .with_child_details(|row: &TreeRow| {
            if row.children.is_empty() {
                None
            } else {
                Some(NodeChildDetails {
                    group: true,
                    key: Some(row.name.to_string()),
                    expanded: None,
                    children: row.children.clone(),
                })
            }
        });
    let config = RowModelConfig {
        group_default_expanded,
        ..Default::default()
    };
    let mut model = RowModel::new(config, callbacks);
    model.register_field("amount", |row: &TreeRow| row.amount.into());
    model.set_row_data(produce_fixture());
    model
}
