//! Terminal rendering for turns, catalog listings, and the product detail view.

use std::fmt::Write as _;

use client_core::{
    catalog::{BootstrapSnapshot, CatalogPhase},
    render::{display_lines, format_price},
    DetailView, Turn,
};
use shared::domain::{Product, Role};

pub fn turn(turn: &Turn) -> String {
    let mut out = String::new();
    let label = match turn.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    for (idx, line) in display_lines(&turn.text).into_iter().enumerate() {
        if idx == 0 {
            let _ = writeln!(out, "{label:>9} | {line}");
        } else {
            let _ = writeln!(out, "{:>9} | {line}", "");
        }
    }

    for (idx, product) in turn.recommendations.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>9} | [{}] {} - {}",
            "",
            idx + 1,
            product.title,
            format_price(product.price)
        );
    }

    if !turn.follow_ups.is_empty() {
        let _ = writeln!(
            out,
            "{:>9} | Some questions to help me assist you better:",
            ""
        );
        for question in &turn.follow_ups {
            let _ = writeln!(out, "{:>9} |   - {question}", "");
        }
    }
    out
}

pub fn product_row(product: &Product) -> String {
    let id = product
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let category = product.category.as_deref().unwrap_or("uncategorised");
    format!(
        "{id:>5}  {:<40}  {:>10}  {category}",
        product.title,
        format_price(product.price)
    )
}

pub fn catalog(snapshot: &BootstrapSnapshot) -> String {
    let mut out = String::new();
    if let Some(status) = snapshot.status {
        let _ = writeln!(
            out,
            "Database: {} products | Vector Store: {} products",
            status.primary_count, status.index_count
        );
        if status.index_lagging() {
            let _ = writeln!(out, "Search index is still catching up with the catalog.");
        }
    }

    match &snapshot.phase {
        CatalogPhase::Loading => {
            let _ = writeln!(out, "Loading products...");
        }
        CatalogPhase::Failed(message) => {
            let _ = writeln!(out, "{message}. Run again with --retry to try again.");
        }
        CatalogPhase::Ready if snapshot.products.is_empty() => {
            let _ = writeln!(out, "No products available yet.");
        }
        CatalogPhase::Ready => {
            let _ = writeln!(out, "Featured Products ({})", snapshot.products.len());
            for product in &snapshot.products {
                let _ = writeln!(out, "{}", product_row(product));
            }
        }
    }

    if snapshot.can_load_samples && !snapshot.trigger_issued {
        let _ = writeln!(out, "Run with --load-samples to load sample products.");
    }
    out
}

pub fn detail(view: &DetailView) -> String {
    match view {
        DetailView::Found(product) => product_sheet(product),
        DetailView::NotFound => {
            "Product not found\nSorry, we couldn't find the product you're looking for.\n"
                .to_string()
        }
    }
}

/// Full description of one product, shared by the hand-off view and `product <id>`.
pub fn product_sheet(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", product.title);
    let _ = writeln!(out, "Price: {}", format_price(product.price));
    for (label, value) in [
        ("Category", &product.category),
        ("Brand", &product.brand),
        ("Availability", &product.availability),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    if product.has_displayable_image() {
        if let Some(url) = &product.image_url {
            let _ = writeln!(out, "Image: {url}");
        }
    } else {
        let _ = writeln!(out, "No Image Available");
    }
    if let Some(description) = &product.description {
        let _ = writeln!(out, "\n{description}");
    }
    if !product.features.is_empty() {
        let _ = writeln!(out, "\nFeatures:");
        for feature in &product.features {
            let _ = writeln!(out, "  - {feature}");
        }
    }
    if !product.additional_attributes.is_empty() {
        let _ = writeln!(out, "\nSpecifications:");
        for (key, value) in &product.additional_attributes {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }
    if let Some(url) = &product.product_url {
        let _ = writeln!(out, "\nView on store: {url}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{ProductId, StoreStatus};

    #[test]
    fn renders_multiline_turn_with_recommendations() {
        let mut turn = Turn::assistant("Two picks:\nboth compact");
        turn.recommendations = vec![Product::new(ProductId(1), "Arden Sofa", 45999.0)];
        turn.follow_ups = vec!["What is your budget?".to_string()];

        let rendered = super::turn(&turn);
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "assistant | Two picks:");
        assert_eq!(lines[1], "          | both compact");
        assert_eq!(lines[2], "          | [1] Arden Sofa - 45,999");
        assert!(rendered.contains("- What is your budget?"));
    }

    #[test]
    fn catalog_flags_lagging_search_index() {
        let snapshot = BootstrapSnapshot {
            products: vec![Product::new(ProductId(1), "Arden Sofa", 45999.0)],
            status: Some(StoreStatus {
                primary_count: 2,
                index_count: 1,
            }),
            trigger_issued: false,
            phase: CatalogPhase::Ready,
            can_load_samples: false,
        };

        let rendered = catalog(&snapshot);
        assert!(rendered.contains("Database: 2 products | Vector Store: 1 products"));
        assert!(rendered.contains("Search index is still catching up"));

        let caught_up = BootstrapSnapshot {
            status: Some(StoreStatus {
                primary_count: 2,
                index_count: 2,
            }),
            ..snapshot
        };
        assert!(!catalog(&caught_up).contains("catching up"));
    }

    #[test]
    fn missing_handoff_renders_not_found() {
        assert!(detail(&DetailView::NotFound).starts_with("Product not found"));
    }

    #[test]
    fn product_sheet_renders_without_a_handoff() {
        let mut product = Product::new(ProductId(9), "Arden Sofa", 45999.0);
        product.brand = Some("Furlenco".to_string());

        let sheet = product_sheet(&product);
        assert!(sheet.starts_with("Arden Sofa\nPrice: 45,999\n"));
        assert!(sheet.contains("Brand: Furlenco"));
        assert!(!sheet.contains("Product not found"));
        assert_eq!(sheet, detail(&DetailView::Found(product)));
    }

    #[test]
    fn detail_without_image_says_so() {
        let mut product = Product::new(ProductId(5), "Oslo Bed", 32000.0);
        product.image_url = Some("https://via.placeholder.com/400".to_string());
        product.features = vec!["Storage".to_string()];

        let rendered = detail(&DetailView::Found(product));
        assert!(rendered.contains("Price: 32,000"));
        assert!(rendered.contains("No Image Available"));
        assert!(rendered.contains("  - Storage"));
    }
}
