//! # Admin dashboard
//!
//! Plain-text listings of orders, base products and the asset library, plus the print job an order
//! export hands to the high-resolution renderer.

use std::fmt::Write;

use printtique_core::{
    catalog::{Catalog, Order, OrderStatus},
    io::DesignSnapshot,
    projection::{self, NoneResolved, RenderNode},
    state::{transform::Rect, DesignDocument, Side},
};
use strum::IntoEnumIterator;

/// Print resolution of exported artwork.
pub const PRINT_DPI: u32 = 300;
/// Resolution the canvas is laid out at.
pub const CANVAS_DPI: u32 = 96;

/// `150000` as `150,000đ`.
#[must_use]
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out.push('đ');
    out
}

pub fn parse_status(status: &str) -> anyhow::Result<OrderStatus> {
    OrderStatus::iter()
        .find(|candidate| candidate.as_ref().eq_ignore_ascii_case(status))
        .ok_or_else(|| {
            let known: Vec<_> = OrderStatus::iter().map(|s| s.as_ref().to_owned()).collect();
            anyhow::anyhow!("unknown order status `{status}`, expected one of {known:?}")
        })
}

/// Orders matching `status` and containing `search` in their id or customer name.
pub fn filter_orders<'a>(
    catalog: &'a Catalog,
    status: Option<OrderStatus>,
    search: Option<&'a str>,
) -> impl Iterator<Item = &'a Order> + 'a {
    let search = search.map(str::to_lowercase);
    catalog.orders.iter().filter(move |order| {
        let status_matches = status.map_or(true, |status| order.status == status);
        let search_matches = search.as_deref().map_or(true, |search| {
            order.id.to_lowercase().contains(search)
                || order.customer_name.to_lowercase().contains(search)
        });
        status_matches && search_matches
    })
}

#[must_use]
pub fn orders_table<'a>(orders: impl IntoIterator<Item = &'a Order>) -> String {
    let mut out = format!(
        "{:<10} {:<20} {:<10} {:<10} {:>12}\n",
        "ORDER", "CUSTOMER", "DATE", "STATUS", "TOTAL"
    );
    let mut any = false;
    for order in orders {
        any = true;
        let _ = writeln!(
            out,
            "{:<10} {:<20} {:<10} {:<10} {:>12}",
            order.id,
            order.customer_name,
            order.date.to_string(),
            order.status.as_ref(),
            format_price(order.total),
        );
    }
    if !any {
        out.push_str("(no matching orders)\n");
    }
    out
}

#[must_use]
pub fn products_table(catalog: &Catalog) -> String {
    let mut out = String::new();
    for product in &catalog.products {
        let area = product.print_area;
        let _ = writeln!(
            out,
            "{} [{}] {}: {} variants, print area {}x{}px at ({}, {})",
            product.id,
            product.ty.as_ref(),
            product.name,
            product.variants.len(),
            area.width,
            area.height,
            area.left,
            area.top,
        );
        for variant in &product.variants {
            let _ = writeln!(
                out,
                "    {} {} {} {}",
                variant.id,
                variant.name,
                variant.color,
                format_price(variant.price),
            );
        }
    }
    out
}

#[must_use]
pub fn assets_listing(catalog: &Catalog) -> String {
    let mut out = String::from("Clipart library\n");
    for category in catalog.clipart_categories() {
        let ids: Vec<_> = catalog
            .cliparts_in(category)
            .map(|clipart| clipart.id.as_str())
            .collect();
        let _ = writeln!(out, "    {category} ({}): {}", ids.len(), ids.join(", "));
    }
    out.push_str("Fonts\n");
    for font in &catalog.fonts {
        let _ = writeln!(out, "    {} ({})", font.name, font.value);
    }
    out
}

/// What gets rendered for one side of a print job.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PrintSide {
    pub side: Side,
    pub layers: Vec<RenderNode>,
}

/// High-resolution render request for an order's artwork: only the design layers, never the
/// garment art, clipped to the print area.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub order_id: String,
    pub dpi: u32,
    pub include_background: bool,
    pub clip: Rect,
    /// Scale from canvas units to output pixels.
    pub pixel_ratio: f32,
    pub output_size: [u32; 2],
    /// Sides with nothing to print are left out.
    pub sides: Vec<PrintSide>,
}
impl PrintJob {
    pub fn new(
        catalog: &Catalog,
        order_id: &str,
        design: &DesignDocument,
    ) -> anyhow::Result<Self> {
        let order = catalog
            .order(order_id)
            .ok_or_else(|| anyhow::anyhow!("no order `{order_id}`"))?;
        let (product, _) = catalog
            .resolve(design.garment())
            .ok_or_else(|| projection::ProjectionError::UnknownGarment(design.garment().clone()))?;
        let clip = product.print_area;
        let pixel_ratio = PRINT_DPI as f32 / CANVAS_DPI as f32;
        let output_size = [
            (clip.width * pixel_ratio).ceil() as u32,
            (clip.height * pixel_ratio).ceil() as u32,
        ];
        let mut sides = Vec::new();
        for side in Side::iter() {
            // Asset pixels are the renderer's business, the plan only needs geometry.
            let plan = projection::project(design, side, catalog, None, &NoneResolved)?;
            if !plan.layers.is_empty() {
                sides.push(PrintSide {
                    side,
                    layers: plan.layers,
                });
            }
        }
        Ok(Self {
            order_id: order.id.clone(),
            dpi: PRINT_DPI,
            include_background: false,
            clip,
            pixel_ratio,
            output_size,
            sides,
        })
    }
    pub fn from_snapshot(
        catalog: &Catalog,
        order_id: &str,
        snapshot: DesignSnapshot,
    ) -> anyhow::Result<Self> {
        Self::new(catalog, order_id, &snapshot.into_document()?)
    }
    /// Uncompressed RGBA size of one rendered side.
    #[must_use]
    pub fn side_bytes(&self) -> u64 {
        u64::from(self.output_size[0]) * u64::from(self.output_size[1]) * 4
    }
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "Order {}: render @ {} DPI, exclude background, clip to print area {}x{} at ({}, {}).\n\
             {} side(s), {}x{}px each, {} uncompressed per side.",
            self.order_id,
            self.dpi,
            self.clip.width,
            self.clip.height,
            self.clip.left,
            self.clip.top,
            self.sides.len(),
            self.output_size[0],
            self.output_size[1],
            human_bytes::human_bytes(self.side_bytes() as f64),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use printtique_core::assets;
    use printtique_core::state::Garment;

    #[test]
    fn prices() {
        assert_eq!(format_price(0), "0đ");
        assert_eq!(format_price(999), "999đ");
        assert_eq!(format_price(150_000), "150,000đ");
        assert_eq!(format_price(1_250_000), "1,250,000đ");
    }
    #[test]
    fn order_filters() {
        let catalog = Catalog::builtin();
        assert_eq!(parse_status("Processing").unwrap(), OrderStatus::Processing);
        assert!(parse_status("lost").is_err());

        let all = filter_orders(&catalog, None, None).count();
        assert_eq!(all, catalog.orders.len());
        let pending: Vec<_> = filter_orders(&catalog, Some(OrderStatus::Pending), None).collect();
        assert!(pending.iter().all(|order| order.status == OrderStatus::Pending));
        let by_id: Vec<_> = filter_orders(&catalog, None, Some("ord-002")).collect();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, "#ORD-002");

        let table = orders_table(filter_orders(&catalog, None, Some("nobody at all")));
        assert!(table.contains("(no matching orders)"));
    }
    #[test]
    fn listings() {
        let catalog = Catalog::builtin();
        let products = products_table(&catalog);
        assert!(products.contains("Classic Cotton Hoodie"));
        assert!(products.contains("print area 300x500px"));
        assert!(products.contains("150,000đ"));
        let assets = assets_listing(&catalog);
        assert!(assets.contains("Pacifico"));
        assert!(assets.contains("Space"));
    }
    #[test]
    fn print_job() {
        let catalog = Catalog::builtin();
        let garment = Garment {
            product_id: "p1".into(),
            variant_id: "v1_black".into(),
        };
        let mut design = DesignDocument::new(garment);
        let empty = PrintJob::new(&catalog, "#ORD-001", &design).unwrap();
        assert!(empty.sides.is_empty());
        assert_eq!(empty.dpi, 300);
        assert!(!empty.include_background);
        assert_eq!(empty.clip, catalog.products[0].print_area);
        assert_eq!(empty.output_size, [938, 1563]);

        let snapshot = {
            let mut snapshot = DesignSnapshot::capture(&design);
            snapshot.layers.back.push(assets::text_layer("Back", 0));
            snapshot
        };
        design = snapshot.clone().into_document().unwrap();
        let job = PrintJob::from_snapshot(&catalog, "#ORD-001", snapshot).unwrap();
        assert_eq!(job.sides.len(), 1);
        assert_eq!(job.sides[0].side, Side::Back);
        assert!(job.describe().contains("300 DPI"));

        assert!(PrintJob::new(&catalog, "#ORD-404", &design).is_err());
    }
}
