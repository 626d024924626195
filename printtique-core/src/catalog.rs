//! # Catalog
//!
//! Read-only product data: base products with their color variants and print areas, the font
//! list, the clipart library, and the admin's order book. A built-in catalog is always available,
//! and a replacement can be loaded from TOML.

use crate::color::Color;
use crate::state::document::{Garment, Side};
use crate::state::transform::Rect;

/// Width and height of the square design canvas, in canvas units.
pub const CANVAS_SIZE: u32 = 600;

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProductType {
    TShirt,
    Polo,
    Hoodie,
    Totebag,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    #[serde(rename = "colorHex")]
    pub color: Color,
    pub image_front: String,
    pub image_back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_back: Option<String>,
    /// In the smallest currency unit.
    pub price: u64,
}
impl ProductVariant {
    #[must_use]
    pub fn image(&self, side: Side) -> &str {
        match side {
            Side::Front => &self.image_front,
            Side::Back => &self.image_back,
        }
    }
    #[must_use]
    pub fn mask(&self, side: Side) -> Option<&str> {
        match side {
            Side::Front => self.mask_front.as_deref(),
            Side::Back => self.mask_back.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseProduct {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ProductType,
    pub variants: Vec<ProductVariant>,
    pub print_area: Rect,
}
impl BaseProduct {
    #[must_use]
    pub fn variant(&self, id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|variant| variant.id == id)
    }
    /// The variant a product starts out in.
    #[must_use]
    pub fn default_variant(&self) -> Option<&ProductVariant> {
        self.variants.first()
    }
    /// This product in its default variant.
    #[must_use]
    pub fn default_garment(&self) -> Option<Garment> {
        self.default_variant().map(|variant| Garment {
            product_id: self.id.clone(),
            variant_id: variant.id.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Clipart {
    pub id: String,
    pub url: String,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FontChoice {
    pub name: String,
    pub value: String,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub date: chrono::NaiveDate,
    pub status: OrderStatus,
    pub total: u64,
    pub thumbnail: String,
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog has no products")]
    Empty,
    #[error("product `{0}` has no variants")]
    NoVariants(String),
    #[error("duplicate product id `{0}`")]
    DuplicateProduct(String),
    #[error("duplicate variant id `{variant}` in product `{product}`")]
    DuplicateVariant { product: String, variant: String },
    #[error("print area of `{0}` lies outside the canvas")]
    PrintArea(String),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    pub products: Vec<BaseProduct>,
    #[serde(default)]
    pub fonts: Vec<FontChoice>,
    #[serde(default)]
    pub cliparts: Vec<Clipart>,
    #[serde(default)]
    pub orders: Vec<Order>,
}
impl Catalog {
    /// Parse and validate a catalog.
    pub fn from_toml_str(toml: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(toml)?;
        catalog.validate()?;
        Ok(catalog)
    }
    /// Check the catalog is usable: products exist, every product has a variant, ids are unique,
    /// and print areas fit on the canvas.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.products.is_empty() {
            return Err(CatalogError::Empty);
        }
        let canvas = Rect {
            left: 0.0,
            top: 0.0,
            width: CANVAS_SIZE as f32,
            height: CANVAS_SIZE as f32,
        };
        let mut product_ids = hashbrown::HashSet::new();
        for product in &self.products {
            if !product_ids.insert(product.id.as_str()) {
                return Err(CatalogError::DuplicateProduct(product.id.clone()));
            }
            if product.variants.is_empty() {
                return Err(CatalogError::NoVariants(product.id.clone()));
            }
            let mut variant_ids = hashbrown::HashSet::new();
            if let Some(dup) = product
                .variants
                .iter()
                .find(|variant| !variant_ids.insert(variant.id.as_str()))
            {
                return Err(CatalogError::DuplicateVariant {
                    product: product.id.clone(),
                    variant: dup.id.clone(),
                });
            }
            // Print areas may run off the bottom of the canvas, the garment art does too.
            let area = &product.print_area;
            if area.width <= 0.0
                || area.height <= 0.0
                || !canvas.contains([area.left, area.top])
                || area.right() > canvas.right()
            {
                return Err(CatalogError::PrintArea(product.id.clone()));
            }
        }
        Ok(())
    }
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&BaseProduct> {
        self.products.iter().find(|product| product.id == id)
    }
    /// Resolve a garment to its product and variant.
    #[must_use]
    pub fn resolve(&self, garment: &Garment) -> Option<(&BaseProduct, &ProductVariant)> {
        let product = self.product(&garment.product_id)?;
        Some((product, product.variant(&garment.variant_id)?))
    }
    /// The garment a new session starts with.
    #[must_use]
    pub fn default_garment(&self) -> Option<Garment> {
        self.products.first()?.default_garment()
    }
    /// Clipart categories, in order of first appearance.
    #[must_use]
    pub fn clipart_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for clipart in &self.cliparts {
            if !categories.contains(&clipart.category.as_str()) {
                categories.push(&clipart.category);
            }
        }
        categories
    }
    pub fn cliparts_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Clipart> + 'a {
        self.cliparts
            .iter()
            .filter(move |clipart| clipart.category == category)
    }
    #[must_use]
    pub fn clipart(&self, id: &str) -> Option<&Clipart> {
        self.cliparts.iter().find(|clipart| clipart.id == id)
    }
    #[must_use]
    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }
    /// The catalog shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        const FRONT: &str = "https://i.postimg.cc/7htw3RnD/frontviewhoodie.png";
        const BACK: &str = "https://i.postimg.cc/90gCdkY2/backviewhoodie.png";
        const MASK_FRONT: &str = "https://i.postimg.cc/8cXNRYmN/fronthoodie.png";
        const MASK_BACK: &str = "https://i.postimg.cc/4y2s60QT/backhoodie.png";

        let variant = |id: &str, name: &str, color: Color| ProductVariant {
            id: id.to_owned(),
            name: name.to_owned(),
            color,
            image_front: FRONT.to_owned(),
            image_back: BACK.to_owned(),
            mask_front: Some(MASK_FRONT.to_owned()),
            mask_back: Some(MASK_BACK.to_owned()),
            price: 150_000,
        };
        let products = vec![BaseProduct {
            id: "p1".to_owned(),
            name: "Classic Cotton Hoodie".to_owned(),
            ty: ProductType::TShirt,
            variants: vec![
                variant("v1_white", "White", Color::WHITE),
                // Dark grey rather than black, keeps some fabric texture visible.
                variant("v1_black", "Black", Color::rgb(0x17, 0x17, 0x17)),
            ],
            print_area: Rect {
                left: 250.0,
                top: 200.0,
                width: 300.0,
                height: 500.0,
            },
        }];
        let fonts = ["Inter", "Roboto", "Oswald", "Pacifico", "Arial"]
            .into_iter()
            .map(|font| FontChoice {
                name: font.to_owned(),
                value: font.to_owned(),
            })
            .collect();

        let horse = [
            ("001", "https://i.postimg.cc/fTq6X0rX/horse1.png"),
            ("002", "https://i.postimg.cc/WbYQrJHq/horse2.png"),
            ("003", "https://i.postimg.cc/ZKs13yMT/horse4.png"),
            ("004", "https://i.postimg.cc/YqDJgms2/horse_18141951.png"),
            ("005", "https://i.postimg.cc/wT4SJsGB/horse_18141958.png"),
            ("006", "https://i.postimg.cc/8PXqWr0s/horse_18142018.png"),
            ("007", "https://i.postimg.cc/9FgvTqnM/horse_18142869.png"),
            ("008", "https://i.postimg.cc/zX29WRcq/horse_5873011.png"),
            ("009", "https://i.postimg.cc/bNVKb2Bs/horse_6907497.png"),
            ("010", "https://cdn-icons-png.flaticon.com/512/869/869869.png"),
            ("011", "https://cdn-icons-png.flaticon.com/512/869/869875.png"),
            ("012", "https://cdn-icons-png.flaticon.com/512/869/869881.png"),
        ]
        .map(|(id, url)| (id, url, "Year of the Horse"));
        let others = [
            ("c1", "https://cdn-icons-png.flaticon.com/512/2904/2904838.png", "Emoji"),
            ("c1b", "https://cdn-icons-png.flaticon.com/512/2904/2904845.png", "Emoji"),
            ("c1c", "https://cdn-icons-png.flaticon.com/512/2904/2904852.png", "Emoji"),
            ("c2", "https://cdn-icons-png.flaticon.com/512/826/826955.png", "Nature"),
            ("c2b", "https://cdn-icons-png.flaticon.com/512/826/826963.png", "Nature"),
            ("c2c", "https://cdn-icons-png.flaticon.com/512/826/826970.png", "Nature"),
            ("c3", "https://cdn-icons-png.flaticon.com/512/190/190666.png", "Space"),
            ("c3b", "https://cdn-icons-png.flaticon.com/512/190/190672.png", "Space"),
            ("c3c", "https://cdn-icons-png.flaticon.com/512/190/190678.png", "Space"),
            ("c4", "https://cdn-icons-png.flaticon.com/512/869/869869.png", "Animals"),
            ("c4b", "https://cdn-icons-png.flaticon.com/512/869/869875.png", "Animals"),
            ("c4c", "https://cdn-icons-png.flaticon.com/512/869/869881.png", "Animals"),
        ];
        let cliparts = horse
            .into_iter()
            .chain(others)
            .map(|(id, url, category)| Clipart {
                id: id.to_owned(),
                url: url.to_owned(),
                category: category.to_owned(),
            })
            .collect();

        let date = |y, m, d| chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap_or(chrono::NaiveDate::MIN);
        let orders = vec![
            Order {
                id: "#ORD-001".to_owned(),
                customer_name: "Nguyen Van A".to_owned(),
                date: date(2023, 10, 25),
                status: OrderStatus::Processing,
                total: 150_000,
                thumbnail: FRONT.to_owned(),
            },
            Order {
                id: "#ORD-002".to_owned(),
                customer_name: "Tran Thi B".to_owned(),
                date: date(2023, 10, 26),
                status: OrderStatus::Pending,
                total: 350_000,
                thumbnail: "https://images.unsplash.com/photo-1556821840-3a63f95609a7?w=100"
                    .to_owned(),
            },
        ];

        Self {
            products,
            fonts,
            cliparts,
            orders,
        }
    }
}
impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
