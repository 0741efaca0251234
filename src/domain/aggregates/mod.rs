//! Aggregates module
pub mod print_request;
pub mod product;
pub mod cart;

pub use print_request::{
    Delivery, DeliveryOption, ModelFile, PackageDimensions, PricingPatch, PrintConfiguration, PrintRequest,
    PrintStatus, Settlement, StatusEntry,
};
pub use product::{Discount, DeliveryTypeConfig, Product, ProductStatus, CUSTOM_PRINT_PRODUCT_ID};
pub use cart::{CartBreakdown, CartEntry, CartItemBreakdown};
