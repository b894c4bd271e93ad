//! Discount codes and how much they take off an order.
//!
//! Pure domain logic. Redemption (incrementing `used_count`) belongs to order
//! creation in the infrastructure layer and never happens here.

pub mod calculate;
pub mod discount;

pub use calculate::{DiscountLine, Ineligible, calculate_discount, calculate_line_discount};
pub use discount::{Discount, DiscountPatch, DiscountType, normalize_code};
