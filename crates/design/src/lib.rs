//! Storefront design: colors, accessibility contrast correction, palette and the
//! typed per-tenant store configuration.
//!
//! Pure domain logic (no IO).

pub mod color;
pub mod config;
pub mod palette;

pub use color::{HexColor, MIN_CONTRAST, contrast_ratio, correct_foreground};
pub use config::{
    Fonts, FontsPatch, Footer, FooterPatch, Hero, HeroPatch, IdentityPatch, NavItem, NavPatch,
    Section, SectionKind, StoreConfig, StoreIdentity,
};
pub use palette::{ContrastFix, Palette, PalettePatch, PaletteSlot};
