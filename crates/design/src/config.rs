//! Per-tenant store configuration.
//!
//! Every field group has its own patch type. Applying a patch touches only the
//! fields it carries, so an update to one group never clobbers another.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use storecraft_core::{DomainError, DomainResult, SectionId};

use crate::palette::{Palette, PalettePatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreIdentity {
    pub name: String,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub contact_email: Option<String>,
    pub currency: String,
    /// Prefix for generated order numbers.
    pub order_prefix: String,
}

impl Default for StoreIdentity {
    fn default() -> Self {
        Self {
            name: "My Store".to_string(),
            tagline: None,
            description: None,
            logo_url: None,
            contact_email: None,
            currency: "INR".to_string(),
            order_prefix: "ORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub currency: Option<String>,
    pub order_prefix: Option<String>,
}

impl IdentityPatch {
    pub fn apply(&self, identity: &mut StoreIdentity) -> DomainResult<()> {
        let mut next = identity.clone();
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("store name cannot be empty"));
            }
            next.name = name.to_string();
        }
        if let Some(t) = &self.tagline {
            next.tagline = non_blank(t);
        }
        if let Some(d) = &self.description {
            next.description = non_blank(d);
        }
        if let Some(email) = &self.contact_email {
            let email = email.trim();
            if !email.is_empty() && !email.contains('@') {
                return Err(DomainError::validation(format!(
                    "invalid contact email: {email}"
                )));
            }
            next.contact_email = non_blank(email);
        }
        if let Some(currency) = &self.currency {
            let currency = currency.trim().to_uppercase();
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(DomainError::validation(format!(
                    "currency must be a 3-letter code (got {currency:?})"
                )));
            }
            next.currency = currency;
        }
        if let Some(prefix) = &self.order_prefix {
            let prefix = prefix.trim().to_uppercase();
            if !(2..=8).contains(&prefix.len()) || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(DomainError::validation(
                    "order prefix must be 2 to 8 letters or digits",
                ));
            }
            next.order_prefix = prefix;
        }
        *identity = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fonts {
    pub display: String,
    pub body: String,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            display: "Playfair Display".to_string(),
            body: "Inter".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontsPatch {
    pub display: Option<String>,
    pub body: Option<String>,
}

impl FontsPatch {
    /// Font names, when given, must be non-empty.
    pub fn validate(&self) -> DomainResult<()> {
        if self.display.is_none() && self.body.is_none() {
            return Err(DomainError::validation("font update names no font"));
        }
        for (which, name) in [("display", &self.display), ("body", &self.body)] {
            if matches!(name, Some(n) if n.trim().is_empty()) {
                return Err(DomainError::validation(format!(
                    "{which} font name cannot be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, fonts: &mut Fonts) -> DomainResult<()> {
        self.validate()?;
        if let Some(d) = &self.display {
            fonts.display = d.trim().to_string();
        }
        if let Some(b) = &self.body {
            fonts.body = b.trim().to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hero {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub cta_label: Option<String>,
    pub cta_href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub cta_label: Option<String>,
    pub cta_href: Option<String>,
}

impl HeroPatch {
    /// An empty string clears the field.
    pub fn apply(&self, hero: &mut Hero) {
        let set = |field: &mut Option<String>, v: &Option<String>| {
            if let Some(v) = v {
                *field = non_blank(v);
            }
        };
        set(&mut hero.title, &self.title);
        set(&mut hero.subtitle, &self.subtitle);
        set(&mut hero.image_url, &self.image_url);
        set(&mut hero.cta_label, &self.cta_label);
        set(&mut hero.cta_href, &self.cta_href);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub label: String,
    pub href: String,
}

fn validate_links(links: &[NavItem]) -> DomainResult<()> {
    for link in links {
        if link.label.trim().is_empty() || link.href.trim().is_empty() {
            return Err(DomainError::validation(
                "navigation links need a label and an href",
            ));
        }
    }
    Ok(())
}

/// Replaces the whole menu; item order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavPatch {
    pub items: Vec<NavItem>,
}

impl NavPatch {
    pub fn apply(&self, nav: &mut Vec<NavItem>) -> DomainResult<()> {
        validate_links(&self.items)?;
        *nav = self.items.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Footer {
    pub text: Option<String>,
    pub links: Vec<NavItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FooterPatch {
    pub text: Option<String>,
    pub links: Option<Vec<NavItem>>,
}

impl FooterPatch {
    pub fn apply(&self, footer: &mut Footer) -> DomainResult<()> {
        if let Some(links) = &self.links {
            validate_links(links)?;
            footer.links = links.clone();
        }
        if let Some(text) = &self.text {
            footer.text = non_blank(text);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hero,
    FeaturedProducts,
    CollectionGrid,
    CategoryGrid,
    ImageBanner,
    RichText,
    Testimonials,
    Newsletter,
    Faq,
}

/// One homepage block. `settings` is kind-specific and opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub kind: SectionKind,
    pub visible: bool,
    #[serde(default)]
    pub settings: JsonMap<String, JsonValue>,
}

impl Section {
    pub fn new(kind: SectionKind, settings: JsonMap<String, JsonValue>) -> Self {
        Self {
            id: SectionId::new(),
            kind,
            visible: true,
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub identity: StoreIdentity,
    pub palette: Palette,
    pub fonts: Fonts,
    pub hero: Hero,
    pub nav: Vec<NavItem>,
    pub footer: Footer,
    pub sections: Vec<Section>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            identity: StoreIdentity::default(),
            palette: Palette::default(),
            fonts: Fonts::default(),
            hero: Hero::default(),
            nav: vec![
                NavItem {
                    label: "Shop".to_string(),
                    href: "/products".to_string(),
                },
                NavItem {
                    label: "Collections".to_string(),
                    href: "/collections".to_string(),
                },
            ],
            footer: Footer::default(),
            sections: default_sections(),
        }
    }
}

fn default_sections() -> Vec<Section> {
    vec![
        Section::new(SectionKind::Hero, JsonMap::new()),
        Section::new(SectionKind::FeaturedProducts, JsonMap::new()),
    ]
}

impl StoreConfig {
    pub fn apply_palette(&mut self, patch: &PalettePatch) {
        self.palette = self.palette.merged(patch);
    }

    /// Back to default design; identity is kept.
    pub fn reset_design(&mut self) {
        let identity = self.identity.clone();
        *self = StoreConfig {
            identity,
            ..StoreConfig::default()
        };
    }

    pub fn set_logo(&mut self, url: &str) -> DomainResult<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DomainError::validation("logo url cannot be empty"));
        }
        self.identity.logo_url = Some(url.to_string());
        Ok(())
    }

    pub fn section(&self, id: SectionId) -> DomainResult<&Section> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DomainError::not_found("section", id))
    }

    fn section_mut(&mut self, id: SectionId) -> DomainResult<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DomainError::not_found("section", id))
    }

    /// Insert at `position` (clamped), or append.
    pub fn add_section(&mut self, section: Section, position: Option<usize>) -> SectionId {
        let id = section.id;
        let at = position
            .unwrap_or(self.sections.len())
            .min(self.sections.len());
        self.sections.insert(at, section);
        id
    }

    /// Shallow merge of `settings` keys; a `null` value removes the key.
    pub fn update_section(
        &mut self,
        id: SectionId,
        settings: &JsonMap<String, JsonValue>,
        visible: Option<bool>,
    ) -> DomainResult<&Section> {
        let section = self.section_mut(id)?;
        for (k, v) in settings {
            if v.is_null() {
                section.settings.remove(k);
            } else {
                section.settings.insert(k.clone(), v.clone());
            }
        }
        if let Some(v) = visible {
            section.visible = v;
        }
        Ok(section)
    }

    pub fn remove_section(&mut self, id: SectionId) -> DomainResult<Section> {
        let idx = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DomainError::not_found("section", id))?;
        Ok(self.sections.remove(idx))
    }

    /// `order` must name every section exactly once.
    pub fn reorder_sections(&mut self, order: &[SectionId]) -> DomainResult<()> {
        if order.len() != self.sections.len() {
            return Err(DomainError::validation(format!(
                "reorder lists {} sections but the store has {}",
                order.len(),
                self.sections.len()
            )));
        }
        let mut next = Vec::with_capacity(order.len());
        for id in order {
            if next.iter().any(|s: &Section| s.id == *id) {
                return Err(DomainError::validation(format!(
                    "section {id} listed twice"
                )));
            }
            next.push(self.section(*id)?.clone());
        }
        self.sections = next;
        Ok(())
    }

    /// Set visibility, or flip it when `visible` is `None`. Returns the new value.
    pub fn toggle_section(&mut self, id: SectionId, visible: Option<bool>) -> DomainResult<bool> {
        let section = self.section_mut(id)?;
        section.visible = visible.unwrap_or(!section.visible);
        Ok(section.visible)
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
