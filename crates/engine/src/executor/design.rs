//! Store identity, design tokens, homepage sections and the hero image.
//!
//! Each handler loads the config, applies one typed patch to its field group and saves
//! the whole document back.

use serde_json::{Value as JsonValue, json};
use tracing::{instrument, warn};

use storecraft_core::{DomainError, DomainResult, TenantId};
use storecraft_design::{
    FontsPatch, FooterPatch, HeroPatch, IdentityPatch, NavPatch, PalettePatch, Section,
};

use super::to_data;
use crate::engine::Engine;
use crate::payload::{
    AddSection, ReorderSections, SectionRef, SetHeroImage, ToggleSection, UpdateLogo,
    UpdateSection,
};

impl Engine {
    pub(crate) async fn update_settings(
        &self,
        tenant_id: TenantId,
        patch: &IdentityPatch,
    ) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        patch.apply(&mut config.identity)?;
        self.save_config(tenant_id, &config).await?;
        to_data(&config.identity)
    }

    pub(crate) async fn update_logo(&self, tenant_id: TenantId, p: &UpdateLogo) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        config.set_logo(&p.logo_url)?;
        self.save_config(tenant_id, &config).await?;
        Ok(json!({ "logoUrl": config.identity.logo_url }))
    }

    #[instrument(skip(self, patch), fields(tenant_id = %tenant_id), err)]
    pub(crate) async fn update_palette(
        &self,
        tenant_id: TenantId,
        patch: &PalettePatch,
    ) -> DomainResult<JsonValue> {
        if patch.is_empty() {
            return Err(DomainError::validation("palette update must set at least one color"));
        }
        let mut config = self.load_config(tenant_id).await?;
        // Contrast is re-checked against the stored palette, not the batch snapshot.
        let Some((fixed, fixes)) = patch.with_contrast_fixes(&config.palette) else {
            config.apply_palette(patch);
            self.save_config(tenant_id, &config).await?;
            return to_data(&config.palette);
        };
        warn!(fixes = fixes.len(), "palette corrected against the stored palette");
        config.apply_palette(&fixed);
        self.save_config(tenant_id, &config).await?;
        let mut data = to_data(&config.palette)?;
        if let JsonValue::Object(map) = &mut data {
            map.insert("contrastFixes".into(), to_data(&fixes)?);
        }
        Ok(data)
    }

    pub(crate) async fn update_fonts(&self, tenant_id: TenantId, patch: &FontsPatch) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        patch.apply(&mut config.fonts)?;
        self.save_config(tenant_id, &config).await?;
        to_data(&config.fonts)
    }

    pub(crate) async fn update_hero(&self, tenant_id: TenantId, patch: &HeroPatch) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        patch.apply(&mut config.hero);
        self.save_config(tenant_id, &config).await?;
        to_data(&config.hero)
    }

    pub(crate) async fn update_nav(&self, tenant_id: TenantId, patch: &NavPatch) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        patch.apply(&mut config.nav)?;
        self.save_config(tenant_id, &config).await?;
        to_data(&config.nav)
    }

    pub(crate) async fn update_footer(&self, tenant_id: TenantId, patch: &FooterPatch) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        patch.apply(&mut config.footer)?;
        self.save_config(tenant_id, &config).await?;
        to_data(&config.footer)
    }

    pub(crate) async fn reset_design(&self, tenant_id: TenantId) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        config.reset_design();
        self.save_config(tenant_id, &config).await?;
        to_data(&config)
    }

    pub(crate) async fn add_section(&self, tenant_id: TenantId, p: &AddSection) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        let mut section = Section::new(p.kind, p.settings.clone());
        section.visible = p.visible;
        let added = section.clone();
        config.add_section(section, p.position);
        self.save_config(tenant_id, &config).await?;
        to_data(&added)
    }

    pub(crate) async fn update_section(&self, tenant_id: TenantId, p: &UpdateSection) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        let section = config
            .update_section(p.section_id, &p.settings, p.visible)?
            .clone();
        self.save_config(tenant_id, &config).await?;
        to_data(&section)
    }

    pub(crate) async fn remove_section(&self, tenant_id: TenantId, p: &SectionRef) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        let removed = config.remove_section(p.section_id)?;
        self.save_config(tenant_id, &config).await?;
        Ok(json!({ "sectionId": removed.id, "removed": true }))
    }

    pub(crate) async fn reorder_sections(
        &self,
        tenant_id: TenantId,
        p: &ReorderSections,
    ) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        config.reorder_sections(&p.section_ids)?;
        self.save_config(tenant_id, &config).await?;
        to_data(&config.sections)
    }

    pub(crate) async fn toggle_section(&self, tenant_id: TenantId, p: &ToggleSection) -> DomainResult<JsonValue> {
        let mut config = self.load_config(tenant_id).await?;
        let visible = config.toggle_section(p.section_id, p.visible)?;
        self.save_config(tenant_id, &config).await?;
        Ok(json!({ "sectionId": p.section_id, "visible": visible }))
    }

    pub(crate) async fn set_hero_image(&self, tenant_id: TenantId, p: &SetHeroImage) -> DomainResult<JsonValue> {
        let url = p.image_url.trim();
        if url.is_empty() {
            return Err(DomainError::validation("hero image url cannot be empty"));
        }
        let mut config = self.load_config(tenant_id).await?;
        config.hero.image_url = Some(url.to_string());
        self.save_config(tenant_id, &config).await?;
        to_data(&config.hero)
    }
}
