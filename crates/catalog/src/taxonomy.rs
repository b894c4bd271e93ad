use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{CategoryId, CollectionId, DomainError, DomainResult, Entity, TenantId};

use crate::slug::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        description: Option<String>,
        parent_id: Option<CategoryId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let (name, slug) = name_and_slug(name, "category")?;
        Ok(Self {
            id: CategoryId::new(),
            tenant_id,
            name,
            slug,
            description,
            parent_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        let (name, slug) = name_and_slug(name, "category")?;
        self.name = name;
        self.slug = slug;
        Ok(())
    }

    /// A category may not be its own parent.
    pub fn set_parent(&mut self, parent_id: Option<CategoryId>) -> DomainResult<()> {
        if parent_id == Some(self.id) {
            return Err(DomainError::validation("a category cannot be its own parent"));
        }
        self.parent_id = parent_id;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let (name, slug) = name_and_slug(name, "collection")?;
        Ok(Self {
            id: CollectionId::new(),
            tenant_id,
            name,
            slug,
            description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        let (name, slug) = name_and_slug(name, "collection")?;
        self.name = name;
        self.slug = slug;
        Ok(())
    }
}

impl Entity for Collection {
    type Id = CollectionId;

    fn id(&self) -> CollectionId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

fn name_and_slug(name: &str, what: &str) -> DomainResult<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{what} name cannot be empty")));
    }
    Ok((name.to_string(), slugify(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_slug_follows_name() {
        let mut c = Category::new(TenantId::new(), "Summer Wear", None, None, Utc::now()).unwrap();
        assert_eq!(c.slug, "summer-wear");
        c.rename("Monsoon Edit").unwrap();
        assert_eq!(c.slug, "monsoon-edit");
    }

    #[test]
    fn category_cannot_parent_itself() {
        let mut c = Category::new(TenantId::new(), "Tops", None, None, Utc::now()).unwrap();
        let own = c.id;
        assert!(c.set_parent(Some(own)).is_err());
        assert!(c.set_parent(Some(CategoryId::new())).is_ok());
    }

    #[test]
    fn collection_requires_name() {
        assert!(Collection::new(TenantId::new(), " ", None, Utc::now()).is_err());
    }
}
