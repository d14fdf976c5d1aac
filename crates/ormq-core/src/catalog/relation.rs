//! Relationship definitions between entities.

use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// Cardinality of a relationship, seen from the entity that declares it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    Serialize,
    Deserialize,
)]
pub enum Cardinality {
    /// Foreign key on the declaring entity.
    ManyToOne,
    /// Foreign key on the target entity.
    OneToMany,
    /// Link table between both entities.
    ManyToMany,
    /// Unique foreign key on the main side.
    OneToOne,
}

impl Cardinality {
    /// Whether traversing this relationship can yield several rows.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }
}

/// A relationship property of an entity.
///
/// The main side owns the storage: the foreign key column for one-to-one and
/// many-to-one, the link table naming for many-to-many. One-to-many is never
/// the main side; its foreign key lives on the target under the inverse
/// property.
#[derive(
    Debug, Clone, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize,
)]
pub struct RelationDef {
    /// Property name on the declaring entity.
    pub name: String,
    /// Declaring entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relationship cardinality.
    pub cardinality: Cardinality,
    /// Whether this side owns the storage.
    pub is_main: bool,
    /// Property on the target entity pointing back.
    #[serde(default)]
    pub inverse: Option<String>,
    /// Whether a to-one reference may be missing.
    #[serde(default)]
    pub nullable: bool,
}

impl RelationDef {
    fn new(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        cardinality: Cardinality,
        is_main: bool,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            cardinality,
            is_main,
            inverse: None,
            nullable: false,
        }
    }

    /// Create a many-to-one relationship; the declaring entity holds the foreign key.
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
    ) -> Self {
        Self::new(name, from_entity, to_entity, Cardinality::ManyToOne, true)
    }

    /// Create a one-to-many relationship mapped by `inverse` on the target.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        inverse: impl Into<String>,
    ) -> Self {
        Self::new(name, from_entity, to_entity, Cardinality::OneToMany, false)
            .with_inverse(inverse)
    }

    /// Create the main side of a many-to-many relationship.
    pub fn many_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
    ) -> Self {
        Self::new(name, from_entity, to_entity, Cardinality::ManyToMany, true)
    }

    /// Create the main side of a one-to-one relationship.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
    ) -> Self {
        Self::new(name, from_entity, to_entity, Cardinality::OneToOne, true)
    }

    /// Set the property on the target entity pointing back.
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Make this the non-main side, with storage owned by `inverse` on the target.
    pub fn mapped_by(mut self, inverse: impl Into<String>) -> Self {
        self.is_main = false;
        self.inverse = Some(inverse.into());
        self
    }

    /// Allow the reference to be missing.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Check if traversal yields several rows.
    pub fn is_to_many(&self) -> bool {
        self.cardinality.is_to_many()
    }

    /// Check if the declaring entity stores the foreign key.
    pub fn has_foreign_key(&self) -> bool {
        self.is_main && matches!(self.cardinality, Cardinality::ManyToOne | Cardinality::OneToOne)
    }

    /// Build the relationship seen from the target entity.
    ///
    /// Returns `None` when no inverse property is declared.
    pub fn inverse_relation(&self) -> Option<Self> {
        let name = self.inverse.clone()?;
        let (cardinality, is_main) = match self.cardinality {
            Cardinality::ManyToOne => (Cardinality::OneToMany, false),
            Cardinality::OneToMany => (Cardinality::ManyToOne, true),
            Cardinality::ManyToMany => (Cardinality::ManyToMany, !self.is_main),
            Cardinality::OneToOne => (Cardinality::OneToOne, !self.is_main),
        };
        Some(Self {
            name,
            from_entity: self.to_entity.clone(),
            to_entity: self.from_entity.clone(),
            cardinality,
            is_main,
            inverse: Some(self.name.clone()),
            nullable: self.nullable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_one_relation() {
        let rel = RelationDef::many_to_one("author", "Book", "Author").with_inverse("books");

        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert!(rel.has_foreign_key());
        assert!(!rel.is_to_many());
    }

    #[test]
    fn test_one_to_many_relation() {
        let rel = RelationDef::one_to_many("books", "Author", "Book", "author");

        assert!(!rel.is_main);
        assert!(rel.is_to_many());
        assert!(!rel.has_foreign_key());
        assert_eq!(rel.inverse.as_deref(), Some("author"));
    }

    #[test]
    fn test_one_to_one_mapped_by() {
        let rel = RelationDef::one_to_one("profile", "Author", "Profile").mapped_by("author");

        assert!(!rel.is_main);
        assert!(!rel.has_foreign_key());
    }

    #[test]
    fn test_inverse_relation() {
        let rel = RelationDef::one_to_many("books", "Author", "Book", "author");
        let inverse = rel.inverse_relation().unwrap();

        assert_eq!(inverse.name, "author");
        assert_eq!(inverse.from_entity, "Book");
        assert_eq!(inverse.cardinality, Cardinality::ManyToOne);
        assert!(inverse.is_main);

        let tags = RelationDef::many_to_many("tags", "Book", "Tag").with_inverse("books");
        assert!(!tags.inverse_relation().unwrap().is_main);
        assert!(RelationDef::many_to_many("tags", "Book", "Tag")
            .inverse_relation()
            .is_none());
    }
}
