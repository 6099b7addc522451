//! The Tree Scope Resolver.

use std::collections::BTreeMap;

use super::{HierarchyConfig, ScopeError, ScopeId, ScopePolicy};
use crate::Result;

/// Hierarchies of the source data dictionary scoped by company.
const COMPANY_HIERARCHIES: &[(&str, bool)] = &[
    ("Account", true),
    ("Cost Center", false),
    ("Warehouse", false),
    ("Department", false),
];

/// Hierarchies of the source data dictionary shared across companies.
const GLOBAL_HIERARCHIES: &[(&str, bool)] = &[
    ("Territory", false),
    ("Customer Group", false),
    ("Supplier Group", false),
    ("Item Group", false),
    ("Sales Person", false),
    ("Quality Procedure", false),
    ("Location", true),
    ("Task", true),
];

/// Maps `(entity_type, context)` pairs to [`ScopeId`]s.
///
/// Resolution is a pure function of the registry contents and its inputs:
/// the same pair always yields the same id. Entity types that are not
/// registered are rejected, since most records are not tree-shaped and must
/// never reach the engine.
///
/// # Example
///
/// ```
/// use canopy::scope::ScopeRegistry;
///
/// let registry = ScopeRegistry::standard();
/// let scope = registry.resolve("Account", "Acme").unwrap();
/// assert_eq!(scope.to_string(), "Account[Acme]");
/// assert!(registry.policy(&scope).unwrap().allow_multiple_roots);
///
/// assert!(registry.resolve("Sales Invoice", "Acme").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    hierarchies: BTreeMap<String, HierarchyConfig>,
}

impl ScopeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the standard hierarchies.
    pub fn standard() -> Self {
        let mut hierarchies = BTreeMap::new();
        for (entity_type, multiple_roots) in COMPANY_HIERARCHIES {
            hierarchies.insert(
                entity_type.to_string(),
                HierarchyConfig::per_context(policy_for(*multiple_roots)),
            );
        }
        for (entity_type, multiple_roots) in GLOBAL_HIERARCHIES {
            hierarchies.insert(
                entity_type.to_string(),
                HierarchyConfig::global(policy_for(*multiple_roots)),
            );
        }
        Self { hierarchies }
    }

    /// Registers a hierarchy, replacing any previous registration.
    pub fn register(&mut self, entity_type: impl Into<String>, config: HierarchyConfig) -> Result<()> {
        let entity_type = entity_type.into();
        if entity_type.trim().is_empty() {
            return Err(ScopeError::InvalidEntityType { entity_type }.into());
        }
        self.hierarchies.insert(entity_type, config);
        Ok(())
    }

    /// Resolves an entity type and owning context to a scope id.
    ///
    /// Global hierarchies take an empty context.
    pub fn resolve(&self, entity_type: &str, context: &str) -> Result<ScopeId> {
        let config = self.hierarchy(entity_type)?;
        match (config.context_required, context.is_empty()) {
            (true, true) => Err(ScopeError::MissingContext {
                entity_type: entity_type.to_string(),
            }
            .into()),
            (false, false) => Err(ScopeError::UnexpectedContext {
                entity_type: entity_type.to_string(),
                context: context.to_string(),
            }
            .into()),
            _ => Ok(ScopeId::new(entity_type, context)),
        }
    }

    /// Returns the policy applying to a scope.
    pub fn policy(&self, scope: &ScopeId) -> Result<ScopePolicy> {
        Ok(self.hierarchy(scope.entity_type())?.policy)
    }

    /// Returns the registration of an entity type.
    pub fn hierarchy(&self, entity_type: &str) -> Result<HierarchyConfig> {
        self.hierarchies.get(entity_type).copied().ok_or_else(|| {
            ScopeError::UnknownScope {
                entity_type: entity_type.to_string(),
            }
            .into()
        })
    }

    /// True if the entity type is registered.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.hierarchies.contains_key(entity_type)
    }

    /// Registered entity types in sorted order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.hierarchies.keys().map(String::as_str)
    }
}

fn policy_for(multiple_roots: bool) -> ScopePolicy {
    if multiple_roots {
        ScopePolicy::multiple_roots()
    } else {
        ScopePolicy::single_root()
    }
}
