//! Shared types for shopware-lsp.
//!
//! Contains the fact types produced by the domain indexers (services, routes,
//! snippets, templates, PHP classes, theme config) and common data structures
//! used across the parser, index, and provider crates.

use serde::{Deserialize, Serialize};

/// A zero-based (line, character) position inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilePosition {
    pub line: u32,
    pub character: u32,
}

impl FilePosition {
    pub fn new(line: u32, character: u32) -> Self {
        FilePosition { line, character }
    }
}

/// A Symfony service definition from a container XML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service id (e.g. "product.repository").
    pub id: String,
    /// Service class FQN. Falls back to the id when the XML omits `class`.
    pub class: String,
    /// Names of `<tag name="..."/>` children.
    pub tags: Vec<String>,
    /// Absolute path of the defining XML file.
    pub path: String,
    pub position: FilePosition,
}

/// A Symfony service alias (`<alias id="..." service="..."/>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAlias {
    pub id: String,
    /// Target service id.
    pub target: String,
    pub path: String,
    pub position: FilePosition,
}

/// A container parameter (`<parameter key="...">value</parameter>`).
///
/// Service-typed parameters carry their target in Symfony's `@id` notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerParameter {
    pub name: String,
    pub value: String,
    pub path: String,
    pub position: FilePosition,
}

/// A reference to a service id from an `<argument type="service" id="..."/>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReference {
    pub id: String,
    pub path: String,
    pub position: FilePosition,
}

/// Facts extracted from one container XML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFileFacts {
    pub services: Vec<ServiceDefinition>,
    pub aliases: Vec<ServiceAlias>,
    pub parameters: Vec<ContainerParameter>,
    pub references: Vec<ServiceReference>,
}

/// A Symfony route declared with a `#[Route]` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Route name (e.g. "frontend.account.address.create").
    pub name: String,
    /// URL path with a class-level base path already prefixed.
    pub url_path: String,
    /// Controller in `Namespace\Class::method` form.
    pub controller: String,
    pub path: String,
    pub position: FilePosition,
}

/// A single translation entry from a snippet JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Dot-joined key (e.g. "checkout.cart.title").
    pub key: String,
    /// Translated text.
    pub text: String,
    /// Normalised locale ("de-DE", "en", or "unknown").
    pub locale: String,
    pub path: String,
    pub position: FilePosition,
}

/// A `{% block %}` declaration in a Twig template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwigBlock {
    pub name: String,
    pub path: String,
    pub position: FilePosition,
}

/// A template reference from `{% extends %}` / `{% sw_extends %}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateReference {
    /// Referenced template as written (e.g. "@Storefront/storefront/base.html.twig").
    pub target: String,
    pub path: String,
    pub position: FilePosition,
}

/// Facts extracted from one Twig template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFileFacts {
    pub blocks: Vec<TwigBlock>,
    pub extends: Vec<TemplateReference>,
}

/// A use statement in a PHP file, mapping a short name to an FQN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpUse {
    /// Name the import is visible under (alias or last FQN segment).
    pub alias: String,
    pub fqn: String,
}

/// A PHP class or interface declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpClass {
    /// Short class name.
    pub name: String,
    /// Fully qualified name including namespace.
    pub fqn: String,
    pub namespace: String,
    /// FQN of the extended class, if resolvable.
    pub extends: Option<String>,
    pub is_interface: bool,
    pub path: String,
    pub position: FilePosition,
    /// Method names with their declaration positions.
    pub methods: Vec<PhpMethod>,
}

/// A method declared on a PHP class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpMethod {
    pub name: String,
    pub position: FilePosition,
}

/// Facts extracted from one PHP file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpFileFacts {
    pub namespace: Option<String>,
    pub uses: Vec<PhpUse>,
    pub classes: Vec<PhpClass>,
}

impl PhpFileFacts {
    /// Resolve a name as written in source to an FQN using the file's
    /// use statements and namespace.
    pub fn resolve_name(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix('\\') {
            return rest.to_string();
        }
        let (head, _) = name.split_once('\\').unwrap_or((name, ""));
        for u in &self.uses {
            if u.alias == head {
                if head == name {
                    return u.fqn.clone();
                }
                // Qualified relative to an imported namespace.
                return format!("{}{}", u.fqn, &name[head.len()..]);
            }
        }
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, name),
            _ => name.to_string(),
        }
    }
}

/// A configurable field from a Shopware `theme.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfigField {
    pub name: String,
    /// Declared field type ("color", "checkbox", ...), if present.
    pub field_type: Option<String>,
    pub path: String,
    pub position: FilePosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_name_through_use() {
        let facts = PhpFileFacts {
            namespace: Some("App\\Controller".into()),
            uses: vec![PhpUse {
                alias: "Request".into(),
                fqn: "Symfony\\Component\\HttpFoundation\\Request".into(),
            }],
            classes: vec![],
        };

        assert_eq!(
            facts.resolve_name("Request"),
            "Symfony\\Component\\HttpFoundation\\Request"
        );
        assert_eq!(facts.resolve_name("Foo"), "App\\Controller\\Foo");
        assert_eq!(facts.resolve_name("\\Global\\Thing"), "Global\\Thing");
    }

    #[test]
    fn test_resolve_name_qualified_through_use() {
        let facts = PhpFileFacts {
            namespace: Some("App".into()),
            uses: vec![PhpUse {
                alias: "Routing".into(),
                fqn: "Symfony\\Component\\Routing".into(),
            }],
            classes: vec![],
        };

        assert_eq!(
            facts.resolve_name("Routing\\Attribute\\Route"),
            "Symfony\\Component\\Routing\\Attribute\\Route"
        );
    }

    #[test]
    fn test_facts_round_trip() {
        let facts = ServiceFileFacts {
            services: vec![ServiceDefinition {
                id: "product.repository".into(),
                class: "Shopware\\Core\\Repository".into(),
                tags: vec!["shopware.entity.repository".into()],
                path: "/srv/services.xml".into(),
                position: FilePosition::new(4, 8),
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&facts).unwrap();
        let back: ServiceFileFacts = serde_json::from_str(&json).unwrap();
        assert_eq!(facts, back);
    }
}
