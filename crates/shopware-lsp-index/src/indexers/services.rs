//! Symfony container XML indexer.
//!
//! Extracts `<service>` definitions (with their tags), `<alias>` entries,
//! `<parameter>` values, and `<argument type="service">` references from
//! container XML files.

use dashmap::DashMap;
use shopware_lsp_parser::{node_text, xml};
use shopware_lsp_types::{
    ContainerParameter, FilePosition, ServiceAlias, ServiceDefinition, ServiceFileFacts,
    ServiceReference,
};
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Tree};

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::Result;

pub struct ServiceIndexer {
    store: FactStore,
    files: DashMap<String, ServiceFileFacts>,
}

impl ServiceIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("symfony.service"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, facts) in store.load_all::<ServiceFileFacts>()? {
            files.insert(path, facts);
        }
        Ok(ServiceIndexer { store, files })
    }

    pub fn all_services(&self) -> Vec<ServiceDefinition> {
        let mut services: Vec<ServiceDefinition> = self
            .files
            .iter()
            .flat_map(|entry| entry.value().services.clone())
            .collect();
        services.sort_by(|a, b| a.id.cmp(&b.id));
        services
    }

    pub fn service_by_id(&self, id: &str) -> Option<ServiceDefinition> {
        for entry in self.files.iter() {
            if let Some(service) = entry.value().services.iter().find(|s| s.id == id) {
                return Some(service.clone());
            }
        }
        // Follow one alias hop.
        let alias = self.alias_by_id(id)?;
        for entry in self.files.iter() {
            if let Some(service) = entry
                .value()
                .services
                .iter()
                .find(|s| s.id == alias.target)
            {
                return Some(service.clone());
            }
        }
        None
    }

    pub fn alias_by_id(&self, id: &str) -> Option<ServiceAlias> {
        for entry in self.files.iter() {
            if let Some(alias) = entry.value().aliases.iter().find(|a| a.id == id) {
                return Some(alias.clone());
            }
        }
        None
    }

    pub fn parameters(&self) -> Vec<ContainerParameter> {
        let mut parameters: Vec<ContainerParameter> = self
            .files
            .iter()
            .flat_map(|entry| entry.value().parameters.clone())
            .collect();
        parameters.sort_by(|a, b| a.name.cmp(&b.name));
        parameters
    }

    pub fn references_to(&self, id: &str) -> Vec<ServiceReference> {
        self.files
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .references
                    .iter()
                    .filter(|r| r.id == id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every known service or alias id, for completion and diagnostics.
    pub fn known_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for entry in self.files.iter() {
            ids.extend(entry.value().services.iter().map(|s| s.id.clone()));
            ids.extend(entry.value().aliases.iter().map(|a| a.id.clone()));
        }
        ids
    }
}

impl Indexer for ServiceIndexer {
    fn id(&self) -> &'static str {
        "symfony.service"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".xml"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        let facts = parse_services_xml(tree.root_node(), content, &key);
        self.store.set(&key, &facts)?;
        self.files.insert(key, facts);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        self.store.remove(&key)?;
        self.files.remove(&key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Extract service facts from a parsed container XML file.
///
/// Files that do not look like Symfony service configuration (no
/// `<container`/`<services`/`<service` in the first KiB) yield no facts.
pub fn parse_services_xml(root: Node<'_>, content: &[u8], path: &str) -> ServiceFileFacts {
    let mut facts = ServiceFileFacts::default();

    let head = &content[..content.len().min(1024)];
    let head = String::from_utf8_lossy(head);
    if !head.contains("<container") && !head.contains("<services") && !head.contains("<service") {
        return facts;
    }

    let Some(container) = find_container(root, content) else {
        return facts;
    };

    if let Some(container_content) = xml::element_content(container) {
        process_children(container_content, content, path, &mut facts);
    }

    collect_argument_references(container, content, path, &mut facts.references);

    facts
}

fn find_container<'t>(root: Node<'t>, content: &[u8]) -> Option<Node<'t>> {
    for i in 0..root.named_child_count() {
        let child = root.named_child(i)?;
        if child.kind() == "element"
            && xml::element_name(child, content) == Some("container")
        {
            return Some(child);
        }
    }
    None
}

fn process_children(
    content_node: Node<'_>,
    content: &[u8],
    path: &str,
    facts: &mut ServiceFileFacts,
) {
    for i in 0..content_node.named_child_count() {
        let Some(child) = content_node.named_child(i) else {
            continue;
        };
        if child.kind() != "element" {
            continue;
        }
        match xml::element_name(child, content) {
            Some("service") => {
                if let Some(service) = process_service(child, content, path) {
                    facts.services.push(service);
                }
            }
            Some("alias") => {
                if let Some(alias) = process_alias(child, content, path) {
                    facts.aliases.push(alias);
                }
            }
            Some("services") | Some("parameters") => {
                if let Some(nested) = xml::element_content(child) {
                    process_children(nested, content, path, facts);
                }
            }
            Some("parameter") => {
                if let Some(parameter) = process_parameter(child, content, path) {
                    facts.parameters.push(parameter);
                }
            }
            _ => {}
        }
    }
}

fn process_service(element: Node<'_>, content: &[u8], path: &str) -> Option<ServiceDefinition> {
    let tag = xml::element_tag(element)?;
    let attrs = xml::attribute_values(tag, content);

    let id = attrs.get("id")?.clone();
    if id.is_empty() || id.contains(' ') {
        return None;
    }
    // Symfony default: a service without a class uses its id as the class.
    let class = attrs
        .get("class")
        .filter(|class| !class.is_empty())
        .cloned()
        .unwrap_or_else(|| id.clone());

    let mut tags = Vec::new();
    if let Some(body) = xml::element_content(element) {
        for i in 0..body.named_child_count() {
            let Some(child) = body.named_child(i) else {
                continue;
            };
            if child.kind() != "element"
                || xml::element_name(child, content) != Some("tag")
            {
                continue;
            }
            let Some(tag_node) = xml::element_tag(child) else {
                continue;
            };
            if let Some(name) = xml::attribute_values(tag_node, content).get("name") {
                if !name.is_empty() {
                    tags.push(name.clone());
                }
            }
        }
    }

    Some(ServiceDefinition {
        id,
        class,
        tags,
        path: path.to_string(),
        position: node_position(element),
    })
}

fn process_alias(element: Node<'_>, content: &[u8], path: &str) -> Option<ServiceAlias> {
    let tag = xml::element_tag(element)?;
    let attrs = xml::attribute_values(tag, content);

    let id = attrs.get("id")?.clone();
    let target = attrs.get("service")?.clone();
    if id.is_empty() || target.is_empty() {
        return None;
    }

    Some(ServiceAlias {
        id,
        target,
        path: path.to_string(),
        position: node_position(element),
    })
}

fn process_parameter(element: Node<'_>, content: &[u8], path: &str) -> Option<ContainerParameter> {
    let tag = xml::element_tag(element)?;
    let attrs = xml::attribute_values(tag, content);

    // Symfony XML uses "key" for the parameter name.
    let name = attrs.get("key")?.clone();
    if name.is_empty() {
        return None;
    }

    let value = if attrs.get("type").map(String::as_str) == Some("service") {
        attrs
            .get("id")
            .map(|id| format!("@{}", id))
            .unwrap_or_default()
    } else if let Some(value) = attrs.get("value") {
        value.clone()
    } else if let Some(body) = xml::element_content(element) {
        node_text(body, content).trim().to_string()
    } else {
        String::new()
    };

    Some(ContainerParameter {
        name,
        value,
        path: path.to_string(),
        position: node_position(element),
    })
}

/// Record every `<argument type="service" id="..."/>` with the position of
/// its id value, for find-references and unknown-service diagnostics.
fn collect_argument_references(
    node: Node<'_>,
    content: &[u8],
    path: &str,
    references: &mut Vec<ServiceReference>,
) {
    if node.kind() == "element" && xml::element_name(node, content) == Some("argument") {
        if let Some(tag) = xml::element_tag(node) {
            let attrs = xml::attribute_values(tag, content);
            if attrs.get("type").map(String::as_str) == Some("service") {
                if let Some(id) = attrs.get("id").filter(|id| !id.is_empty()) {
                    let position = xml::attribute_value_node(tag, "id", content)
                        .map(node_position)
                        .unwrap_or_else(|| node_position(node));
                    references.push(ServiceReference {
                        id: id.clone(),
                        path: path.to_string(),
                        position,
                    });
                }
            }
        }
    }

    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            collect_argument_references(child, content, path, references);
        }
    }
}

fn node_position(node: Node<'_>) -> FilePosition {
    let start = node.start_position();
    FilePosition::new(start.row as u32, start.column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_parser::ParserPool;

    const SERVICES_XML: &str = r#"<?xml version="1.0" ?>
<container xmlns="http://symfony.com/schema/dic/services">
    <parameters>
        <parameter key="shopware.cdn.url">https://cdn.example</parameter>
        <parameter key="shopware.media.storage" type="service" id="media.storage"/>
    </parameters>
    <services>
        <service id="product.repository" class="Shopware\Core\Content\Product\ProductRepository">
            <tag name="shopware.entity.repository"/>
            <argument type="service" id="db.connection"/>
        </service>
        <service id="media.storage"/>
        <alias id="product.repo" service="product.repository"/>
    </services>
</container>
"#;

    fn parse(content: &str) -> ServiceFileFacts {
        let pool = ParserPool::new();
        let tree = pool.parse(".xml", content.as_bytes()).unwrap();
        parse_services_xml(tree.root_node(), content.as_bytes(), "/srv/services.xml")
    }

    #[test]
    fn test_parse_services() {
        let facts = parse(SERVICES_XML);

        assert_eq!(facts.services.len(), 2);
        let product = &facts.services[0];
        assert_eq!(product.id, "product.repository");
        assert_eq!(
            product.class,
            "Shopware\\Core\\Content\\Product\\ProductRepository"
        );
        assert_eq!(product.tags, vec!["shopware.entity.repository"]);
        assert_eq!(product.position.line, 7);

        // Service without a class falls back to the id.
        let media = &facts.services[1];
        assert_eq!(media.id, "media.storage");
        assert_eq!(media.class, "media.storage");
    }

    #[test]
    fn test_parse_aliases_and_parameters() {
        let facts = parse(SERVICES_XML);

        assert_eq!(facts.aliases.len(), 1);
        assert_eq!(facts.aliases[0].id, "product.repo");
        assert_eq!(facts.aliases[0].target, "product.repository");

        assert_eq!(facts.parameters.len(), 2);
        assert_eq!(facts.parameters[0].name, "shopware.cdn.url");
        assert_eq!(facts.parameters[0].value, "https://cdn.example");
        assert_eq!(facts.parameters[1].name, "shopware.media.storage");
        assert_eq!(facts.parameters[1].value, "@media.storage");
    }

    #[test]
    fn test_argument_references() {
        let facts = parse(SERVICES_XML);
        assert_eq!(facts.references.len(), 1);
        assert_eq!(facts.references[0].id, "db.connection");
        assert_eq!(facts.references[0].position.line, 9);
    }

    #[test]
    fn test_non_service_xml_yields_nothing() {
        let facts = parse("<?xml version=\"1.0\"?>\n<routes><route id=\"a\"/></routes>\n");
        assert_eq!(facts, ServiceFileFacts::default());
    }

    #[test]
    fn test_service_id_with_space_is_rejected() {
        let facts = parse("<container><services><service id=\"bad id\"/></services></container>");
        assert!(facts.services.is_empty());
    }

    #[test]
    fn test_indexer_replaces_and_removes_facts() {
        let indexer = ServiceIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let path = Path::new("/srv/services.xml");

        let v1 = "<container><services><service id=\"one\" class=\"App\\One\"/></services></container>";
        let tree = pool.parse(".xml", v1.as_bytes()).unwrap();
        indexer.index_file(path, &tree, v1.as_bytes()).unwrap();
        assert!(indexer.service_by_id("one").is_some());

        let v2 = "<container><services><service id=\"two\" class=\"App\\Two\"/></services></container>";
        let tree = pool.parse(".xml", v2.as_bytes()).unwrap();
        indexer.index_file(path, &tree, v2.as_bytes()).unwrap();
        assert!(indexer.service_by_id("one").is_none());
        assert!(indexer.service_by_id("two").is_some());

        indexer.remove_file(path).unwrap();
        assert!(indexer.service_by_id("two").is_none());
        indexer.remove_file(path).unwrap();
    }

    #[test]
    fn test_alias_resolution_in_lookup() {
        let indexer = ServiceIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let content = SERVICES_XML;
        let tree = pool.parse(".xml", content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/srv/services.xml"), &tree, content.as_bytes())
            .unwrap();

        let resolved = indexer.service_by_id("product.repo").unwrap();
        assert_eq!(resolved.id, "product.repository");

        let ids = indexer.known_ids();
        assert!(ids.contains("product.repository"));
        assert!(ids.contains("product.repo"));
        assert!(ids.contains("media.storage"));
    }
}
