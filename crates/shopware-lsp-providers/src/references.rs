//! Find-references providers.

use shopware_lsp_index::indexers::ServiceIndexer;
use shopware_lsp_parser::{node_text, xml};
use std::sync::Arc;
use tower_lsp::lsp_types::Location;

use crate::{location, DocumentContext, ReferencesProvider};

/// References to a service id from `<argument type="service">` sites
/// across the indexed container XML.
pub struct ServiceReferencesProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceReferencesProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        ServiceReferencesProvider { services }
    }
}

impl ReferencesProvider for ServiceReferencesProvider {
    fn references(&self, ctx: &DocumentContext<'_>) -> Vec<Location> {
        if ctx.extension != ".xml" {
            return Vec::new();
        }
        let Some(node) = ctx.node else {
            return Vec::new();
        };
        if !xml::is_service_id_attribute(node, ctx.text)
            && !xml::is_service_argument_reference(node, ctx.text)
        {
            return Vec::new();
        }

        let id = xml::unquote(node_text(node, ctx.text));
        self.services
            .references_to(id)
            .into_iter()
            .filter_map(|reference| location(&reference.path, reference.position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{index_file, ContextFixture};

    #[test]
    fn test_references_from_definition_site() {
        let services = Arc::new(ServiceIndexer::in_memory().unwrap());
        index_file(
            services.as_ref(),
            "/srv/services.xml",
            ".xml",
            r#"<container><services>
    <service id="db.connection" class="App\Db"/>
    <service id="consumer.a">
        <argument type="service" id="db.connection"/>
    </service>
    <service id="consumer.b">
        <argument type="service" id="db.connection"/>
    </service>
</services></container>"#,
        );

        let provider = ServiceReferencesProvider::new(services);
        let fixture = ContextFixture::parse(
            "/srv/services.xml",
            ".xml",
            "<container><services><service id=\"db.connection\" class=\"App\\Db\"/></services></container>",
        );
        // Cursor on the service id attribute of the definition.
        let locations = fixture.with_context_at(0, 36, |ctx| provider.references(ctx));

        assert_eq!(locations.len(), 2);
        assert!(locations.iter().all(|l| l.uri.path().ends_with("services.xml")));
    }

    #[test]
    fn test_no_references_for_plain_text_node() {
        let services = Arc::new(ServiceIndexer::in_memory().unwrap());
        let provider = ServiceReferencesProvider::new(services);
        let fixture = ContextFixture::parse("/srv/services.xml", ".xml", "<container>text</container>");
        let locations = fixture.with_context_at(0, 12, |ctx| provider.references(ctx));
        assert!(locations.is_empty());
    }
}
