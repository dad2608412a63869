//! PHP fact extraction from the tree-sitter CST.
//!
//! Walks a parsed PHP file and produces `PhpFileFacts` (namespace, use
//! statements, classes) plus Symfony `#[Route]` attribute routes.

use shopware_lsp_types::{FilePosition, PhpClass, PhpFileFacts, PhpMethod, PhpUse, Route};
use tree_sitter::Node;

use crate::node_text;

/// Extract namespace, use statements, and class declarations from a file.
pub fn extract_php_facts(root: Node<'_>, text: &[u8], path: &str) -> PhpFileFacts {
    let mut facts = PhpFileFacts::default();

    // First pass: namespace and imports, so class extends can resolve.
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "namespace_definition" => {
                if let Some(ns) = find_namespace_name(child, text) {
                    facts.namespace = Some(ns);
                }
            }
            "namespace_use_declaration" => {
                extract_use_statements(child, text, &mut facts.uses);
            }
            _ => {}
        }
    }

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        collect_classes(child, text, path, &mut facts);
    }

    facts
}

/// Extract Symfony routes from `#[Route]` attributes.
///
/// Only method-level attributes produce routes; a class-level `#[Route]`
/// contributes its path as a base prefix.
pub fn extract_routes(root: Node<'_>, text: &[u8], path: &str) -> Vec<Route> {
    let facts = extract_php_facts(root, text, path);
    let mut routes = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        walk_route_classes(child, text, path, &facts, &mut routes);
    }

    routes
}

fn walk_route_classes(
    node: Node<'_>,
    text: &[u8],
    path: &str,
    facts: &PhpFileFacts,
    routes: &mut Vec<Route>,
) {
    if node.kind() == "class_declaration" {
        extract_class_routes(node, text, path, facts, routes);
        return;
    }
    // namespace_definition with braces nests declarations one level down.
    if node.kind() == "namespace_definition" {
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                walk_route_classes(child, text, path, facts, routes);
            }
        }
    }
}

fn extract_class_routes(
    class: Node<'_>,
    text: &[u8],
    path: &str,
    facts: &PhpFileFacts,
    routes: &mut Vec<Route>,
) {
    let Some(name_node) = class.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(name_node, text);
    let class_fqn = match &facts.namespace {
        Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, class_name),
        _ => class_name.to_string(),
    };

    let base_path = route_attributes(class, text)
        .into_iter()
        .find_map(|attr| attr.path)
        .unwrap_or_default();

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for member in body.children(&mut cursor) {
        if member.kind() != "method_declaration" {
            continue;
        }
        let Some(method_name) = member.child_by_field_name("name") else {
            continue;
        };
        for attr in route_attributes(member, text) {
            let Some(name) = attr.name else {
                continue;
            };
            routes.push(Route {
                name,
                url_path: format!("{}{}", base_path, attr.path.unwrap_or_default()),
                controller: format!("{}::{}", class_fqn, node_text(method_name, text)),
                path: path.to_string(),
                position: position_of(attr.node),
            });
        }
    }
}

struct RouteAttribute<'t> {
    node: Node<'t>,
    path: Option<String>,
    name: Option<String>,
}

/// All `#[Route(...)]` attributes attached to a declaration node.
fn route_attributes<'t>(declaration: Node<'t>, text: &[u8]) -> Vec<RouteAttribute<'t>> {
    let mut found = Vec::new();
    let mut cursor = declaration.walk();
    for child in declaration.children(&mut cursor) {
        if child.kind() != "attribute_list" {
            continue;
        }
        let mut groups = child.walk();
        for group in child.children(&mut groups) {
            if group.kind() != "attribute_group" {
                continue;
            }
            let mut attrs = group.walk();
            for attr in group.children(&mut attrs) {
                if attr.kind() != "attribute" {
                    continue;
                }
                let Some(attr_name) = attr.named_child(0) else {
                    continue;
                };
                let name_text = node_text(attr_name, text);
                if name_text != "Route" && !name_text.ends_with("\\Route") {
                    continue;
                }
                let (path, name) = route_arguments(attr, text);
                found.push(RouteAttribute { node: attr, path, name });
            }
        }
    }
    found
}

/// (path, name) from the attribute's argument list.
///
/// Symfony's signature puts `path` first and `name` second positionally;
/// named arguments override position.
fn route_arguments(attr: Node<'_>, text: &[u8]) -> (Option<String>, Option<String>) {
    let mut path = None;
    let mut name = None;

    let Some(args) = (0..attr.named_child_count())
        .filter_map(|i| attr.named_child(i))
        .find(|n| n.kind() == "arguments")
    else {
        return (path, name);
    };

    let mut positional = 0usize;
    let mut cursor = args.walk();
    for arg in args.children(&mut cursor) {
        if arg.kind() != "argument" {
            continue;
        }
        let label = arg
            .child_by_field_name("name")
            .map(|n| node_text(n, text).to_string());
        let Some(value) = string_argument_value(arg, text) else {
            if label.is_none() {
                positional += 1;
            }
            continue;
        };

        match label.as_deref() {
            Some("path") => path = Some(value),
            Some("name") => name = Some(value),
            Some(_) => {}
            None => {
                match positional {
                    0 => path = Some(value),
                    1 => name = Some(value),
                    _ => {}
                }
                positional += 1;
            }
        }
    }

    (path, name)
}

/// Unquoted value of the first string literal inside an argument node.
fn string_argument_value(arg: Node<'_>, text: &[u8]) -> Option<String> {
    for i in 0..arg.named_child_count() {
        let child = arg.named_child(i)?;
        if child.kind() == "string" || child.kind() == "encapsed_string" {
            let raw = node_text(child, text);
            return Some(raw.trim_matches(|c| c == '\'' || c == '"').to_string());
        }
    }
    None
}

/// Whether `node` sits inside the argument list of a method call like
/// `$this->redirectToRoute(...)`.
pub fn in_method_call_argument(node: Node<'_>, text: &[u8], method: &str) -> bool {
    let mut inside_arguments = false;
    let mut current = Some(node);
    while let Some(n) = current {
        match n.kind() {
            "arguments" => inside_arguments = true,
            "member_call_expression" => {
                if !inside_arguments {
                    return false;
                }
                return n
                    .child_by_field_name("name")
                    .map(|name| node_text(name, text) == method)
                    .unwrap_or(false);
            }
            _ => {}
        }
        current = n.parent();
    }
    false
}

fn find_namespace_name(node: Node<'_>, text: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "namespace_name" {
            return Some(node_text(child, text).to_string());
        }
    }
    None
}

/// Use statements: `use A\B;`, `use A\B as C;`, `use A\{B, C as D};`
fn extract_use_statements(node: Node<'_>, text: &[u8], uses: &mut Vec<PhpUse>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "namespace_use_clause" => {
                if let Some(u) = single_use_clause(child, text, None) {
                    uses.push(u);
                }
            }
            "namespace_use_group" => {
                let prefix = node
                    .child_by_field_name("prefix")
                    .map(|n| node_text(n, text).to_string());
                let mut group_cursor = child.walk();
                for clause in child.children(&mut group_cursor) {
                    if clause.kind() == "namespace_use_clause" {
                        if let Some(u) = single_use_clause(clause, text, prefix.as_deref()) {
                            uses.push(u);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn single_use_clause(clause: Node<'_>, text: &[u8], prefix: Option<&str>) -> Option<PhpUse> {
    let mut fqn: Option<String> = None;
    let mut alias: Option<String> = None;
    let mut saw_as = false;

    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "qualified_name" | "namespace_name" | "name" if !saw_as => {
                fqn = Some(node_text(child, text).to_string());
            }
            "as" => saw_as = true,
            "name" if saw_as => alias = Some(node_text(child, text).to_string()),
            "namespace_aliasing_clause" => {
                alias = child.named_child(0).map(|n| node_text(n, text).to_string());
            }
            _ => {}
        }
    }

    let mut fqn = fqn?;
    if let Some(prefix) = prefix {
        fqn = format!("{}\\{}", prefix, fqn);
    }
    let alias = alias.unwrap_or_else(|| {
        fqn.rsplit('\\').next().unwrap_or(fqn.as_str()).to_string()
    });
    Some(PhpUse { alias, fqn })
}

fn collect_classes(node: Node<'_>, text: &[u8], path: &str, facts: &mut PhpFileFacts) {
    match node.kind() {
        "class_declaration" | "interface_declaration" => {
            if let Some(class) = extract_class(node, text, path, facts) {
                facts.classes.push(class);
            }
        }
        "namespace_definition" => {
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    collect_classes(child, text, path, facts);
                }
            }
        }
        _ => {}
    }
}

fn extract_class(
    node: Node<'_>,
    text: &[u8],
    path: &str,
    facts: &PhpFileFacts,
) -> Option<PhpClass> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, text).to_string();
    let namespace = facts.namespace.clone().unwrap_or_default();
    let fqn = if namespace.is_empty() {
        name.clone()
    } else {
        format!("{}\\{}", namespace, name)
    };

    let extends = base_class_name(node, text).map(|raw| facts.resolve_name(&raw));

    let mut methods = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if member.kind() == "method_declaration" {
                if let Some(method_name) = member.child_by_field_name("name") {
                    methods.push(PhpMethod {
                        name: node_text(method_name, text).to_string(),
                        position: position_of(method_name),
                    });
                }
            }
        }
    }

    Some(PhpClass {
        name,
        fqn,
        namespace,
        extends,
        is_interface: node.kind() == "interface_declaration",
        path: path.to_string(),
        position: position_of(name_node),
        methods,
    })
}

fn base_class_name(class: Node<'_>, text: &[u8]) -> Option<String> {
    let mut cursor = class.walk();
    for child in class.children(&mut cursor) {
        if child.kind() == "base_clause" {
            for i in 0..child.named_child_count() {
                let base = child.named_child(i)?;
                if base.kind() == "name" || base.kind() == "qualified_name" {
                    return Some(node_text(base, text).to_string());
                }
            }
        }
    }
    None
}

fn position_of(node: Node<'_>) -> FilePosition {
    let start = node.start_position();
    FilePosition::new(start.row as u32, start.column as u32)
}
