//! Edit derivation: one walk over the syntax tree, pure-data edits out.
//!
//! The engine knows two fixed tables: the legacy interfaces a managed
//! extension class may implement, and the (class, method, namespace) call
//! signatures whose designated argument names a migratable component.
//! Everything it emits is a [`TokenEdit`] into the original source; it
//! never mutates text itself.

use std::collections::BTreeMap;
use tree_sitter::{Node, Tree};

use super::edits::TokenEdit;
use crate::core::ComponentType;
use crate::error::Result;
use crate::names::NameRegistry;

/// Interfaces replaced by the single target interface.
pub const LEGACY_INTERFACES: &[&str] = &["VlocityOpenInterface", "VlocityOpenInterface2"];

/// The target single-interface form.
pub const TARGET_INTERFACE: &str = "Callable";

const SHIM_METHOD: &str = "call";
const SHIM_ARITY: usize = 2;

/// Shim method injected when a class loses its legacy interfaces and has
/// no `call(action, args)` entry point of its own.
const SHIM_BODY: &str = "\n\
    public Object call(String action, Map<String, Object> args) {\n\
        return invokeMethod(\n\
            action,\n\
            (Map<String, Object>) args.get(\"input\"),\n\
            (Map<String, Object>) args.get(\"output\"),\n\
            (Map<String, Object>) args.get(\"options\"));\n\
    }\n";

/// One call-site pattern whose argument names a component.
pub struct CallSignature {
    pub class_name: &'static str,
    pub method: &'static str,
    /// Zero-based position of the component-name argument.
    pub arg_index: usize,
    pub component_type: ComponentType,
}

/// The fixed call-site table.
pub static CALL_SIGNATURES: &[CallSignature] = &[
    CallSignature {
        class_name: "DRGlobal",
        method: "process",
        arg_index: 1,
        component_type: ComponentType::DataMapper,
    },
    CallSignature {
        class_name: "DRGlobal",
        method: "processObjectsJson",
        arg_index: 1,
        component_type: ComponentType::DataMapper,
    },
    CallSignature {
        class_name: "IntegrationProcedureService",
        method: "runIntegrationService",
        arg_index: 0,
        component_type: ComponentType::IntegrationProcedure,
    },
];

/// Derives edits for one file.
pub struct RewriteEngine<'r> {
    namespace: String,
    registry: &'r NameRegistry,
}

#[derive(Debug)]
struct InterfaceFact {
    start: usize,
    end: usize,
    legacy: bool,
}

#[derive(Debug)]
enum CallArgument {
    Literal { start: usize, end: usize, text: String },
    Variable { name: String, line: usize },
    Opaque { line: usize },
}

struct Analysis {
    interfaces: Vec<InterfaceFact>,
    /// Byte position just after the class body's opening brace.
    body_insert_at: Option<usize>,
    has_shim: bool,
    calls: Vec<(usize, CallArgument)>,
    /// Variable name → string-literal initializers seen in the file.
    bindings: BTreeMap<String, Vec<(usize, usize, String)>>,
}

impl<'r> RewriteEngine<'r> {
    /// Requires a built registry: a rewriting consumer running against a
    /// partially populated registry is a correctness bug, surfaced as
    /// `RegistryNotBuilt` on the first name resolution.
    pub fn new(namespace: impl Into<String>, registry: &'r NameRegistry) -> Self {
        Self {
            namespace: namespace.into(),
            registry,
        }
    }

    /// Derive the full edit set and advisory warnings for one source file.
    ///
    /// Deterministic: edits are sorted by source position, and analysis
    /// collects facts in tree order, so identical input yields identical
    /// output on every run.
    pub fn derive_edits(&self, source: &str, tree: &Tree) -> Result<(Vec<TokenEdit>, Vec<String>)> {
        let analysis = self.analyze(source, tree);
        let mut edits: Vec<TokenEdit> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        // Interface clause: any legacy interface present (alone or in
        // combination with the target) collapses the whole clause to the
        // single target interface.
        let any_legacy = analysis.interfaces.iter().any(|i| i.legacy);
        if any_legacy {
            let start = analysis.interfaces.iter().map(|i| i.start).min().unwrap();
            let end = analysis.interfaces.iter().map(|i| i.end).max().unwrap();
            edits.push(TokenEdit::replace_range(start, end, TARGET_INTERFACE));

            if !analysis.has_shim {
                if let Some(at) = analysis.body_insert_at {
                    edits.push(TokenEdit::insert_after(at, SHIM_BODY));
                }
            }
        }

        // Call-site arguments.
        let mut literal_spans: Vec<(usize, usize)> = Vec::new();
        for (signature_index, argument) in &analysis.calls {
            let signature = &CALL_SIGNATURES[*signature_index];
            match argument {
                CallArgument::Literal { start, end, text } => {
                    self.push_literal_edit(
                        signature.component_type,
                        *start,
                        *end,
                        text,
                        &mut edits,
                        &mut literal_spans,
                    )?;
                }
                CallArgument::Variable { name, line } => {
                    match analysis.bindings.get(name) {
                        // Provable: exactly one literal initializer.
                        Some(decls) if decls.len() == 1 => {
                            let (start, end, text) = &decls[0];
                            self.push_literal_edit(
                                signature.component_type,
                                *start,
                                *end,
                                text,
                                &mut edits,
                                &mut literal_spans,
                            )?;
                        }
                        Some(_) => warnings.push(format!(
                            "line {line}: variable '{name}' has multiple initializers; \
                             manual follow-up required"
                        )),
                        None => warnings.push(format!(
                            "line {line}: variable '{name}' cannot be traced to a literal; \
                             manual follow-up required"
                        )),
                    }
                }
                CallArgument::Opaque { line } => warnings.push(format!(
                    "line {line}: {}.{} argument is not rewritable; review manually",
                    signature.class_name, signature.method
                )),
            }
        }

        edits.sort_by_key(|e| (e.start, e.end));
        edits.dedup();
        Ok((edits, warnings))
    }

    /// Clean a quoted component-name literal; emits an edit only when the
    /// cleaned value differs. `spans` dedupes literals referenced from
    /// more than one call site.
    fn push_literal_edit(
        &self,
        component_type: ComponentType,
        start: usize,
        end: usize,
        text: &str,
        edits: &mut Vec<TokenEdit>,
        spans: &mut Vec<(usize, usize)>,
    ) -> Result<()> {
        if spans.contains(&(start, end)) {
            return Ok(());
        }
        spans.push((start, end));

        // Literal text includes its quotes.
        let inner = &text[1..text.len() - 1];
        let cleaned = self.registry.target_name(component_type, inner)?;
        if cleaned != inner {
            let quote = &text[..1];
            edits.push(TokenEdit::replace_token(
                start,
                end,
                format!("{quote}{cleaned}{quote}"),
            ));
        }
        Ok(())
    }

    fn analyze(&self, source: &str, tree: &Tree) -> Analysis {
        let mut analysis = Analysis {
            interfaces: Vec::new(),
            body_insert_at: None,
            has_shim: false,
            calls: Vec::new(),
            bindings: BTreeMap::new(),
        };
        let bytes = source.as_bytes();

        walk(tree.root_node(), &mut |node| match node.kind() {
            "class_declaration" => {
                // Interface and shim facts come from the outermost class.
                if analysis.body_insert_at.is_none() {
                    self.collect_class_facts(node, bytes, &mut analysis);
                }
            }
            "method_invocation" => {
                self.collect_call_facts(node, bytes, &mut analysis);
            }
            "variable_declarator" => {
                collect_binding(node, bytes, &mut analysis);
            }
            _ => {}
        });

        analysis
    }

    fn collect_class_facts(&self, class: Node<'_>, source: &[u8], analysis: &mut Analysis) {
        if let Some(body) = class.child_by_field_name("body") {
            // The class body node starts at its opening brace.
            analysis.body_insert_at = Some(body.start_byte() + 1);

            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                if member.kind() != "method_declaration" {
                    continue;
                }
                let name = member
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok())
                    .unwrap_or("");
                let arity = member
                    .child_by_field_name("parameters")
                    .map(|p| p.named_child_count())
                    .unwrap_or(0);
                if name == SHIM_METHOD && arity == SHIM_ARITY {
                    analysis.has_shim = true;
                }
            }
        }

        let Some(interfaces) = class.child_by_field_name("interfaces") else {
            return;
        };
        let mut cursor = interfaces.walk();
        for child in interfaces.children(&mut cursor) {
            if child.kind() != "type_list" {
                continue;
            }
            let mut list_cursor = child.walk();
            for ty in child.named_children(&mut list_cursor) {
                let text = ty.utf8_text(source).unwrap_or("");
                let (prefix, simple) = split_qualifier(text);
                let namespace_ok = prefix.is_empty() || prefix == self.namespace;
                analysis.interfaces.push(InterfaceFact {
                    start: ty.start_byte(),
                    end: ty.end_byte(),
                    legacy: namespace_ok && LEGACY_INTERFACES.contains(&simple),
                });
            }
        }
    }

    fn collect_call_facts(&self, call: Node<'_>, source: &[u8], analysis: &mut Analysis) {
        let Some(object) = call.child_by_field_name("object") else {
            return;
        };
        let Some(name) = call.child_by_field_name("name") else {
            return;
        };
        let receiver = object.utf8_text(source).unwrap_or("");
        let method = name.utf8_text(source).unwrap_or("");
        let (prefix, class_name) = split_qualifier(receiver);

        for (index, signature) in CALL_SIGNATURES.iter().enumerate() {
            if signature.method != method || signature.class_name != class_name {
                continue;
            }
            if !prefix.is_empty() && prefix != self.namespace {
                continue;
            }

            let argument = call
                .child_by_field_name("arguments")
                .and_then(|args| {
                    let mut cursor = args.walk();
                    let arg = args.named_children(&mut cursor).nth(signature.arg_index);
                    arg.map(|arg| match arg.kind() {
                        "string_literal" => CallArgument::Literal {
                            start: arg.start_byte(),
                            end: arg.end_byte(),
                            text: arg.utf8_text(source).unwrap_or("").to_string(),
                        },
                        "identifier" => CallArgument::Variable {
                            name: arg.utf8_text(source).unwrap_or("").to_string(),
                            line: arg.start_position().row + 1,
                        },
                        _ => CallArgument::Opaque {
                            line: arg.start_position().row + 1,
                        },
                    })
                })
                .unwrap_or(CallArgument::Opaque {
                    line: call.start_position().row + 1,
                });

            analysis.calls.push((index, argument));
        }
    }
}

/// Record `name = "literal"` variable initializers for the second pass.
fn collect_binding(declarator: Node<'_>, source: &[u8], analysis: &mut Analysis) {
    let Some(name) = declarator.child_by_field_name("name") else {
        return;
    };
    let Some(value) = declarator.child_by_field_name("value") else {
        return;
    };
    if value.kind() != "string_literal" {
        return;
    }
    let name = name.utf8_text(source).unwrap_or("").to_string();
    analysis.bindings.entry(name).or_default().push((
        value.start_byte(),
        value.end_byte(),
        value.utf8_text(source).unwrap_or("").to_string(),
    ));
}

/// Split `Ns.Name` into (`Ns`, `Name`); unqualified names yield an empty
/// prefix.
fn split_qualifier(text: &str) -> (&str, &str) {
    match text.rsplit_once('.') {
        Some((prefix, simple)) => (prefix, simple),
        None => ("", text),
    }
}

fn walk<'t>(node: Node<'t>, visit: &mut impl FnMut(Node<'t>)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ComponentInventory;
    use crate::rewrite::edits::{apply_edits, EditKind};
    use crate::rewrite::parser::SourceParser;

    fn built_registry() -> NameRegistry {
        let mut registry = NameRegistry::new();
        registry.pre_process_components(&ComponentInventory::default());
        registry
    }

    fn derive(registry: &NameRegistry, source: &str) -> (Vec<TokenEdit>, Vec<String>) {
        let mut parser = SourceParser::new().unwrap();
        let tree = parser.parse("Test.cls", source).unwrap();
        RewriteEngine::new("vlocity_ins", registry)
            .derive_edits(source, &tree)
            .unwrap()
    }

    const LEGACY_CLASS: &str = "\
public class QuoteHandler implements vlocity_ins.VlocityOpenInterface2 {
    public Boolean invokeMethod(String methodName, Map<String, Object> input,
            Map<String, Object> output, Map<String, Object> options) {
        return true;
    }
}
";

    #[test]
    fn test_legacy_interface_swapped_and_shim_inserted() {
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, LEGACY_CLASS);

        assert!(warnings.is_empty());
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].kind, EditKind::ReplaceRange);
        assert_eq!(edits[0].replacement, TARGET_INTERFACE);
        assert_eq!(edits[1].kind, EditKind::InsertAfter);

        let rewritten = apply_edits(LEGACY_CLASS, &edits).unwrap();
        assert!(rewritten.contains("implements Callable {"));
        assert!(rewritten.contains("public Object call(String action, Map<String, Object> args)"));
        assert!(!rewritten.contains("VlocityOpenInterface"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let registry = built_registry();
        let (edits, _) = derive(&registry, LEGACY_CLASS);
        let rewritten = apply_edits(LEGACY_CLASS, &edits).unwrap();

        let (again, warnings) = derive(&registry, &rewritten);
        assert!(again.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_mixed_interface_list_collapses_to_single_target() {
        let source = "\
public class Mixed implements Callable, VlocityOpenInterface, vlocity_ins.VlocityOpenInterface2 {
    public Boolean invokeMethod(String m, Map<String, Object> i,
            Map<String, Object> o, Map<String, Object> opts) {
        return true;
    }
}
";
        let registry = built_registry();
        let (edits, _) = derive(&registry, source);
        let rewritten = apply_edits(source, &edits).unwrap();

        assert!(rewritten.contains("implements Callable {"));
        assert_eq!(rewritten.matches("Callable").count(), 1);
    }

    #[test]
    fn test_target_only_class_needs_no_edits() {
        let source = "\
public class Done implements Callable {
    public Object call(String action, Map<String, Object> args) {
        return null;
    }
}
";
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, source);
        assert!(edits.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_existing_call_method_suppresses_shim() {
        let source = "\
public class HasShim implements VlocityOpenInterface {
    public Object call(String action, Map<String, Object> args) {
        return null;
    }
}
";
        let registry = built_registry();
        let (edits, _) = derive(&registry, source);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::ReplaceRange);
    }

    #[test]
    fn test_literal_argument_is_cleaned() {
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        Object result = vlocity_ins.DRGlobal.process(input, \"My-Data Mapper!\");
    }
}
";
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, source);

        assert!(warnings.is_empty());
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::ReplaceToken);
        assert_eq!(edits[0].replacement, "\"MyDataMapper\"");

        let rewritten = apply_edits(source, &edits).unwrap();
        assert!(rewritten.contains("DRGlobal.process(input, \"MyDataMapper\")"));
    }

    #[test]
    fn test_procedure_argument_keeps_underscores() {
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        Object r = IntegrationProcedureService.runIntegrationService(\"Get Quotes_v2\", input, null);
    }
}
";
        let registry = built_registry();
        let (edits, _) = derive(&registry, source);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].replacement, "\"GetQuotes_v2\"");
    }

    #[test]
    fn test_variable_argument_traced_to_declaration() {
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        String bundleName = \"My Bundle!\";
        Object r = DRGlobal.process(input, bundleName);
    }
}
";
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, source);

        assert!(warnings.is_empty());
        assert_eq!(edits.len(), 1);

        let rewritten = apply_edits(source, &edits).unwrap();
        assert!(rewritten.contains("String bundleName = \"MyBundle\";"));
    }

    #[test]
    fn test_untraceable_argument_yields_warning_not_edit() {
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        Object r = DRGlobal.process(input, resolveName());
    }

    public String resolveName() {
        return \"dynamic\";
    }
}
";
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, source);

        assert!(edits.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("line 3"));
        assert!(warnings[0].contains("DRGlobal.process"));
    }

    #[test]
    fn test_foreign_namespace_receiver_ignored() {
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        Object r = other_ns.DRGlobal.process(input, \"Messy Name!\");
    }
}
";
        let registry = built_registry();
        let (edits, warnings) = derive(&registry, source);
        assert!(edits.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unbuilt_registry_is_an_error() {
        let registry = NameRegistry::new();
        let mut parser = SourceParser::new().unwrap();
        let source = "\
public class Caller {
    public void run(Map<String, Object> input) {
        Object r = DRGlobal.process(input, \"Some Name\");
    }
}
";
        let tree = parser.parse("Test.cls", source).unwrap();
        let err = RewriteEngine::new("vlocity_ins", &registry)
            .derive_edits(source, &tree)
            .unwrap_err();
        assert!(matches!(err, crate::error::MigrateError::RegistryNotBuilt));
    }
}
