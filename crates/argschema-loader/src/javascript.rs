//! Static `argsConstraints` discovery in JavaScript and TypeScript modules
//!
//! Parses driver sources with ast-grep instead of executing them. Recognized forms:
//!
//! ```js
//! class FakeDriver extends BaseDriver {
//!   static argsConstraints = { ... };
//!   static get argsConstraints () { return { ... }; }
//! }
//! FakeDriver.argsConstraints = { ... };
//! export const argsConstraints = { ... };
//! ```
//!
//! Only `static` members count; instance fields and getters are not visible on the class.
//!
//! Relative `import`, `export ... from` and `require()` targets are scanned before the module
//! that imports them. Their static exports become bindings of the importer, so
//! `static argsConstraints = cliArgs` works when `cliArgs` comes from another file.

use ast_grep_core::{AstGrep, Doc, Language, Node};
use ast_grep_language::{JavaScript, Tsx, TypeScript};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use argschema_core::constraints::is_truthy;

use crate::literal::{evaluate, evaluate_name, first_named_child, unquote, Bindings};
use crate::resolve::resolve_from;
use crate::{FoundConstraints, LoadError, LoadOptions};

const ARGS_CONSTRAINTS: &str = "argsConstraints";

/// Name a default export is recorded under
const DEFAULT_EXPORT: &str = "default";

/// Constraints declared on one class
#[derive(Debug, Clone)]
pub(crate) struct ClassConstraints {
    pub class_name: String,
    pub constraints: Result<Value, String>,
}

/// What a single source file tells us about constraints and exports
#[derive(Debug, Clone, Default)]
pub(crate) struct ScannedModule {
    pub path: PathBuf,
    pub declared_classes: Vec<String>,
    pub class_constraints: Vec<ClassConstraints>,
    /// Local name of the class (or value) exported as default
    pub default_export: Option<String>,
    /// Static values of named exports, in export order
    pub exports: Vec<(String, Result<Value, String>)>,
    /// Value assigned to `module.exports`
    pub commonjs_exports: Option<Result<Value, String>>,
    pub imports: Vec<String>,
}

impl ScannedModule {
    fn from_json(path: &Path, value: Value) -> Self {
        let mut module = ScannedModule {
            path: path.to_path_buf(),
            ..Default::default()
        };
        if let Value::Object(map) = &value {
            for (name, field) in map {
                module.set_export(name.clone(), Ok(field.clone()));
            }
        }
        module.commonjs_exports = Some(Ok(value));
        module
    }

    fn constraints_of(&self, class_name: &str) -> Option<&ClassConstraints> {
        self.class_constraints
            .iter()
            .rev()
            .find(|c| c.class_name == class_name)
    }

    fn set_export(&mut self, name: String, value: Result<Value, String>) {
        match self.exports.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.exports.push((name, value)),
        }
    }

    fn has_export(&self, name: &str) -> bool {
        self.exports.iter().any(|(existing, _)| existing == name)
    }

    fn export(&self, imported: &Imported) -> Option<Result<Value, String>> {
        match imported {
            Imported::Named(name) => self
                .exports
                .iter()
                .find(|(existing, _)| existing == name)
                .map(|(_, value)| value.clone()),
            Imported::Default => self
                .commonjs_exports
                .clone()
                .or_else(|| self.export(&Imported::Named(DEFAULT_EXPORT.to_string()))),
            Imported::Namespace => Some(Ok(self.namespace())),
        }
    }

    /// What `import * as ns` or `require()` sees
    fn namespace(&self) -> Value {
        if let Some(Ok(value)) = &self.commonjs_exports {
            return value.clone();
        }
        let exports: Map<String, Value> = self
            .exports
            .iter()
            .filter_map(|(name, value)| value.as_ref().ok().map(|v| (name.clone(), v.clone())))
            .collect();
        Value::Object(exports)
    }

    /// `argsConstraints` as a property of the module namespace
    fn module_constraints(&self) -> Option<Result<Value, String>> {
        self.export(&Imported::Named(ARGS_CONSTRAINTS.to_string()))
    }
}

/// Which export of the source module an import binds
#[derive(Debug, Clone, PartialEq, Eq)]
enum Imported {
    Default,
    Namespace,
    Named(String),
}

impl fmt::Display for Imported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imported::Default => write!(f, "default"),
            Imported::Namespace => write!(f, "*"),
            Imported::Named(name) => write!(f, "'{}'", name),
        }
    }
}

/// `import { imported as local } from 'specifier'` and its CommonJS forms
#[derive(Debug, Clone)]
struct ImportBinding {
    local: String,
    specifier: String,
    imported: Imported,
}

/// `export { imported as exported } from 'specifier'`; `exported` is `None` for `export *`
#[derive(Debug, Clone)]
struct ReExport {
    exported: Option<String>,
    specifier: String,
    imported: Imported,
}

#[derive(Debug, Default)]
struct ImportTable {
    specifiers: Vec<String>,
    bindings: Vec<ImportBinding>,
    reexports: Vec<ReExport>,
}

pub(crate) fn is_script(path: &Path) -> bool {
    matches!(
        extension(path).as_str(),
        "js" | "mjs" | "cjs" | "jsx" | "ts" | "mts" | "cts" | "tsx"
    )
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Find the constraints of `main_class` starting at `entry`
///
/// Precedence: a class named `main_class` anywhere in the import graph, then the entry
/// module's default export, then an `argsConstraints` export of the entry module.
/// A falsy value counts as no constraints at all.
pub(crate) fn find_constraints(
    entry: &Path,
    main_class: &str,
    options: &LoadOptions,
) -> Result<Option<FoundConstraints>, LoadError> {
    let modules = scan_graph(entry, options)?;

    if modules.iter().any(|m| m.declared_classes.iter().any(|c| c == main_class)) {
        debug!("Found class {} in import graph of {:?}", main_class, entry);
        return found_for_class(&modules, main_class);
    }

    let Some(entry_module) = modules.first() else {
        return Ok(None);
    };

    if let Some(default_name) = &entry_module.default_export {
        debug!("Falling back to default export {} of {:?}", default_name, entry);
        if let Some(found) = found_for_class(&modules, default_name)? {
            return Ok(Some(found));
        }
    }

    match entry_module.module_constraints() {
        Some(result) => to_found(&entry_module.path, "module exports", &result),
        None => Ok(None),
    }
}

fn found_for_class(
    modules: &[ScannedModule],
    class_name: &str,
) -> Result<Option<FoundConstraints>, LoadError> {
    for module in modules {
        if let Some(class) = module.constraints_of(class_name) {
            let origin = format!("class {}", class_name);
            return to_found(&module.path, &origin, &class.constraints);
        }
    }
    Ok(None)
}

fn to_found(
    path: &Path,
    origin: &str,
    result: &Result<Value, String>,
) -> Result<Option<FoundConstraints>, LoadError> {
    match result {
        Ok(value) if !is_truthy(value) => {
            debug!("argsConstraints of {} in {:?} is {}", origin, path, value);
            Ok(None)
        }
        Ok(value) => Ok(Some(FoundConstraints {
            value: value.clone(),
            source: path.to_path_buf(),
            origin: origin.to_string(),
        })),
        Err(message) => Err(LoadError::Evaluate {
            path: path.to_path_buf(),
            origin: origin.to_string(),
            message: message.clone(),
        }),
    }
}

/// Scan `entry` and, when enabled, every relative module it imports
///
/// The entry module comes first in the result.
fn scan_graph(entry: &Path, options: &LoadOptions) -> Result<Vec<ScannedModule>, LoadError> {
    let mut scan = GraphScan::new(options);
    scan.scan_file(entry, 0)?;
    let mut modules = scan.modules;
    // imports are pushed before their importers
    modules.reverse();
    Ok(modules)
}

/// Depth-first scan of an import graph
struct GraphScan<'o> {
    options: &'o LoadOptions,
    visited: HashSet<PathBuf>,
    modules: Vec<ScannedModule>,
    index: HashMap<PathBuf, usize>,
}

impl<'o> GraphScan<'o> {
    fn new(options: &'o LoadOptions) -> Self {
        GraphScan {
            options,
            visited: HashSet::new(),
            modules: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn scan_file(&mut self, path: &Path, depth: usize) -> Result<(), LoadError> {
        if !self.visited.insert(path.to_path_buf()) {
            return Ok(());
        }

        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let module = match extension(path).as_str() {
            "json" => {
                let value = serde_json::from_str(&content).map_err(|source| LoadError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
                ScannedModule::from_json(path, value)
            }
            "ts" | "mts" | "cts" => self.scan_source(path, &content, depth, TypeScript),
            "tsx" => self.scan_source(path, &content, depth, Tsx),
            _ => self.scan_source(path, &content, depth, JavaScript),
        };

        debug!(
            "Scanned {:?}: {} classes, {} with argsConstraints, {} exports, {} imports",
            path,
            module.declared_classes.len(),
            module.class_constraints.len(),
            module.exports.len(),
            module.imports.len()
        );
        self.index.insert(path.to_path_buf(), self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    fn scan_source<L: Language>(
        &mut self,
        path: &Path,
        content: &str,
        depth: usize,
        lang: L,
    ) -> ScannedModule {
        let sg = AstGrep::new(content, lang);
        let root = sg.root();
        let table = collect_imports(&root);
        let targets = self.follow(path, &table.specifiers, depth);

        let mut bindings = collect_bindings(&root);
        for binding in &table.bindings {
            if let Some(value) = self.imported_value(&targets, &binding.specifier, &binding.imported)
            {
                bindings.insert_imported(binding.local.clone(), value);
            }
        }

        let mut module = ScannedModule {
            path: path.to_path_buf(),
            imports: table.specifiers.clone(),
            ..Default::default()
        };
        visit(&root, &bindings, &mut module);
        for reexport in &table.reexports {
            self.apply_reexport(&targets, reexport, &mut module);
        }
        module
    }

    /// Scan the relative imports of `path`, returning the file each specifier resolved to
    fn follow(
        &mut self,
        path: &Path,
        specifiers: &[String],
        depth: usize,
    ) -> HashMap<String, PathBuf> {
        let mut targets = HashMap::new();
        if !self.options.follow_imports || depth >= self.options.max_depth {
            return targets;
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        for specifier in specifiers {
            match resolve_from(dir, specifier) {
                Ok(target) if is_script(&target) || extension(&target) == "json" => {
                    if let Err(e) = self.scan_file(&target, depth + 1) {
                        debug!("Skipping unreadable import {:?}: {}", target, e);
                        continue;
                    }
                    targets.insert(specifier.clone(), target);
                }
                Ok(_) => {}
                Err(e) => debug!("Not following import '{}': {}", specifier, e),
            }
        }
        targets
    }

    /// Value of `imported` from the module `specifier` resolved to
    ///
    /// `None` when the specifier was not followed.
    fn imported_value(
        &self,
        targets: &HashMap<String, PathBuf>,
        specifier: &str,
        imported: &Imported,
    ) -> Option<Result<Value, String>> {
        let target = targets.get(specifier)?;
        let Some(source) = self.scanned(target) else {
            // still being scanned further up the stack
            return Some(Err(format!("'{}' is part of an import cycle", specifier)));
        };
        Some(
            source
                .export(imported)
                .unwrap_or_else(|| Err(format!("'{}' has no static export {}", specifier, imported))),
        )
    }

    fn apply_reexport(
        &self,
        targets: &HashMap<String, PathBuf>,
        reexport: &ReExport,
        module: &mut ScannedModule,
    ) {
        match &reexport.exported {
            Some(name) => {
                let value =
                    self.imported_value(targets, &reexport.specifier, &reexport.imported);
                if let Some(value) = value {
                    if name == DEFAULT_EXPORT {
                        module.default_export = Some(DEFAULT_EXPORT.to_string());
                    }
                    module.set_export(name.clone(), value);
                }
            }
            None => {
                let Some(source) = targets
                    .get(&reexport.specifier)
                    .and_then(|target| self.scanned(target))
                else {
                    return;
                };
                for (name, value) in &source.exports {
                    if name != DEFAULT_EXPORT && !module.has_export(name) {
                        module.set_export(name.clone(), value.clone());
                    }
                }
            }
        }
    }

    fn scanned(&self, path: &Path) -> Option<&ScannedModule> {
        self.index.get(path).and_then(|&i| self.modules.get(i))
    }
}

/// Collect the initializers of top-level variable declarations
pub(crate) fn collect_bindings<'r, D: Doc>(root: &Node<'r, D>) -> Bindings<'r, D> {
    let mut bindings = Bindings::default();

    for statement in root.children() {
        let declaration = if statement.kind() == "export_statement" {
            statement.field("declaration")
        } else {
            Some(statement)
        };
        let Some(declaration) = declaration else {
            continue;
        };
        if !is_variable_declaration(&declaration) {
            continue;
        }

        for declarator in declaration.children() {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (declarator.field("name"), declarator.field("value"))
            else {
                continue;
            };
            if name.kind() == "identifier" {
                bindings.insert_local(name.text().to_string(), value);
            }
        }
    }

    bindings
}

fn is_variable_declaration<D: Doc>(node: &Node<'_, D>) -> bool {
    matches!(
        node.kind().as_ref(),
        "lexical_declaration" | "variable_declaration"
    )
}

/// Every relative module the file loads, plus the top-level names it binds from them
fn collect_imports<D: Doc>(root: &Node<'_, D>) -> ImportTable {
    let mut table = ImportTable::default();
    collect_specifiers(root, &mut table.specifiers);

    for statement in root.children() {
        match statement.kind().as_ref() {
            "import_statement" => import_bindings(&statement, &mut table),
            "export_statement" => reexports(&statement, &mut table),
            _ if is_variable_declaration(&statement) => require_bindings(&statement, &mut table),
            _ => {}
        }
    }
    table
}

fn collect_specifiers<D: Doc>(node: &Node<'_, D>, specifiers: &mut Vec<String>) {
    match node.kind().as_ref() {
        "import_statement" | "export_statement" => {
            if let Some(source) = node.field("source") {
                record_specifier(&source.text(), specifiers);
            }
        }
        // `require('./x')` and `import('./x')`
        "call_expression" => {
            if let Some(specifier) = loaded_specifier(node) {
                record_specifier(&specifier, specifiers);
            }
        }
        _ => {}
    }

    for child in node.children() {
        collect_specifiers(&child, specifiers);
    }
}

/// The string literal passed to `require()` or `import()`
fn loaded_specifier<D: Doc>(call: &Node<'_, D>) -> Option<String> {
    if call.kind() != "call_expression" {
        return None;
    }
    let function = call.field("function")?;
    let is_loader = function.kind() == "import"
        || (function.kind() == "identifier" && function.text() == "require");
    if !is_loader {
        return None;
    }
    let argument = call
        .field("arguments")
        .and_then(|args| first_named_child(&args))?;
    (argument.kind() == "string").then(|| argument.text().to_string())
}

fn record_specifier(source_literal: &str, specifiers: &mut Vec<String>) {
    let Ok(specifier) = unquote(source_literal) else {
        return;
    };
    if (specifier.starts_with("./") || specifier.starts_with("../"))
        && !specifiers.contains(&specifier)
    {
        specifiers.push(specifier);
    }
}

/// Module export names may be identifiers or string literals
fn export_name<D: Doc>(node: &Node<'_, D>) -> String {
    if node.kind() == "string" {
        if let Ok(name) = unquote(&node.text()) {
            return name;
        }
    }
    node.text().to_string()
}

fn imported_as(name: String) -> Imported {
    if name == DEFAULT_EXPORT {
        Imported::Default
    } else {
        Imported::Named(name)
    }
}

/// `import FakeDriver, * as ns, { a, b as c } from './x'`
fn import_bindings<D: Doc>(statement: &Node<'_, D>, table: &mut ImportTable) {
    let Some(specifier) = statement
        .field("source")
        .and_then(|s| unquote(&s.text()).ok())
    else {
        return;
    };
    let mut bind = |local: String, imported: Imported| {
        table.bindings.push(ImportBinding {
            local,
            specifier: specifier.clone(),
            imported,
        });
    };

    for clause in statement.children().filter(|c| c.kind() == "import_clause") {
        for part in clause.children() {
            match part.kind().as_ref() {
                "identifier" => bind(part.text().to_string(), Imported::Default),
                "namespace_import" => {
                    if let Some(name) = first_named_child(&part) {
                        bind(name.text().to_string(), Imported::Namespace);
                    }
                }
                "named_imports" => {
                    for item in part.children().filter(|c| c.kind() == "import_specifier") {
                        let Some(name) = item.field("name") else {
                            continue;
                        };
                        let imported = export_name(&name);
                        let local = item
                            .field("alias")
                            .map_or_else(|| imported.clone(), |a| a.text().to_string());
                        bind(local, imported_as(imported));
                    }
                }
                _ => {}
            }
        }
    }
}

/// `export { a as b } from './x'`, `export * from './x'` and `export * as ns from './x'`
fn reexports<D: Doc>(statement: &Node<'_, D>, table: &mut ImportTable) {
    let Some(specifier) = statement
        .field("source")
        .and_then(|s| unquote(&s.text()).ok())
    else {
        return;
    };

    let mut named = false;
    for child in statement.children() {
        match child.kind().as_ref() {
            "export_clause" => {
                named = true;
                for item in child.children().filter(|c| c.kind() == "export_specifier") {
                    let Some(name) = item.field("name") else {
                        continue;
                    };
                    let imported = export_name(&name);
                    let exported = item
                        .field("alias")
                        .map_or_else(|| imported.clone(), |a| export_name(&a));
                    table.reexports.push(ReExport {
                        exported: Some(exported),
                        specifier: specifier.clone(),
                        imported: imported_as(imported),
                    });
                }
            }
            "namespace_export" => {
                named = true;
                if let Some(name) = first_named_child(&child) {
                    table.reexports.push(ReExport {
                        exported: Some(export_name(&name)),
                        specifier: specifier.clone(),
                        imported: Imported::Namespace,
                    });
                }
            }
            _ => {}
        }
    }

    if !named {
        table.reexports.push(ReExport {
            exported: None,
            specifier,
            imported: Imported::Namespace,
        });
    }
}

/// `const x = require('./x')`, `const { a, b: c } = require('./x')` and
/// `const a = require('./x').a`
fn require_bindings<D: Doc>(declaration: &Node<'_, D>, table: &mut ImportTable) {
    for declarator in declaration.children() {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let (Some(name), Some(value)) = (declarator.field("name"), declarator.field("value")) else {
            continue;
        };

        let (call, member) = if value.kind() == "member_expression" {
            (
                value.field("object"),
                value.field("property").map(|p| p.text().to_string()),
            )
        } else {
            (Some(value), None)
        };
        let Some(specifier) = call
            .as_ref()
            .and_then(loaded_specifier)
            .and_then(|literal| unquote(&literal).ok())
        else {
            continue;
        };

        let mut bind = |local: String, imported: Imported| {
            table.bindings.push(ImportBinding {
                local,
                specifier: specifier.clone(),
                imported,
            });
        };
        match (name.kind().as_ref(), member) {
            ("identifier", Some(property)) => {
                bind(name.text().to_string(), Imported::Named(property));
            }
            ("identifier", None) => bind(name.text().to_string(), Imported::Namespace),
            ("object_pattern", None) => {
                for part in name.children() {
                    match part.kind().as_ref() {
                        "shorthand_property_identifier_pattern" => {
                            let local = part.text().to_string();
                            bind(local.clone(), Imported::Named(local));
                        }
                        "pair_pattern" => {
                            let (Some(key), Some(target)) = (part.field("key"), part.field("value"))
                            else {
                                continue;
                            };
                            if target.kind() == "identifier" {
                                bind(target.text().to_string(), Imported::Named(export_name(&key)));
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn visit<'r, D: Doc>(node: &Node<'r, D>, bindings: &Bindings<'r, D>, module: &mut ScannedModule) {
    match node.kind().as_ref() {
        "class_declaration" | "abstract_class_declaration" | "class" => {
            if let Some(name) = node.field("name") {
                scan_class(node, &name.text(), bindings, module);
            }
        }
        "assignment_expression" => scan_assignment(node, bindings, module),
        "export_statement" => scan_export(node, bindings, module),
        _ => {}
    }

    for child in node.children() {
        visit(&child, bindings, module);
    }
}

fn scan_class<'r, D: Doc>(
    class: &Node<'r, D>,
    class_name: &str,
    bindings: &Bindings<'r, D>,
    module: &mut ScannedModule,
) {
    module.declared_classes.push(class_name.to_string());

    let Some(body) = class.field("body") else {
        return;
    };

    for member in body.children() {
        // `static get` on one line is a single token in the JavaScript grammar
        let is_static = member
            .children()
            .any(|c| matches!(c.kind().as_ref(), "static" | "static get"));
        let value = match member.kind().as_ref() {
            // JavaScript uses `property`, TypeScript uses `name`
            "field_definition" | "public_field_definition" => {
                let name = member.field("property").or_else(|| member.field("name"));
                if !is_static || !name.is_some_and(|n| is_args_constraints_key(&n)) {
                    continue;
                }
                member.field("value")
            }
            "method_definition" => {
                let is_getter = member
                    .children()
                    .any(|c| matches!(c.kind().as_ref(), "get" | "static get"));
                let name = member.field("name");
                if !is_static || !is_getter || !name.is_some_and(|n| is_args_constraints_key(&n)) {
                    continue;
                }
                member.field("body").and_then(|b| returned_expression(&b))
            }
            _ => continue,
        };

        let constraints = match value {
            Some(value) => evaluate(&value, bindings).map_err(|e| format!("{:#}", e)),
            None => Err("declaration has no value".to_string()),
        };
        module.class_constraints.push(ClassConstraints {
            class_name: class_name.to_string(),
            constraints,
        });
    }
}

/// `return <expr>;` directly inside a getter body
fn returned_expression<'r, D: Doc>(body: &Node<'r, D>) -> Option<Node<'r, D>> {
    body.children()
        .find(|statement| statement.kind() == "return_statement")
        .and_then(|statement| first_named_child(&statement))
}

fn scan_assignment<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    module: &mut ScannedModule,
) {
    let (Some(left), Some(right)) = (node.field("left"), node.field("right")) else {
        return;
    };
    if left.kind() != "member_expression" {
        return;
    }
    let (Some(object), Some(property)) = (left.field("object"), left.field("property")) else {
        return;
    };
    let object_text = object.text();
    let property_text = property.text();

    // module.exports = FakeDriver
    if object_text == "module" && property_text == "exports" {
        match right.kind().as_ref() {
            "identifier" => module.default_export = Some(right.text().to_string()),
            "class" => {
                if let Some(name) = right.field("name") {
                    module.default_export = Some(name.text().to_string());
                } else {
                    scan_class(&right, DEFAULT_EXPORT, bindings, module);
                    module.default_export = Some(DEFAULT_EXPORT.to_string());
                }
                return;
            }
            _ => {}
        }
        let value = evaluate(&right, bindings).map_err(|e| format!("{:#}", e));
        if let Ok(Value::Object(map)) = &value {
            for (name, field) in map {
                module.set_export(name.clone(), Ok(field.clone()));
            }
        }
        module.commonjs_exports = Some(value);
        return;
    }

    // exports.argsConstraints = {...}
    if object_text == "exports" || object_text == "module.exports" {
        module.set_export(
            property_text.to_string(),
            evaluate(&right, bindings).map_err(|e| format!("{:#}", e)),
        );
        return;
    }

    if property_text == ARGS_CONSTRAINTS && object.kind() == "identifier" {
        module.class_constraints.push(ClassConstraints {
            class_name: object_text.to_string(),
            constraints: evaluate(&right, bindings).map_err(|e| format!("{:#}", e)),
        });
    }
}

fn scan_export<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    module: &mut ScannedModule,
) {
    // resolved against the source module once it is scanned
    if node.field("source").is_some() {
        return;
    }

    let is_default = node.children().any(|c| c.kind() == "default");
    let exported = node.field("declaration").or_else(|| node.field("value"));

    if is_default {
        if let Some(exported) = exported {
            match exported.kind().as_ref() {
                "identifier" => {
                    let name = exported.text().to_string();
                    module.set_export(
                        DEFAULT_EXPORT.to_string(),
                        evaluate_name(&name, bindings).map_err(|e| format!("{:#}", e)),
                    );
                    module.default_export = Some(name);
                }
                "class_declaration" | "abstract_class_declaration" | "class" => {
                    match exported.field("name") {
                        Some(name) => module.default_export = Some(name.text().to_string()),
                        None => {
                            scan_class(&exported, DEFAULT_EXPORT, bindings, module);
                            module.default_export = Some(DEFAULT_EXPORT.to_string());
                        }
                    }
                }
                "function_declaration" | "generator_function_declaration" => {}
                _ => module.set_export(
                    DEFAULT_EXPORT.to_string(),
                    evaluate(&exported, bindings).map_err(|e| format!("{:#}", e)),
                ),
            }
        }
        return;
    }

    // export const argsConstraints = {...}
    if let Some(declaration) = exported {
        for declarator in declaration.children() {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (declarator.field("name"), declarator.field("value"))
            else {
                continue;
            };
            if name.kind() == "identifier" {
                module.set_export(
                    name.text().to_string(),
                    evaluate(&value, bindings).map_err(|e| format!("{:#}", e)),
                );
            }
        }
    }

    // export { argsConstraints, FakeDriver as default }
    for clause in node.children().filter(|c| c.kind() == "export_clause") {
        for specifier in clause.children().filter(|c| c.kind() == "export_specifier") {
            let Some(local) = specifier.field("name") else {
                continue;
            };
            let local_name = local.text().to_string();
            let exported_name = specifier
                .field("alias")
                .map_or_else(|| local_name.clone(), |a| export_name(&a));

            let value = evaluate_name(&local_name, bindings).map_err(|e| format!("{:#}", e));
            if exported_name == DEFAULT_EXPORT {
                module.default_export = Some(local_name);
            }
            module.set_export(exported_name, value);
        }
    }
}

fn is_args_constraints_key<D: Doc>(node: &Node<'_, D>) -> bool {
    match node.kind().as_ref() {
        "property_identifier" | "identifier" => node.text() == ARGS_CONSTRAINTS,
        "string" => unquote(&node.text()).is_ok_and(|s| s == ARGS_CONSTRAINTS),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::javascript::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn scan_source<L: Language>(path: &str, source: &str, lang: L) -> ScannedModule {
        let options = LoadOptions {
            follow_imports: false,
            ..Default::default()
        };
        GraphScan::new(&options).scan_source(Path::new(path), source, 0, lang)
    }

    fn scan_js(source: &str) -> ScannedModule {
        scan_source("driver.js", source, JavaScript)
    }

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            assert!(fs::write(dir.join(name), content).is_ok());
        }
    }

    fn constraints_of(module: &ScannedModule, class_name: &str) -> Option<Value> {
        module
            .constraints_of(class_name)
            .and_then(|c| c.constraints.clone().ok())
    }

    #[test]
    fn test_static_class_field() {
        let module = scan_js(
            r#"
            import { BaseDriver } from 'appium/driver';
            export class FakeDriver extends BaseDriver {
              static argsConstraints = {
                port: { isNumber: true },
                app: { presence: true, isString: true },
              };
            }
            "#,
        );
        assert_eq!(module.declared_classes, vec!["FakeDriver"]);
        assert_eq!(
            constraints_of(&module, "FakeDriver"),
            Some(json!({
                "port": {"isNumber": true},
                "app": {"presence": true, "isString": true}
            }))
        );
        assert!(module.imports.is_empty());
    }

    #[test]
    fn test_static_getter() {
        let module = scan_js(
            r#"
            class FakeDriver {
              static get argsConstraints () {
                return { sillyWebServerPort: { isNumber: true } };
              }
            }
            export default FakeDriver;
            "#,
        );
        assert_eq!(module.default_export.as_deref(), Some("FakeDriver"));
        assert_eq!(
            constraints_of(&module, "FakeDriver"),
            Some(json!({"sillyWebServerPort": {"isNumber": true}}))
        );
    }

    #[test]
    fn test_instance_members_are_ignored() {
        let module = scan_js(
            r#"
            class D {
              argsConstraints = { a: { isString: true } };
            }
            class E {
              get argsConstraints () { return { b: { isNumber: true } }; }
            }
            class F {
              argsConstraints = { c: { isString: true } };
              static argsConstraints = { d: { isBoolean: true } };
            }
            "#,
        );
        assert_eq!(module.declared_classes, vec!["D", "E", "F"]);
        assert!(module.constraints_of("D").is_none());
        assert!(module.constraints_of("E").is_none());
        assert_eq!(
            constraints_of(&module, "F"),
            Some(json!({"d": {"isBoolean": true}}))
        );
    }

    #[test]
    fn test_falsy_constraints_count_as_missing() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let entry = temp_dir.path().join("index.js");
        for value in ["null", "false", "0", "''", "undefined"] {
            let source = format!("export class D {{ static argsConstraints = {}; }}\n", value);
            assert!(fs::write(&entry, source).is_ok());
            assert!(
                matches!(find_constraints(&entry, "D", &LoadOptions::default()), Ok(None)),
                "{} should count as no constraints",
                value
            );
        }

        assert!(fs::write(&entry, "export const argsConstraints = null;\n").is_ok());
        assert!(matches!(
            find_constraints(&entry, "D", &LoadOptions::default()),
            Ok(None)
        ));
    }

    #[test]
    fn test_assignment_and_commonjs_export() {
        let module = scan_js(
            r#"
            const desiredArgs = { flag: { isBoolean: true } };
            class FakeDriver {}
            FakeDriver.argsConstraints = desiredArgs;
            module.exports = FakeDriver;
            "#,
        );
        assert_eq!(module.default_export.as_deref(), Some("FakeDriver"));
        assert_eq!(
            constraints_of(&module, "FakeDriver"),
            Some(json!({"flag": {"isBoolean": true}}))
        );
    }

    #[test]
    fn test_anonymous_default_class() {
        let module = scan_js(
            "export default class { static argsConstraints = { a: { isString: true } }; }",
        );
        assert_eq!(module.default_export.as_deref(), Some(DEFAULT_EXPORT));
        assert_eq!(
            constraints_of(&module, DEFAULT_EXPORT),
            Some(json!({"a": {"isString": true}}))
        );
    }

    #[test]
    fn test_module_level_export() {
        let module = scan_js("export const argsConstraints = { b: { isArray: true } };");
        assert_eq!(
            module.module_constraints().and_then(Result::ok),
            Some(json!({"b": {"isArray": true}}))
        );
    }

    #[test]
    fn test_unevaluable_constraints_are_reported() {
        let module = scan_js("class D { static argsConstraints = buildArgs(); }");
        assert!(module
            .constraints_of("D")
            .is_some_and(|c| c.constraints.is_err()));
    }

    #[test]
    fn test_typescript_field() {
        let module = scan_source(
            "driver.ts",
            r#"
            export class TsDriver {
              static readonly argsConstraints = { x: { isObject: true } } as const;
              private port: number = 1;
            }
            "#,
            TypeScript,
        );
        assert_eq!(
            constraints_of(&module, "TsDriver"),
            Some(json!({"x": {"isObject": true}}))
        );
    }

    #[test]
    fn test_records_relative_imports_only() {
        let module = scan_js(
            r#"
            import _ from 'lodash';
            import { FakeDriver } from './lib/driver';
            export { helper } from '../helpers.js';
            const other = require('./other');
            "#,
        );
        assert_eq!(
            module.imports,
            vec!["./lib/driver", "../helpers.js", "./other"]
        );
    }

    #[test]
    fn test_find_constraints_follows_reexports() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let lib = temp_dir.path().join("lib");
        assert!(fs::create_dir_all(&lib).is_ok());
        let entry = temp_dir.path().join("index.js");
        assert!(fs::write(&entry, "export { FakeDriver } from './lib/driver';\n").is_ok());
        assert!(fs::write(
            lib.join("driver.js"),
            "export class FakeDriver { static argsConstraints = { p: { isNumber: true } }; }\n",
        )
        .is_ok());

        let found = find_constraints(&entry, "FakeDriver", &LoadOptions::default());
        let Ok(Some(found)) = found else {
            panic!("expected constraints to be found");
        };
        assert_eq!(found.value, json!({"p": {"isNumber": true}}));
        assert!(found.source.ends_with("driver.js"));

        let no_follow = LoadOptions {
            follow_imports: false,
            ..Default::default()
        };
        assert!(matches!(
            find_constraints(&entry, "FakeDriver", &no_follow),
            Ok(None)
        ));
    }

    #[test]
    fn test_main_class_without_constraints_does_not_fall_back() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let entry = temp_dir.path().join("index.js");
        assert!(fs::write(
            &entry,
            "export class Main {}\nexport default class Other { static argsConstraints = {}; }\n",
        )
        .is_ok());
        assert!(matches!(
            find_constraints(&entry, "Main", &LoadOptions::default()),
            Ok(None)
        ));
        assert!(matches!(
            find_constraints(&entry, "Missing", &LoadOptions::default()),
            Ok(Some(_))
        ));
    }

    #[test]
    fn test_constraints_imported_from_sibling_module() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_files(
            temp_dir.path(),
            &[
                (
                    "args.js",
                    "const port = { isNumber: true };\nexport const cliArgs = { port, app: { isString: true } };\n",
                ),
                (
                    "index.js",
                    "import { cliArgs } from './args';\nexport class D { static argsConstraints = cliArgs; }\n",
                ),
            ],
        );
        let entry = temp_dir.path().join("index.js");

        let Ok(Some(found)) = find_constraints(&entry, "D", &LoadOptions::default()) else {
            panic!("expected imported constraints to resolve");
        };
        assert_eq!(
            found.value,
            json!({"port": {"isNumber": true}, "app": {"isString": true}})
        );
        assert!(found.source.ends_with("index.js"));

        let no_follow = LoadOptions {
            follow_imports: false,
            ..Default::default()
        };
        assert!(matches!(
            find_constraints(&entry, "D", &no_follow),
            Err(LoadError::Evaluate { .. })
        ));
    }

    #[test]
    fn test_import_forms_resolve() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_files(
            temp_dir.path(),
            &[
                ("base.js", "export const shared = { udid: { isString: true } };\n"),
                (
                    "args.js",
                    "export * from './base';\nconst extra = { flag: { isBoolean: true } };\nexport { extra as more };\nexport default { port: { isNumber: true } };\n",
                ),
                (
                    "common.js",
                    "module.exports = { cjsArgs: { host: { isString: true } } };\n",
                ),
                ("defaults.json", "{\"timeout\": {\"isNumber\": true}}\n"),
                (
                    "index.js",
                    r#"
                    import defaults, { shared, more as renamed } from './args';
                    import * as ns from './args.js';
                    import json from './defaults.json';
                    const { cjsArgs } = require('./common');
                    export class D {
                      static argsConstraints = {
                        ...defaults, ...shared, ...renamed, ...ns.more, ...cjsArgs, ...json,
                      };
                    }
                    "#,
                ),
            ],
        );
        let entry = temp_dir.path().join("index.js");

        let Ok(Some(found)) = find_constraints(&entry, "D", &LoadOptions::default()) else {
            panic!("expected imported constraints to resolve");
        };
        assert_eq!(
            found.value,
            json!({
                "port": {"isNumber": true},
                "udid": {"isString": true},
                "flag": {"isBoolean": true},
                "host": {"isString": true},
                "timeout": {"isNumber": true}
            })
        );
    }

    #[test]
    fn test_dynamic_import_is_reported() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write_files(
            temp_dir.path(),
            &[
                ("args.js", "export const cliArgs = buildArgs();\n"),
                (
                    "index.js",
                    "import { cliArgs, missing } from './args';\nexport class D { static argsConstraints = cliArgs; }\nexport class E { static argsConstraints = missing; }\n",
                ),
            ],
        );
        let entry = temp_dir.path().join("index.js");

        let message = |class_name: &str| match find_constraints(&entry, class_name, &LoadOptions::default()) {
            Err(LoadError::Evaluate { message, .. }) => message,
            other => panic!("expected an evaluation error, got {:?}", other.map(|f| f.map(|f| f.value))),
        };
        assert!(message("D").contains("imported 'cliArgs' is not static"));
        assert!(message("E").contains("has no static export 'missing'"));
    }

    #[test]
    fn test_import_cycles_terminate() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let a = temp_dir.path().join("a.js");
        let b = temp_dir.path().join("b.js");
        assert!(fs::write(&a, "import './b';\n").is_ok());
        assert!(fs::write(&b, "import './a';\n").is_ok());
        assert!(matches!(
            find_constraints(&a, "Nope", &LoadOptions::default()),
            Ok(None)
        ));
    }
}
