//! Schema type registry.
//!
//! Declarations are registered in document order by a
//! [`TypeRegistryBuilder`]. Registration only records names (pass 1), so a
//! field may refer to a struct declared further down the document. Freezing
//! runs pass 2: every type reference is resolved, map key types are checked,
//! the dependency graph is searched for cycles, and `@default` and constant
//! values are bound against their declared types. The result is an immutable
//! [`TypeRegistry`].

use indexmap::IndexMap;
use log::{debug, trace};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{DfsEvent, depth_first_search},
};
use serde::Serialize;

use folio_core::{
    identifier::Id,
    schema::{
        AliasDef, Attribute, ConstDef, Constraint, Definition, EnumDef, EnumMember, FieldDef,
        Pattern, PrimitiveKind, StructDef, TypeRef,
    },
    span::Spanned,
    value::Value,
};

use crate::{
    binder::{Binder, literal_value},
    config::ParseConfig,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    parser_types::{
        AliasDecl, ConstDecl, Declaration, EnumDecl, Literal, MetaAttr, StructDecl, TypeExpr,
    },
};

/// Frozen, read-only view of every schema declaration in a document.
///
/// Definitions keep declaration order. Aliases that were part of a cycle
/// and constants whose value failed to bind are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    definitions: IndexMap<Id, Definition>,
}

impl TypeRegistry {
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        match self.get(name) {
            Some(Definition::Struct(def)) => Some(def),
            _ => None,
        }
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDef> {
        match self.get(name) {
            Some(Definition::Enum(def)) => Some(def),
            _ => None,
        }
    }

    pub fn get_alias(&self, name: &str) -> Option<&AliasDef> {
        match self.get(name) {
            Some(Definition::Alias(def)) => Some(def),
            _ => None,
        }
    }

    pub fn get_const(&self, name: &str) -> Option<&ConstDef> {
        match self.get(name) {
            Some(Definition::Const(def)) => Some(def),
            _ => None,
        }
    }

    /// All definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.definitions().filter_map(|def| match def {
            Definition::Struct(def) => Some(def),
            _ => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.definitions().filter_map(|def| match def {
            Definition::Enum(def) => Some(def),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Follow alias chains until reaching a type that is not an alias.
    ///
    /// Unknown names are returned unchanged.
    pub fn resolve<'a>(&'a self, ty: &'a TypeRef) -> &'a TypeRef {
        let mut current = ty;
        // Frozen aliases are acyclic, so no chain is longer than the registry.
        for _ in 0..=self.definitions.len() {
            match current {
                TypeRef::Named(name) => match self.get_alias(name.as_str()) {
                    Some(alias) => current = &alias.target,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Follow aliases from `name` to the declaration it finally names.
    ///
    /// Stops at an alias whose target is not a plain name.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        let mut current = name;
        for _ in 0..=self.definitions.len() {
            match self.get(current)? {
                Definition::Alias(AliasDef {
                    target: TypeRef::Named(next),
                    ..
                }) => current = next.as_str(),
                _ => return Some(current),
            }
        }
        Some(current)
    }

    /// True if `name` declares a type rather than a constant.
    pub fn is_type(&self, name: &str) -> bool {
        matches!(
            self.get(name),
            Some(Definition::Alias(_) | Definition::Struct(_) | Definition::Enum(_))
        )
    }
}

struct PendingDefault<'src> {
    owner: Id,
    field: usize,
    value: Spanned<Literal<'src>>,
}

struct PendingConst<'src> {
    name: Id,
    value: Spanned<Literal<'src>>,
}

/// Collects declarations before resolution.
#[derive(Default)]
pub struct TypeRegistryBuilder<'src> {
    definitions: IndexMap<Id, Definition>,
    type_uses: Vec<Spanned<&'src str>>,
    map_keys: Vec<Spanned<TypeRef>>,
    defaults: Vec<PendingDefault<'src>>,
    consts: Vec<PendingConst<'src>>,
    diagnostics: DiagnosticCollector,
}

impl<'src> TypeRegistryBuilder<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any declaration. Returns false if it was rejected.
    pub fn register(&mut self, decl: &Declaration<'src>) -> bool {
        match decl {
            Declaration::Alias(decl) => self.register_alias(decl),
            Declaration::Struct(decl) => self.register_struct(decl),
            Declaration::Enum(decl) => self.register_enum(decl),
            Declaration::Const(decl) => self.register_const(decl),
        }
    }

    pub fn register_alias(&mut self, decl: &AliasDecl<'src>) -> bool {
        let Some(name) = self.claim_name(&decl.name) else {
            return false;
        };
        self.check_type_name(&decl.name);
        self.record_type(&decl.target);

        trace!(name = name.as_str(); "Registered alias");
        self.definitions.insert(
            name.clone(),
            Definition::Alias(AliasDef {
                name,
                target: decl.target.to_type_ref(),
                span: decl.span,
            }),
        );
        true
    }

    pub fn register_struct(&mut self, decl: &StructDecl<'src>) -> bool {
        let Some(name) = self.claim_name(&decl.name) else {
            return false;
        };
        self.check_type_name(&decl.name);

        let mut fields: Vec<FieldDef> = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            if let Some(first) = fields.iter().find(|f| f.name == *field.name.inner()) {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "field `{}` is declared more than once in struct `{name}`",
                        field.name.inner()
                    ))
                    .with_code(ErrorCode::E204)
                    .with_label(field.name.span(), "duplicate field")
                    .with_secondary_label(first.span, "first declared here"),
                );
                continue;
            }

            self.record_type(&field.ty);
            let (attributes, constraints, default) = self.field_attributes(&field.attrs);
            if let Some(value) = default {
                self.defaults.push(PendingDefault {
                    owner: name.clone(),
                    field: fields.len(),
                    value,
                });
            }

            fields.push(FieldDef {
                name: Id::new(field.name.inner()),
                ty: field.ty.to_type_ref(),
                optional: field.optional,
                // Filled in once the default is bound at freeze time.
                default: None,
                constraints,
                attributes,
                span: field.span,
            });
        }

        trace!(name = name.as_str(), fields = fields.len(); "Registered struct");
        self.definitions.insert(
            name.clone(),
            Definition::Struct(StructDef {
                name,
                fields,
                span: decl.span,
            }),
        );
        true
    }

    pub fn register_enum(&mut self, decl: &EnumDecl<'src>) -> bool {
        let Some(name) = self.claim_name(&decl.name) else {
            return false;
        };
        self.check_type_name(&decl.name);

        if decl.members.is_empty() {
            self.diagnostics.emit(
                Diagnostic::error(format!("enum `{name}` has no members"))
                    .with_code(ErrorCode::E205)
                    .with_label(decl.name.span(), "declared without members")
                    .with_help("add at least one member"),
            );
        }

        let mut members: Vec<EnumMember> = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            if let Some(first) = members.iter().find(|m| m.name == *member.name.inner()) {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "member `{}` is declared more than once in enum `{name}`",
                        member.name.inner()
                    ))
                    .with_code(ErrorCode::E204)
                    .with_label(member.name.span(), "duplicate member")
                    .with_secondary_label(first.span, "first declared here"),
                );
                continue;
            }
            self.check_constant_name(&member.name, "enum member");

            members.push(EnumMember {
                name: Id::new(member.name.inner()),
                attributes: member.attrs.iter().map(convert_attribute).collect(),
                span: member.span,
            });
        }

        trace!(name = name.as_str(), members = members.len(); "Registered enum");
        self.definitions.insert(
            name.clone(),
            Definition::Enum(EnumDef {
                name,
                members,
                span: decl.span,
            }),
        );
        true
    }

    pub fn register_const(&mut self, decl: &ConstDecl<'src>) -> bool {
        let Some(name) = self.claim_name(&decl.name) else {
            return false;
        };
        self.check_constant_name(&decl.name, "constant");
        self.record_type(&decl.ty);

        self.consts.push(PendingConst {
            name: name.clone(),
            value: decl.value.clone(),
        });
        self.definitions.insert(
            name.clone(),
            Definition::Const(ConstDef {
                name,
                ty: decl.ty.to_type_ref(),
                value: literal_value(decl.value.inner()),
                span: decl.span,
            }),
        );
        true
    }

    /// Resolve references, reject cycles and bind deferred values.
    pub fn freeze(self, config: &ParseConfig) -> (TypeRegistry, Vec<Diagnostic>) {
        let Self {
            definitions,
            type_uses,
            map_keys,
            defaults,
            consts,
            mut diagnostics,
        } = self;

        for name in &type_uses {
            match definitions.get(*name.inner()) {
                None => diagnostics.emit(
                    Diagnostic::error(format!("unknown type `{}`", name.inner()))
                        .with_code(ErrorCode::E201)
                        .with_label(name.span(), "not declared in this document")
                        .with_help("declare it with `struct`, `enum` or `type`"),
                ),
                Some(Definition::Const(def)) => diagnostics.emit(
                    Diagnostic::error(format!("`{}` is a constant, not a type", name.inner()))
                        .with_code(ErrorCode::E201)
                        .with_label(name.span(), "used as a type here")
                        .with_secondary_label(def.span, "declared as a constant here"),
                ),
                Some(_) => {}
            }
        }

        let cyclic = find_cycles(&definitions, &mut diagnostics);
        let mut registry = TypeRegistry { definitions };
        for name in cyclic {
            if registry.get_alias(name.as_str()).is_some() {
                registry.definitions.shift_remove(name.as_str());
            }
        }

        for key in &map_keys {
            check_map_key(&registry, key, &mut diagnostics);
        }

        let mut binder = Binder::new(&registry, *config);
        let bound_defaults: Vec<Option<Value>> = defaults
            .iter()
            .map(|pending| {
                let field = registry
                    .get_struct(pending.owner.as_str())
                    .and_then(|def| def.fields.get(pending.field))?;
                binder.bind_field(field, &pending.value, field.name.as_str(), 1)
            })
            .collect();
        let bound_consts: Vec<Option<Value>> = consts
            .iter()
            .map(|pending| {
                let def = registry.get_const(pending.name.as_str())?;
                binder.bind_value(&pending.value, &def.ty, def.name.as_str())
            })
            .collect();
        diagnostics.extend(binder.into_diagnostics());

        for (pending, value) in defaults.iter().zip(bound_defaults) {
            if let Some(Definition::Struct(def)) = registry.definitions.get_mut(&pending.owner) {
                if let Some(field) = def.fields.get_mut(pending.field) {
                    field.default = value;
                }
            }
        }
        for (pending, value) in consts.iter().zip(bound_consts) {
            match value {
                Some(value) => {
                    if let Some(Definition::Const(def)) =
                        registry.definitions.get_mut(&pending.name)
                    {
                        def.value = value;
                    }
                }
                None => {
                    registry.definitions.shift_remove(&pending.name);
                }
            }
        }

        let diagnostics = diagnostics.into_diagnostics();
        debug!(
            definitions = registry.len(),
            diagnostics = diagnostics.len();
            "Froze type registry"
        );
        (registry, diagnostics)
    }

    /// Record a new name, or report it as a duplicate.
    fn claim_name(&mut self, name: &Spanned<&'src str>) -> Option<Id> {
        if let Some(existing) = self.definitions.get(*name.inner()) {
            self.diagnostics.emit(
                Diagnostic::error(format!(
                    "`{}` is defined more than once",
                    name.inner()
                ))
                .with_code(ErrorCode::E200)
                .with_label(name.span(), "duplicate definition")
                .with_secondary_label(
                    existing.span(),
                    format!("first defined here as a {}", existing.kind_name()),
                )
                .with_help("remove the duplicate or use a different name"),
            );
            return None;
        }
        Some(Id::new(name.inner()))
    }

    fn check_type_name(&mut self, name: &Spanned<&str>) {
        if !is_pascal_case(name.inner()) {
            self.diagnostics.emit(
                Diagnostic::warning(format!("type `{}` should be PascalCase", name.inner()))
                    .with_code(ErrorCode::E207)
                    .with_label(name.span(), "not PascalCase"),
            );
        }
    }

    fn check_constant_name(&mut self, name: &Spanned<&str>, what: &str) {
        if !is_upper_snake_case(name.inner()) {
            self.diagnostics.emit(
                Diagnostic::warning(format!("{what} `{}` should be UPPER_SNAKE_CASE", name.inner()))
                    .with_code(ErrorCode::E207)
                    .with_label(name.span(), "not UPPER_SNAKE_CASE"),
            );
        }
    }

    /// Queue every name and map key in `ty` for resolution.
    fn record_type(&mut self, ty: &Spanned<TypeExpr<'src>>) {
        self.type_uses.extend(ty.named_refs());
        collect_map_keys(ty, &mut self.map_keys);
    }

    /// Split field attributes into metadata, constraints and the default.
    fn field_attributes(
        &mut self,
        attrs: &[MetaAttr<'src>],
    ) -> (Vec<Attribute>, Vec<Constraint>, Option<Spanned<Literal<'src>>>) {
        let mut constraints = Vec::new();
        let mut default = None;

        for attr in attrs {
            match *attr.name.inner() {
                "default" => match attr.args.as_slice() {
                    [value] => default = Some(value.clone()),
                    _ => self.bad_attribute(attr, "`@default` takes exactly one value"),
                },
                "range" => {
                    let (bounds, exclusive) = match attr.args.as_slice() {
                        [min, max] => ((min, max), Some((false, false))),
                        [min, max, low, high] => match (low.inner(), high.inner()) {
                            (Literal::Bool(low), Literal::Bool(high)) => ((min, max), Some((*low, *high))),
                            _ => ((min, max), None),
                        },
                        _ => {
                            self.bad_attribute(
                                attr,
                                "`@range` takes a minimum, a maximum and optional exclusivity flags",
                            );
                            continue;
                        }
                    };
                    match (numeric_bound(bounds.0), numeric_bound(bounds.1), exclusive) {
                        (Some(min), Some(max), Some((exclusive_min, exclusive_max))) => {
                            constraints.push(Constraint::Range {
                                min,
                                max,
                                exclusive_min,
                                exclusive_max,
                            })
                        }
                        (_, _, None) => {
                            self.bad_attribute(attr, "`@range` exclusivity flags must be `true` or `false`")
                        }
                        _ => self.bad_attribute(attr, "`@range` bounds must be numbers or `null`"),
                    }
                }
                "pattern" => match attr.args.as_slice() {
                    [pattern] => match pattern.inner() {
                        Literal::String(source) => match Pattern::new(source) {
                            Ok(pattern) => constraints.push(Constraint::Pattern { pattern }),
                            Err(err) => self.bad_attribute(attr, &format!("invalid `@pattern`: {err}")),
                        },
                        _ => self.bad_attribute(attr, "`@pattern` takes a string"),
                    },
                    _ => self.bad_attribute(attr, "`@pattern` takes exactly one string"),
                },
                "length" => match attr.args.as_slice() {
                    [min, max] => match (length_bound(min), length_bound(max)) {
                        (Some(min), Some(max)) => {
                            constraints.push(Constraint::Length { min, max })
                        }
                        _ => self.bad_attribute(
                            attr,
                            "`@length` bounds must be non-negative integers or `null`",
                        ),
                    },
                    _ => self.bad_attribute(attr, "`@length` takes a minimum and a maximum"),
                },
                _ => {}
            }
        }

        let attributes = attrs.iter().map(convert_attribute).collect();
        (attributes, constraints, default)
    }

    fn bad_attribute(&mut self, attr: &MetaAttr<'_>, message: &str) {
        self.diagnostics.emit(
            Diagnostic::error(message)
                .with_code(ErrorCode::E203)
                .with_label(attr.span, "invalid attribute arguments"),
        );
    }
}

fn convert_attribute(attr: &MetaAttr<'_>) -> Attribute {
    Attribute {
        name: Id::new(attr.name.inner()),
        args: attr.args.iter().map(|arg| literal_value(arg.inner())).collect(),
        span: attr.span,
    }
}

/// `null` and `_` leave the bound open.
fn is_open_bound(literal: &Literal<'_>) -> bool {
    match literal {
        Literal::Null => true,
        Literal::Member {
            enum_name: None,
            member,
        } => *member.inner() == "_",
        _ => false,
    }
}

fn numeric_bound(literal: &Spanned<Literal<'_>>) -> Option<Option<f64>> {
    match literal.inner() {
        Literal::Int(n) => Some(Some(*n as f64)),
        Literal::Float(x) => Some(Some(*x)),
        other if is_open_bound(other) => Some(None),
        _ => None,
    }
}

fn length_bound(literal: &Spanned<Literal<'_>>) -> Option<Option<usize>> {
    match literal.inner() {
        Literal::Int(n) => usize::try_from(*n).ok().map(Some),
        other if is_open_bound(other) => Some(None),
        _ => None,
    }
}

fn collect_map_keys(ty: &Spanned<TypeExpr<'_>>, keys: &mut Vec<Spanned<TypeRef>>) {
    match ty.inner() {
        TypeExpr::Named(_) => {}
        TypeExpr::Array(inner) | TypeExpr::Optional(inner) => collect_map_keys(inner, keys),
        TypeExpr::Map(key, value) => {
            keys.push(Spanned::new(key.to_type_ref(), key.span()));
            collect_map_keys(key, keys);
            collect_map_keys(value, keys);
        }
    }
}

fn check_map_key(registry: &TypeRegistry, key: &Spanned<TypeRef>, diagnostics: &mut DiagnosticCollector) {
    let resolved = registry.resolve(key.inner());
    let valid = match resolved {
        TypeRef::Primitive(PrimitiveKind::String) => true,
        // Unknown names were already reported.
        TypeRef::Named(name) => {
            registry.get_enum(name.as_str()).is_some() || registry.get(name.as_str()).is_none()
        }
        _ => false,
    };
    if !valid {
        diagnostics.emit(
            Diagnostic::error(format!(
                "map keys must be `string` or an enum, found `{resolved}`"
            ))
            .with_code(ErrorCode::E206)
            .with_label(key.span(), "invalid key type"),
        );
    }
}

fn direct_reference(ty: &TypeRef) -> Option<&Id> {
    match ty {
        TypeRef::Named(name) => Some(name),
        _ => None,
    }
}

/// Report every cycle among aliases and structs and return the names on them.
///
/// Edges run from an alias to its target and from a struct to the types of
/// its non-optional fields. Array, map and optional types admit finite
/// values, so they never form an edge.
fn find_cycles(
    definitions: &IndexMap<Id, Definition>,
    diagnostics: &mut DiagnosticCollector,
) -> Vec<Id> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..definitions.len()).map(|i| graph.add_node(i)).collect();

    for (index, definition) in definitions.values().enumerate() {
        let targets: Vec<&Id> = match definition {
            Definition::Alias(def) => direct_reference(&def.target).into_iter().collect(),
            Definition::Struct(def) => def
                .fields
                .iter()
                .filter(|field| !field.optional)
                .filter_map(|field| direct_reference(&field.ty))
                .collect(),
            Definition::Enum(_) | Definition::Const(_) => Vec::new(),
        };
        for target in targets {
            match definitions.get_full(target.as_str()) {
                Some((target_index, _, Definition::Alias(_) | Definition::Struct(_))) => {
                    graph.add_edge(nodes[index], nodes[target_index], ());
                }
                _ => {}
            }
        }
    }

    let mut parent: Vec<Option<NodeIndex>> = vec![None; nodes.len()];
    let mut cycles: Vec<Vec<usize>> = Vec::new();
    depth_first_search(&graph, nodes.iter().copied(), |event| match event {
        DfsEvent::TreeEdge(from, to) => parent[to.index()] = Some(from),
        DfsEvent::BackEdge(from, to) => {
            let mut path = vec![from.index()];
            let mut current = from;
            while current != to {
                match parent[current.index()] {
                    Some(previous) => {
                        current = previous;
                        path.push(previous.index());
                    }
                    None => break,
                }
            }
            path.reverse();
            cycles.push(path);
        }
        _ => {}
    });

    let mut members = Vec::new();
    for cycle in cycles {
        let names: Vec<&Id> = cycle
            .iter()
            .filter_map(|&index| definitions.get_index(index).map(|(name, _)| name))
            .collect();
        let Some((first_name, first_def)) = cycle.first().and_then(|&i| definitions.get_index(i))
        else {
            continue;
        };

        let mut path: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        path.push(first_name.to_string());
        let mut diagnostic = Diagnostic::error(format!(
            "cyclic type definition: {}",
            path.join(" -> ")
        ))
        .with_code(ErrorCode::E202)
        .with_label(first_def.span(), "cycle starts here")
        .with_help("break the cycle with an optional field, an array or a map");
        for &index in cycle.iter().skip(1) {
            if let Some((_, def)) = definitions.get_index(index) {
                diagnostic = diagnostic.with_secondary_label(def.span(), "part of the cycle");
            }
        }
        diagnostics.emit(diagnostic);
        members.extend(names.into_iter().cloned());
    }
    members
}

fn is_pascal_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && !name.contains('_')
}

fn is_upper_snake_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
