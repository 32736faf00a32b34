//! Binds parsed literals to registry types.
//!
//! The binder checks data instances, table rows, `@default` values and
//! constants against a frozen [`TypeRegistry`]. It reports every problem in
//! a value rather than stopping at the first one; a value with any error is
//! not produced.

use indexmap::IndexMap;
use log::trace;

use folio_core::{
    data::{Column, DataInstance, TableDef},
    identifier::Id,
    schema::{Constraint, Definition, EnumDef, FieldDef, PrimitiveKind, StructDef, TypeRef},
    span::{Span, Spanned},
    value::{EnumValue, Value},
};

use crate::{
    config::ParseConfig,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    parser_types::{DataDecl, Literal, TableDecl},
    registry::TypeRegistry,
};

/// Convert a literal without checking it against a type.
pub fn literal_value(literal: &Literal<'_>) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Array(items) => {
            Value::Array(items.iter().map(|item| literal_value(item.inner())).collect())
        }
        Literal::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|entry| (entry.key.inner().clone(), literal_value(entry.value.inner())))
                .collect(),
        ),
        Literal::Member { enum_name, member } => Value::EnumMember(EnumValue {
            enum_name: enum_name.as_ref().map(|name| Id::new(name.inner())),
            member: Id::new(member.inner()),
        }),
    }
}

fn child_path(path: &str, segment: impl std::fmt::Display) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Checks values against the types of a frozen registry.
pub struct Binder<'r> {
    registry: &'r TypeRegistry,
    config: ParseConfig,
    diagnostics: DiagnosticCollector,
    /// Row and column of the table cell being bound.
    cell: Option<(usize, usize)>,
}

impl<'r> Binder<'r> {
    pub fn new(registry: &'r TypeRegistry, config: ParseConfig) -> Self {
        Self {
            registry,
            config,
            diagnostics: DiagnosticCollector::new(),
            cell: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_diagnostics()
    }

    /// Bind a `data` block to its struct.
    pub fn bind_data(&mut self, decl: &DataDecl<'_>) -> Option<DataInstance> {
        let def = self.struct_named(&decl.type_name)?;
        let entries: Vec<(&str, Span, &Spanned<Literal<'_>>)> = decl
            .fields
            .iter()
            .map(|field| (*field.name.inner(), field.name.span(), &field.value))
            .collect();

        let fields = self.bind_fields(def, &entries, decl.span, "", 1)?;
        trace!(name = *decl.name.inner(), fields = fields.len(); "Bound data instance");
        Some(DataInstance {
            type_name: def.name.clone(),
            name: Id::new(decl.name.inner()),
            fields,
            span: decl.span,
        })
    }

    /// Bind a `table` block. Rows with errors are left out of the result.
    pub fn bind_table(&mut self, decl: &TableDecl<'_>) -> Option<TableDef> {
        let mut columns: Vec<Column> = Vec::with_capacity(decl.columns.len());
        let mut valid = true;
        for column in &decl.columns {
            if columns.iter().any(|c| c.name == *column.name.inner()) {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "column `{}` is declared more than once in table `{}`",
                        column.name.inner(),
                        decl.name.inner()
                    ))
                    .with_code(ErrorCode::E204)
                    .with_label(column.name.span(), "duplicate column"),
                );
                valid = false;
                continue;
            }
            for name in column.ty.named_refs() {
                if !self.registry.is_type(name.inner()) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("unknown type `{}`", name.inner()))
                            .with_code(ErrorCode::E201)
                            .with_label(name.span(), "not declared in this document"),
                    );
                    valid = false;
                }
            }
            columns.push(Column {
                name: Id::new(column.name.inner()),
                ty: column.ty.to_type_ref(),
            });
        }
        if !valid {
            return None;
        }

        let mut rows = Vec::with_capacity(decl.rows.len());
        for (row_index, row) in decl.rows.iter().enumerate() {
            if row.len() != columns.len() {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "row {row_index} of table `{}` has {} values but the table has {} columns",
                        decl.name.inner(),
                        row.len(),
                        columns.len()
                    ))
                    .with_code(ErrorCode::E303)
                    .with_label(row.span(), format!("expected {} values", columns.len())),
                );
                continue;
            }

            let mut cells = Vec::with_capacity(columns.len());
            for (column_index, (cell, column)) in row.iter().zip(&columns).enumerate() {
                self.cell = Some((row_index, column_index));
                let path = format!("{row_index}.{}", column.name);
                if let Some(value) = self.check(cell, &column.ty, &path, 1) {
                    cells.push(value);
                }
            }
            self.cell = None;

            if cells.len() == columns.len() {
                rows.push(cells);
            }
        }

        trace!(name = *decl.name.inner(), rows = rows.len(); "Bound table");
        Some(TableDef {
            name: Id::new(decl.name.inner()),
            columns,
            rows,
            span: decl.span,
        })
    }

    /// Bind `literal` to `ty`. `path` names the value in messages.
    pub fn bind_value(
        &mut self,
        literal: &Spanned<Literal<'_>>,
        ty: &TypeRef,
        path: &str,
    ) -> Option<Value> {
        self.check(literal, ty, path, 1)
    }

    /// Bind a value for `field`, then apply its constraints.
    pub fn bind_field(
        &mut self,
        field: &FieldDef,
        literal: &Spanned<Literal<'_>>,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        if field.optional && matches!(literal.inner(), Literal::Null) {
            return Some(Value::Null);
        }
        let value = self.check(literal, &field.ty, path, depth)?;

        let mut satisfied = true;
        for constraint in &field.constraints {
            if !constraint_holds(constraint, &value) {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "`{path}` violates {constraint}: found {value}"
                    ))
                    .with_code(ErrorCode::E311)
                    .with_label(literal.span(), format!("must satisfy {constraint}")),
                );
                satisfied = false;
            }
        }
        satisfied.then_some(value)
    }

    fn struct_named(&mut self, name: &Spanned<&str>) -> Option<&'r StructDef> {
        let registry = self.registry;
        let resolved = registry.resolve_name(name.inner());
        match resolved.and_then(|resolved| registry.get(resolved)) {
            Some(Definition::Struct(def)) => Some(def),
            Some(other) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "`{}` is a {}, not a struct",
                        name.inner(),
                        other.kind_name()
                    ))
                    .with_code(ErrorCode::E208)
                    .with_label(name.span(), "expected a struct type")
                    .with_secondary_label(other.span(), "declared here"),
                );
                None
            }
            None => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("unknown type `{}`", name.inner()))
                        .with_code(ErrorCode::E201)
                        .with_label(name.span(), "not declared in this document"),
                );
                None
            }
        }
    }

    /// Bind struct fields given as `(name, name span, value)` triples.
    ///
    /// Missing fields with a default take it; the result follows the
    /// struct's field order.
    fn bind_fields(
        &mut self,
        def: &StructDef,
        entries: &[(&str, Span, &Spanned<Literal<'_>>)],
        span: Span,
        path: &str,
        depth: usize,
    ) -> Option<IndexMap<Id, Value>> {
        let mut valid = true;
        let mut seen: IndexMap<&str, Span> = IndexMap::new();
        let mut bound: IndexMap<Id, Value> = IndexMap::new();

        for &(name, name_span, literal) in entries {
            if let Some(&first) = seen.get(name) {
                self.diagnostics.emit(
                    Diagnostic::error(format!("field `{}` is set more than once", child_path(path, name)))
                        .with_code(ErrorCode::E204)
                        .with_label(name_span, "duplicate field")
                        .with_secondary_label(first, "first set here"),
                );
                valid = false;
                continue;
            }
            seen.insert(name, name_span);

            let Some(field) = def.field(name) else {
                let known: Vec<&str> = def.fields.iter().map(|f| f.name.as_str()).collect();
                let message = format!("struct `{}` has no field `{name}`", def.name);
                let diagnostic = if self.config.strict_fields {
                    valid = false;
                    Diagnostic::error(message)
                } else {
                    Diagnostic::warning(message)
                };
                self.diagnostics.emit(
                    diagnostic
                        .with_code(ErrorCode::E301)
                        .with_label(name_span, "unknown field")
                        .with_help(format!("known fields: {}", known.join(", "))),
                );
                continue;
            };

            match self.bind_field(field, literal, &child_path(path, name), depth) {
                Some(value) => {
                    bound.insert(field.name.clone(), value);
                }
                None => valid = false,
            }
        }

        let mut fields = IndexMap::with_capacity(def.fields.len());
        for field in &def.fields {
            if let Some(value) = bound.shift_remove(&field.name) {
                fields.insert(field.name.clone(), value);
            } else if seen.contains_key(field.name.as_str()) || field.optional {
                // Reported above, or allowed to be absent.
            } else if let Some(default) = &field.default {
                fields.insert(field.name.clone(), default.clone());
            } else {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "missing field `{}` in `{}` value",
                        child_path(path, &field.name),
                        def.name
                    ))
                    .with_code(ErrorCode::E300)
                    .with_label(span, format!("`{}` is required", field.name))
                    .with_secondary_label(field.span, "declared here"),
                );
                valid = false;
            }
        }

        valid.then_some(fields)
    }

    fn check(
        &mut self,
        literal: &Spanned<Literal<'_>>,
        ty: &TypeRef,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        if depth > self.config.max_depth {
            self.diagnostics.emit(
                Diagnostic::error(format!(
                    "`{path}` is nested more than {} levels deep",
                    self.config.max_depth
                ))
                .with_code(ErrorCode::E313)
                .with_label(literal.span(), "nested too deep"),
            );
            return None;
        }

        match (ty, literal.inner()) {
            (TypeRef::Optional(_), Literal::Null) => Some(Value::Null),
            (TypeRef::Optional(inner), _) => self.check(literal, inner, path, depth),
            (TypeRef::Primitive(PrimitiveKind::Any), _) => Some(literal_value(literal.inner())),
            (TypeRef::Primitive(PrimitiveKind::Int), Literal::Int(n)) => Some(Value::Int(*n)),
            (TypeRef::Primitive(PrimitiveKind::Float), Literal::Int(n)) => {
                Some(Value::Float(*n as f64))
            }
            (TypeRef::Primitive(PrimitiveKind::Float), Literal::Float(x)) => Some(Value::Float(*x)),
            (TypeRef::Primitive(PrimitiveKind::String), Literal::String(s)) => {
                Some(Value::String(s.clone()))
            }
            (TypeRef::Primitive(PrimitiveKind::Bool), Literal::Bool(b)) => Some(Value::Bool(*b)),
            (TypeRef::Array(element), Literal::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    if let Some(value) = self.check(item, element, &child_path(path, index), depth + 1) {
                        values.push(value);
                    }
                }
                (values.len() == items.len()).then_some(Value::Array(values))
            }
            (TypeRef::Map(key_ty, value_ty), Literal::Map(entries)) => {
                let mut values = IndexMap::with_capacity(entries.len());
                let mut valid = true;
                for entry in entries {
                    let key = entry.key.inner();
                    let entry_path = child_path(path, key);
                    if values.contains_key(key.as_str()) {
                        self.diagnostics.emit(
                            Diagnostic::error(format!("key `{entry_path}` is set more than once"))
                                .with_code(ErrorCode::E204)
                                .with_label(entry.key.span(), "duplicate key"),
                        );
                        valid = false;
                        continue;
                    }
                    if !self.check_key(&entry.key, key_ty, &entry_path) {
                        valid = false;
                        continue;
                    }
                    match self.check(&entry.value, value_ty, &entry_path, depth + 1) {
                        Some(value) => {
                            values.insert(key.clone(), value);
                        }
                        None => valid = false,
                    }
                }
                valid.then_some(Value::Map(values))
            }
            (TypeRef::Named(name), _) => self.check_named(literal, name, path, depth),
            (_, Literal::Null) => {
                self.emit_mismatch(literal, ty, path, "`null` is only allowed for optional types");
                None
            }
            _ => {
                self.emit_mismatch(literal, ty, path, "");
                None
            }
        }
    }

    fn check_named(
        &mut self,
        literal: &Spanned<Literal<'_>>,
        name: &Id,
        path: &str,
        depth: usize,
    ) -> Option<Value> {
        let registry = self.registry;
        match registry.get(name.as_str()) {
            Some(Definition::Alias(alias)) => self.check(literal, &alias.target, path, depth),
            Some(Definition::Struct(def)) => match literal.inner() {
                Literal::Map(entries) => {
                    let entries: Vec<(&str, Span, &Spanned<Literal<'_>>)> = entries
                        .iter()
                        .map(|entry| (entry.key.inner().as_str(), entry.key.span(), &entry.value))
                        .collect();
                    self.bind_fields(def, &entries, literal.span(), path, depth + 1)
                        .map(|fields| {
                            Value::Map(
                                fields
                                    .into_iter()
                                    .map(|(name, value)| (name.to_string(), value))
                                    .collect(),
                            )
                        })
                }
                _ => {
                    self.emit_mismatch(literal, &TypeRef::Named(name.clone()), path, "");
                    None
                }
            },
            Some(Definition::Enum(def)) => self.check_member(literal, def, path),
            Some(Definition::Const(_)) | None => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("`{path}` has unknown type `{name}`"))
                        .with_code(ErrorCode::E201)
                        .with_label(literal.span(), "type cannot be resolved"),
                );
                None
            }
        }
    }

    fn check_member(
        &mut self,
        literal: &Spanned<Literal<'_>>,
        def: &EnumDef,
        path: &str,
    ) -> Option<Value> {
        let Literal::Member { enum_name, member } = literal.inner() else {
            self.emit_mismatch(literal, &TypeRef::Named(def.name.clone()), path, "");
            return None;
        };

        if let Some(qualifier) = enum_name.as_ref().filter(|q| def.name != *q.inner()) {
            self.diagnostics.emit(
                Diagnostic::error(format!(
                    "`{}::{}` is not a value of enum `{}`",
                    qualifier.inner(),
                    member.inner(),
                    def.name
                ))
                .with_code(ErrorCode::E302)
                .with_label(literal.span(), format!("expected a `{}` member", def.name)),
            );
            return None;
        }

        if !def.has_member(member.inner()) {
            let expected: Vec<&str> = def.members.iter().map(|m| m.name.as_str()).collect();
            let (code, message) = if enum_name.is_some() {
                (
                    ErrorCode::E402,
                    format!("enum `{}` has no member `{}`", def.name, member.inner()),
                )
            } else {
                (
                    ErrorCode::E302,
                    format!(
                        "`{}` is not a member of enum `{}` at `{path}`",
                        member.inner(),
                        def.name
                    ),
                )
            };
            self.diagnostics.emit(
                Diagnostic::error(message)
                    .with_code(code)
                    .with_label(member.span(), "unknown member")
                    .with_help(format!("expected one of: {}", expected.join(", "))),
            );
            return None;
        }

        Some(Value::EnumMember(EnumValue {
            enum_name: enum_name.as_ref().map(|_| def.name.clone()),
            member: Id::new(member.inner()),
        }))
    }

    /// Map keys are strings in source; an enum key type restricts them to members.
    fn check_key(&mut self, key: &Spanned<String>, key_ty: &TypeRef, path: &str) -> bool {
        let resolved = self.registry.resolve(key_ty);
        let TypeRef::Named(name) = resolved else {
            return true;
        };
        match self.registry.get_enum(name.as_str()) {
            Some(def) if !def.has_member(key.inner()) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "key `{path}` is not a member of enum `{}`",
                        def.name
                    ))
                    .with_code(ErrorCode::E302)
                    .with_label(key.span(), "invalid key"),
                );
                false
            }
            _ => true,
        }
    }

    fn emit_mismatch(&mut self, literal: &Spanned<Literal<'_>>, ty: &TypeRef, path: &str, help: &str) {
        let found = literal.inner().kind_name();
        let mut diagnostic = match self.cell {
            Some((row, column)) => Diagnostic::error(format!(
                "cell type mismatch at row {row}, column {column}: expected `{ty}`, found {found}"
            ))
            .with_code(ErrorCode::E304),
            None => Diagnostic::error(format!(
                "incompatible value for `{path}`: expected `{ty}`, found {found}"
            ))
            .with_code(ErrorCode::E203),
        };
        diagnostic = diagnostic.with_label(literal.span(), format!("expected `{ty}`"));
        if !help.is_empty() {
            diagnostic = diagnostic.with_help(help);
        }
        self.diagnostics.emit(diagnostic);
    }
}

fn constraint_holds(constraint: &Constraint, value: &Value) -> bool {
    match constraint {
        Constraint::Range {
            min,
            max,
            exclusive_min,
            exclusive_max,
        } => match value.as_f64() {
            Some(x) => {
                let above = min.is_none_or(|min| if *exclusive_min { x > min } else { x >= min });
                let below = max.is_none_or(|max| if *exclusive_max { x < max } else { x <= max });
                above && below
            }
            None => true,
        },
        Constraint::Length { min, max } => {
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Map(entries) => entries.len(),
                _ => return true,
            };
            min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
        }
        Constraint::Pattern { pattern } => match value {
            Value::String(s) => pattern.is_full_match(s),
            _ => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexer::tokenize,
        parser::{parse_data, parse_declaration, parse_table, significant},
        registry::TypeRegistryBuilder,
    };

    fn registry(sources: &[&str]) -> TypeRegistry {
        let mut builder = TypeRegistryBuilder::new();
        for source in sources {
            let tokens = significant(tokenize(source, 0).expect("Failed to tokenize"));
            builder.register(&parse_declaration(&tokens).expect("Failed to parse"));
        }
        let (registry, diagnostics) = builder.freeze(&ParseConfig::default());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        registry
    }

    fn bind_data_with(
        registry: &TypeRegistry,
        config: ParseConfig,
        source: &str,
    ) -> (Option<DataInstance>, Vec<Diagnostic>) {
        let tokens = significant(tokenize(source, 0).expect("Failed to tokenize"));
        let decl = parse_data(&tokens).expect("Failed to parse");
        let mut binder = Binder::new(registry, config);
        let instance = binder.bind_data(&decl);
        (instance, binder.into_diagnostics())
    }

    fn bind_data(registry: &TypeRegistry, source: &str) -> (Option<DataInstance>, Vec<Diagnostic>) {
        bind_data_with(registry, ParseConfig::default(), source)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
        diagnostics.iter().filter_map(Diagnostic::code).collect()
    }

    #[test]
    fn test_point_validates() {
        let registry = registry(&["struct Point { x: int; y: int; }"]);
        let (instance, diagnostics) = bind_data(&registry, "data Point p { x = 1; y = 2; }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let instance = instance.unwrap();
        assert_eq!(instance.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_missing_field_names_it() {
        let registry = registry(&["struct Point { x: int; y: int; }"]);
        let (instance, diagnostics) = bind_data(&registry, "data Point p { x = 1; }");
        assert!(instance.is_none());
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E300]);
        assert!(diagnostics[0].message().contains("`y`"));
    }

    #[test]
    fn test_nested_paths_in_messages() {
        let registry = registry(&[
            "struct Server { host: string; port: int; }",
            "struct Cluster { servers: [Server]; }",
        ]);
        let (_, diagnostics) = bind_data(
            &registry,
            r#"data Cluster c { servers = [ { host = "a"; port = 1 }, { host = "b"; port = "x" } ] }"#,
        );
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E203]);
        assert!(
            diagnostics[0].message().contains("`servers.1.port`"),
            "{}",
            diagnostics[0].message()
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let registry = registry(&["struct Point { x: int; y: int; }"]);
        let (_, diagnostics) = bind_data(&registry, r#"data Point p { x = "1"; z = 3; }"#);
        assert_eq!(
            codes(&diagnostics),
            vec![ErrorCode::E203, ErrorCode::E301, ErrorCode::E300]
        );
    }

    #[test]
    fn test_unknown_fields_can_be_warnings() {
        let registry = registry(&["struct Point { x: int; }"]);
        let config = ParseConfig {
            strict_fields: false,
            ..ParseConfig::default()
        };
        let (instance, diagnostics) = bind_data_with(&registry, config, "data Point p { x = 1; z = 3; }");
        assert!(instance.is_some());
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E301]);
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn test_defaults_and_optionals() {
        let registry = registry(&["struct Server { host: string; port: int @default(80); tag: string?; }"]);
        let (instance, diagnostics) = bind_data(&registry, r#"data Server s { host = "x"; }"#);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let instance = instance.unwrap();
        assert_eq!(instance.get("port"), Some(&Value::Int(80)));
        assert_eq!(instance.get("tag"), None);

        let (instance, diagnostics) = bind_data(&registry, r#"data Server s { host = "x"; tag = null }"#);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(instance.unwrap().get("tag"), Some(&Value::Null));

        let (_, diagnostics) = bind_data(&registry, r#"data Server s { host = null; }"#);
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E203]);
    }

    #[test]
    fn test_int_widens_to_float_only() {
        let registry = registry(&["struct Sample { ratio: float; count: int; }"]);
        let (instance, diagnostics) = bind_data(&registry, "data Sample s { ratio = 1; count = 2 }");
        assert!(diagnostics.is_empty());
        assert_eq!(instance.unwrap().get("ratio"), Some(&Value::Float(1.0)));

        let (_, diagnostics) = bind_data(&registry, "data Sample s { ratio = 1; count = 2.5 }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E203]);
    }

    #[test]
    fn test_enum_values() {
        let registry = registry(&[
            "enum Status { ACTIVE; INACTIVE }",
            "enum Color { RED }",
            "struct User { status: Status; }",
        ]);
        let (_, diagnostics) = bind_data(&registry, "data User u { status = Status::ACTIVE }");
        assert!(diagnostics.is_empty());
        let (_, diagnostics) = bind_data(&registry, "data User u { status = ACTIVE }");
        assert!(diagnostics.is_empty());

        let (_, diagnostics) = bind_data(&registry, "data User u { status = DELETED }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E302]);
        let (_, diagnostics) = bind_data(&registry, "data User u { status = Status::DELETED }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E402]);
        let (_, diagnostics) = bind_data(&registry, "data User u { status = Color::RED }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E302]);
    }

    #[test]
    fn test_constraints() {
        let registry = registry(&[
            "struct Server { port: int @range(1, 65535); name: string @length(1, 3); }",
        ]);
        let (_, diagnostics) = bind_data(&registry, r#"data Server s { port = 0; name = "abcd" }"#);
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E311, ErrorCode::E311]);
    }

    #[test]
    fn test_exclusive_range() {
        let registry = registry(&["struct Ratio { value: float @range(0, 1, true, false); }"]);
        let (_, diagnostics) = bind_data(&registry, "data Ratio r { value = 0 }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E311]);
        assert!(diagnostics[0].message().contains("@range(0, 1, true, false)"));
        let (_, diagnostics) = bind_data(&registry, "data Ratio r { value = 1 }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (_, diagnostics) = bind_data(&registry, "data Ratio r { value = 0.5 }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_pattern_must_match_whole_value() {
        let registry = registry(&[r#"struct Host { name: string @pattern("[a-z]+-[0-9]+"); }"#]);
        let (instance, diagnostics) = bind_data(&registry, r#"data Host h { name = "web-1" }"#);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert!(instance.is_some());

        let (_, diagnostics) = bind_data(&registry, r#"data Host h { name = "web-1.local" }"#);
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E311]);
    }

    #[test]
    fn test_type_must_be_struct() {
        let registry = registry(&["enum Status { ACTIVE }"]);
        let (_, diagnostics) = bind_data(&registry, "data Status s { }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E208]);
        let (_, diagnostics) = bind_data(&registry, "data Missing s { }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E201]);
    }

    #[test]
    fn test_depth_limit() {
        let registry = registry(&["struct Deep { value: any; }"]);
        let config = ParseConfig {
            max_depth: 3,
            ..ParseConfig::default()
        };
        let tokens = significant(tokenize("data Deep d { value = [[[[1]]]] }", 0).unwrap());
        let decl = parse_data(&tokens).unwrap();
        let mut binder = Binder::new(&registry, config);
        assert!(binder.bind_data(&decl).is_some());

        let registry = self::registry(&["struct Deep { value: [[[[int]]]]; }"]);
        let mut binder = Binder::new(&registry, config);
        assert!(binder.bind_data(&decl).is_none());
        assert_eq!(codes(&binder.into_diagnostics()), vec![ErrorCode::E313]);
    }

    #[test]
    fn test_map_with_enum_keys() {
        let registry = registry(&[
            "enum Color { RED; BLUE }",
            "struct Palette { weights: map<Color, float>; }",
        ]);
        let (_, diagnostics) = bind_data(&registry, "data Palette p { weights = { RED = 1; BLUE: 0.5 } }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (_, diagnostics) = bind_data(&registry, "data Palette p { weights = { GREEN = 1 } }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E302]);
    }

    #[test]
    fn test_table_rows() {
        let registry = registry(&[]);
        let tokens = significant(
            tokenize(
                r#"table Scores { name: string; score: float; } = [ ["ada", 9.5], ["bob"], ["eve", "x"], ["kim", 7] ];"#,
                0,
            )
            .unwrap(),
        );
        let decl = parse_table(&tokens).unwrap();
        let mut binder = Binder::new(&registry, ParseConfig::default());
        let table = binder.bind_table(&decl).unwrap();
        let diagnostics = binder.into_diagnostics();

        assert_eq!(codes(&diagnostics), vec![ErrorCode::E303, ErrorCode::E304]);
        assert!(diagnostics[0].message().starts_with("row 1 "));
        assert!(diagnostics[1].message().contains("row 2, column 1"));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], Value::Float(7.0));
    }
}
