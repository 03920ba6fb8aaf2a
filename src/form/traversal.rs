//! Depth-first walks over a schema.
//!
//! Visibility predicates are evaluated against the value snapshot passed in,
//! never a cached one. A hidden structural node hides its whole subtree.

use tracing::trace;

use super::schema::{CustomMultipleField, FieldDescriptor, ValueField};
use super::value::{FieldKey, FormValues};

pub fn collect_checkable<'a>(schema: &'a [FieldDescriptor], form: &FormValues) -> Vec<&'a ValueField> {
    let mut fields = Vec::new();
    walk_checkable(schema, form, &mut fields);
    trace!(count = fields.len(), "collected checkable fields");
    fields
}

fn walk_checkable<'a>(
    schema: &'a [FieldDescriptor],
    form: &FormValues,
    fields: &mut Vec<&'a ValueField>,
) {
    for node in schema {
        if !node.is_visible(form) {
            continue;
        }
        match node {
            FieldDescriptor::Field(field) => fields.push(field),
            FieldDescriptor::CustomMultiple(_) | FieldDescriptor::Decorative(_) => {}
            FieldDescriptor::Group(container)
            | FieldDescriptor::Nested(container)
            | FieldDescriptor::Fragment(container) => {
                walk_checkable(&container.children, form, fields);
            }
        }
    }
}

pub fn collect_custom_multiple<'a>(
    schema: &'a [FieldDescriptor],
    form: &FormValues,
) -> Vec<&'a CustomMultipleField> {
    let mut groups = Vec::new();
    walk_custom_multiple(schema, form, &mut groups);
    trace!(count = groups.len(), "collected custom-multiple groups");
    groups
}

fn walk_custom_multiple<'a>(
    schema: &'a [FieldDescriptor],
    form: &FormValues,
    groups: &mut Vec<&'a CustomMultipleField>,
) {
    for node in schema {
        if !node.is_visible(form) {
            continue;
        }
        match node {
            FieldDescriptor::CustomMultiple(group) => groups.push(group),
            FieldDescriptor::Field(_) | FieldDescriptor::Decorative(_) => {}
            FieldDescriptor::Group(container)
            | FieldDescriptor::Nested(container)
            | FieldDescriptor::Fragment(container) => {
                walk_custom_multiple(&container.children, form, groups);
            }
        }
    }
}

/// Every name the schema can hold a value for, visible or not, in schema
/// order and without duplicates.
pub fn collect_value_keys(schema: &[FieldDescriptor]) -> Vec<FieldKey> {
    fn walk(schema: &[FieldDescriptor], keys: &mut Vec<FieldKey>) {
        for node in schema {
            match node {
                FieldDescriptor::Field(field) => push_unique(keys, &field.name),
                FieldDescriptor::CustomMultiple(group) => {
                    for name in &group.names {
                        push_unique(keys, name);
                    }
                }
                FieldDescriptor::Decorative(_) => {}
                FieldDescriptor::Group(container)
                | FieldDescriptor::Nested(container)
                | FieldDescriptor::Fragment(container) => walk(&container.children, keys),
            }
        }
    }

    fn push_unique(keys: &mut Vec<FieldKey>, key: &FieldKey) {
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }

    let mut keys = Vec::new();
    walk(schema, &mut keys);
    keys
}

pub fn find_field<'a>(schema: &'a [FieldDescriptor], name: &FieldKey) -> Option<&'a ValueField> {
    schema.iter().find_map(|node| match node {
        FieldDescriptor::Field(field) if &field.name == name => Some(field),
        other => other
            .children()
            .and_then(|children| find_field(children, name)),
    })
}
