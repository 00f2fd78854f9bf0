//! Schema-driven planning shared by every resource.
//!
//! The planner fills attribute defaults, carries computed values forward from
//! prior state, diffs configurable attributes and decides whether the change
//! forces replacement.

use serde_json::{Map, Value};

use crate::schema::{Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a resource change.
///
/// `prior_state` is `None` on create; a `null` `proposed_state` plans a destroy.
pub fn plan_resource(schema: &Schema, prior_state: Option<&Value>, proposed_state: Value) -> PlanResult {
    let prior = prior_state.filter(|p| !p.is_null());

    if proposed_state.is_null() {
        return plan_destroy(prior);
    }

    let mut planned = match proposed_state {
        Value::Object(map) => map,
        other => return PlanResult::no_change(other),
    };

    apply_defaults(&schema.block, &mut planned);

    match prior.and_then(Value::as_object) {
        None => plan_create(schema, planned),
        Some(prior) => plan_update(schema, prior, planned),
    }
}

fn plan_destroy(prior: Option<&Value>) -> PlanResult {
    let changes = prior
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_create(schema: &Schema, planned: Map<String, Value>) -> PlanResult {
    let mut changes = Vec::new();

    for (name, attr) in &schema.block.attributes {
        if !attr.flags.is_configurable() {
            continue;
        }
        if let Some(value) = planned.get(name).filter(|v| !v.is_null()) {
            changes.push(AttributeChange::added(name.clone(), value.clone()));
        }
    }
    for name in schema.block.blocks.keys() {
        if let Some(value) = planned.get(name).filter(|v| !is_empty_block(v)) {
            changes.push(AttributeChange::added(name.clone(), value.clone()));
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Map<String, Value>, mut planned: Map<String, Value>) -> PlanResult {
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.block.attributes {
        let before = prior.get(name).cloned().unwrap_or(Value::Null);
        let after = planned.get(name).cloned().unwrap_or(Value::Null);

        if !attr.flags.is_configurable() {
            continue;
        }
        // Optional+computed attributes left unset keep whatever the platform chose.
        if attr.flags.computed && after.is_null() {
            continue;
        }
        if before != after {
            requires_replace |= attr.force_new;
            changes.push(diff(name, before, after));
        }
    }

    for (name, nested) in &schema.block.blocks {
        let before = prior.get(name).cloned().unwrap_or(Value::Null);
        let after = planned.get(name).cloned().unwrap_or(Value::Null);
        if !blocks_equal(nested.nesting_mode, &before, &after) {
            requires_replace |= nested.force_new;
            changes.push(diff(name, before, after));
        }
    }

    // Computed values are only re-read after apply; carry them over so the plan
    // shows no spurious diff when nothing configurable changed.
    for (name, attr) in &schema.block.attributes {
        if !attr.flags.computed {
            continue;
        }
        let unset = planned.get(name).map_or(true, Value::is_null);
        let keep = attr.use_state_for_unknown || changes.is_empty() || attr.flags.optional;
        if unset && keep {
            if let Some(value) = prior.get(name) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn diff(name: &str, before: Value, after: Value) -> AttributeChange {
    match (before.is_null(), after.is_null()) {
        (true, _) => AttributeChange::added(name, after),
        (_, true) => AttributeChange::removed(name, before),
        _ => AttributeChange::modified(name, before, after),
    }
}

fn is_empty_block(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn blocks_equal(mode: BlockNestingMode, before: &Value, after: &Value) -> bool {
    if is_empty_block(before) && is_empty_block(after) {
        return true;
    }
    match (mode, before, after) {
        (BlockNestingMode::Set, Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().all(|item| occurrences(a, item) == occurrences(b, item))
        },
        _ => before == after,
    }
}

fn occurrences(items: &[Value], item: &Value) -> usize {
    items.iter().filter(|other| *other == item).count()
}

/// Fill schema defaults for unset attributes, recursing into nested blocks.
pub fn apply_defaults(block: &Block, obj: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            let unset = obj.get(name).map_or(true, Value::is_null);
            if unset {
                obj.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        match obj.get_mut(name) {
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(inner) = item {
                        apply_defaults(&nested.block, inner);
                    }
                }
            },
            Some(Value::Object(inner)) if nested.nesting_mode == BlockNestingMode::Single => {
                apply_defaults(&nested.block, inner);
            },
            Some(Value::Object(entries)) => {
                for entry in entries.values_mut() {
                    if let Value::Object(inner) = entry {
                        apply_defaults(&nested.block, inner);
                    }
                }
            },
            _ => {},
        }
    }
}
