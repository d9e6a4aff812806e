//! Constraints deferred until every row-set has loaded.
//!
//! Workers record a table's indexes, primary key and foreign keys once its
//! row-set is loaded. After the load barrier they are applied one phase at
//! a time in [`ConstraintPhase::ORDER`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::schema::{ForeignKey, Index, PrimaryKey, Table, TableRef};
use crate::error::Result;
use crate::generator::{ObjectType, SchemaObject, ScriptGeneratorContext};

/// Constraint application phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintPhase {
    Index,
    PrimaryKey,
    ForeignKey,
}

impl ConstraintPhase {
    /// Phases in application order. Foreign keys need the referenced
    /// primary key to exist.
    pub const ORDER: [ConstraintPhase; 3] = [
        ConstraintPhase::Index,
        ConstraintPhase::PrimaryKey,
        ConstraintPhase::ForeignKey,
    ];

    fn object_type(&self) -> ObjectType {
        match self {
            ConstraintPhase::Index => ObjectType::Index,
            ConstraintPhase::PrimaryKey => ObjectType::PrimaryKey,
            ConstraintPhase::ForeignKey => ObjectType::ForeignKey,
        }
    }
}

impl fmt::Display for ConstraintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintPhase::Index => "index",
            ConstraintPhase::PrimaryKey => "primary key",
            ConstraintPhase::ForeignKey => "foreign key",
        })
    }
}

#[derive(Debug, Clone)]
pub enum DeferredConstraint {
    Index(Index),
    PrimaryKey(PrimaryKey),
    ForeignKey(ForeignKey),
}

/// A deferred constraint and the table that owns it.
#[derive(Debug, Clone)]
pub struct LoadConstraint {
    pub table: Arc<Table>,
    pub constraint: DeferredConstraint,
}

impl LoadConstraint {
    pub fn phase(&self) -> ConstraintPhase {
        match self.constraint {
            DeferredConstraint::Index(_) => ConstraintPhase::Index,
            DeferredConstraint::PrimaryKey(_) => ConstraintPhase::PrimaryKey,
            DeferredConstraint::ForeignKey(_) => ConstraintPhase::ForeignKey,
        }
    }

    /// Name used in logs and the run summary.
    pub fn describe(&self) -> String {
        match &self.constraint {
            DeferredConstraint::Index(index) => format!("index {}", index.name),
            DeferredConstraint::PrimaryKey(pk) => match &pk.name {
                Some(name) => format!("primary key {}", name),
                None => format!("primary key ({})", pk.columns.join(", ")),
            },
            DeferredConstraint::ForeignKey(fk) => match &fk.name {
                Some(name) => format!("foreign key {}", name),
                None => format!(
                    "foreign key ({}) -> {}",
                    fk.columns.join(", "),
                    fk.referenced_table
                ),
            },
        }
    }

    /// Whether a table this constraint depends on did not load.
    pub fn is_blocked(&self, unloaded: &HashSet<TableRef>) -> bool {
        if unloaded.contains(&self.table.table_ref()) {
            return true;
        }
        match &self.constraint {
            DeferredConstraint::ForeignKey(fk) => unloaded.contains(&fk.referenced_table),
            _ => false,
        }
    }

    /// Statements creating the constraint in the target.
    pub fn scripts(&self, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
        let table = self.table.as_ref();
        let object = match &self.constraint {
            DeferredConstraint::Index(index) => SchemaObject::Index(table, index),
            DeferredConstraint::PrimaryKey(pk) => SchemaObject::PrimaryKey(table, pk),
            DeferredConstraint::ForeignKey(fk) => SchemaObject::ForeignKey(table, fk),
        };
        object.create_scripts(ctx)
    }
}

/// Deferred constraints keyed by owning table.
#[derive(Debug, Default)]
pub struct LoadConstraints {
    by_table: Mutex<BTreeMap<TableRef, Vec<LoadConstraint>>>,
}

impl LoadConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// The constraints of `table` that `ctx` requests, in phase order.
    pub fn of_table(table: &Arc<Table>, ctx: &ScriptGeneratorContext) -> Vec<LoadConstraint> {
        let wrap = |constraint| LoadConstraint {
            table: Arc::clone(table),
            constraint,
        };
        let mut constraints: Vec<LoadConstraint> = table
            .indexes
            .iter()
            .cloned()
            .map(DeferredConstraint::Index)
            .chain(table.primary_key.clone().map(DeferredConstraint::PrimaryKey))
            .chain(table.foreign_keys.iter().cloned().map(DeferredConstraint::ForeignKey))
            .map(wrap)
            .collect();
        constraints.retain(|c| ctx.is_requested(c.phase().object_type()));
        constraints
    }

    /// Record the constraints of a loaded table. Returns how many were added.
    pub fn collect(&self, table: &Arc<Table>, ctx: &ScriptGeneratorContext) -> usize {
        let constraints = Self::of_table(table, ctx);
        let count = constraints.len();
        if count > 0 {
            self.by_table
                .lock()
                .entry(table.table_ref())
                .or_default()
                .extend(constraints);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.by_table.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Constraints of one phase, grouped by owning table.
    pub fn phase(&self, phase: ConstraintPhase) -> Vec<(TableRef, Vec<LoadConstraint>)> {
        self.by_table
            .lock()
            .iter()
            .filter_map(|(table, constraints)| {
                let selected: Vec<_> = constraints
                    .iter()
                    .filter(|c| c.phase() == phase)
                    .cloned()
                    .collect();
                (!selected.is_empty()).then(|| (table.clone(), selected))
            })
            .collect()
    }
}
