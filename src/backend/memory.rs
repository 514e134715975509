use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::error::{BackendError, ErrorCode};
use super::query::{Columns, Filter, Query, Select};
use super::traits::{Backend, Returning};
use crate::policy::{authorize, Action, Identity, PolicyContext, Row};
use crate::schema::{ColumnDefault, ForeignKey, OnDelete, Table, TableDef};

#[derive(Debug, Default)]
struct Store {
    tables: BTreeMap<Table, Vec<Row>>,
}

impl Store {
    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or_default()
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        self.tables.entry(table).or_default()
    }

    fn find(&self, table: Table, id: &Value) -> Option<&Row> {
        self.rows(table)
            .iter()
            .find(|row| row.get("id").is_some_and(|v| values_equal(v, id)))
    }

    fn uuid_of(&self, table: Table, id: Uuid, column: &str) -> Option<Uuid> {
        self.find(table, &Value::String(id.to_string()))
            .and_then(|row| row.get(column))
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

impl PolicyContext for Store {
    fn agent_user(&self, agent_id: Uuid) -> Option<Uuid> {
        self.uuid_of(Table::Agents, agent_id, "user_id")
    }

    fn property_agent(&self, property_id: Uuid) -> Option<Uuid> {
        self.uuid_of(Table::Properties, property_id, "agent_id")
    }
}

/// In-process backend enforcing the schema constraints and access policy.
///
/// Clones share one store; [`MemoryBackend::as_identity`] opens another
/// session on the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
    identity: Identity,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_identity(&self, identity: Identity) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity,
        }
    }

    pub fn as_user(&self, user_id: Uuid) -> Self {
        self.as_identity(Identity::User(user_id))
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a row with service privileges: defaults and constraints
    /// apply, access policy does not.
    pub fn seed(&self, table: Table, row: Value) -> Result<Row, BackendError> {
        let mut store = self.lock();
        let row = with_defaults(table.def(), into_row(row)?);
        check_constraints(&store, table.def(), &row, None)?;
        store.rows_mut(table).push(row.clone());
        Ok(row)
    }

    /// Every stored row of `table`, bypassing access policy.
    pub fn dump(&self, table: Table) -> Vec<Row> {
        self.lock().rows(table).to_vec()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let store = self.lock();
        let mut rows: Vec<&Row> = store
            .rows(query.table)
            .iter()
            .filter(|row| authorize(query.table, Action::Select, row, &self.identity, &*store))
            .filter(|row| query.filters.iter().all(|filter| matches(filter, row)))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_nullable(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        debug!("memory select on {} matched {} rows", query.table, rows.len());
        rows.into_iter()
            .map(|row| project(&store, query.table, row, &query.select, &self.identity))
            .collect()
    }

    async fn insert(
        &self,
        table: Table,
        row: Row,
        returning: Returning,
    ) -> Result<Vec<Row>, BackendError> {
        let mut store = self.lock();
        let row = with_defaults(table.def(), row);

        if !authorize(table, Action::Insert, &row, &self.identity, &*store) {
            return Err(rls_violation(table, &self.identity));
        }
        check_constraints(&store, table.def(), &row, None)?;
        // A returned row must also be readable; otherwise nothing is stored.
        if returning == Returning::Representation
            && !authorize(table, Action::Select, &row, &self.identity, &*store)
        {
            return Err(rls_violation(table, &self.identity));
        }

        store.rows_mut(table).push(row.clone());
        debug!("memory insert into {}", table);

        match returning {
            Returning::Minimal => Ok(Vec::new()),
            Returning::Representation => Ok(vec![row]),
        }
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError> {
        let mut store = self.lock();
        let table = query.table;
        let def = table.def();
        let now = Value::String(Utc::now().to_rfc3339());

        let mut updates = Vec::new();
        for (index, old) in store.rows(table).iter().enumerate() {
            let visible = authorize(table, Action::Select, old, &self.identity, &*store)
                && authorize(table, Action::Update, old, &self.identity, &*store);
            if !visible || !query.filters.iter().all(|filter| matches(filter, old)) {
                continue;
            }

            let mut new = old.clone();
            for (column, value) in &patch {
                new.insert(column.clone(), value.clone());
            }
            for column in def.touch_on_update {
                new.insert(column.to_string(), now.clone());
            }

            if !authorize(table, Action::Update, &new, &self.identity, &*store) {
                return Err(rls_violation(table, &self.identity));
            }
            check_constraints(&store, def, &new, Some(index))?;
            updates.push((index, new));
        }

        let rows = store.rows_mut(table);
        for (index, new) in &updates {
            rows[*index] = new.clone();
        }
        debug!("memory update on {} touched {} rows", table, updates.len());

        updates
            .iter()
            .filter(|(_, row)| authorize(table, Action::Select, row, &self.identity, &*store))
            .map(|(_, row)| project(&store, table, row, &query.select, &self.identity))
            .collect()
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let mut store = self.lock();
        let table = query.table;

        let targets: Vec<Row> = store
            .rows(table)
            .iter()
            .filter(|row| {
                authorize(table, Action::Select, row, &self.identity, &*store)
                    && authorize(table, Action::Delete, row, &self.identity, &*store)
                    && query.filters.iter().all(|filter| matches(filter, row))
            })
            .cloned()
            .collect();

        let ids: Vec<Value> = targets
            .iter()
            .filter_map(|row| row.get("id").cloned())
            .collect();
        check_restrict(&store, table, &ids)?;

        let returned = targets
            .iter()
            .map(|row| project(&store, table, row, &query.select, &self.identity))
            .collect::<Result<Vec<_>, _>>()?;

        delete_cascading(&mut store, table, &ids);
        debug!("memory delete on {} removed {} rows", table, ids.len());
        Ok(returned)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn into_row(value: Value) -> Result<Row, BackendError> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(BackendError::api(
            400,
            ErrorCode::Other("PGRST102".to_string()),
            format!("expected a JSON object, got {other}"),
        )),
    }
}

fn with_defaults(def: &TableDef, mut row: Row) -> Row {
    for (column, default) in def.defaults {
        if row.contains_key(*column) {
            continue;
        }
        let value = match default {
            ColumnDefault::GeneratedUuid => Value::String(Uuid::new_v4().to_string()),
            ColumnDefault::Now => Value::String(Utc::now().to_rfc3339()),
            ColumnDefault::Text(text) => Value::String(text.to_string()),
            ColumnDefault::Integer(number) => json!(number),
            ColumnDefault::Boolean(flag) => Value::Bool(*flag),
        };
        row.insert(column.to_string(), value);
    }
    row
}

fn rls_violation(table: Table, identity: &Identity) -> BackendError {
    let status = match identity {
        Identity::Anonymous => 401,
        Identity::User(_) => 403,
    };
    BackendError::api(
        status,
        ErrorCode::InsufficientPrivilege,
        format!("new row violates row-level security policy for table \"{table}\""),
    )
}

/// Checks NOT NULL, CHECK, FOREIGN KEY and UNIQUE constraints. `skip` is
/// the index of the row being replaced by an update.
fn check_constraints(
    store: &Store,
    def: &TableDef,
    row: &Row,
    skip: Option<usize>,
) -> Result<(), BackendError> {
    let table = def.table;

    for column in def.required {
        if row.get(*column).map_or(true, Value::is_null) {
            return Err(BackendError::api(
                400,
                ErrorCode::NotNullViolation,
                format!("null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"),
            ));
        }
    }

    for column in def.non_blank {
        if row
            .get(*column)
            .and_then(Value::as_str)
            .is_some_and(|text| text.trim().is_empty())
        {
            return Err(check_violation(table, column));
        }
    }

    for (column, allowed) in def.allowed_values {
        match row.get(*column) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) if allowed.iter().any(|value| *value == text.as_str()) => {}
            Some(_) => return Err(check_violation(table, column)),
        }
    }

    for fk in def.foreign_keys {
        let Some(reference) = row.get(fk.column).filter(|value| !value.is_null()) else {
            continue;
        };
        if store.find(fk.references, reference).is_none() {
            return Err(BackendError::api(
                409,
                ErrorCode::ForeignKeyViolation,
                format!(
                    "insert or update on table \"{table}\" violates foreign key constraint \"{table}_{}_fkey\"",
                    fk.column
                ),
            ));
        }
    }

    for columns in def.unique {
        let key: Vec<&Value> = columns.iter().filter_map(|c| row.get(*c)).collect();
        if key.len() != columns.len() || key.iter().any(|value| value.is_null()) {
            continue;
        }
        let duplicate = store.rows(table).iter().enumerate().any(|(index, other)| {
            Some(index) != skip
                && columns
                    .iter()
                    .zip(&key)
                    .all(|(column, value)| other.get(*column).is_some_and(|o| values_equal(o, value)))
        });
        if duplicate {
            return Err(BackendError::api(
                409,
                ErrorCode::UniqueViolation,
                format!(
                    "duplicate key value violates unique constraint \"{table}_{}_key\"",
                    columns.join("_")
                ),
            ));
        }
    }

    Ok(())
}

fn check_violation(table: Table, column: &str) -> BackendError {
    BackendError::api(
        400,
        ErrorCode::CheckViolation,
        format!("new row for relation \"{table}\" violates check constraint \"{table}_{column}_check\""),
    )
}

/// Tables holding a foreign key into `parent`, with that key.
fn referencing(parent: Table) -> impl Iterator<Item = (Table, &'static ForeignKey)> {
    Table::ALL
        .into_iter()
        .filter_map(move |child| child.foreign_key_to(parent).map(|fk| (child, fk)))
}

fn check_restrict(store: &Store, table: Table, ids: &[Value]) -> Result<(), BackendError> {
    for (child, fk) in referencing(table) {
        let referenced = store.rows(child).iter().any(|row| {
            row.get(fk.column)
                .is_some_and(|value| ids.iter().any(|id| values_equal(value, id)))
        });
        match fk.on_delete {
            OnDelete::Restrict if referenced => {
                return Err(BackendError::api(
                    409,
                    ErrorCode::ForeignKeyViolation,
                    format!("update or delete on table \"{table}\" violates foreign key constraint on table \"{child}\""),
                ));
            }
            OnDelete::Cascade if referenced => {
                let child_ids: Vec<Value> = store
                    .rows(child)
                    .iter()
                    .filter(|row| {
                        row.get(fk.column)
                            .is_some_and(|value| ids.iter().any(|id| values_equal(value, id)))
                    })
                    .filter_map(|row| row.get("id").cloned())
                    .collect();
                check_restrict(store, child, &child_ids)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Removes rows by id and cascades to referencing rows. Cascades run with
/// the table owner's rights, so access policy is not consulted.
fn delete_cascading(store: &mut Store, table: Table, ids: &[Value]) {
    if ids.is_empty() {
        return;
    }
    store.rows_mut(table).retain(|row| {
        !row.get("id")
            .is_some_and(|value| ids.iter().any(|id| values_equal(value, id)))
    });

    for (child, fk) in referencing(table) {
        if fk.on_delete != OnDelete::Cascade {
            continue;
        }
        let child_ids: Vec<Value> = store
            .rows(child)
            .iter()
            .filter(|row| {
                row.get(fk.column)
                    .is_some_and(|value| ids.iter().any(|id| values_equal(value, id)))
            })
            .filter_map(|row| row.get("id").cloned())
            .collect();
        delete_cascading(store, child, &child_ids);
    }
}

fn project(
    store: &Store,
    table: Table,
    row: &Row,
    select: &Select,
    identity: &Identity,
) -> Result<Row, BackendError> {
    let mut out = match &select.columns {
        Columns::All => row.clone(),
        Columns::List(columns) => columns
            .iter()
            .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
            .collect(),
    };

    for embed in &select.embeds {
        let value = if let Some(fk) = table.foreign_key_to(embed.table) {
            let parent = row
                .get(fk.column)
                .filter(|value| !value.is_null())
                .and_then(|id| store.find(embed.table, id))
                .filter(|parent| authorize(embed.table, Action::Select, parent, identity, store));
            match parent {
                Some(parent) => Value::Object(project(store, embed.table, parent, &embed.select, identity)?),
                None => Value::Null,
            }
        } else if let Some(fk) = embed.table.foreign_key_to(table) {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            let children = store
                .rows(embed.table)
                .iter()
                .filter(|child| child.get(fk.column).is_some_and(|value| values_equal(value, &id)))
                .filter(|child| authorize(embed.table, Action::Select, child, identity, store))
                .map(|child| project(store, embed.table, child, &embed.select, identity).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(children)
        } else {
            return Err(BackendError::api(
                400,
                ErrorCode::UnknownRelationship,
                format!("Could not find a relationship between '{table}' and '{}'", embed.table),
            ));
        };
        out.insert(embed.table.name().to_string(), value);
    }

    Ok(out)
}

fn matches(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::Eq(column, Value::Null) => row.get(column).map_or(true, Value::is_null),
        Filter::Eq(column, expected) => row
            .get(column)
            .is_some_and(|value| values_equal(value, expected)),
        Filter::Gte(column, bound) => row
            .get(column)
            .and_then(|value| compare(value, bound))
            .is_some_and(|ordering| ordering != Ordering::Less),
        Filter::Lte(column, bound) => row
            .get(column)
            .and_then(|value| compare(value, bound))
            .is_some_and(|ordering| ordering != Ordering::Greater),
        Filter::ILike(column, needle) => row
            .get(column)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        Filter::Or(filters) => filters.iter().any(|filter| matches(filter, row)),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => {
            a == b
                || matches!(
                    (Uuid::parse_str(a), Uuid::parse_str(b)),
                    (Ok(x), Ok(y)) if x == y
                )
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Nulls sort last in ascending order.
fn compare_nullable(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}
