//! Row-level access rules, one check per table and operation.
//!
//! These mirror the policies installed by the SQL migration. The hosted
//! backend evaluates its own copy on every request; the in-process backend
//! calls [`authorize`] instead.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::schema::Table;

/// Who is issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(Uuid),
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Anonymous => None,
            Identity::User(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

/// Lookups the rules need beyond the row itself.
pub trait PolicyContext {
    /// Identity linked to an agent profile.
    fn agent_user(&self, agent_id: Uuid) -> Option<Uuid>;
    /// Owning agent of a property.
    fn property_agent(&self, property_id: Uuid) -> Option<Uuid>;
}

pub type Row = Map<String, Value>;

/// Returns whether `identity` may perform `action` on `row` of `table`.
///
/// For inserts and updates `row` is the new row; for selects and deletes it
/// is the stored row.
pub fn authorize(
    table: Table,
    action: Action,
    row: &Row,
    identity: &Identity,
    ctx: &impl PolicyContext,
) -> bool {
    match table {
        Table::Agents => match action {
            Action::Select => true,
            Action::Insert | Action::Update => is_self(row, "user_id", identity),
            Action::Delete => false,
        },
        Table::Properties => match action {
            Action::Select => {
                row.get("status").and_then(Value::as_str) == Some("active")
                    || owns_agent(uuid_column(row, "agent_id"), identity, ctx)
            }
            Action::Insert | Action::Update | Action::Delete => {
                owns_agent(uuid_column(row, "agent_id"), identity, ctx)
            }
        },
        Table::PropertyImages | Table::PropertyFeatures => match action {
            Action::Select => true,
            Action::Insert | Action::Update | Action::Delete => {
                owns_property(uuid_column(row, "property_id"), identity, ctx)
            }
        },
        Table::SavedProperties => match action {
            Action::Select | Action::Insert | Action::Delete => is_self(row, "user_id", identity),
            Action::Update => false,
        },
        Table::Inquiries => match action {
            Action::Insert => true,
            Action::Select | Action::Update => {
                owns_property(uuid_column(row, "property_id"), identity, ctx)
            }
            Action::Delete => false,
        },
    }
}

fn uuid_column(row: &Row, column: &str) -> Option<Uuid> {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn is_self(row: &Row, column: &str, identity: &Identity) -> bool {
    match identity.user_id() {
        Some(uid) => uuid_column(row, column) == Some(uid),
        None => false,
    }
}

fn owns_agent(agent_id: Option<Uuid>, identity: &Identity, ctx: &impl PolicyContext) -> bool {
    let (Some(uid), Some(agent_id)) = (identity.user_id(), agent_id) else {
        return false;
    };
    ctx.agent_user(agent_id) == Some(uid)
}

fn owns_property(property_id: Option<Uuid>, identity: &Identity, ctx: &impl PolicyContext) -> bool {
    let Some(property_id) = property_id else {
        return false;
    };
    owns_agent(ctx.property_agent(property_id), identity, ctx)
}
