//! Declarative description of the listings schema.
//!
//! The SQL migration is the source of truth for the hosted backend. The
//! [`TableDef`]s below restate the same constraints so the in-process backend
//! can enforce them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Full SQL migration: tables, indexes, row-level security and policies.
pub const MIGRATION_SQL: &str = include_str!("../../migrations/20240101000000_initial_schema.sql");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Agents,
    Properties,
    PropertyImages,
    PropertyFeatures,
    SavedProperties,
    Inquiries,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Agents,
        Table::Properties,
        Table::PropertyImages,
        Table::PropertyFeatures,
        Table::SavedProperties,
        Table::Inquiries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Agents => "agents",
            Table::Properties => "properties",
            Table::PropertyImages => "property_images",
            Table::PropertyFeatures => "property_features",
            Table::SavedProperties => "saved_properties",
            Table::Inquiries => "inquiries",
        }
    }

    pub fn def(&self) -> &'static TableDef {
        match self {
            Table::Agents => &AGENTS,
            Table::Properties => &PROPERTIES,
            Table::PropertyImages => &PROPERTY_IMAGES,
            Table::PropertyFeatures => &PROPERTY_FEATURES,
            Table::SavedProperties => &SAVED_PROPERTIES,
            Table::Inquiries => &INQUIRIES,
        }
    }

    /// Foreign key on `self` pointing at `target`, if any.
    pub fn foreign_key_to(&self, target: Table) -> Option<&'static ForeignKey> {
        self.def()
            .foreign_keys
            .iter()
            .find(|fk| fk.references == target)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    Restrict,
}

#[derive(Debug)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: Table,
    pub on_delete: OnDelete,
}

/// Value filled in when an insert omits the column
#[derive(Debug, Clone, Copy)]
pub enum ColumnDefault {
    GeneratedUuid,
    Now,
    Text(&'static str),
    Integer(i64),
    Boolean(bool),
}

#[derive(Debug)]
pub struct TableDef {
    pub table: Table,
    /// NOT NULL columns. An explicit null is rejected even where a default exists.
    pub required: &'static [&'static str],
    /// Text columns carrying a `char_length(trim(..)) > 0` check.
    pub non_blank: &'static [&'static str],
    /// Text columns restricted to a fixed set of values.
    pub allowed_values: &'static [(&'static str, &'static [&'static str])],
    pub unique: &'static [&'static [&'static str]],
    pub foreign_keys: &'static [ForeignKey],
    pub defaults: &'static [(&'static str, ColumnDefault)],
    /// Columns refreshed to `now()` on every update.
    pub touch_on_update: &'static [&'static str],
}

const PROPERTY_TYPES: &[&str] = &["house", "apartment", "condo", "townhouse", "land", "commercial"];
const LISTING_TYPES: &[&str] = &["sale", "rent"];
const PROPERTY_STATUSES: &[&str] = &["active", "pending", "sold", "rented"];
const INQUIRY_STATUSES: &[&str] = &["new", "contacted", "closed"];

static AGENTS: TableDef = TableDef {
    table: Table::Agents,
    required: &["user_id", "full_name", "email", "rating", "total_sales"],
    non_blank: &[],
    allowed_values: &[],
    unique: &[&["user_id"]],
    foreign_keys: &[],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("rating", ColumnDefault::Integer(0)),
        ("total_sales", ColumnDefault::Integer(0)),
        ("created_at", ColumnDefault::Now),
    ],
    touch_on_update: &[],
};

static PROPERTIES: TableDef = TableDef {
    table: Table::Properties,
    required: &[
        "title",
        "property_type",
        "listing_type",
        "price",
        "address",
        "city",
        "bedrooms",
        "bathrooms",
        "status",
        "featured",
        "views",
    ],
    non_blank: &[],
    allowed_values: &[
        ("property_type", PROPERTY_TYPES),
        ("listing_type", LISTING_TYPES),
        ("status", PROPERTY_STATUSES),
    ],
    unique: &[],
    foreign_keys: &[ForeignKey {
        column: "agent_id",
        references: Table::Agents,
        on_delete: OnDelete::Restrict,
    }],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("bedrooms", ColumnDefault::Integer(0)),
        ("bathrooms", ColumnDefault::Integer(0)),
        ("country", ColumnDefault::Text("USA")),
        ("status", ColumnDefault::Text("active")),
        ("featured", ColumnDefault::Boolean(false)),
        ("views", ColumnDefault::Integer(0)),
        ("created_at", ColumnDefault::Now),
        ("updated_at", ColumnDefault::Now),
    ],
    touch_on_update: &["updated_at"],
};

static PROPERTY_IMAGES: TableDef = TableDef {
    table: Table::PropertyImages,
    required: &["property_id", "image_url", "is_primary", "display_order"],
    non_blank: &[],
    allowed_values: &[],
    unique: &[],
    foreign_keys: &[ForeignKey {
        column: "property_id",
        references: Table::Properties,
        on_delete: OnDelete::Cascade,
    }],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("is_primary", ColumnDefault::Boolean(false)),
        ("display_order", ColumnDefault::Integer(0)),
        ("created_at", ColumnDefault::Now),
    ],
    touch_on_update: &[],
};

static PROPERTY_FEATURES: TableDef = TableDef {
    table: Table::PropertyFeatures,
    required: &["property_id", "feature_name"],
    non_blank: &[],
    allowed_values: &[],
    unique: &[],
    foreign_keys: &[ForeignKey {
        column: "property_id",
        references: Table::Properties,
        on_delete: OnDelete::Cascade,
    }],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("created_at", ColumnDefault::Now),
    ],
    touch_on_update: &[],
};

static SAVED_PROPERTIES: TableDef = TableDef {
    table: Table::SavedProperties,
    required: &["user_id", "property_id"],
    non_blank: &[],
    allowed_values: &[],
    unique: &[&["user_id", "property_id"]],
    foreign_keys: &[ForeignKey {
        column: "property_id",
        references: Table::Properties,
        on_delete: OnDelete::Cascade,
    }],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("created_at", ColumnDefault::Now),
    ],
    touch_on_update: &[],
};

static INQUIRIES: TableDef = TableDef {
    table: Table::Inquiries,
    required: &["property_id", "name", "email", "message", "status"],
    non_blank: &["name", "email", "message"],
    allowed_values: &[("status", INQUIRY_STATUSES)],
    unique: &[],
    foreign_keys: &[ForeignKey {
        column: "property_id",
        references: Table::Properties,
        on_delete: OnDelete::Cascade,
    }],
    defaults: &[
        ("id", ColumnDefault::GeneratedUuid),
        ("status", ColumnDefault::Text("new")),
        ("created_at", ColumnDefault::Now),
    ],
    touch_on_update: &[],
};
