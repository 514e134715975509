use serde_json::Value;

use crate::schema::Table;

/// Columns and embedded relations to return.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: Columns,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Columns {
    All,
    List(Vec<String>),
}

/// Related table nested into each returned row under its table name.
///
/// A foreign key on the outer table embeds a single object (or null); a
/// foreign key on the embedded table embeds an array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub table: Table,
    pub select: Select,
}

impl Select {
    pub fn all() -> Self {
        Self {
            columns: Columns::All,
            embeds: Vec::new(),
        }
    }

    pub fn columns(columns: &[&str]) -> Self {
        Self {
            columns: Columns::List(columns.iter().map(|c| c.to_string()).collect()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(mut self, table: Table, select: Select) -> Self {
        self.embeds.push(Embed { table, select });
        self
    }

    /// Renders the `select` parameter, e.g. `*,property_images(*)`.
    pub fn render(&self) -> String {
        let mut parts = match &self.columns {
            Columns::All => vec!["*".to_string()],
            Columns::List(columns) => columns.clone(),
        };
        for embed in &self.embeds {
            parts.push(format!("{}({})", embed.table.name(), embed.select.render()));
        }
        parts.join(",")
    }
}

impl Default for Select {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match.
    ILike(String, String),
    Or(Vec<Filter>),
}

impl Filter {
    fn operator(&self) -> String {
        match self {
            Filter::Eq(_, Value::Null) => "is.null".to_string(),
            Filter::Eq(_, value) => format!("eq.{}", render_value(value)),
            Filter::Gte(_, value) => format!("gte.{}", render_value(value)),
            Filter::Lte(_, value) => format!("lte.{}", render_value(value)),
            Filter::ILike(_, needle) => format!("ilike.*{}*", escape_pattern(needle)),
            Filter::Or(_) => String::new(),
        }
    }

    /// Renders the filter as a `(key, value)` query parameter.
    pub fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, _)
            | Filter::Gte(column, _)
            | Filter::Lte(column, _)
            | Filter::ILike(column, _) => (column.clone(), self.operator()),
            Filter::Or(filters) => ("or".to_string(), format!("({})", render_tree(filters))),
        }
    }

    /// Renders the filter inside an `or=(...)` logic tree.
    fn to_tree_item(&self) -> String {
        match self {
            Filter::Eq(column, _)
            | Filter::Gte(column, _)
            | Filter::Lte(column, _)
            | Filter::ILike(column, _) => {
                let operator = self.operator();
                match operator.split_once('.') {
                    Some((op, operand)) => format!("{column}.{op}.{}", quote_operand(operand)),
                    None => format!("{column}.{operator}"),
                }
            }
            Filter::Or(filters) => format!("or({})", render_tree(filters)),
        }
    }
}

fn render_tree(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::to_tree_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Escapes pattern metacharacters so the needle matches literally.
fn escape_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Operands holding logic-tree delimiters must be double-quoted.
fn quote_operand(operand: &str) -> String {
    if operand.contains([',', '(', ')', '"', '\\', ':']) {
        let escaped = operand.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        operand.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A filtered read (or the target of an update/delete) against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub select: Select,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            select: Select::all(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), needle.to_string()));
        self
    }

    pub fn or(mut self, filters: Vec<Filter>) -> Self {
        self.filters.push(Filter::Or(filters));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string parameters in the REST dialect.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.render())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn renders_nested_select() {
        let select = Select::all()
            .embed(Table::PropertyImages, Select::all())
            .embed(Table::Agents, Select::columns(&["id", "full_name"]));
        assert_eq!(select.render(), "*,property_images(*),agents(id,full_name)");
    }

    #[test]
    fn renders_filters_order_and_limit() {
        let params = Query::from(Table::Properties)
            .eq("status", "active")
            .ilike("city", "austin")
            .gte("price", 100000)
            .lte("price", 250000.5)
            .eq("featured", true)
            .order("created_at", false)
            .limit(20)
            .to_params();

        assert_eq!(param(&params, "select"), vec!["*"]);
        assert_eq!(param(&params, "status"), vec!["eq.active"]);
        assert_eq!(param(&params, "city"), vec!["ilike.*austin*"]);
        assert_eq!(param(&params, "price"), vec!["gte.100000", "lte.250000.5"]);
        assert_eq!(param(&params, "featured"), vec!["eq.true"]);
        assert_eq!(param(&params, "order"), vec!["created_at.desc"]);
        assert_eq!(param(&params, "limit"), vec!["20"]);
    }

    #[test]
    fn renders_or_tree_with_quoted_operands() {
        let (key, value) = Filter::Or(vec![
            Filter::ILike("title".into(), "pool".into()),
            Filter::ILike("city".into(), "Portland, OR".into()),
        ])
        .to_param();

        assert_eq!(key, "or");
        assert_eq!(value, r#"(title.ilike.*pool*,city.ilike."*Portland, OR*")"#);
    }

    #[test]
    fn search_text_wildcards_match_literally() {
        let params = Query::from(Table::Properties)
            .or(vec![Filter::ILike("title".into(), "a_b".into())])
            .ilike("city", "50%")
            .to_params();

        assert_eq!(param(&params, "or"), vec![r#"(title.ilike."*a\\_b*")"#]);
        assert_eq!(param(&params, "city"), vec![r"ilike.*50\%*"]);

        let (_, value) = Filter::ILike("title".into(), r"1*2\3".into()).to_param();
        assert_eq!(value, r"ilike.*1\*2\\3*");
    }

    #[test]
    fn null_equality_uses_is() {
        let (key, value) = Filter::Eq("agent_id".into(), Value::Null).to_param();
        assert_eq!((key.as_str(), value.as_str()), ("agent_id", "is.null"));
    }
}
