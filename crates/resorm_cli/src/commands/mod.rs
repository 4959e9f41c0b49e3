//! CLI command implementations and shared arguments.

pub mod fetch;
pub mod query;

use clap::Args;
use resorm_codec::{FilterOperator, Value, DEFAULT_PER_PAGE};
use resorm_core::{Collection, FilterScope, RecordInfo};
use resorm_transport::Transport;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while turning arguments into a query.
#[derive(Error, Debug)]
pub enum CliError {
    /// A predicate is not `field[:OP]=value`.
    #[error("invalid predicate '{0}', expected field[:OP]=value")]
    InvalidPredicate(String),

    /// A predicate names an operator that does not exist.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// The remote API reported a failure.
    #[error("request failed: [{code}] {text}")]
    RequestFailed {
        /// Error code from the response envelope.
        code: String,
        /// Error text from the response envelope.
        text: String,
    },
}

/// Arguments describing a collection query.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Table to query
    #[arg(short, long)]
    pub table: String,

    /// Namespace prefix of the list endpoint
    #[arg(short, long, default_value = "")]
    pub namespace: String,

    /// Transient filter, as field[:OP]=value (repeatable)
    #[arg(short = 'w', long = "where", value_name = "PREDICATE")]
    pub predicates: Vec<String>,

    /// Persistent filter, as field[:OP]=value (repeatable)
    #[arg(long = "persistent", value_name = "PREDICATE")]
    pub persistent: Vec<String>,

    /// Sort column, as column[:desc] (repeatable)
    #[arg(short, long, value_name = "COLUMN")]
    pub sort: Vec<String>,

    /// Rows to skip
    #[arg(long)]
    pub skip: Option<u64>,

    /// Rows to return
    #[arg(long)]
    pub take: Option<u64>,

    /// 1-based page, overrides --skip and --take
    #[arg(long)]
    pub page: Option<u64>,

    /// Page size used with --page
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: u64,

    /// Trailing segment appended to the list endpoint
    #[arg(long)]
    pub append: Option<String>,
}

/// Arguments describing the remote API.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Base endpoint of the API
    #[arg(long, env = "RESORM_BASE_URL")]
    pub base_url: String,

    /// Version prefix inserted after the base endpoint
    #[arg(long, env = "RESORM_API_VERSION", default_value = "")]
    pub api_version: String,

    /// Bearer token
    #[arg(long, env = "RESORM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl QueryArgs {
    /// Builds a collection over `transport` with every query option applied.
    pub fn collection(&self, transport: &Arc<dyn Transport>) -> Result<Collection, CliError> {
        let name = self.table.strip_suffix('s').unwrap_or(&self.table);
        let record = RecordInfo::builder(name)
            .table(self.table.clone())
            .namespace(self.namespace.clone())
            .dynamic()
            .build();
        let mut collection = record.collection(transport);

        for (predicates, scope) in [
            (&self.persistent, FilterScope::Persistent),
            (&self.predicates, FilterScope::Transient),
        ] {
            for predicate in predicates {
                let (field, operator, value) = parse_predicate(predicate)?;
                collection.where_clause(&field, operator, value, scope);
            }
        }
        for column in &self.sort {
            let (column, desc) = parse_sort(column);
            collection.sort_by(column, desc);
        }

        match self.page {
            Some(page) => {
                collection.for_page(page, self.per_page);
            }
            None => {
                collection
                    .skip(self.skip.unwrap_or_default())
                    .take(self.take.unwrap_or_default());
            }
        }
        Ok(collection)
    }
}

/// Parses `field[:OP]=value`.
pub fn parse_predicate(
    predicate: &str,
) -> Result<(String, Option<FilterOperator>, Value), CliError> {
    let (lhs, value) = predicate
        .split_once('=')
        .ok_or_else(|| CliError::InvalidPredicate(predicate.to_string()))?;
    let (field, operator) = match lhs.split_once(':') {
        Some((field, token)) => {
            let operator = FilterOperator::from_token(token)
                .ok_or_else(|| CliError::UnknownOperator(token.to_string()))?;
            (field, Some(operator))
        }
        None => (lhs, None),
    };
    if field.is_empty() {
        return Err(CliError::InvalidPredicate(predicate.to_string()));
    }
    Ok((field.to_string(), operator, parse_value(value)))
}

/// Integers, floats and booleans are typed; anything else stays text.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        Value::Integer(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::from(raw)
    }
}

/// Parses `column[:desc]`.
pub fn parse_sort(column: &str) -> (&str, bool) {
    match column.rsplit_once(':') {
        Some((column, direction)) if direction.eq_ignore_ascii_case("desc") => (column, true),
        Some((column, direction)) if direction.eq_ignore_ascii_case("asc") => (column, false),
        _ => (column, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use resorm_transport::MockTransport;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        query: QueryArgs,
    }

    fn collection(args: &[&str]) -> Collection {
        let cli = TestCli::parse_from(std::iter::once("resorm").chain(args.iter().copied()));
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        cli.query.collection(&transport).unwrap()
    }

    #[test]
    fn predicates() {
        assert_eq!(
            parse_predicate("age:gte=18").unwrap(),
            ("age".to_string(), Some(FilterOperator::GreaterThanOrEquals), Value::Integer(18))
        );
        assert_eq!(
            parse_predicate("name=bob").unwrap(),
            ("name".to_string(), None, Value::from("bob"))
        );
        assert_eq!(
            parse_predicate("id:IN=1,2,3").unwrap().2,
            Value::from("1,2,3")
        );
        assert!(matches!(parse_predicate("name"), Err(CliError::InvalidPredicate(_))));
        assert!(matches!(parse_predicate("=1"), Err(CliError::InvalidPredicate(_))));
        assert!(matches!(parse_predicate("age:LIKE=1"), Err(CliError::UnknownOperator(_))));
    }

    #[test]
    fn sort_columns() {
        assert_eq!(parse_sort("name"), ("name", false));
        assert_eq!(parse_sort("age:desc"), ("age", true));
        assert_eq!(parse_sort("age:ASC"), ("age", false));
    }

    #[test]
    fn arguments_build_the_query() {
        let c = collection(&[
            "--table", "users",
            "--namespace", "admin",
            "--where", "age:gt=20",
            "--where", "status=active",
            "--persistent", "status=archived",
            "--sort", "name",
            "--sort", "age:desc",
            "--page", "3",
        ]);
        let params = c.query_params();

        assert_eq!(c.url(None), "admin/users");
        assert_eq!(params["status"], Value::from("active"));
        assert_eq!(params["age-GT"], Value::Integer(20));
        assert_eq!(params["limit"], Value::from("30,15"));
        assert_eq!(params["sort-by"], Value::from("name,ASC;age,DESC"));
    }

    #[test]
    fn skip_and_take() {
        let c = collection(&["--table", "posts", "--skip", "5", "--take", "10"]);
        assert_eq!(c.query_params()["limit"], Value::from("5,10"));
        assert_eq!(c.record().name(), "post");
    }
}
