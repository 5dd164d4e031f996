//! Client for the Chainbase data cloud SQL APIs.
//!
//! Two query protocols are supported, both speaking authenticated JSON over
//! HTTP:
//!
//! - [`ChainbaseSql`]: the data warehouse endpoint. One submission, results
//!   returned synchronously across one or more pages.
//! - [`ChainbaseSqlAlpha`]: the execution endpoint. Submit, poll the
//!   execution's status, then fetch results once it finishes.
//!
//! Both implement [`SqlClient`] and produce a [`Table`]: ordered, typed
//! columns plus row data, with remote column types mapped onto the
//! [`ColumnType`] vocabulary.
//!
//! [`Chainbase`] bundles one client per protocol behind a single credential:
//!
//! ```ignore
//! let client = Chainbase::try_new(None)?; // key from CHAINBASE_API_KEY
//! let table = client
//!     .sql
//!     .query_table("SELECT number, hash FROM ethereum.blocks LIMIT 10")
//!     .await?;
//! ```

pub use crate::datatype::ColumnType;
pub use crate::errors::{ChainbaseError, Result};
pub use crate::req::{ChainbaseClient, ChainbaseClientBuilder, Transport};
pub use crate::sql::ChainbaseSql;
pub use crate::sql_alpha::ChainbaseSqlAlpha;
pub use crate::table::{Coercion, Column, ColumnMeta, Rows, Table, Value};

pub mod datatype;
pub mod errors;
pub mod table;

mod req;
mod sql;
mod sql_alpha;

#[cfg(test)]
pub(crate) mod testutil;

/// Environment variable consulted for the API key when none is given
/// explicitly.
pub const API_KEY_ENV_VAR: &str = "CHAINBASE_API_KEY";

/// Common capability of the two dialect clients.
#[allow(async_fn_in_trait)]
pub trait SqlClient {
    /// Execute SQL and return the raw column metadata and rows.
    async fn query(&self, sql: &str) -> Result<(Vec<ColumnMeta>, Rows)>;

    /// Execute SQL and assemble a typed [`Table`] from the result.
    async fn query_table(&self, sql: &str) -> Result<Table>;
}

/// Top-level client holding one query client per protocol, sharing a single
/// credential.
#[derive(Debug)]
pub struct Chainbase {
    pub sql: ChainbaseSql,
    pub sql_alpha: ChainbaseSqlAlpha,
}

impl Chainbase {
    /// Create a client with the given API key, falling back to the
    /// [`API_KEY_ENV_VAR`] environment variable.
    ///
    /// Fails with [`ChainbaseError::MissingApiKey`] before any network
    /// activity if neither source provides a key.
    pub fn try_new(api_key: Option<String>) -> Result<Self> {
        let api_key = resolve_api_key(api_key, std::env::var(API_KEY_ENV_VAR).ok())?;
        Ok(Chainbase {
            sql: ChainbaseSql::try_new(&api_key)?,
            sql_alpha: ChainbaseSqlAlpha::try_new(&api_key)?,
        })
    }
}

fn resolve_api_key(explicit: Option<String>, from_env: Option<String>) -> Result<String> {
    explicit
        .filter(|key| !key.is_empty())
        .or(from_env)
        .filter(|key| !key.is_empty())
        .ok_or(ChainbaseError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        let key = resolve_api_key(Some("abc".to_string()), Some("env".to_string())).unwrap();
        assert_eq!(key, "abc");
    }

    #[test]
    fn env_key_satisfies_construction() {
        let key = resolve_api_key(None, Some("env".to_string())).unwrap();
        assert_eq!(key, "env");
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = resolve_api_key(None, None).unwrap_err();
        assert!(matches!(err, ChainbaseError::MissingApiKey));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let err = resolve_api_key(Some(String::new()), None).unwrap_err();
        assert!(matches!(err, ChainbaseError::MissingApiKey));
    }

    #[test]
    fn empty_explicit_key_falls_back_to_env() {
        let key = resolve_api_key(Some(String::new()), Some("env".to_string())).unwrap();
        assert_eq!(key, "env");
    }
}
