use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tokio::time;

use crate::SqlClient;
use crate::datatype;
use crate::errors::{ChainbaseError, Result};
use crate::req::{ChainbaseClient, DEFAULT_API_ERROR, Transport};
use crate::table::{Coercion, ColumnMeta, Rows, Table};

pub const ALPHA_EXECUTE_URL: &str = "https://api.chainbase.com/api/v1/query/execute";

const ALPHA_EXECUTION_URL: &str = "https://api.chainbase.com/api/v1/execution";
const ALPHA_SUCCESS_CODE: i64 = 200;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_STATUS_CHECKS: usize = 120;

fn status_url(execution_id: &str) -> String {
    format!("{ALPHA_EXECUTION_URL}/{execution_id}/status")
}

fn results_url(execution_id: &str) -> String {
    format!("{ALPHA_EXECUTION_URL}/{execution_id}/results")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Execution {
    execution_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ExecutionStatus {
    Finished,
    Failed,
    /// PENDING, RUNNING and anything else the server may add; all mean "poll
    /// again".
    #[serde(other)]
    InProgress,
}

#[derive(Debug, Deserialize)]
struct ExecutionState {
    status: ExecutionStatus,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecutionResults {
    columns: Vec<ColumnMeta>,
    data: Vec<Vec<JsonValue>>,
}

/// Asynchronous SQL client for the execution endpoint.
///
/// A query is submitted for server-side execution, polled until it reports
/// FINISHED, then its results are fetched once. Polling sleeps 2 seconds
/// between status checks and gives up after 120 of them (~240s), both
/// adjustable.
///
/// Unlike [`ChainbaseSql`](crate::ChainbaseSql), `query_table` here returns
/// row values uncoerced alongside the typed column declarations; this
/// endpoint's row encoding is positional and the upstream behavior is to
/// leave the values as received.
#[derive(Debug)]
pub struct ChainbaseSqlAlpha<C = ChainbaseClient> {
    client: C,
    poll_interval: Duration,
    max_status_checks: usize,
}

impl ChainbaseSqlAlpha {
    pub fn try_new(api_key: &str) -> Result<Self> {
        let client =
            ChainbaseClient::builder().build(ALPHA_EXECUTE_URL, api_key, ALPHA_SUCCESS_CODE)?;
        Ok(Self::with_transport(client))
    }
}

impl<C: Transport> ChainbaseSqlAlpha<C> {
    pub fn with_transport(client: C) -> Self {
        ChainbaseSqlAlpha {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_status_checks: DEFAULT_MAX_STATUS_CHECKS,
        }
    }

    /// Pause between status checks. Defaults to 2 seconds.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Number of status checks before giving up with
    /// [`ChainbaseError::MaxRetriesReached`]. Defaults to 120.
    pub fn max_status_checks(mut self, max_status_checks: usize) -> Self {
        self.max_status_checks = max_status_checks;
        self
    }

    /// Submit the query for execution, returning its execution id.
    async fn execute(&self, sql: &str) -> Result<String> {
        let sql = sql.trim();
        let sql = sql.strip_suffix(';').unwrap_or(sql);

        let mut res = self.client.post(&json!({ "sql": sql }), None).await?;
        let data = res.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null);
        let executions: Vec<Execution> = serde_json::from_value(data)?;

        executions
            .into_iter()
            .next()
            .map(|e| e.execution_id)
            .ok_or_else(|| ChainbaseError::ApiError(DEFAULT_API_ERROR.to_string()))
    }

    /// Check whether the execution has finished. FAILED is terminal and
    /// carries the server's message.
    async fn check_status(&self, execution_id: &str) -> Result<bool> {
        let mut res = self.client.get(Some(&status_url(execution_id))).await?;
        let data = res.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null);
        let states: Vec<ExecutionState> = serde_json::from_value(data)?;

        let state = states
            .into_iter()
            .next()
            .ok_or_else(|| ChainbaseError::ApiError(DEFAULT_API_ERROR.to_string()))?;

        match state.status {
            ExecutionStatus::Failed => Err(ChainbaseError::ExecutionFailed(
                state.message.unwrap_or_default(),
            )),
            ExecutionStatus::Finished => Ok(true),
            ExecutionStatus::InProgress => Ok(false),
        }
    }

    async fn get_results(&self, execution_id: &str) -> Result<(Vec<ColumnMeta>, Vec<Vec<JsonValue>>)> {
        let mut res = self.client.get(Some(&results_url(execution_id))).await?;
        let data = res.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null);
        let results: ExecutionResults = serde_json::from_value(data)?;
        Ok((results.columns, results.data))
    }

    async fn run(&self, sql: &str) -> Result<(Vec<ColumnMeta>, Vec<Vec<JsonValue>>)> {
        let execution_id = self.execute(sql).await?;

        let mut finished = false;
        for _ in 0..self.max_status_checks {
            if self.check_status(&execution_id).await? {
                finished = true;
                break;
            }
            time::sleep(self.poll_interval).await;
        }

        if !finished {
            return Err(ChainbaseError::MaxRetriesReached);
        }

        self.get_results(&execution_id).await
    }
}

impl<C: Transport> SqlClient for ChainbaseSqlAlpha<C> {
    async fn query(&self, sql: &str) -> Result<(Vec<ColumnMeta>, Rows)> {
        let (columns, rows) = self.run(sql).await?;
        Ok((columns, Rows::Positional(rows)))
    }

    async fn query_table(&self, sql: &str) -> Result<Table> {
        let (meta, rows) = self.run(sql).await?;
        let columns = datatype::map_columns(&meta, datatype::alpha_column_type);
        Table::try_new(columns, Rows::Positional(rows), Coercion::Raw)
    }
}
