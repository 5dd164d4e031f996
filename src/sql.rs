use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use tokio::time;

use crate::SqlClient;
use crate::datatype;
use crate::errors::{ChainbaseError, Result};
use crate::req::{ChainbaseClient, Transport};
use crate::table::{Coercion, ColumnMeta, Rows, Table};

pub const DW_QUERY_URL: &str = "https://api.chainbase.online/v1/dw/query";

const DW_SUCCESS_CODE: i64 = 0;
const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// One page of a data warehouse query result.
#[derive(Debug, Deserialize)]
struct DwPage {
    meta: Vec<ColumnMeta>,
    result: Vec<Map<String, JsonValue>>,

    /// Page cursor for the follow-up request. The server signals completion
    /// by omitting it (or sending a zero/empty value).
    #[serde(default)]
    next_page: Option<JsonValue>,

    #[serde(default)]
    task_id: Option<JsonValue>,
}

/// Synchronous paginated SQL client for the data warehouse endpoint.
///
/// A single submission may span multiple pages; `query` follows the page
/// cursor until the server stops returning one, accumulating rows along the
/// way. There is no page ceiling unless [`max_pages`](Self::max_pages) sets
/// one, matching the endpoint's own behavior of always terminating the
/// cursor.
#[derive(Debug)]
pub struct ChainbaseSql<C = ChainbaseClient> {
    client: C,
    page_delay: Duration,
    max_pages: Option<usize>,
}

impl ChainbaseSql {
    pub fn try_new(api_key: &str) -> Result<Self> {
        let client = ChainbaseClient::builder().build(DW_QUERY_URL, api_key, DW_SUCCESS_CODE)?;
        Ok(Self::with_transport(client))
    }
}

impl<C: Transport> ChainbaseSql<C> {
    pub fn with_transport(client: C) -> Self {
        ChainbaseSql {
            client,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: None,
        }
    }

    /// Pause between page fetches. Defaults to 1 second.
    pub fn page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Cap the number of pages fetched for one query. Unbounded by default;
    /// exceeding the cap fails with [`ChainbaseError::PageLimitExceeded`].
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    async fn run(&self, sql: &str) -> Result<(Vec<ColumnMeta>, Vec<Map<String, JsonValue>>)> {
        let mut body = json!({ "query": sql });
        let mut rows = Vec::new();
        let mut pages = 0;

        loop {
            let mut res = self.client.post(&body, None).await?;
            let data = res.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null);
            let page: DwPage = serde_json::from_value(data)?;

            rows.extend(page.result);
            pages += 1;

            let next_page = match page.next_page {
                Some(v) if !is_empty_cursor(&v) => v,
                _ => return Ok((page.meta, rows)),
            };

            if let Some(max) = self.max_pages {
                if pages >= max {
                    return Err(ChainbaseError::PageLimitExceeded(max));
                }
            }

            // Rate-limit courtesy between page fetches.
            time::sleep(self.page_delay).await;

            body = json!({
                "task_id": page.task_id,
                "page": next_page,
            });
        }
    }
}

/// The cursor is opaque to us; zero and empty values mean "no further pages"
/// just like a missing field does.
fn is_empty_cursor(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
    }
}

impl<C: Transport> SqlClient for ChainbaseSql<C> {
    async fn query(&self, sql: &str) -> Result<(Vec<ColumnMeta>, Rows)> {
        let (meta, rows) = self.run(sql).await?;
        Ok((meta, Rows::Named(rows)))
    }

    async fn query_table(&self, sql: &str) -> Result<Table> {
        let (meta, rows) = self.run(sql).await?;
        let columns = datatype::map_columns(&meta, datatype::dw_column_type);
        Table::try_new(columns, Rows::Named(rows), Coercion::Typed)
    }
}
