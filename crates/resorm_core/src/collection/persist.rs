//! Remote operations on a collection.

use super::Collection;
use crate::entity::Entity;
use crate::error::ModelResult;
use resorm_codec::{Payload, Value};
use resorm_transport::ApiResponse;
use tracing::{debug, warn};

/// Key of the total row count in a list response.
const COUNT_KEY: &str = "count";

impl Collection {
    /// Fetches a page of rows and replaces the items with them.
    ///
    /// The query is [`query_params`](Self::query_params) merged with
    /// `extra` (extra wins). On success the items are replaced by the
    /// table-keyed rows and the total count is taken from the response. On
    /// failure items and total count are left untouched. Transient filters
    /// are cleared either way.
    pub async fn fetch(&mut self, append: Option<&str>, extra: Payload) -> ModelResult<ApiResponse> {
        self.is_loading = true;
        let response = self.send_query(append, extra).await;
        let applied = if response.is_successful() {
            self.apply_rows(&response)
        } else {
            Ok(())
        };
        self.transient_filters.clear();
        self.is_loading = false;
        applied.map(|()| response)
    }

    /// Runs the same query as [`fetch`](Self::fetch) without touching the
    /// items or the total count.
    pub async fn fetch_without_loading(
        &mut self,
        append: Option<&str>,
        extra: Payload,
    ) -> ModelResult<ApiResponse> {
        self.is_loading = true;
        let response = self.send_query(append, extra).await;
        self.transient_filters.clear();
        self.is_loading = false;
        Ok(response)
    }

    async fn send_query(&self, append: Option<&str>, extra: Payload) -> ApiResponse {
        let endpoint = self.url(append);
        let mut params = self.query_params();
        params.extend(extra);
        debug!(table = %self.table(), endpoint = %endpoint, params = params.len(), "fetching collection");
        self.transport.get(&endpoint, params).await
    }

    fn apply_rows(&mut self, response: &ApiResponse) -> ModelResult<()> {
        self.load(response.data(self.record.table()).unwrap_or(&Value::Null))?;
        self.total_count = response
            .data(COUNT_KEY)
            .and_then(Value::coerce_u64)
            .unwrap_or_default();
        Ok(())
    }

    /// Stamps the persistent attributes onto `item` and saves it.
    pub async fn save(&self, item: &mut Entity) -> ModelResult<ApiResponse> {
        self.stamp(item)?;
        item.save().await
    }

    /// Sends the changes of every item in one PATCH to the list endpoint.
    ///
    /// The body maps each changed item's primary key to its diff. If the
    /// request fails every item is rolled back to its snapshot. On success
    /// each returned row is loaded into the item with the same primary key;
    /// items absent from the response keep their local state.
    pub async fn update(&mut self) -> ModelResult<ApiResponse> {
        let mut diff = Payload::new();
        for item in &self.items {
            if item.has_changed() {
                let key = item.primary_key_value()?.to_param_string();
                diff.insert(key, Value::Map(item.changed_attributes()?));
            }
        }

        let endpoint = self.url(None);
        debug!(table = %self.table(), endpoint = %endpoint, changed = diff.len(), "bulk update");
        self.is_loading = true;
        let response = self.transport.patch(&endpoint, diff).await;
        let applied = self.apply_update(&response);
        self.is_loading = false;
        applied.map(|()| response)
    }

    fn apply_update(&mut self, response: &ApiResponse) -> ModelResult<()> {
        if !response.is_successful() {
            warn!(
                table = %self.table(),
                error = %response.error(),
                "bulk update failed, rolling back"
            );
            for item in &mut self.items {
                item.restore_snapshot();
            }
            return Ok(());
        }

        let Some(rows) = response.data(self.record.table()).and_then(Value::as_array) else {
            return Ok(());
        };
        let primary_key = self.record.primary_key_memory().to_string();
        for row in rows {
            let Some(key) = row.get(self.record.primary_key()) else {
                continue;
            };
            if let Some(item) = self.find_by_mut(&primary_key, key.clone()) {
                item.load(row)?;
            }
        }
        Ok(())
    }
}
