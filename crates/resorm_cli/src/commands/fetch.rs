//! Fetch command implementation.

use super::{CliError, ConnectionArgs, QueryArgs};
use resorm_codec::{Payload, Value};
use resorm_transport::{HttpTransport, ReqwestClient, Transport, TransportConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fetches one page of the collection and prints it as JSON.
pub fn run(args: &QueryArgs, connection: &ConnectionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = TransportConfig::new(connection.base_url.clone())
        .with_version(connection.api_version.clone())
        .with_timeout(Duration::from_secs(connection.timeout));
    if let Some(token) = &connection.token {
        config = config.with_token(token.clone());
    }

    let http = HttpTransport::new(config, ReqwestClient::new());
    http.set_on_error_handler(|response| {
        warn!(code = %response.error_code(), error = %response.error(), "API error");
    });
    let transport: Arc<dyn Transport> = Arc::new(http);
    let mut collection = args.collection(&transport)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let response = runtime.block_on(collection.fetch(args.append.as_deref(), Payload::new()))?;
    if !response.is_successful() {
        return Err(CliError::RequestFailed {
            code: response.error_code().to_string(),
            text: response.error().to_string(),
        }
        .into());
    }
    info!(rows = collection.len(), total = collection.total_count(), "fetched");

    let mut output = Payload::new();
    output.insert(collection.table().to_string(), collection.to_json()?);
    output.insert("count".to_string(), Value::from(collection.total_count()));
    println!("{}", serde_json::to_string_pretty(&Value::Map(output))?);
    Ok(())
}
