//! Query command implementation.

use super::QueryArgs;
use resorm_codec::Value;
use resorm_transport::{MockTransport, Transport};
use std::sync::Arc;

/// Prints the endpoint and query parameters a fetch would send.
pub fn run(args: &QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    let collection = args.collection(&transport)?;

    println!("GET {}", collection.url(args.append.as_deref()));
    let params = Value::Map(collection.query_params());
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
