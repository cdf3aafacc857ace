//! Root command implementation.

use audit_client::SessionOptions;

use super::connect;
use crate::output::format_json;
use crate::ServiceArgs;

pub async fn run(service: ServiceArgs, tree_size: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let client = connect(service, SessionOptions::default())?;
    let root = client.root(tree_size).await?;
    println!("{}", format_json(&serde_json::to_value(&root)?));
    Ok(())
}
