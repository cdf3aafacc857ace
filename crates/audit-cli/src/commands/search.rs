//! Search command implementation.

use audit_client::{SearchInput, SessionOptions};

use super::connect;
use crate::output::{format_json, format_table_row, print_table_header};
use crate::ServiceArgs;

pub async fn run(
    service: ServiceArgs,
    query: String,
    limit: Option<u32>,
    max_results: Option<u32>,
    all: bool,
    verify: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = connect(service, SessionOptions::default().verify_proofs(verify))?;

    let input = SearchInput {
        limit,
        max_results,
        verbose: verify.then_some(true),
        ..SearchInput::new(query)
    };
    let output = if all {
        client.search_all(&input).await?
    } else {
        client.search(&input).await?
    };

    if json_output {
        println!("{}", format_json(&serde_json::to_value(&output)?));
        return Ok(());
    }

    print_table_header();
    for event in &output.events {
        println!("{}", format_table_row(event));
    }
    println!("{} of {} events", output.events.len(), output.count);
    Ok(())
}
