// Binary entry point for sf_mcp
// Thin wrapper around the library implementation

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = sf_mcp::shell::run().await {
        eprintln!("sf_mcp fatal error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
