use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    encoding_cli::main_entry().await
}
