#[tokio::main]
async fn main() -> anyhow::Result<()> {
    greengoods_cli::run().await
}
