#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_service::run().await
}
