//! Dispatcher - Entry Point
//!
//! Outbound message delivery and retry engine.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dispatcher::run().await
}
