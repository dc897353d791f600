#[tokio::main]
async fn main() {
    if let Err(e) = subdash::run().await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
