#[tokio::main]
async fn main() {
    let args = std::env::args().skip(1).collect();
    if let Err(e) = classic_discovery_bridge_lib::run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
