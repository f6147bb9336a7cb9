#[tokio::main]
async fn main() {
    if let Err(e) = clinic_lib::run().await {
        tracing::error!("Fatal: {e}");
        eprintln!("clinic-server: {e}");
        std::process::exit(1);
    }
}
