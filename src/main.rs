#[tokio::main]
async fn main() {
    let code = docwright::run().await;
    std::process::exit(code.as_i32());
}
