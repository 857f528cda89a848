//! codeforge CLI binary: all logic lives in the library; main.rs only
//! drives the async runtime and maps the result to a process exit code.

#[tokio::main]
async fn main() {
    let code = codeforge::cli::run().await;
    std::process::exit(code);
}
