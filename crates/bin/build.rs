use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=../client/Cargo.toml");
    println!("cargo:rerun-if-changed=../client/src");
    println!("cargo:rerun-if-changed=../client/web/index.html");
    println!("cargo:rerun-if-changed=../client/web/main.js");

    if std::env::var_os("EVO_VIEW_SKIP_WASM").is_some() {
        println!("cargo:warning=EVO_VIEW_SKIP_WASM set, embedding existing web assets as-is");
        return;
    }

    println!("cargo:warning=Building WASM client...");

    // Separate target dir so the nested build does not wait on our own lock
    let status = Command::new("wasm-pack")
        .args(["build", "--target", "web", "--out-dir", "./web/pkg", "--target-dir", "../../target/wasm"])
        .current_dir("../client")
        .status();

    match status {
        Ok(status) if status.success() => {
            println!("cargo:warning=WASM client built successfully - assets will be embedded");
        }
        Ok(status) => {
            println!("cargo:warning=WASM client build failed ({status}); embedding previous assets");
        }
        Err(e) => {
            println!("cargo:warning=wasm-pack not available ({e}); the viewer page will load without its module");
        }
    }
}
