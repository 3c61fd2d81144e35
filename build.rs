use std::env;
use std::path::{Path, PathBuf};

fn main() {
    // For iOS/macOS targets, link against system frameworks
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("apple") {
        println!("cargo:rustc-link-lib=framework=Foundation");
        println!("cargo:rustc-link-lib=framework=Security");
    }

    // Copy the header next to the built library so the host project can pick it up
    let header_src = "include/field_capture_core.h";
    println!("cargo:rerun-if-changed={}", header_src);

    let target_dir = env::var("OUT_DIR")
        .ok()
        .map(PathBuf::from)
        .and_then(|out| out.ancestors().nth(3).map(Path::to_path_buf));

    if let (Some(target_dir), true) = (target_dir, Path::new(header_src).exists()) {
        if let Err(e) = std::fs::copy(header_src, target_dir.join("field_capture_core.h")) {
            println!("cargo:warning=Failed to copy header file: {}", e);
        }
    }

    println!("cargo:rerun-if-changed=migrations/");
}
