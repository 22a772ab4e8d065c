use std::env;

fn main() {
    // Tauri build script (desktop shell only)
    #[cfg(feature = "desktop")]
    tauri_build::build();

    let desktop = env::var("CARGO_FEATURE_DESKTOP").is_ok();
    if !desktop {
        println!("cargo:warning=Building core library only (desktop feature not enabled)");
        println!("cargo:warning=Use '--features desktop' to build the Tauri shell with microphone capture");
    }
}
