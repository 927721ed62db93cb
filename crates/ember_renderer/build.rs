// Build script for linking Embree library
//
// Only runs when the `embree` feature is enabled. The extern block links
// embree4 itself; this adds search paths for vcpkg or manual installs.
// Install via: vcpkg install embree[geometry-triangle]:x64-windows

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");
    println!("cargo:rerun-if-env-changed=EMBREE_DIR");

    if std::env::var_os("CARGO_FEATURE_EMBREE").is_none() {
        return;
    }

    if let Ok(vcpkg_root) = std::env::var("VCPKG_ROOT") {
        let lib_path = std::path::Path::new(&vcpkg_root)
            .join("installed")
            .join("x64-windows")
            .join("lib");
        println!("cargo:rustc-link-search=native={}", lib_path.display());
    }

    if let Ok(embree_dir) = std::env::var("EMBREE_DIR") {
        let lib_path = std::path::Path::new(&embree_dir).join("lib");
        println!("cargo:rustc-link-search=native={}", lib_path.display());
    }
}
