// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/dissonor.h` to $OUT_DIR.
//
// Either way, consumers can include the header from:
//   - <repo>/dissonor-ffi/include/dissonor.h  (checked-in)
//   - $OUT_DIR/dissonor.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/dissonor.h");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=dissonor-ffi: cargo did not set CARGO_MANIFEST_DIR/OUT_DIR; skipping header");
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let header_repo = crate_dir.join("include").join("dissonor.h");
    let header_out = PathBuf::from(out_dir).join("dissonor.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let generated = Command::new("cbindgen")
            .args(["--crate", "dissonor-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if generated {
            println!("cargo:warning=dissonor-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=dissonor-ffi: cbindgen failed; falling back to checked-in header");
    }

    if let Err(e) = fs::copy(&header_repo, &header_out) {
        println!("cargo:warning=dissonor-ffi: could not copy {}: {e}", header_repo.display());
    }
}
