//! Regenerates `src/generated.rs` from `proto/provider.proto`.
//!
//! The generated module is committed, so a normal build needs no `protoc`.
//! After editing the proto, run `cargo build --features regenerate-proto`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "regenerate-proto")]
    {
        let out_dir = std::path::PathBuf::from("src");
        tonic_prost_build::configure()
            .build_server(true)
            .build_client(false)
            .out_dir(&out_dir)
            .compile_protos(&["proto/provider.proto"], &["proto"])?;

        let generated = out_dir.join("coolify.provider.v1.rs");
        if generated.exists() {
            std::fs::rename(generated, out_dir.join("generated.rs"))?;
        }
    }

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
