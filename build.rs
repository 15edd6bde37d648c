fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto");

    tonic_build::configure()
        .build_client(true)
        // The server stub backs the in-process fake endpoint used by tests
        .build_server(true)
        .compile(
            &["proto/google/cloud/vision/v1/image_annotator.proto"],
            &["proto"],
        )?;

    Ok(())
}
