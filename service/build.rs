fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_path = std::path::PathBuf::from("../proto");

    println!("cargo:rerun-if-changed=../proto/gateway_lnrpc.proto");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&[proto_path.join("gateway_lnrpc.proto")], &[proto_path])?;

    Ok(())
}
