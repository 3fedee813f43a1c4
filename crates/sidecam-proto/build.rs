fn main() {
    tonic_build::configure()
        .compile_protos(
            &["proto/side_camera_image_service.proto"],
            &["proto/"],
        )
        .expect("Failed to compile proto files");
}
