use tonic_build::manual::{Builder, Method, Service};

// Messages are declared by hand in `src/api/proto.rs`; only the service
// plumbing is generated here, which keeps protoc out of the build.
// The wire contract lives in `proto/*.proto`.
fn main() {
    let rates = Service::builder()
        .name("RatesService")
        .package("rates")
        .method(
            Method::builder()
                .name("get_rates")
                .route_name("GetRates")
                .input_type("crate::api::proto::GetRatesRequest")
                .output_type("crate::api::proto::GetRatesResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    let health = Service::builder()
        .name("Health")
        .package("health")
        .method(
            Method::builder()
                .name("check")
                .route_name("Check")
                .input_type("crate::api::proto::HealthCheckRequest")
                .output_type("crate::api::proto::HealthCheckResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    Builder::new().compile(&[rates, health]);

    println!("cargo:rerun-if-changed=proto");
    println!("cargo:rerun-if-changed=migrations");
}
