fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "builder"))]
    {
        eprintln!("Error: This binary requires the 'builder' feature.");
        eprintln!("Build with: cargo run --release --bin build-catalog --features builder -- data/cities.json");
        std::process::exit(1);
    }

    #[cfg(feature = "builder")]
    {
        use nearcity::builder::Builder;

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();

        let output_path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| "cities.json".to_string());

        let builder = match std::env::var("GEONAMES_URL") {
            Ok(url) => Builder::with_url(url),
            Err(_) => Builder::new(),
        };
        builder.build(std::path::Path::new(&output_path))?;

        println!("Catalog written to: {output_path}");
        Ok(())
    }
}
