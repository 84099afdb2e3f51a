fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "gpu")]
    {
        use spirv_builder::{MetadataPrintout, SpirvBuilder};

        SpirvBuilder::new("shader", "spirv-unknown-spv1.5")
            .print_metadata(MetadataPrintout::Full)
            .build()?;
    }
    Ok(())
}
