use denotify_core::config::{AssetPolicy, OutputFormat};

/// Parse output format from string
pub fn parse_output_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Parse asset policy from string
pub fn parse_asset_policy(s: &str) -> std::result::Result<AssetPolicy, String> {
    s.parse::<AssetPolicy>().map_err(|e| e.to_string())
}
