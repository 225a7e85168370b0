#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Optional namespace prefix, e.g. "ember".
    pub namespace: &'static str,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { namespace: "ember" }
    }
}
