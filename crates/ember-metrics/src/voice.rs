use metrics::{counter, histogram};

pub struct VoiceMetrics {
    ns: &'static str,
}

impl VoiceMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn join(&self) {
        counter!(format!("{}_voice_joins_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn leave(&self) {
        counter!(format!("{}_voice_leaves_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn capacity_exceeded(&self) {
        counter!(format!("{}_voice_capacity_exceeded_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn sfu_mint_seconds(&self, seconds: f64) {
        histogram!(format!("{}_voice_sfu_mint_seconds", self.ns)).record(seconds);
    }

    #[inline]
    pub fn sfu_mint_failed(&self) {
        counter!(format!("{}_voice_sfu_mint_failed_total", self.ns)).increment(1);
    }
}
