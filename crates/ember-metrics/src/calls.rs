use metrics::counter;

pub struct CallMetrics {
    ns: &'static str,
}

impl CallMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn initiated(&self) {
        counter!(format!("{}_calls_initiated_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn busy(&self) {
        counter!(format!("{}_calls_busy_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn ringing_expired(&self) {
        counter!(format!("{}_calls_ringing_expired_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn ended(&self) {
        counter!(format!("{}_calls_ended_total", self.ns)).increment(1);
    }
}
