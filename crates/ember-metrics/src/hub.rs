use metrics::{counter, histogram};

pub struct HubMetrics {
    ns: &'static str,
}

impl HubMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn conn_registered(&self) {
        counter!(format!("{}_hub_connections_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn conn_closed(&self, reason: &'static str) {
        counter!(format!("{}_hub_connections_closed_total", self.ns), "reason" => reason).increment(1);
    }

    #[inline]
    pub fn intent_rx(&self, op: &'static str) {
        counter!(format!("{}_hub_intent_rx_total", self.ns), "op" => op).increment(1);
    }

    #[inline]
    pub fn event_tx(&self, op: &'static str) {
        counter!(format!("{}_hub_event_tx_total", self.ns), "op" => op).increment(1);
    }

    #[inline]
    pub fn outbound_queue_overflow(&self) {
        counter!(format!("{}_hub_outbound_overflow_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn fanout_seconds(&self, seconds: f64) {
        histogram!(format!("{}_hub_fanout_seconds", self.ns)).record(seconds);
    }
}
