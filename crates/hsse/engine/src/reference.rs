//! Human-facing reference codes: `<PREFIX>-<YYYY>-<NNNNN>`

use crate::config::ReferenceConfig;
use hsse_types::EventType;

#[derive(Clone, Debug)]
pub struct ReferenceFormatter {
    observation_prefix: String,
    incident_prefix: String,
}

impl ReferenceFormatter {
    pub fn new(config: &ReferenceConfig) -> Self {
        Self {
            observation_prefix: config.observation_prefix.clone(),
            incident_prefix: config.incident_prefix.clone(),
        }
    }

    pub fn prefix(&self, event_type: EventType) -> &str {
        match event_type {
            EventType::Observation => &self.observation_prefix,
            EventType::Incident => &self.incident_prefix,
        }
    }

    pub fn format(&self, event_type: EventType, year: i32, sequence: u64) -> String {
        format!("{}-{}-{:05}", self.prefix(event_type), year, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_zero_padded_per_type() {
        let formatter = ReferenceFormatter::new(&ReferenceConfig::default());
        assert_eq!(formatter.format(EventType::Observation, 2026, 7), "OBS-2026-00007");
        assert_eq!(formatter.format(EventType::Incident, 2026, 123456), "INC-2026-123456");
    }
}
