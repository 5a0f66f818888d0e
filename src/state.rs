use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub machine_id: String,
    pub os_name: String,
    pub os_version: String,
    pub cpu_percent: f64,
    pub memory: BTreeMap<String, f64>,
    pub disk: BTreeMap<String, f64>,
    pub captured_at: String,
}

impl Snapshot {
    // captured_at отличается у каждой пары снимков, поэтому в сравнение не входит.
    pub fn differs_from(&self, previous: &Snapshot) -> bool {
        self.machine_id != previous.machine_id
            || self.os_name != previous.os_name
            || self.os_version != previous.os_version
            || self.cpu_percent != previous.cpu_percent
            || self.memory != previous.memory
            || self.disk != previous.disk
    }
}

pub fn has_changed(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    match previous {
        None => true,
        Some(prev) => current.differs_from(prev),
    }
}
