use crate::collectors::{CollectError, Collector};
use crate::state::Snapshot;
use std::collections::BTreeMap;
use std::time::SystemTime;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};

pub struct SystemCollector {
    system: System,
}

impl SystemCollector {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for SystemCollector {
    fn sample(&mut self) -> Result<Snapshot, CollectError> {
        let system = &mut self.system;
        system.refresh_cpu();
        system.refresh_memory();
        system.refresh_disks_list();
        system.refresh_disks();

        let machine_id = system.host_name().unwrap_or_else(|| "unknown".to_string());
        let os_name = system.name().unwrap_or_else(|| "unknown".to_string());
        let os_version = system.os_version().unwrap_or_else(|| "unknown".to_string());

        let cpu_percent = if system.cpus().is_empty() {
            0.0
        } else {
            let sum: f32 = system.cpus().iter().map(|c| c.cpu_usage()).sum();
            round1((sum / system.cpus().len() as f32) as f64)
        };

        let memory_total = system.total_memory() as f64;
        let memory_used = system.used_memory() as f64;
        let memory_available = system.available_memory() as f64;
        let memory_free = system.free_memory() as f64;
        let memory_percent = if memory_total > 0.0 {
            round1(memory_used / memory_total * 100.0)
        } else {
            0.0
        };

        let mut memory = BTreeMap::new();
        memory.insert("total".to_string(), memory_total);
        memory.insert("used".to_string(), memory_used);
        memory.insert("available".to_string(), memory_available);
        memory.insert("free".to_string(), memory_free);
        memory.insert("percent".to_string(), memory_percent);

        // Снимается корневой раздел; если его не видно, берём самый большой.
        let root = system
            .disks()
            .iter()
            .find(|d| d.mount_point().to_string_lossy() == "/")
            .or_else(|| {
                system
                    .disks()
                    .iter()
                    .max_by_key(|d| d.total_space())
            })
            .ok_or(CollectError::NoRootDisk)?;

        let disk_total = root.total_space() as f64;
        let disk_free = root.available_space() as f64;
        let disk_used = (root.total_space().saturating_sub(root.available_space())) as f64;
        let disk_percent = if disk_total > 0.0 {
            round1(disk_used / disk_total * 100.0)
        } else {
            0.0
        };

        let mut disk = BTreeMap::new();
        disk.insert("total".to_string(), disk_total);
        disk.insert("used".to_string(), disk_used);
        disk.insert("free".to_string(), disk_free);
        disk.insert("percent".to_string(), disk_percent);

        Ok(Snapshot {
            machine_id,
            os_name,
            os_version,
            cpu_percent,
            memory,
            disk,
            captured_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn sample_produces_consistent_snapshot() {
        let mut collector = SystemCollector::new();
        let snapshot = match collector.sample() {
            Ok(snapshot) => snapshot,
            // контейнеры без смонтированных дисков
            Err(CollectError::NoRootDisk) => return,
        };

        assert!(!snapshot.machine_id.is_empty());
        assert!((0.0..=100.0).contains(&snapshot.cpu_percent));
        for key in ["total", "used", "available", "free", "percent"] {
            assert!(snapshot.memory.contains_key(key), "нет поля памяти {key}");
        }
        for key in ["total", "used", "free", "percent"] {
            assert!(snapshot.disk.contains_key(key), "нет поля диска {key}");
        }
        assert!(snapshot.memory["used"] <= snapshot.memory["total"]);
        assert!(snapshot.disk["used"] <= snapshot.disk["total"]);
        assert!(humantime::parse_rfc3339(&snapshot.captured_at).is_ok());
    }
}
