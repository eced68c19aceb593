use sysinfo::System;
use taskherd_protocol::HealthReport;

/// Samples host-wide CPU and memory utilization for health reports.
///
/// Keeps one `System` alive between samples so CPU usage is measured as the
/// delta since the previous refresh.
pub struct HealthSampler {
    system: System,
}

impl HealthSampler {
    pub fn new() -> Self {
        HealthSampler {
            system: System::new(),
        }
    }

    pub fn sample(&mut self, tasks_running: u32) -> HealthReport {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let mem_percent = match self.system.total_memory() {
            0 => 0.0,
            total => (self.system.used_memory() as f32 / total as f32) * 100.0,
        };

        HealthReport {
            cpu_percent: self.system.global_cpu_usage(),
            mem_percent,
            tasks_running,
        }
    }
}

impl Default for HealthSampler {
    fn default() -> Self {
        Self::new()
    }
}
