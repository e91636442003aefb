use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// One reading of a process's resident memory and CPU
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    pub rss_bytes: u64,
    /// Percentage points, may exceed 100 on multi-core machines
    pub cpu_percent: f64,
}

/// Source of resource readings for the harness and its children
pub trait ResourceSampler {
    /// The benchmarking process itself
    fn sample_self(&mut self) -> ResourceSample;

    /// A running child; `None` once it has exited or cannot be read
    fn sample_pid(&mut self, pid: u32) -> Option<ResourceSample>;
}

/// `sysinfo`-backed sampler, refreshing only the processes it is asked about
pub struct SysinfoSampler {
    system: System,
    own_pid: Option<Pid>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            own_pid: sysinfo::get_current_pid().ok(),
        }
    }

    fn read(&mut self, pid: Pid) -> Option<ResourceSample> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        self.system.process(pid).map(|p| ResourceSample {
            rss_bytes: p.memory(),
            cpu_percent: f64::from(p.cpu_usage()),
        })
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample_self(&mut self) -> ResourceSample {
        match self.own_pid {
            Some(pid) => self.read(pid).unwrap_or_default(),
            None => ResourceSample::default(),
        }
    }

    fn sample_pid(&mut self, pid: u32) -> Option<ResourceSample> {
        self.read(Pid::from_u32(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_self_reports_memory() {
        let mut sampler = SysinfoSampler::new();
        let sample = sampler.sample_self();
        assert!(sample.rss_bytes > 0);
        assert!(sample.cpu_percent >= 0.0);
    }

    #[test]
    fn test_unknown_pid_is_none() {
        let mut sampler = SysinfoSampler::new();
        assert_eq!(sampler.sample_pid(u32::MAX - 1), None);
    }
}
