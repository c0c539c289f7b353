/// Source of the amount of memory the process may still allocate.
pub trait MemoryProbe: Send + Sync {
    /// Available memory in bytes, `None` when it cannot be determined.
    fn available_memory(&self) -> Option<u64>;

    /// Whether `bytes` can reasonably be allocated right now.
    fn can_allocate(&self, bytes: u64) -> bool {
        self.available_memory()
            .is_some_and(|available| available >= bytes)
    }
}

/// Queries the operating system.
///
/// On Linux this reads `MemAvailable` from `/proc/meminfo`. Elsewhere, or if
/// that fails, [`MemoryProbe::can_allocate`] falls back to a trial
/// reservation of the requested size.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemory;

impl SystemMemory {
    #[cfg(target_os = "linux")]
    fn read_meminfo() -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_mem_available(&meminfo)
    }

    #[cfg(not(target_os = "linux"))]
    fn read_meminfo() -> Option<u64> {
        None
    }
}

impl MemoryProbe for SystemMemory {
    fn available_memory(&self) -> Option<u64> {
        Self::read_meminfo()
    }

    fn can_allocate(&self, bytes: u64) -> bool {
        match self.available_memory() {
            Some(available) => available >= bytes,
            None => usize::try_from(bytes)
                .is_ok_and(|bytes| Vec::<u8>::new().try_reserve_exact(bytes).is_ok()),
        }
    }
}

/// A fixed amount of memory, for tests and constrained deployments.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemory(pub u64);

impl MemoryProbe for FixedMemory {
    fn available_memory(&self) -> Option<u64> {
        Some(self.0)
    }
}

/// `MemAvailable:   12345 kB` -> bytes
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))?;
    let mut fields = line.split_whitespace().skip(1);
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") => value.checked_mul(1024),
        None => Some(value),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mem_available() {
        let meminfo = "MemTotal:       16314372 kB\nMemFree:         1012340 kB\nMemAvailable:    8123456 kB\n";
        assert_eq!(Some(8_123_456 * 1024), parse_mem_available(meminfo));
        assert_eq!(None, parse_mem_available("MemTotal: 1 kB\n"));
    }

    #[test]
    fn test_fixed_memory() {
        assert!(FixedMemory(10_000_000).can_allocate(10_000_000));
        assert!(!FixedMemory(9_999_999).can_allocate(10_000_000));
    }
}
