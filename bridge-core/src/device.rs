//! Inference device selection.
//!
//! Detection order mirrors the usual accelerator preference: CUDA, then
//! Metal, then CPU. Availability is decided at compile time through the
//! `cuda`/`metal` features; the default build ships CPU-only engines, so an
//! explicit accelerator request falls back with a warning instead of
//! failing startup.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cuda,
    Metal,
    Cpu,
}

impl DeviceKind {
    pub fn is_cpu(&self) -> bool {
        matches!(self, DeviceKind::Cpu)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cuda => "cuda",
            DeviceKind::Metal => "metal",
            DeviceKind::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-start device request, parsed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    Auto,
    Cuda,
    Metal,
    Cpu,
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DevicePreference::Auto),
            "cuda" => Ok(DevicePreference::Cuda),
            "metal" | "mps" => Ok(DevicePreference::Metal),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!(
                "unknown device '{}' (expected auto, cuda, metal or cpu)",
                other
            )),
        }
    }
}

/// Resolve a preference to the device the engines will actually run on.
/// An unavailable explicit choice logs a warning and falls back to
/// detection rather than failing startup.
pub fn resolve(preference: DevicePreference) -> DeviceKind {
    match preference {
        DevicePreference::Auto => detect(),
        DevicePreference::Cpu => DeviceKind::Cpu,
        DevicePreference::Cuda => {
            if cuda_available() {
                DeviceKind::Cuda
            } else {
                log::warn!("CUDA requested but not available in this build; falling back");
                detect()
            }
        }
        DevicePreference::Metal => {
            if metal_available() {
                DeviceKind::Metal
            } else {
                log::warn!("Metal requested but not available in this build; falling back");
                detect()
            }
        }
    }
}

fn detect() -> DeviceKind {
    if cuda_available() {
        DeviceKind::Cuda
    } else if metal_available() {
        DeviceKind::Metal
    } else {
        DeviceKind::Cpu
    }
}

fn cuda_available() -> bool {
    cfg!(feature = "cuda")
}

fn metal_available() -> bool {
    cfg!(all(feature = "metal", target_os = "macos"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_parsing() {
        assert_eq!("auto".parse(), Ok(DevicePreference::Auto));
        assert_eq!("cuda".parse(), Ok(DevicePreference::Cuda));
        assert_eq!("metal".parse(), Ok(DevicePreference::Metal));
        assert_eq!("mps".parse(), Ok(DevicePreference::Metal));
        assert_eq!("cpu".parse(), Ok(DevicePreference::Cpu));
        assert!("gpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_explicit_cpu_is_honored() {
        assert_eq!(resolve(DevicePreference::Cpu), DeviceKind::Cpu);
    }

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn test_default_build_resolves_to_cpu() {
        assert_eq!(resolve(DevicePreference::Auto), DeviceKind::Cpu);
        assert_eq!(resolve(DevicePreference::Cuda), DeviceKind::Cpu);
        assert_eq!(resolve(DevicePreference::Metal), DeviceKind::Cpu);
    }

    #[test]
    fn test_device_names() {
        assert_eq!(DeviceKind::Cuda.to_string(), "cuda");
        assert_eq!(DeviceKind::Metal.to_string(), "metal");
        assert_eq!(DeviceKind::Cpu.to_string(), "cpu");
        assert!(DeviceKind::Cpu.is_cpu());
    }
}
