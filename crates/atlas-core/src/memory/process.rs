use std::fmt;

use serde::{Deserialize, Serialize};

/// How to locate the game process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessSelector {
    /// Executable file name, compared case-insensitively
    Name(String),
    Pid(u32),
}

impl Default for ProcessSelector {
    fn default() -> Self {
        Self::Name(DEFAULT_PROCESS_NAME.to_string())
    }
}

impl fmt::Display for ProcessSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Pid(pid) => write!(f, "pid {}", pid),
        }
    }
}

pub const DEFAULT_PROCESS_NAME: &str = "D2R.exe";

/// Identity of an opened process, captured once per acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub base_address: u64,
    /// Size of the main module image; used to fingerprint the game build
    pub image_size: u32,
}

#[cfg(target_os = "windows")]
mod imp {
    use std::ffi::c_void;

    use tracing::debug;
    use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
    use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W,
        Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
    };

    use super::{ProcessInfo, ProcessSelector};
    use crate::error::{Error, Result};

    pub struct ProcessHandle {
        handle: HANDLE,
        pub pid: u32,
        pub base_address: u64,
        pub image_size: u32,
    }

    impl ProcessHandle {
        /// Open the process matching `selector` for reading
        pub fn open(selector: &ProcessSelector) -> Result<Self> {
            let pid = match selector {
                ProcessSelector::Pid(pid) => *pid,
                ProcessSelector::Name(name) => find_pid(name)?,
            };

            let (base_address, image_size) = main_module(pid)?;

            let handle = unsafe {
                OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, false, pid)
            }
            .map_err(|e| Error::ProcessUnavailable(format!("OpenProcess({}): {}", pid, e)))?;

            debug!(
                "Opened process {} (base: 0x{:X}, image size: 0x{:X})",
                pid, base_address, image_size
            );

            Ok(Self {
                handle,
                pid,
                base_address,
                image_size,
            })
        }

        pub fn info(&self) -> ProcessInfo {
            ProcessInfo {
                pid: self.pid,
                base_address: self.base_address,
                image_size: self.image_size,
            }
        }

        pub fn is_alive(&self) -> bool {
            let mut code = 0u32;
            match unsafe { GetExitCodeProcess(self.handle, &mut code) } {
                Ok(()) => code == STILL_ACTIVE.0 as u32,
                Err(_) => false,
            }
        }

        pub fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
            let mut read = 0usize;
            let result = unsafe {
                ReadProcessMemory(
                    self.handle,
                    address as *const c_void,
                    buffer.as_mut_ptr() as *mut c_void,
                    buffer.len(),
                    Some(&mut read),
                )
            };

            if let Err(e) = result {
                if !self.is_alive() {
                    return Err(Error::access_violation(
                        address,
                        buffer.len(),
                        "process exited",
                    ));
                }
                return Err(Error::access_violation(address, buffer.len(), e.to_string()));
            }
            if read != buffer.len() {
                return Err(Error::access_violation(
                    address,
                    buffer.len(),
                    format!("partial read ({} bytes)", read),
                ));
            }
            Ok(())
        }
    }

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            if !self.handle.is_invalid() {
                let _ = unsafe { CloseHandle(self.handle) };
            }
        }
    }

    fn find_pid(name: &str) -> Result<u32> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::ProcessUnavailable(format!("process snapshot: {}", e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        let mut next = unsafe { Process32FirstW(snapshot, &mut entry) };
        while next.is_ok() {
            let len = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
            if exe.eq_ignore_ascii_case(name) {
                found = Some(entry.th32ProcessID);
                break;
            }
            next = unsafe { Process32NextW(snapshot, &mut entry) };
        }

        let _ = unsafe { CloseHandle(snapshot) };
        found.ok_or_else(|| Error::ProcessUnavailable(format!("{} is not running", name)))
    }

    fn main_module(pid: u32) -> Result<(u64, u32)> {
        let snapshot =
            unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid) }
                .map_err(|e| Error::ProcessUnavailable(format!("module snapshot: {}", e)))?;

        let mut entry = MODULEENTRY32W {
            dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        let result = unsafe { Module32FirstW(snapshot, &mut entry) };
        let _ = unsafe { CloseHandle(snapshot) };
        result.map_err(|e| Error::ProcessUnavailable(format!("main module of {}: {}", pid, e)))?;

        Ok((entry.modBaseAddr as u64, entry.modBaseSize))
    }
}

#[cfg(not(target_os = "windows"))]
mod imp {
    use super::{ProcessInfo, ProcessSelector};
    use crate::error::{Error, Result};

    /// Placeholder handle: live process access needs the Win32 API
    pub struct ProcessHandle {
        pub pid: u32,
        pub base_address: u64,
        pub image_size: u32,
    }

    impl ProcessHandle {
        pub fn open(selector: &ProcessSelector) -> Result<Self> {
            Err(Error::ProcessUnavailable(format!(
                "cannot open {}: process memory access is only supported on Windows",
                selector
            )))
        }

        pub fn info(&self) -> ProcessInfo {
            ProcessInfo {
                pid: self.pid,
                base_address: self.base_address,
                image_size: self.image_size,
            }
        }

        pub fn is_alive(&self) -> bool {
            false
        }

        pub fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
            Err(Error::access_violation(
                address,
                buffer.len(),
                "process memory access is only supported on Windows",
            ))
        }
    }
}

pub use imp::ProcessHandle;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        assert_eq!(ProcessSelector::default().to_string(), "D2R.exe");
        assert_eq!(ProcessSelector::Pid(42).to_string(), "pid 42");
    }

    #[test]
    fn test_selector_serde() {
        let selector: ProcessSelector = serde_json::from_str(r#"{"pid": 1234}"#).unwrap();
        assert_eq!(selector, ProcessSelector::Pid(1234));
        let selector: ProcessSelector = serde_json::from_str(r#"{"name": "Game.exe"}"#).unwrap();
        assert_eq!(selector, ProcessSelector::Name("Game.exe".to_string()));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_open_unsupported_platform() {
        let err = ProcessHandle::open(&ProcessSelector::default()).err().unwrap();
        assert!(matches!(err, crate::Error::ProcessUnavailable(_)));
    }
}
