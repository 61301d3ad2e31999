//! Process scheduling priority changes.

use crate::core::process_monitor::PriorityClass;
use crate::error::{ProcwatchError, Result};

/// Apply `class` to `pid` using the platform's priority mechanism.
#[cfg(unix)]
pub fn set_priority(pid: u32, class: PriorityClass) -> Result<()> {
    // SAFETY: setpriority takes plain integers and touches no caller memory.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, class.nice_value()) };

    if rc == 0 {
        Ok(())
    } else {
        Err(os_error(pid, std::io::Error::last_os_error()))
    }
}

#[cfg(unix)]
fn os_error(pid: u32, err: std::io::Error) -> ProcwatchError {
    match err.raw_os_error() {
        Some(libc::ESRCH) => ProcwatchError::ProcessNotFound(pid),
        Some(libc::EPERM) | Some(libc::EACCES) => {
            ProcwatchError::permission_denied(format!("cannot change priority of pid {}", pid))
        }
        _ => ProcwatchError::Io(err),
    }
}

#[cfg(windows)]
pub fn set_priority(pid: u32, class: PriorityClass) -> Result<()> {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{
        OpenProcess, SetPriorityClass, ABOVE_NORMAL_PRIORITY_CLASS, BELOW_NORMAL_PRIORITY_CLASS,
        HIGH_PRIORITY_CLASS, IDLE_PRIORITY_CLASS, NORMAL_PRIORITY_CLASS,
        PROCESS_SET_INFORMATION, REALTIME_PRIORITY_CLASS,
    };

    let flag = match class {
        PriorityClass::Idle => IDLE_PRIORITY_CLASS,
        PriorityClass::BelowNormal => BELOW_NORMAL_PRIORITY_CLASS,
        PriorityClass::Normal => NORMAL_PRIORITY_CLASS,
        PriorityClass::AboveNormal => ABOVE_NORMAL_PRIORITY_CLASS,
        PriorityClass::High => HIGH_PRIORITY_CLASS,
        PriorityClass::RealTime => REALTIME_PRIORITY_CLASS,
    };

    // SAFETY: the handle is checked before use and closed on every path.
    unsafe {
        let handle = OpenProcess(PROCESS_SET_INFORMATION, 0, pid);
        if handle.is_null() {
            return Err(ProcwatchError::permission_denied(format!(
                "cannot open pid {}: {}",
                pid,
                std::io::Error::last_os_error()
            )));
        }

        let ok = SetPriorityClass(handle, flag);
        let err = std::io::Error::last_os_error();
        CloseHandle(handle);

        if ok == 0 {
            return Err(ProcwatchError::Io(err));
        }
    }

    Ok(())
}

#[cfg(not(any(unix, windows)))]
pub fn set_priority(pid: u32, _class: PriorityClass) -> Result<()> {
    Err(ProcwatchError::other(format!(
        "priority changes are not supported on this platform (pid {})",
        pid
    )))
}
