//! Win32 input-desktop query and `LockWorkStation`.
//!
//! The workstation counts as locked whenever the input desktop is anything
//! other than `Default` (e.g. `Winlogon` while the lock screen is up).

use windows::Win32::Foundation::{BOOL, HANDLE};
use windows::Win32::System::Shutdown::LockWorkStation;
use windows::Win32::System::StationsAndDesktops::{
    CloseDesktop, DESKTOP_CONTROL_FLAGS, DESKTOP_READOBJECTS, GetUserObjectInformationW,
    OpenInputDesktop, UOI_NAME,
};
use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

use crate::{HardwareError, Result};

pub(super) fn is_workstation_locked() -> bool {
    // SAFETY: plain Win32 calls; the desktop handle is closed before returning.
    unsafe {
        let desktop = match OpenInputDesktop(
            DESKTOP_CONTROL_FLAGS(0),
            BOOL::from(false),
            DESKTOP_READOBJECTS,
        ) {
            Ok(desktop) => desktop,
            // No access to the input desktop: fall back to the foreground window.
            Err(_) => return GetForegroundWindow().0.is_null(),
        };

        let mut name = [0u16; 256];
        let mut needed = 0u32;
        let result = GetUserObjectInformationW(
            HANDLE(desktop.0),
            UOI_NAME,
            Some(name.as_mut_ptr().cast()),
            std::mem::size_of_val(&name) as u32,
            Some(&mut needed),
        );
        let _ = CloseDesktop(desktop);

        if result.is_err() {
            return true;
        }

        let len = name.iter().position(|c| *c == 0).unwrap_or(name.len());
        !String::from_utf16_lossy(&name[..len]).eq_ignore_ascii_case("default")
    }
}

pub(super) fn lock_workstation() -> Result<()> {
    // SAFETY: LockWorkStation takes no arguments and only queues the request.
    unsafe { LockWorkStation() }.map_err(|e| HardwareError::lock_failed(e.to_string()))
}
