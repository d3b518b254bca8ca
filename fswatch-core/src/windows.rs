#![allow(missing_docs)]
//! `Watcher` implementation on top of Windows' `ReadDirectoryChangesW`.
//!
//! One dedicated thread per watched root blocks in a synchronous
//! `ReadDirectoryChangesW` call; closing the directory handle from
//! `unwatch()` unblocks it with `ERROR_OPERATION_ABORTED` and the thread
//! exits.
//!
//! [reference]: https://learn.microsoft.com/en-us/windows/win32/api/winbase/nf-winbase-readdirectorychangesw

use crate::{Config, EventHandler, RecursiveMode, Watcher, WatcherKind};
use fswatch_types::{ChangeKind, Error, RawEvent, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::mem;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Mutex};
use std::thread;
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadDirectoryChangesW, FILE_ACTION_ADDED, FILE_ACTION_MODIFIED,
    FILE_ACTION_REMOVED, FILE_ACTION_RENAMED_NEW_NAME, FILE_ACTION_RENAMED_OLD_NAME,
    FILE_FLAG_BACKUP_SEMANTICS, FILE_LIST_DIRECTORY, FILE_NOTIFY_CHANGE_ATTRIBUTES,
    FILE_NOTIFY_CHANGE_CREATION, FILE_NOTIFY_CHANGE_DIR_NAME, FILE_NOTIFY_CHANGE_FILE_NAME,
    FILE_NOTIFY_CHANGE_LAST_WRITE, FILE_NOTIFY_CHANGE_SIZE, FILE_NOTIFY_INFORMATION,
    FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

const BUF_SIZE: usize = 64 * 1024;

fn notify_filter() -> u32 {
    FILE_NOTIFY_CHANGE_FILE_NAME
        | FILE_NOTIFY_CHANGE_DIR_NAME
        | FILE_NOTIFY_CHANGE_ATTRIBUTES
        | FILE_NOTIFY_CHANGE_SIZE
        | FILE_NOTIFY_CHANGE_LAST_WRITE
        | FILE_NOTIFY_CHANGE_CREATION
}

fn to_wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(Some(0)).collect()
}

struct WatchedRoot {
    handle: HANDLE,
}

unsafe impl Send for WatchedRoot {}

/// Native Windows backend, backed by `ReadDirectoryChangesW`.
pub struct ReadDirectoryChangesWatcher {
    roots: Arc<Mutex<HashMap<PathBuf, WatchedRoot>>>,
    handler: Arc<Mutex<dyn EventHandler>>,
}

impl ReadDirectoryChangesWatcher {
    fn spawn_reader(dir: PathBuf, handle: HANDLE, recursive: bool, handler: Arc<Mutex<dyn EventHandler>>) {
        thread::spawn(move || {
            let mut buffer = vec![0u8; BUF_SIZE];
            loop {
                let mut bytes_returned: u32 = 0;
                let ok = unsafe {
                    ReadDirectoryChangesW(
                        handle,
                        buffer.as_mut_ptr() as *mut _,
                        buffer.len() as u32,
                        recursive as i32,
                        notify_filter(),
                        &mut bytes_returned,
                        ptr::null_mut(),
                        None,
                    )
                };
                if ok == 0 {
                    // handle closed by unwatch(), or the watch failed.
                    return;
                }
                if bytes_returned == 0 {
                    continue;
                }

                let mut offset = 0usize;
                loop {
                    let entry = unsafe {
                        &*(buffer.as_ptr().add(offset) as *const FILE_NOTIFY_INFORMATION)
                    };
                    // NextEntryOffset, Action and FileNameLength are each a
                    // u32; FileName starts right after them.
                    const FILE_NAME_OFFSET: usize = 3 * mem::size_of::<u32>();
                    let name_len_bytes = entry.FileNameLength as usize;
                    let name_ptr = unsafe {
                        (buffer.as_ptr().add(offset) as *const u8).add(FILE_NAME_OFFSET) as *const u16
                    };
                    let wide = unsafe {
                        std::slice::from_raw_parts(name_ptr, name_len_bytes / 2)
                    };
                    let name = OsString::from_wide(wide);
                    let full_path = dir.join(name);

                    if let Some(kind) = classify(entry.Action) {
                        let mut guard = handler.lock().unwrap_or_else(|e| e.into_inner());
                        guard.handle_event(Ok(RawEvent::new(kind, full_path)));
                    }

                    if entry.NextEntryOffset == 0 {
                        break;
                    }
                    offset += entry.NextEntryOffset as usize;
                }
            }
        });
    }
}

fn classify(action: u32) -> Option<ChangeKind> {
    match action {
        FILE_ACTION_ADDED | FILE_ACTION_RENAMED_NEW_NAME => Some(ChangeKind::Added),
        FILE_ACTION_REMOVED | FILE_ACTION_RENAMED_OLD_NAME => Some(ChangeKind::Deleted),
        FILE_ACTION_MODIFIED => Some(ChangeKind::Modified),
        _ => None,
    }
}

impl Watcher for ReadDirectoryChangesWatcher {
    fn new<F: EventHandler>(event_handler: F, _config: Config) -> Result<Self> {
        let handler: Arc<Mutex<dyn EventHandler>> = Arc::new(Mutex::new(event_handler));
        Ok(ReadDirectoryChangesWatcher {
            roots: Arc::new(Mutex::new(HashMap::new())),
            handler,
        })
    }

    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        if !path.exists() {
            return Err(Error::path_not_found(path.to_path_buf()));
        }
        let wide = to_wide(path);
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                FILE_LIST_DIRECTORY,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS,
                0,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(Error::from(std::io::Error::last_os_error()).add_path(path.to_path_buf()));
        }

        self.roots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), WatchedRoot { handle });

        Self::spawn_reader(
            path.to_path_buf(),
            handle,
            recursive_mode.is_recursive(),
            self.handler.clone(),
        );
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        let root = self
            .roots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path)
            .ok_or_else(|| Error::path_not_found(path.to_path_buf()))?;
        unsafe {
            CloseHandle(root.handle);
        }
        Ok(())
    }

    fn kind() -> WatcherKind {
        WatcherKind::ReadDirectoryChangesWatcher
    }
}

impl std::fmt::Debug for ReadDirectoryChangesWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadDirectoryChangesWatcher").finish_non_exhaustive()
    }
}
