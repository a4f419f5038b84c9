// Copyright 2025. The Paydirt Project
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! A typed mapping of a POSIX shared-memory object.
//!
//! `create_exclusive` vs `open_existing` is how the first miner wins the
//! initializer role: `O_CREAT | O_EXCL` makes the creation race atomic, and
//! the loser attaches instead. Unlinking is explicit and separate from
//! unmapping — the last process out removes the name, everyone unmaps on
//! drop.

use std::{marker::PhantomData, num::NonZeroUsize, ptr::NonNull};

use nix::{
    errno::Errno,
    fcntl::OFlag,
    sys::{
        mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags},
        stat::Mode,
    },
    unistd::ftruncate,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("shm region '{0}' already exists")]
    AlreadyExists(String),
    #[error("shm_open('{0}') failed: {1}")]
    Open(String, Errno),
    #[error("ftruncate('{0}') failed: {1}")]
    Truncate(String, Errno),
    #[error("mmap('{0}') failed: {1}")]
    Map(String, Errno),
    #[error("shm_unlink('{0}') failed: {1}")]
    Unlink(String, Errno),
    #[error("semaphore init failed: {0}")]
    SemaphoreInit(Errno),
}

/// An owned mapping of a shared-memory object holding exactly one `T`.
///
/// The mapping is shared and writable; the object's contents are mutated by
/// several processes at once, so all access goes through raw pointers. Fields
/// guarded by one of the region's semaphores may be read and written through
/// plain references inside the critical section; lock-free polls must use
/// volatile reads.
pub struct SharedRegion<T> {
    ptr: NonNull<T>,
    name: String,
    _marker: PhantomData<T>,
}

impl<T> SharedRegion<T> {
    /// Atomically create the region, sized for one `T`, and map it. Fails
    /// with [`RegionError::AlreadyExists`] when another process got there
    /// first — the caller then attaches with [`open_existing`].
    ///
    /// [`open_existing`]: SharedRegion::open_existing
    pub fn create_exclusive(name: &str) -> Result<Self, RegionError> {
        let oflag = OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR;
        let mode = Mode::S_IRUSR | Mode::S_IWUSR;
        let fd = shm_open(name, oflag, mode).map_err(|e| match e {
            Errno::EEXIST => RegionError::AlreadyExists(name.to_string()),
            other => RegionError::Open(name.to_string(), other),
        })?;
        if let Err(e) = ftruncate(&fd, std::mem::size_of::<T>() as i64) {
            let _ = shm_unlink(name);
            return Err(RegionError::Truncate(name.to_string(), e));
        }
        match Self::map(name, &fd) {
            Ok(region) => Ok(region),
            Err(e) => {
                let _ = shm_unlink(name);
                Err(e)
            },
        }
    }

    /// Map a region some other process already created.
    pub fn open_existing(name: &str) -> Result<Self, RegionError> {
        let fd = shm_open(name, OFlag::O_RDWR, Mode::S_IRUSR | Mode::S_IWUSR)
            .map_err(|e| RegionError::Open(name.to_string(), e))?;
        Self::map(name, &fd)
    }

    fn map(name: &str, fd: &std::os::fd::OwnedFd) -> Result<Self, RegionError> {
        let len = NonZeroUsize::new(std::mem::size_of::<T>())
            .expect("region types are never zero-sized");
        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )
        }
        .map_err(|e| RegionError::Map(name.to_string(), e))?;
        Ok(Self {
            ptr: ptr.cast(),
            name: name.to_string(),
            _marker: PhantomData,
        })
    }

    /// Remove the region's name. Mappings stay valid until unmapped.
    pub fn unlink(name: &str) -> Result<(), RegionError> {
        match shm_unlink(name) {
            Ok(()) | Err(Errno::ENOENT) => Ok(()),
            Err(e) => Err(RegionError::Unlink(name.to_string(), e)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Shared view of the region. Safe for fields with interior mutability
    /// (the semaphores) and for reads serialized by those semaphores.
    ///
    /// # Safety
    /// The caller must not use the reference to observe fields another
    /// process may be writing outside the locking discipline.
    pub unsafe fn as_ref(&self) -> &T {
        self.ptr.as_ref()
    }
}

impl<T> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        let len = std::mem::size_of::<T>();
        if let Err(e) = unsafe { munmap(self.ptr.cast(), len) } {
            log::warn!(target: "paydirt::core::shm", "munmap('{}') failed: {}", self.name, e);
        }
    }
}
