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

//! In-process round trips of the IPC primitives against the real kernel
//! objects. Region names are unique per test run so concurrent test
//! invocations cannot collide.

use paydirt_core::{
    blocks::Block,
    ipc::{sem::Semaphore, shm::RegionError, BlockQueue, SharedRegion},
    shutdown::ShutdownSignal,
};

#[repr(C)]
struct TestRegion {
    counter: u64,
    gate: Semaphore,
}

#[test]
fn region_create_attach_and_unlink() {
    let name = format!("/paydirt_test_region_{}", std::process::id());
    let region = SharedRegion::<TestRegion>::create_exclusive(&name).unwrap();
    assert_eq!(region.name(), name);

    // The creation race is settled by O_EXCL.
    match SharedRegion::<TestRegion>::create_exclusive(&name) {
        Err(RegionError::AlreadyExists(n)) => assert_eq!(n, name),
        other => panic!("expected AlreadyExists, got {:?}", other.map(|r| r.name().to_string())),
    }

    let attached = SharedRegion::<TestRegion>::open_existing(&name).unwrap();
    unsafe { std::ptr::write_volatile(std::ptr::addr_of_mut!((*region.as_ptr()).counter), 42) };
    let seen =
        unsafe { std::ptr::read_volatile(std::ptr::addr_of!((*attached.as_ptr()).counter)) };
    assert_eq!(seen, 42);

    SharedRegion::<TestRegion>::unlink(&name).unwrap();
    // A second unlink is tolerated: two processes may both be "last out".
    SharedRegion::<TestRegion>::unlink(&name).unwrap();

    // The existing mappings stay usable after the name is gone.
    let seen = unsafe { std::ptr::read_volatile(std::ptr::addr_of!((*region.as_ptr()).counter)) };
    assert_eq!(seen, 42);
}

#[test]
fn semaphore_token_discipline() {
    let name = format!("/paydirt_test_sem_{}", std::process::id());
    let region = SharedRegion::<TestRegion>::create_exclusive(&name).unwrap();
    let gate = unsafe { &(*region.as_ptr()).gate };
    unsafe { gate.init(1) }.unwrap();

    let shutdown = ShutdownSignal::new();
    assert!(gate.wait(&shutdown));
    // Token taken, nothing left.
    assert!(!gate.try_wait());
    assert!(gate.post());
    assert!(gate.try_wait());
    assert!(gate.post());

    unsafe { gate.destroy() };
    SharedRegion::<TestRegion>::unlink(&name).unwrap();
}

#[test]
fn queue_round_trips_blocks_and_the_terminator() {
    let receiver = BlockQueue::create_receiver().unwrap();
    let sender = BlockQueue::open_sender().unwrap();

    let mut block = Block::seed();
    block.solution = 1234;
    block.winner = 7;
    sender.send(&block).unwrap();
    sender.send(&Block::terminator()).unwrap();

    assert_eq!(receiver.receive().unwrap(), block);
    assert!(receiver.receive().unwrap().is_terminator());

    BlockQueue::unlink().unwrap();
    // Both the last miner and the Checker may unlink; the second is a no-op.
    BlockQueue::unlink().unwrap();
}
