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

//! The miner-to-checker message queue.
//!
//! One block per completed round, terminated by a block whose solution is the
//! exit sentinel. The Checker owns the queue (creates it with the exact
//! message size of a [`Block`]); miners open it read/write and treat a
//! missing queue as fatal — the monitor must be running before any miner
//! starts.

use std::ffi::CString;

use nix::{
    errno::Errno,
    mqueue::{mq_close, mq_open, mq_receive, mq_send, mq_unlink, MQ_OFlag, MqAttr, MqdT},
    sys::stat::Mode,
};
use thiserror::Error;

use crate::{
    blocks::{Block, BLOCK_SIZE},
    consts::{QUEUE_DEPTH, QUEUE_NAME},
};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue '{0}' does not exist (start the monitor first)")]
    NotFound(String),
    #[error("mq_open('{0}') failed: {1}")]
    Open(String, Errno),
    #[error("mq_send failed: {0}")]
    Send(Errno),
    #[error("mq_receive failed: {0}")]
    Receive(Errno),
    #[error("received a truncated block message ({0} bytes)")]
    TruncatedMessage(usize),
    #[error("mq_unlink('{0}') failed: {1}")]
    Unlink(String, Errno),
}

/// A handle on the block queue. Closed on drop; the name is removed
/// explicitly via [`BlockQueue::unlink`].
pub struct BlockQueue {
    mqd: Option<MqdT>,
}

fn queue_name() -> CString {
    CString::new(QUEUE_NAME).expect("queue name contains no NUL")
}

impl BlockQueue {
    /// Create (or reattach to) the queue for reading. Checker side.
    pub fn create_receiver() -> Result<Self, QueueError> {
        let attr = MqAttr::new(0, QUEUE_DEPTH as i64, BLOCK_SIZE as i64, 0);
        let name = queue_name();
        let mqd = mq_open(
            name.as_c_str(),
            MQ_OFlag::O_CREAT | MQ_OFlag::O_RDONLY,
            Mode::from_bits_truncate(0o666),
            Some(&attr),
        )
        .map_err(|e| QueueError::Open(QUEUE_NAME.to_string(), e))?;
        Ok(Self { mqd: Some(mqd) })
    }

    /// Open the existing queue for sending. Miner side.
    pub fn open_sender() -> Result<Self, QueueError> {
        let name = queue_name();
        let mqd = mq_open(name.as_c_str(), MQ_OFlag::O_RDWR, Mode::empty(), None).map_err(|e| match e {
            Errno::ENOENT => QueueError::NotFound(QUEUE_NAME.to_string()),
            other => QueueError::Open(QUEUE_NAME.to_string(), other),
        })?;
        Ok(Self { mqd: Some(mqd) })
    }

    fn mqd(&self) -> &MqdT {
        self.mqd.as_ref().expect("queue closed only in drop")
    }

    /// Ship one block. Blocks while the queue is full; interrupted sends are
    /// retried unconditionally so a terminator shipped during shutdown still
    /// goes out.
    pub fn send(&self, block: &Block) -> Result<(), QueueError> {
        loop {
            match mq_send(self.mqd(), block.as_bytes(), 0) {
                Ok(()) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(QueueError::Send(e)),
            }
        }
    }

    /// Receive the next block, retrying interrupted waits.
    pub fn receive(&self) -> Result<Block, QueueError> {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut priority = 0u32;
        loop {
            match mq_receive(self.mqd(), &mut buf, &mut priority) {
                Ok(n) if n == BLOCK_SIZE => {
                    return Block::read_from(&buf).ok_or(QueueError::TruncatedMessage(n))
                },
                Ok(n) => return Err(QueueError::TruncatedMessage(n)),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(QueueError::Receive(e)),
            }
        }
    }

    /// Remove the queue's name. A queue that is already gone is fine: the
    /// last miner and the Checker may both get here.
    pub fn unlink() -> Result<(), QueueError> {
        match mq_unlink(queue_name().as_c_str()) {
            Ok(()) | Err(Errno::ENOENT) => Ok(()),
            Err(e) => Err(QueueError::Unlink(QUEUE_NAME.to_string(), e)),
        }
    }
}

impl Drop for BlockQueue {
    fn drop(&mut self) {
        if let Some(mqd) = self.mqd.take() {
            let _ = mq_close(mqd);
        }
    }
}
