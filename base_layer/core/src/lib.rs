pub mod blocks;
pub mod consts;
pub mod exit_codes;
pub mod ipc;
pub mod logging;
pub mod proof_of_work;
pub mod shutdown;
