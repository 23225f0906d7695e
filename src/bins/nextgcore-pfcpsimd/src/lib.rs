//! NextGCore PFCP Simulator
//!
//! Control-plane (SMF/SGW-C) side of N4 for driving a UPF under test:
//! association setup with heartbeat supervision, session establishment,
//! modification and deletion, and builders for the PDR/FAR/QER/URR rules
//! those sessions carry.
//!
//! ```no_run
//! use nextgcore_pfcpsimd::{PfcpClient, PfcpSimConfig};
//!
//! # async fn run() -> nextgcore_pfcpsimd::SimResult<()> {
//! let client = PfcpClient::new(PfcpSimConfig::default());
//! client.connect().await?;
//! client.setup_association().await?;
//! assert!(client.is_association_alive());
//! client.teardown_association().await?;
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod id_alloc;
pub mod pfcp_path;
pub mod pfcp_sm;
pub mod rules;
pub mod session;
pub mod sim;

#[cfg(test)]
mod property_tests;

pub use config::PfcpSimConfig;
pub use context::{PfcpClient, Session, SessionRegistry};
pub use error::{PfcpSimError, RuleError, SimResult};
pub use pfcp_sm::AssociationState;
pub use session::SessionRules;

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Poisoned locks are recovered rather than propagated.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn read<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(rwlock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
