//! Agent version lifecycle: installing → waiting → active → redundant.
//!
//! Install precaches the manifest into the static generation; activation
//! sweeps stale generations and claims open clients. Both phases tolerate
//! storage failures: a half-missing cache degrades service, it never aborts
//! a version rollout.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::control::ControllerHandle;
use crate::net::types::{FetchedResponse, RequestDescriptor, Target};
use crate::store::{CacheStore, GenerationSet};

/// Registration state of an agent version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
  /// New version detected, precache pass in progress
  Installing,
  /// Installed, a previous version may still be active
  Waiting,
  /// Controlling clients
  Active,
  /// Replaced by a newer version; terminal
  Redundant,
}

/// State machine governing one agent version's lifetime.
pub struct LifecycleController<S: ?Sized> {
  state: AgentState,
  store: Arc<S>,
  gens: GenerationSet,
  origin: Url,
  controller: ControllerHandle,
}

impl<S: CacheStore + ?Sized> LifecycleController<S> {
  pub fn new(
    store: Arc<S>,
    gens: GenerationSet,
    origin: Url,
    controller: ControllerHandle,
  ) -> Self {
    Self {
      state: AgentState::Installing,
      store,
      gens,
      origin,
      controller,
    }
  }

  pub fn state(&self) -> AgentState {
    self.state
  }

  /// Precache the asset manifest into the static generation.
  ///
  /// Each individual asset is best-effort: a missing optional asset must not
  /// abort installation. The pass completes unconditionally and the version
  /// moves to waiting.
  pub async fn install<F, Fut>(&mut self, manifest: &[String], fetch: F)
  where
    F: Fn(RequestDescriptor) -> Fut,
    Fut: Future<Output = color_eyre::Result<FetchedResponse>>,
  {
    if self.state != AgentState::Installing {
      debug!(state = ?self.state, "install already ran, ignoring");
      return;
    }

    for path in manifest {
      let url = match self.origin.join(path) {
        Ok(url) => url,
        Err(e) => {
          warn!(path = %path, "skipping unresolvable precache path: {}", e);
          continue;
        }
      };

      let target = if path == "/" { Target::Document } else { Target::Asset };
      let req = RequestDescriptor::get(url, target);

      match fetch(req.clone()).await {
        Ok(fetched) if fetched.is_storable_basic() => {
          if let Err(e) =
            self
              .store
              .put(self.gens.static_name(), &req.cache_key(), &fetched.to_stored())
          {
            warn!(path = %path, "failed to precache asset: {}", e);
          }
        }
        Ok(fetched) => {
          debug!(path = %path, status = fetched.status, "skipping non-storable precache asset");
        }
        Err(e) => {
          warn!(path = %path, "precache fetch failed, continuing: {}", e);
        }
      }
    }

    self.state = AgentState::Waiting;
    info!(version = self.gens.version(), "install complete, waiting");
  }

  /// Enter the active state: sweep stale generations, then claim clients.
  ///
  /// A no-op unless the version is waiting; repeating it cannot run the
  /// sweep or the takeover signal twice for the same version.
  pub fn activate(&mut self) {
    if self.state != AgentState::Waiting {
      debug!(state = ?self.state, "activate ignored");
      return;
    }

    self.sweep_stale_generations();
    self.state = AgentState::Active;
    info!(version = self.gens.version(), "agent active");

    // Claim all open clients: routes in-flight sessions through this
    // version without waiting for a reload.
    self.controller.notify();
  }

  /// Handle a promotion request from the control channel. Promoting an
  /// already-active agent is a no-op.
  pub fn promote(&mut self) {
    match self.state {
      AgentState::Waiting => self.activate(),
      AgentState::Active => debug!("promotion ignored, already active"),
      state => debug!(?state, "promotion ignored"),
    }
  }

  /// A newer version took over.
  pub fn retire(&mut self) {
    self.state = AgentState::Redundant;
    info!("agent retired");
  }

  /// Delete every generation that does not belong to the current version.
  /// Failures are logged and skipped; the sweep is safe to repeat.
  fn sweep_stale_generations(&self) {
    let names = match self.store.list_generations() {
      Ok(names) => names,
      Err(e) => {
        warn!("generation sweep skipped, list failed: {}", e);
        return;
      }
    };

    for name in names {
      if self.gens.is_current(&name) {
        continue;
      }
      match self.store.delete_generation(&name) {
        Ok(()) => info!(generation = %name, "swept stale generation"),
        Err(e) => warn!(generation = %name, "failed to sweep generation: {}", e),
      }
    }
  }
}
