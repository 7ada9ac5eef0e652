use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::{GlimmerError, GlimmerResult};
use crate::layer::{Layer, LayerKind, LayerSpec};

/// Concurrent registry of named layers.
///
/// One mutex covers every mutation, including the render thread's per-tick
/// snapshot+evict step, so the management boundary and the scheduler never
/// interleave inside an operation. External readers only ever get copies.
#[derive(Debug, Default)]
pub struct LayerStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    layers: HashMap<String, Layer>,
    next_seq: u64,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, or replace the layer with the same name in place.
    ///
    /// Enforces the singleton-BASE invariant: adding a BASE layer deletes
    /// every other BASE entry in the same critical section. A same-name
    /// non-TEMPORARY add inherits the existing `added_at` (and insertion
    /// order); a TEMPORARY add always restarts its clock at `now`.
    pub fn add(&self, spec: LayerSpec) -> GlimmerResult<()> {
        self.add_at(spec, Instant::now())
    }

    /// `add` with an explicit clock, so callers driving simulated time can
    /// control `added_at`.
    pub fn add_at(&self, spec: LayerSpec, now: Instant) -> GlimmerResult<()> {
        let mut inner = self.inner.lock().expect("layer store poisoned");
        let seq = inner.next_seq;
        let mut layer = Layer::from_spec(spec, now, seq)?;

        if layer.kind == LayerKind::Base {
            inner
                .layers
                .retain(|name, l| l.kind != LayerKind::Base || *name == layer.name);
        }

        if let Some(existing) = inner.layers.get(&layer.name) {
            layer.seq = existing.seq;
            if layer.kind != LayerKind::Temporary {
                layer.added_at = existing.added_at;
            }
        } else {
            inner.next_seq += 1;
        }

        tracing::info!(name = %layer.name, kind = layer.kind.as_str(), "layer added");
        inner.layers.insert(layer.name.clone(), layer);
        Ok(())
    }

    /// Remove a layer by name. Fails with `NotFound` if absent.
    pub fn remove(&self, name: &str) -> GlimmerResult<()> {
        let mut inner = self.inner.lock().expect("layer store poisoned");
        if inner.layers.remove(name).is_none() {
            return Err(GlimmerError::not_found(name));
        }
        tracing::info!(name = %name, "layer removed");
        Ok(())
    }

    /// Point-in-time copy of all layers in insertion order.
    pub fn snapshot(&self) -> Vec<Layer> {
        let inner = self.inner.lock().expect("layer store poisoned");
        let mut layers: Vec<Layer> = inner.layers.values().cloned().collect();
        layers.sort_by_key(|l| l.seq);
        layers
    }

    /// The scheduler's per-tick step: evict expired TEMPORARY layers and
    /// return the survivors in render order, all under one lock.
    ///
    /// Render order: the BASE layer (at most one) first, then ascending
    /// priority; equal priorities keep insertion order (stable sort).
    pub fn active_layers(&self, now: Instant) -> Vec<Layer> {
        let mut inner = self.inner.lock().expect("layer store poisoned");
        inner.layers.retain(|name, layer| {
            let keep = !layer.expired(now);
            if !keep {
                tracing::info!(name = %name, "temporary layer expired, evicting");
            }
            keep
        });

        let mut layers: Vec<Layer> = inner.layers.values().cloned().collect();
        layers.sort_by_key(|l| l.seq);
        layers.sort_by_key(|l| (l.kind != LayerKind::Base, l.priority));
        layers
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("layer store poisoned").layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("layer store poisoned")
            .layers
            .contains_key(name)
    }
}
