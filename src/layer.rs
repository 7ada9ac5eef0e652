use std::time::{Duration, Instant};

use crate::error::{GlimmerError, GlimmerResult};

/// How a layer participates in ordering and lifecycle.
///
/// Compositing itself is always overwrite; the kind only decides draw order
/// (BASE first) and expiry (TEMPORARY layers time out).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Base,
    Temporary,
}

impl LayerKind {
    pub fn parse(s: &str) -> GlimmerResult<Self> {
        match s {
            "BASE" => Ok(Self::Base),
            "TEMPORARY" => Ok(Self::Temporary),
            other => Err(GlimmerError::invalid_kind(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::Temporary => "TEMPORARY",
        }
    }
}

/// Wire form of a layer, as submitted by the management boundary.
///
/// `kind` stays a string here so an unknown kind is rejected with
/// `InvalidKind` at add time rather than at deserialization.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub code: String,
    pub kind: String,
    #[serde(default)]
    pub priority: i64,
    /// Seconds until a TEMPORARY layer expires, measured from its own add
    /// time. Zero or negative means never.
    #[serde(default)]
    pub timeout_secs: f64,
}

impl LayerSpec {
    pub fn validate(&self) -> GlimmerResult<()> {
        if self.name.is_empty() {
            return Err(GlimmerError::validation("layer name must be non-empty"));
        }
        LayerKind::parse(&self.kind)?;
        Ok(())
    }
}

/// A registered layer: one named, prioritized unit of script logic.
#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub code: String,
    pub kind: LayerKind,
    pub priority: i64,
    pub timeout: Option<Duration>,
    pub added_at: Instant,
    /// Insertion sequence, preserved across in-place updates. Defines
    /// snapshot order and therefore the tie order among equal priorities.
    pub(crate) seq: u64,
}

impl Layer {
    pub(crate) fn from_spec(spec: LayerSpec, added_at: Instant, seq: u64) -> GlimmerResult<Self> {
        spec.validate()?;
        let kind = LayerKind::parse(&spec.kind)?;
        let timeout = if spec.timeout_secs > 0.0 {
            Some(Duration::from_secs_f64(spec.timeout_secs))
        } else {
            None
        };
        Ok(Self {
            name: spec.name,
            code: spec.code,
            kind,
            priority: spec.priority,
            timeout,
            added_at,
            seq,
        })
    }

    /// Whether this layer has outlived its timeout at `now`.
    pub fn expired(&self, now: Instant) -> bool {
        match (self.kind, self.timeout) {
            (LayerKind::Temporary, Some(timeout)) => {
                now.saturating_duration_since(self.added_at) > timeout
            }
            _ => false,
        }
    }
}

/// Read-only time context handed to a layer's script for one tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    /// Seconds since the pipeline started.
    pub pipeline_elapsed: f64,
    /// Seconds since this layer was added.
    pub layer_elapsed: f64,
}
