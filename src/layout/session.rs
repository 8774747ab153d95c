//! Process-wide ONNX Runtime session management.
//!
//! Session construction pays the full model-load cost, so sessions are
//! created lazily, keyed by model path, and reused for every subsequent
//! page and run. Inference calls are serialized behind a per-session mutex;
//! the pipeline itself is sequential, so contention only arises across
//! concurrent runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::Session;
use tracing::info;

use crate::core::errors::{Result, TranslateError};

static SESSIONS: Lazy<Mutex<HashMap<PathBuf, Arc<LayoutSession>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// A cached inference session plus the metadata needed to feed it.
#[derive(Debug)]
pub struct LayoutSession {
    session: Mutex<Session>,
    input_name: String,
}

impl LayoutSession {
    /// Name of the model's first input.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Runs inference with exclusive access to the underlying session.
    pub fn run<T>(&self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| TranslateError::InferenceFailed {
                message: "inference session poisoned".to_string(),
            })?;
        f(&mut session)
    }
}

/// Returns the shared session for `model_path`, creating it on first use.
pub fn session_for(model_path: &Path) -> Result<Arc<LayoutSession>> {
    let key = model_path.to_path_buf();

    let mut cache = SESSIONS
        .lock()
        .map_err(|_| TranslateError::InferenceFailed {
            message: "session cache poisoned".to_string(),
        })?;

    if let Some(existing) = cache.get(&key) {
        return Ok(existing.clone());
    }

    if !model_path.is_file() {
        return Err(TranslateError::asset(
            model_path.display().to_string(),
            "layout model file not found",
        ));
    }

    info!("Loading layout model from {}", model_path.display());
    let session = Session::builder()?
        .with_execution_providers([CPUExecutionProvider::default().build()])?
        .commit_from_file(model_path)?;

    let input_name = session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .ok_or_else(|| TranslateError::InferenceFailed {
            message: "layout model declares no inputs".to_string(),
        })?;
    info!("Layout model ready (input '{input_name}')");

    let shared = Arc::new(LayoutSession {
        session: Mutex::new(session),
        input_name,
    });
    cache.insert(key, shared.clone());
    Ok(shared)
}
