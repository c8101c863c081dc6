//! Top-level runtime wiring.
//!
//! The runtime owns every process-wide service: the engine handle, the VM
//! engine, the context manager, the feature stores, the verifier, the
//! finder, and the detector rules. Services are created at startup and
//! reached through explicit handles, never ambient globals; dropping the
//! runtime after [`Runtime::shutdown`] releases everything.

use std::sync::Arc;

use crate::context::{ContextManager, LlmConfig, ManagerConfig};
use crate::detector::DetectorRules;
use crate::engine::BrowserEngine;
use crate::stores::Stores;
use crate::verify::{Finder, StaticFinder, Verifier};
use crate::vm::VmEngine;

/// The assembled control core.
pub struct Runtime {
    engine: Arc<dyn BrowserEngine>,
    vm: Arc<VmEngine>,
    stores: Arc<Stores>,
    manager: Arc<ContextManager>,
    verifier: Verifier,
    finder: Arc<dyn Finder>,
    detector: DetectorRules,
    llm: Option<LlmConfig>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("llm", &self.llm)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Start building a runtime over an engine.
    pub fn builder(engine: Arc<dyn BrowserEngine>) -> RuntimeBuilder {
        RuntimeBuilder {
            engine,
            config: ManagerConfig::default(),
            verifier: Verifier::default(),
            finder: None,
            detector: None,
            llm: None,
        }
    }

    pub fn engine(&self) -> &Arc<dyn BrowserEngine> {
        &self.engine
    }

    pub fn vm(&self) -> &Arc<VmEngine> {
        &self.vm
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    pub fn manager(&self) -> &Arc<ContextManager> {
        &self.manager
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn finder(&self) -> &Arc<dyn Finder> {
        &self.finder
    }

    pub fn detector(&self) -> &DetectorRules {
        &self.detector
    }

    /// Process-level LLM collaborator configuration, if any.
    pub fn llm(&self) -> Option<&LlmConfig> {
        self.llm.as_ref()
    }

    /// Drain and release everything.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    engine: Arc<dyn BrowserEngine>,
    config: ManagerConfig,
    verifier: Verifier,
    finder: Option<Arc<dyn Finder>>,
    detector: Option<DetectorRules>,
    llm: Option<LlmConfig>,
}

impl RuntimeBuilder {
    /// Override manager caps and timings.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override verifier timing windows.
    pub fn verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Install a natural-language finder (the default resolves nothing).
    pub fn finder(mut self, finder: Arc<dyn Finder>) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Override detector rules.
    pub fn detector(mut self, detector: DetectorRules) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Configure the process-level LLM collaborator.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Assemble the runtime and start the background cleanup task.
    pub fn build(self) -> Arc<Runtime> {
        let vm = Arc::new(VmEngine::new());
        let stores = Arc::new(Stores::new());
        let manager = ContextManager::new(
            self.engine.clone(),
            vm.clone(),
            stores.clone(),
            self.config,
        );
        manager.start_cleanup();
        Arc::new(Runtime {
            engine: self.engine,
            vm,
            stores,
            manager,
            verifier: self.verifier,
            finder: self.finder.unwrap_or_else(|| Arc::new(StaticFinder::new())),
            detector: self.detector.unwrap_or_default(),
            llm: self.llm,
        })
    }
}
