//! Device-wide sampler state cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{GpuBackend, NativeHandle};
use crate::error::GraphicsError;
use crate::types::SamplerStateDescriptor;

/// A native sampler object shared by every texture with the same descriptor.
#[derive(Debug, PartialEq, Eq)]
pub struct SamplerState {
    handle: NativeHandle,
    descriptor: SamplerStateDescriptor,
}

impl SamplerState {
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &SamplerStateDescriptor {
        &self.descriptor
    }
}

/// Maps descriptors to native samplers. Entries are never evicted.
pub(crate) struct SamplerCache {
    backend: Arc<dyn GpuBackend>,
    states: Mutex<BTreeMap<SamplerStateDescriptor, Arc<SamplerState>>>,
}

impl SamplerCache {
    pub fn new(backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            backend,
            states: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the cached sampler for `descriptor`, creating it on a miss.
    pub fn get_or_create(
        &self,
        descriptor: SamplerStateDescriptor,
    ) -> Result<Arc<SamplerState>, GraphicsError> {
        let mut states = self.states.lock();
        if let Some(state) = states.get(&descriptor) {
            return Ok(Arc::clone(state));
        }

        let handle = self.backend.create_sampler(&descriptor)?;
        log::trace!("SamplerCache: created sampler {:?} for {:?}", handle, descriptor);
        let state = Arc::new(SamplerState { handle, descriptor });
        states.insert(descriptor, Arc::clone(&state));
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }
}
