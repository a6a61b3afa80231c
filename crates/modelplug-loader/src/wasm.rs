// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebAssembly implementation units.
//!
//! Each unit owns its own [`Store`] with a memory ceiling applied through
//! [`StoreLimits`]. The compiled [`Module`] is shared by every instance
//! created from the same context.
//!
//! Engines meter fuel. `_initialize` and every exported call start with a
//! fresh budget, so a unit that never returns traps instead of hanging the
//! thread that called it.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context as _, anyhow};
use modelplug_core::{ImplementationUnit, UnitOrigin};
use wasmtime::{
    Config, Engine, ExternType, Instance, Linker, Module, Store, StoreLimits, StoreLimitsBuilder,
    WasmParams, WasmResults,
};

/// Optional export run once right after instantiation.
pub const INITIALIZE_EXPORT: &str = "_initialize";

/// Engine shared by the units of one load context, with fuel metering on.
pub fn unit_engine() -> anyhow::Result<Engine> {
    let mut config = Config::new();
    config.consume_fuel(true);
    Engine::new(&config)
}

pub(crate) struct UnitState {
    limits: StoreLimits,
}

struct Live {
    store: Store<UnitState>,
    instance: Instance,
}

/// An instantiated WebAssembly module.
pub struct WasmUnit {
    name: String,
    bundle: PathBuf,
    exports: Vec<String>,
    fuel: u64,
    live: Mutex<Live>,
}

impl std::fmt::Debug for WasmUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmUnit")
            .field("name", &self.name)
            .field("bundle", &self.bundle)
            .field("exports", &self.exports)
            .field("fuel", &self.fuel)
            .finish()
    }
}

impl WasmUnit {
    pub(crate) fn instantiate(
        engine: &Engine,
        module: &Module,
        name: &str,
        bundle: PathBuf,
        max_memory_bytes: usize,
        fuel: u64,
    ) -> anyhow::Result<Self> {
        let limits = StoreLimitsBuilder::new()
            .memory_size(max_memory_bytes)
            .instances(1)
            .build();
        let mut store = Store::new(engine, UnitState { limits });
        store.limiter(|state| &mut state.limits);
        store.set_fuel(fuel)?;

        let linker = Linker::new(engine);
        let instance = linker
            .instantiate(&mut store, module)
            .with_context(|| format!("instantiating `{name}`"))?;

        if let Some(init) = instance.get_func(&mut store, INITIALIZE_EXPORT) {
            init.typed::<(), ()>(&store)?
                .call(&mut store, ())
                .with_context(|| format!("running {INITIALIZE_EXPORT} of `{name}`"))?;
        }

        let exports = module
            .exports()
            .filter(|e| matches!(e.ty(), ExternType::Func(_)))
            .map(|e| e.name().to_string())
            .filter(|n| n != INITIALIZE_EXPORT)
            .collect();

        Ok(Self {
            name: name.to_string(),
            bundle,
            exports,
            fuel,
            live: Mutex::new(Live { store, instance }),
        })
    }

    pub fn has_export(&self, export: &str) -> bool {
        self.exports.iter().any(|e| e == export)
    }

    /// Call an exported function with typed parameters and results.
    ///
    /// Calls on one unit are serialized. Each call gets the full fuel budget.
    pub fn call<P, R>(&self, export: &str, params: P) -> anyhow::Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let mut live = self
            .live
            .lock()
            .map_err(|_| anyhow!("unit `{}` is poisoned", self.name))?;
        let Live { store, instance } = &mut *live;
        store.set_fuel(self.fuel)?;
        let func = instance
            .get_typed_func::<P, R>(&mut *store, export)
            .with_context(|| format!("`{}` has no callable export `{export}`", self.name))?;
        func.call(&mut *store, params)
    }
}

impl ImplementationUnit for WasmUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> UnitOrigin {
        UnitOrigin::Bundle(self.bundle.clone())
    }

    fn exports(&self) -> Vec<String> {
        self.exports.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
