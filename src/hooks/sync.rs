//! Synchronous pipeline: taps run to completion in order.

use crate::error::Result;
use crate::hooks::context::PipelineContext;
use crate::hooks::registry::{TapOptions, TapRegistry};

type SyncTapFn<C> = Box<dyn Fn(&mut C) -> Result<()> + Send + Sync>;

/// A named, reorderable sequence of synchronous steps over a shared context.
pub struct SyncPipeline<C: PipelineContext> {
    registry: TapRegistry<SyncTapFn<C>>,
}

impl<C: PipelineContext> Default for SyncPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PipelineContext> SyncPipeline<C> {
    pub fn new() -> Self {
        Self {
            registry: TapRegistry::default(),
        }
    }

    /// Register a named step.
    pub fn tap<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: Fn(&mut C) -> Result<()> + Send + Sync + 'static,
    {
        self.registry.insert(name, Box::new(callback), &options)?;
        Ok(())
    }

    /// Remove a named step. Returns whether it existed.
    pub fn untap(&mut self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Run all taps in order. Control flags on the context are honored for
    /// this call and reset on every exit path.
    pub fn call(&mut self, ctx: &mut C) -> Result<()> {
        let mut fired_once = Vec::new();
        let result = self.run(ctx, &mut fired_once);
        for name in &fired_once {
            self.registry.remove(name);
        }
        ctx.controls().reset();
        result
    }

    fn run(&self, ctx: &mut C, fired_once: &mut Vec<String>) -> Result<()> {
        for i in 0..self.registry.len() {
            let meta = self.registry.meta(i);
            if ctx.controls().should_skip(&meta.name) {
                continue;
            }
            if meta.once {
                fired_once.push(meta.name.clone());
            }
            (self.registry.callback(i))(ctx)?;
            if ctx.controls().bail {
                break;
            }
        }
        Ok(())
    }
}
