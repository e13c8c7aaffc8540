//! Asynchronous series pipeline: each tap is awaited before the next runs.

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::hooks::context::PipelineContext;
use crate::hooks::registry::{TapOptions, TapRegistry};

type AsyncTapFn<C> = Box<dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// A named, reorderable sequence of awaited steps over a shared context.
/// Same semantics as [`super::SyncPipeline`], with one suspension point per
/// tap.
pub struct AsyncPipeline<C: PipelineContext> {
    registry: TapRegistry<AsyncTapFn<C>>,
}

impl<C: PipelineContext> Default for AsyncPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PipelineContext> AsyncPipeline<C> {
    pub fn new() -> Self {
        Self {
            registry: TapRegistry::default(),
        }
    }

    /// Register a named async step.
    pub fn tap<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.registry.insert(name, Box::new(callback), &options)?;
        Ok(())
    }

    /// Remove a named step. Returns whether it existed.
    pub fn untap(&mut self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Run all taps in order, awaiting each. Control flags are honored for
    /// this call and reset on every exit path.
    pub async fn call(&mut self, ctx: &mut C) -> Result<()> {
        let mut fired_once = Vec::new();
        let result = self.run(ctx, &mut fired_once).await;
        for name in &fired_once {
            self.registry.remove(name);
        }
        ctx.controls().reset();
        result
    }

    async fn run(&self, ctx: &mut C, fired_once: &mut Vec<String>) -> Result<()> {
        for i in 0..self.registry.len() {
            let meta = self.registry.meta(i);
            if ctx.controls().should_skip(&meta.name) {
                continue;
            }
            if meta.once {
                fired_once.push(meta.name.clone());
            }
            (self.registry.callback(i))(ctx).await?;
            if ctx.controls().bail {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hooks::context::PipelineControls;

    #[derive(Default)]
    struct TestCtx {
        log: Vec<String>,
        controls: PipelineControls,
    }

    impl PipelineContext for TestCtx {
        fn controls(&mut self) -> &mut PipelineControls {
            &mut self.controls
        }
    }

    #[tokio::test]
    async fn test_series_awaits_in_order() {
        let mut pipeline = AsyncPipeline::new();
        pipeline
            .tap(
                "slow",
                |ctx: &mut TestCtx| {
                    Box::pin(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        ctx.log.push("slow".into());
                        Ok(())
                    })
                },
                TapOptions::default(),
            )
            .unwrap();
        pipeline
            .tap(
                "fast",
                |ctx: &mut TestCtx| {
                    Box::pin(async move {
                        ctx.log.push("fast".into());
                        Ok(())
                    })
                },
                TapOptions::default(),
            )
            .unwrap();

        let mut ctx = TestCtx::default();
        pipeline.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.log, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_error_aborts_remaining_taps_and_resets_controls() {
        let mut pipeline = AsyncPipeline::new();
        pipeline
            .tap(
                "boom",
                |_: &mut TestCtx| Box::pin(async { Err(Error::Host("boom".into())) }),
                TapOptions::default(),
            )
            .unwrap();
        pipeline
            .tap(
                "never",
                |ctx: &mut TestCtx| {
                    Box::pin(async move {
                        ctx.log.push("never".into());
                        Ok(())
                    })
                },
                TapOptions::default(),
            )
            .unwrap();

        let mut ctx = TestCtx::default();
        ctx.controls().ignore_tap("never");
        assert!(pipeline.call(&mut ctx).await.is_err());
        assert!(ctx.log.is_empty());
        // A failed call must not corrupt the next one.
        assert!(ctx.controls.ignore_taps.is_empty());
        assert!(!ctx.controls.bail);
    }

    #[tokio::test]
    async fn test_bail_in_async_tap() {
        let mut pipeline = AsyncPipeline::new();
        pipeline
            .tap(
                "bails",
                |ctx: &mut TestCtx| {
                    Box::pin(async move {
                        ctx.controls().bail();
                        Ok(())
                    })
                },
                TapOptions::default(),
            )
            .unwrap();
        pipeline
            .tap(
                "skipped",
                |ctx: &mut TestCtx| {
                    Box::pin(async move {
                        ctx.log.push("skipped".into());
                        Ok(())
                    })
                },
                TapOptions::default(),
            )
            .unwrap();

        let mut ctx = TestCtx::default();
        pipeline.call(&mut ctx).await.unwrap();
        assert!(ctx.log.is_empty());
    }
}
