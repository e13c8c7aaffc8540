//! Default load step for the load pipeline.

use futures_util::future::join_all;

use crate::error::Result;
use crate::hooks::{AsyncPipeline, TapOptions};
use crate::switcher::context::SwitcherContext;

/// Installs the default "load-apps" tap: load each position group in order,
/// apps within a group in parallel. A group's failures surface after the
/// whole group settled, so one slow sibling never hides a fast failure and
/// every app reaches a stable status before the error propagates.
pub struct Loader;

impl Loader {
    pub fn install(pipeline: &mut AsyncPipeline<SwitcherContext>) -> Result<()> {
        pipeline.tap(
            "load-apps",
            |ctx: &mut SwitcherContext| {
                Box::pin(async move {
                    let groups = ctx.apps_to_load.clone();
                    for group in groups {
                        ctx.token.ensure_active()?;
                        let futures: Vec<_> = group
                            .iter()
                            .map(|app| {
                                let app = app.clone();
                                async move { app.load().await }
                            })
                            .collect();
                        for result in join_all(futures).await {
                            result?;
                        }
                    }
                    Ok(())
                })
            },
            TapOptions::default(),
        )
    }
}
