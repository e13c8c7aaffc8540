//! Pipeline control state carried on the shared context.

/// Per-call control flags. A pipeline resets these at the end of every
/// `call`, including thrown-error exits, so one call never leaks flags into
/// the next and an inner pipeline's bail cannot abort an outer call.
#[derive(Debug, Default)]
pub struct PipelineControls {
    pub(crate) bail: bool,
    pub(crate) ignore_taps: Vec<String>,
}

impl PipelineControls {
    /// Stop the remaining taps of the current call.
    pub fn bail(&mut self) {
        self.bail = true;
    }

    /// Skip the named tap for the current call only.
    pub fn ignore_tap(&mut self, name: impl Into<String>) {
        self.ignore_taps.push(name.into());
    }

    pub(crate) fn should_skip(&self, name: &str) -> bool {
        self.ignore_taps.iter().any(|n| n == name)
    }

    pub(crate) fn reset(&mut self) {
        self.bail = false;
        self.ignore_taps.clear();
    }
}

/// Implemented by any context type a pipeline can run over.
pub trait PipelineContext {
    fn controls(&mut self) -> &mut PipelineControls;
}
