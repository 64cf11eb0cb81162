//! Target lookup collaborator
//!
//! All build-tool queries go through a [`TargetLookup`]. Implementations are expected to do the
//! expensive work off the caller's thread and hand back a [`ListenableFuture`] right away.

use crate::future::ListenableFuture;
use crate::types::{Label, SourceContext, TargetInfo};

pub trait TargetLookup: Send + Sync {
    /// Targets whose sources include the context's file
    fn targets_for_source(&self, source: &SourceContext) -> ListenableFuture<Vec<TargetInfo>>;

    /// Targets that wrap `label`, such as web tests running it in a browser
    fn wrappers_of(&self, _label: &Label) -> ListenableFuture<Vec<TargetInfo>> {
        ListenableFuture::ready(Vec::new())
    }

    /// Target info for a single label, `None` if the build tool doesn't know it
    fn target_info(&self, label: &Label) -> ListenableFuture<Option<TargetInfo>>;
}
