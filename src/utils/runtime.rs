use anyhow::Result;

/// The daemon does very little work per event, so a single thread is plenty. The OS hook runs on
/// its own thread outside of the runtime.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
