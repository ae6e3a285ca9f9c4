use std::path::Path;

/// Builds an ONNX Runtime session with the platform's preferred execution
/// providers and all intra-op threads available.
///
/// Providers that fail to register fall back to CPU inside `ort`.
pub fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("ONNX session ready for {}", model_path.display());
    Ok(session)
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
