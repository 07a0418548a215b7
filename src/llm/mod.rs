//! Language model invocation
//!
//! This module provides:
//! - A trait over the local model runtime
//! - An HTTP implementation for Ollama-compatible runtimes
//! - A router that resolves model profiles and bounds every call by a timeout

mod ollama;

pub use ollama::*;

use crate::error::{Error, Result};
use crate::models::ModelProfile;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Finite stream of generated text fragments
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// A local runtime capable of running language models
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Generate a complete answer
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Generate an answer as a stream of fragments
    async fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream>;

    /// Names of the models installed in the runtime
    async fn list_models(&self) -> Result<Vec<String>>;
}

/// Routes prompts to a named model through the runtime
#[derive(Clone)]
pub struct ModelRouter {
    runtime: Arc<dyn ModelRuntime>,
    timeout: Duration,
}

impl ModelRouter {
    pub fn new(runtime: Arc<dyn ModelRuntime>, timeout: Duration) -> Self {
        Self { runtime, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a model name to its profile
    pub fn profile(&self, model_name: &str) -> Result<ModelProfile> {
        ModelProfile::from_name(model_name)
    }

    /// Run `prompt` through `model_name` and return the full answer
    pub async fn invoke(&self, model_name: &str, prompt: &str) -> Result<String> {
        let name = ModelProfile::runtime_name(model_name)?;
        debug!("Invoking {} ({} prompt chars)", name, prompt.chars().count());

        let text = self
            .bounded(&name, self.runtime.generate(&name, prompt))
            .await?;
        info!("{} answered with {} chars", name, text.chars().count());
        Ok(text)
    }

    /// Run `prompt` through `model_name`, forwarding each fragment as it arrives.
    ///
    /// The aggregate answer is returned only once the stream completes.
    pub async fn invoke_streaming<F>(
        &self,
        model_name: &str,
        prompt: &str,
        mut on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let name = ModelProfile::runtime_name(model_name)?;
        debug!("Streaming from {} ({} prompt chars)", name, prompt.chars().count());

        let consume = async {
            let mut stream = self.runtime.generate_stream(&name, prompt).await?;
            let mut answer = String::new();
            while let Some(fragment) = stream.next().await {
                let fragment = fragment?;
                if fragment.is_empty() {
                    continue;
                }
                on_fragment(&fragment);
                answer.push_str(&fragment);
            }
            Ok(answer)
        };

        self.bounded(&name, consume).await
    }

    /// Models installed in the runtime
    pub async fn installed(&self) -> Result<Vec<String>> {
        self.runtime.list_models().await
    }

    async fn bounded<T>(
        &self,
        name: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e @ Error::ModelInvocationFailed { .. })) => Err(e),
            Ok(Err(e)) => Err(Error::invocation(name, e)),
            Err(_) => Err(Error::invocation(
                name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted runtime for tests
    #[derive(Default)]
    pub struct FakeRuntime {
        pub delay: Option<Duration>,
        pub fail: bool,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl FakeRuntime {
        pub fn answer_for(model: &str) -> String {
            format!("answer from {}", model)
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts
                .lock()
                .ok()
                .and_then(|p| p.last().map(|(_, prompt)| prompt.clone()))
        }

        async fn record(&self, model: &str, prompt: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push((model.to_string(), prompt.to_string()));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::Config("runtime unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ModelRuntime for FakeRuntime {
        async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
            self.record(model, prompt).await?;
            Ok(Self::answer_for(model))
        }

        async fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream> {
            self.record(model, prompt).await?;
            let fragments: Vec<Result<String>> = Self::answer_for(model)
                .split_inclusive(' ')
                .map(|s| Ok(s.to_string()))
                .collect();
            Ok(futures::stream::iter(fragments).boxed())
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["llama2:latest".to_string(), "phi:latest".to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRuntime;
    use super::*;

    fn router(runtime: FakeRuntime, timeout: Duration) -> (ModelRouter, Arc<FakeRuntime>) {
        let runtime = Arc::new(runtime);
        (ModelRouter::new(runtime.clone(), timeout), runtime)
    }

    #[tokio::test]
    async fn test_invoke_known_model() {
        let (router, runtime) = router(FakeRuntime::default(), Duration::from_secs(5));

        let answer = router.invoke("llama2", "prompt").await.unwrap();
        assert_eq!(answer, FakeRuntime::answer_for("llama2"));
        assert_eq!(runtime.call_count(), 1);
    }

    #[tokio::test]
    async fn test_runtime_receives_normalized_name_with_tag() {
        let (router, runtime) = router(FakeRuntime::default(), Duration::from_secs(5));

        let answer = router.invoke("Phi:2.7b", "prompt").await.unwrap();
        assert_eq!(answer, FakeRuntime::answer_for("phi:2.7b"));

        let prompts = runtime.prompts.lock().unwrap();
        assert_eq!(prompts.last().unwrap().0, "phi:2.7b");
    }

    #[tokio::test]
    async fn test_unknown_model_never_reaches_runtime() {
        let (router, runtime) = router(FakeRuntime::default(), Duration::from_secs(5));

        let err = router.invoke("gpt-4", "prompt").await.unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));
        assert_eq!(runtime.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_invocation_failure() {
        let slow = FakeRuntime {
            delay: Some(Duration::from_secs(5)),
            ..FakeRuntime::default()
        };
        let (router, _) = router(slow, Duration::from_millis(50));

        let err = router.invoke("phi", "prompt").await.unwrap_err();
        match err {
            Error::ModelInvocationFailed { model, reason } => {
                assert_eq!(model, "phi");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_runtime_failure_is_wrapped() {
        let failing = FakeRuntime {
            fail: true,
            ..FakeRuntime::default()
        };
        let (router, _) = router(failing, Duration::from_secs(5));

        let err = router.invoke("mistral", "prompt").await.unwrap_err();
        assert!(matches!(err, Error::ModelInvocationFailed { model, .. } if model == "mistral"));
    }

    #[tokio::test]
    async fn test_streaming_forwards_and_aggregates() {
        let (router, _) = router(FakeRuntime::default(), Duration::from_secs(5));
        let mut seen = Vec::new();

        let answer = router
            .invoke_streaming("codellama", "prompt", |f| seen.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(answer, FakeRuntime::answer_for("codellama"));
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.concat(), answer);
    }

    #[tokio::test]
    async fn test_installed_lists_runtime_models() {
        let (router, _) = router(FakeRuntime::default(), Duration::from_secs(5));
        let models = router.installed().await.unwrap();
        assert!(models.contains(&"llama2:latest".to_string()));
    }
}
