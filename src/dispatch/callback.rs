//! Callback abstraction
//!
//! A callback is either synchronous or suspending; the variant is fixed when
//! it is registered. Both return `anyhow::Result<()>` so user code can use
//! `?` freely. Errors and panics are converted into [`ArvosError`] at the
//! dispatch boundary and never reach the transport.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::ArvosError;
use crate::types::{ConnectionId, SensorKind, SensorMessage, SensorSample};

/// What a user callback returns.
pub type CallbackResult = anyhow::Result<()>;

type SyncFn = dyn Fn(&ConnectionId, SensorMessage) -> CallbackResult + Send + Sync;
type SuspendingFn =
    dyn Fn(ConnectionId, SensorMessage) -> BoxFuture<'static, CallbackResult> + Send + Sync;

/// A registered message handler.
#[derive(Clone)]
pub enum Callback {
    Sync(Arc<SyncFn>),
    Suspending(Arc<SuspendingFn>),
}

impl Callback {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ConnectionId, SensorMessage) -> CallbackResult + Send + Sync + 'static,
    {
        Callback::Sync(Arc::new(f))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(ConnectionId, SensorMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        Callback::Suspending(Arc::new(move |id, message| f(id, message).boxed()))
    }

    /// Synchronous callback taking the concrete record type.
    pub fn typed<T, F>(f: F) -> Self
    where
        T: SensorSample,
        F: Fn(&ConnectionId, T) -> CallbackResult + Send + Sync + 'static,
    {
        Self::sync(move |id, message| f(id, extract::<T>(message)?))
    }

    /// Suspending callback taking the concrete record type.
    pub fn typed_async<T, F, Fut>(f: F) -> Self
    where
        T: SensorSample,
        F: Fn(ConnectionId, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::suspending(move |id, message| {
            let f = Arc::clone(&f);
            let sample = extract::<T>(message);
            async move {
                match sample {
                    Ok(sample) => f(id, sample).await,
                    Err(e) => Err(e),
                }
            }
        })
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Callback::Suspending(_))
    }

    /// Run the callback, converting errors and panics.
    pub(crate) async fn invoke(
        &self,
        id: &ConnectionId,
        message: SensorMessage,
    ) -> Result<(), ArvosError> {
        let kind = message.kind();

        let outcome = match self {
            Callback::Sync(f) => catch_unwind(AssertUnwindSafe(|| f(id, message))),
            Callback::Suspending(f) => {
                let f = Arc::clone(f);
                let id = id.clone();
                AssertUnwindSafe(async move { f(id, message).await }).catch_unwind().await
            }
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ArvosError::callback_failed(kind, e)),
            Err(panic) => {
                Err(ArvosError::CallbackPanicked { kind, message: panic_message(panic.as_ref()) })
            }
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Suspending(_) => f.write_str("Callback::Suspending"),
        }
    }
}

fn extract<T: SensorSample>(message: SensorMessage) -> anyhow::Result<T> {
    let kind = message.kind();
    T::from_message(message)
        .ok_or_else(|| anyhow::anyhow!("{} callback received a {} message", T::KIND, kind))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Where a reported error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub connection_id: ConnectionId,
    /// Kind of the message involved, when it was decoded far enough to know.
    pub kind: Option<SensorKind>,
}

pub type ConnectionHook = Arc<dyn Fn(&ConnectionId) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&ArvosError, &ErrorContext) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GpsData, HandshakeMessage, ImuData};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn imu() -> SensorMessage {
        ImuData {
            timestamp_ns: 1,
            angular_velocity: [0.0; 3],
            linear_acceleration: [0.0; 3],
            magnetic_field: None,
            attitude: None,
        }
        .into()
    }

    #[tokio::test]
    async fn sync_callback_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback = Callback::sync(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        callback.invoke(&ConnectionId::from("a"), imu()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!callback.is_suspending());
    }

    #[tokio::test]
    async fn suspending_callback_is_awaited() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback = Callback::typed_async::<ImuData, _, _>(move |_, imu| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::task::yield_now().await;
                assert_eq!(imu.timestamp_ns, 1);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            }
        });

        callback.invoke(&ConnectionId::from("a"), imu()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(callback.is_suspending());
    }

    #[tokio::test]
    async fn errors_are_wrapped_with_kind() {
        let callback = Callback::typed::<ImuData, _>(|_, _| anyhow::bail!("disk full"));
        let err = callback.invoke(&ConnectionId::from("a"), imu()).await.unwrap_err();

        assert!(matches!(err, ArvosError::Callback { kind: SensorKind::Imu, .. }));
        assert_eq!(err.code(), "dispatch_callback_error");
    }

    #[tokio::test]
    async fn panics_are_caught() {
        let sync = Callback::sync(|_, _| panic!("sync boom"));
        let err = sync.invoke(&ConnectionId::from("a"), imu()).await.unwrap_err();
        assert!(matches!(err, ArvosError::CallbackPanicked { ref message, .. } if message == "sync boom"));

        let suspending = Callback::suspending(|_, message| async move {
            if message.kind() == SensorKind::Imu {
                panic!("async {}", "boom");
            }
            Ok::<_, anyhow::Error>(())
        });
        let err = suspending.invoke(&ConnectionId::from("a"), imu()).await.unwrap_err();
        assert!(matches!(err, ArvosError::CallbackPanicked { ref message, .. } if message == "async boom"));
    }

    #[tokio::test]
    async fn typed_callback_rejects_other_kinds() {
        let callback = Callback::typed::<GpsData, _>(|_, _| Ok(()));
        let err = callback
            .invoke(&ConnectionId::from("a"), HandshakeMessage::default().into())
            .await
            .unwrap_err();
        assert!(format!("{:?}", err).contains("gps callback received a handshake message"));
    }
}
